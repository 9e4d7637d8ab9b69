//! signon-gate - The trust-and-access layer for a sign-on campaign service
//!
//! This crate provides API key issuance and verification, a persisted CORS
//! origin whitelist, and per-client-IP rate limiting, composed as HTTP
//! middleware over a SQLite store.

pub mod auth;
pub mod config;
pub mod cors;
pub mod database;
pub mod error;
pub mod models;
pub mod ratelimit;
pub mod server;
