//! # Foodgram Shared Library
//!
//! Records, repositories and domain services for the Foodgram recipe API.
//! The HTTP layer lives in `foodgram-api`; everything here is usable from
//! any async context holding a `PgPool`.
//!
//! ## Module Organization
//!
//! - `models`: database records and their queries
//! - `services`: transactional operations (association rewrite, shopping list, ...)
//! - `auth`: bearer-token verification and the current-user extractor
//! - `media`: image storage seam
//! - `db`: connection pool and migrations
//! - `error`: the shared error type

pub mod auth;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod services;

/// Current version of the Foodgram shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
