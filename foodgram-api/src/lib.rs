//! # Foodgram API Server Library
//!
//! HTTP surface of the recipe service: routing, request validation,
//! pagination and the mapping of service errors to responses. Domain logic
//! lives in `foodgram_shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `pagination`: Page-number pagination
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pagination;
pub mod routes;
