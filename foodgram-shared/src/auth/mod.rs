/// Identity adapter
///
/// Credentials are issued by an external identity provider. This module
/// only verifies the bearer token it signed and exposes the current user.
///
/// - [`jwt`]: HS256 token encoding and validation
/// - [`middleware`]: axum layer + `AuthContext` extractor

pub mod jwt;
pub mod middleware;
