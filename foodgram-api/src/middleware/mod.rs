/// HTTP middleware owned by the API crate
///
/// Identity resolution lives in `foodgram_shared::auth::middleware` so the
/// token format stays next to the token code.

pub mod security;
