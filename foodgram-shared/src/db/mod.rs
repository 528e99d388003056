/// Database layer for Foodgram
///
/// - `pool`: PostgreSQL connection pool with a start-up health check
/// - `migrations`: embedded migration runner and status reporting
///
/// Repositories live in `models`; they take an explicit executor
/// (`&PgPool`, `&mut PgConnection` or a transaction) and never reach for a
/// global handle.

pub mod migrations;
pub mod pool;
