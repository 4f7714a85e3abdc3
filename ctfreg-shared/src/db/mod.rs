/// Database layer for ctfreg
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Embedded sqlx migrations for the `users` and `teams` tables
///
/// Models are in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
