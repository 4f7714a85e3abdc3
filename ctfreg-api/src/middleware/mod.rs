/// Middleware modules for the registration server
///
/// - Security headers

pub mod security;
