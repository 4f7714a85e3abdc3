/// API route handlers
///
/// - `health`: Health check endpoint
/// - `registration`: Registration form and email confirmation

pub mod health;
pub mod registration;
