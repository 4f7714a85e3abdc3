/// Authentication primitives used during registration
///
/// # Modules
///
/// - [`password`]: Argon2id hashing of the submitted password
/// - [`token`]: HMAC-based, one-time email confirmation tokens

pub mod password;
pub mod token;
