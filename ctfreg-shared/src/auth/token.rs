/// Email confirmation tokens
///
/// A token proves that its holder received the confirmation mail sent to a
/// user's formal email address. Tokens are not stored; they are recomputed
/// from the user record on verification.
///
/// # Format
///
/// ```text
/// <issue timestamp, base36>-<HMAC-SHA256, hex>
/// ```
///
/// The MAC covers the user ID, the password hash, the `is_active` flag and
/// the issue timestamp. Activating the account changes `is_active`, so a
/// token stops verifying once it has been used.
///
/// # Example
///
/// ```
/// use ctfreg_shared::auth::token::TokenGenerator;
/// # use ctfreg_shared::models::user::User;
/// # fn example(user: &User) -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = TokenGenerator::new("a-secret-key-of-at-least-32-bytes!", 3);
/// let token = tokens.make_token(user)?;
/// tokens.check_token(user, &token)?;
/// # Ok(())
/// # }
/// ```

use crate::models::user::User;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Mixed into the key so tokens from this generator cannot be confused with
/// other MACs made from the same application secret
const KEY_SALT: &[u8] = b"ctfreg.auth.token.EmailConfirmation";

/// Token error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token is not of the form `<ts>-<mac>`
    #[error("Malformed confirmation token")]
    Malformed,

    /// The MAC does not match this user's current state
    #[error("Invalid confirmation token")]
    Invalid,

    /// The token is older than the validity period
    #[error("Confirmation token expired")]
    Expired,

    #[error("Token key setup failed: {0}")]
    Key(String),
}

/// Generates and checks confirmation tokens
#[derive(Clone)]
pub struct TokenGenerator {
    key: Vec<u8>,
    validity: Duration,
}

impl fmt::Debug for TokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGenerator")
            .field("key", &"<redacted>")
            .field("validity", &self.validity)
            .finish()
    }
}

impl TokenGenerator {
    /// Creates a generator keyed by the application secret
    ///
    /// Tokens are valid for `validity_days` days after issue.
    pub fn new(secret: impl AsRef<[u8]>, validity_days: u32) -> Self {
        let mut key = KEY_SALT.to_vec();
        key.extend_from_slice(secret.as_ref());

        Self {
            key,
            validity: Duration::days(i64::from(validity_days)),
        }
    }

    /// Makes a token for the user's current state
    pub fn make_token(&self, user: &User) -> Result<String, TokenError> {
        self.make_token_at(user, Utc::now())
    }

    /// Makes a token as if issued at `now`
    pub fn make_token_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let timestamp = u64::try_from(now.timestamp()).unwrap_or(0);
        let mac = self.mac(user, timestamp)?.finalize().into_bytes();

        Ok(format!("{}-{}", to_base36(timestamp), hex::encode(mac)))
    }

    /// Checks a token against the user's current state
    pub fn check_token(&self, user: &User, token: &str) -> Result<(), TokenError> {
        self.check_token_at(user, token, Utc::now())
    }

    /// Checks a token as if verified at `now`
    pub fn check_token_at(
        &self,
        user: &User,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let (ts_part, mac_part) = token.split_once('-').ok_or(TokenError::Malformed)?;
        let timestamp = from_base36(ts_part).ok_or(TokenError::Malformed)?;
        let expected = hex::decode(mac_part).map_err(|_| TokenError::Malformed)?;

        self.mac(user, timestamp)?
            .verify_slice(&expected)
            .map_err(|_| TokenError::Invalid)?;

        let issued = i64::try_from(timestamp).map_err(|_| TokenError::Malformed)?;
        if now.timestamp() - issued > self.validity.num_seconds() {
            return Err(TokenError::Expired);
        }

        Ok(())
    }

    fn mac(&self, user: &User, timestamp: u64) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| TokenError::Key(e.to_string()))?;

        mac.update(user.id.as_bytes());
        mac.update(user.password_hash.as_bytes());
        mac.update(&[u8::from(user.is_active)]);
        mac.update(timestamp.to_string().as_bytes());

        Ok(mac)
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();

    String::from_utf8(out).unwrap_or_default()
}

fn from_base36(text: &str) -> Option<u64> {
    if text.is_empty() || text.len() > 13 {
        return None;
    }
    u64::from_str_radix(text, 36).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            email: "a@example.org".to_string(),
            is_active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(from_base36("10"), Some(36));
        assert_eq!(from_base36(""), None);
        assert_eq!(from_base36("!!"), None);
    }

    #[test]
    fn test_token_verifies_for_same_user() {
        let tokens = TokenGenerator::new(SECRET, 3);
        let user = user();

        let token = tokens.make_token(&user).unwrap();
        assert!(token.contains('-'));
        assert_eq!(tokens.check_token(&user, &token), Ok(()));
    }

    #[test]
    fn test_token_rejected_for_other_user() {
        let tokens = TokenGenerator::new(SECRET, 3);
        let alice = user();
        let bob = user();

        let token = tokens.make_token(&alice).unwrap();
        assert_eq!(tokens.check_token(&bob, &token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_token_invalid_after_activation() {
        let tokens = TokenGenerator::new(SECRET, 3);
        let mut user = user();

        let token = tokens.make_token(&user).unwrap();
        user.is_active = true;

        assert_eq!(tokens.check_token(&user, &token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let user = user();
        let token = TokenGenerator::new(SECRET, 3).make_token(&user).unwrap();

        let other = TokenGenerator::new("another-secret-key-at-least-32-bytes", 3);
        assert_eq!(other.check_token(&user, &token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_token_expires() {
        let tokens = TokenGenerator::new(SECRET, 3);
        let user = user();
        let issued = Utc::now() - Duration::days(4);

        let token = tokens.make_token_at(&user, issued).unwrap();

        assert_eq!(tokens.check_token(&user, &token), Err(TokenError::Expired));
        assert_eq!(
            tokens.check_token_at(&user, &token, issued + Duration::days(2)),
            Ok(())
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let tokens = TokenGenerator::new(SECRET, 3);
        let user = user();

        for token in ["", "nodash", "-abcd", "zz-nothex", "!!-00"] {
            assert_eq!(
                tokens.check_token(&user, token),
                Err(TokenError::Malformed),
                "token {:?}",
                token
            );
        }
    }
}
