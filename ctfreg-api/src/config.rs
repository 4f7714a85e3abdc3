/// Configuration management for the registration server
///
/// Configuration is read from environment variables (a `.env` file is
/// loaded first if present).
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `STORE_BACKEND`: `postgres` or `memory` (default: postgres)
/// - `DATABASE_URL`: PostgreSQL connection string (required for postgres)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `SECRET_KEY`: Key for confirmation tokens (required, at least 32 chars)
/// - `CONFIRMATION_TOKEN_DAYS`: Token validity in days (default: 3)
/// - `COMPETITION_NAME`: Name used in confirmation mails (required)
/// - `DEFAULT_FROM_EMAIL`: Sender address (default: webmaster@localhost)
/// - `SITE_DOMAIN`: Host used in confirmation links (default: request Host)
/// - `ALLOWED_HOSTS`: Comma-separated Host header values accepted when
///   `SITE_DOMAIN` is unset; `.example.org` matches subdomains, `*` any
///   (default: localhost,127.0.0.1,[::1])
/// - `TRUST_FORWARDED_PROTO`: Honor `X-Forwarded-Proto` (default: false)
/// - `ENABLE_HSTS`: Send `Strict-Transport-Security` (default: false)
/// - `MEDIA_ROOT`: Directory for uploaded images (default: ./media)
/// - `MAX_IMAGE_BYTES`: Upload limit for team images (default: 2 MiB)
/// - `MAIL_BACKEND`: `console` or `http` (default: console)
/// - `MAIL_HTTP_URL`: Relay endpoint (required for http)
/// - `MAIL_HTTP_TOKEN`: Optional bearer token for the relay
/// - `RUST_LOG`: Log filter (default: ctfreg_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use ctfreg_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use ctfreg_shared::media::DEFAULT_MAX_IMAGE_BYTES;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, str::FromStr};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub registration: RegistrationConfig,
    pub mail: MailConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Whether `X-Forwarded-Proto` decides if a request counts as secure
    ///
    /// Only enable this behind a reverse proxy that sets the header.
    pub trust_forwarded_proto: bool,

    /// Whether to send HSTS headers (only when served over HTTPS)
    pub enable_hsts: bool,

    /// Hosts a request may name when links are built from its Host header
    pub allowed_hosts: Vec<String>,
}

/// Where registrations are stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    Postgres { url: String, max_connections: u32 },

    /// Process-local storage, lost on restart
    Memory,
}

/// Registration and confirmation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub competition_name: String,

    /// Secret key for confirmation tokens
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret_key: String,

    pub token_validity_days: u32,

    /// Host for confirmation links; the request's Host header if unset
    pub site_domain: Option<String>,

    pub media_root: PathBuf,
    pub max_image_bytes: usize,
}

/// Mail transport selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailConfig {
    pub from_email: String,
    pub backend: MailBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MailBackend {
    /// Log mails instead of sending them
    Console,

    /// Post mails to an HTTP relay
    Http {
        url: String,
        #[serde(skip_serializing)]
        token: Option<String>,
    },
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or values fail
    /// to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let store = match var("STORE_BACKEND").as_deref().unwrap_or("postgres") {
            "postgres" => StoreConfig::Postgres {
                url: required("DATABASE_URL")?,
                max_connections: parse_or(var("DATABASE_MAX_CONNECTIONS"), 10)?,
            },
            "memory" => StoreConfig::Memory,
            other => anyhow::bail!("Unknown STORE_BACKEND '{}'", other),
        };

        let secret_key = required("SECRET_KEY")?;
        if secret_key.len() < 32 {
            anyhow::bail!("SECRET_KEY must be at least 32 characters long");
        }

        let backend = match var("MAIL_BACKEND").as_deref().unwrap_or("console") {
            "console" => MailBackend::Console,
            "http" => MailBackend::Http {
                url: required("MAIL_HTTP_URL")?,
                token: var("MAIL_HTTP_TOKEN"),
            },
            other => anyhow::bail!("Unknown MAIL_BACKEND '{}'", other),
        };

        let cors_origins = split_list(var("CORS_ORIGINS").as_deref().unwrap_or("*"));
        let allowed_hosts = split_list(
            var("ALLOWED_HOSTS")
                .as_deref()
                .unwrap_or("localhost,127.0.0.1,[::1]"),
        )
        .into_iter()
        .map(|host| host.to_ascii_lowercase())
        .collect();

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(var("API_PORT"), 8080)?,
                cors_origins,
                trust_forwarded_proto: parse_or(var("TRUST_FORWARDED_PROTO"), false)?,
                enable_hsts: parse_or(var("ENABLE_HSTS"), false)?,
                allowed_hosts,
            },
            store,
            registration: RegistrationConfig {
                competition_name: required("COMPETITION_NAME")?,
                secret_key,
                token_validity_days: parse_or(var("CONFIRMATION_TOKEN_DAYS"), 3)?,
                site_domain: var("SITE_DOMAIN"),
                media_root: var("MEDIA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./media")),
                max_image_bytes: parse_or(var("MAX_IMAGE_BYTES"), DEFAULT_MAX_IMAGE_BYTES)?,
            },
            mail: MailConfig {
                from_email: var("DEFAULT_FROM_EMAIL")
                    .unwrap_or_else(|| "webmaster@localhost".to_string()),
                backend,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_or<T>(value: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value '{}': {}", raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("STORE_BACKEND", "memory"),
            ("SECRET_KEY", SECRET),
            ("COMPETITION_NAME", "FAUST CTF"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.trust_forwarded_proto);
        assert!(!config.api.enable_hsts);
        assert_eq!(config.api.allowed_hosts, ["localhost", "127.0.0.1", "[::1]"]);
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.registration.token_validity_days, 3);
        assert_eq!(config.registration.site_domain, None);
        assert_eq!(config.registration.max_image_bytes, DEFAULT_MAX_IMAGE_BYTES);
        assert_eq!(config.mail.from_email, "webmaster@localhost");
        assert_eq!(config.mail.backend, MailBackend::Console);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = load(&[("SECRET_KEY", SECRET), ("COMPETITION_NAME", "FAUST CTF")])
            .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/ctf"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("SECRET_KEY", SECRET),
            ("COMPETITION_NAME", "FAUST CTF"),
        ])
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Postgres {
                url: "postgresql://localhost/ctf".to_string(),
                max_connections: 4
            }
        );
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = load(&[
            ("STORE_BACKEND", "memory"),
            ("SECRET_KEY", "short"),
            ("COMPETITION_NAME", "FAUST CTF"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_http_mail_backend() {
        let config = load(&[
            ("STORE_BACKEND", "memory"),
            ("SECRET_KEY", SECRET),
            ("COMPETITION_NAME", "FAUST CTF"),
            ("MAIL_BACKEND", "http"),
            ("MAIL_HTTP_URL", "https://relay.example.org/send"),
            ("CORS_ORIGINS", "https://a.example.org, https://b.example.org"),
            ("API_PORT", "9000"),
            ("TRUST_FORWARDED_PROTO", "true"),
            ("ALLOWED_HOSTS", "CTF.example.org, .example.net"),
        ])
        .unwrap();

        assert_eq!(
            config.mail.backend,
            MailBackend::Http {
                url: "https://relay.example.org/send".to_string(),
                token: None
            }
        );
        assert_eq!(config.api.cors_origins.len(), 2);
        assert_eq!(config.api.port, 9000);
        assert!(config.api.trust_forwarded_proto);
        assert_eq!(config.api.allowed_hosts, ["ctf.example.org", ".example.net"]);
    }

    #[test]
    fn test_invalid_number() {
        let err = load(&[
            ("STORE_BACKEND", "memory"),
            ("SECRET_KEY", SECRET),
            ("COMPETITION_NAME", "FAUST CTF"),
            ("API_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("eighty"));
    }
}
