//! Process configuration read from environment variables.
//!
//! | variable              | meaning                                  | default            |
//! |-----------------------|------------------------------------------|--------------------|
//! | `DATABASE_URI`        | data directory for RocksDB               | `blogmate_data`    |
//! | `DATABASE_USERNAME`   | accepted for deployment parity           |                    |
//! | `DATABASE_PASSWORD`   | accepted for deployment parity           |                    |
//! | `EMAIL_KEY`           | SMTP password; enables mail delivery     |                    |
//! | `EMAIL_FROM`          | sender address and SMTP login            | required with `EMAIL_KEY` |
//! | `SMTP_HOST`           | SMTP relay (STARTTLS)                    | `smtp.gmail.com`   |
//! | `SMTP_PORT`           | SMTP port                                | `587`              |
//! | `PORT`                | HTTP listen port                         | `8080`             |
//! | `JWT`                 | HS256 signing secret (required)          |                    |
//! | `GEMINI_API_KEY`      | Gemini credential                        |                    |
//! | `GEMINI_MODEL`        | Gemini model name                        | `gemini-1.5-flash` |
//! | `PROMPTS_PATH`        | prompt template file                     | `prompts.json`     |
//! | `PUBLIC_URL`          | base URL used in emailed links           | `http://localhost:{PORT}` |
//! | `STORE_TIMEOUT_SECS`  | deadline for store operations            | `10`               |
//! | `AI_TIMEOUT_SECS`     | deadline for model calls                 | `30`               |
//! | `TRUST_PROXY_HEADERS` | trust `X-Forwarded-For` for rate limits  | `false`            |

use crate::ai::gemini::DEFAULT_MODEL;
use crate::error::{BlogError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_DATA_DIR: &str = "blogmate_data";
pub const DEFAULT_PROMPTS_PATH: &str = "prompts.json";
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum JWT secret length in bytes.
pub const MIN_JWT_SECRET_LENGTH: usize = 16;

#[derive(Clone)]
pub struct DatabaseConfig {
    pub uri: PathBuf,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct EmailConfig {
    pub key: Option<String>,
    pub from: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub public_url: String,
}

impl EmailConfig {
    /// Whether account emails go out over SMTP.
    pub fn smtp_enabled(&self) -> bool {
        self.key.is_some()
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub store: Duration,
    pub ai: Duration,
}

/// Immutable configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    pub port: u16,
    pub jwt: JwtConfig,
    pub gemini: GeminiConfig,
    pub prompts_path: PathBuf,
    pub timeouts: Timeouts,
    pub trust_proxy_headers: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_secs(name: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    match non_empty(value) {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| BlogError::config(format!("{} must be a positive integer", name))),
    }
}

fn parse_port(name: &str, value: Option<String>, default: u16) -> Result<u16> {
    match non_empty(value) {
        None => Ok(default),
        Some(p) => p
            .parse()
            .map_err(|_| BlogError::config(format!("{} '{}' is not a valid port", name, p))),
    }
}

fn parse_flag(value: Option<String>) -> bool {
    non_empty(value)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| non_empty(lookup(name));

        let port = parse_port("PORT", lookup("PORT"), DEFAULT_PORT)?;

        let secret = var("JWT").ok_or_else(|| BlogError::config("JWT secret is required"))?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(BlogError::config(format!(
                "JWT secret must be at least {} bytes",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        let email_key = var("EMAIL_KEY");
        let email_from = var("EMAIL_FROM");
        if email_key.is_some() && email_from.is_none() {
            return Err(BlogError::config("EMAIL_FROM is required when EMAIL_KEY is set"));
        }

        Ok(Self {
            database: DatabaseConfig {
                uri: var("DATABASE_URI")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
                username: var("DATABASE_USERNAME"),
                password: var("DATABASE_PASSWORD"),
            },
            email: EmailConfig {
                key: email_key,
                from: email_from,
                smtp_host: var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                smtp_port: parse_port("SMTP_PORT", lookup("SMTP_PORT"), DEFAULT_SMTP_PORT)?,
                public_url: var("PUBLIC_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| format!("http://localhost:{}", port)),
            },
            port,
            jwt: JwtConfig { secret },
            gemini: GeminiConfig {
                api_key: var("GEMINI_API_KEY"),
                model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
            prompts_path: var("PROMPTS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPTS_PATH)),
            timeouts: Timeouts {
                store: parse_secs("STORE_TIMEOUT_SECS", lookup("STORE_TIMEOUT_SECS"), DEFAULT_STORE_TIMEOUT)?,
                ai: parse_secs("AI_TIMEOUT_SECS", lookup("AI_TIMEOUT_SECS"), DEFAULT_AI_TIMEOUT)?,
            },
            trust_proxy_headers: parse_flag(lookup("TRUST_PROXY_HEADERS")),
        })
    }
}

// Secrets never reach logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("uri", &self.uri)
            .field("username", &self.username.is_some())
            .field("password", &self.password.is_some())
            .finish()
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("key", &self.key.is_some())
            .field("from", &self.from)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("public_url", &self.public_url)
            .finish()
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig").field("secret", &"***").finish()
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.is_some())
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    const SECRET: &str = "0123456789abcdef0123";

    #[test]
    fn test_defaults() {
        let config = config_from(&[("JWT", SECRET)]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database.uri, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.gemini.model, DEFAULT_MODEL);
        assert_eq!(config.timeouts.store, DEFAULT_STORE_TIMEOUT);
        assert_eq!(config.email.public_url, "http://localhost:8080");
        assert!(!config.trust_proxy_headers);
        assert!(!config.email.smtp_enabled());
        assert_eq!(config.email.smtp_host, DEFAULT_SMTP_HOST);
        assert_eq!(config.email.smtp_port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("JWT", SECRET),
            ("PORT", "9000"),
            ("DATABASE_URI", "/var/lib/blogmate"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("AI_TIMEOUT_SECS", "5"),
            ("PUBLIC_URL", "https://blog.example.com/"),
            ("TRUST_PROXY_HEADERS", "TRUE"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database.uri, PathBuf::from("/var/lib/blogmate"));
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(config.timeouts.ai, Duration::from_secs(5));
        assert_eq!(config.email.public_url, "https://blog.example.com");
        assert!(config.trust_proxy_headers);
    }

    #[test]
    fn test_jwt_is_required() {
        assert!(matches!(config_from(&[]), Err(BlogError::Config(_))));
        assert!(matches!(
            config_from(&[("JWT", "short")]),
            Err(BlogError::Config(_))
        ));
    }

    #[test]
    fn test_smtp_settings() {
        assert!(matches!(
            config_from(&[("JWT", SECRET), ("EMAIL_KEY", "app-password")]),
            Err(BlogError::Config(_))
        ));

        let config = config_from(&[
            ("JWT", SECRET),
            ("EMAIL_KEY", "app-password"),
            ("EMAIL_FROM", "noreply@blog.example.com"),
            ("SMTP_HOST", "mail.example.com"),
            ("SMTP_PORT", "2525"),
        ])
        .unwrap();
        assert!(config.email.smtp_enabled());
        assert_eq!(config.email.from.as_deref(), Some("noreply@blog.example.com"));
        assert_eq!(config.email.smtp_host, "mail.example.com");
        assert_eq!(config.email.smtp_port, 2525);
        assert!(!format!("{:?}", config).contains("app-password"));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(config_from(&[("JWT", SECRET), ("PORT", "http")]).is_err());
        assert!(config_from(&[("JWT", SECRET), ("STORE_TIMEOUT_SECS", "0")]).is_err());
        assert!(config_from(&[("JWT", SECRET), ("SMTP_PORT", "70000")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config_from(&[("JWT", SECRET), ("GEMINI_API_KEY", "gk-123")]).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(SECRET));
        assert!(!rendered.contains("gk-123"));
    }
}
