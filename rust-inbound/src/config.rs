//! Configuration module for environment variable parsing.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Mailgun API key, used as the Basic-auth password for attachment downloads
    pub mailgun_api_key: Option<String>,

    /// Per-attachment HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Directory for attachment temp files (system temp dir when unset)
    pub attachment_dir: Option<PathBuf>,

    /// Allow plain `http` attachment URLs (the API key is sent with each fetch)
    pub allow_insecure_attachment_urls: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_var("PORT", 8080),

            mailgun_api_key: env::var("MAILGUN_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),

            request_timeout_ms: parse_nonzero("REQUEST_TIMEOUT_MS", 30_000),

            attachment_dir: env::var_os("ATTACHMENT_TMP_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),

            allow_insecure_attachment_urls: parse_var("ALLOW_INSECURE_ATTACHMENT_URLS", false),
        }
    }
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Like [`parse_var`], but zero also counts as invalid.
fn parse_nonzero(name: &str, default: u64) -> u64 {
    match parse_var(name, default) {
        0 => {
            warn!(env_var = name, value = 0, "Zero is not allowed, using default");
            default
        }
        value => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_valid() {
        env::set_var("TEST_PARSE_VAR_VALID", " 9090 ");
        let result: u16 = parse_var("TEST_PARSE_VAR_VALID", 0);
        assert_eq!(result, 9090);
        env::remove_var("TEST_PARSE_VAR_VALID");
    }

    #[test]
    fn test_parse_var_invalid() {
        env::set_var("TEST_PARSE_VAR_INVALID", "soon");
        let result: u64 = parse_var("TEST_PARSE_VAR_INVALID", 42);
        assert_eq!(result, 42);
        env::remove_var("TEST_PARSE_VAR_INVALID");
    }

    #[test]
    fn test_parse_nonzero_rejects_zero() {
        env::set_var("TEST_PARSE_NONZERO_ZERO", "0");
        assert_eq!(parse_nonzero("TEST_PARSE_NONZERO_ZERO", 30_000), 30_000);
        env::remove_var("TEST_PARSE_NONZERO_ZERO");
    }

    #[test]
    fn test_parse_nonzero_valid() {
        env::set_var("TEST_PARSE_NONZERO_VALID", "1500");
        assert_eq!(parse_nonzero("TEST_PARSE_NONZERO_VALID", 30_000), 1500);
        env::remove_var("TEST_PARSE_NONZERO_VALID");
    }

    #[test]
    fn test_parse_var_bool() {
        env::set_var("TEST_PARSE_VAR_BOOL", "true");
        assert!(parse_var("TEST_PARSE_VAR_BOOL", false));
        env::remove_var("TEST_PARSE_VAR_BOOL");
    }

    #[test]
    fn test_parse_var_default() {
        let result: u64 = parse_var("NONEXISTENT_VAR", 30_000);
        assert_eq!(result, 30_000);
    }
}
