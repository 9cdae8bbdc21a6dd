use secrecy::{ExposeSecret, Secret};
use std::env;
use std::fmt;
use std::time::Duration;

pub const PRODUCTION_REST_URL: &str = "https://api.binance.com";
pub const PRODUCTION_STREAM_URL: &str = "wss://stream.binance.com:9443";
pub const TESTNET_REST_URL: &str = "https://testnet.binance.vision";
pub const TESTNET_STREAM_URL: &str = "wss://testnet.binance.vision";

/// Hard deadline for a single REST call (connect + read)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// API credentials. Never serialized; `Debug` output is redacted.
#[derive(Clone)]
pub struct Credential {
    api_key: Secret<String>,
    secret_key: Secret<String>,
}

impl Credential {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            secret_key: Secret::new(secret_key.into()),
        }
    }

    /// Credential for public-only usage
    pub fn empty() -> Self {
        Self::new(String::new(), String::new())
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Deployment profile selecting endpoints and credential variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Test,
    Production,
}

impl Environment {
    /// Anything other than `test` (case-insensitive) is production.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("test") {
            Self::Test
        } else {
            Self::Production
        }
    }

    pub const fn default_rest_url(self) -> &'static str {
        match self {
            Self::Test => TESTNET_REST_URL,
            Self::Production => PRODUCTION_REST_URL,
        }
    }

    pub const fn default_stream_url(self) -> &'static str {
        match self {
            Self::Test => TESTNET_STREAM_URL,
            Self::Production => PRODUCTION_STREAM_URL,
        }
    }

    const fn credential_vars(self) -> (&'static str, &'static str) {
        match self {
            Self::Test => ("API_KEY_TEST", "SECRET_KEY_TEST"),
            Self::Production => ("API_KEY", "SECRET_KEY"),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Explicit client configuration handed to every component at construction
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub environment: Environment,
    pub rest_base_url: String,
    pub stream_base_url: String,
    pub credential: Credential,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given profile with its default endpoints
    #[must_use]
    pub fn new(environment: Environment, credential: Credential) -> Self {
        Self {
            environment,
            rest_base_url: environment.default_rest_url().to_string(),
            stream_base_url: environment.default_stream_url().to_string(),
            credential,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Configuration for market data only; no signed calls possible
    #[must_use]
    pub fn read_only(environment: Environment) -> Self {
        Self::new(environment, Credential::empty())
    }

    /// Create configuration from environment variables
    ///
    /// - `ENV` (`test` selects the testnet profile, anything else production)
    /// - `API_KEY_TEST` / `SECRET_KEY_TEST` or `API_KEY` / `SECRET_KEY`
    /// - `REST_BASE_URL`, `STREAM_BASE_URL`, `REQUEST_TIMEOUT_MS` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_name(&env::var("ENV").unwrap_or_default());
        let (api_key_var, secret_key_var) = environment.credential_vars();

        let api_key = env::var(api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var.to_string()))?;
        let secret_key = env::var(secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var.to_string()))?;

        let mut config = Self::new(environment, Credential::new(api_key, secret_key));

        if let Ok(url) = env::var("REST_BASE_URL") {
            config.rest_base_url = url;
        }
        if let Ok(url) = env::var("STREAM_BASE_URL") {
            config.stream_base_url = url;
        }
        if let Ok(raw) = env::var("REQUEST_TIMEOUT_MS") {
            let millis = raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidConfiguration(format!(
                    "REQUEST_TIMEOUT_MS must be an integer: {}",
                    e
                ))
            })?;
            config.request_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Load a `.env` file (if present) and then read the environment
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %env_file_path, "No .env file, using process environment");
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env()
    }

    #[must_use]
    pub fn rest_base_url(mut self, url: impl Into<String>) -> Self {
        self.rest_base_url = url.into();
        self
    }

    #[must_use]
    pub fn stream_base_url(mut self, url: impl Into<String>) -> Self {
        self.stream_base_url = url.into();
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credential.is_complete()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_name() {
        assert_eq!(Environment::from_name("test"), Environment::Test);
        assert_eq!(Environment::from_name(" TEST "), Environment::Test);
        assert_eq!(Environment::from_name(""), Environment::Production);
        assert_eq!(Environment::from_name("prod"), Environment::Production);
    }

    #[test]
    fn test_profile_selects_endpoints() {
        let config = ClientConfig::read_only(Environment::Test);
        assert_eq!(config.rest_base_url, TESTNET_REST_URL);
        assert_eq!(config.stream_base_url, TESTNET_STREAM_URL);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(!config.has_credentials());

        let config = ClientConfig::new(Environment::Production, Credential::new("k", "s"))
            .rest_base_url("http://127.0.0.1:9000");
        assert_eq!(config.rest_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.stream_base_url, PRODUCTION_STREAM_URL);
        assert!(config.has_credentials());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("my-api-key", "my-secret");
        let rendered = format!("{:?}", ClientConfig::new(Environment::Test, credential));
        assert!(!rendered.contains("my-api-key"));
        assert!(!rendered.contains("my-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
