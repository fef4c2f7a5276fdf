//! Client configuration
//!
//! Settings are layered: built-in defaults, then an optional
//! `defect-control.toml` in the working directory, then `DEFECT_*` environment
//! variables. A `.env` file is loaded first when present.
//!
//! # Environment Variables
//!
//! - `DEFECT_API_URL`: API root (default: `http://localhost:8080/api/v1`)
//! - `DEFECT_TOKEN_PATH`: Bearer token file (default: `.defect-control/token`)
//! - `DEFECT_SEARCH_DEBOUNCE_MS`: Assignee search quiescence delay (default: 300)
//! - `DEFECT_UPLOAD_CHUNK_SIZE`: Multipart streaming chunk size in bytes (default: 65536)
//!
//! # Example
//!
//! ```no_run
//! use defect_control_client::config::ClientConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::load()?;
//! println!("Talking to {}", config.api_url);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Default API root
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";

/// Default token file location, relative to the working directory
pub const DEFAULT_TOKEN_PATH: &str = ".defect-control/token";

/// Default assignee search debounce in milliseconds
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// Default multipart chunk size in bytes
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or a value has the wrong type
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// `api_url` is not an absolute http(s) URL
    #[error("Invalid api_url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root every request path is appended to
    pub api_url: String,

    /// File holding the persisted bearer token
    pub token_path: PathBuf,

    /// Quiescence delay before an assignee search fires
    pub search_debounce_ms: u64,

    /// Bytes per streamed multipart chunk
    pub upload_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `.env`, `defect-control.toml` and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_sources(Some("defect-control"), Environment::with_prefix("DEFECT").try_parsing(true))
    }

    /// Builds configuration from an optional file stem and an environment source
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value is invalid.
    pub fn from_sources(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let defaults = ClientConfig::default();

        let mut builder = Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("token_path", DEFAULT_TOKEN_PATH)?
            .set_default("search_debounce_ms", defaults.search_debounce_ms)?
            .set_default("upload_chunk_size", defaults.upload_chunk_size as u64)?;

        if let Some(stem) = file {
            builder = builder.add_source(File::with_name(stem).required(false));
        }

        let config: ClientConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            api_url = %config.api_url,
            token_path = %config.token_path.display(),
            "Client configuration loaded"
        );

        Ok(config)
    }

    /// Checks value ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` for a non-http(s) API root and
    /// `ConfigError::Invalid` for a zero chunk size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        if self.upload_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "upload_chunk_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parses the API root, normalized to end with `/`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` when the value is not an absolute
    /// http or https URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidUrl {
            url: self.api_url.clone(),
            reason,
        };

        let mut raw = self.api_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }

        let url = Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }

        Ok(url)
    }

    /// Assignee search debounce as a duration
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}
