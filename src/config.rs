//! Configuration structures for the authentication engine.
//!
//! This module defines the configuration file format using YAML. The
//! configuration is split into two sections: homeserver settings and HTTP
//! transport settings. Every value has a default, so an empty file or no
//! file at all is valid.
//!
//! # Configuration File Format
//!
//! ```yaml
//! # Homeserver Configuration
//! homeserver:
//!   # Homeserver used before any explicit negotiation
//!   default_url: "https://matrix.org"
//!
//! # HTTP Transport Configuration
//! http:
//!   # Request timeout in seconds
//!   timeout: 30
//! ```
//!
//! # Environment Variable Overrides
//!
//! Any value can be overridden with a `VESTIBULE_`-prefixed environment
//! variable, using `__` as the section separator:
//!
//! ```bash
//! export VESTIBULE_HOMESERVER__DEFAULT_URL="https://example.org"
//! export VESTIBULE_HTTP__TIMEOUT=10
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

/// Root configuration structure for the authentication engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Homeserver configuration
    #[serde(default)]
    pub homeserver: Homeserver,
    /// HTTP transport configuration
    #[serde(default)]
    pub http: Http,
}

/// Homeserver configuration.
///
/// # YAML Section
///
/// ```yaml
/// homeserver:
///   default_url: "https://matrix.org"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Homeserver {
    /// Homeserver targeted before any explicit negotiation.
    ///
    /// A missing scheme is interpreted as `https://`.
    pub default_url: String,
}

impl Default for Homeserver {
    fn default() -> Homeserver {
        Homeserver {
            default_url: "https://matrix.org".to_string(),
        }
    }
}

/// HTTP transport configuration.
///
/// # YAML Section
///
/// ```yaml
/// http:
///   timeout: 30
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Http {
    /// Timeout in seconds applied to every homeserver request.
    pub timeout: u64,
}

impl Default for Http {
    fn default() -> Http {
        Http { timeout: 30 }
    }
}

impl Config {
    /// Load the configuration from a YAML file, applying environment
    /// variable overrides on top and defaults underneath.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file. The file may be
    ///   absent; defaults and environment variables then apply alone.
    pub fn load(path: &str) -> Result<Config, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("VESTIBULE_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.homeserver.default_url, "https://matrix.org");
        assert_eq!(config.http.timeout, 30);
    }

    #[test]
    #[serial]
    fn test_load_without_file_uses_defaults() {
        let config = Config::load("does-not-exist.yaml").unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "homeserver:\n  default_url: \"https://example.org\"\nhttp:\n  timeout: 10\n"
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.homeserver.default_url, "https://example.org");
        assert_eq!(config.http.timeout, 10);
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "homeserver:\n  default_url: \"https://example.org\"\n").unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.homeserver.default_url, "https://example.org");
        assert_eq!(config.http.timeout, 30);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "homeserver:\n  default_url: \"https://example.org\"\n"
        )
        .unwrap();

        unsafe {
            std::env::set_var("VESTIBULE_HOMESERVER__DEFAULT_URL", "https://override.org");
        }
        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        unsafe {
            std::env::remove_var("VESTIBULE_HOMESERVER__DEFAULT_URL");
        }

        assert_eq!(config.homeserver.default_url, "https://override.org");
    }
}
