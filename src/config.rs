//! Layered configuration for the rate chain
//!
//! Precedence (lowest to highest):
//! 1. Programmatic defaults
//! 2. YAML file (`ratechain.yaml` in the working directory, or `--config`)
//! 3. Environment variables (`RATECHAIN_` prefix)
//! 4. Command-line overrides applied by the binary

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::FileTier;
use crate::data::openexchangerates::OPEN_EXCHANGE_RATES_URL;

/// Config file looked up when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "ratechain.yaml";

/// Template used when no XDG cache directory is available
const FALLBACK_CACHE_FILE: &str = "./data/exchange-rates.json";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("No API key configured. Set RATECHAIN_APP_ID or pass --app-id")]
    MissingAppId,

    #[error("Invalid {0}: must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Invalid provider URL: '{0}'. Must start with http:// or https://")]
    InvalidProviderUrl(String),
}

/// Settings consumed by the chain, the remote client and the HTTP endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Open Exchange Rates app id
    pub app_id: String,
    /// Template path for per-base cache files; XDG cache dir when unset
    pub cache_file: Option<PathBuf>,
    /// Memory tier TTL in seconds
    pub memory_ttl_secs: u64,
    /// File tier TTL in seconds
    pub file_ttl_secs: u64,
    /// Provider root URL
    pub provider_url: String,
    /// Remote request timeout in seconds
    pub request_timeout_secs: u64,
    /// Address the HTTP endpoint binds to
    pub listen: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            cache_file: None,
            memory_ttl_secs: 3600,     // 1 hour
            file_ttl_secs: 4 * 3600,   // 4 hours
            provider_url: OPEN_EXCHANGE_RATES_URL.to_string(),
            request_timeout_secs: 10,
            listen: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from defaults, the YAML file and the environment
    ///
    /// A missing YAML file is not an error.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("RATECHAIN_"))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Resolved template path for the file tier
    pub fn cache_file_template(&self) -> PathBuf {
        self.cache_file
            .clone()
            .or_else(FileTier::default_template)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_CACHE_FILE))
    }

    /// Validates settings after loading
    ///
    /// `require_app_id` is false for callers that never reach the remote tier.
    pub fn validate(&self, require_app_id: bool) -> Result<(), ConfigError> {
        if require_app_id && self.app_id.trim().is_empty() {
            return Err(ConfigError::MissingAppId);
        }

        if self.memory_ttl_secs == 0 {
            return Err(ConfigError::ZeroDuration("memory_ttl_secs"));
        }
        if self.file_ttl_secs == 0 {
            return Err(ConfigError::ZeroDuration("file_ttl_secs"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("request_timeout_secs"));
        }

        if !(self.provider_url.starts_with("http://") || self.provider_url.starts_with("https://")) {
            return Err(ConfigError::InvalidProviderUrl(self.provider_url.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.memory_ttl_secs, 3600);
        assert_eq!(settings.file_ttl_secs, 14400);
        assert_eq!(settings.provider_url, "https://openexchangerates.org");
        assert!(settings.validate(false).is_ok());
    }

    #[test]
    fn test_validate_requires_app_id_when_asked() {
        let settings = Settings::default();
        assert!(matches!(
            settings.validate(true),
            Err(ConfigError::MissingAppId)
        ));

        let settings = Settings {
            app_id: "abc".to_string(),
            ..Default::default()
        };
        assert!(settings.validate(true).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_ttls() {
        let settings = Settings {
            file_ttl_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(false),
            Err(ConfigError::ZeroDuration("file_ttl_secs"))
        ));
    }

    #[test]
    fn test_validate_rejects_non_http_provider() {
        let settings = Settings {
            provider_url: "ftp://rates.example".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(false),
            Err(ConfigError::InvalidProviderUrl(_))
        ));
    }

    #[test]
    fn test_explicit_cache_file_wins() {
        let settings = Settings {
            cache_file: Some(PathBuf::from("/tmp/rates/fx.json")),
            ..Default::default()
        };
        assert_eq!(
            settings.cache_file_template(),
            PathBuf::from("/tmp/rates/fx.json")
        );
    }

    #[test]
    fn test_load_merges_yaml_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
app_id: from-file
memory_ttl_secs: 60
cache_file: ./cache/rates.json
"#,
            )?;
            jail.set_env("RATECHAIN_APP_ID", "from-env");

            let settings = Settings::load(None).expect("settings should load");

            assert_eq!(settings.app_id, "from-env");
            assert_eq!(settings.memory_ttl_secs, 60);
            assert_eq!(settings.file_ttl_secs, 14400);
            assert_eq!(settings.cache_file, Some(PathBuf::from("./cache/rates.json")));
            Ok(())
        });
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let settings = Settings::load(Some(Path::new("missing.yaml"))).expect("should load");
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_reports_bad_types() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.yaml", "memory_ttl_secs: soon")?;

            let result = Settings::load(Some(Path::new("bad.yaml")));

            assert!(matches!(result, Err(ConfigError::Load(_))));
            Ok(())
        });
    }
}
