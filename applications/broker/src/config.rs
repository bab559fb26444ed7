/// Broker configuration
use crate::error::{BrokerError, Result};
use hub_playback::{AdmissionConfig, NavigationConfig};
use hub_session::{ArbitrationPolicy, BrokerOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "hub-broker.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub arbitration: ArbitrationPolicy,

    #[serde(default)]
    pub admission: AdmissionConfig,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Default `tracing` filter, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "hub_broker=info,hub_session=info,hub_playback=info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl BrokerConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `hub-broker.toml` in the
    /// working directory is read if present. Environment variables prefixed
    /// `HUB_` override the file, with `__` between nested keys
    /// (`HUB_NAVIGATION__RESTART_THRESHOLD_MS=3000`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(true),
            ),
            None => settings.add_source(
                config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            ),
        };

        // Override with environment variables (prefixed with HUB_)
        settings = settings.add_source(
            config::Environment::with_prefix("HUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("arbitration.restricted_outputs")
                .with_list_parse_key("admission.allowed_schemes"),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.arbitration.message_buffer == 0 {
            return Err(BrokerError::Config(
                "arbitration.message_buffer must be at least 1".to_string(),
            ));
        }

        if self.admission.allowed_schemes.is_empty() {
            return Err(BrokerError::Config(
                "admission.allowed_schemes must name at least one scheme".to_string(),
            ));
        }

        if let Some(scheme) = self
            .admission
            .allowed_schemes
            .iter()
            .find(|s| s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)))
        {
            return Err(BrokerError::Config(format!(
                "admission.allowed_schemes contains invalid scheme {scheme:?}"
            )));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(BrokerError::Config("logging.filter is empty".to_string()));
        }

        Ok(())
    }

    /// Options for `MediaBroker::start`
    pub fn broker_options(&self) -> BrokerOptions {
        BrokerOptions {
            navigation: self.navigation.clone(),
            admission: self.admission.clone(),
            policy: self.arbitration.clone(),
        }
    }

    /// Render as TOML, for `check-config`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BrokerError::Config(e.to_string()))
    }
}
