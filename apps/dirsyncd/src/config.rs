//! Daemon configuration loading and types.

use dirsync_core::GroupMapping;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub okta: OktaSettings,
    pub grafana: GrafanaSettings,
    pub sync: SyncSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Identity-source (Okta) connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OktaSettings {
    /// Org domain, e.g. `acme.okta.com`.
    pub domain: String,
    /// Static SSWS API token. Mutually exclusive with `oauth`.
    #[serde(default)]
    pub api_token: Option<String>,
    /// OAuth2 client-credentials settings. Mutually exclusive with
    /// `api_token`.
    #[serde(default)]
    pub oauth: Option<OktaOAuthSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OktaOAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Directory-sink (Grafana) connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GrafanaSettings {
    pub url: String,
    pub api_key: String,
}

/// Reconciliation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default)]
    pub dry_run: bool,
    pub mappings: Vec<GroupMapping>,
    /// Source groups whose union of members holds the sink admin flag.
    /// Empty disables the admin sweep.
    #[serde(default)]
    pub admin_groups: Vec<String>,
}

fn default_interval_seconds() -> u64 {
    300
}

const MIN_INTERVAL_SECONDS: u64 = 60;

/// Metrics/health server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_host")]
    pub host: String,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            host: default_metrics_host(),
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_host() -> String {
    "0.0.0.0".to_string()
}

fn default_metrics_port() -> u16 {
    8000
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `"json"` or `"text"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl AppConfig {
    /// Load configuration from a YAML file, expand `${VAR}` references from
    /// the environment, apply env overrides, and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        let mut config: Self = serde_yaml::from_str(&expanded)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of the file.
    fn apply_env_overrides(&mut self) {
        if let Ok(domain) = std::env::var("OKTA_DOMAIN") {
            self.okta.domain = domain;
        }
        if let Ok(token) = std::env::var("OKTA_API_TOKEN") {
            self.okta.api_token = Some(token);
        }
        if let Ok(url) = std::env::var("GRAFANA_URL") {
            self.grafana.url = url;
        }
        if let Ok(key) = std::env::var("GRAFANA_API_KEY") {
            self.grafana.api_key = key;
        }
        if let Ok(interval) = std::env::var("SYNC_INTERVAL_SECONDS") {
            if let Ok(interval) = interval.parse() {
                self.sync.interval_seconds = interval;
            }
        }
        if let Ok(dry_run) = std::env::var("SYNC_DRY_RUN") {
            self.sync.dry_run = matches!(dry_run.as_str(), "1" | "true" | "yes");
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(port) = std::env::var("METRICS_PORT") {
            if let Ok(port) = port.parse() {
                self.metrics.port = port;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.okta.domain.trim().is_empty() {
            return Err(ConfigError::Invalid("okta.domain must be set".to_string()));
        }
        match (&self.okta.api_token, &self.okta.oauth) {
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "either okta.api_token or okta.oauth must be set".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "okta.api_token and okta.oauth are mutually exclusive".to_string(),
                ));
            }
            _ => {}
        }
        if self.grafana.url.trim().is_empty() {
            return Err(ConfigError::Invalid("grafana.url must be set".to_string()));
        }
        if self.grafana.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "grafana.api_key must be set".to_string(),
            ));
        }
        if self.sync.mappings.is_empty() {
            return Err(ConfigError::Invalid(
                "sync.mappings must contain at least one mapping".to_string(),
            ));
        }
        if self.sync.interval_seconds < MIN_INTERVAL_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "sync.interval_seconds must be at least {MIN_INTERVAL_SECONDS}"
            )));
        }
        Ok(())
    }
}

/// Replace `${VAR}` references with their environment values.
///
/// Unset variables expand to the empty string, matching shell behavior, so
/// validation catches a missing credential instead of the API rejecting a
/// literal `${GRAFANA_API_KEY}`.
fn expand_env_vars(content: &str) -> String {
    let re = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    re.replace_all(content, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsync_core::Role;

    fn base_yaml() -> &'static str {
        r#"
okta:
  domain: acme.okta.com
  api_token: tok

grafana:
  url: https://grafana.example.com
  api_key: key

sync:
  mappings:
    - source_group: Engineering
      sink_team: Engineers
      role: Editor
    - source_group: Support
      sink_team: Support Team
  admin_groups:
    - Grafana-Admins
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_yaml(base_yaml()).unwrap();
        assert_eq!(config.okta.domain, "acme.okta.com");
        assert_eq!(config.sync.interval_seconds, 300);
        assert!(!config.sync.dry_run);
        assert_eq!(config.sync.mappings.len(), 2);
        assert_eq!(config.sync.mappings[0].role, Role::Editor);
        assert_eq!(config.sync.mappings[1].role, Role::Viewer);
        assert_eq!(config.sync.admin_groups, vec!["Grafana-Admins"]);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 8000);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("TEST_DIRSYNC_TOKEN", "expanded-token");
        let yaml = r#"
okta:
  domain: acme.okta.com
  api_token: ${TEST_DIRSYNC_TOKEN}

grafana:
  url: https://grafana.example.com
  api_key: key

sync:
  mappings:
    - source_group: Engineering
      sink_team: Engineers
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.okta.api_token.as_deref(), Some("expanded-token"));
        std::env::remove_var("TEST_DIRSYNC_TOKEN");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let yaml = r#"
okta:
  domain: acme.okta.com

grafana:
  url: https://grafana.example.com
  api_key: key

sync:
  mappings:
    - source_group: Engineering
      sink_team: Engineers
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_mappings_rejected() {
        let yaml = r#"
okta:
  domain: acme.okta.com
  api_token: tok

grafana:
  url: https://grafana.example.com
  api_key: key

sync:
  mappings: []
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_interval_floor_enforced() {
        let yaml = r#"
okta:
  domain: acme.okta.com
  api_token: tok

grafana:
  url: https://grafana.example.com
  api_key: key

sync:
  interval_seconds: 10
  mappings:
    - source_group: Engineering
      sink_team: Engineers
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
