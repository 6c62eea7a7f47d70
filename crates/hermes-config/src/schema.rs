//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use hermes_dispatcher::DispatcherOptions;
use hermes_telemetry::{LogConfig, LogFormat, MetricsConfig};
use serde::{Deserialize, Serialize};

/// Dispatch behavior section.
///
/// # Example
///
/// ```
/// use hermes_config::DispatchConfig;
///
/// let config: DispatchConfig = toml::from_str("keep_alive = false").unwrap();
/// assert!(!config.keep_alive);
/// assert!(!config.trust_request_id);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Keep HTTP/1.x connections open between requests.
    #[serde(default = "default_true")]
    pub keep_alive: bool,

    /// Reuse a valid UUID from an inbound `x-request-id` header as the
    /// request id.
    #[serde(default)]
    pub trust_request_id: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            trust_request_id: false,
        }
    }
}

impl From<DispatchConfig> for DispatcherOptions {
    fn from(config: DispatchConfig) -> Self {
        Self {
            keep_alive: config.keep_alive,
            trust_request_id: config.trust_request_id,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install a subscriber at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `EnvFilter` directive (e.g. `info`, `hermes_dispatcher=debug,warn`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,

    /// Include thread IDs in logs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include the event target.
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            include_location: false,
            thread_ids: false,
            include_target: true,
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.enabled,
            level: config.level.clone(),
            format: config.format,
            span_events: config.span_events,
            file_line_info: config.include_location,
            thread_ids: config.thread_ids,
            include_target: config.include_target,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfigSection {
    /// Install the Prometheus recorder.
    #[serde(default)]
    pub enabled: bool,

    /// Scrape endpoint address. Unset means recorder only.
    #[serde(default)]
    pub listen_addr: Option<String>,

    /// Histogram bucket boundaries for dispatch duration, in seconds.
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfigSection {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: None,
            duration_buckets: default_duration_buckets(),
        }
    }
}

impl From<&MetricsConfigSection> for MetricsConfig {
    fn from(config: &MetricsConfigSection) -> Self {
        Self {
            enabled: config.enabled,
            listen_addr: config.listen_addr.clone(),
            duration_buckets: config.duration_buckets.clone(),
        }
    }
}

fn default_duration_buckets() -> Vec<f64> {
    MetricsConfig::default().duration_buckets
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_config_default() {
        let config = DispatchConfig::default();
        assert!(config.keep_alive);
        assert!(!config.trust_request_id);
    }

    #[test]
    fn test_dispatch_config_into_options() {
        let options = DispatcherOptions::from(DispatchConfig {
            keep_alive: false,
            trust_request_id: true,
        });
        assert!(!options.keep_alive);
        assert!(options.trust_request_id);
    }

    #[test]
    fn test_dispatch_config_unknown_field_rejected() {
        let result: Result<DispatchConfig, _> = toml::from_str("catch_panics = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_logging_config_deserialize() {
        let toml = r#"
            level = "hermes_dispatcher=debug,warn"
            format = "compact"
            include_location = true
        "#;
        let config: LoggingConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.format, LogFormat::Compact);

        let log = LogConfig::from(&config);
        assert_eq!(log.level, "hermes_dispatcher=debug,warn");
        assert!(log.file_line_info);
        assert!(log.include_target);
    }

    #[test]
    fn test_metrics_section_default() {
        let config = MetricsConfigSection::default();
        assert!(!config.enabled);
        assert!(config.listen_addr.is_none());
        assert_eq!(
            config.duration_buckets,
            MetricsConfig::default().duration_buckets
        );
    }

    #[test]
    fn test_metrics_section_into_telemetry() {
        let section = MetricsConfigSection {
            enabled: true,
            listen_addr: Some("127.0.0.1:9100".to_string()),
            duration_buckets: vec![0.01, 0.1, 1.0],
        };
        let metrics = MetricsConfig::from(&section);
        assert!(metrics.enabled);
        assert_eq!(metrics.listen_addr.as_deref(), Some("127.0.0.1:9100"));
        assert_eq!(metrics.duration_buckets.len(), 3);
    }
}
