//! Main configuration types.
//!
//! This module provides the top-level [`HermesConfig`] struct and its builder.

use std::net::SocketAddr;

use hermes_dispatcher::DispatcherOptions;
use hermes_telemetry::{logging::create_env_filter, LogFormat, TelemetryConfig};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, DispatchConfig, LoggingConfig, MetricsConfigSection};

/// Complete Hermes configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert!(config.dispatch.keep_alive);
/// assert!(!config.metrics.enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Dispatch behavior.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prometheus metrics.
    #[serde(default)]
    pub metrics: MetricsConfigSection,
}

impl HermesConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> HermesConfigBuilder {
        HermesConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - The log level is not a valid `EnvFilter` directive
    /// - Metrics are enabled and the listen address is not a socket address
    /// - Histogram buckets are empty or not strictly increasing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.enabled {
            create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid("logging.level", e.to_string()))?;
        }

        if self.metrics.enabled {
            if let Some(addr) = &self.metrics.listen_addr {
                if addr.parse::<SocketAddr>().is_err() {
                    return Err(ConfigError::invalid(
                        "metrics.listen_addr",
                        format!("invalid socket address: {addr}"),
                    ));
                }
            }
        }

        let buckets = &self.metrics.duration_buckets;
        if buckets.is_empty() || buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::invalid(
                "metrics.duration_buckets",
                "must be non-empty and strictly increasing",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs with span events and source
    /// locations, no metrics.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    ///
    /// let config = HermesConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.span_events = true;
        config.logging.include_location = true;

        config
    }

    /// Production preset: JSON logs at `info` and the Prometheus recorder.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    /// use hermes_telemetry::LogFormat;
    ///
    /// let config = HermesConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// assert!(config.metrics.enabled);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.metrics.enabled = true;

        config
    }

    /// Telemetry settings for [`hermes_telemetry::init_telemetry`].
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            logging: (&self.logging).into(),
            metrics: (&self.metrics).into(),
        }
    }

    /// Options for [`hermes_dispatcher::Dispatcher::with_options`].
    #[must_use]
    pub fn dispatcher_options(&self) -> DispatcherOptions {
        self.dispatch.into()
    }
}

/// Builder for [`HermesConfig`].
#[derive(Debug, Default)]
pub struct HermesConfigBuilder {
    dispatch: Option<DispatchConfig>,
    logging: Option<LoggingConfig>,
    metrics: Option<MetricsConfigSection>,
}

impl HermesConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatch section.
    #[must_use]
    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the metrics section.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfigSection) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> HermesConfig {
        HermesConfig {
            dispatch: self.dispatch.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<HermesConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
