//! Typed configuration for Hermes.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → files → env)
//!
//! [`HermesConfig`] has three sections:
//!
//! - [`DispatchConfig`] - connection framing and request id handling
//! - [`LoggingConfig`] - the `tracing` subscriber
//! - [`MetricsConfigSection`] - the Prometheus recorder
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//! use hermes_dispatcher::{Dispatcher, Registry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_production()
//!     .with_optional_file("hermes.toml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! hermes_telemetry::init_telemetry(&config.telemetry())?;
//! let dispatcher = Dispatcher::with_options(Registry::default(), config.dispatcher_options());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [dispatch]
//! keep_alive = true
//! trust_request_id = false
//!
//! [logging]
//! level = "info,hermes_dispatcher=debug"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! listen_addr = "0.0.0.0:9090"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every key can be overridden with `PREFIX__SECTION__KEY`:
//!
//! - `HERMES__DISPATCH__KEEP_ALIVE=false`
//! - `HERMES__LOGGING__LEVEL=debug`
//! - `HERMES__METRICS__LISTEN_ADDR=0.0.0.0:9100`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{HermesConfig, HermesConfigBuilder};
pub use error::{ConfigError, EnvProblem};
pub use loader::ConfigLoader;
pub use schema::{DispatchConfig, LoggingConfig, MetricsConfigSection};
