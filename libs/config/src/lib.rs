//! # Momentum Analyzer Configuration
//!
//! Centralized configuration loading and default values for the momentum
//! analyzer services.
//!
//! ## Features
//!
//! - **Layered Loading**: compiled-in defaults, then an optional TOML file,
//!   then `MOMENTUM__*` environment overrides
//! - **Path Expansion**: `~` and `$VAR` in configured paths
//! - **Service Defaults**: market, store, indicator and rule constants
//!
//! ## Usage
//!
//! ```rust,no_run
//! use momentum_config::{load_layered, resolve_config_path, service};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Settings {
//!     symbol: String,
//! }
//!
//! let path = resolve_config_path(service::logging::CONFIG_PATH_ENV, service::logging::DEFAULT_CONFIG_PATH);
//! let settings: Settings = load_layered(Some(&path), &Settings::default(), service::logging::ENV_PREFIX, &[])?;
//! # Ok::<(), momentum_config::ConfigError>(())
//! ```

pub mod service;
pub mod service_config;

pub use service_config::{
    expand_path, load_layered, render_toml, resolve_config_path, ConfigError, Result,
};
