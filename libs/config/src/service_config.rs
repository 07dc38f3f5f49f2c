//! Service Configuration Module
//!
//! Loads configuration in three layers: compiled-in defaults, an optional TOML
//! file, and environment variable overrides. Any serde type can be loaded this
//! way; the analyzer's own settings structs live with the service that owns
//! them.

use config_crate::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to build configuration: {0}")]
    Load(#[from] config_crate::ConfigError),

    #[error("Failed to expand path '{path}': {message}")]
    PathExpansion { path: String, message: String },

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Pick the config file path from `env_var`, falling back to `default`
pub fn resolve_config_path(env_var: &str, default: &str) -> PathBuf {
    match std::env::var(env_var) {
        Ok(path) if !path.trim().is_empty() => {
            debug!("Using config path from {}: {}", env_var, path);
            PathBuf::from(path)
        }
        _ => PathBuf::from(default),
    }
}

/// Load `T` from defaults, an optional TOML file, then `{PREFIX}__SECTION__KEY`
/// environment variables.
///
/// A missing file is not an error; the defaults (and environment) apply.
/// Environment values for the dotted keys in `list_keys` are split on commas,
/// e.g. `{PREFIX}__MARKET__TIMEFRAMES=1h,4h` for `market.timeframes`.
pub fn load_layered<T>(
    path: Option<&Path>,
    defaults: &T,
    env_prefix: &str,
    list_keys: &[&str],
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut builder = Config::builder().add_source(Config::try_from(defaults)?);

    if let Some(path) = path {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        } else {
            info!("No configuration file at {:?}, using defaults", path);
        }
    }

    let mut environment = Environment::with_prefix(env_prefix)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true);
    // A separator with no parse keys splits every value
    if !list_keys.is_empty() {
        environment = list_keys
            .iter()
            .fold(environment.list_separator(","), |env, key| env.with_list_parse_key(key));
    }
    builder = builder.add_source(environment);

    let config = builder.build()?;
    Ok(config.try_deserialize()?)
}

/// Expand `~` and `$VAR` references in a configured path
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| ConfigError::PathExpansion {
            path: raw.to_string(),
            message: e.to_string(),
        })
}

/// Render a settings value as pretty TOML, e.g. to print the effective config
pub fn render_toml<T: Serialize>(value: &T) -> Result<String> {
    Ok(toml::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        store: StoreSection,
        market: MarketSection,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct StoreSection {
        database_path: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct MarketSection {
        symbol: String,
        update_limit: usize,
        timeframes: Vec<String>,
    }

    fn defaults() -> Sample {
        Sample {
            store: StoreSection {
                database_path: "./data/db.json".to_string(),
            },
            market: MarketSection {
                symbol: "BTC-USDT".to_string(),
                update_limit: 10,
                timeframes: vec!["1h".to_string()],
            },
        }
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let loaded: Sample = load_layered(Some(&missing), &defaults(), "MOMENTUM_TEST_MISSING", &[]).unwrap();
        assert_eq!(loaded, defaults());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("momentum.toml");

        let config_content = r#"
[market]
symbol = "ETH-USDT"
"#;
        fs::write(&config_path, config_content).unwrap();

        let loaded: Sample = load_layered(Some(&config_path), &defaults(), "MOMENTUM_TEST_FILE", &[]).unwrap();
        assert_eq!(loaded.market.symbol, "ETH-USDT");
        assert_eq!(loaded.market.update_limit, 10);
        assert_eq!(loaded.store.database_path, "./data/db.json");
    }

    #[test]
    fn test_environment_overrides_file() {
        std::env::set_var("MOMENTUM_TEST_ENV__MARKET__UPDATE_LIMIT", "25");

        let loaded: Sample = load_layered(None, &defaults(), "MOMENTUM_TEST_ENV", &[]).unwrap();
        assert_eq!(loaded.market.update_limit, 25);

        std::env::remove_var("MOMENTUM_TEST_ENV__MARKET__UPDATE_LIMIT");
    }

    #[test]
    fn test_environment_overrides_list_keys() {
        std::env::set_var("MOMENTUM_TEST_LIST__MARKET__TIMEFRAMES", "1h,4h");
        std::env::set_var("MOMENTUM_TEST_LIST__STORE__DATABASE_PATH", "./a,b/db.json");

        let loaded: Sample =
            load_layered(None, &defaults(), "MOMENTUM_TEST_LIST", &["market.timeframes"]).unwrap();
        assert_eq!(loaded.market.timeframes, vec!["1h".to_string(), "4h".to_string()]);
        assert_eq!(loaded.store.database_path, "./a,b/db.json");

        std::env::remove_var("MOMENTUM_TEST_LIST__MARKET__TIMEFRAMES");
        std::env::remove_var("MOMENTUM_TEST_LIST__STORE__DATABASE_PATH");
    }

    #[test]
    fn test_expand_path() {
        std::env::set_var("MOMENTUM_TEST_DATA_DIR", "/var/lib/momentum");
        let path = expand_path("$MOMENTUM_TEST_DATA_DIR/db.json").unwrap();
        assert_eq!(path, PathBuf::from("/var/lib/momentum/db.json"));

        assert!(matches!(
            expand_path("$MOMENTUM_TEST_UNSET_VARIABLE/db.json"),
            Err(ConfigError::PathExpansion { .. })
        ));
    }

    #[test]
    fn test_render_toml() {
        let rendered = render_toml(&defaults()).unwrap();
        assert!(rendered.contains("[market]"));
        assert!(rendered.contains("symbol = \"BTC-USDT\""));
    }

    #[test]
    fn test_resolve_config_path_default() {
        let path = resolve_config_path("MOMENTUM_TEST_UNSET_CONFIG_PATH", "configs/momentum.toml");
        assert_eq!(path, PathBuf::from("configs/momentum.toml"));
    }
}
