//! Configuration loading from a TOML file and environment overrides.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use super::Config;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "covcast.toml";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    Missing(PathBuf),

    /// Configuration validation error.
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{name} has an invalid value: {raw:?}")))
}

impl Config {
    /// Load configuration from a TOML file and the process environment.
    ///
    /// An explicit `path` must exist. Without one, `covcast.toml` in the working
    /// directory is used when present, defaults otherwise. Environment
    /// variables then override file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, an override is
    /// malformed, or the result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if !p.exists() => return Err(ConfigError::Missing(p.to_path_buf())),
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() { Self::from_file(default_path)? } else { Self::default() }
            }
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file; missing sections take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Recognised variables: `LIBRARY_SIZE`, `COV_REG_DATA_URL`,
    /// `COV_NAT_DATA_URL`, `MAX_DAYS_AHEAD`, `MAX_DAYS_BEHIND`, `MODEL_DIR`,
    /// `COVCAST_ADDR`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if a numeric or address value is malformed.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("LIBRARY_SIZE") {
            self.cache.max_capacity = parse_env("LIBRARY_SIZE", &raw)?;
        }
        if let Some(url) = lookup("COV_REG_DATA_URL") {
            self.data.regional_url = Some(url);
        }
        if let Some(url) = lookup("COV_NAT_DATA_URL") {
            self.data.national_url = Some(url);
        }
        if let Some(raw) = lookup("MAX_DAYS_AHEAD") {
            self.validation.max_days_ahead = parse_env("MAX_DAYS_AHEAD", &raw)?;
        }
        if let Some(raw) = lookup("MAX_DAYS_BEHIND") {
            self.validation.max_days_behind = Some(parse_env("MAX_DAYS_BEHIND", &raw)?);
        }
        if let Some(dir) = lookup("MODEL_DIR") {
            self.store.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("COVCAST_ADDR") {
            self.server.address = parse_env("COVCAST_ADDR", &raw)?;
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache
            .validate()
            .map_err(|e| ConfigError::Validation(format!("Invalid cache configuration: {e}")))?;

        if self.validation.available_regions.is_empty() {
            return Err(ConfigError::Validation("available_regions must not be empty".to_string()));
        }
        if self.model.fit.seasonal_period == 0 {
            return Err(ConfigError::Validation("seasonal_period must be at least 1".to_string()));
        }
        if self.data.refresh_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "refresh_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("covcast.toml");
        std::fs::write(
            &path,
            r#"
[server]
address = "0.0.0.0:9000"

[cache]
max_capacity = 5

[model]
kind = "mock"
default_horizon_days = 7

[store]
data_dir = "/var/lib/covcast"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.cache.max_capacity, 5);
        assert_eq!(config.cache.cleanup_interval_secs, 300);
        assert_eq!(config.model.default_horizon_days, 7);
        assert_eq!(config.store.data_dir, PathBuf::from("/var/lib/covcast"));
        assert_eq!(config.validation.max_days_ahead, 90);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "[cache\nmax_capacity = ").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("LIBRARY_SIZE", "4"),
                ("COV_REG_DATA_URL", "http://example.test/reg.csv"),
                ("MAX_DAYS_AHEAD", "30"),
                ("MAX_DAYS_BEHIND", "3"),
                ("MODEL_DIR", "/tmp/models"),
            ]))
            .unwrap();

        assert_eq!(config.cache.max_capacity, 4);
        assert_eq!(config.data.regional_url.as_deref(), Some("http://example.test/reg.csv"));
        assert_eq!(config.validation.max_days_ahead, 30);
        assert_eq!(config.validation.max_days_behind, Some(3));
        assert_eq!(config.store.data_dir, PathBuf::from("/tmp/models"));
    }

    #[test]
    fn test_malformed_env_value_is_error() {
        let mut config = Config::default();
        let result = config.apply_env(env(&[("LIBRARY_SIZE", "many")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_library_size_fails_validation() {
        let mut config = Config::default();
        config.apply_env(env(&[("LIBRARY_SIZE", "0")])).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
