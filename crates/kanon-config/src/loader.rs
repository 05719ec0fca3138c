//! Layered configuration loading.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{ConfigError, KanonConfig, LogFormat};

/// Configuration loader.
///
/// Later layers override earlier ones:
/// 1. Default values (or a preset)
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use kanon_config::ConfigLoader;
///
/// # fn main() -> Result<(), kanon_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("kanon.toml")?
///     .with_env_prefix("KANON")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: KanonConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: KanonConfig::default(),
            env_prefix: None,
        }
    }

    /// Reset to the default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = KanonConfig::default();
        self
    }

    /// Start from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = KanonConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = KanonConfig::production();
        self
    }

    /// Load configuration from a `.toml` or `.json` file.
    ///
    /// The file replaces the current layer. Sections it omits take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format
    /// (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use kanon_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [contract]
    ///     file_name = "orders.yaml"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.contract.file_name, "orders.yaml");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        Ok(self)
    }

    /// Read overrides from `PREFIX__SECTION__FIELD` environment variables.
    ///
    /// Recognised keys, shown with prefix `KANON`:
    /// - `KANON__SERVICE_NAME`
    /// - `KANON__CONTRACT__FILE_PATH`, `KANON__CONTRACT__FILE_NAME`
    /// - `KANON__VALIDATION__VALIDATE_RESPONSES`,
    ///   `KANON__VALIDATION__REJECT_UNEXPLAINED_FAILURES`
    /// - `KANON__LOGGING__ENABLED`, `KANON__LOGGING__LEVEL`,
    ///   `KANON__LOGGING__FORMAT`, `KANON__LOGGING__INCLUDE_LOCATION`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or the result
    /// fails [`KanonConfig::validate`].
    pub fn load(mut self) -> Result<KanonConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: HashMap<String, String> = env::vars()
                .filter(|(key, _)| key.starts_with(&prefix))
                .collect();
            self.apply_env_overrides(&prefix, vars)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> KanonConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<KanonConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn apply_env_overrides(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            // Shares the prefix but not the separator, e.g. `KANONX`.
            return Ok(());
        };

        let parts: Vec<&str> = rest.split("__").collect();
        let flag = || parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"));

        match parts.as_slice() {
            ["SERVICE_NAME"] => self.config.service_name = value.to_string(),

            ["CONTRACT", "FILE_PATH"] => self.config.contract.file_path = PathBuf::from(value),
            ["CONTRACT", "FILE_NAME"] => self.config.contract.file_name = value.to_string(),

            ["VALIDATION", "VALIDATE_RESPONSES"] => {
                self.config.validation.validate_responses = flag()?;
            }
            ["VALIDATION", "REJECT_UNEXPLAINED_FAILURES"] => {
                self.config.validation.reject_unexplained_failures = flag()?;
            }

            ["LOGGING", "ENABLED"] => self.config.logging.enabled = flag()?,
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::env_parse_error(key, "expected 'json' or 'pretty'")),
                };
            }
            ["LOGGING", "INCLUDE_LOCATION"] => self.config.logging.include_location = flag()?,

            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
