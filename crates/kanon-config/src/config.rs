//! Top-level configuration.

use kanon_contract::ValidationConfig;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ContractConfig, LogFormat, LoggingConfig};

/// Complete Kanon configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use kanon_config::KanonConfig;
///
/// let config = KanonConfig::default();
/// assert_eq!(config.contract.file_name, "openapi.yaml");
/// assert!(!config.validation.validate_responses);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct KanonConfig {
    /// Name used in logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Contract location.
    #[serde(default)]
    pub contract: ContractConfig,

    /// Validation policy.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for KanonConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            contract: ContractConfig::default(),
            validation: ValidationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "kanon-service".to_string()
}

impl KanonConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> KanonConfigBuilder {
        KanonConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the service name is empty
    /// - the contract file name is empty or a directory path
    /// - the log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value("service_name", "must not be empty"));
        }

        let file_name = self.contract.file_name.trim();
        if file_name.is_empty() {
            return Err(ConfigError::invalid_value("contract.file_name", "must not be empty"));
        }
        if file_name.contains(['/', '\\']) {
            return Err(ConfigError::invalid_value(
                "contract.file_name",
                format!("expected a file name, got a path: {file_name}"),
            ));
        }

        if self.logging.enabled {
            kanon_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, responses validated.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;

        config.validation = ValidationConfig::with_responses();

        config
    }

    /// Production preset: JSON info logs, request validation only.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;

        config.validation = ValidationConfig::request_only();

        config
    }
}

/// Builder for [`KanonConfig`].
#[derive(Debug, Default)]
pub struct KanonConfigBuilder {
    service_name: Option<String>,
    contract: Option<ContractConfig>,
    validation: Option<ValidationConfig>,
    logging: Option<LoggingConfig>,
}

impl KanonConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service name.
    #[must_use]
    pub fn service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    /// Set the contract location.
    #[must_use]
    pub fn contract(mut self, contract: ContractConfig) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Set the validation policy.
    #[must_use]
    pub fn validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> KanonConfig {
        KanonConfig {
            service_name: self.service_name.unwrap_or_else(default_service_name),
            contract: self.contract.unwrap_or_default(),
            validation: self.validation.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<KanonConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
