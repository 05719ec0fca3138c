//! Service bootstrap: configuration, logging, contract and pipeline.

use std::sync::Arc;

use kanon_config::{ConfigError, KanonConfig};
use kanon_contract::{Contract, ContractError, ContractLoader, ValidationReporter};
use kanon_middleware::stages::{OpenApiValidator, RequestIdMiddleware};
use kanon_middleware::Pipeline;
use kanon_telemetry::TelemetryError;
use thiserror::Error;
use tracing::info;

/// Failure to bring a Kanon service up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The contract could not be loaded.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Logging could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// A loaded contract together with the configuration it is enforced with.
///
/// # Example
///
/// ```ignore
/// use kanon::{Kanon, KanonConfig};
///
/// let kanon = Kanon::from_config(KanonConfig::production()).await?;
/// kanon.init_logging()?;
///
/// let pipeline = kanon.pipeline();
/// let response = pipeline.handle(request, handler).await;
/// ```
#[derive(Debug, Clone)]
pub struct Kanon {
    config: KanonConfig,
    contract: Arc<Contract>,
    reporter: Option<Arc<dyn ValidationReporter>>,
}

impl Kanon {
    /// Validates `config` and loads the contract it points at.
    pub async fn from_config(config: KanonConfig) -> Result<Self, BootstrapError> {
        config.validate()?;
        let contract = ContractLoader::from_file(config.contract.path()).await?;
        info!(
            service.name = %config.service_name,
            contract.title = contract.title(),
            contract.version = contract.version(),
            routes = contract.route_count(),
            "contract loaded"
        );
        Ok(Self::from_contract(config, Arc::new(contract)))
    }

    /// Uses an already loaded contract.
    pub fn from_contract(config: KanonConfig, contract: Arc<Contract>) -> Self {
        Self {
            config,
            contract,
            reporter: None,
        }
    }

    /// Sends validation events to `reporter` instead of `tracing`.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ValidationReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Installs the global subscriber described by the logging section.
    pub fn init_logging(&self) -> Result<(), BootstrapError> {
        let log_config = self.config.logging.to_log_config(&self.config.service_name);
        kanon_telemetry::init_logging(&log_config)?;
        Ok(())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &KanonConfig {
        &self.config
    }

    /// Returns the contract.
    pub fn contract(&self) -> &Arc<Contract> {
        &self.contract
    }

    /// Builds the request pipeline: request ID, then contract validation.
    pub fn pipeline(&self) -> Pipeline {
        let mut validator =
            OpenApiValidator::from_config(Arc::clone(&self.contract), self.config.validation);
        if let Some(reporter) = &self.reporter {
            validator = validator.with_reporter(Arc::clone(reporter));
        }

        Pipeline::builder()
            .add_pre_handler_stage(RequestIdMiddleware::new())
            .add_pre_handler_stage(validator)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanon_config::ContractConfig;
    use std::io::Write;

    const CONTRACT: &str = r#"{
        "openapi": "3.0.3",
        "info": {"title": "Pets", "version": "2.1.0"},
        "paths": {
            "/pets": {"get": {"operationId": "listPets", "responses": {"200": {"description": "ok"}}}}
        }
    }"#;

    fn config_for(dir: &std::path::Path, file_name: &str) -> KanonConfig {
        KanonConfig::builder()
            .service_name("pets")
            .contract(ContractConfig {
                file_path: dir.to_path_buf(),
                file_name: file_name.to_string(),
            })
            .build()
    }

    #[tokio::test]
    async fn test_from_config_loads_contract() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("pets.json")).unwrap();
        file.write_all(CONTRACT.as_bytes()).unwrap();

        let kanon = Kanon::from_config(config_for(dir.path(), "pets.json")).await.unwrap();

        assert_eq!(kanon.contract().title(), "Pets");
        assert_eq!(kanon.contract().route_count(), 1);
        assert_eq!(
            kanon.pipeline().stage_names(),
            vec!["request_id", "openapi_validator"]
        );
    }

    #[tokio::test]
    async fn test_missing_contract_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Kanon::from_config(config_for(dir.path(), "absent.yaml"))
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::Contract(ContractError::Io { .. })));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let err = Kanon::from_config(config_for(dir.path(), "nested/pets.json"))
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::Config(ConfigError::InvalidValue { .. })));
    }
}
