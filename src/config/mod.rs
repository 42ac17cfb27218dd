use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ForecastError;
use crate::ml::TrainingConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub date_column: String,
    pub price_column: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            price_column: "Price".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Window length fed to the sequence model
    pub time_step: usize,
    pub model_folder: String,
    pub model_name: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            time_step: 60,
            model_folder: "models".to_string(),
            model_name: "brent".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataSettings,
    pub pipeline: PipelineSettings,
    pub training: TrainingConfig,
}

impl AppConfig {
    /// Load from a TOML file; a missing file falls back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::DataValidation(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = toml::from_str(&raw).map_err(|e| {
            ForecastError::DataValidation(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate().map_err(|errors| {
            ForecastError::DataValidation(format!("invalid config: {}", errors.join(", ")))
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.pipeline.time_step == 0 {
            errors.push("time_step must be > 0".to_string());
        }
        if self.pipeline.model_folder.is_empty() {
            errors.push("model_folder must not be empty".to_string());
        }
        if self.pipeline.model_name.is_empty() {
            errors.push("model_name must not be empty".to_string());
        }
        if self.data.date_column.is_empty() {
            errors.push("date_column must not be empty".to_string());
        }
        if self.data.price_column.is_empty() {
            errors.push("price_column must not be empty".to_string());
        }
        if let Err(training_errors) = self.training.validate() {
            errors.extend(training_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
