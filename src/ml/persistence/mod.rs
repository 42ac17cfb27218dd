use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ForecastError;
use crate::ml::{ScalingParams, TrainedModel, TrainingReport};

/// Everything needed to run inference later: the trained model plus the
/// scaling parameters and window size it was trained with. The original
/// system persisted only the model, which made scoring new raw data
/// impossible without refitting a scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: TrainedModel,
    pub scaling: ScalingParams,
    pub time_step: usize,
    pub trained_at: DateTime<Utc>,
    pub source_points: usize,
    pub report: TrainingReport,
}

/// Saves and loads model artifacts under a timestamped name. A per-store
/// monotonic counter disambiguates saves within the same second.
#[derive(Debug)]
pub struct ModelStore {
    folder: PathBuf,
    counter: AtomicU64,
}

impl ModelStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Persist an artifact as `{base_name}-{dd-mm-YYYY-HH-MM-SS}-{seq}.json`,
    /// creating the folder if absent.
    pub fn save(
        &self,
        artifact: &ModelArtifact,
        base_name: &str,
    ) -> Result<PathBuf, ForecastError> {
        fs::create_dir_all(&self.folder).map_err(|e| {
            ForecastError::persistence(format!(
                "cannot create {}: {}",
                self.folder.display(),
                e
            ))
        })?;

        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let timestamp = Utc::now().format("%d-%m-%Y-%H-%M-%S");
        let filename = format!("{}-{}-{:03}.json", base_name, timestamp, seq);
        let path = self.folder.join(filename);

        let json = serde_json::to_string_pretty(artifact)
            .map_err(|e| ForecastError::persistence(format!("cannot serialize artifact: {}", e)))?;
        fs::write(&path, json).map_err(|e| {
            ForecastError::persistence(format!("cannot write {}: {}", path.display(), e))
        })?;

        info!("Saved {} model to {}", artifact.model.kind, path.display());
        Ok(path)
    }

    /// Load an artifact written by `save`
    pub fn load(path: impl AsRef<Path>) -> Result<ModelArtifact, ForecastError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            ForecastError::persistence(format!("cannot read {}: {}", path.display(), e))
        })?;
        let artifact: ModelArtifact = serde_json::from_str(&json).map_err(|e| {
            ForecastError::persistence(format!("cannot parse {}: {}", path.display(), e))
        })?;
        info!("Loaded {} model from {}", artifact.model.kind, path.display());
        Ok(artifact)
    }

    /// Artifact paths in the store folder, newest name last
    pub fn list(&self) -> Result<Vec<PathBuf>, ForecastError> {
        if !self.folder.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.folder).map_err(|e| {
            ForecastError::persistence(format!("cannot list {}: {}", self.folder.display(), e))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        paths.sort();
        Ok(paths)
    }
}
