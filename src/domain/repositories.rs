//! Repository Pattern Abstractions
//!
//! Storage traits keyed by model name, keeping the training and prediction
//! services independent of where artifacts live.
//!
//! - `ModelRepository`: fitted model artifacts
//! - `MetricsRepository`: train/test scores per model
//! - `ArtifactStore`: both, plus the all-or-nothing commit used by training
//!
//! The filesystem implementation lives in
//! [`crate::infrastructure::persistence::FsArtifactStore`].

use crate::domain::errors::StoreError;
use crate::domain::ml::{LearningCurve, MetricsRecord, TrainedModel};
use std::path::PathBuf;

/// Repository for fitted models
pub trait ModelRepository: Send + Sync {
    /// Persist a model under its own name, returning where it was written
    fn save(&self, model: &TrainedModel) -> Result<PathBuf, StoreError>;

    /// Load a model, `StoreError::NotFound` when absent
    fn load(&self, name: &str) -> Result<TrainedModel, StoreError>;

    /// Names of all stored models, sorted
    fn list(&self) -> Result<Vec<String>, StoreError>;

    fn exists(&self, name: &str) -> bool;
}

/// Repository for per-model metrics
pub trait MetricsRepository: Send + Sync {
    fn save_metrics(&self, metrics: &MetricsRecord, name: &str) -> Result<PathBuf, StoreError>;

    fn load_metrics(&self, name: &str) -> Result<MetricsRecord, StoreError>;
}

/// Everything one training run produces
pub struct TrainingArtifacts {
    pub model: TrainedModel,
    pub metrics: MetricsRecord,
    pub learning_curve: LearningCurve,
    /// Rendered chart of `learning_curve`
    pub learning_curve_svg: String,
}

pub trait ArtifactStore: ModelRepository + MetricsRepository {
    /// Writes all artifacts of a run so that either all of them become visible
    /// or none do. Returns the name the model was stored under, which differs
    /// from `model.name` only when that name was already taken.
    fn commit(&self, artifacts: TrainingArtifacts) -> Result<String, StoreError>;

    /// Rendered learning curve, `None` when the model has none
    fn load_learning_curve_image(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;
}
