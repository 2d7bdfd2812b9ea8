//! Filesystem-backed model and metrics store.
//!
//! Layout under the root directory:
//!
//! ```text
//! {name}.model.json              fitted model (its presence defines the model)
//! {name}/metrics.json            train/test scores
//! {name}/learning_curve.json     curve data
//! {name}/learning_curve.svg      rendered curve
//! .staging-*/                    in-flight training commits
//! ```

use crate::domain::errors::StoreError;
use crate::domain::ml::{MetricsRecord, TrainedModel};
use crate::domain::repositories::{
    ArtifactStore, MetricsRepository, ModelRepository, TrainingArtifacts,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

const MODEL_SUFFIX: &str = ".model.json";
const METRICS_FILE: &str = "metrics.json";
const CURVE_DATA_FILE: &str = "learning_curve.json";
const CURVE_IMAGE_FILE: &str = "learning_curve.svg";
const STAGING_PREFIX: &str = ".staging-";

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Opens the store, creating the root directory if needed.
    /// Called once at startup.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::persistence(&root, e))?;
        info!("Model store ready at {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}{}", name, MODEL_SUFFIX))
    }

    pub fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.exists(name) || self.artifact_dir(name).exists()
    }

    /// First free name among `base`, `base_2`, `base_3`, ...
    fn resolve_name(&self, base: &str) -> String {
        if !self.is_taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.is_taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

impl ModelRepository for FsArtifactStore {
    fn save(&self, model: &TrainedModel) -> Result<PathBuf, StoreError> {
        let path = self.model_path(&model.name);
        write_json_atomic(&path, model)?;
        debug!("Model {} written to {:?}", model.name, path);
        Ok(path)
    }

    fn load(&self, name: &str) -> Result<TrainedModel, StoreError> {
        check_name(name, "Model")?;
        let model: TrainedModel = read_json(&self.model_path(name), "Model", name)?;
        info!("Model {} loaded", name);
        Ok(model)
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::persistence(&self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::persistence(&self.root, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(MODEL_SUFFIX) {
                if !name.is_empty() && !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, name: &str) -> bool {
        check_name(name, "Model").is_ok() && self.model_path(name).is_file()
    }
}

impl MetricsRepository for FsArtifactStore {
    fn save_metrics(&self, metrics: &MetricsRecord, name: &str) -> Result<PathBuf, StoreError> {
        let dir = self.artifact_dir(name);
        fs::create_dir_all(&dir).map_err(|e| StoreError::persistence(&dir, e))?;
        let path = dir.join(METRICS_FILE);
        write_json_atomic(&path, metrics)?;
        debug!("Metrics for model {} written to {:?}", name, path);
        Ok(path)
    }

    fn load_metrics(&self, name: &str) -> Result<MetricsRecord, StoreError> {
        check_name(name, "Metrics")?;
        read_json(&self.artifact_dir(name).join(METRICS_FILE), "Metrics", name)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn commit(&self, artifacts: TrainingArtifacts) -> Result<String, StoreError> {
        let TrainingArtifacts {
            mut model,
            metrics,
            learning_curve,
            learning_curve_svg,
        } = artifacts;

        let name = self.resolve_name(&model.name);
        if name != model.name {
            warn!(
                "Model name {} already taken, storing as {}",
                model.name, name
            );
            model.name = name.clone();
        }

        // The staging directory is laid out like the store itself
        let staging = StagingDir::create(&self.root, &name)?;
        let staged = FsArtifactStore {
            root: staging.path.clone(),
        };
        staged.save_metrics(&metrics, &name)?;
        let staged_dir = staged.artifact_dir(&name);
        write_json(&staged_dir.join(CURVE_DATA_FILE), &learning_curve)?;
        let image_path = staged_dir.join(CURVE_IMAGE_FILE);
        fs::write(&image_path, learning_curve_svg.as_bytes())
            .map_err(|e| StoreError::persistence(&image_path, e))?;
        let staged_model = staged.save(&model)?;

        // Artifact directory first; the model file is what makes the model
        // visible, so it moves last.
        let final_dir = self.artifact_dir(&name);
        fs::rename(&staged_dir, &final_dir).map_err(|e| StoreError::persistence(&final_dir, e))?;

        let final_model = self.model_path(&name);
        if let Err(e) = fs::rename(&staged_model, &final_model) {
            let _ = fs::remove_dir_all(&final_dir);
            return Err(StoreError::persistence(&final_model, e));
        }

        drop(staging);
        info!("Committed artifacts for model {} under {:?}", name, self.root);
        Ok(name)
    }

    fn load_learning_curve_image(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if check_name(name, "Learning curve").is_err() {
            return Ok(None);
        }
        let path = self.artifact_dir(name).join(CURVE_IMAGE_FILE);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::persistence(&path, e)),
        }
    }
}

/// Scratch directory removed on drop
struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    fn create(root: &Path, name: &str) -> Result<Self, StoreError> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = root.join(format!(
            "{}{}-{}-{}",
            STAGING_PREFIX,
            name,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&path).map_err(|e| StoreError::persistence(&path, e))?;
        Ok(Self { path })
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove staging directory {:?}: {}", self.path, e);
            }
        }
    }
}

/// Names never address anything outside the store root
fn check_name(name: &str, kind: &'static str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).components().count() == 1;
    if valid {
        Ok(())
    } else {
        Err(StoreError::NotFound {
            kind,
            name: name.to_string(),
        })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let file = fs::File::create(path).map_err(|e| StoreError::persistence(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| StoreError::persistence(path, e))?;
    writer.flush().map_err(|e| StoreError::persistence(path, e))
}

/// Atomic write: write to temp file then rename
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let temp_path = path.with_extension("tmp");
    write_json(&temp_path, value)?;
    fs::rename(&temp_path, path).map_err(|e| StoreError::persistence(path, e))
}

fn read_json<T: DeserializeOwned>(
    path: &Path,
    kind: &'static str,
    name: &str,
) -> Result<T, StoreError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("{} for model {} not found at {:?}", kind, name, path);
            return Err(StoreError::NotFound {
                kind,
                name: name.to_string(),
            });
        }
        Err(e) => return Err(StoreError::persistence(path, e)),
    };
    serde_json::from_reader(BufReader::new(file)).map_err(|e| StoreError::persistence(path, e))
}
