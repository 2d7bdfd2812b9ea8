//! Training orchestrator.
//!
//! Runs transform, contract check, split, fit, scoring and learning curve in
//! order, then hands every artifact to the store in one commit. Any failure
//! ends the run with a single [`PipelineError::Training`] and nothing is
//! written.

use super::evaluation::{self, SPLIT_SEED};
use crate::domain::errors::PipelineError;
use crate::domain::ml::feature_registry::{self, FEATURE_NAMES};
use crate::domain::ml::feature_transform;
use crate::domain::ml::model::{self, MODEL_CLASS_NAME};
use crate::domain::ml::{ModelParams, TrainedModel};
use crate::domain::repositories::{ArtifactStore, TrainingArtifacts};
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::rendering;
use chrono::Utc;
use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub struct TrainingService {
    store: Arc<dyn ArtifactStore>,
    metrics: Metrics,
}

impl TrainingService {
    pub fn new(store: Arc<dyn ArtifactStore>, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    /// Trains a model on `df` and returns the name it was stored under
    pub fn train(&self, df: DataFrame, params: ModelParams) -> Result<String, PipelineError> {
        let started = Instant::now();
        let result = self.run(df, params).map_err(PipelineError::training);
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(name) => {
                info!("Model {} trained in {:.2}s", name, elapsed);
                self.metrics.record_training("success", elapsed);
            }
            Err(e) => {
                error!("{}", e);
                self.metrics.record_training("failure", elapsed);
            }
        }
        result
    }

    fn run(&self, df: DataFrame, params: ModelParams) -> Result<String, PipelineError> {
        params.validate()?;

        let rows_in = df.height();
        let (df, encoder) = feature_transform::fit_transform(df)?;
        let removed = rows_in - df.height();
        self.metrics.record_outliers(removed);
        info!(
            "Preprocessed {} rows ({} removed as amount outliers)",
            df.height(),
            removed
        );

        feature_registry::validate_required_columns(&df, &feature_registry::training_columns())?;
        let x = feature_registry::features_to_matrix(&df)?;
        let y = feature_registry::target_vector(&df)?;

        let split = evaluation::train_test_split(x.len(), SPLIT_SEED)?;
        let x_train = evaluation::select(&x, &split.train_indices);
        let y_train = evaluation::select(&y, &split.train_indices);
        let x_test = evaluation::select(&x, &split.test_indices);
        let y_test = evaluation::select(&y, &split.test_indices);
        info!(
            "Split into {} train / {} test rows",
            x_train.len(),
            x_test.len()
        );

        info!(
            "Fitting {} with max_iter={} C={}",
            MODEL_CLASS_NAME, params.max_iter, params.c
        );
        let classifier = model::fit_classifier(&x_train, &y_train, &params)?;
        let name = model::model_name_now(MODEL_CLASS_NAME);

        let metrics = evaluation::score(&classifier, &x_train, &y_train, &x_test, &y_test)?;
        info!(
            "Model {}: accuracy train={:.4} test={:.4}",
            name, metrics.accuracy_train, metrics.accuracy_test
        );

        let learning_curve = evaluation::learning_curve(&x_train, &y_train, &params)?;
        let learning_curve_svg = rendering::render_learning_curve(&name, &learning_curve);

        let trained = TrainedModel {
            name,
            class_name: MODEL_CLASS_NAME.to_string(),
            created_at: Utc::now(),
            params,
            feature_names: FEATURE_NAMES.iter().map(|f| f.to_string()).collect(),
            encoder,
            classifier,
        };

        let stored = self.store.commit(TrainingArtifacts {
            model: trained,
            metrics,
            learning_curve,
            learning_curve_svg,
        })?;
        Ok(stored)
    }
}
