use crate::domain::errors::PipelineError;
use crate::domain::ml::feature_registry::{self, FEATURE_NAMES, PREDICTION_COLUMN};
use crate::domain::ml::{MetricsRecord, feature_transform};
use crate::domain::repositories::ArtifactStore;
use crate::infrastructure::observability::Metrics;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use polars::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Metrics of a stored model plus its learning curve chart
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub metrics: MetricsRecord,
    /// Base64-encoded SVG, `None` when the chart is missing
    pub learning_curve: Option<String>,
}

/// Serves predictions and model information from the artifact store
pub struct PredictionService {
    store: Arc<dyn ArtifactStore>,
    metrics: Metrics,
}

impl PredictionService {
    pub fn new(store: Arc<dyn ArtifactStore>, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    /// Scores every row surviving preprocessing. Rows are returned as the
    /// transformed records with a `prediction` field appended.
    pub fn predict(
        &self,
        model_name: &str,
        df: DataFrame,
    ) -> Result<Vec<Map<String, Value>>, PipelineError> {
        let started = Instant::now();
        let result = self
            .run(model_name, df)
            .map_err(PipelineError::prediction);
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(rows) => {
                info!("Model {} scored {} rows", model_name, rows.len());
                self.metrics.record_prediction("success", rows.len(), elapsed);
            }
            Err(e) => {
                error!("Prediction with model {} failed: {}", model_name, e);
                self.metrics.record_prediction("failure", 0, elapsed);
            }
        }
        result
    }

    fn run(&self, model_name: &str, df: DataFrame) -> Result<Vec<Map<String, Value>>, PipelineError> {
        let model = self.store.load(model_name)?;

        let mut df = feature_transform::transform(df, &model.encoder)?;
        feature_registry::validate_required_columns(&df, FEATURE_NAMES)?;
        info!("All contract columns present for model {}", model_name);

        let x = feature_registry::features_to_matrix(&df)?;
        let predictions: Vec<i64> = model.predict(&x)?.into_iter().map(i64::from).collect();

        df.with_column(Column::new(PREDICTION_COLUMN.into(), predictions))?;
        to_json_rows(&df)
    }

    pub fn get_model_info(&self, model_name: &str) -> Result<ModelInfo, PipelineError> {
        let metrics = self.store.load_metrics(model_name)?;

        let learning_curve = match self.store.load_learning_curve_image(model_name)? {
            Some(bytes) => Some(STANDARD.encode(bytes)),
            None => {
                warn!("Learning curve for model {} not found", model_name);
                None
            }
        };

        Ok(ModelInfo {
            metrics,
            learning_curve,
        })
    }

    pub fn list_models(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.store.list()?)
    }
}

/// One JSON object per row, keyed by column name
fn to_json_rows(df: &DataFrame) -> Result<Vec<Map<String, Value>>, PipelineError> {
    let mut rows = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let mut record = Map::new();
        for column in df.get_columns() {
            record.insert(column.name().to_string(), to_json(column.get(row)?));
        }
        rows.push(record);
    }
    Ok(rows)
}

fn to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => Value::from(f64::from(v)),
        // NaN has no JSON form and becomes null
        AnyValue::Float64(v) => Value::from(v),
        AnyValue::String(v) => Value::from(v),
        AnyValue::StringOwned(v) => Value::from(v.as_str()),
        other => Value::from(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_keep_column_types() {
        let df = df!(
            "amt" => [Some(4.97f64), Some(f64::NAN)],
            "state" => [Some("NC"), None],
            "prediction" => [0i64, 1],
        )
        .unwrap();
        let rows = to_json_rows(&df).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["amt"], Value::from(4.97));
        assert_eq!(rows[0]["state"], Value::from("NC"));
        assert_eq!(rows[0]["prediction"], Value::from(0));
        assert_eq!(rows[1]["amt"], Value::Null);
        assert_eq!(rows[1]["state"], Value::Null);
    }
}
