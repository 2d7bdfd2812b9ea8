use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the individual feature-engineering steps.
///
/// Each variant belongs to exactly one step so the caller can tell which stage
/// of the pipeline rejected the batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("Failed to decompose transaction timestamp: {reason}")]
    TimeDecomposition { reason: String },

    #[error("Failed to encode categorical column '{column}': {reason}")]
    Encoding { column: String, reason: String },

    #[error("Failed to derive weekend flag: {reason}")]
    WeekendFlag { reason: String },

    #[error("Failed to derive night flag: {reason}")]
    NightFlag { reason: String },

    #[error("Failed to compute card holder age: {reason}")]
    HolderAge { reason: String },

    #[error("Failed to filter amount outliers: {reason}")]
    OutlierFilter { reason: String },
}

/// Contract violations detected before a batch reaches the classifier
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing columns: {}", missing.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        required: Vec<String>,
    },

    #[error("Column '{column}' is not numeric")]
    NonNumericColumn { column: String },

    #[error("Column '{column}' has a missing or invalid value at row {row}")]
    InvalidValue { column: String, row: usize },

    /// Request hyperparameter out of range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Not enough rows for {stage}: {rows} available, {required} required")]
    InsufficientRows {
        stage: &'static str,
        rows: usize,
        required: usize,
    },

    #[error("Batch is empty after preprocessing")]
    EmptyBatch,
}

/// Errors raised by the model and metrics stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Persistence failure at {path:?}: {reason}")]
    Persistence { path: PathBuf, reason: String },
}

impl StoreError {
    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StoreError::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Terminal failure of a training, prediction or exploration request.
///
/// No variant carries a partial result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read CSV input: {0}")]
    Csv(String),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Data frame operation failed: {0}")]
    Frame(#[from] PolarsError),

    #[error("Model fitting failed: {0}")]
    Fit(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model training failed: {0}")]
    Training(#[source] Box<PipelineError>),

    #[error("Prediction failed: {0}")]
    Prediction(#[source] Box<PipelineError>),
}

impl PipelineError {
    /// Wraps a step failure into the single error the training caller sees
    pub fn training(inner: PipelineError) -> Self {
        match inner {
            PipelineError::Training(_) => inner,
            other => PipelineError::Training(Box::new(other)),
        }
    }

    pub fn prediction(inner: PipelineError) -> Self {
        match inner {
            PipelineError::Prediction(_) => inner,
            other => PipelineError::Prediction(Box::new(other)),
        }
    }

    /// Innermost error, looking through the orchestrator wrappers
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Training(inner) | PipelineError::Prediction(inner) => inner.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), PipelineError::Store(StoreError::NotFound { .. }))
    }

    /// Unreadable upload or out-of-range hyperparameter; the request itself
    /// is malformed rather than the data failing the pipeline
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self.root(),
            PipelineError::Csv(_)
                | PipelineError::Validation(ValidationError::InvalidParameter { .. })
        )
    }

    pub fn missing_columns(&self) -> Option<&[String]> {
        match self.root() {
            PipelineError::Validation(ValidationError::MissingColumns { missing, .. }) => {
                Some(missing)
            }
            _ => None,
        }
    }
}
