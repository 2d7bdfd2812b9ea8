use crate::domain::errors::{PipelineError, ValidationError};
use crate::domain::ml::category_encoder::CategoryEncoder;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use smartcore::numbers::realnum::RealNumber;
use smartcore::optimization::first_order::FirstOrderOptimizer;
use smartcore::optimization::first_order::lbfgs::LBFGS;
use smartcore::optimization::line_search::Backtracking;
use smartcore::optimization::{DF, F, FunctionOrder};
use std::collections::BTreeSet;
use std::fmt;

/// Class name used as the prefix of generated model names
pub const MODEL_CLASS_NAME: &str = "LogisticRegression";

const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Training hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Upper bound on L-BFGS iterations
    pub max_iter: usize,
    /// Inverse of the L2 regularization strength
    #[serde(rename = "C")]
    pub c: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            c: 1.0,
        }
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_iter == 0 {
            return Err(ValidationError::InvalidParameter {
                name: "max_iter".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ValidationError::InvalidParameter {
                name: "C".to_string(),
                reason: format!("must be a positive number, got {}", self.c),
            });
        }
        Ok(())
    }

    /// Penalty strength of the L2 term
    pub fn alpha(&self) -> f64 {
        1.0 / self.c
    }
}

/// Binary logistic regression over the contract features.
///
/// Fitted by minimizing the L2-penalized log loss with smartcore's L-BFGS
/// optimizer; the intercept is not penalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    /// `[negative, positive]` labels in ascending order
    pub classes: [i32; 2],
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Optimizer iterations run, at most `max_iter`
    pub iterations: usize,
}

impl Classifier {
    fn decision(&self, row: &[f64]) -> f64 {
        linear(&self.coefficients, self.intercept, row)
    }
}

fn linear(coefficients: &[f64], intercept: f64, row: &[f64]) -> f64 {
    coefficients
        .iter()
        .zip(row)
        .map(|(w, x)| w * x)
        .sum::<f64>()
        + intercept
}

/// Fits the classifier; `x` is row-major in contract order
pub fn fit_classifier(
    x: &[Vec<f64>],
    y: &[i32],
    params: &ModelParams,
) -> Result<Classifier, PipelineError> {
    if x.is_empty() {
        return Err(ValidationError::EmptyBatch.into());
    }
    if x.len() != y.len() {
        return Err(PipelineError::Fit(format!(
            "{} feature rows but {} labels",
            x.len(),
            y.len()
        )));
    }
    let n_features = x[0].len();
    if x.iter().any(|row| row.len() != n_features) {
        return Err(PipelineError::Fit("feature rows differ in length".to_string()));
    }

    let labels: Vec<i32> = y.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let classes = match labels.as_slice() {
        &[negative, positive] => [negative, positive],
        other => {
            return Err(PipelineError::Fit(format!(
                "incorrect number of classes: {}. Should be 2.",
                other.len()
            )));
        }
    };

    let targets: Vec<f64> = y
        .iter()
        .map(|&label| if label == classes[1] { 1.0 } else { 0.0 })
        .collect();
    let alpha = params.alpha();

    // weights are [coefficients..., intercept]
    let objective: &F<'_, f64, Vec<f64>> = &|w: &Vec<f64>| {
        let (coefficients, intercept) = (&w[..n_features], w[n_features]);
        let loss: f64 = x
            .iter()
            .zip(&targets)
            .map(|(row, t)| {
                let z = linear(coefficients, intercept, row);
                z.ln_1pe() - t * z
            })
            .sum();
        let penalty: f64 = coefficients.iter().map(|c| c * c).sum();
        loss + 0.5 * alpha * penalty
    };
    let gradient: &DF<'_, Vec<f64>> = &|g: &mut Vec<f64>, w: &Vec<f64>| {
        let (coefficients, intercept) = (&w[..n_features], w[n_features]);
        g.iter_mut().for_each(|v| *v = 0.0);
        for (row, t) in x.iter().zip(&targets) {
            let residual = t - linear(coefficients, intercept, row).sigmoid();
            for (gj, xj) in g.iter_mut().zip(row) {
                *gj -= residual * xj;
            }
            g[n_features] -= residual;
        }
        for (gj, wj) in g.iter_mut().zip(coefficients) {
            *gj += alpha * wj;
        }
    };

    let line_search: Backtracking<f64> = Backtracking {
        order: FunctionOrder::THIRD,
        ..Default::default()
    };
    let optimizer = LBFGS {
        max_iter: params.max_iter,
        ..Default::default()
    };
    let x0 = vec![0.0; n_features + 1];
    let result = optimizer.optimize(objective, gradient, &x0, &line_search);

    if result.x.iter().any(|w| !w.is_finite()) {
        return Err(PipelineError::Fit(
            "optimizer diverged to non-finite weights".to_string(),
        ));
    }

    let mut coefficients = result.x;
    let intercept = coefficients.pop().unwrap_or(0.0);
    Ok(Classifier {
        classes,
        coefficients,
        intercept,
        iterations: result.iterations,
    })
}

pub fn predict_classifier(
    classifier: &Classifier,
    x: &[Vec<f64>],
) -> Result<Vec<i32>, PipelineError> {
    x.iter()
        .enumerate()
        .map(|(row, values)| {
            if values.len() != classifier.coefficients.len() {
                return Err(PipelineError::Inference(format!(
                    "row {} has {} features, model expects {}",
                    row,
                    values.len(),
                    classifier.coefficients.len()
                )));
            }
            let positive = classifier.decision(values).sigmoid() > 0.5;
            Ok(classifier.classes[usize::from(positive)])
        })
        .collect()
}

/// The persisted training artifact
#[derive(Serialize, Deserialize)]
pub struct TrainedModel {
    pub name: String,
    pub class_name: String,
    pub created_at: DateTime<Utc>,
    pub params: ModelParams,
    pub feature_names: Vec<String>,
    pub encoder: CategoryEncoder,
    pub classifier: Classifier,
}

impl TrainedModel {
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<i32>, PipelineError> {
        predict_classifier(&self.classifier, x)
    }
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("created_at", &self.created_at)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// `{ClassName}_{YYYYMMDD_HHMMSS}`
pub fn generate_model_name(class_name: &str, at: NaiveDateTime) -> String {
    format!("{}_{}", class_name, at.format(NAME_TIMESTAMP_FORMAT))
}

pub fn model_name_now(class_name: &str) -> String {
    generate_model_name(class_name, Local::now().naive_local())
}

/// Train/test scores of a fitted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub accuracy_train: f64,
    pub accuracy_test: f64,
    pub f1_train: f64,
    pub f1_test: f64,
    pub precision_train: f64,
    pub precision_test: f64,
    pub recall_train: f64,
    pub recall_test: f64,
}

impl MetricsRecord {
    pub fn entries(&self) -> [(&'static str, f64); 8] {
        [
            ("accuracy_train", self.accuracy_train),
            ("accuracy_test", self.accuracy_test),
            ("f1_train", self.f1_train),
            ("f1_test", self.f1_test),
            ("precision_train", self.precision_train),
            ("precision_test", self.precision_test),
            ("recall_train", self.recall_train),
            ("recall_test", self.recall_test),
        ]
    }
}

/// Mean cross-validated scores per training-set size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurve {
    pub train_sizes: Vec<usize>,
    pub train_scores_mean: Vec<f64>,
    pub test_scores_mean: Vec<f64>,
}
