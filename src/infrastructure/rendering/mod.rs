//! Chart rendering for training and EDA artifacts

pub mod svg;

use crate::domain::ml::LearningCurve;
use svg::{Series, palette};

/// Train and cross-validation scores against training set size
pub fn render_learning_curve(model_name: &str, curve: &LearningCurve) -> String {
    let x: Vec<f64> = curve.train_sizes.iter().map(|&s| s as f64).collect();
    svg::line_chart(
        &format!("Learning Curve for {}", model_name),
        "Training Set Size",
        "Score",
        &x,
        &[
            Series {
                label: "Training score",
                color: palette::RED,
                values: &curve.train_scores_mean,
            },
            Series {
                label: "Cross-validation score",
                color: palette::GREEN,
                values: &curve.test_scores_mean,
            },
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_curve_chart() {
        let curve = LearningCurve {
            train_sizes: vec![8, 16, 24],
            train_scores_mean: vec![1.0, 0.95, 0.93],
            test_scores_mean: vec![0.6, 0.75, 0.8],
        };
        let svg = render_learning_curve("LogisticRegression_20240101_000000", &curve);
        assert!(svg.contains("Learning Curve for LogisticRegression_20240101_000000"));
        assert!(svg.contains("Cross-validation score"));
        assert!(svg.contains(palette::RED));
        assert!(svg.contains(palette::GREEN));
    }
}
