//! Exploratory plots over a raw upload

use crate::domain::errors::PipelineError;
use crate::infrastructure::rendering::svg;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const DISTRIBUTION_PLOT: &str = "distribution";
pub const CORRELATION_PLOT: &str = "correlation_matrix";
const DISTRIBUTION_COLUMN: &str = "trans_month";
const NO_NUMERIC_MESSAGE: &str = "No numeric columns to analyse";

/// Base64-encoded SVG charts keyed by plot name
#[derive(Debug, Clone, Default, Serialize)]
pub struct EdaReport {
    pub plots: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn get_plots(df: &DataFrame) -> Result<EdaReport, PipelineError> {
    let numeric: Vec<&str> = df
        .get_columns()
        .iter()
        .filter(|column| column.dtype().is_primitive_numeric())
        .map(|column| column.name().as_str())
        .collect();
    if numeric.is_empty() {
        warn!("No numeric columns in uploaded data");
        return Ok(EdaReport {
            plots: BTreeMap::new(),
            message: Some(NO_NUMERIC_MESSAGE.to_string()),
        });
    }

    let mut report = EdaReport::default();

    if numeric.contains(&DISTRIBUTION_COLUMN) {
        let months = df
            .column(DISTRIBUTION_COLUMN)?
            .cast(&DataType::Float64)?;
        let values: Vec<f64> = months.f64()?.into_iter().flatten().collect();
        let chart = svg::histogram(
            &format!("Distribution: {}", DISTRIBUTION_COLUMN),
            "Month number",
            &values,
            12,
        );
        report
            .plots
            .insert(DISTRIBUTION_PLOT.to_string(), STANDARD.encode(chart));
        info!("Distribution plot for {} created", DISTRIBUTION_COLUMN);
    }

    if numeric.len() > 1 {
        let relevant: Vec<&str> = numeric
            .iter()
            .copied()
            .filter(|name| !is_index_column(name))
            .collect();
        if !relevant.is_empty() {
            let matrix = correlation_matrix(df, &relevant)?;
            let chart = svg::heatmap("Correlation matrix", &relevant, &matrix);
            report
                .plots
                .insert(CORRELATION_PLOT.to_string(), STANDARD.encode(chart));
            info!("Correlation matrix over {} columns created", relevant.len());
        }
    }

    Ok(report)
}

/// Exported row-index columns: empty header or `Unnamed: ...`
fn is_index_column(name: &str) -> bool {
    name.is_empty() || name.to_lowercase().starts_with("unnamed")
}

/// Pairwise Pearson correlation of `columns`, each pair over the rows where
/// both values are present. Undefined coefficients are NaN.
pub fn correlation_matrix(df: &DataFrame, columns: &[&str]) -> PolarsResult<Vec<Vec<f64>>> {
    let n = columns.len();
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect();
    let exprs: Vec<Expr> = pairs
        .iter()
        .map(|&(i, j)| {
            pearson_corr(
                col(columns[i]).cast(DataType::Float64),
                col(columns[j]).cast(DataType::Float64),
            )
            .alias(format!("{}_{}", i, j))
        })
        .collect();
    let coefficients = df.clone().lazy().select(exprs).collect()?;

    let mut matrix = vec![vec![f64::NAN; n]; n];
    for (&(i, j), column) in pairs.iter().zip(coefficients.get_columns()) {
        let r = column
            .cast(&DataType::Float64)?
            .f64()?
            .get(0)
            .unwrap_or(f64::NAN);
        matrix[i][j] = r;
        matrix[j][i] = r;
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_numeric_columns() {
        let df = df!("state" => ["NY", "CA"]).unwrap();
        let report = get_plots(&df).unwrap();
        assert!(report.plots.is_empty());
        assert_eq!(report.message.as_deref(), Some(NO_NUMERIC_MESSAGE));
    }

    #[test]
    fn test_both_plots_generated() {
        let df = df!(
            "" => [0i64, 1, 2],
            "trans_month" => [1i64, 1, 12],
            "amt" => [1.0f64, 2.0, 30.0],
            "state" => ["NY", "CA", "NC"],
        )
        .unwrap();
        let report = get_plots(&df).unwrap();
        assert!(report.message.is_none());
        assert!(report.plots.contains_key(DISTRIBUTION_PLOT));

        let heatmap = STANDARD.decode(&report.plots[CORRELATION_PLOT]).unwrap();
        let heatmap = String::from_utf8(heatmap).unwrap();
        assert!(heatmap.contains(">amt<"));
        assert!(heatmap.contains(">trans_month<"));
        assert!(!heatmap.contains(">state<"));
    }

    #[test]
    fn test_raw_upload_without_month_skips_distribution() {
        let df = df!(
            "amt" => [1.0f64, 2.0],
            "city_pop" => [10i64, 20],
        )
        .unwrap();
        let report = get_plots(&df).unwrap();
        assert!(!report.plots.contains_key(DISTRIBUTION_PLOT));
        assert!(report.plots.contains_key(CORRELATION_PLOT));
    }

    #[test]
    fn test_correlation_uses_complete_pairs() {
        let df = df!(
            "a" => [Some(1.0f64), Some(2.0), Some(3.0), None],
            "b" => [Some(2.0f64), Some(4.0), Some(6.0), Some(100.0)],
            "c" => [3i64, 2, 1, 0],
            "constant" => [5i64, 5, 5, 5],
        )
        .unwrap();
        let m = correlation_matrix(&df, &["a", "b", "c", "constant"]).unwrap();
        assert!((m[0][1] - 1.0).abs() < 1e-12);
        assert!((m[0][2] + 1.0).abs() < 1e-12);
        assert!((m[1][1] - 1.0).abs() < 1e-12);
        assert_eq!(m[1][0], m[0][1]);
        assert!(m[3][3].is_nan());
    }
}
