//! Prometheus metrics definitions for fraudscope
//!
//! All metrics use the `fraudscope_` prefix and are read-only.

use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus metrics for the training and prediction pipelines
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Training runs by outcome
    pub trainings_total: CounterVec,
    /// Prediction requests by outcome
    pub predictions_total: CounterVec,
    /// Rows scored by the classifier
    pub predicted_rows_total: IntCounter,
    /// Rows removed by the amount outlier filter
    pub outlier_rows_total: IntCounter,
    /// End-to-end pipeline duration in seconds
    pub pipeline_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance with all counters and histograms registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let trainings_total = CounterVec::new(
            Opts::new("fraudscope_trainings_total", "Training runs by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(trainings_total.clone()))?;

        let predictions_total = CounterVec::new(
            Opts::new("fraudscope_predictions_total", "Prediction requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let predicted_rows_total = IntCounter::with_opts(Opts::new(
            "fraudscope_predicted_rows_total",
            "Rows scored by the classifier",
        ))?;
        registry.register(Box::new(predicted_rows_total.clone()))?;

        let outlier_rows_total = IntCounter::with_opts(Opts::new(
            "fraudscope_outlier_rows_total",
            "Rows removed by the amount outlier filter",
        ))?;
        registry.register(Box::new(outlier_rows_total.clone()))?;

        let pipeline_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "fraudscope_pipeline_duration_seconds",
                "Pipeline duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
            &["pipeline"],
        )?;
        registry.register(Box::new(pipeline_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            trainings_total,
            predictions_total,
            predicted_rows_total,
            outlier_rows_total,
            pipeline_duration_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn record_training(&self, outcome: &str, seconds: f64) {
        self.trainings_total.with_label_values(&[outcome]).inc();
        self.pipeline_duration_seconds
            .with_label_values(&["train"])
            .observe(seconds);
    }

    pub fn record_prediction(&self, outcome: &str, rows: usize, seconds: f64) {
        self.predictions_total.with_label_values(&[outcome]).inc();
        self.predicted_rows_total.inc_by(rows as u64);
        self.pipeline_duration_seconds
            .with_label_values(&["predict"])
            .observe(seconds);
    }

    pub fn record_outliers(&self, removed: usize) {
        self.outlier_rows_total.inc_by(removed as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        assert!(metrics.render().contains("fraudscope_predicted_rows_total 0"));
    }

    #[test]
    fn test_training_counter() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_training("success", 1.5);
        metrics.record_training("failure", 0.2);
        let output = metrics.render();
        assert!(output.contains("fraudscope_trainings_total{outcome=\"success\"} 1"));
        assert!(output.contains("fraudscope_trainings_total{outcome=\"failure\"} 1"));
        assert!(output.contains("fraudscope_pipeline_duration_seconds"));
    }

    #[test]
    fn test_prediction_rows() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_prediction("success", 42, 0.01);
        assert!(metrics.render().contains("fraudscope_predicted_rows_total 42"));
    }
}
