//! Observability for fraudscope
//!
//! Pipeline counters and latency histograms kept in a Prometheus registry and
//! exposed in text format by the HTTP layer at `GET /metrics`.

pub mod metrics;

pub use metrics::Metrics;
