//! HTTP API over the training, prediction and EDA services.

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

use crate::application::ml::{PredictionService, TrainingService};
use crate::config::Config;
use crate::domain::repositories::ArtifactStore;
use crate::infrastructure::observability::Metrics;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub training: Arc<TrainingService>,
    pub prediction: Arc<PredictionService>,
    pub metrics: Metrics,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ArtifactStore>, metrics: Metrics) -> Self {
        Self {
            training: Arc::new(TrainingService::new(store.clone(), metrics.clone())),
            prediction: Arc::new(PredictionService::new(store, metrics.clone())),
            metrics,
            config: Arc::new(config),
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/train", post(handlers::train))
        .route("/predict", post(handlers::predict))
        .route("/model_info/:model_name", get(handlers::model_info))
        .route("/models", get(handlers::list_models))
        .route("/eda", post(handlers::eda));

    if state.config.observability.enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
