pub mod eda_service;
pub mod evaluation;
pub mod prediction_service;
pub mod training_service;

pub use prediction_service::{ModelInfo, PredictionService};
pub use training_service::TrainingService;
