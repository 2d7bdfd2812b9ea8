pub mod category_encoder;
pub mod feature_registry;
pub mod feature_transform;
pub mod model;

pub use category_encoder::CategoryEncoder;
pub use model::{Classifier, LearningCurve, MetricsRecord, ModelParams, TrainedModel};
