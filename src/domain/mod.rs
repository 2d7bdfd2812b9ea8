// Feature engineering, column contract and model artifacts
pub mod ml;

// Repository traits
pub mod repositories;

// Domain-specific error types
pub mod errors;
