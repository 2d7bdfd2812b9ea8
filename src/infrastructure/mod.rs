pub mod csv_source;
pub mod observability;
pub mod persistence;
pub mod rendering;
