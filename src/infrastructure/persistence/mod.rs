//! Artifact persistence: fitted models, metrics and learning curves on disk.

pub mod fs_store;

pub use fs_store::FsArtifactStore;
