//! Data domain: equipment identifiers and feature lookup.

pub mod domain;
pub mod repo_fs;
pub mod repo_mem;

pub use domain::{EquipmentId, FeatureStore, FeatureVector};
pub use repo_fs::JsonFeatureStore;
pub use repo_mem::MemoryFeatureStore;
