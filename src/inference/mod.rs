//! Inference domain: the prediction cache and the request pipeline.

pub mod cache;
pub mod domain;
pub mod service;

pub use cache::{CacheStats, PredictionCache, Served};
pub use domain::{Prediction, PredictionResponse};
pub use service::MaintenanceService;
