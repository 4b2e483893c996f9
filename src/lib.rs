// lib.rs - maintenance prediction core
pub mod alerts;
pub mod api;
pub mod common;
pub mod data;
pub mod history;
pub mod inference;
pub mod model;

pub use common::{ErrorCode, MaintError, MaintResult};
pub use inference::{MaintenanceService, Prediction, PredictionResponse};
