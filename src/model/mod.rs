//! Model domain: the regression forest, its persistence and prediction rules.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{ForestModel, RegressionTree, TreeNode};
pub use repo_fs::{FsModelRepo, ModelRepo};
