//! Regression forest used to estimate days until maintenance.
//!
//! Trees are stored as flat node arrays in the layout exported by the offline
//! training job: node 0 is the root, split nodes route left when
//! `features[feature] <= threshold`, and children always sit at a higher index
//! than their parent.

use serde::{Deserialize, Serialize};

use crate::common::error::{MaintError, MaintResult};
use crate::data::domain::FeatureVector;

/// One node of a regression tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf { value }],
        }
    }

    fn validate(&self, n_features: usize) -> MaintResult<()> {
        if self.nodes.is_empty() {
            return Err(MaintError::model("tree has no nodes"));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(MaintError::model(format!(
                            "node {idx} splits on feature {feature}, model has {n_features}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(MaintError::model(format!("node {idx} has a non-finite threshold")));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(MaintError::model(format!(
                                "node {idx} points at invalid child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } if !value.is_finite() => {
                    return Err(MaintError::model(format!("leaf {idx} has a non-finite value")));
                }
                TreeNode::Leaf { .. } => {}
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: &[f64]) -> MaintResult<f64> {
        let mut idx = 0;
        // Children are strictly forward, so a walk never exceeds the node count.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = x
                        .get(*feature)
                        .ok_or_else(|| MaintError::model(format!("missing feature {feature}")))?;
                    idx = if *v <= *threshold { *left } else { *right };
                }
                None => return Err(MaintError::model(format!("dangling node index {idx}"))),
            }
        }
        Err(MaintError::model("tree walk did not reach a leaf"))
    }
}

/// Ensemble of regression trees; the output is the mean of the tree outputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ForestModel {
    pub fn new(n_features: usize, trees: Vec<RegressionTree>) -> MaintResult<Self> {
        let model = Self {
            n_features,
            trees,
            version: None,
        };
        model.validate()?;
        Ok(model)
    }

    /// Model used when no persisted state exists. Every prediction is 0 days.
    pub fn untrained() -> Self {
        Self {
            n_features: 0,
            trees: Vec::new(),
            version: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn validate(&self) -> MaintResult<()> {
        if self.is_trained() && self.n_features == 0 {
            return Err(MaintError::model("trained model declares zero features"));
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(self.n_features))
    }

    /// Raw regression output: estimated days until maintenance, unclipped.
    pub fn predict_days(&self, features: &FeatureVector) -> MaintResult<f64> {
        if !self.is_trained() {
            return Ok(0.0);
        }
        if features.len() != self.n_features {
            return Err(MaintError::model(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.evaluate(features.values())?;
        }
        let days = sum / self.trees.len() as f64;
        if days.is_finite() {
            Ok(days)
        } else {
            Err(MaintError::model("forest produced a non-finite estimate"))
        }
    }
}
