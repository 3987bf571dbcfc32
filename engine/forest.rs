//! Decision-tree classifier representations.
//!
//! The engine never trains models; it evaluates pre-trained forests that were
//! exported into the bundle artifact. Two flavors exist:
//!
//! - [`BaggedForest`]: trees vote with per-leaf positive-class fractions and
//!   the forest averages them (random-forest style).
//! - [`BoostedForest`]: trees emit additive margins that are summed, scaled by
//!   the learning rate, offset by the base score, and squashed through the
//!   logistic function (gradient-boosting style).
//!
//! Trees are stored in struct-of-arrays form: one entry per node, children
//! referenced by index. Structural validation happens once at load time, so
//! traversal itself stays bounds-checked but branch-free of error paths.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel child index marking a leaf node.
pub const NO_CHILD: u32 = u32::MAX;

/// A model evaluation failed at inference time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelInferenceError {
    #[error("Feature vector has {found} entries, but the model expects {expected}.")]
    FeatureLengthMismatch { found: usize, expected: usize },
    #[error("Tree traversal referenced node {node}, but the tree has {n_nodes} nodes.")]
    NodeOutOfRange { node: u32, n_nodes: usize },
}

/// Structural problems detected when validating a deserialized tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeValidationError {
    #[error("Tree is empty.")]
    Empty,
    #[error("Tree node arrays have inconsistent lengths.")]
    RaggedArrays,
    #[error("Node {node} has exactly one child; splits must have both or neither.")]
    HalfSplit { node: u32 },
    #[error("Node {node} references child {child} outside the tree ({n_nodes} nodes).")]
    ChildOutOfRange { node: u32, child: u32, n_nodes: usize },
    #[error("Node {node} references child {child} that does not follow it; trees must be stored in topological order.")]
    ChildNotForward { node: u32, child: u32 },
    #[error("Split node {node} tests feature {feature}, but the model has {n_features} features.")]
    FeatureOutOfRange { node: u32, feature: u32, n_features: usize },
}

/// One decision tree in struct-of-arrays layout. Node 0 is the root.
///
/// A node is a leaf iff its `left` entry equals [`NO_CHILD`]; leaves carry
/// their payload in `value` and ignore `feature`/`threshold`. Children always
/// come after their parent, which both guarantees traversal termination and
/// keeps the serialized form readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub feature: Vec<u32>,
    pub threshold: Vec<f64>,
    pub left: Vec<u32>,
    pub right: Vec<u32>,
    pub value: Vec<f64>,
}

impl Tree {
    /// A single-node tree that always yields `value`.
    pub fn leaf(value: f64) -> Self {
        Self {
            feature: vec![0],
            threshold: vec![0.0],
            left: vec![NO_CHILD],
            right: vec![NO_CHILD],
            value: vec![value],
        }
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.value.len()
    }

    /// Checks structural invariants against the expected feature count.
    pub fn validate(&self, n_features: usize) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::Empty);
        }
        if self.feature.len() != n_nodes
            || self.threshold.len() != n_nodes
            || self.left.len() != n_nodes
            || self.right.len() != n_nodes
        {
            return Err(TreeValidationError::RaggedArrays);
        }
        for node in 0..n_nodes as u32 {
            let (left, right) = (self.left[node as usize], self.right[node as usize]);
            if (left == NO_CHILD) != (right == NO_CHILD) {
                return Err(TreeValidationError::HalfSplit { node });
            }
            if left == NO_CHILD {
                continue;
            }
            for child in [left, right] {
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfRange { node, child, n_nodes });
                }
                if child <= node {
                    return Err(TreeValidationError::ChildNotForward { node, child });
                }
            }
            let feature = self.feature[node as usize];
            if feature as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    node,
                    feature,
                    n_features,
                });
            }
        }
        Ok(())
    }

    /// Walks from the root to a leaf and returns the leaf payload.
    ///
    /// Split convention: go left iff `x[feature] < threshold`.
    pub fn evaluate(&self, x: ArrayView1<'_, f64>) -> Result<f64, ModelInferenceError> {
        let n_nodes = self.n_nodes();
        let mut node = 0u32;
        loop {
            let idx = node as usize;
            if idx >= n_nodes {
                return Err(ModelInferenceError::NodeOutOfRange { node, n_nodes });
            }
            if self.left[idx] == NO_CHILD {
                return Ok(self.value[idx]);
            }
            let feature = self.feature[idx] as usize;
            if feature >= x.len() {
                return Err(ModelInferenceError::FeatureLengthMismatch {
                    found: x.len(),
                    expected: feature + 1,
                });
            }
            node = if x[feature] < self.threshold[idx] {
                self.left[idx]
            } else {
                self.right[idx]
            };
        }
    }
}

/// Bagging-style classifier: the positive-class probability is the mean of the
/// per-tree leaf fractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaggedForest {
    pub trees: Vec<Tree>,
    /// Global per-feature importances captured at training time,
    /// catalog-ordered.
    pub feature_importances: Vec<f64>,
}

impl BaggedForest {
    pub fn positive_probability(
        &self,
        x: ArrayView1<'_, f64>,
    ) -> Result<f64, ModelInferenceError> {
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(x)?;
        }
        Ok(total / self.trees.len() as f64)
    }
}

/// Boosting-style classifier: trees emit additive margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedForest {
    pub trees: Vec<Tree>,
    pub learning_rate: f64,
    /// Margin offset before any tree contributes (log-odds of the training
    /// base rate).
    pub base_score: f64,
    pub feature_importances: Vec<f64>,
}

impl BoostedForest {
    pub fn positive_probability(
        &self,
        x: ArrayView1<'_, f64>,
    ) -> Result<f64, ModelInferenceError> {
        let mut margin = self.base_score;
        for tree in &self.trees {
            margin += self.learning_rate * tree.evaluate(x)?;
        }
        Ok(sigmoid(margin))
    }
}

#[inline]
fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}
