//! Regressors that consume the positional feature vector.
//!
//! `salary_model.json` is tagged by `kind`. Supported shapes:
//! - `linear`: intercept plus one coefficient per model column.
//! - `forest`: a bag of regression trees in scikit-learn's array layout,
//!   averaged. Node 0 is the root; `x[feature] <= threshold` goes left.

use serde::{Deserialize, Serialize};

use crate::prediction::PredictionError;

/// Maps an ordered numeric feature vector to a scalar prediction.
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError>;

    /// Number of features the regressor was trained on.
    fn n_features(&self) -> usize;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorArtifact {
    Linear(LinearRegressor),
    Forest(ForestRegressor),
}

impl RegressorArtifact {
    /// Checks the artifact against the expected column count.
    pub fn validate(&self, n_columns: usize) -> Result<(), String> {
        match self {
            RegressorArtifact::Linear(linear) => {
                if linear.coefficients.len() != n_columns {
                    return Err(format!(
                        "linear model has {} coefficients but {} model columns",
                        linear.coefficients.len(),
                        n_columns
                    ));
                }
                Ok(())
            }
            RegressorArtifact::Forest(forest) => {
                if forest.trees.is_empty() {
                    return Err("forest model has no trees".to_string());
                }
                for (i, tree) in forest.trees.iter().enumerate() {
                    tree.validate(n_columns)
                        .map_err(|e| format!("tree {i}: {e}"))?;
                }
                Ok(())
            }
        }
    }

    pub fn into_regressor(self, n_columns: usize) -> Box<dyn Regressor> {
        match self {
            RegressorArtifact::Linear(linear) => Box::new(linear),
            RegressorArtifact::Forest(mut forest) => {
                forest.n_features = n_columns;
                Box::new(forest)
            }
        }
    }
}

fn check_width(expected: usize, features: &[f64]) -> Result<(), PredictionError> {
    if features.len() != expected {
        return Err(PredictionError::Failed(format!(
            "X has {} features, but the model is expecting {} features as input",
            features.len(),
            expected
        )));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Linear
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    #[serde(default)]
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        check_width(self.coefficients.len(), features)?;
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>())
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Forest
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Children must point forward so evaluation always terminates.
    fn validate(&self, n_columns: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_columns {
                    return Err(format!(
                        "node {idx} splits on feature {feature}, only {n_columns} columns"
                    ));
                }
                for child in [*left, *right] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(format!("node {idx} has invalid child index {child}"));
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).copied().ok_or_else(|| {
                        PredictionError::Failed(format!("feature index {feature} out of range"))
                    })?;
                    idx = if x <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(PredictionError::Failed(format!(
                        "tree node {idx} does not exist"
                    )))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestRegressor {
    pub trees: Vec<RegressionTree>,
    #[serde(skip)]
    n_features: usize,
}

impl Regressor for ForestRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        check_width(self.n_features, features)?;
        if self.trees.is_empty() {
            return Err(PredictionError::Failed("forest has no trees".to_string()));
        }
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(features)?;
        }
        Ok(total / self.trees.len() as f64)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}
