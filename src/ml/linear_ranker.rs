use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::domain::error::PipelineError;
use crate::domain::traits::{Persistable, Ranker};

/// Scores a feature row as `bias + Σ weight_i · feature_i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRanker {
    pub weights: Vec<f32>,
    pub bias:    f32,
}

impl LinearRanker {
    pub fn new(weights: Vec<f32>, bias: f32) -> Self {
        Self { weights, bias }
    }

    /// Equal weights summing to one, zero bias. An untrained default.
    pub fn uniform(n_features: usize) -> Self {
        let w = if n_features == 0 { 0.0 } else { 1.0 / n_features as f32 };
        Self::new(vec![w; n_features], 0.0)
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }
}

impl Ranker for LinearRanker {
    fn predict(&self, feature_rows: &[Vec<f32>]) -> Result<Vec<f32>> {
        feature_rows
            .iter()
            .map(|row| -> Result<f32> {
                if row.len() != self.weights.len() {
                    return Err(PipelineError::shape_mismatch(
                        "linear ranker feature row",
                        self.weights.len(),
                        row.len(),
                    )
                    .into());
                }
                Ok(self.bias + row.iter().zip(&self.weights).map(|(x, w)| x * w).sum::<f32>())
            })
            .collect()
    }
}

impl Persistable for LinearRanker {
    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write ranker weights to '{}'", path.display()))?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read ranker weights from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid ranker weights in '{}'", path.display()))
    }
}
