//! Discrete outcome distribution with inverse-CDF sampling

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{BanditError, Result};

/// Probability mass over `0..len()` outcome categories, always summing to 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeDistribution {
    probabilities: Vec<f64>,
}

impl OutcomeDistribution {
    /// Uniform distribution over `categories` outcomes
    pub fn uniform(categories: usize) -> Result<Self> {
        if categories == 0 {
            return Err(BanditError::config("distribution needs at least one category"));
        }
        Ok(Self {
            probabilities: vec![1.0 / categories as f64; categories],
        })
    }

    /// Distribution proportional to `weights`
    pub fn from_weights(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(BanditError::config("distribution needs at least one category"));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(BanditError::config("weights must be finite and non-negative"));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(BanditError::config("weights must not all be zero"));
        }

        let mut distribution = Self { probabilities: weights };
        distribution.normalize();
        Ok(distribution)
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// First category whose cumulative probability exceeds `draw`
    ///
    /// `draw` is expected in `[0, 1)`. Rounding can leave the cumulative sum a
    /// hair below 1, in which case the last category is returned.
    pub fn sample_with_draw(&self, draw: f64) -> usize {
        let mut cumulative = 0.0;
        for (category, p) in self.probabilities.iter().enumerate() {
            cumulative += p;
            if draw < cumulative {
                return category;
            }
        }
        self.probabilities.len() - 1
    }

    /// Sample a category with a uniform draw from `rng`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.sample_with_draw(rng.r#gen::<f64>())
    }

    /// Add `primary` mass at `category` and `neighbor` mass at the adjacent
    /// categories that exist, then renormalize
    pub fn reinforce(&mut self, category: usize, primary: f64, neighbor: f64) -> Result<()> {
        let len = self.probabilities.len();
        if category >= len {
            return Err(BanditError::CategoryOutOfRange { category, len });
        }

        self.probabilities[category] += primary;
        if category > 0 {
            self.probabilities[category - 1] += neighbor;
        }
        if category + 1 < len {
            self.probabilities[category + 1] += neighbor;
        }

        self.normalize();
        Ok(())
    }

    fn normalize(&mut self) {
        let total: f64 = self.probabilities.iter().sum();
        for p in &mut self.probabilities {
            *p /= total;
        }
    }
}
