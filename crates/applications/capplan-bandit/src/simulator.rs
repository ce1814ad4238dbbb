//! Round-based bandit simulation
//!
//! Each round:
//! 1. snapshot every option's distribution
//! 2. sample one category per option (inverse CDF)
//! 3. select the option with the highest sampled category
//! 4. draw feedback uniformly over the categories, independent of the selection
//! 5. reinforce the selected option around the feedback category

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distribution::OutcomeDistribution;
use crate::error::{BanditError, Result};

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanditConfig {
    pub options: Vec<String>,
    pub categories: usize,
    pub rounds: usize,

    /// Mass added at the feedback category
    pub primary_boost: f64,

    /// Mass added at each neighbour of the feedback category
    pub neighbor_boost: f64,
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            options: ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect(),
            categories: 5,
            rounds: 4,
            primary_boost: 0.05,
            neighbor_boost: 0.03,
        }
    }
}

impl BanditConfig {
    pub fn validate(&self) -> Result<()> {
        if self.options.is_empty() {
            return Err(BanditError::config("at least one option is required"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.options.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(BanditError::config(format!("duplicate option '{}'", dup)));
        }
        if self.categories == 0 {
            return Err(BanditError::config("at least one outcome category is required"));
        }
        if self.rounds == 0 {
            return Err(BanditError::config("at least one round is required"));
        }
        for (name, boost) in [("primary", self.primary_boost), ("neighbor", self.neighbor_boost)] {
            if !boost.is_finite() || boost < 0.0 {
                return Err(BanditError::config(format!("{} boost must be >= 0, got {}", name, boost)));
            }
        }
        Ok(())
    }
}

/// Distribution of one option at the start of a round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSnapshot {
    pub option: String,
    pub distribution: OutcomeDistribution,
}

/// Everything that happened in one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 1-based round number
    pub round: usize,
    pub snapshot: Vec<OptionSnapshot>,

    /// Sampled category per option, in option order
    pub samples: Vec<usize>,
    pub selected: String,
    pub selected_sample: usize,
    pub feedback: usize,
}

/// Index of the highest sample; on ties the later option wins
pub fn select_highest(samples: &[usize]) -> Option<usize> {
    samples
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, usize)>, (index, &sample)| match best {
            Some((_, top)) if sample < top => best,
            _ => Some((index, sample)),
        })
        .map(|(index, _)| index)
}

/// Bandit simulator over an injected random source
pub struct BanditSimulator<R: Rng> {
    config: BanditConfig,
    arms: Vec<(String, OutcomeDistribution)>,
    rng: R,
    round: usize,
}

impl<R: Rng> BanditSimulator<R> {
    pub fn new(config: BanditConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let arms = config
            .options
            .iter()
            .map(|name| Ok((name.clone(), OutcomeDistribution::uniform(config.categories)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            arms,
            rng,
            round: 0,
        })
    }

    /// Rounds completed so far
    pub fn rounds_played(&self) -> usize {
        self.round
    }

    pub fn distribution(&self, option: &str) -> Option<&OutcomeDistribution> {
        self.arms
            .iter()
            .find(|(name, _)| name == option)
            .map(|(_, distribution)| distribution)
    }

    pub fn snapshot(&self) -> Vec<OptionSnapshot> {
        self.arms
            .iter()
            .map(|(option, distribution)| OptionSnapshot {
                option: option.clone(),
                distribution: distribution.clone(),
            })
            .collect()
    }

    /// Play one round
    pub fn step(&mut self) -> Result<RoundRecord> {
        self.round += 1;
        let snapshot = self.snapshot();

        let rng = &mut self.rng;
        let samples: Vec<usize> = self.arms.iter().map(|(_, distribution)| distribution.sample(rng)).collect();
        let selected = select_highest(&samples)
            .ok_or_else(|| BanditError::config("no options to select from"))?;

        let feedback = self.rng.gen_range(0..self.config.categories);

        let (name, distribution) = &mut self.arms[selected];
        distribution.reinforce(feedback, self.config.primary_boost, self.config.neighbor_boost)?;

        debug!(
            round = self.round,
            selected = %name,
            sample = samples[selected],
            feedback,
            "Bandit round complete"
        );

        Ok(RoundRecord {
            round: self.round,
            snapshot,
            selected: name.clone(),
            selected_sample: samples[selected],
            samples,
            feedback,
        })
    }

    /// Play every configured round
    pub fn run(&mut self) -> Result<Vec<RoundRecord>> {
        (0..self.config.rounds).map(|_| self.step()).collect()
    }
}
