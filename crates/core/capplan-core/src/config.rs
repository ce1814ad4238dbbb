//! Planner constants and scenario files
//!
//! A [`Scenario`] bundles the global tunables ([`PlannerConfig`]) with the
//! fixed list of regions. Scenarios are read from JSON; every planner field
//! has a default so a file only needs to list what it changes.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CapacityError, Result};
use crate::types::{Region, SizeTable};

/// MILP backend used to solve the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    /// Pure-Rust branch and bound (always built by default)
    #[default]
    Microlp,

    /// HiGHS, requires the `highs` feature
    Highs,
}

impl std::fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverBackend::Microlp => write!(f, "microlp"),
            SolverBackend::Highs => write!(f, "highs"),
        }
    }
}

impl FromStr for SolverBackend {
    type Err = CapacityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "microlp" => Ok(SolverBackend::Microlp),
            "highs" => Ok(SolverBackend::Highs),
            other => Err(CapacityError::config(format!("unknown solver backend '{}'", other))),
        }
    }
}

/// Global tunables of the capacity model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Monthly cost of one instance, per size
    pub monthly_cost: SizeTable<f64>,

    /// Compute units (CU) yielded by one instance, per size
    pub compute_units: SizeTable<f64>,

    /// Multiplier (< 1) applied to the latency budget of critical regions
    pub latency_criticality_factor: f64,

    /// Maximum-allowed-latency coefficient
    pub max_latency: f64,

    /// CU floor every region must provision, independent of load
    pub min_capacity_per_region: f64,

    /// Ceiling on the summed monthly cost of all instances
    pub monthly_budget: f64,

    pub solver: SolverBackend,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            monthly_cost: SizeTable::new(36.5, 36.5, 146.0),
            compute_units: SizeTable::new(50.0, 150.0, 300.0),
            latency_criticality_factor: 0.8,
            max_latency: 30.0,
            min_capacity_per_region: 1000.0,
            monthly_budget: 15_000.0,
            solver: SolverBackend::default(),
        }
    }
}

impl PlannerConfig {
    /// Latency budget multiplier for a region (criticality factor or 1)
    pub fn latency_factor(&self, critical: bool) -> f64 {
        if critical { self.latency_criticality_factor } else { 1.0 }
    }

    pub fn validate(&self) -> Result<()> {
        for (size, cost) in self.monthly_cost.iter() {
            if !cost.is_finite() || cost < 0.0 {
                return Err(CapacityError::config(format!("{} instance cost must be >= 0, got {}", size, cost)));
            }
        }
        for (size, units) in self.compute_units.iter() {
            if !units.is_finite() || units <= 0.0 {
                return Err(CapacityError::config(format!("{} instance CU yield must be > 0, got {}", size, units)));
            }
        }
        let factor = self.latency_criticality_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(CapacityError::config(format!(
                "latency criticality factor must be in (0, 1], got {}",
                factor
            )));
        }
        if !self.max_latency.is_finite() || self.max_latency <= 0.0 {
            return Err(CapacityError::config(format!("max latency must be > 0, got {}", self.max_latency)));
        }
        if !self.min_capacity_per_region.is_finite() || self.min_capacity_per_region < 0.0 {
            return Err(CapacityError::config(format!(
                "minimum capacity per region must be >= 0, got {}",
                self.min_capacity_per_region
            )));
        }
        if !self.monthly_budget.is_finite() || self.monthly_budget < 0.0 {
            return Err(CapacityError::config(format!("monthly budget must be >= 0, got {}", self.monthly_budget)));
        }
        Ok(())
    }
}

/// Planner constants plus the fixed set of regions for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub planner: PlannerConfig,
    pub regions: Vec<Region>,
}

impl Scenario {
    pub fn new(planner: PlannerConfig, regions: Vec<Region>) -> Self {
        Self { planner, regions }
    }

    /// Four-region reference deployment with default constants
    pub fn reference() -> Self {
        Self::new(
            PlannerConfig::default(),
            vec![
                Region::new("UsEast", 4500, 50.0).critical(),
                Region::new("UsWest", 3200, 60.0),
                Region::new("EuCentral", 3250, 58.0).critical(),
                Region::new("Asia", 5500, 80.0),
            ],
        )
    }

    /// Load a scenario from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Check constants and region inputs; region names must be unique
    pub fn validate(&self) -> Result<()> {
        self.planner.validate()?;

        if self.regions.is_empty() {
            return Err(CapacityError::config("scenario has no regions"));
        }

        let mut seen = HashSet::with_capacity(self.regions.len());
        for region in &self.regions {
            if !seen.insert(&region.name) {
                return Err(CapacityError::DuplicateRegion(region.name.clone()));
            }
            if region.base_load == 0 {
                return Err(CapacityError::config(format!("region {} has zero base load", region.name)));
            }
            if !region.base_latency.is_finite() || region.base_latency <= 0.0 {
                return Err(CapacityError::config(format!(
                    "region {} base latency must be > 0, got {}",
                    region.name, region.base_latency
                )));
            }
        }
        Ok(())
    }
}
