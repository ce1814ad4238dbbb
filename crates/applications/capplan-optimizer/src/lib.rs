//! capplan optimizer
//!
//! Multi-region capacity planning as a mixed-integer program: choose
//! instance counts per region and traffic routing fractions between regions
//! so that every region meets its capacity floor and latency budget at
//! minimum monthly cost, within a global budget.

pub mod region;
pub mod model;
pub mod solve;
pub mod plan;
pub mod report;

pub use model::{CapacityModel, ConstraintKind, ModelBuilder};
pub use plan::{extract, plan, CapacityPlan, PlanOutcome, RegionAllocation};
pub use solve::{backend_available, solve, DecisionKey, Outcome, SolvedModel};
