//! capplan bandit
//!
//! Round-based exploration over a fixed set of options. Each option keeps a
//! discrete distribution over outcome categories; every round samples each
//! option, picks the highest sample, and reinforces the picked option around
//! a feedback category.

pub mod error;
pub mod distribution;
pub mod simulator;

pub use distribution::OutcomeDistribution;
pub use error::{BanditError, Result};
pub use simulator::{BanditConfig, BanditSimulator, RoundRecord};
