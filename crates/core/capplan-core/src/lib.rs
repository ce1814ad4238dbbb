//! capplan core - shared types for the capacity planner
//!
//! This crate defines the inputs consumed by `capplan-optimizer`:
//! - Region and instance-size types
//! - Planner constants and scenario files
//! - Error types

pub mod types;
pub mod config;
pub mod error;

pub use types::*;
pub use config::*;
pub use error::*;
