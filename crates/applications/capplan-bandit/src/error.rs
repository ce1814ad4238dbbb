//! Error types for the bandit simulator

use thiserror::Error;

/// Bandit result type
pub type Result<T> = std::result::Result<T, BanditError>;

#[derive(Error, Debug)]
pub enum BanditError {
    /// Invalid simulator configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Category index outside the distribution
    #[error("Category {category} out of range (distribution has {len})")]
    CategoryOutOfRange { category: usize, len: usize },
}

impl BanditError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
