//! Core types shared across capplan components

use serde::{Deserialize, Serialize};

/// Unique identifier for a region
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Instance size offered in every region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceSize {
    Small,
    Medium,
    Large,
}

impl InstanceSize {
    pub const ALL: [InstanceSize; 3] = [InstanceSize::Small, InstanceSize::Medium, InstanceSize::Large];
}

impl std::fmt::Display for InstanceSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceSize::Small => write!(f, "small"),
            InstanceSize::Medium => write!(f, "medium"),
            InstanceSize::Large => write!(f, "large"),
        }
    }
}

/// One value per instance size (monthly cost, compute-unit yield, counts)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeTable<T> {
    pub small: T,
    pub medium: T,
    pub large: T,
}

impl<T: Copy> SizeTable<T> {
    pub fn new(small: T, medium: T, large: T) -> Self {
        Self { small, medium, large }
    }

    pub fn get(&self, size: InstanceSize) -> T {
        match size {
            InstanceSize::Small => self.small,
            InstanceSize::Medium => self.medium,
            InstanceSize::Large => self.large,
        }
    }

    /// Iterate `(size, value)` pairs in small, medium, large order
    pub fn iter(&self) -> impl Iterator<Item = (InstanceSize, T)> + '_ {
        InstanceSize::ALL.into_iter().map(move |size| (size, self.get(size)))
    }
}

impl SizeTable<f64> {
    /// Sum of `self[size] * other[size]` over all sizes
    pub fn dot(&self, other: &SizeTable<f64>) -> f64 {
        self.iter().map(|(size, value)| value * other.get(size)).sum()
    }
}

/// A deployable geographic region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: RegionId,

    /// Traffic units originating in this region
    pub base_load: u64,

    /// Intrinsic latency of the region (ms)
    pub base_latency: f64,

    /// Critical regions get a tightened latency tolerance
    #[serde(default)]
    pub critical: bool,
}

impl Region {
    pub fn new(name: impl Into<String>, base_load: u64, base_latency: f64) -> Self {
        Self {
            name: RegionId::new(name),
            base_load,
            base_latency,
            critical: false,
        }
    }

    /// Mark the region as critical
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}
