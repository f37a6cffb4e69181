//! Engine configuration.
//!
//! The only tunable the slippage core needs is the notional `order_amount`.
//! The rest controls how partitions are scheduled and how ambiguous clearing
//! is treated.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::depth::reducer::ClearingPolicy;
use crate::error::{Result, SlippageError};

/// How partitions are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// One partition after another on the calling thread
    Sequential,

    /// The global rayon pool (default)
    #[default]
    Auto,

    /// A dedicated pool with this many worker threads
    Threads(usize),
}

/// Configuration for [`SlippageEngine`](crate::engine::SlippageEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Notional size in quote-currency units
    pub order_amount: f64,

    /// Treatment of walks with more than one filled row
    #[serde(default)]
    pub clearing_policy: ClearingPolicy,

    /// Partition scheduling
    #[serde(default)]
    pub parallelism: Parallelism,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_amount: 1_000_000.0,
            clearing_policy: ClearingPolicy::Strict,
            parallelism: Parallelism::Auto,
        }
    }
}

impl EngineConfig {
    /// Create a config for the given notional.
    pub fn new(order_amount: f64) -> Self {
        Self {
            order_amount,
            ..Default::default()
        }
    }

    /// Set the clearing policy.
    pub fn with_clearing_policy(mut self, policy: ClearingPolicy) -> Self {
        self.clearing_policy = policy;
        self
    }

    /// Set partition scheduling.
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Check the config before any partition runs.
    pub fn validate(&self) -> Result<()> {
        if !(self.order_amount.is_finite() && self.order_amount > 0.0) {
            return Err(SlippageError::config(format!(
                "order_amount must be positive and finite, got {}",
                self.order_amount
            )));
        }
        if self.parallelism == Parallelism::Threads(0) {
            return Err(SlippageError::config("thread count must be at least 1"));
        }
        Ok(())
    }

    /// Save to JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
