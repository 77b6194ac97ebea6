//! Configuration types for SOLPAY

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PayError;
use crate::traits::PayResult;
use crate::types::Commitment;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayConfig {
    /// Reference lookup polling
    #[serde(default)]
    pub locator: LocatorConfig,

    /// Transaction fetch polling
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Ledger RPC endpoint
    #[serde(default)]
    pub rpc: RpcConfig,
}

impl PayConfig {
    pub fn from_json(json: &str) -> PayResult<Self> {
        let config: PayConfig = serde_json::from_str(json)
            .map_err(|e| PayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> PayResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that would make a polling loop unbounded or spin
    pub fn validate(&self) -> PayResult<()> {
        self.locator.validate()?;
        self.fetcher.validate()
    }
}

/// Delay policy between empty polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backoff {
    /// Same interval every time
    Fixed,
    /// Interval multiplied by `factor` per attempt, capped at `max_interval_ms`
    Exponential { factor: u32, max_interval_ms: u64 },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed
    }
}

impl Backoff {
    /// Delay after the `attempt`-th empty poll (1-based)
    pub fn delay(&self, base_ms: u64, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed => Duration::from_millis(base_ms),
            Backoff::Exponential { factor, max_interval_ms } => {
                let exponent = attempt.saturating_sub(1);
                let multiplier = u64::from(factor).saturating_pow(exponent);
                Duration::from_millis(base_ms.saturating_mul(multiplier).min(max_interval_ms))
            }
        }
    }
}

/// Reference lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Base delay between polls in milliseconds
    pub poll_interval_ms: u64,

    /// Give up after this many milliseconds without a match
    pub timeout_ms: u64,

    /// Optional cap on the number of queries
    pub max_attempts: Option<u32>,

    /// Delay growth between polls
    pub backoff: Backoff,

    /// Minimum confirmation a signature must reach to be counted
    pub commitment: Commitment,

    /// Signatures requested per query
    pub query_limit: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            timeout_ms: 120_000,
            max_attempts: None,
            backoff: Backoff::Fixed,
            commitment: Commitment::Confirmed,
            query_limit: 10,
        }
    }
}

impl LocatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> PayResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(PayError::Config("locator poll interval must be positive".into()));
        }
        if let Backoff::Exponential {
            factor,
            max_interval_ms,
        } = self.backoff
        {
            if factor < 1 {
                return Err(PayError::Config("backoff factor must be at least 1".into()));
            }
            if max_interval_ms < self.poll_interval_ms {
                return Err(PayError::Config(
                    "backoff ceiling is below the poll interval".into(),
                ));
            }
        }
        if self.query_limit < 2 {
            return Err(PayError::Config(
                "query limit must be at least 2 to detect reference reuse".into(),
            ));
        }
        Ok(())
    }
}

/// Transaction fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Confirmation level the transaction must reach
    pub min_confirmation: Commitment,

    /// Delay between polls in milliseconds
    pub poll_interval_ms: u64,

    /// Give up after this many milliseconds
    pub timeout_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            min_confirmation: Commitment::Confirmed,
            poll_interval_ms: 1000,
            timeout_ms: 60_000,
        }
    }
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> PayResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(PayError::Config("fetcher poll interval must be positive".into()));
        }
        Ok(())
    }
}

/// Ledger RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    pub url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Default commitment for reads
    pub commitment: Commitment,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "https://api.devnet.solana.com".to_string(),
            request_timeout_secs: 30,
            commitment: Commitment::Confirmed,
        }
    }
}
