//! Reference lookup state machine
//!
//! The lookup is modelled as explicit states driven by observations, so the
//! policy (what counts as found, ambiguous or expired and how long to wait)
//! stays independent of whichever loop schedules the queries.
//!
//! ```text
//! Waiting ──1 match──▶ Found
//!    │ ──n matches──▶ Ambiguous
//!    │ ──deadline / attempt cap──▶ TimedOut
//!    └ ──cancel──▶ Cancelled
//! ```

use serde::{Deserialize, Serialize};
use solpay_core::{LocatorConfig, SignatureInfo};
use std::time::Duration;

/// Where a reference lookup stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum LookupState {
    /// No match yet; `attempts` queries made so far
    Waiting { attempts: u32 },
    Found(SignatureInfo),
    /// The reference appears in more than one transaction
    Ambiguous { count: usize },
    TimedOut { attempts: u32 },
    Cancelled,
}

impl LookupState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LookupState::Waiting { .. })
    }
}

/// Pure driver-agnostic lookup policy
#[derive(Debug, Clone)]
pub struct ReferencePoll {
    config: LocatorConfig,
    state: LookupState,
}

impl ReferencePoll {
    pub fn new(config: LocatorConfig) -> Self {
        Self {
            config,
            state: LookupState::Waiting { attempts: 0 },
        }
    }

    pub fn state(&self) -> &LookupState {
        &self.state
    }

    pub fn into_state(self) -> LookupState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        match self.state {
            LookupState::Waiting { attempts } | LookupState::TimedOut { attempts } => attempts,
            _ => 0,
        }
    }

    /// Abandon the lookup; terminal states are kept as they are
    pub fn cancel(&mut self) -> &LookupState {
        if !self.state.is_terminal() {
            self.state = LookupState::Cancelled;
        }
        &self.state
    }

    /// Feed the result of one query issued `elapsed` after the lookup began
    pub fn observe(&mut self, signatures: Vec<SignatureInfo>, elapsed: Duration) -> &LookupState {
        let LookupState::Waiting { attempts } = self.state else {
            return &self.state;
        };
        let attempts = attempts + 1;

        // Entries below the required commitment are not yet visible to us
        let minimum = self.config.commitment;
        let mut visible: Vec<SignatureInfo> = signatures
            .into_iter()
            .filter(|info| {
                info.confirmation_status
                    .map_or(true, |status| status.satisfies(minimum))
            })
            .collect();

        self.state = match visible.len() {
            0 if self.is_exhausted(attempts, elapsed) => LookupState::TimedOut { attempts },
            0 => LookupState::Waiting { attempts },
            1 => LookupState::Found(visible.remove(0)),
            count => LookupState::Ambiguous { count },
        };
        &self.state
    }

    fn is_exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        elapsed >= self.config.timeout()
            || self
                .config
                .max_attempts
                .map_or(false, |max| attempts >= max)
    }

    /// How long to wait before the next query, `None` once terminal
    ///
    /// Never sleeps past the deadline, so the final query lands on it.
    pub fn next_delay(&self, elapsed: Duration) -> Option<Duration> {
        match self.state {
            LookupState::Waiting { attempts } => {
                let delay = self
                    .config
                    .backoff
                    .delay(self.config.poll_interval_ms, attempts.max(1));
                let remaining = self.config.timeout().saturating_sub(elapsed);
                Some(delay.min(remaining))
            }
            _ => None,
        }
    }
}
