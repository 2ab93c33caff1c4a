/// Value objects for job polling
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::shared::domain::RecordKind;

/// State reported by a destination job poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Running => write!(f, "running"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    /// Accepts the destination's progress vocabulary, which has drifted
    /// between API versions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" | "pending" | "queued" | "processing" | "inprogress" => Ok(JobState::Running),
            "succeeded" | "success" | "completed" | "complete" | "done" => Ok(JobState::Succeeded),
            "failed" | "failure" | "error" | "cancelled" => Ok(JobState::Failed),
            _ => Err(format!("Invalid job state: {}", s)),
        }
    }
}

/// Fixed-delay polling budget for one record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total number of polls before giving up
    pub max_attempts: u32,
    /// Delay between consecutive polls (no backoff)
    pub delay: Duration,
}

impl PollPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Simple reference records finish quickly
    pub const fn reference_record() -> Self {
        Self::new(10, Duration::from_secs(2))
    }

    /// Ordinary transactions with a handful of lines
    pub const fn transaction() -> Self {
        Self::new(30, Duration::from_secs(3))
    }

    /// Inventory movements and journals can carry thousands of lines
    pub const fn bulk() -> Self {
        Self::new(60, Duration::from_secs(5))
    }

    /// Upper bound on how long a resolution may suspend
    pub fn ceiling(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }
}

/// Record kind to polling budget; kinds without an entry use the default
#[derive(Debug, Clone)]
pub struct PollPolicyTable {
    default: PollPolicy,
    by_kind: HashMap<RecordKind, PollPolicy>,
}

impl PollPolicyTable {
    /// Table used for real migrations
    pub fn standard() -> Self {
        use RecordKind::*;

        let mut by_kind = HashMap::new();
        for kind in [
            Customer,
            Vendor,
            Employee,
            Account,
            Subsidiary,
            Location,
            Department,
            Classification,
            Currency,
            Term,
            LotMapping,
        ] {
            by_kind.insert(kind, PollPolicy::reference_record());
        }
        for kind in [
            InventoryItem,
            ItemReceipt,
            InventoryAdjustment,
            InventoryTransfer,
            JournalEntry,
        ] {
            by_kind.insert(kind, PollPolicy::bulk());
        }

        Self {
            default: PollPolicy::transaction(),
            by_kind,
        }
    }

    /// Same policy for every kind
    pub fn uniform(policy: PollPolicy) -> Self {
        Self {
            default: policy,
            by_kind: HashMap::new(),
        }
    }

    pub fn with_override(mut self, kind: RecordKind, policy: PollPolicy) -> Self {
        self.by_kind.insert(kind, policy);
        self
    }

    pub fn policy_for(&self, kind: RecordKind) -> PollPolicy {
        self.by_kind.get(&kind).copied().unwrap_or(self.default)
    }
}

impl Default for PollPolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}
