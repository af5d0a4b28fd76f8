//! Campaign run record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignStatus::Idle => write!(f, "idle"),
            CampaignStatus::Running => write!(f, "running"),
            CampaignStatus::Paused => write!(f, "paused"),
            CampaignStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Mutable progress of one run.
///
/// Invariant: `sent_count == completed_ids.len() <= position <= total`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignState {
    pub status: CampaignStatus,
    /// Index of the next recipient to process.
    pub position: usize,
    pub sent_count: usize,
    pub completed_ids: BTreeSet<i64>,
    pub next_send_at: Option<DateTime<Utc>>,
}

impl CampaignState {
    pub fn running() -> Self {
        Self {
            status: CampaignStatus::Running,
            ..Self::default()
        }
    }

    pub fn record_sent(&mut self, lead_id: i64) {
        if self.completed_ids.insert(lead_id) {
            self.sent_count += 1;
        }
    }
}

/// Read-only view handed to operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub status: CampaignStatus,
    pub position: usize,
    pub sent_count: usize,
    pub total_recipients: usize,
    pub next_send_at: Option<DateTime<Utc>>,
    pub completed_ids: Vec<i64>,
}

impl CampaignSnapshot {
    pub fn new(state: &CampaignState, total_recipients: usize) -> Self {
        Self {
            status: state.status,
            position: state.position,
            sent_count: state.sent_count,
            total_recipients,
            next_send_at: state.next_send_at,
            completed_ids: state.completed_ids.iter().copied().collect(),
        }
    }

    /// Recipients not successfully messaged yet.
    pub fn remaining(&self) -> usize {
        self.total_recipients.saturating_sub(self.sent_count)
    }
}

/// Emitted once when a run reaches the end of its recipient set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub sent_count: usize,
    pub total_recipients: usize,
}

impl CampaignSummary {
    pub fn failed_count(&self) -> usize {
        self.total_recipients.saturating_sub(self.sent_count)
    }
}
