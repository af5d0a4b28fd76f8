//! Campaign events — every observable step of a run.
//! Broadcast to live subscribers and kept in a small in-memory history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::state::CampaignSummary;

const HISTORY_LIMIT: usize = 100;
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CampaignEvent {
    Started { total: usize },
    Sent { lead_id: i64, position: usize },
    SendFailed { lead_id: i64, position: usize, reason: String },
    /// The message went out but the lead's status could not be updated.
    SyncFailed { lead_id: i64, reason: String },
    Scheduled { position: usize, delay_ms: u64, at: DateTime<Utc> },
    Paused { position: usize },
    Resumed { position: usize },
    Stopped,
    /// A send that finished after its run was stopped.
    StaleResult { lead_id: i64, delivered: bool },
    Completed(CampaignSummary),
}

/// An event with the time it was emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub at: DateTime<Utc>,
    pub event: CampaignEvent,
}

pub(crate) struct EventBus {
    tx: broadcast::Sender<CampaignEvent>,
    history: Mutex<VecDeque<RecordedEvent>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(HISTORY_LIMIT)),
        }
    }

    pub(crate) fn emit(&self, event: CampaignEvent) {
        {
            let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            if history.len() == HISTORY_LIMIT {
                history.pop_front();
            }
            history.push_back(RecordedEvent {
                at: Utc::now(),
                event: event.clone(),
            });
        }
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<CampaignEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn history(&self) -> Vec<RecordedEvent> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let bus = EventBus::new();
        for i in 0..(HISTORY_LIMIT + 5) {
            bus.emit(CampaignEvent::Paused { position: i });
        }
        let history = bus.history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].event, CampaignEvent::Paused { position: 5 });
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(CampaignEvent::Stopped);
        assert_eq!(rx.recv().await.unwrap(), CampaignEvent::Stopped);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(CampaignEvent::Sent { lead_id: 3, position: 0 }).unwrap();
        assert_eq!(json["kind"], "sent");
        assert_eq!(json["lead_id"], 3);
    }
}
