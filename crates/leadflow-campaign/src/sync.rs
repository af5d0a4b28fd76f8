//! Status synchronizer — moves a messaged lead to the "first contact" column.

use leadflow_core::error::Result;
use leadflow_core::traits::LeadStatusStore;
use leadflow_core::types::{LeadStatus, Recipient};
use std::sync::Arc;

/// Best-effort write-back to the lead store after a successful send.
#[derive(Clone)]
pub struct StatusSynchronizer {
    store: Arc<dyn LeadStatusStore>,
    target: LeadStatus,
}

impl StatusSynchronizer {
    pub fn new(store: Arc<dyn LeadStatusStore>) -> Self {
        Self {
            store,
            target: LeadStatus::FirstContact,
        }
    }

    /// Errors are returned to the caller, which reports them without
    /// undoing the sent bookkeeping.
    pub async fn mark_contacted(&self, recipient: &Recipient) -> Result<()> {
        self.store.set_status(recipient.id, self.target).await.inspect_err(|e| {
            tracing::warn!(
                "⚠️ Status sync failed for lead {} ({}): {e}",
                recipient.id,
                recipient.display_name
            );
        })
    }
}
