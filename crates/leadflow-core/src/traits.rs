//! Collaborator seams used by the campaign engine.
//!
//! The engine never talks to HTTP or SQLite directly; it is handed a
//! [`MessageChannel`] and a [`LeadStatusStore`] at construction time.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::LeadStatus;

/// Outbound text delivery (WhatsApp gateway, dry-run logger, test fakes).
#[async_trait]
pub trait MessageChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver `text` to an already-normalized contact handle.
    /// Returns the gateway's message id, or an empty string if none is reported.
    async fn send_text(&self, contact_handle: &str, text: &str) -> Result<String>;
}

/// Write side of the lead store used after a successful send.
#[async_trait]
pub trait LeadStatusStore: Send + Sync {
    /// Move a lead to `status`. Must be idempotent.
    async fn set_status(&self, lead_id: i64, status: LeadStatus) -> Result<()>;
}
