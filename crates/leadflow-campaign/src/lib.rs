//! # Leadflow Campaign
//!
//! Paced outbound messaging over a fixed list of leads.
//!
//! ## Design
//! - One recipient at a time, never two sends in flight
//! - Randomized gap between sends (default 60–150 s) to stay under gateway throttling
//! - Pause / resume / stop without losing the progress cursor
//! - A failed send is recorded and skipped, never retried within the run
//! - Successful sends move the lead to "first contact" in the store
//!
//! ## Architecture
//! ```text
//! CampaignController (owns CampaignState + timer handle)
//!   ├── start(message, RecipientSet) ──► process_next(position 0)
//!   ├── pause()  ── aborts pending timer
//!   ├── resume() ──► process_next(position) immediately
//!   └── stop()   ── aborts timer, resets to Idle
//!
//! process_next
//!   ├── MessageChannel::send_text(normalized handle, message)
//!   ├── ok  → StatusSynchronizer → completed_ids, sent_count
//!   ├── position += 1
//!   └── still Running → arm timer(random delay) ──► process_next
//! ```

pub mod contact;
pub mod controller;
pub mod delay;
mod dispatch;
pub mod error;
pub mod events;
pub mod recipients;
pub mod state;
pub mod sync;

pub use controller::CampaignController;
pub use delay::DelayPolicy;
pub use error::CampaignError;
pub use events::{CampaignEvent, RecordedEvent};
pub use recipients::{build_recipient_set, unique_categories};
pub use state::{CampaignSnapshot, CampaignState, CampaignStatus, CampaignSummary};
pub use sync::StatusSynchronizer;
