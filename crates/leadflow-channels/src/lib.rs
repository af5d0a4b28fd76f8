//! # Leadflow Channels
//! Outbound message channel implementations used by campaigns.

pub mod dry_run;
pub mod whatsapp;

pub use dry_run::DryRunChannel;
pub use whatsapp::WhatsAppChannel;
