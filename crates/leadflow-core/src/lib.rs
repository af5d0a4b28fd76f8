//! # Leadflow Core
//!
//! Shared vocabulary for the workspace: configuration, the error type,
//! domain records (leads, users, recipients) and the collaborator traits the
//! campaign engine talks to.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{LeadflowError, Result};
