//! # Leadflow Store
//!
//! SQLite-backed lead board: leads, seller accounts and the daily
//! lead-creation metrics derived from them.

pub mod db;

pub use db::LeadDb;
