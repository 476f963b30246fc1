#![forbid(unsafe_code)]

//! Core domain model and business logic for PurePath.
//!
//! This crate provides:
//! - Domain types (profiles, streak fields, relapse records)
//! - The streak engine
//! - Gateway contracts for the authenticated document store
//! - A local file-backed store implementing them
//! - Session lifecycle, check-in, relapse and profile operations

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod streak;
pub mod gateway;
pub mod store;
pub mod session;
pub mod checkin;
pub mod relapse;
pub mod profile;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, StreakConfig};
pub use streak::{StreakDecision, YesterdayRule};
pub use gateway::{AuthGateway, ProfileGateway};
pub use store::LocalStore;
pub use session::Session;
pub use checkin::{check_in, CheckInOutcome, CheckInReport};
pub use relapse::{record_relapse, relapse_history};
