//! Core domain types for PurePath.
//!
//! This module defines the fundamental types used throughout the system:
//! - User identity and profile documents
//! - The streak field pair written on check-in and relapse
//! - Partial profile updates and sign-up payloads
//! - Relapse records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identity
// ============================================================================

/// Opaque user identifier issued by the auth backend
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account role
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Member => f.write_str("member"),
        }
    }
}

/// Geographic coordinates attached to a profile
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

// ============================================================================
// Profile
// ============================================================================

/// The streak pair. Always written together.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreakFields {
    pub streak_days: u32,
    pub last_check_in: Option<DateTime<Utc>>,
}

/// A user's profile document as held by the store
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub role: Role,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub last_check_in: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Build a fresh profile for a newly registered user
    pub fn new(id: UserId, fields: NewProfile, role: Role, joined_at: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name: fields.display_name,
            coordinates: fields.coordinates,
            role,
            joined_at,
            streak_days: 0,
            last_check_in: None,
        }
    }

    pub fn streak(&self) -> StreakFields {
        StreakFields {
            streak_days: self.streak_days,
            last_check_in: self.last_check_in,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, fields: &ProfileFields) {
        if let Some(ref name) = fields.display_name {
            self.display_name = name.clone();
        }
        if let Some(coordinates) = fields.coordinates {
            self.coordinates = coordinates;
        }
        if let Some(streak) = fields.streak {
            self.streak_days = streak.streak_days;
            self.last_check_in = streak.last_check_in;
        }
    }
}

/// Partial profile update passed to the gateway's `write`.
///
/// `None` leaves a field untouched. `coordinates: Some(None)` clears them.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ProfileFields {
    pub display_name: Option<String>,
    pub coordinates: Option<Option<Coordinates>>,
    pub streak: Option<StreakFields>,
}

impl ProfileFields {
    pub fn streak(streak: StreakFields) -> Self {
        Self {
            streak: Some(streak),
            ..Self::default()
        }
    }

    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn coordinates(coordinates: Option<Coordinates>) -> Self {
        Self {
            coordinates: Some(coordinates),
            ..Self::default()
        }
    }
}

/// Profile fields supplied at sign-up
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub display_name: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

// ============================================================================
// Records
// ============================================================================

/// An append-only relapse entry
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelapseRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

impl RelapseRecord {
    /// Collection name in the document store
    pub const COLLECTION: &'static str = "relapses";

    pub fn new(user_id: UserId, timestamp: DateTime<Utc>, notes: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            timestamp,
            notes: notes.unwrap_or_default().to_string(),
        }
    }
}
