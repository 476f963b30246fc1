//! Contracts for the external authenticated document store.
//!
//! The core never talks to a backend directly; it goes through these traits.
//! [`crate::store::LocalStore`] implements both against the local filesystem.

use crate::{NewProfile, ProfileFields, Result, UserId, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Profile documents and append-only record collections
#[async_trait]
pub trait ProfileGateway: Send + Sync {
    /// Read a profile. Fails with `Error::UserNotFound` if it doesn't exist.
    async fn read(&self, user_id: &UserId) -> Result<UserProfile>;

    /// Apply a partial update unconditionally
    async fn write(&self, user_id: &UserId, fields: &ProfileFields) -> Result<()>;

    /// Apply a partial update only if the stored `lastCheckIn` still equals
    /// `expected_last_check_in`. Fails with `Error::Conflict` otherwise.
    async fn write_if_unchanged(
        &self,
        user_id: &UserId,
        expected_last_check_in: Option<DateTime<Utc>>,
        fields: &ProfileFields,
    ) -> Result<()>;

    /// Append a record to a collection
    async fn append_record(&self, collection: &str, fields: &serde_json::Value) -> Result<()>;

    /// All records in a collection whose `userId` matches, in append order
    async fn read_records(
        &self,
        collection: &str,
        user_id: &UserId,
    ) -> Result<Vec<serde_json::Value>>;
}

/// Account authentication
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId>;

    /// Register a new account and create its profile document
    async fn sign_up(&self, email: &str, password: &str, profile: NewProfile) -> Result<UserId>;

    async fn sign_out(&self, user_id: &UserId) -> Result<()>;
}
