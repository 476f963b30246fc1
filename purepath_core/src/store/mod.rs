//! File-backed document store.
//!
//! Implements [`ProfileGateway`] and [`AuthGateway`] on a single directory:
//!
//! ```text
//! <root>/profiles.json          all profile documents, keyed by user id
//! <root>/accounts.json          credentials, keyed by normalized email
//! <root>/records/<name>.jsonl   append-only collections
//! <root>/.lock                  held exclusively by every read-modify-write
//! ```
//!
//! File work runs on tokio's blocking pool.

pub mod accounts;
pub mod documents;
pub mod records;

use crate::gateway::{AuthGateway, ProfileGateway};
use crate::{Error, NewProfile, ProfileFields, Result, Role, UserId, UserProfile};
use accounts::{AccountEntry, AccountTable};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Profile documents keyed by user id
type ProfileTable = BTreeMap<UserId, UserProfile>;

/// Local filesystem implementation of the gateway contracts
#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profiles_path(&self) -> PathBuf {
        self.root.join("profiles.json")
    }

    fn accounts_path(&self) -> PathBuf {
        self.root.join("accounts.json")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Validation(format!(
                "invalid collection name '{}'",
                collection
            )));
        }
        Ok(self.root.join("records").join(format!("{}.jsonl", collection)))
    }

    fn read_profile(&self, user_id: &UserId) -> Result<UserProfile> {
        let profiles: ProfileTable = documents::load(&self.profiles_path())?;
        profiles.get(user_id).cloned().ok_or(Error::UserNotFound)
    }

    /// Read-modify-write of one profile under the store lock.
    ///
    /// With `expected` set, the write only happens if the stored
    /// `lastCheckIn` matches it.
    fn update_profile(
        &self,
        user_id: &UserId,
        expected: Option<Option<DateTime<Utc>>>,
        fields: &ProfileFields,
    ) -> Result<()> {
        documents::with_exclusive_lock(&self.lock_path(), || {
            let path = self.profiles_path();
            let mut profiles: ProfileTable = documents::load(&path)?;
            let profile = profiles.get_mut(user_id).ok_or(Error::UserNotFound)?;

            if let Some(expected) = expected {
                if profile.last_check_in != expected {
                    tracing::warn!(
                        user = %user_id,
                        "Conditional write rejected: lastCheckIn is {:?}, expected {:?}",
                        profile.last_check_in,
                        expected
                    );
                    return Err(Error::Conflict(format!(
                        "lastCheckIn is {}",
                        describe(profile.last_check_in)
                    )));
                }
            }

            profile.apply(fields);
            documents::save(&path, &profiles)?;
            tracing::debug!(user = %user_id, "Profile updated");
            Ok(())
        })
    }

    fn register(&self, email: &str, password: &str, new_profile: NewProfile) -> Result<UserId> {
        let email = accounts::normalize_email(email)?;
        accounts::validate_password(password)?;
        let display_name = new_profile.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(Error::Validation("display name must not be empty".into()));
        }
        if let Some(coordinates) = new_profile.coordinates {
            crate::profile::validate_coordinates(&coordinates)?;
        }
        let password_hash = accounts::hash_password(password)?;

        documents::with_exclusive_lock(&self.lock_path(), || {
            let accounts_path = self.accounts_path();
            let mut table: AccountTable = documents::load(&accounts_path)?;
            if table.contains_key(&email) {
                return Err(Error::Auth("Email already in use".into()));
            }

            let role = if table.is_empty() {
                Role::Admin
            } else {
                Role::Member
            };
            let user_id = UserId::generate();
            let now = Utc::now();

            // Profile first: a crash in between leaves an unreachable
            // profile rather than an account without one.
            let profiles_path = self.profiles_path();
            let mut profiles: ProfileTable = documents::load(&profiles_path)?;
            profiles.insert(
                user_id.clone(),
                UserProfile::new(
                    user_id.clone(),
                    NewProfile {
                        display_name,
                        coordinates: new_profile.coordinates,
                    },
                    role,
                    now,
                ),
            );
            documents::save(&profiles_path, &profiles)?;

            table.insert(
                email.clone(),
                AccountEntry {
                    user_id: user_id.clone(),
                    password_hash,
                    created_at: now,
                },
            );
            documents::save(&accounts_path, &table)?;

            tracing::info!(user = %user_id, %role, "Registered account {}", email);
            Ok(user_id)
        })
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<UserId> {
        let invalid = || Error::Auth("Invalid email or password".into());
        let email = accounts::normalize_email(email).map_err(|_| invalid())?;

        let table: AccountTable = documents::load(&self.accounts_path())?;
        let entry = table.get(&email).ok_or_else(invalid)?;
        if !accounts::verify_password(password, &entry.password_hash) {
            tracing::info!("Rejected sign-in for {}", email);
            return Err(invalid());
        }

        tracing::info!(user = %entry.user_id, "Signed in {}", email);
        Ok(entry.user_id.clone())
    }

    /// Run blocking store work off the async executor
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(LocalStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store))
            .await
            .map_err(|e| Error::Persistence(format!("store task failed: {}", e)))?
            .map_err(Error::into_persistence)
    }
}

fn describe(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unset".to_string())
}

#[async_trait]
impl ProfileGateway for LocalStore {
    async fn read(&self, user_id: &UserId) -> Result<UserProfile> {
        let user_id = user_id.clone();
        self.blocking(move |store| store.read_profile(&user_id)).await
    }

    async fn write(&self, user_id: &UserId, fields: &ProfileFields) -> Result<()> {
        let user_id = user_id.clone();
        let fields = fields.clone();
        self.blocking(move |store| store.update_profile(&user_id, None, &fields))
            .await
    }

    async fn write_if_unchanged(
        &self,
        user_id: &UserId,
        expected_last_check_in: Option<DateTime<Utc>>,
        fields: &ProfileFields,
    ) -> Result<()> {
        let user_id = user_id.clone();
        let fields = fields.clone();
        self.blocking(move |store| {
            store.update_profile(&user_id, Some(expected_last_check_in), &fields)
        })
        .await
    }

    async fn append_record(&self, collection: &str, fields: &serde_json::Value) -> Result<()> {
        let path = self.collection_path(collection)?;
        let fields = fields.clone();
        self.blocking(move |_| records::append(&path, &fields)).await
    }

    async fn read_records(
        &self,
        collection: &str,
        user_id: &UserId,
    ) -> Result<Vec<serde_json::Value>> {
        let path = self.collection_path(collection)?;
        let user_id = user_id.clone();
        self.blocking(move |_| {
            let all = records::read_all(&path)?;
            Ok(all
                .into_iter()
                .filter(|r| r.get("userId").and_then(|v| v.as_str()) == Some(user_id.as_str()))
                .collect())
        })
        .await
    }
}

#[async_trait]
impl AuthGateway for LocalStore {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId> {
        let email = email.to_string();
        let password = password.to_string();
        self.blocking(move |store| store.authenticate(&email, &password))
            .await
    }

    async fn sign_up(&self, email: &str, password: &str, profile: NewProfile) -> Result<UserId> {
        let email = email.to_string();
        let password = password.to_string();
        self.blocking(move |store| store.register(&email, &password, profile))
            .await
    }

    async fn sign_out(&self, user_id: &UserId) -> Result<()> {
        // Nothing server-side to revoke for local accounts
        tracing::info!(user = %user_id, "Signed out");
        Ok(())
    }
}
