//! Signed-in session.
//!
//! A [`Session`] exists only between sign-in (or sign-up) and sign-out.
//! Components that act on behalf of the user take it by reference; there is
//! no process-wide "current user".
//!
//! The identity part of a session can be persisted to a small JSON file so
//! a CLI can span several invocations. The profile cache is never persisted.

use crate::gateway::{AuthGateway, ProfileGateway};
use crate::store::documents;
use crate::{Error, NewProfile, Result, UserId, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    user_id: UserId,
    email: String,
    started_at: DateTime<Utc>,
}

/// An authenticated user plus a transient copy of their profile
#[derive(Clone, Debug)]
pub struct Session {
    user_id: UserId,
    email: String,
    started_at: DateTime<Utc>,
    profile: Option<UserProfile>,
}

impl Session {
    pub async fn sign_in<A, P>(auth: &A, profiles: &P, email: &str, password: &str) -> Result<Self>
    where
        A: AuthGateway + ?Sized,
        P: ProfileGateway + ?Sized,
    {
        let user_id = auth.sign_in(email, password).await?;
        let mut session = Self::started(user_id, email);
        session.load_profile(profiles).await?;
        Ok(session)
    }

    pub async fn sign_up<A, P>(
        auth: &A,
        profiles: &P,
        email: &str,
        password: &str,
        profile: NewProfile,
    ) -> Result<Self>
    where
        A: AuthGateway + ?Sized,
        P: ProfileGateway + ?Sized,
    {
        let user_id = auth.sign_up(email, password, profile).await?;
        let mut session = Self::started(user_id, email);
        session.load_profile(profiles).await?;
        Ok(session)
    }

    /// End the session. Consumes it so nothing can act on a signed-out user.
    pub async fn sign_out<A: AuthGateway + ?Sized>(self, auth: &A) -> Result<()> {
        auth.sign_out(&self.user_id).await
    }

    fn started(user_id: UserId, email: &str) -> Self {
        Self {
            user_id,
            email: email.trim().to_lowercase(),
            started_at: Utc::now(),
            profile: None,
        }
    }

    /// Populate the cache, tolerating a missing profile document
    async fn load_profile<P: ProfileGateway + ?Sized>(&mut self, profiles: &P) -> Result<()> {
        match profiles.read(&self.user_id).await {
            Ok(profile) => {
                self.profile = Some(profile);
                Ok(())
            }
            Err(Error::UserNotFound) => {
                tracing::warn!(user = %self.user_id, "Signed in without a profile document");
                self.profile = None;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Cached profile, as of the last read or successful write
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub(crate) fn cache(&mut self, profile: UserProfile) {
        self.profile = Some(profile);
    }

    /// Re-read the profile from the store
    pub async fn refresh<P: ProfileGateway + ?Sized>(
        &mut self,
        profiles: &P,
    ) -> Result<&UserProfile> {
        let profile = profiles.read(&self.user_id).await?;
        Ok(&*self.profile.insert(profile))
    }

    /// Persist the session identity
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = SessionFile {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            started_at: self.started_at,
        };
        documents::save(path, &Some(file))
    }

    /// Restore a persisted session, `None` if nobody is signed in.
    /// The profile cache starts empty; call [`Session::refresh`].
    pub fn restore(path: &Path) -> Result<Option<Self>> {
        let file: Option<SessionFile> = documents::load(path)?;
        Ok(file.map(|f| Self {
            user_id: f.user_id,
            email: f.email,
            started_at: f.started_at,
            profile: None,
        }))
    }

    /// Remove a persisted session file
    pub fn clear(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
