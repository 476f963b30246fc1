//! Daily check-in.
//!
//! Reads the profile fresh from the store, asks the streak engine what the
//! check-in does, and persists the new streak pair with a conditional write
//! keyed on the `lastCheckIn` that was read. Two racing check-ins on the
//! same day can't both win.

use crate::config::StreakConfig;
use crate::gateway::ProfileGateway;
use crate::session::Session;
use crate::streak::{self, StreakDecision};
use crate::{Error, ProfileFields, Result, StreakFields};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a check-in did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckInOutcome {
    pub decision: StreakDecision,
    /// Timestamp written as `lastCheckIn`, `None` when nothing was written
    pub recorded_at: Option<DateTime<Utc>>,
}

impl CheckInOutcome {
    pub fn streak_days(&self) -> u32 {
        self.decision.streak_days()
    }

    pub fn changed(&self) -> bool {
        self.decision.changed()
    }

    pub fn message(&self) -> &'static str {
        self.decision.message()
    }
}

/// Check-in result flattened for the UI layer
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_days: Option<u32>,
    pub changed: bool,
    pub message: String,
}

impl CheckInReport {
    pub fn from_result(result: &Result<CheckInOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                streak_days: Some(outcome.streak_days()),
                changed: outcome.changed(),
                message: outcome.message().to_string(),
            },
            Err(e) => Self {
                success: false,
                streak_days: None,
                changed: false,
                message: e.to_string(),
            },
        }
    }
}

/// Check the session's user in at `now`.
///
/// On any failure the session's cached profile is left as it was.
pub async fn check_in<P: ProfileGateway + ?Sized>(
    session: &mut Session,
    profiles: &P,
    now: DateTime<Utc>,
    config: &StreakConfig,
) -> Result<CheckInOutcome> {
    let offset = config.fixed_offset()?;
    let mut profile = profiles.read(session.user_id()).await?;

    let decision = streak::evaluate(
        profile
            .last_check_in
            .map(|ts| streak::calendar_date(ts, offset)),
        streak::calendar_date(now, offset),
        profile.streak_days,
        config.yesterday_rule,
    );

    if !decision.changed() {
        tracing::info!(
            user = %session.user_id(),
            streak_days = decision.streak_days(),
            "Already checked in today"
        );
        session.cache(profile);
        return Ok(CheckInOutcome {
            decision,
            recorded_at: None,
        });
    }

    let fields = ProfileFields::streak(StreakFields {
        streak_days: decision.streak_days(),
        last_check_in: Some(now),
    });

    profiles
        .write_if_unchanged(session.user_id(), profile.last_check_in, &fields)
        .await
        .map_err(|e| {
            tracing::warn!(user = %session.user_id(), "Check-in not saved: {}", e);
            e
        })?;

    profile.apply(&fields);
    session.cache(profile);

    tracing::info!(
        user = %session.user_id(),
        streak_days = decision.streak_days(),
        "{}",
        decision.message()
    );

    Ok(CheckInOutcome {
        decision,
        recorded_at: Some(now),
    })
}

/// Same as [`check_in`] but requires a session, for callers holding an `Option`
pub async fn check_in_signed_in<P: ProfileGateway + ?Sized>(
    session: Option<&mut Session>,
    profiles: &P,
    now: DateTime<Utc>,
    config: &StreakConfig,
) -> Result<CheckInOutcome> {
    let session = session.ok_or(Error::NotSignedIn)?;
    check_in(session, profiles, now, config).await
}
