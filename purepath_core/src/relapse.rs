//! Relapse recording and history.
//!
//! A relapse appends an immutable [`RelapseRecord`] and then resets the
//! streak pair to `{0, now}`. These are two separate store calls with no
//! atomicity between them: if the append fails nothing changes, if the reset
//! fails the record stays.

use crate::gateway::ProfileGateway;
use crate::session::Session;
use crate::{ProfileFields, RelapseRecord, Result, StreakFields};
use chrono::{DateTime, Utc};

/// Record a relapse for the session's user at `now`
pub async fn record_relapse<P: ProfileGateway + ?Sized>(
    session: &mut Session,
    profiles: &P,
    now: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<RelapseRecord> {
    let mut profile = profiles.read(session.user_id()).await?;

    let record = RelapseRecord::new(session.user_id().clone(), now, notes);
    profiles
        .append_record(RelapseRecord::COLLECTION, &serde_json::to_value(&record)?)
        .await?;

    let fields = ProfileFields::streak(StreakFields {
        streak_days: 0,
        last_check_in: Some(now),
    });
    if let Err(e) = profiles.write(session.user_id(), &fields).await {
        tracing::warn!(
            user = %session.user_id(),
            record = %record.id,
            "Relapse recorded but streak reset failed: {}",
            e
        );
        return Err(e);
    }

    profile.apply(&fields);
    session.cache(profile);

    tracing::info!(user = %session.user_id(), record = %record.id, "Relapse recorded");
    Ok(record)
}

/// The session user's relapse records, newest first
pub async fn relapse_history<P: ProfileGateway + ?Sized>(
    session: &Session,
    profiles: &P,
) -> Result<Vec<RelapseRecord>> {
    let raw = profiles
        .read_records(RelapseRecord::COLLECTION, session.user_id())
        .await?;

    let mut records: Vec<RelapseRecord> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping unreadable relapse record: {}", e);
                None
            }
        })
        .collect();

    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use crate::{Error, NewProfile, UserId, UserProfile};
    use async_trait::async_trait;
    use chrono::TimeZone;

    async fn new_session(store: &LocalStore, email: &str) -> Session {
        Session::sign_up(
            store,
            store,
            email,
            "secret1",
            NewProfile {
                display_name: "Sam".into(),
                coordinates: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_relapse_resets_streak() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let mut session = new_session(&store, "sam@example.com").await;

        store
            .write(
                session.user_id(),
                &ProfileFields::streak(StreakFields {
                    streak_days: 12,
                    last_check_in: Some(Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap()),
                }),
            )
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap();
        let record = record_relapse(&mut session, &store, now, Some("rough night"))
            .await
            .unwrap();

        assert_eq!(record.notes, "rough night");
        assert_eq!(&record.user_id, session.user_id());
        assert_eq!(record.timestamp, now);

        let stored = store.read(session.user_id()).await.unwrap();
        assert_eq!(stored.streak_days, 0);
        assert_eq!(stored.last_check_in, Some(now));
        assert_eq!(session.profile().unwrap().streak_days, 0);
    }

    #[tokio::test]
    async fn test_relapse_without_notes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let mut session = new_session(&store, "sam@example.com").await;

        let record = record_relapse(&mut session, &store, Utc::now(), None)
            .await
            .unwrap();
        assert_eq!(record.notes, "");
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_per_user() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let mut sam = new_session(&store, "sam@example.com").await;
        let mut ana = new_session(&store, "ana@example.com").await;

        let day = |d| Utc.with_ymd_and_hms(2024, 3, d, 9, 0, 0).unwrap();
        record_relapse(&mut sam, &store, day(1), Some("first")).await.unwrap();
        record_relapse(&mut ana, &store, day(2), Some("other user")).await.unwrap();
        record_relapse(&mut sam, &store, day(5), Some("second")).await.unwrap();

        let history = relapse_history(&sam, &store).await.unwrap();
        let notes: Vec<_> = history.iter().map(|r| r.notes.as_str()).collect();
        assert_eq!(notes, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_relapse_for_missing_profile() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let mut session = new_session(&store, "sam@example.com").await;

        // Wipe the profile document out from under the session
        std::fs::write(temp_dir.path().join("profiles.json"), "{}").unwrap();

        let result = record_relapse(&mut session, &store, Utc::now(), None).await;
        assert!(matches!(result, Err(Error::UserNotFound)));

        let history = store
            .read_records(RelapseRecord::COLLECTION, session.user_id())
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    /// Delegates to a real store but fails the chosen step
    struct FailingGateway<'a> {
        store: &'a LocalStore,
        fail_append: bool,
        fail_write: bool,
    }

    #[async_trait]
    impl<'a> ProfileGateway for FailingGateway<'a> {
        async fn read(&self, user_id: &UserId) -> Result<UserProfile> {
            self.store.read(user_id).await
        }

        async fn write(&self, user_id: &UserId, fields: &ProfileFields) -> Result<()> {
            if self.fail_write {
                return Err(Error::Persistence("disk full".into()));
            }
            self.store.write(user_id, fields).await
        }

        async fn write_if_unchanged(
            &self,
            user_id: &UserId,
            expected: Option<DateTime<Utc>>,
            fields: &ProfileFields,
        ) -> Result<()> {
            self.store.write_if_unchanged(user_id, expected, fields).await
        }

        async fn append_record(&self, collection: &str, fields: &serde_json::Value) -> Result<()> {
            if self.fail_append {
                return Err(Error::Persistence("disk full".into()));
            }
            self.store.append_record(collection, fields).await
        }

        async fn read_records(&self, c: &str, u: &UserId) -> Result<Vec<serde_json::Value>> {
            self.store.read_records(c, u).await
        }
    }

    async fn session_with_streak(store: &LocalStore, days: u32) -> Session {
        let mut session = new_session(store, "sam@example.com").await;
        store
            .write(
                session.user_id(),
                &ProfileFields::streak(StreakFields {
                    streak_days: days,
                    last_check_in: Some(Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap()),
                }),
            )
            .await
            .unwrap();
        session.refresh(store).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_failed_append_leaves_profile_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let mut session = session_with_streak(&store, 7).await;
        let gateway = FailingGateway {
            store: &store,
            fail_append: true,
            fail_write: false,
        };

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap();
        let result = record_relapse(&mut session, &gateway, now, Some("rough night")).await;
        assert!(matches!(result, Err(Error::Persistence(_))));

        let stored = store.read(session.user_id()).await.unwrap();
        assert_eq!(stored.streak_days, 7);
        assert_eq!(
            stored.last_check_in,
            Some(Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap())
        );
        assert_eq!(session.profile().unwrap().streak_days, 7);
        assert!(relapse_history(&session, &store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_record_and_cache() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let mut session = session_with_streak(&store, 7).await;
        let gateway = FailingGateway {
            store: &store,
            fail_append: false,
            fail_write: true,
        };

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap();
        let result = record_relapse(&mut session, &gateway, now, Some("rough night")).await;
        match result {
            Err(Error::Persistence(msg)) => assert_eq!(msg, "disk full"),
            other => panic!("expected persistence error, got {:?}", other),
        }

        let history = relapse_history(&session, &store).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].notes, "rough night");

        assert_eq!(store.read(session.user_id()).await.unwrap().streak_days, 7);
        assert_eq!(session.profile().unwrap().streak_days, 7);
    }
}
