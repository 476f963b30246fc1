//! Profile editing.
//!
//! Only display name and coordinates are editable here. Streak fields go
//! through [`crate::checkin`] and [`crate::relapse`].

use crate::gateway::ProfileGateway;
use crate::session::Session;
use crate::{Coordinates, Error, ProfileFields, Result, UserProfile};

pub fn validate_coordinates(coordinates: &Coordinates) -> Result<()> {
    let Coordinates {
        latitude,
        longitude,
    } = *coordinates;

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::Validation(format!(
            "latitude {} outside [-90, 90]",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::Validation(format!(
            "longitude {} outside [-180, 180]",
            longitude
        )));
    }
    Ok(())
}

pub async fn update_display_name<P: ProfileGateway + ?Sized>(
    session: &mut Session,
    profiles: &P,
    name: &str,
) -> Result<UserProfile> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("display name must not be empty".into()));
    }

    profiles
        .write(session.user_id(), &ProfileFields::display_name(name))
        .await?;
    tracing::info!(user = %session.user_id(), "Display name updated");
    session.refresh(profiles).await.cloned()
}

/// Set or clear (`None`) the profile's coordinates
pub async fn update_coordinates<P: ProfileGateway + ?Sized>(
    session: &mut Session,
    profiles: &P,
    coordinates: Option<Coordinates>,
) -> Result<UserProfile> {
    if let Some(ref c) = coordinates {
        validate_coordinates(c)?;
    }

    profiles
        .write(session.user_id(), &ProfileFields::coordinates(coordinates))
        .await?;
    tracing::info!(user = %session.user_id(), "Coordinates updated");
    session.refresh(profiles).await.cloned()
}
