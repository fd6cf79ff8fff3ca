//! Edits made from the settings screen.

use tracing::info;

use crate::{
    controller::Advisory,
    error::StorageError,
    location::LocationProvider,
    model::Preferences,
    store::PreferenceStore,
};

/// Result of a settings edit that may be refused.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsOutcome {
    Saved(Preferences),
    Refused(Advisory),
}

/// Switch to location-based fetching, if the location source has permission.
///
/// Without permission nothing is written and the caller gets the advisory to show.
pub async fn enable_location_fetch(
    store: &PreferenceStore,
    location: &dyn LocationProvider,
) -> Result<SettingsOutcome, StorageError> {
    if !location.has_permission() {
        info!("location fetch refused: no permission");
        return Ok(SettingsOutcome::Refused(Advisory::LocationPermissionRequired));
    }

    let prefs = store.update(|p| p.fetch_by_location = true).await?;
    Ok(SettingsOutcome::Saved(prefs))
}

/// Switch back to fetching by city name. Always allowed.
pub async fn disable_location_fetch(store: &PreferenceStore) -> Result<Preferences, StorageError> {
    store.update(|p| p.fetch_by_location = false).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::DeviceLocation;
    use crate::store::STORE_FILE_NAME;

    #[tokio::test]
    async fn refused_without_permission() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path().join(STORE_FILE_NAME)).await;
        let location = DeviceLocation::new(false);

        let outcome = enable_location_fetch(&store, &location).await.unwrap();

        assert_eq!(outcome, SettingsOutcome::Refused(Advisory::LocationPermissionRequired));
        assert!(!store.current().fetch_by_location);
    }

    #[tokio::test]
    async fn enabled_with_permission_then_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path().join(STORE_FILE_NAME)).await;
        store.save("Oulu", true, false).await.unwrap();
        let location = DeviceLocation::new(true);

        let outcome = enable_location_fetch(&store, &location).await.unwrap();
        assert_eq!(outcome, SettingsOutcome::Saved(Preferences::new("Oulu", true, true)));

        let prefs = disable_location_fetch(&store).await.unwrap();
        assert_eq!(prefs, Preferences::new("Oulu", true, false));
    }
}
