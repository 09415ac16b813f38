//! Player dashboard reads and upload records.
//!
//! File bytes go straight from the client to the backend's storage bucket;
//! this service only picks the storage key and records the metadata row.

use std::sync::Arc;

use chrono::NaiveDate;
use coachlink_core::{
    AppState, ConfigProvider, Identity, NewUpload, PlayerDashboard, PlayerDataStore, Result,
    UploadedFile,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Upload form: what the player says about the file.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    /// Game, practice or session name.
    pub event_name: String,
    /// Kind of event, e.g. `Game`.
    pub event_type: String,
    /// Day the event took place, `YYYY-MM-DD`.
    pub event_date: NaiveDate,
    /// Where the numbers came from.
    pub data_source: String,
    /// Name of the file as chosen by the player.
    pub file_name: String,
}

/// Reads and writes a player's own dashboard data.
#[derive(Clone)]
pub struct PlayerService {
    players: Arc<dyn PlayerDataStore>,
}

impl PlayerService {
    /// Create a service over the given store.
    pub fn new(players: Arc<dyn PlayerDataStore>) -> Self {
        Self { players }
    }

    /// Build from shared application state.
    pub fn from_state<C: ConfigProvider>(state: &AppState<C>) -> Self {
        Self::new(state.players())
    }

    /// Everything the dashboard shows for `player`.
    ///
    /// The three reads run concurrently. A read that fails is logged and its
    /// section left empty, so one broken table does not blank the page.
    pub async fn dashboard(&self, player: &Identity) -> PlayerDashboard {
        let (profile, files, bookings) = tokio::join!(
            self.players.player_profile(player),
            self.players.uploads(player),
            self.players.bookings(player),
        );

        PlayerDashboard {
            profile: profile.unwrap_or_else(|e| {
                warn!(%player, error = %e, "Player profile read failed");
                None
            }),
            files: files.unwrap_or_else(|e| {
                warn!(%player, error = %e, "Upload list read failed");
                Vec::new()
            }),
            bookings: bookings.unwrap_or_else(|e| {
                warn!(%player, error = %e, "Booking list read failed");
                Vec::new()
            }),
        }
    }

    /// Record an upload under the player's own storage folder.
    pub async fn record_upload(
        &self,
        player: &Identity,
        request: UploadRequest,
    ) -> Result<UploadedFile> {
        let file_name = request.file_name.trim().to_string();
        let upload = NewUpload {
            player_id: player.clone(),
            event_name: request.event_name.trim().to_string(),
            event_type: request.event_type.trim().to_string(),
            event_date: request.event_date,
            data_source: request.data_source.trim().to_string(),
            file_path: storage_key(player, &file_name),
            file_name,
        };
        upload.validate()?;

        let stored = self.players.record_upload(&upload).await?;
        info!(%player, file = %stored.file_path, "Recorded upload");
        Ok(stored)
    }
}

/// `{player}/{random}.{ext}`, keeping the extension of `file_name` if any.
fn storage_key(player: &Identity, file_name: &str) -> String {
    let object = Uuid::new_v4();
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{player}/{object}.{}", ext.to_ascii_lowercase())
        }
        _ => format!("{player}/{object}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::MemoryPlayerStore;
    use coachlink_core::{Booking, Error, PlayerProfile};

    fn request(file_name: &str) -> UploadRequest {
        UploadRequest {
            event_name: " Spring Opener ".into(),
            event_type: "Game".into(),
            event_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            data_source: "Team Stats".into(),
            file_name: file_name.into(),
        }
    }

    #[test]
    fn test_storage_key() {
        let player = Identity::new("p-1");
        let key = storage_key(&player, "Game Stats.CSV");
        assert!(key.starts_with("p-1/"));
        assert!(key.ends_with(".csv"));

        assert!(!storage_key(&player, "notes").contains('.'));
        assert!(!storage_key(&player, ".hidden").ends_with(".hidden"));
    }

    #[tokio::test]
    async fn test_record_upload_then_dashboard() {
        let store = MemoryPlayerStore::new();
        let service = PlayerService::new(Arc::new(store.clone()));
        let player = Identity::new("p-1");

        let stored = service
            .record_upload(&player, request("opener.pdf"))
            .await
            .unwrap();
        assert_eq!(stored.event_name, "Spring Opener");
        assert!(stored.file_path.starts_with("p-1/"));

        let dashboard = service.dashboard(&player).await;
        assert_eq!(dashboard.files, vec![stored]);
        assert!(service.dashboard(&Identity::new("p-2")).await.files.is_empty());
    }

    #[tokio::test]
    async fn test_record_upload_rejects_blank_fields() {
        let service = PlayerService::new(Arc::new(MemoryPlayerStore::new()));
        let mut blank = request("x.csv");
        blank.data_source = "   ".into();
        assert!(matches!(
            service.record_upload(&Identity::new("p-1"), blank).await,
            Err(Error::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_dashboard_collects_all_sections() {
        let store = MemoryPlayerStore::new();
        let player = Identity::new("p-1");
        store.insert_profile(PlayerProfile::empty(player.clone())).await;
        store
            .insert_booking(
                player.clone(),
                Booking {
                    id: "b-1".into(),
                    coach_id: Identity::new("c-1"),
                    coach_name: Some("Casey Coach".into()),
                    cost: 50.0,
                    booking_date: "2024-04-01".into(),
                    analysis_status: "Scheduled".into(),
                },
            )
            .await;

        let dashboard = PlayerService::new(Arc::new(store)).dashboard(&player).await;
        assert_eq!(dashboard.profile.unwrap().id, player);
        assert_eq!(dashboard.bookings.len(), 1);
        assert!(dashboard.files.is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_degrades_on_failure() {
        let store = MemoryPlayerStore::new();
        let player = Identity::new("p-1");
        store.insert_profile(PlayerProfile::empty(player.clone())).await;
        store.set_failing(true);

        let dashboard = PlayerService::new(Arc::new(store)).dashboard(&player).await;
        assert_eq!(dashboard, PlayerDashboard::default());
    }
}
