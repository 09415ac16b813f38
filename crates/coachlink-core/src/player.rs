//! Player-side records: profile details, uploaded data files, and bookings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::{Error, Result};

/// Athletic and academic details from the player's profile row.
///
/// A new player's row holds only the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Same identity as the account.
    pub id: Identity,
    /// Age as entered.
    #[serde(default)]
    pub age: Option<String>,
    /// Expected high-school graduation year.
    #[serde(default)]
    pub graduation_year: Option<String>,
    /// Batting/throwing hands, e.g. `R/R`.
    #[serde(default)]
    pub bat_throw: Option<String>,
    /// Height as entered.
    #[serde(default)]
    pub height: Option<String>,
    /// Weight as entered.
    #[serde(default)]
    pub weight: Option<String>,
    /// Positions played.
    #[serde(default)]
    pub positions: Vec<String>,
    /// Current school.
    #[serde(default)]
    pub school: Option<String>,
    /// Grade point average.
    #[serde(default)]
    pub gpa: Option<String>,
    /// SAT score.
    #[serde(default)]
    pub sat_score: Option<String>,
    /// ACT score.
    #[serde(default)]
    pub act_score: Option<String>,
    /// Level of play, e.g. `High School Varsity`.
    #[serde(default)]
    pub current_level: Option<String>,
}

impl PlayerProfile {
    /// A profile with nothing filled in.
    pub fn empty(id: Identity) -> Self {
        Self {
            id,
            age: None,
            graduation_year: None,
            bat_throw: None,
            height: None,
            weight: None,
            positions: Vec::new(),
            school: None,
            gpa: None,
            sat_score: None,
            act_score: None,
            current_level: None,
        }
    }
}

/// A performance-data file a player has recorded against an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Row id.
    pub id: String,
    /// Owner.
    pub player_id: Identity,
    /// Game, practice or session name.
    pub event_name: String,
    /// Kind of event, e.g. `Game` or `Practice`.
    pub event_type: String,
    /// Day the event took place.
    pub event_date: NaiveDate,
    /// Where the numbers came from.
    pub data_source: String,
    /// Name of the file as uploaded.
    pub file_name: String,
    /// Storage key, `{player_id}/{object name}`.
    pub file_path: String,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

/// Metadata for a new upload record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUpload {
    /// Owner.
    pub player_id: Identity,
    /// Game, practice or session name.
    pub event_name: String,
    /// Kind of event.
    pub event_type: String,
    /// Day the event took place.
    pub event_date: NaiveDate,
    /// Where the numbers came from.
    pub data_source: String,
    /// Name of the file as uploaded.
    pub file_name: String,
    /// Storage key; must start with `{player_id}/`.
    pub file_path: String,
}

impl NewUpload {
    /// Reject records with blank descriptive fields.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("event_name", &self.event_name),
            ("event_type", &self.event_type),
            ("data_source", &self.data_source),
            ("file_name", &self.file_name),
            ("file_path", &self.file_path),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid_data(format!("{field} is required")));
            }
        }
        if !self
            .file_path
            .starts_with(&format!("{}/", self.player_id))
        {
            return Err(Error::invalid_data(
                "file_path must sit under the player's own folder",
            ));
        }
        Ok(())
    }
}

/// An analysis booking a player made with a coach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Row id.
    pub id: String,
    /// Coach providing the analysis.
    pub coach_id: Identity,
    /// Coach display name, when the coach's profile could be joined.
    #[serde(default)]
    pub coach_name: Option<String>,
    /// Price agreed for the booking.
    pub cost: f64,
    /// Scheduled date as stored.
    pub booking_date: String,
    /// e.g. `Scheduled`, `In Progress`, `Completed`.
    pub analysis_status: String,
}

/// Everything the player dashboard shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerDashboard {
    /// Profile details; `None` when the player has no profile row yet.
    pub profile: Option<PlayerProfile>,
    /// Uploads, newest first.
    pub files: Vec<UploadedFile>,
    /// Bookings, latest booking date first.
    pub bookings: Vec<Booking>,
}
