//! Coachlink Core: shared types, traits, and errors.
//!
//! This crate provides the foundational types used across all Coachlink crates.
//! It has no internal Coachlink dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`identity`]: Sessions, identities, roles, and request credentials
//! - [`player`]: Player profile details, uploaded data files, and bookings
//! - [`routes`]: The route table the access gate classifies paths against
//! - [`state`]: Shared application state container
//! - [`traits`]: Collaborator traits (authentication provider, profile store,
//!   player data)

pub mod error;
pub mod identity;
pub mod player;
pub mod routes;
pub mod state;
pub mod traits;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use identity::{Credentials, Identity, NewProfile, Role, Session, SignUpOutcome};
pub use player::{Booking, NewUpload, PlayerDashboard, PlayerProfile, UploadedFile};
pub use routes::{PathClass, RouteTable};
pub use state::AppState;
pub use traits::{AuthProvider, ConfigProvider, PlayerDataStore, ProfileStore};
