//! Application state management.
//!
//! Provides [`AppState<C>`], the per-process context handed to every request:
//! the configuration plus the backend collaborators. Nothing in it is
//! mutable; request-scoped values (session, role) travel with the request.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! # use async_trait::async_trait;
//! use coachlink_core::{AppState, ConfigProvider, RouteTable};
//! # use coachlink_core::{AuthProvider, Credentials, Identity, NewProfile, ProfileStore};
//! # use coachlink_core::{Booking, NewUpload, PlayerDataStore, PlayerProfile, UploadedFile};
//! # use coachlink_core::{Result, Role, Session, SignUpOutcome};
//! # struct NoAuth;
//! # #[async_trait]
//! # impl AuthProvider for NoAuth {
//! #     async fn resolve_session(&self, _: &Credentials) -> Result<Option<Session>> { Ok(None) }
//! #     async fn sign_in(&self, _: &str, _: &str) -> Result<Session> {
//! #         Err(coachlink_core::Error::InvalidCredentials)
//! #     }
//! #     async fn sign_up(&self, e: &str, _: &str) -> Result<SignUpOutcome> {
//! #         Err(coachlink_core::Error::conflict(e.to_string()))
//! #     }
//! #     async fn sign_out(&self, _: &str) -> Result<()> { Ok(()) }
//! # }
//! # struct NoProfiles;
//! # #[async_trait]
//! # impl ProfileStore for NoProfiles {
//! #     async fn get_role(&self, _: &Identity) -> Result<Option<Role>> { Ok(None) }
//! #     async fn create_profile(&self, _: &NewProfile) -> Result<()> { Ok(()) }
//! # }
//! # struct NoPlayers;
//! # #[async_trait]
//! # impl PlayerDataStore for NoPlayers {
//! #     async fn player_profile(&self, _: &Identity) -> Result<Option<PlayerProfile>> { Ok(None) }
//! #     async fn uploads(&self, _: &Identity) -> Result<Vec<UploadedFile>> { Ok(vec![]) }
//! #     async fn bookings(&self, _: &Identity) -> Result<Vec<Booking>> { Ok(vec![]) }
//! #     async fn record_upload(&self, u: &NewUpload) -> Result<UploadedFile> {
//! #         Err(coachlink_core::Error::invalid_data(u.file_name.clone()))
//! #     }
//! # }
//!
//! #[derive(Clone)]
//! struct MyConfig {
//!     routes: RouteTable,
//! }
//!
//! impl ConfigProvider for MyConfig {
//!     fn project_name(&self) -> &str { "my-project" }
//!     fn routes(&self) -> &RouteTable { &self.routes }
//!     fn session_cookie(&self) -> &str { "session" }
//!     fn lookup_timeout(&self) -> Duration { Duration::from_secs(1) }
//! }
//!
//! let config = MyConfig { routes: RouteTable::default() };
//! let state = AppState::new(
//!     config,
//!     Arc::new(NoAuth),
//!     Arc::new(NoProfiles),
//!     Arc::new(NoPlayers),
//! );
//!
//! assert_eq!(state.config().project_name(), "my-project");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::traits::{AuthProvider, ConfigProvider, PlayerDataStore, ProfileStore};

/// Thread-safe shared application state.
///
/// Generic over `C: ConfigProvider`. Cloning is cheap (Arc clones) and every
/// clone shares the same configuration and collaborators.
pub struct AppState<C: ConfigProvider> {
    config: Arc<C>,
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    players: Arc<dyn PlayerDataStore>,
}

impl<C: ConfigProvider> AppState<C> {
    /// Create a new AppState from a configuration and its collaborators.
    pub fn new(
        config: C,
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        players: Arc<dyn PlayerDataStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            auth,
            profiles,
            players,
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// The authentication provider.
    pub fn auth(&self) -> Arc<dyn AuthProvider> {
        Arc::clone(&self.auth)
    }

    /// The profile store.
    pub fn profiles(&self) -> Arc<dyn ProfileStore> {
        Arc::clone(&self.profiles)
    }

    /// The player data store.
    pub fn players(&self) -> Arc<dyn PlayerDataStore> {
        Arc::clone(&self.players)
    }

    /// Get the project name from the configuration.
    pub fn project_name(&self) -> &str {
        self.config.project_name()
    }
}

impl<C: ConfigProvider> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            auth: Arc::clone(&self.auth),
            profiles: Arc::clone(&self.profiles),
            players: Arc::clone(&self.players),
        }
    }
}

impl<C: ConfigProvider> fmt::Debug for AppState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("project", &self.config.project_name())
            .finish_non_exhaustive()
    }
}
