//! Core traits for Coachlink collaborators.
//!
//! These traits define the seams between request handling and the hosted
//! backend. [`AuthProvider`] issues and validates sessions, [`ProfileStore`]
//! holds the role attribute per identity, [`PlayerDataStore`] holds what the
//! player dashboard shows, and [`ConfigProvider`] exposes the configuration the
//! gate needs.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    Booking, Credentials, Identity, NewProfile, NewUpload, PlayerProfile, Result, Role,
    RouteTable, Session, SignUpOutcome, UploadedFile,
};

/// Session issuance and validation.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use coachlink_core::{
///     AuthProvider, Credentials, Error, Identity, Result, Session, SignUpOutcome,
/// };
///
/// struct SingleUser;
///
/// #[async_trait]
/// impl AuthProvider for SingleUser {
///     async fn resolve_session(&self, credentials: &Credentials) -> Result<Option<Session>> {
///         Ok(match credentials.access_token.as_deref() {
///             Some("demo") => Some(Session::new("demo", Identity::new("u-1"))),
///             _ => None,
///         })
///     }
///
///     async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session> {
///         Err(Error::InvalidCredentials)
///     }
///
///     async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome> {
///         Err(Error::conflict(email.to_string()))
///     }
///
///     async fn sign_out(&self, _access_token: &str) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve request credentials to a session.
    ///
    /// Returns `Ok(None)` for missing, expired, or rejected credentials.
    ///
    /// # Errors
    ///
    /// Returns an error only when the provider could not be asked.
    async fn resolve_session(&self, credentials: &Credentials) -> Result<Option<Session>>;

    /// Exchange an email/password pair for a session.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCredentials`](crate::Error::InvalidCredentials) when the
    /// pair is rejected.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`](crate::Error::Conflict) when the email is taken.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome>;

    /// Invalidate a session.
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

/// Role attribute keyed by identity.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up the role for `identity`.
    ///
    /// `Ok(None)` means no profile exists yet.
    async fn get_role(&self, identity: &Identity) -> Result<Option<Role>>;

    /// Create the profile for a new account, including its role-specific
    /// record.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`](crate::Error::Conflict) when a profile already
    /// exists for the identity. The stored role is left unchanged.
    async fn create_profile(&self, profile: &NewProfile) -> Result<()>;
}

/// Player profile details, uploaded data files and bookings, keyed by the
/// owning player's identity.
///
/// Reads only ever return the given player's own rows.
#[async_trait]
pub trait PlayerDataStore: Send + Sync {
    /// The player's profile row, or `None` if it has not been created.
    async fn player_profile(&self, player: &Identity) -> Result<Option<PlayerProfile>>;

    /// The player's uploads, most recently recorded first.
    async fn uploads(&self, player: &Identity) -> Result<Vec<UploadedFile>>;

    /// The player's bookings, latest booking date first.
    async fn bookings(&self, player: &Identity) -> Result<Vec<Booking>>;

    /// Record an upload and return the stored row.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`](crate::Error::InvalidData) when the record fails
    /// [`NewUpload::validate`].
    async fn record_upload(&self, upload: &NewUpload) -> Result<UploadedFile>;
}

/// Configuration the gate and server read.
///
/// # Bounds
///
/// - `Send + Sync`: Configuration must be shareable across threads
/// - `Clone`: Configuration can be duplicated for passing to subsystems
/// - `'static`: Configuration lifetime is not borrowed
pub trait ConfigProvider: Send + Sync + Clone + 'static {
    /// The project name, used in logs and the `version` command.
    fn project_name(&self) -> &str;

    /// Route table the gate classifies against.
    fn routes(&self) -> &RouteTable;

    /// Name of the cookie carrying the access token.
    fn session_cookie(&self) -> &str;

    /// Upper bound on a single session resolution or role lookup.
    fn lookup_timeout(&self) -> Duration;
}
