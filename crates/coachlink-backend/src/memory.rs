//! In-memory authentication provider, profile store and player data store.
//!
//! Useful for tests and local development without a hosted backend. Clones
//! share state, so a test can keep a clone to flip failure modes or read call
//! counters after handing the original to a gate. Passwords are kept as given;
//! do not point real users at these.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use coachlink_core::{
    AuthProvider, Booking, Credentials, Error, Identity, NewProfile, NewUpload, PlayerDataStore,
    PlayerProfile, ProfileStore, Result, Role, Session, SignUpOutcome, UploadedFile,
};
use tokio::sync::RwLock;
use uuid::Uuid;

// ============================================================================
// Authentication provider
// ============================================================================

/// Authentication provider backed by in-process maps.
#[derive(Clone, Default)]
pub struct MemoryAuthProvider {
    tables: Arc<RwLock<AuthTables>>,
    failing: Arc<AtomicBool>,
    resolves: Arc<AtomicUsize>,
    resolve_delay: Option<Duration>,
}

#[derive(Default)]
struct AuthTables {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, Session>,
}

struct Account {
    identity: Identity,
    password: String,
}

impl MemoryAuthProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with pre-issued sessions.
    ///
    /// # Examples
    ///
    /// ```
    /// use coachlink_backend::MemoryAuthProvider;
    /// use coachlink_core::Identity;
    ///
    /// let auth = MemoryAuthProvider::with_sessions([("demo-token", Identity::new("u-1"))]);
    /// ```
    pub fn with_sessions<I, T>(sessions: I) -> Self
    where
        I: IntoIterator<Item = (T, Identity)>,
        T: Into<String>,
    {
        let sessions = sessions
            .into_iter()
            .map(|(token, identity)| {
                let token = token.into();
                (token.clone(), Session::new(token, identity))
            })
            .collect();
        Self {
            tables: Arc::new(RwLock::new(AuthTables {
                accounts: HashMap::new(),
                sessions,
            })),
            ..Self::default()
        }
    }

    /// Delay every session resolution, to exercise caller timeouts.
    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = Some(delay);
        self
    }

    /// Make every call fail with a backend error (or stop doing so).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `resolve_session` calls so far.
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::backend("auth provider unavailable"));
        }
        Ok(())
    }

    fn issue(tables: &mut AuthTables, identity: &Identity, email: &str) -> Session {
        let token = Uuid::new_v4().to_string();
        let session = Session::new(token.clone(), identity.clone()).with_email(email);
        tables.sessions.insert(token, session.clone());
        session
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn resolve_session(&self, credentials: &Credentials) -> Result<Option<Session>> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.resolve_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        let Some(token) = credentials.access_token.as_deref() else {
            return Ok(None);
        };
        Ok(self.tables.read().await.sessions.get(token).cloned())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.check_available()?;
        let email = email.trim().to_ascii_lowercase();
        let mut tables = self.tables.write().await;
        let identity = match tables.accounts.get(&email) {
            Some(account) if account.password == password => account.identity.clone(),
            _ => return Err(Error::InvalidCredentials),
        };
        Ok(Self::issue(&mut tables, &identity, &email))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        self.check_available()?;
        let email = email.trim().to_ascii_lowercase();
        let mut tables = self.tables.write().await;
        if tables.accounts.contains_key(&email) {
            return Err(Error::conflict(format!("account already exists for {email}")));
        }
        let identity = Identity::new(Uuid::new_v4().to_string());
        tables.accounts.insert(
            email.clone(),
            Account {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        let session = Self::issue(&mut tables, &identity, &email);
        Ok(SignUpOutcome {
            identity,
            session: Some(session),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.check_available()?;
        self.tables.write().await.sessions.remove(access_token);
        Ok(())
    }
}

// ============================================================================
// Profile store
// ============================================================================

/// Profile store backed by an in-process map.
#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<RwLock<HashMap<Identity, NewProfile>>>,
    failing: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
    lookup_delay: Option<Duration>,
}

impl MemoryProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding bare profiles with the given roles.
    pub fn from_roles<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = (Identity, Role)>,
    {
        let profiles = roles
            .into_iter()
            .map(|(id, role)| {
                let profile = NewProfile {
                    id: id.clone(),
                    email: String::new(),
                    full_name: String::new(),
                    role,
                };
                (id, profile)
            })
            .collect();
        Self {
            profiles: Arc::new(RwLock::new(profiles)),
            ..Self::default()
        }
    }

    /// Delay every role lookup, to exercise caller timeouts.
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    /// Make every call fail with a backend error (or stop doing so).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `get_role` calls so far, including failed ones.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Stored profile for `identity`.
    pub async fn profile(&self, identity: &Identity) -> Option<NewProfile> {
        self.profiles.read().await.get(identity).cloned()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::backend("profile store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_role(&self, identity: &Identity) -> Result<Option<Role>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        Ok(self.profiles.read().await.get(identity).map(|p| p.role))
    }

    async fn create_profile(&self, profile: &NewProfile) -> Result<()> {
        self.check_available()?;
        if !profile.role.is_known() {
            return Err(Error::invalid_data("profile role must be player or coach"));
        }
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Err(Error::conflict(format!(
                "profile already exists for {}",
                profile.id
            )));
        }
        profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}

// ============================================================================
// Player data store
// ============================================================================

/// Player data store backed by in-process maps.
#[derive(Clone, Default)]
pub struct MemoryPlayerStore {
    tables: Arc<RwLock<PlayerTables>>,
    failing: Arc<AtomicBool>,
}

#[derive(Default)]
struct PlayerTables {
    profiles: HashMap<Identity, PlayerProfile>,
    // Insertion order; newest last.
    uploads: Vec<UploadedFile>,
    bookings: HashMap<Identity, Vec<Booking>>,
}

impl MemoryPlayerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) a player's profile row.
    pub async fn insert_profile(&self, profile: PlayerProfile) {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.id.clone(), profile);
    }

    /// Add a booking for `player`.
    pub async fn insert_booking(&self, player: Identity, booking: Booking) {
        self.tables
            .write()
            .await
            .bookings
            .entry(player)
            .or_default()
            .push(booking);
    }

    /// Make every call fail with a backend error (or stop doing so).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::backend("player data store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerDataStore for MemoryPlayerStore {
    async fn player_profile(&self, player: &Identity) -> Result<Option<PlayerProfile>> {
        self.check_available()?;
        Ok(self.tables.read().await.profiles.get(player).cloned())
    }

    async fn uploads(&self, player: &Identity) -> Result<Vec<UploadedFile>> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .await
            .uploads
            .iter()
            .rev()
            .filter(|file| &file.player_id == player)
            .cloned()
            .collect())
    }

    async fn bookings(&self, player: &Identity) -> Result<Vec<Booking>> {
        self.check_available()?;
        let mut bookings = self
            .tables
            .read()
            .await
            .bookings
            .get(player)
            .cloned()
            .unwrap_or_default();
        bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
        Ok(bookings)
    }

    async fn record_upload(&self, upload: &NewUpload) -> Result<UploadedFile> {
        self.check_available()?;
        upload.validate()?;
        let file = UploadedFile {
            id: Uuid::new_v4().to_string(),
            player_id: upload.player_id.clone(),
            event_name: upload.event_name.clone(),
            event_type: upload.event_type.clone(),
            event_date: upload.event_date,
            data_source: upload.data_source.clone(),
            file_name: upload.file_name.clone(),
            file_path: upload.file_path.clone(),
            created_at: Utc::now(),
        };
        self.tables.write().await.uploads.push(file.clone());
        Ok(file)
    }
}
