//! Per-request evaluation: resolve session, resolve role, decide.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use coachlink_core::{
    AppState, AuthProvider, ConfigProvider, Credentials, Identity, PathClass, ProfileStore, Role,
    RouteTable, Session,
};
use tracing::{debug, warn};

use crate::context::AuthContext;
use crate::decision::{Decision, decide};

/// Cookie the gate reads when no bearer header is sent.
pub const DEFAULT_SESSION_COOKIE: &str = "coachlink-session";

/// Bound on session resolution and on the role lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(1500);

/// Everything the gate worked out for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Class of the requested path.
    pub class: PathClass,
    /// What to do with the request.
    pub decision: Decision,
    /// Session and role, handed to the page handler on allow.
    pub context: AuthContext,
}

/// The access gate.
///
/// Holds only shared, read-only collaborators; every evaluation is
/// independent. Cloning is cheap.
#[derive(Clone)]
pub struct Gate {
    routes: Arc<RouteTable>,
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    session_cookie: Arc<str>,
    lookup_timeout: Duration,
}

impl Gate {
    /// Create a gate with the default cookie name and timeout.
    pub fn new(
        routes: RouteTable,
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            routes: Arc::new(routes),
            auth,
            profiles,
            session_cookie: Arc::from(DEFAULT_SESSION_COOKIE),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Build a gate from shared application state.
    pub fn from_state<C: ConfigProvider>(state: &AppState<C>) -> Self {
        let config = state.config();
        Self::new(config.routes().clone(), state.auth(), state.profiles())
            .with_session_cookie(config.session_cookie())
            .with_lookup_timeout(config.lookup_timeout())
    }

    /// Override the session cookie name.
    pub fn with_session_cookie(mut self, name: impl AsRef<str>) -> Self {
        self.session_cookie = Arc::from(name.as_ref());
        self
    }

    /// Override the lookup timeout.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// The route table in force.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Name of the session cookie.
    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    /// Lookup timeout in force.
    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// Evaluate one request.
    ///
    /// Calls the authentication provider at most once (never when there are
    /// no credentials) and the profile store at most once (only when a
    /// session was resolved). Failures and timeouts of either call degrade
    /// silently: no session, or role `Unknown`.
    pub async fn evaluate(&self, path: &str, credentials: &Credentials) -> Evaluation {
        let class = self.routes.classify(path);

        let session = self.resolve_session(credentials).await;
        let role = match &session {
            Some(session) => self.lookup_role(&session.identity).await,
            None => Role::Unknown,
        };

        let decision = decide(class, session.is_some(), role, &self.routes);
        debug!(
            path,
            class = ?class,
            authenticated = session.is_some(),
            role = %role,
            decision = ?decision,
            "Gate decision"
        );

        let context = match session {
            Some(session) => AuthContext::signed_in(session, role),
            None => AuthContext::anonymous(),
        };
        Evaluation {
            class,
            decision,
            context,
        }
    }

    async fn resolve_session(&self, credentials: &Credentials) -> Option<Session> {
        if credentials.is_empty() {
            return None;
        }
        let result = self
            .bounded("session resolution", self.auth.resolve_session(credentials))
            .await?;
        match result {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Session resolution failed; treating request as anonymous");
                None
            }
        }
    }

    async fn lookup_role(&self, identity: &Identity) -> Role {
        let Some(result) = self
            .bounded("role lookup", self.profiles.get_role(identity))
            .await
        else {
            return Role::Unknown;
        };
        match result {
            Ok(Some(role)) => role,
            Ok(None) => {
                debug!(%identity, "No profile for identity");
                Role::Unknown
            }
            Err(e) => {
                warn!(%identity, error = %e, "Role lookup failed; using unknown role");
                Role::Unknown
            }
        }
    }

    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = T>) -> Option<T> {
        match tokio::time::timeout(self.lookup_timeout, fut).await {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "{what} timed out"
                );
                None
            }
        }
    }
}
