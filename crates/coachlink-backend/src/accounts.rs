//! Account flows: sign-up, sign-in, and sign-out.
//!
//! Sign-up registers the account with the authentication provider and then
//! writes the profile that fixes the user's role. Sign-in reads that role
//! back to pick the landing page.

use std::sync::Arc;
use std::time::Duration;

use coachlink_core::{
    AppState, AuthProvider, ConfigProvider, Error, Identity, NewProfile, ProfileStore, Result,
    Role, RouteTable, Session,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Sign-up form.
#[derive(Clone, Deserialize)]
pub struct SignUpRequest {
    /// Contact email; also the login name.
    pub email: String,
    /// Password, passed straight to the authentication provider.
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Player or coach.
    #[serde(alias = "user_type")]
    pub role: Role,
}

impl SignUpRequest {
    /// Reject forms the backend would accept but the marketplace cannot use.
    pub fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::invalid_data("email address is not valid"));
        }
        if self.password.is_empty() {
            return Err(Error::invalid_data("password is required"));
        }
        if self.full_name.trim().is_empty() {
            return Err(Error::invalid_data("full name is required"));
        }
        if !self.role.is_known() {
            return Err(Error::invalid_data("role must be player or coach"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Sign-in form.
#[derive(Clone, Deserialize)]
pub struct SignInRequest {
    /// Login email.
    pub email: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct AccountOutcome {
    /// The account's identity.
    pub identity: Identity,
    /// Session to hand back to the client, if one was issued.
    #[serde(skip)]
    pub session: Option<Session>,
    /// The account's role, `unknown` when it could not be read.
    pub role: Role,
    /// Where the client should go next. `None` keeps it where it is.
    pub redirect_to: Option<String>,
}

/// Runs account flows against the two backend collaborators.
#[derive(Clone)]
pub struct AccountService {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    routes: Arc<RouteTable>,
    lookup_timeout: Duration,
}

impl AccountService {
    /// Create a service over the given collaborators.
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        routes: RouteTable,
    ) -> Self {
        Self {
            auth,
            profiles,
            routes: Arc::new(routes),
            lookup_timeout: Duration::from_millis(1500),
        }
    }

    /// Build from shared application state.
    pub fn from_state<C: ConfigProvider>(state: &AppState<C>) -> Self {
        Self::new(state.auth(), state.profiles(), state.config().routes().clone())
            .with_lookup_timeout(state.config().lookup_timeout())
    }

    /// Bound the post-sign-in role lookup.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Register a new account and write its profile.
    ///
    /// If the profile write fails after the provider accepted the account,
    /// the account is left without a role and the error is returned.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<AccountOutcome> {
        request.validate()?;
        let email = request.email.trim();
        let outcome = self.auth.sign_up(email, &request.password).await?;

        let profile = NewProfile {
            id: outcome.identity.clone(),
            email: email.to_string(),
            full_name: request.full_name.trim().to_string(),
            role: request.role,
        };
        if let Err(e) = self.profiles.create_profile(&profile).await {
            warn!(identity = %outcome.identity, error = %e, "Account created without a profile");
            return Err(e);
        }

        info!(identity = %outcome.identity, role = %request.role, "Account created");
        Ok(AccountOutcome {
            identity: outcome.identity,
            session: outcome.session,
            role: request.role,
            redirect_to: self.routes.home_for(request.role).map(str::to_string),
        })
    }

    /// Sign in and work out where the user lands.
    ///
    /// A failed role lookup does not fail the sign-in; the user just gets no
    /// redirect.
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<AccountOutcome> {
        let session = self
            .auth
            .sign_in(request.email.trim(), &request.password)
            .await?;
        let role = self.role_of(&session.identity).await;
        info!(identity = %session.identity, %role, "Signed in");
        Ok(AccountOutcome {
            identity: session.identity.clone(),
            session: Some(session),
            role,
            redirect_to: self.routes.home_for(role).map(str::to_string),
        })
    }

    /// End the session behind `access_token`.
    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.auth.sign_out(access_token).await
    }

    async fn role_of(&self, identity: &Identity) -> Role {
        match tokio::time::timeout(self.lookup_timeout, self.profiles.get_role(identity)).await {
            Ok(Ok(role)) => role.unwrap_or_default(),
            Ok(Err(e)) => {
                warn!(%identity, error = %e, "Role lookup failed after sign-in");
                Role::Unknown
            }
            Err(_) => {
                warn!(%identity, "Role lookup timed out after sign-in");
                Role::Unknown
            }
        }
    }
}
