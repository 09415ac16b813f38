//! Clients for the hosted backend.
//!
//! The auth service is reached under `/auth/v1` and the table API under
//! `/rest/v1`. Every request carries the project API key in the `apikey`
//! header. User-scoped auth calls also carry the user's bearer token. Table
//! API calls carry the service key as bearer when one is configured, and the
//! API key otherwise; row-level policies that key on the caller will hide rows
//! from the plain API key.

use std::time::Duration;

use async_trait::async_trait;
use coachlink_core::{
    AuthProvider, Booking, Credentials, Error, Identity, NewProfile, NewUpload, PlayerDataStore,
    PlayerProfile, ProfileStore, Result, Role, Session, SignUpOutcome, UploadedFile,
};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project base URL, e.g. `https://abc.example.co`.
    pub url: String,
    /// Project API key.
    pub api_key: String,
    /// Server-side key for the table API. Falls back to `api_key`.
    pub service_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RestConfig {
    /// Settings with a 10 second request timeout.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            service_key: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Use `key` as the bearer for table API calls.
    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = Some(key.into()).filter(|k| !k.trim().is_empty());
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Clone)]
struct RestClient {
    base: String,
    api_key: String,
    table_key: String,
    http: reqwest::Client,
}

impl RestClient {
    fn new(config: &RestConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::config("backend url is not set"));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::backend_with_source("Failed to build HTTP client", e))?;
        Ok(Self {
            base: config.url.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table_key: config
                .service_key
                .clone()
                .unwrap_or_else(|| config.api_key.clone()),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn get(&self, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        self.http.get(url).header("apikey", &self.api_key)
    }

    fn post(&self, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        self.http.post(url).header("apikey", &self.api_key)
    }

    fn table_url(&self, table: &str, params: &[(&str, String)]) -> Result<Url> {
        Url::parse_with_params(&self.endpoint(&format!("/rest/v1/{table}")), params)
            .map_err(|e| Error::config(format!("invalid backend url: {e}")))
    }

    async fn select<T: DeserializeOwned>(&self, what: &str, url: Url) -> Result<Vec<T>> {
        let response = self
            .get(url)
            .bearer_auth(&self.table_key)
            .send()
            .await
            .map_err(|e| transport_error(what, e))?;

        if !response.status().is_success() {
            return Err(status_error(what, response).await);
        }
        read_json(what, response).await
    }

    fn insert_request(&self, table: &str) -> reqwest::RequestBuilder {
        self.post(self.endpoint(&format!("/rest/v1/{table}")))
            .bearer_auth(&self.table_key)
    }
}

fn transport_error(what: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::timeout(what.to_string())
    } else {
        Error::backend_with_source(format!("{what} failed"), err)
    }
}

async fn status_error(what: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Error::backend(format!("{what} returned {status}: {body}"))
}

async fn read_json<T: DeserializeOwned>(what: &str, response: reqwest::Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::backend_with_source(format!("Failed to parse {what} response"), e))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    user: UserBody,
}

/// Sign-up answers with a token body when the account is confirmed
/// immediately, and with a bare user otherwise.
#[derive(Debug, Deserialize)]
struct SignUpBody {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<UserBody>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Error body from the auth service. Older deployments send `msg`, newer
/// ones add `error_code`; OAuth-style endpoints use `error_description`.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl AuthErrorBody {
    fn message(&self) -> Option<&str> {
        self.msg.as_deref().or(self.error_description.as_deref())
    }

    fn is_duplicate_account(&self) -> bool {
        matches!(
            self.error_code.as_deref(),
            Some("user_already_exists" | "email_exists")
        ) || self
            .message()
            .is_some_and(|m| m.to_ascii_lowercase().contains("already registered"))
    }
}

fn sign_up_rejection(email: &str, body: &AuthErrorBody) -> Error {
    if body.is_duplicate_account() {
        return Error::conflict(format!("account already exists for {email}"));
    }
    let detail = body
        .message()
        .or(body.error_code.as_deref())
        .unwrap_or("sign-up rejected");
    Error::invalid_data(detail.to_string())
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    #[serde(default)]
    user_type: Role,
}

impl UserBody {
    fn into_session(self, access_token: String) -> Session {
        let session = Session::new(access_token, Identity::new(self.id));
        match self.email {
            Some(email) => session.with_email(email),
            None => session,
        }
    }
}

impl SignUpBody {
    fn into_outcome(self) -> Result<SignUpOutcome> {
        match (self.access_token, self.user, self.id) {
            (Some(token), Some(user), _) => {
                let session = user.into_session(token);
                Ok(SignUpOutcome {
                    identity: session.identity.clone(),
                    session: Some(session),
                })
            }
            (None, Some(user), _) => Ok(SignUpOutcome {
                identity: Identity::new(user.id),
                session: None,
            }),
            (_, None, Some(id)) => {
                debug!(email = ?self.email, "Sign-up pending confirmation");
                Ok(SignUpOutcome {
                    identity: Identity::new(id),
                    session: None,
                })
            }
            (_, None, None) => Err(Error::backend("sign-up response carried no user")),
        }
    }
}

fn role_from_rows(rows: Vec<RoleRow>) -> Option<Role> {
    rows.into_iter().next().map(|row| row.user_type)
}

fn role_table(role: Role) -> Result<&'static str> {
    match role {
        Role::Player => Ok("player_profiles"),
        Role::Coach => Ok("coach_profiles"),
        Role::Unknown => Err(Error::invalid_data("profile role must be player or coach")),
    }
}

// ============================================================================
// Authentication provider
// ============================================================================

/// Authentication provider backed by the hosted auth service.
#[derive(Clone)]
pub struct RestAuthProvider {
    client: RestClient,
}

impl RestAuthProvider {
    /// Create a client for the given project.
    pub fn new(config: &RestConfig) -> Result<Self> {
        Ok(Self {
            client: RestClient::new(config)?,
        })
    }
}

#[async_trait]
impl AuthProvider for RestAuthProvider {
    async fn resolve_session(&self, credentials: &Credentials) -> Result<Option<Session>> {
        let Some(token) = credentials.access_token.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let response = self
            .client
            .get(self.client.endpoint("/auth/v1/user"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error("session resolution", e))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: UserBody = read_json("user", response).await?;
                Ok(Some(user.into_session(token.to_string())))
            }
            _ => Err(status_error("session resolution", response).await),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.client.endpoint("/auth/v1/token?grant_type=password"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| transport_error("sign-in", e))?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(Error::InvalidCredentials),
            status if status.is_success() => {
                let body: TokenBody = read_json("token", response).await?;
                Ok(body.user.into_session(body.access_token))
            }
            _ => Err(status_error("sign-in", response).await),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let response = self
            .client
            .post(self.client.endpoint("/auth/v1/signup"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| transport_error("sign-up", e))?;

        match response.status() {
            StatusCode::CONFLICT => Err(Error::conflict(format!(
                "account already exists for {email}"
            ))),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response
                    .json::<AuthErrorBody>()
                    .await
                    .unwrap_or_default();
                Err(sign_up_rejection(email, &body))
            }
            status if status.is_success() => {
                let body: SignUpBody = read_json("sign-up", response).await?;
                body.into_outcome()
            }
            _ => Err(status_error("sign-up", response).await),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.client.endpoint("/auth/v1/logout"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| transport_error("sign-out", e))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(status_error("sign-out", response).await)
        }
    }
}

// ============================================================================
// Profile store
// ============================================================================

/// Profile store backed by the hosted table API.
#[derive(Clone)]
pub struct RestProfileStore {
    client: RestClient,
}

impl RestProfileStore {
    /// Create a client for the given project.
    pub fn new(config: &RestConfig) -> Result<Self> {
        Ok(Self {
            client: RestClient::new(config)?,
        })
    }

    fn role_query(&self, identity: &Identity) -> Result<Url> {
        self.client.table_url(
            "profiles",
            &[
                ("id", format!("eq.{identity}")),
                ("select", "user_type".to_string()),
            ],
        )
    }

    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<()> {
        let response = self
            .client
            .insert_request(table)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(|e| transport_error("profile insert", e))?;

        match response.status() {
            StatusCode::CONFLICT => Err(Error::conflict(format!("{table} row already exists"))),
            status if status.is_success() => Ok(()),
            _ => Err(status_error("profile insert", response).await),
        }
    }
}

#[async_trait]
impl ProfileStore for RestProfileStore {
    async fn get_role(&self, identity: &Identity) -> Result<Option<Role>> {
        let rows: Vec<RoleRow> = self
            .client
            .select("role lookup", self.role_query(identity)?)
            .await?;
        Ok(role_from_rows(rows))
    }

    async fn create_profile(&self, profile: &NewProfile) -> Result<()> {
        let table = role_table(profile.role)?;
        self.insert("profiles", serde_json::to_value(profile)?).await?;
        self.insert(table, json!({ "id": profile.id })).await
    }
}

// ============================================================================
// Player data store
// ============================================================================

const BOOKING_COLUMNS: &str =
    "id,coach_id,cost,booking_date,analysis_status,coach:coach_id(profiles:profiles(full_name))";

#[derive(Debug, Deserialize)]
struct BookingRow {
    id: String,
    coach_id: Identity,
    cost: f64,
    booking_date: String,
    analysis_status: String,
    #[serde(default)]
    coach: Option<CoachJoin>,
}

#[derive(Debug, Deserialize)]
struct CoachJoin {
    #[serde(default)]
    profiles: Option<NameRow>,
}

#[derive(Debug, Deserialize)]
struct NameRow {
    #[serde(default)]
    full_name: Option<String>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            coach_id: row.coach_id,
            coach_name: row.coach.and_then(|c| c.profiles).and_then(|p| p.full_name),
            cost: row.cost,
            booking_date: row.booking_date,
            analysis_status: row.analysis_status,
        }
    }
}

/// Player data store backed by the hosted table API.
#[derive(Clone)]
pub struct RestPlayerStore {
    client: RestClient,
}

impl RestPlayerStore {
    /// Create a client for the given project.
    pub fn new(config: &RestConfig) -> Result<Self> {
        Ok(Self {
            client: RestClient::new(config)?,
        })
    }

    fn owned_by(
        &self,
        table: &str,
        column: &str,
        player: &Identity,
        extra: &[(&str, &str)],
    ) -> Result<Url> {
        let mut params = vec![(column, format!("eq.{player}"))];
        params.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
        self.client.table_url(table, &params)
    }
}

#[async_trait]
impl PlayerDataStore for RestPlayerStore {
    async fn player_profile(&self, player: &Identity) -> Result<Option<PlayerProfile>> {
        let url = self.owned_by("player_profiles", "id", player, &[("select", "*")])?;
        let rows: Vec<PlayerProfile> = self.client.select("player profile", url).await?;
        Ok(rows.into_iter().next())
    }

    async fn uploads(&self, player: &Identity) -> Result<Vec<UploadedFile>> {
        let url = self.owned_by(
            "uploaded_files",
            "player_id",
            player,
            &[("select", "*"), ("order", "created_at.desc")],
        )?;
        self.client.select("uploads", url).await
    }

    async fn bookings(&self, player: &Identity) -> Result<Vec<Booking>> {
        let url = self.owned_by(
            "bookings",
            "player_id",
            player,
            &[("select", BOOKING_COLUMNS), ("order", "booking_date.desc")],
        )?;
        let rows: Vec<BookingRow> = self.client.select("bookings", url).await?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn record_upload(&self, upload: &NewUpload) -> Result<UploadedFile> {
        upload.validate()?;
        let response = self
            .client
            .insert_request("uploaded_files")
            .header("Prefer", "return=representation")
            .json(upload)
            .send()
            .await
            .map_err(|e| transport_error("upload insert", e))?;

        if !response.status().is_success() {
            return Err(status_error("upload insert", response).await);
        }
        let rows: Vec<UploadedFile> = read_json("upload insert", response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::backend("upload insert returned no row"))
    }
}
