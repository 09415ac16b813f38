//! HTTP server: page routes behind the gate and the account API.
//!
//! Page handlers report what the gate resolved; the player dashboard also
//! carries the player's profile, uploads and bookings, and `POST
//! /player/uploads` records a new upload. Both sit in the player area, so the
//! gate has already checked the role. The `/api` routes sit under a bypass
//! prefix, so they read the session cookie themselves where they need it.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coachlink_backend::{
    AccountOutcome, AccountService, MemoryAuthProvider, MemoryPlayerStore, MemoryProfileStore,
    PlayerService, RestAuthProvider, RestConfig, RestPlayerStore, RestProfileStore, SignInRequest,
    SignUpRequest, UploadRequest,
};
use coachlink_core::{
    AppState, AuthProvider, ConfigProvider, Error, PlayerDashboard, PlayerDataStore, ProfileStore,
    Result, RouteTable,
};
use coachlink_gate::{AuthContext, Gate, extract_credentials, protect};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::{BackendKind, CoachlinkConfig};

// ============================================================================
// State
// ============================================================================

/// Build the shared application state, choosing the configured backend.
pub fn build_state(config: CoachlinkConfig) -> Result<AppState<CoachlinkConfig>> {
    let (auth, profiles, players): (
        Arc<dyn AuthProvider>,
        Arc<dyn ProfileStore>,
        Arc<dyn PlayerDataStore>,
    ) = match config.backend.kind {
        BackendKind::Memory => (
            Arc::new(MemoryAuthProvider::new()),
            Arc::new(MemoryProfileStore::new()),
            Arc::new(MemoryPlayerStore::new()),
        ),
        BackendKind::Rest => {
            let rest = rest_config(&config)?;
            (
                Arc::new(RestAuthProvider::new(&rest)?),
                Arc::new(RestProfileStore::new(&rest)?),
                Arc::new(RestPlayerStore::new(&rest)?),
            )
        }
    };
    Ok(AppState::new(config, auth, profiles, players))
}

fn rest_config(config: &CoachlinkConfig) -> Result<RestConfig> {
    let backend = &config.backend;
    let url = backend
        .url
        .clone()
        .ok_or_else(|| Error::config("backend.url is required for the rest backend"))?;
    let api_key = backend
        .api_key
        .clone()
        .ok_or_else(|| Error::config("backend.api_key is required for the rest backend"))?;
    let mut rest = RestConfig::new(url, api_key).with_timeout(config.backend_timeout());
    if let Some(key) = &backend.service_key {
        rest = rest.with_service_key(key.clone());
    }
    Ok(rest)
}

#[derive(Clone)]
struct ServerState {
    project: Arc<str>,
    accounts: AccountService,
    players: PlayerService,
    routes: Arc<RouteTable>,
    cookie: Arc<str>,
}

// ============================================================================
// Router
// ============================================================================

/// Build the full application router with the gate in front of it.
pub fn router(state: &AppState<CoachlinkConfig>) -> Router {
    let server_state = ServerState {
        project: Arc::from(state.project_name()),
        accounts: AccountService::from_state(state),
        players: PlayerService::from_state(state),
        routes: Arc::new(state.config().routes().clone()),
        cookie: Arc::from(state.config().session_cookie()),
    };

    let pages = Router::new()
        .route("/", get(page("home")))
        .route("/login", get(page("login")))
        .route("/signup", get(page("signup")))
        .route("/marketplace", get(page("marketplace")))
        .route("/player/dashboard", get(player_dashboard))
        .route("/player/uploads", post(record_upload))
        .route("/player/profile", get(page("player-profile")))
        .route("/coach/dashboard", get(page("coach-dashboard")))
        .route("/coach/profile", get(page("coach-profile")))
        .route("/coach/services", get(page("coach-services")))
        .route("/coach/settings", get(page("coach-settings")));

    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/signout", post(sign_out));

    let app = pages
        .merge(api)
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(server_state);

    protect(app, Gate::from_state(state))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: CoachlinkConfig, port: Option<u16>) -> Result<()> {
    let addr = config.bind_address(port);
    let state = build_state(config)?;
    let app = router(&state);

    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    info!(%addr, project = state.project_name(), "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    info!("Server stopped");
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
struct PageView {
    page: &'static str,
    #[serde(flatten)]
    context: AuthContext,
    identity: Option<String>,
    home: Option<String>,
}

impl PageView {
    fn new(name: &'static str, ctx: AuthContext, routes: &RouteTable) -> Self {
        Self {
            page: name,
            identity: ctx.identity().map(ToString::to_string),
            home: ctx.home_path(routes).map(str::to_string),
            context: ctx,
        }
    }
}

#[derive(Serialize)]
struct DashboardView {
    #[serde(flatten)]
    view: PageView,
    #[serde(flatten)]
    dashboard: PlayerDashboard,
}

/// Handler for a page that only reports the resolved context.
fn page(
    name: &'static str,
) -> impl Fn(State<ServerState>, AuthContext) -> std::future::Ready<Json<PageView>> + Clone {
    move |State(state): State<ServerState>, ctx: AuthContext| {
        std::future::ready(Json(PageView::new(name, ctx, &state.routes)))
    }
}

async fn player_dashboard(
    State(state): State<ServerState>,
    ctx: AuthContext,
) -> std::result::Result<Json<DashboardView>, ApiError> {
    let player = ctx.identity().cloned().ok_or(Error::InvalidCredentials)?;
    let dashboard = state.players.dashboard(&player).await;
    Ok(Json(DashboardView {
        view: PageView::new("player-dashboard", ctx, &state.routes),
        dashboard,
    }))
}

async fn record_upload(
    State(state): State<ServerState>,
    ctx: AuthContext,
    Json(request): Json<UploadRequest>,
) -> std::result::Result<Response, ApiError> {
    let player = ctx.identity().ok_or(Error::InvalidCredentials)?;
    let stored = state.players.record_upload(player, request).await?;
    Ok((StatusCode::CREATED, Json(stored)).into_response())
}

async fn health(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "project": &*state.project }))
}

async fn sign_up(
    State(state): State<ServerState>,
    Json(request): Json<SignUpRequest>,
) -> std::result::Result<Response, ApiError> {
    let outcome = state.accounts.sign_up(&request).await?;
    account_response(&state, StatusCode::CREATED, outcome)
}

async fn sign_in(
    State(state): State<ServerState>,
    Json(request): Json<SignInRequest>,
) -> std::result::Result<Response, ApiError> {
    let outcome = state.accounts.sign_in(&request).await?;
    account_response(&state, StatusCode::OK, outcome)
}

async fn sign_out(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> std::result::Result<Response, ApiError> {
    let credentials = extract_credentials(&headers, &state.cookie);
    if let Some(token) = credentials.access_token.as_deref() {
        state.accounts.sign_out(token).await?;
    }
    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .insert(SET_COOKIE, cookie_header(&state.cookie, "", true)?);
    Ok(response)
}

fn account_response(
    state: &ServerState,
    status: StatusCode,
    outcome: AccountOutcome,
) -> std::result::Result<Response, ApiError> {
    let cookie = outcome
        .session
        .as_ref()
        .map(|session| cookie_header(&state.cookie, &session.access_token, false))
        .transpose()?;
    let mut response = (status, Json(outcome)).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}

fn cookie_header(name: &str, value: &str, expire: bool) -> Result<HeaderValue> {
    let mut cookie = format!("{name}={value}; HttpOnly; Path=/; SameSite=Lax");
    if expire {
        cookie.push_str("; Max-Age=0");
    }
    HeaderValue::from_str(&cookie).map_err(|e| Error::invalid_data(format!("cookie header: {e}")))
}

// ============================================================================
// Errors
// ============================================================================

/// Maps [`Error`] onto HTTP responses for the account and upload routes.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidData(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Backend { .. } => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            error!(error = %self.0, "Request failed");
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION};
    use tower::ServiceExt;

    fn app() -> Router {
        router(&build_state(CoachlinkConfig::default()).unwrap())
    }

    fn get_req(path: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(path: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
        request
            .headers_mut()
            .insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        request
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// `name=value` part of the Set-Cookie header.
    fn session_cookie(response: &Response) -> String {
        let header = response.headers()[SET_COOKIE].to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    async fn sign_up_coach(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/signup",
                json!({
                    "email": "casey@example.com",
                    "password": "pw",
                    "full_name": "Casey Coach",
                    "user_type": "coach",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        session_cookie(&response)
    }

    async fn sign_up_player(app: &Router) -> (String, String) {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/signup",
                json!({
                    "email": "pat@example.com",
                    "password": "pw",
                    "full_name": "Pat Player",
                    "role": "player",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = session_cookie(&response);
        let identity = json_body(response).await["identity"]
            .as_str()
            .unwrap()
            .to_string();
        (cookie, identity)
    }

    fn upload_form() -> serde_json::Value {
        json!({
            "event_name": "Spring Opener",
            "event_type": "Game",
            "event_date": "2024-03-15",
            "data_source": "Team Stats",
            "file_name": "opener.csv",
        })
    }

    #[test]
    fn test_build_state_rest_requires_url() {
        let mut config = CoachlinkConfig::default();
        config.backend.kind = BackendKind::Rest;
        assert!(matches!(build_state(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_rest_config_service_key() {
        let mut config = CoachlinkConfig::default();
        config.backend.kind = BackendKind::Rest;
        config.backend.url = Some("https://db.example.co".into());
        config.backend.api_key = Some("anon".into());
        assert_eq!(rest_config(&config).unwrap().service_key, None);

        config.backend.service_key = Some("service".into());
        assert_eq!(
            rest_config(&config).unwrap().service_key.as_deref(),
            Some("service")
        );
        assert!(build_state(config).is_ok());
    }

    #[tokio::test]
    async fn test_player_dashboard_lists_own_uploads() {
        let app = app();
        let (cookie, identity) = sign_up_player(&app).await;

        let response = app
            .clone()
            .oneshot(with_cookie(post_json("/player/uploads", upload_form()), &cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let stored = json_body(response).await;
        assert!(stored["file_path"]
            .as_str()
            .unwrap()
            .starts_with(&format!("{identity}/")));
        assert!(stored["file_path"].as_str().unwrap().ends_with(".csv"));

        let response = app
            .oneshot(get_req("/player/dashboard", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["page"], "player-dashboard");
        assert_eq!(body["identity"], identity.as_str());
        assert_eq!(body["home"], "/player/dashboard");
        assert!(body["profile"].is_null());
        assert_eq!(body["files"].as_array().unwrap().len(), 1);
        assert_eq!(body["files"][0]["event_name"], "Spring Opener");
        assert_eq!(body["bookings"], json!([]));
    }

    #[tokio::test]
    async fn test_upload_rejects_blank_and_foreign_roles() {
        let app = app();
        let (player_cookie, _) = sign_up_player(&app).await;
        let mut blank = upload_form();
        blank["event_name"] = json!(" ");
        let response = app
            .clone()
            .oneshot(with_cookie(post_json("/player/uploads", blank), &player_cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let coach_cookie = sign_up_coach(&app).await;
        let response = app
            .clone()
            .oneshot(with_cookie(post_json("/player/uploads", upload_form()), &coach_cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/login");

        let response = app
            .oneshot(post_json("/player/uploads", upload_form()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let response = app().oneshot(get_req("/api/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_public_page_anonymous() {
        let response = app().oneshot(get_req("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["page"], "home");
        assert_eq!(body["role"], "unknown");
        assert!(body["identity"].is_null());
        assert!(body["home"].is_null());
    }

    #[tokio::test]
    async fn test_marketplace_requires_session() {
        let response = app().oneshot(get_req("/marketplace", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_sign_up_sets_cookie_and_opens_coach_area() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/signup",
                json!({
                    "email": "casey@example.com",
                    "password": "pw",
                    "full_name": "Casey Coach",
                    "role": "coach",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let header = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
        assert!(header.starts_with("coachlink-session="));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        let cookie = session_cookie(&response);
        let body = json_body(response).await;
        assert_eq!(body["redirect_to"], "/coach/dashboard");
        assert_eq!(body["role"], "coach");

        let response = app
            .clone()
            .oneshot(get_req("/coach/services", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["role"], "coach");
        assert_eq!(body["home"], "/coach/dashboard");

        let response = app
            .oneshot(get_req("/player/profile", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_signed_in_login_page_goes_home() {
        let app = app();
        let cookie = sign_up_coach(&app).await;
        let response = app.oneshot(get_req("/login", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/coach/dashboard");
    }

    #[tokio::test]
    async fn test_sign_in_flow() {
        let app = app();
        sign_up_coach(&app).await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/signin",
                json!({ "email": "casey@example.com", "password": "pw" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(SET_COOKIE));
        assert_eq!(json_body(response).await["redirect_to"], "/coach/dashboard");

        let response = app
            .oneshot(post_json(
                "/api/auth/signin",
                json!({ "email": "casey@example.com", "password": "wrong" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_sign_up_errors() {
        let app = app();
        sign_up_coach(&app).await;

        let duplicate = app
            .clone()
            .oneshot(post_json(
                "/api/auth/signup",
                json!({
                    "email": "casey@example.com",
                    "password": "pw",
                    "full_name": "Other",
                    "role": "player",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let invalid = app
            .oneshot(post_json(
                "/api/auth/signup",
                json!({
                    "email": "someone@example.com",
                    "password": "pw",
                    "full_name": "Someone",
                    "role": "admin",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(invalid).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_sign_out_clears_cookie_and_session() {
        let app = app();
        let cookie = sign_up_coach(&app).await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/signout")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let header = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(header.contains("Max-Age=0"));

        let response = app
            .oneshot(get_req("/coach/dashboard", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[test]
    fn test_api_error_status_mapping() {
        let cases = [
            (Error::invalid_data("x"), StatusCode::BAD_REQUEST),
            (Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (Error::conflict("x"), StatusCode::CONFLICT),
            (Error::backend("x"), StatusCode::BAD_GATEWAY),
            (Error::timeout("x"), StatusCode::GATEWAY_TIMEOUT),
            (Error::config("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
