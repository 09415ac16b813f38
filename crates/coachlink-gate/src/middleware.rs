//! Axum integration.
//!
//! [`gate_middleware`] runs the [`Gate`] in front of every route of a router.
//! Allowed requests continue with an [`AuthContext`] in their extensions;
//! everything else gets a `307 Temporary Redirect`. No error ever reaches
//! the client from here.

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use tracing::debug;

use crate::credentials::extract_credentials;
use crate::decision::Decision;
use crate::gate::Gate;

/// Gate a single request.
///
/// Paths under a bypass prefix skip the gate entirely: no credentials are
/// read and no lookup is made.
pub async fn gate_middleware(State(gate): State<Gate>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if gate.routes().is_bypassed(&path) {
        return next.run(req).await;
    }

    let credentials = extract_credentials(req.headers(), gate.session_cookie());
    let evaluation = gate.evaluate(&path, &credentials).await;

    match evaluation.decision {
        Decision::Allow => {
            req.extensions_mut().insert(evaluation.context);
            next.run(req).await
        }
        Decision::Redirect { location, reason } => {
            debug!(%path, %location, ?reason, "Redirecting");
            Redirect::temporary(&location).into_response()
        }
    }
}

/// Wrap every route of `router` with the gate.
pub fn protect<S>(router: Router<S>, gate: Gate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(gate, gate_middleware))
}
