//! Admin guard and request accounting.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use pharmacy_monitoring::RequestStats;
use tracing::{info, warn};

use crate::{util::require_bearer, ApiError, AppState};

pub const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");

/// The verified admin behind a request, inserted by [`require_admin`].
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub email: String,
    pub session_id: String,
    pub expires_at: String,
    pub token: String,
}

/// Response marker set by handlers that end the session, so no fresh CSRF
/// token is issued for it.
#[derive(Debug, Clone, Copy)]
pub struct SessionEnded;

fn is_mutating(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Require a valid admin bearer token. Mutating requests must also spend a
/// one-time `X-CSRF-Token`, and their responses carry the next one.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = require_bearer(request.headers())?;
    let admin = state.authenticator().verify(&token).await?;

    let mutating = is_mutating(request.method());
    if mutating {
        let csrf = request
            .headers()
            .get(&CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::forbidden("CSRF_TOKEN_REQUIRED", "missing csrf token"))?
            .to_string();
        state
            .authenticator()
            .consume_csrf_token(&admin.session_id, &csrf)
            .await?;
    }

    let session_id = admin.session_id.clone();
    request.extensions_mut().insert(AdminContext {
        email: admin.email,
        session_id: admin.session_id,
        expires_at: admin.expires_at,
        token,
    });

    let mut response = next.run(request).await;

    if mutating && response.extensions().get::<SessionEnded>().is_none() {
        match state.authenticator().issue_csrf_token(&session_id).await {
            Ok(csrf) => match HeaderValue::from_str(&csrf.token) {
                Ok(value) => {
                    response.headers_mut().insert(CSRF_HEADER, value);
                }
                Err(error) => warn!(%error, "csrf token is not a valid header value"),
            },
            Err(error) => warn!(%error, session = %session_id, "failed to rotate csrf token"),
        }
    }

    Ok(response)
}

/// Log every request and feed the monitoring counters.
pub async fn track_requests(
    State(stats): State<Arc<RequestStats>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    stats.record(response.status().as_u16(), duration);
    info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "request completed"
    );

    response
}
