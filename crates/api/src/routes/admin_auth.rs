use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, HeaderName, StatusCode},
    Extension, Json,
};
use pharmacy_auth::{AdminSession, CsrfToken, LoginAttempt};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::middleware::{AdminContext, SessionEnded, CSRF_HEADER};
use crate::util::client_info;
use crate::{ApiError, AppState};

const DEFAULT_ATTEMPT_LIMIT: i64 = 50;
const MAX_ATTEMPT_LIMIT: i64 = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub email: String,
    pub session_id: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginAttemptsResponse {
    pub attempts: Vec<LoginAttempt>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginAttemptsQuery {
    /// Defaults to 50, at most 500.
    pub limit: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "Admin Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; the first CSRF token is also sent in X-CSRF-Token", body = AdminSession),
        (status = 401, description = "Wrong email or password", body = crate::error::ErrorResponse),
        (status = 429, description = "Too many failed attempts", body = crate::error::ErrorResponse),
        (status = 503, description = "No admin credential configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<([(HeaderName, String); 1], Json<AdminSession>), ApiError> {
    let client = client_info(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.trusts_proxy_headers(),
    );
    let session = state
        .authenticator()
        .login(&request.email, &request.password, &client)
        .await?;

    Ok(([(CSRF_HEADER, session.csrf_token.clone())], Json(session)))
}

#[utoipa::path(
    post,
    path = "/api/admin/logout",
    tag = "Admin Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing or invalid CSRF token", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
) -> Result<(StatusCode, Extension<SessionEnded>), ApiError> {
    state.authenticator().logout(&admin.token).await?;
    info!(email = %admin.email, session = %admin.session_id, "admin signed out");
    Ok((StatusCode::NO_CONTENT, Extension(SessionEnded)))
}

#[utoipa::path(
    get,
    path = "/api/admin/session",
    tag = "Admin Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn current_session(Extension(admin): Extension<AdminContext>) -> Json<SessionResponse> {
    Json(SessionResponse {
        email: admin.email,
        session_id: admin.session_id,
        expires_at: admin.expires_at,
    })
}

#[utoipa::path(
    get,
    path = "/api/admin/csrf-token",
    tag = "Admin Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Fresh one-time CSRF token", body = CsrfToken),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn csrf_token(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
) -> Result<([(HeaderName, String); 1], Json<CsrfToken>), ApiError> {
    let token = state.authenticator().issue_csrf_token(&admin.session_id).await?;
    Ok(([(CSRF_HEADER, token.token.clone())], Json(token)))
}

#[utoipa::path(
    get,
    path = "/api/admin/login-attempts",
    tag = "Admin Auth",
    security(("bearerAuth" = [])),
    params(LoginAttemptsQuery),
    responses(
        (status = 200, description = "Most recent login attempts", body = LoginAttemptsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn login_attempts(
    State(state): State<AppState>,
    Query(query): Query<LoginAttemptsQuery>,
) -> Result<Json<LoginAttemptsResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ATTEMPT_LIMIT)
        .clamp(1, MAX_ATTEMPT_LIMIT);
    let attempts = state.authenticator().recent_attempts(limit).await?;
    Ok(Json(LoginAttemptsResponse { attempts }))
}
