use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pharmacy_auth::AuthError;
use pharmacy_database::DatabaseError;
use pharmacy_integrations::IntegrationError;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub retry_after_seconds: Option<i64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after_seconds: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code.to_string(),
        });
        let mut response = (self.status, body).into_response();
        if let Some(seconds) = self.retry_after_seconds {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(error = ?error, "internal error");
        Self::internal_server_error("internal server error")
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let (status, code) = match &error {
            AuthError::AdminNotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "ADMIN_NOT_CONFIGURED"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AuthError::TokenRevoked => (StatusCode::UNAUTHORIZED, "TOKEN_REVOKED"),
            AuthError::SessionNotFound => (StatusCode::UNAUTHORIZED, "SESSION_NOT_FOUND"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "SESSION_EXPIRED"),
            AuthError::InvalidCsrfToken => (StatusCode::FORBIDDEN, "INVALID_CSRF_TOKEN"),
            AuthError::Token(_) | AuthError::Database(_) | AuthError::PasswordHash(_) => {
                error!(error = ?error, "auth failure");
                return Self::internal_server_error("authentication failed");
            }
        };

        warn!(%error, "auth rejected");
        let mut api = Self::new(status, code, error.to_string());
        if let AuthError::RateLimited { retry_after_seconds } = error {
            api.retry_after_seconds = Some(retry_after_seconds);
        }
        api
    }
}

impl From<DatabaseError> for ApiError {
    fn from(error: DatabaseError) -> Self {
        match &error {
            DatabaseError::NotFound(_) => Self::not_found(error.to_string()),
            DatabaseError::Duplicate(_) => Self::new(StatusCode::CONFLICT, "CONFLICT", error.to_string()),
            DatabaseError::Validation(_) => Self::validation(error.to_string()),
            DatabaseError::InsufficientStock { .. } => {
                Self::new(StatusCode::CONFLICT, "INSUFFICIENT_STOCK", error.to_string())
            }
            DatabaseError::InvalidTransition { .. } => {
                Self::new(StatusCode::CONFLICT, "INVALID_STATUS_TRANSITION", error.to_string())
            }
            DatabaseError::Connection(_)
            | DatabaseError::Migration(_)
            | DatabaseError::Query(_)
            | DatabaseError::Backup(_) => {
                error!(error = ?error, "database error");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "database operation failed",
                )
            }
        }
    }
}

impl From<IntegrationError> for ApiError {
    fn from(error: IntegrationError) -> Self {
        match &error {
            IntegrationError::NotConfigured(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "INTEGRATION_NOT_CONFIGURED",
                error.to_string(),
            ),
            IntegrationError::InvalidRequest(_) => Self::bad_request(error.to_string()),
            IntegrationError::NotFound(_) => Self::not_found(error.to_string()),
            IntegrationError::Http(_)
            | IntegrationError::Upstream { .. }
            | IntegrationError::Decode(_) => {
                error!(error = ?error, "upstream integration failed");
                Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", "upstream service request failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_carries_retry_after() {
        let error = ApiError::from(AuthError::RateLimited { retry_after_seconds: 42 });
        assert_eq!(error.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(error.code, "RATE_LIMITED");

        let response = error.into_response();
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn database_errors_map_to_semantic_statuses() {
        let stock = ApiError::from(DatabaseError::InsufficientStock {
            sku: "SKU-1".into(),
            available: 1,
            requested: 3,
        });
        assert_eq!(stock.status, StatusCode::CONFLICT);
        assert_eq!(stock.code, "INSUFFICIENT_STOCK");

        let missing = ApiError::from(DatabaseError::NotFound("order".into()));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "order not found");

        let internal = ApiError::from(DatabaseError::Query(sqlx::Error::PoolClosed));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.message.contains("pool"));
    }

    #[test]
    fn integration_errors_hide_upstream_details() {
        let upstream = ApiError::from(IntegrationError::Upstream {
            status: 500,
            body: "secret stack trace".into(),
        });
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
        assert!(!upstream.message.contains("secret"));

        let missing = ApiError::from(IntegrationError::NotConfigured("stripe"));
        assert_eq!(missing.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn csrf_failure_is_forbidden() {
        let error = ApiError::from(AuthError::InvalidCsrfToken);
        assert_eq!(error.status, StatusCode::FORBIDDEN);
        assert_eq!(error.code, "INVALID_CSRF_TOKEN");
    }
}
