use axum::{
    extract::{Path, Query, State},
    Json,
};
use pharmacy_database::Notification;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{ApiError, AppState};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    /// Defaults to 50, at most 200.
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub updated: u64,
}

#[utoipa::path(
    get,
    path = "/api/admin/notifications",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = NotificationsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let repo = state.notifications();
    let (notifications, unread_count) =
        tokio::try_join!(repo.list(query.unread_only, limit), repo.unread_count())?;
    Ok(Json(NotificationsResponse {
        notifications,
        unread_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/notifications/{id}/read",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Notification public identifier")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Notification not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state.notifications().mark_read(&id).await?;
    Ok(Json(notification))
}

#[utoipa::path(
    post,
    path = "/api/admin/notifications/read-all",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Unread notifications marked read", body = BulkUpdateResponse)
    )
)]
pub async fn mark_all_read(State(state): State<AppState>) -> Result<Json<BulkUpdateResponse>, ApiError> {
    let updated = state.notifications().mark_all_read().await?;
    Ok(Json(BulkUpdateResponse { updated }))
}
