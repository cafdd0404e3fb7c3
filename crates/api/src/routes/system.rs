//! Shard inspection and database backups.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use pharmacy_config::ShardStrategy;
use pharmacy_database::{BackupRecord, ShardHealth, ShardSelection};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct ShardsResponse {
    /// `round_robin` or `hash`.
    pub strategy: String,
    pub shards: Vec<ShardHealth>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResolveQuery {
    pub key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BackupsResponse {
    pub backups: Vec<BackupRecord>,
    pub retention: usize,
}

fn strategy_name(strategy: ShardStrategy) -> &'static str {
    match strategy {
        ShardStrategy::RoundRobin => "round_robin",
        ShardStrategy::Hash => "hash",
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/shards",
    tag = "System",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Configured shards with a liveness probe each", body = ShardsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_shards(State(state): State<AppState>) -> Json<ShardsResponse> {
    let shards = state.shards();
    Json(ShardsResponse {
        strategy: strategy_name(shards.strategy()).to_string(),
        shards: shards.health().await,
    })
}

#[utoipa::path(
    get,
    path = "/api/admin/shards/resolve",
    tag = "System",
    security(("bearerAuth" = [])),
    params(ResolveQuery),
    responses(
        (status = 200, description = "Shard chosen for the key", body = ShardSelection),
        (status = 400, description = "Missing key", body = crate::error::ErrorResponse)
    )
)]
pub async fn resolve_shard(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ShardSelection>, ApiError> {
    let key = query
        .key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ApiError::bad_request("key is required"))?;
    Ok(Json(state.shards().shard_for(key)))
}

#[utoipa::path(
    get,
    path = "/api/admin/backups",
    tag = "System",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Backups on disk, newest first", body = BackupsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_backups(State(state): State<AppState>) -> Result<Json<BackupsResponse>, ApiError> {
    let backups = state.backups().list_backups().await?;
    Ok(Json(BackupsResponse {
        backups,
        retention: state.backups().retention(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/backups",
    tag = "System",
    security(("bearerAuth" = [])),
    responses(
        (status = 201, description = "Backup written; older ones beyond retention are pruned", body = BackupRecord),
        (status = 500, description = "Backup failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_backup(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<BackupRecord>), ApiError> {
    let record = state.backups().create_backup(state.db_pool()).await?;
    info!(file = %record.file_name, "manual backup created");
    Ok((StatusCode::CREATED, Json(record)))
}
