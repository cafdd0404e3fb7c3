use axum::{
    extract::{Path, Query, State},
    Json,
};
use pharmacy_integrations::{BlogPost, PostQuery};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct PostsResponse {
    pub posts: Vec<BlogPost>,
    pub page: u32,
    pub per_page: u32,
    pub total: Option<u64>,
    pub total_pages: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/blog/posts",
    tag = "Blog",
    params(PostQuery),
    responses(
        (status = 200, description = "One page of published posts", body = PostsResponse),
        (status = 502, description = "WordPress request failed", body = crate::error::ErrorResponse),
        (status = 503, description = "WordPress not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<Json<PostsResponse>, ApiError> {
    let page = state.integrations().wordpress()?.list_posts(&query).await?;
    Ok(Json(PostsResponse {
        posts: page.items,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        total_pages: page.total_pages,
    }))
}

#[utoipa::path(
    get,
    path = "/api/blog/posts/{slug}",
    tag = "Blog",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post", body = BlogPost),
        (status = 404, description = "No post with that slug", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    let post = state.integrations().wordpress()?.get_post_by_slug(&slug).await?;
    Ok(Json(post))
}
