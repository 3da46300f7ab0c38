use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::debug;

use super::expect_kind;
use crate::{
    auth::AuthenticatedUser,
    error::ForumError,
    lifecycle::{ContentUpdate, NewThread},
    models::ContentKind,
    utils::PaginationParams,
    AppState,
};

/// Lists available threads, sorted and paginated.
pub async fn list_threads_handler(
    State(state): State<AppState>,
    AuthenticatedUser(viewer): AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ForumError> {
    let page = state.queries.list_threads(&viewer.id, &pagination).await?;
    debug!(viewer_id = %viewer.id, page = page.page, returned = page.items.len(), "Listed threads");
    Ok(Json(page))
}

pub async fn create_thread_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(payload): Json<NewThread>,
) -> Result<impl IntoResponse, ForumError> {
    let created = state.lifecycle.create_thread(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Thread with its posts. Counts a view for the caller.
pub async fn get_thread_handler(
    State(state): State<AppState>,
    AuthenticatedUser(viewer): AuthenticatedUser,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&thread_id, ContentKind::Thread)?;
    let detail = state.queries.get_thread(&thread_id, &viewer.id).await?;
    Ok(Json(detail))
}

pub async fn update_thread_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(thread_id): Path<String>,
    Json(payload): Json<ContentUpdate>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&thread_id, ContentKind::Thread)?;
    let updated = state.lifecycle.update_content(&caller, &thread_id, payload).await?;
    Ok(Json(updated))
}

pub async fn delete_thread_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&thread_id, ContentKind::Thread)?;
    state.lifecycle.delete_content(&caller, &thread_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
