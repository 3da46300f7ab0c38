use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::expect_kind;
use crate::{
    auth::{AuthenticatedUser, StaffUser},
    error::ForumError,
    lifecycle::{ContentUpdate, NewReply},
    models::ContentKind,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ValidationPayload {
    pub status: String,
}

/// Adds a reply to a thread.
pub async fn create_post_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(thread_id): Path<String>,
    Json(payload): Json<NewReply>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&thread_id, ContentKind::Thread)?;
    let post = state.lifecycle.create_reply(&caller, &thread_id, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(post_id): Path<String>,
    Json(payload): Json<ContentUpdate>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&post_id, ContentKind::Post)?;
    let updated = state.lifecycle.update_content(&caller, &post_id, payload).await?;
    Ok(Json(updated))
}

/// Deleting a header post deletes the whole thread.
pub async fn delete_post_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&post_id, ContentKind::Post)?;
    state.lifecycle.delete_content(&caller, &post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_validation_status_handler(
    State(state): State<AppState>,
    StaffUser(caller): StaffUser,
    Path(post_id): Path<String>,
    Json(payload): Json<ValidationPayload>,
) -> Result<impl IntoResponse, ForumError> {
    let post = state
        .lifecycle
        .set_validation_status(&caller, &post_id, &payload.status)
        .await?;
    Ok(Json(post))
}
