use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::{auth::AuthenticatedUser, error::ForumError, lifecycle::Outcome, AppState};

/// Body returned by like and favorite toggles. `outcome` is `unchanged`
/// when the caller had already liked (or unliked) the item.
#[derive(Debug, Serialize)]
pub struct EngagementResponse {
    pub content_id: String,
    pub outcome: Outcome,
}

fn respond(content_id: String, outcome: Outcome) -> Json<EngagementResponse> {
    Json(EngagementResponse { content_id, outcome })
}

pub async fn like_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    let outcome = state.lifecycle.like(&caller, &content_id).await?;
    Ok(respond(content_id, outcome))
}

pub async fn unlike_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    let outcome = state.lifecycle.unlike(&caller, &content_id).await?;
    Ok(respond(content_id, outcome))
}

pub async fn favorite_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    let outcome = state.lifecycle.favorite(&caller, &content_id).await?;
    Ok(respond(content_id, outcome))
}

pub async fn unfavorite_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    let outcome = state.lifecycle.unfavorite(&caller, &content_id).await?;
    Ok(respond(content_id, outcome))
}
