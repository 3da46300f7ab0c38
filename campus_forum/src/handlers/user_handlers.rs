use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    error::ForumError,
    models::ContentKind,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct FavoritesQuery {
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopKarmaQuery {
    pub semester: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct KarmaResponse {
    pub user_id: String,
    pub balance: i64,
}

/// The caller's favorites of one kind. Threads when no kind is given.
pub async fn list_favorites_handler(
    State(state): State<AppState>,
    AuthenticatedUser(viewer): AuthenticatedUser,
    Query(query): Query<FavoritesQuery>,
) -> Result<impl IntoResponse, ForumError> {
    let kind = match query.kind.as_deref() {
        Some(kind) => kind.parse::<ContentKind>()?,
        None => ContentKind::Thread,
    };
    let favorites = state.queries.list_favorites(&viewer.id, kind).await?;
    Ok(Json(favorites))
}

pub async fn get_karma_handler(
    State(state): State<AppState>,
    AuthenticatedUser(_viewer): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    let balance = state.queries.karma_of(&user_id).await?;
    Ok(Json(KarmaResponse { user_id, balance }))
}

/// Active students of a semester ranked by karma.
pub async fn top_karma_handler(
    State(state): State<AppState>,
    AuthenticatedUser(_viewer): AuthenticatedUser,
    Query(query): Query<TopKarmaQuery>,
) -> Result<impl IntoResponse, ForumError> {
    let ranking = state.queries.top_karma(&query.semester, query.limit).await?;
    Ok(Json(ranking))
}
