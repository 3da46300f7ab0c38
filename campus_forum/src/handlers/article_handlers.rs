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
    lifecycle::{ContentUpdate, NewArticle, NewComment},
    models::ContentKind,
    utils::PaginationParams,
    AppState,
};

pub async fn list_articles_handler(
    State(state): State<AppState>,
    AuthenticatedUser(viewer): AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ForumError> {
    let page = state.queries.list_articles(&viewer.id, &pagination).await?;
    debug!(viewer_id = %viewer.id, page = page.page, returned = page.items.len(), "Listed articles");
    Ok(Json(page))
}

pub async fn create_article_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(payload): Json<NewArticle>,
) -> Result<impl IntoResponse, ForumError> {
    let article = state.lifecycle.create_article(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn get_article_handler(
    State(state): State<AppState>,
    AuthenticatedUser(viewer): AuthenticatedUser,
    Path(article_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&article_id, ContentKind::Article)?;
    let detail = state.queries.get_article(&article_id, &viewer.id).await?;
    Ok(Json(detail))
}

pub async fn update_article_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(article_id): Path<String>,
    Json(payload): Json<ContentUpdate>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&article_id, ContentKind::Article)?;
    let updated = state.lifecycle.update_content(&caller, &article_id, payload).await?;
    Ok(Json(updated))
}

pub async fn delete_article_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(article_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&article_id, ContentKind::Article)?;
    state.lifecycle.delete_content(&caller, &article_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Comments ---

pub async fn create_comment_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(article_id): Path<String>,
    Json(payload): Json<NewComment>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&article_id, ContentKind::Article)?;
    let comment = state.lifecycle.create_comment(&caller, &article_id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(comment_id): Path<String>,
    Json(payload): Json<ContentUpdate>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&comment_id, ContentKind::Comment)?;
    let updated = state.lifecycle.update_content(&caller, &comment_id, payload).await?;
    Ok(Json(updated))
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    expect_kind(&comment_id, ContentKind::Comment)?;
    state.lifecycle.delete_content(&caller, &comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
