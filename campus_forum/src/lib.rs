use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

pub mod aggregation;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod repositories;
pub mod seeder;
pub mod storage;
pub mod utils;

use aggregation::QueryEngine;
use auth::{IdentityResolver, JwtResolver};
use config::Config;
use constants::MAX_ATTACHMENT_SIZE_BYTES;
use handlers::{
    article_handlers::{
        create_article_handler, create_comment_handler, delete_article_handler, delete_comment_handler,
        get_article_handler, list_articles_handler, update_article_handler, update_comment_handler,
    },
    attachment_handlers::{list_attachments_handler, upload_attachment_handler},
    engagement_handlers::{favorite_handler, like_handler, unfavorite_handler, unlike_handler},
    post_handlers::{create_post_handler, delete_post_handler, set_validation_status_handler, update_post_handler},
    thread_handlers::{
        create_thread_handler, delete_thread_handler, get_thread_handler, list_threads_handler,
        update_thread_handler,
    },
    user_handlers::{get_karma_handler, list_favorites_handler, top_karma_handler},
};
use lifecycle::LifecycleEngine;
use storage::LocalFileStorage;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: LifecycleEngine,
    pub queries: QueryEngine,
    pub identity: Arc<dyn IdentityResolver>,
    pub file_storage: LocalFileStorage,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: &Config) -> Self {
        Self {
            lifecycle: LifecycleEngine::new(db_pool.clone(), config.karma_points()),
            queries: QueryEngine::new(db_pool),
            identity: Arc::new(JwtResolver::new(&config.jwt_secret)),
            file_storage: LocalFileStorage::new(config.upload_dir.clone(), config.upload_base_url.clone()),
        }
    }
}

pub fn create_router(db_pool: PgPool, config: &Config) -> Router {
    let app_state = AppState::new(db_pool, config);
    let static_service = ServeDir::new(&app_state.file_storage.upload_dir);
    let static_mount = if app_state.file_storage.base_url.is_empty() {
        "/uploads".to_string()
    } else {
        app_state.file_storage.base_url.clone()
    };

    // Room for multipart framing on top of the largest attachment.
    let max_body_size = MAX_ATTACHMENT_SIZE_BYTES as usize + 64 * 1024;

    Router::new()
        .route("/threads", get(list_threads_handler).post(create_thread_handler))
        .route(
            "/threads/:id",
            get(get_thread_handler).put(update_thread_handler).delete(delete_thread_handler),
        )
        .route("/threads/:id/posts", post(create_post_handler))
        .route("/posts/:id", put(update_post_handler).delete(delete_post_handler))
        .route("/posts/:id/validation", put(set_validation_status_handler))
        .route("/articles", get(list_articles_handler).post(create_article_handler))
        .route(
            "/articles/:id",
            get(get_article_handler).put(update_article_handler).delete(delete_article_handler),
        )
        .route("/articles/:id/comments", post(create_comment_handler))
        .route("/comments/:id", put(update_comment_handler).delete(delete_comment_handler))
        .route("/content/:id/like", put(like_handler).delete(unlike_handler))
        .route("/content/:id/favorite", put(favorite_handler).delete(unfavorite_handler))
        .route("/me/favorites", get(list_favorites_handler))
        .route("/users/:id/karma", get(get_karma_handler))
        .route("/karma/top", get(top_karma_handler))
        .route("/content/:id/attachments", get(list_attachments_handler))
        .route("/files", post(upload_attachment_handler))
        .nest_service(&static_mount, static_service)
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http())
}
