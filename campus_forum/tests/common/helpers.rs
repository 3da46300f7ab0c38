//! Shared helper functions for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::Body,
    http::{self, Request, StatusCode},
    Router,
};
use campus_forum::{
    aggregation::QueryEngine,
    auth::JwtResolver,
    config::Config,
    create_router,
    lifecycle::{KarmaPoints, LifecycleEngine, NewArticle, NewComment, NewReply, NewThread},
    models::{Caller, Role},
    repositories::user_repository,
    seeder,
};
use envconfig::Envconfig;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789";
pub const SEMESTER: &str = "2024-fall";

pub fn test_config() -> Config {
    let upload_dir = std::env::temp_dir().join(format!("campus-forum-uploads-{}", uuid::Uuid::new_v4()));
    let mut env = HashMap::new();
    env.insert("FORUM_JWT_SECRET".to_string(), TEST_SECRET.to_string());
    env.insert("FORUM_UPLOAD_DIR".to_string(), upload_dir.to_string_lossy().into_owned());
    env.insert("FORUM_UPLOAD_BASE_URL".to_string(), "/uploads".to_string());
    Config::init_from_hashmap(&env).expect("test config")
}

pub async fn create_test_app(pool: PgPool) -> Router {
    seed_users(&pool).await;
    create_router(pool, &test_config())
}

/// alice, bob and carol are students; ta is staff; admin is admin.
pub async fn seed_users(pool: &PgPool) {
    seeder::seed_database(pool).await.expect("seed demo users");
}

pub fn engines(pool: &PgPool) -> (LifecycleEngine, QueryEngine) {
    (
        LifecycleEngine::new(pool.clone(), KarmaPoints::default()),
        QueryEngine::new(pool.clone()),
    )
}

pub fn student(id: &str) -> Caller {
    Caller::new(id, Role::Student)
}

pub fn staff(id: &str) -> Caller {
    Caller::new(id, Role::Staff)
}

pub fn token_for(user_id: &str, role: Role) -> String {
    JwtResolver::new(TEST_SECRET)
        .issue_token(user_id, role, Duration::from_secs(3600))
        .expect("issue token")
}

pub async fn karma(pool: &PgPool, user_id: &str) -> i64 {
    user_repository::get_karma(pool, user_id).await.expect("read karma")
}

pub fn new_thread(title: &str, body: &str) -> NewThread {
    NewThread {
        title: title.to_string(),
        body: body.to_string(),
        anonymous: false,
    }
}

pub fn reply(body: &str) -> NewReply {
    NewReply {
        reply_to: None,
        title: None,
        body: body.to_string(),
        anonymous: false,
    }
}

pub fn new_article(title: &str, body: &str) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        body: body.to_string(),
        anonymous: false,
    }
}

pub fn comment(body: &str) -> NewComment {
    NewComment {
        body: body.to_string(),
        anonymous: false,
    }
}

/// Sends one request through the router and decodes the JSON body, if any.
pub async fn send(
    app: &Router,
    method: http::Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
