use sqlx::{FromRow, PgConnection, PgPool};

use crate::models::{Post, PostView, ValidationStatus};

// Input data for inserting a post
pub struct InsertPost<'a> {
    pub id: &'a str,
    pub thread_id: &'a str,
    pub author_id: &'a str,
    pub title: Option<&'a str>,
    pub body: &'a str,
    pub reply_to: Option<&'a str>,
    pub is_header: bool,
    pub anonymous: bool,
}

/// A post flipped to unavailable by a thread cascade.
#[derive(Debug, FromRow)]
pub struct CascadedPost {
    pub id: String,
    pub author_id: String,
    pub is_header: bool,
}

pub async fn insert_post(conn: &mut PgConnection, post: InsertPost<'_>) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, thread_id, author_id, title, body, reply_to, is_header, anonymous)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, thread_id, author_id, title, body, reply_to, is_header, validation_status,
                  anonymous, available, created_at, updated_at
        "#,
    )
    .bind(post.id)
    .bind(post.thread_id)
    .bind(post.author_id)
    .bind(post.title)
    .bind(post.body)
    .bind(post.reply_to)
    .bind(post.is_header)
    .bind(post.anonymous)
    .fetch_one(&mut *conn)
    .await
}

/// Looks up the owning thread without taking any lock, so callers can lock
/// the thread before the post.
pub async fn thread_of(conn: &mut PgConnection, post_id: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT thread_id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn lock_post(conn: &mut PgConnection, post_id: &str) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, thread_id, author_id, title, body, reply_to, is_header, validation_status,
               anonymous, available, created_at, updated_at
        FROM posts
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(post_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn lock_header(conn: &mut PgConnection, thread_id: &str) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, thread_id, author_id, title, body, reply_to, is_header, validation_status,
               anonymous, available, created_at, updated_at
        FROM posts
        WHERE thread_id = $1 AND is_header
        FOR UPDATE
        "#,
    )
    .bind(thread_id)
    .fetch_optional(&mut *conn)
    .await
}

/// True when `post_id` names an available post of `thread_id`.
pub async fn is_available_in_thread(
    conn: &mut PgConnection,
    post_id: &str,
    thread_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1 AND thread_id = $2 AND available)",
    )
    .bind(post_id)
    .bind(thread_id)
    .fetch_one(&mut *conn)
    .await
}

/// Replaces the body, and the title when one is given.
pub async fn update_post(
    conn: &mut PgConnection,
    post_id: &str,
    title: Option<&str>,
    body: &str,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET title = COALESCE($2, title), body = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING id, thread_id, author_id, title, body, reply_to, is_header, validation_status,
                  anonymous, available, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .bind(title)
    .bind(body)
    .fetch_one(&mut *conn)
    .await
}

pub async fn mark_unavailable(conn: &mut PgConnection, post_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE posts SET available = FALSE WHERE id = $1 AND available")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Soft-deletes every still-available post of a thread and reports which
/// rows changed, so karma is only reversed for those.
pub async fn mark_thread_posts_unavailable(
    conn: &mut PgConnection,
    thread_id: &str,
) -> Result<Vec<CascadedPost>, sqlx::Error> {
    sqlx::query_as::<_, CascadedPost>(
        r#"
        UPDATE posts
        SET available = FALSE
        WHERE thread_id = $1 AND available
        RETURNING id, author_id, is_header
        "#,
    )
    .bind(thread_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn set_validation_status(
    pool: &PgPool,
    post_id: &str,
    status: ValidationStatus,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET validation_status = $2, updated_at = NOW()
        WHERE id = $1 AND available
        RETURNING id, thread_id, author_id, title, body, reply_to, is_header, validation_status,
                  anonymous, available, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await
}

/// Available posts of a thread in creation order, header first.
pub async fn list_views_for_thread(
    pool: &PgPool,
    thread_id: &str,
    viewer_id: &str,
) -> Result<Vec<PostView>, sqlx::Error> {
    sqlx::query_as::<_, PostView>(
        r#"
        SELECT
            p.id,
            p.thread_id,
            p.author_id,
            COALESCE(u.display_name, p.author_id) AS author_name,
            p.title,
            p.body,
            p.reply_to,
            p.is_header,
            p.validation_status,
            p.anonymous,
            (SELECT COUNT(DISTINCT l.actor_id) FROM likes l WHERE l.content_id = p.id) AS num_likes,
            EXISTS (SELECT 1 FROM likes l WHERE l.content_id = p.id AND l.actor_id = $2) AS is_liked,
            p.created_at,
            p.updated_at
        FROM posts p
        LEFT JOIN users u ON u.id = p.author_id
        WHERE p.thread_id = $1 AND p.available
        ORDER BY p.created_at ASC, p.is_header DESC, p.id ASC
        "#,
    )
    .bind(thread_id)
    .bind(viewer_id)
    .fetch_all(pool)
    .await
}
