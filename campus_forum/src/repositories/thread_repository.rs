use sqlx::{PgConnection, PgPool};

use crate::models::{Thread, ThreadSummary};
use crate::utils::PaginationParams;

// Shared projection for listing and detail views. $1 is the viewer id.
const SUMMARY_SELECT: &str = r#"
    SELECT
        t.id,
        t.author_id,
        COALESCE(u.display_name, t.author_id) AS author_name,
        t.title,
        t.preview,
        t.anonymous,
        t.views,
        (SELECT COUNT(*) FROM posts p
            WHERE p.thread_id = t.id AND p.available AND NOT p.is_header) AS num_replies,
        (SELECT COUNT(DISTINCT l.actor_id) FROM likes l WHERE l.content_id = t.id) AS num_likes,
        EXISTS (SELECT 1 FROM likes l WHERE l.content_id = t.id AND l.actor_id = $1) AS is_liked,
        EXISTS (SELECT 1 FROM favorites f WHERE f.content_id = t.id AND f.actor_id = $1) AS is_favorited,
        t.created_at,
        t.last_activity_at
    FROM threads t
    LEFT JOIN users u ON u.id = t.author_id
"#;

/// Inserts a new thread row. The header post is inserted separately in the
/// same transaction.
pub async fn insert_thread(
    conn: &mut PgConnection,
    id: &str,
    author_id: &str,
    title: &str,
    preview: &str,
    anonymous: bool,
) -> Result<Thread, sqlx::Error> {
    sqlx::query_as::<_, Thread>(
        r#"
        INSERT INTO threads (id, author_id, title, preview, anonymous)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, author_id, title, preview, anonymous, views, available, created_at, last_activity_at
        "#,
    )
    .bind(id)
    .bind(author_id)
    .bind(title)
    .bind(preview)
    .bind(anonymous)
    .fetch_one(&mut *conn)
    .await
}

/// Fetches a thread and takes a row lock on it for the rest of the transaction.
pub async fn lock_thread(conn: &mut PgConnection, thread_id: &str) -> Result<Option<Thread>, sqlx::Error> {
    sqlx::query_as::<_, Thread>(
        r#"
        SELECT id, author_id, title, preview, anonymous, views, available, created_at, last_activity_at
        FROM threads
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(thread_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn touch_activity(conn: &mut PgConnection, thread_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE threads SET last_activity_at = NOW() WHERE id = $1")
        .bind(thread_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Mirrors an edited header post onto its thread.
pub async fn update_from_header(
    conn: &mut PgConnection,
    thread_id: &str,
    title: &str,
    preview: &str,
) -> Result<Thread, sqlx::Error> {
    sqlx::query_as::<_, Thread>(
        r#"
        UPDATE threads
        SET title = $2, preview = $3, last_activity_at = NOW()
        WHERE id = $1
        RETURNING id, author_id, title, preview, anonymous, views, available, created_at, last_activity_at
        "#,
    )
    .bind(thread_id)
    .bind(title)
    .bind(preview)
    .fetch_one(&mut *conn)
    .await
}

/// Soft-deletes a thread. Returns the number of rows that changed state.
pub async fn mark_unavailable(conn: &mut PgConnection, thread_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE threads SET available = FALSE WHERE id = $1 AND available")
        .bind(thread_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn increment_views(conn: &mut PgConnection, thread_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE threads SET views = views + 1 WHERE id = $1")
        .bind(thread_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn count_available(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM threads WHERE available")
        .fetch_one(pool)
        .await
}

/// One page of available threads with engagement state for `viewer_id`.
pub async fn list_summaries(
    pool: &PgPool,
    viewer_id: &str,
    pagination: &PaginationParams,
) -> Result<Vec<ThreadSummary>, sqlx::Error> {
    let direction = if pagination.descending() { "DESC" } else { "ASC" };
    let sql = format!(
        "{} WHERE t.available ORDER BY {} {}, id {} LIMIT $2 OFFSET $3",
        SUMMARY_SELECT,
        pagination.sort_column().sql(),
        direction,
        direction
    );
    sqlx::query_as::<_, ThreadSummary>(&sql)
        .bind(viewer_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(pool)
        .await
}

pub async fn get_summary(
    pool: &PgPool,
    thread_id: &str,
    viewer_id: &str,
) -> Result<Option<ThreadSummary>, sqlx::Error> {
    let sql = format!("{} WHERE t.id = $2 AND t.available", SUMMARY_SELECT);
    sqlx::query_as::<_, ThreadSummary>(&sql)
        .bind(viewer_id)
        .bind(thread_id)
        .fetch_optional(pool)
        .await
}
