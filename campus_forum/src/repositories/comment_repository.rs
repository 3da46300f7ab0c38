use sqlx::{PgConnection, PgPool};

use crate::models::{Comment, CommentView};

pub async fn insert_comment(
    conn: &mut PgConnection,
    id: &str,
    article_id: &str,
    author_id: &str,
    body: &str,
    anonymous: bool,
) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, article_id, author_id, body, anonymous)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, article_id, author_id, body, anonymous, available, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(article_id)
    .bind(author_id)
    .bind(body)
    .bind(anonymous)
    .fetch_one(&mut *conn)
    .await
}

/// Parent article of a comment, read without locking.
pub async fn article_of(conn: &mut PgConnection, comment_id: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT article_id FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn lock_comment(conn: &mut PgConnection, comment_id: &str) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, article_id, author_id, body, anonymous, available, created_at, updated_at
        FROM comments
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(comment_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn update_comment(conn: &mut PgConnection, comment_id: &str, body: &str) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        UPDATE comments
        SET body = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, article_id, author_id, body, anonymous, available, created_at, updated_at
        "#,
    )
    .bind(comment_id)
    .bind(body)
    .fetch_one(&mut *conn)
    .await
}

pub async fn mark_unavailable(conn: &mut PgConnection, comment_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE comments SET available = FALSE WHERE id = $1 AND available")
        .bind(comment_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Available comments of an article, oldest first.
pub async fn list_views_for_article(
    pool: &PgPool,
    article_id: &str,
    viewer_id: &str,
) -> Result<Vec<CommentView>, sqlx::Error> {
    sqlx::query_as::<_, CommentView>(
        r#"
        SELECT
            c.id,
            c.article_id,
            c.author_id,
            COALESCE(u.display_name, c.author_id) AS author_name,
            c.body,
            c.anonymous,
            (SELECT COUNT(DISTINCT l.actor_id) FROM likes l WHERE l.content_id = c.id) AS num_likes,
            EXISTS (SELECT 1 FROM likes l WHERE l.content_id = c.id AND l.actor_id = $2) AS is_liked,
            c.created_at,
            c.updated_at
        FROM comments c
        LEFT JOIN users u ON u.id = c.author_id
        WHERE c.article_id = $1 AND c.available
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(article_id)
    .bind(viewer_id)
    .fetch_all(pool)
    .await
}
