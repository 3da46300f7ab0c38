use sqlx::{PgConnection, PgPool};

use crate::models::{Article, ArticleSummary};
use crate::utils::PaginationParams;

// $1 is the viewer id.
const SUMMARY_SELECT: &str = r#"
    SELECT
        a.id,
        a.author_id,
        COALESCE(u.display_name, a.author_id) AS author_name,
        a.title,
        a.body,
        a.anonymous,
        a.views,
        (SELECT COUNT(*) FROM comments c WHERE c.article_id = a.id AND c.available) AS num_replies,
        (SELECT COUNT(DISTINCT l.actor_id) FROM likes l WHERE l.content_id = a.id) AS num_likes,
        EXISTS (SELECT 1 FROM likes l WHERE l.content_id = a.id AND l.actor_id = $1) AS is_liked,
        EXISTS (SELECT 1 FROM favorites f WHERE f.content_id = a.id AND f.actor_id = $1) AS is_favorited,
        a.created_at,
        a.last_activity_at
    FROM articles a
    LEFT JOIN users u ON u.id = a.author_id
"#;

pub async fn insert_article(
    conn: &mut PgConnection,
    id: &str,
    author_id: &str,
    title: &str,
    body: &str,
    anonymous: bool,
) -> Result<Article, sqlx::Error> {
    sqlx::query_as::<_, Article>(
        r#"
        INSERT INTO articles (id, author_id, title, body, anonymous)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, author_id, title, body, anonymous, views, available, created_at, last_activity_at
        "#,
    )
    .bind(id)
    .bind(author_id)
    .bind(title)
    .bind(body)
    .bind(anonymous)
    .fetch_one(&mut *conn)
    .await
}

pub async fn lock_article(conn: &mut PgConnection, article_id: &str) -> Result<Option<Article>, sqlx::Error> {
    sqlx::query_as::<_, Article>(
        r#"
        SELECT id, author_id, title, body, anonymous, views, available, created_at, last_activity_at
        FROM articles
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(article_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn update_article(
    conn: &mut PgConnection,
    article_id: &str,
    title: Option<&str>,
    body: &str,
) -> Result<Article, sqlx::Error> {
    sqlx::query_as::<_, Article>(
        r#"
        UPDATE articles
        SET title = COALESCE($2, title), body = $3, last_activity_at = NOW()
        WHERE id = $1
        RETURNING id, author_id, title, body, anonymous, views, available, created_at, last_activity_at
        "#,
    )
    .bind(article_id)
    .bind(title)
    .bind(body)
    .fetch_one(&mut *conn)
    .await
}

pub async fn touch_activity(conn: &mut PgConnection, article_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE articles SET last_activity_at = NOW() WHERE id = $1")
        .bind(article_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn mark_unavailable(conn: &mut PgConnection, article_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE articles SET available = FALSE WHERE id = $1 AND available")
        .bind(article_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn increment_views(conn: &mut PgConnection, article_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE articles SET views = views + 1 WHERE id = $1")
        .bind(article_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn count_available(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles WHERE available")
        .fetch_one(pool)
        .await
}

pub async fn list_summaries(
    pool: &PgPool,
    viewer_id: &str,
    pagination: &PaginationParams,
) -> Result<Vec<ArticleSummary>, sqlx::Error> {
    let direction = if pagination.descending() { "DESC" } else { "ASC" };
    let sql = format!(
        "{} WHERE a.available ORDER BY {} {}, id {} LIMIT $2 OFFSET $3",
        SUMMARY_SELECT,
        pagination.sort_column().sql(),
        direction,
        direction
    );
    sqlx::query_as::<_, ArticleSummary>(&sql)
        .bind(viewer_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(pool)
        .await
}

pub async fn get_summary(
    pool: &PgPool,
    article_id: &str,
    viewer_id: &str,
) -> Result<Option<ArticleSummary>, sqlx::Error> {
    let sql = format!("{} WHERE a.id = $2 AND a.available", SUMMARY_SELECT);
    sqlx::query_as::<_, ArticleSummary>(&sql)
        .bind(viewer_id)
        .bind(article_id)
        .fetch_optional(pool)
        .await
}
