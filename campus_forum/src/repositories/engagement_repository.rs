use sqlx::{FromRow, PgConnection, PgPool};

use crate::models::{ContentKind, FavoriteItem};

/// Owner and visibility of any content item.
#[derive(Debug, FromRow)]
pub struct ContentHead {
    pub id: String,
    pub author_id: String,
    pub available: bool,
}

fn table_of(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Thread => "threads",
        ContentKind::Post => "posts",
        ContentKind::Article => "articles",
        ContentKind::Comment => "comments",
    }
}

/// Reads the owner of a content item under a shared row lock. Concurrent
/// likes proceed in parallel while a delete of the same item waits.
pub async fn share_lock_head(
    conn: &mut PgConnection,
    kind: ContentKind,
    content_id: &str,
) -> Result<Option<ContentHead>, sqlx::Error> {
    let sql = format!(
        "SELECT id, author_id, available FROM {} WHERE id = $1 FOR SHARE",
        table_of(kind)
    );
    sqlx::query_as::<_, ContentHead>(&sql)
        .bind(content_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Returns true when a new like row was written.
pub async fn insert_like(conn: &mut PgConnection, actor_id: &str, content_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO likes (actor_id, content_id)
        VALUES ($1, $2)
        ON CONFLICT (actor_id, content_id) DO NOTHING
        "#,
    )
    .bind(actor_id)
    .bind(content_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Returns true when a like row was removed.
pub async fn delete_like(conn: &mut PgConnection, actor_id: &str, content_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM likes WHERE actor_id = $1 AND content_id = $2")
        .bind(actor_id)
        .bind(content_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn insert_favorite(conn: &mut PgConnection, actor_id: &str, content_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO favorites (actor_id, content_id)
        VALUES ($1, $2)
        ON CONFLICT (actor_id, content_id) DO NOTHING
        "#,
    )
    .bind(actor_id)
    .bind(content_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_favorite(conn: &mut PgConnection, actor_id: &str, content_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE actor_id = $1 AND content_id = $2")
        .bind(actor_id)
        .bind(content_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Hard-deletes likes and favorites of a single content item.
/// Returns the number of like rows removed.
pub async fn purge_for_content(conn: &mut PgConnection, content_id: &str) -> Result<u64, sqlx::Error> {
    let likes = sqlx::query("DELETE FROM likes WHERE content_id = $1")
        .bind(content_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM favorites WHERE content_id = $1")
        .bind(content_id)
        .execute(&mut *conn)
        .await?;
    Ok(likes.rows_affected())
}

/// Hard-deletes likes and favorites of a thread and of every post in it.
/// Returns the number of like rows removed.
pub async fn purge_for_thread(conn: &mut PgConnection, thread_id: &str) -> Result<u64, sqlx::Error> {
    let likes = sqlx::query(
        r#"
        DELETE FROM likes
        WHERE content_id = $1
           OR content_id IN (SELECT id FROM posts WHERE thread_id = $1)
        "#,
    )
    .bind(thread_id)
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"
        DELETE FROM favorites
        WHERE content_id = $1
           OR content_id IN (SELECT id FROM posts WHERE thread_id = $1)
        "#,
    )
    .bind(thread_id)
    .execute(&mut *conn)
    .await?;
    Ok(likes.rows_affected())
}

/// Records a view if this viewer has not seen the item before.
/// Returns true on the first view only.
pub async fn record_view(conn: &mut PgConnection, viewer_id: &str, content_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO content_views (viewer_id, content_id)
        VALUES ($1, $2)
        ON CONFLICT (viewer_id, content_id) DO NOTHING
        "#,
    )
    .bind(viewer_id)
    .bind(content_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Available items of one kind the actor has favorited, newest favorite first.
pub async fn list_favorites(
    pool: &PgPool,
    actor_id: &str,
    kind: ContentKind,
) -> Result<Vec<FavoriteItem>, sqlx::Error> {
    let title_expr = match kind {
        ContentKind::Thread | ContentKind::Article => "c.title",
        ContentKind::Post => "COALESCE(c.title, LEFT(c.body, 150))",
        ContentKind::Comment => "LEFT(c.body, 150)",
    };
    let sql = format!(
        r#"
        SELECT f.content_id, {} AS title, f.created_at AS favorited_at
        FROM favorites f
        JOIN {} c ON c.id = f.content_id
        WHERE f.actor_id = $1 AND c.available
        ORDER BY f.created_at DESC, f.content_id ASC
        "#,
        title_expr,
        table_of(kind)
    );
    sqlx::query_as::<_, FavoriteItem>(&sql)
        .bind(actor_id)
        .fetch_all(pool)
        .await
}
