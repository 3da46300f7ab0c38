use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::Attachment;

// Input data for recording an uploaded file
pub struct NewAttachment<'a> {
    pub owner_id: &'a str,
    pub content_id: Option<&'a str>,
    pub file_url: &'a str,
    pub file_name: Option<&'a str>,
    pub mime_type: Option<&'a str>,
    pub size_bytes: i64,
}

pub async fn insert_attachment(conn: &mut PgConnection, data: NewAttachment<'_>) -> Result<Attachment, sqlx::Error> {
    sqlx::query_as::<_, Attachment>(
        r#"
        INSERT INTO attachments (id, owner_id, content_id, file_url, file_name, mime_type, size_bytes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, owner_id, content_id, file_url, file_name, mime_type, size_bytes, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(data.owner_id)
    .bind(data.content_id)
    .bind(data.file_url)
    .bind(data.file_name)
    .bind(data.mime_type)
    .bind(data.size_bytes)
    .fetch_one(&mut *conn)
    .await
}

/// Attachments of one content item, oldest first.
pub async fn list_for_content(pool: &PgPool, content_id: &str) -> Result<Vec<Attachment>, sqlx::Error> {
    sqlx::query_as::<_, Attachment>(
        r#"
        SELECT id, owner_id, content_id, file_url, file_name, mime_type, size_bytes, created_at
        FROM attachments
        WHERE content_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(content_id)
    .fetch_all(pool)
    .await
}
