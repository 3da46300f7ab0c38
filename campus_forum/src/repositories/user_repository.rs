use sqlx::{PgConnection, PgPool};

use crate::models::KarmaRank;

/// Applies a karma delta as a single conditional upsert, floored at zero.
/// Creates the ledger row on first adjustment. Returns the new balance.
pub async fn adjust_karma(conn: &mut PgConnection, user_id: &str, delta: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO karma (user_id, balance)
        VALUES ($1, GREATEST($2, 0))
        ON CONFLICT (user_id) DO UPDATE
        SET balance = GREATEST(karma.balance + $2, 0), updated_at = NOW()
        RETURNING balance
        "#,
    )
    .bind(user_id)
    .bind(delta)
    .fetch_one(&mut *conn)
    .await
}

/// Current balance; users without a ledger row have zero karma.
pub async fn get_karma(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    let balance = sqlx::query_scalar::<_, i64>("SELECT balance FROM karma WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(balance.unwrap_or(0))
}

/// Active students of a semester ranked by karma.
pub async fn top_karma(pool: &PgPool, semester: &str, limit: i64) -> Result<Vec<KarmaRank>, sqlx::Error> {
    sqlx::query_as::<_, KarmaRank>(
        r#"
        SELECT u.id AS user_id, u.display_name, COALESCE(k.balance, 0) AS balance
        FROM users u
        LEFT JOIN karma k ON k.user_id = u.id
        WHERE u.role = 'student' AND u.status = 'active' AND u.semester = $1
        ORDER BY balance DESC, u.id ASC
        LIMIT $2
        "#,
    )
    .bind(semester)
    .bind(limit)
    .fetch_all(pool)
    .await
}
