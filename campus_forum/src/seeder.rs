use sqlx::{Executor, PgPool};
use tracing::info;

use crate::models::Role;

/// Demo accounts created by `seed_database`: id, display name, role, semester.
pub const DEMO_USERS: &[(&str, &str, Role, &str)] = &[
    ("alice", "Alice", Role::Student, "2024-fall"),
    ("bob", "Bob", Role::Student, "2024-fall"),
    ("carol", "Carol", Role::Student, "2024-fall"),
    ("ta", "Teaching Assistant", Role::Staff, "2024-fall"),
    ("admin", "Administrator", Role::Admin, "2024-fall"),
];

/// Inserts or refreshes a user profile. Karma is left untouched.
pub async fn ensure_user(
    pool: &PgPool,
    user_id: &str,
    display_name: &str,
    role: Role,
    active: bool,
    semester: &str,
) -> Result<(), sqlx::Error> {
    pool.execute(
        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, role, status, semester)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                role = EXCLUDED.role,
                status = EXCLUDED.status,
                semester = EXCLUDED.semester
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(role.as_str())
        .bind(if active { "active" } else { "inactive" })
        .bind(semester),
    )
    .await?;
    Ok(())
}

/// Seeds the demo accounts. Safe to run repeatedly.
pub async fn seed_database(pool: &PgPool) -> Result<(), sqlx::Error> {
    for (id, name, role, semester) in DEMO_USERS {
        ensure_user(pool, id, name, *role, true, semester).await?;
        info!(user_id = %id, role = role.as_str(), "Ensured demo user");
    }
    Ok(())
}
