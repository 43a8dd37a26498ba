use sqlx::types::Uuid;
use sqlx::{Error, PgPool};

use crate::db::models::User;

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, role, phone_number, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }
}
