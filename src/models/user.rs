use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::info;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
}

impl User {
    // Найти активного пользователя по email
    pub async fn find_active_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, is_staff, is_active
             FROM users
             WHERE email = $1 AND is_active = true",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    // Проверить пароль по bcrypt-хешу; битый хеш = неверный пароль
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    /// Создаёт администратора или обновляет пароль существующего.
    pub async fn upsert_admin(pool: &PgPool, email: &str, password: &str) -> anyhow::Result<User> {
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, is_staff, is_active)
             VALUES ($1, $2, true, true)
             ON CONFLICT (email) DO UPDATE
                SET password_hash = EXCLUDED.password_hash, is_staff = true, is_active = true
             RETURNING id, email, password_hash, is_staff, is_active",
        )
        .bind(email)
        .bind(hash)
        .fetch_one(pool)
        .await?;
        info!("Bootstrap admin {} is ready", user.email);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_password(password: &str) -> User {
        User {
            id: 1,
            email: "alice@example.com".into(),
            // минимальная стоимость, чтобы тест не тормозил
            password_hash: bcrypt::hash(password, 4).unwrap(),
            is_staff: false,
            is_active: true,
        }
    }

    #[test]
    fn correct_password_verifies() {
        assert!(user_with_password("secret").verify_password("secret"));
    }

    #[test]
    fn wrong_password_or_broken_hash_fails() {
        assert!(!user_with_password("secret").verify_password("other"));
        let mut user = user_with_password("secret");
        user.password_hash = "not-a-bcrypt-hash".into();
        assert!(!user.verify_password("secret"));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let value = serde_json::to_value(user_with_password("secret")).unwrap();
        assert!(value.get("password_hash").is_none());
    }
}
