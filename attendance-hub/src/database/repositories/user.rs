//! User repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::UserDbModel;
use crate::domain::{User, UserRole};
use crate::{Error, Result};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<User>;
    async fn find_user(&self, id: &str) -> Result<Option<User>>;
    /// Users holding `role`, optionally restricted to one programme.
    async fn list_by_role(&self, role: UserRole, programme_id: Option<&str>) -> Result<Vec<User>>;
    async fn create_user(&self, user: &User) -> Result<()>;
}

pub struct SqlxUserRepository {
    pool: SqlitePool,
}

impl SqlxUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn get_user(&self, id: &str) -> Result<User> {
        self.find_user(id)
            .await?
            .ok_or_else(|| Error::not_found("User", id))
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserDbModel>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_by_role(&self, role: UserRole, programme_id: Option<&str>) -> Result<Vec<User>> {
        let rows = if let Some(programme_id) = programme_id {
            sqlx::query_as::<_, UserDbModel>(
                "SELECT * FROM users WHERE role = ? AND programme_id = ? ORDER BY name",
            )
            .bind(role.as_str())
            .bind(programme_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, UserDbModel>("SELECT * FROM users WHERE role = ? ORDER BY name")
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await?
        };
        rows.into_iter().map(User::try_from).collect()
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let row = UserDbModel::from(user);
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, role, programme_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.role)
        .bind(&row.programme_id)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
