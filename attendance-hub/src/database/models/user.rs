//! User database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::now_ms;
use crate::domain::{User, UserRole};
use crate::{Error, Result};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserDbModel {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Role: admin, coordinator, lecturer, class_rep, supervisor, student
    pub role: String,
    pub programme_id: Option<String>,
    pub created_at: i64,
}

impl From<&User> for UserDbModel {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role.as_str().to_string(),
            programme_id: user.programme_id.clone(),
            created_at: now_ms(),
        }
    }
}

impl TryFrom<UserDbModel> for User {
    type Error = Error;

    fn try_from(row: UserDbModel) -> Result<Self> {
        let role = UserRole::parse(&row.role)
            .ok_or_else(|| Error::Database(format!("unknown user role '{}'", row.role)))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            role,
            programme_id: row.programme_id,
        })
    }
}
