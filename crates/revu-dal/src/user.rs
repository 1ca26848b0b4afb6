use garde::Validate;
use revu_types::{
    claim::Role,
    general::{ValidEmail, Username},
};
use serde::{Deserialize, Serialize};
use sqlx::Pool;
use time::PrimitiveDateTime;
use tracing::debug;

use crate::{Batch, Error, ListingParams, error::Result};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateUser {
    #[garde(dive)]
    pub username: Username,
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(skip)]
    #[serde(default)]
    pub role: Option<Role>,
    #[garde(length(max = 5000))]
    pub bio: Option<String>,
    #[garde(length(max = 150))]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    pub last_name: Option<String>,
}

/// Admin-side partial update.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateUser {
    #[garde(dive)]
    pub username: Option<Username>,
    #[garde(dive)]
    pub email: Option<ValidEmail>,
    #[garde(skip)]
    #[serde(default)]
    pub role: Option<Role>,
    #[garde(length(max = 5000))]
    pub bio: Option<String>,
    #[garde(length(max = 150))]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    pub last_name: Option<String>,
}

/// Self-service partial update. Deliberately has no role field, so a caller
/// can never promote themselves whatever the payload says.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateProfile {
    #[garde(dive)]
    pub username: Option<Username>,
    #[garde(dive)]
    pub email: Option<ValidEmail>,
    #[garde(length(max = 5000))]
    pub bio: Option<String>,
    #[garde(length(max = 150))]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    pub last_name: Option<String>,
}

/// Signup payload - username + email only, account gets no usable password.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct Register {
    #[garde(dive)]
    pub username: Username,
    #[garde(dive)]
    pub email: ValidEmail,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserInt {
    id: i64,
    username: String,
    email: String,
    role: String,
    bio: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    superuser: bool,
    last_login: Option<PrimitiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub superuser: bool,
    #[serde(skip_serializing, default)]
    pub last_login: Option<PrimitiveDateTime>,
}

impl From<UserInt> for User {
    fn from(value: UserInt) -> Self {
        let role = value.role.parse().unwrap_or_else(|e| {
            debug!("Stored role is not valid ({e}), falling back to user");
            Role::User
        });
        Self {
            id: value.id,
            username: value.username,
            email: value.email,
            role,
            bio: value.bio,
            first_name: value.first_name,
            last_name: value.last_name,
            superuser: value.superuser,
            last_login: value.last_login,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, role, bio, first_name, last_name, superuser, last_login";

fn user_unique(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let what = if db.message().contains("username") {
                "username is already taken"
            } else {
                "email is already registered"
            };
            return Error::UniqueViolation(what.to_string());
        }
    }
    Error::DatabaseError(e)
}

pub type UserRepository = UserRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        let role = payload.role.unwrap_or_default();
        let result = sqlx::query(
            "INSERT INTO users (username, email, role, bio, first_name, last_name) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(payload.username.as_ref())
        .bind(payload.email.as_ref())
        .bind(role.as_str())
        .bind(&payload.bio)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .execute(&self.executor)
        .await
        .map_err(user_unique)?;

        self.get(result.last_insert_rowid()).await
    }

    /// Signup: the exact (username, email) pair fetches the existing
    /// account, anything colliding on just one of the two is an error.
    pub async fn register(&self, payload: Register) -> Result<User> {
        let existing = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? AND email = ?"
        ))
        .bind(payload.username.as_ref())
        .bind(payload.email.as_ref())
        .fetch_optional(&self.executor)
        .await?;
        if let Some(user) = existing {
            return Ok(user.into());
        }

        let result = sqlx::query("INSERT INTO users (username, email) VALUES (?, ?)")
            .bind(payload.username.as_ref())
            .bind(payload.email.as_ref())
            .execute(&self.executor)
            .await
            .map_err(user_unique)?;

        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        let user = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))?;
        Ok(user.into())
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        let user = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))?;
        Ok(user.into())
    }

    pub async fn list(&self, params: ListingParams, search: Option<&str>) -> Result<Batch<User>> {
        let pattern = search.map(|s| format!("%{}%", s));
        let total: u64 = match &pattern {
            Some(pattern) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username LIKE ?")
                    .bind(pattern)
                    .fetch_one(&self.executor)
                    .await? as u64
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                    .fetch_one(&self.executor)
                    .await? as u64
            }
        };

        let sql = match &pattern {
            Some(_) => format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username LIKE ? \
                 ORDER BY id LIMIT ? OFFSET ?"
            ),
            None => format!("SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ? OFFSET ?"),
        };
        let mut query = sqlx::query_as::<_, UserInt>(&sql);
        if let Some(pattern) = &pattern {
            query = query.bind(pattern);
        }
        let rows = query
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&self.executor)
            .await?
            .into_iter()
            .map(User::from)
            .collect();

        Ok(Batch {
            rows,
            total,
            offset: params.offset,
        })
    }

    pub async fn update_by_username(&self, username: &str, payload: UpdateUser) -> Result<User> {
        let result = sqlx::query(
            "UPDATE users SET \
             username = COALESCE(?, username), \
             email = COALESCE(?, email), \
             role = COALESCE(?, role), \
             bio = COALESCE(?, bio), \
             first_name = COALESCE(?, first_name), \
             last_name = COALESCE(?, last_name) \
             WHERE username = ?",
        )
        .bind(payload.username.as_ref().map(|u| u.as_ref().to_string()))
        .bind(payload.email.as_ref().map(|e| e.as_ref().to_string()))
        .bind(payload.role.map(|r| r.as_str()))
        .bind(&payload.bio)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(username)
        .execute(&self.executor)
        .await
        .map_err(user_unique)?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("User".to_string()));
        }
        let changed = payload
            .username
            .as_ref()
            .map(|u| u.as_ref().to_string())
            .unwrap_or_else(|| username.to_string());
        self.get_by_username(&changed).await
    }

    pub async fn update_profile(&self, id: i64, payload: UpdateProfile) -> Result<User> {
        let result = sqlx::query(
            "UPDATE users SET \
             username = COALESCE(?, username), \
             email = COALESCE(?, email), \
             bio = COALESCE(?, bio), \
             first_name = COALESCE(?, first_name), \
             last_name = COALESCE(?, last_name) \
             WHERE id = ?",
        )
        .bind(payload.username.as_ref().map(|u| u.as_ref().to_string()))
        .bind(payload.email.as_ref().map(|e| e.as_ref().to_string()))
        .bind(&payload.bio)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(id)
        .execute(&self.executor)
        .await
        .map_err(user_unique)?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("User".to_string()));
        }
        self.get(id).await
    }

    pub async fn delete_by_username(&self, username: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("User".to_string()));
        }
        Ok(())
    }

    /// Stamps a fresh login time, which also invalidates all previously
    /// issued confirmation codes for the account.
    pub async fn touch_last_login(&self, id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("User".to_string()));
        }
        Ok(())
    }
}
