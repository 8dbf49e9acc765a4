use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::query::{FieldKind, FieldSpec, FilterValue, Filterable, ListQuery};
use super::traits::{StorageError, StorageResult, UserStore};
use crate::models::{CreateUser, Role, User};

/// Fields the admin user listing can filter and sort on
pub static USER_FIELDS: [FieldSpec; 4] = [
    FieldSpec {
        name: "name",
        column: "name",
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "email",
        column: "email",
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "role",
        column: "role",
        kind: FieldKind::Choice(&["user", "employer", "admin"]),
    },
    FieldSpec {
        name: "createdAt",
        column: "created_at",
        kind: FieldKind::Timestamp,
    },
];

/// Newest accounts first unless the client asks otherwise
pub const USER_DEFAULT_SORT: &str = "-createdAt";

impl Filterable for User {
    fn field_value(&self, name: &str) -> Option<FilterValue> {
        match name {
            "name" => Some(FilterValue::Text(self.name.clone())),
            "email" => Some(FilterValue::Text(self.email.clone())),
            "role" => Some(FilterValue::Text(self.role.as_str().to_string())),
            "createdAt" => Some(FilterValue::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

fn user_from_row(row: &PgRow) -> StorageResult<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse().map_err(StorageError::Internal)?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_unique_violation(e: sqlx::Error, email: &str) -> StorageError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return StorageError::DuplicateEmail(email.to_string());
        }
    }
    StorageError::Database(e)
}

/// PostgreSQL implementation of UserStore
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize database schema for users
    pub async fn initialize(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) UNIQUE NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(16) NOT NULL DEFAULT 'user'
                    CHECK (role IN ('user', 'employer', 'admin')),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn create_user(&self, user: CreateUser) -> StorageResult<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &user.email))?;

        user_from_row(&row)
    }

    async fn get_user(&self, id: Uuid) -> StorageResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::UserNotFound(id.to_string()))?;

        user_from_row(&row)
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::UserNotFound(email.to_string()))?;

        user_from_row(&row)
    }

    async fn list_users(&self, query: &ListQuery) -> StorageResult<Vec<User>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        query.push_sql(&mut qb);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> StorageResult<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name), email = COALESCE($3, email)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, email.unwrap_or_default()))?
        .ok_or_else(|| StorageError::UserNotFound(id.to_string()))?;

        user_from_row(&row)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StorageResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotFound(id.to_string()));
        }

        Ok(())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StorageResult<()> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotFound(id.to_string()));
        }

        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotFound(id.to_string()));
        }

        Ok(())
    }
}
