use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::user::{User, UserStatus};
use chrono::{DateTime, Utc};

/// Storage for user accounts. Handlers receive it as injected state so tests can swap in
/// an in-memory implementation.
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new active user. Fails with [`AppError::EmailAlreadyExists`] when the email is taken.
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn get_user_by_id(&self, id: i32) -> Result<Option<User>, AppError>;
    /// All users, most recent login first; users that never logged in come last.
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn record_login(&self, id: i32) -> Result<(), AppError>;
    /// Returns the number of rows touched. Unknown ids are ignored.
    async fn set_status(&self, ids: &[i32], status: UserStatus) -> Result<u64, AppError>;
    async fn delete_users(&self, ids: &[i32]) -> Result<u64, AppError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    password: String,
    status: String,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let status = UserStatus::parse(&row.status).ok_or_else(|| AppError::CorruptRecord(format!("user {} has unknown status '{}'", row.id, row.status)))?;

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password,
            status,
            last_login: row.last_login,
        })
    }
}

#[async_trait::async_trait]
impl UserRepository for PostgresRepository {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password, status, last_login
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db_err| db_err.is_unique_violation()) {
                AppError::EmailAlreadyExists
            } else {
                AppError::db("Error creating user", e)
            }
        })?;

        row.try_into()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password, status, last_login
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_user_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password, status, last_login
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password, status, last_login
            FROM users
            ORDER BY last_login DESC NULLS LAST, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn record_login(&self, id: i32) -> Result<(), AppError> {
        // GREATEST keeps last_login from moving backwards if the clock does.
        sqlx::query("UPDATE users SET last_login = GREATEST(COALESCE(last_login, now()), now()) WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::db("Failed to update last login", e))?;

        Ok(())
    }

    async fn set_status(&self, ids: &[i32], status: UserStatus) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE users SET status = $1 WHERE id = ANY($2)")
            .bind(status.as_str())
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let message = match status {
                    UserStatus::Blocked => "Failed to block users",
                    UserStatus::Active => "Failed to unblock users",
                };
                AppError::db(message, e)
            })?;

        Ok(result.rows_affected())
    }

    async fn delete_users(&self, ids: &[i32]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::db("Error deleting users", e))?;

        Ok(result.rows_affected())
    }
}
