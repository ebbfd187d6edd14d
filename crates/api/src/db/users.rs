//! Account repository: users, group memberships and API tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use zebrands_core::{Email, Role, RoleSet, UserId};

use super::{RepositoryError, UserStore, conflict_on_unique};
use crate::models::{NewUser, User, UserChanges};

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

/// Select users with their group names folded into one array column.
/// `{extra}` adds columns, `{filter}` is the `WHERE` clause.
fn user_query(extra: &str, filter: &str) -> String {
    format!(
        r#"
        SELECT u.id, u.username, u.email, u.first_name, u.last_name,
               u.created_at, u.updated_at{extra},
               COALESCE(
                   array_agg(g.name::TEXT) FILTER (WHERE g.name IS NOT NULL),
                   '{{}}'::TEXT[]
               ) AS groups
        FROM account."user" u
        LEFT JOIN account.user_group ug ON ug.user_id = u.id
        LEFT JOIN account."group" g ON g.id = ug.group_id
        WHERE {filter}
        GROUP BY u.id
        ORDER BY u.id
        "#
    )
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    groups: Vec<String>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        // Groups outside the fixed set carry no permissions.
        let roles = row
            .groups
            .iter()
            .filter_map(|name| Role::from_group_name(name))
            .collect();

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            roles,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` account storage.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&user_query("", "u.username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_token(&self, key: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&user_query(
            "",
            "u.id = (SELECT t.user_id FROM account.token t WHERE t.key = $1)",
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(&user_query(
            ", u.password_hash",
            "u.username = $1",
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Ok::<_, RepositoryError>((User::try_from(row.user)?, row.password_hash)))
            .transpose()
    }

    async fn create(
        &self,
        user: &NewUser,
        password_hash: &str,
        roles: RoleSet,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO account."user" (username, email, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(user.email.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_USERNAME))?;

        for role in roles.iter() {
            let granted = sqlx::query(
                r#"
                INSERT INTO account.user_group (user_id, group_id)
                SELECT $1, id FROM account."group" WHERE name = $2
                "#,
            )
            .bind(id)
            .bind(role.group_name())
            .execute(&mut *tx)
            .await?;

            // Dropping the transaction rolls the insert back.
            if granted.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }

        tx.commit().await?;

        self.get_by_username(&user.username)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(
        &self,
        username: &str,
        changes: &UserChanges,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE account."user"
            SET email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE username = $1
            "#,
        )
        .bind(username)
        .bind(changes.email.as_ref().map(Email::as_str))
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_username(username).await
    }

    async fn delete(&self, username: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(r#"DELETE FROM account."user" WHERE username = $1"#)
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn group_exists(&self, role: Role) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM account."group" WHERE name = $1)"#,
        )
        .bind(role.group_name())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_group_members(&self, role: Role) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&user_query(
            "",
            r#"u.id IN (
                SELECT m.user_id FROM account.user_group m
                JOIN account."group" mg ON mg.id = m.group_id
                WHERE mg.name = $1
            )"#,
        ))
        .bind(role.group_name())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_or_create_token(
        &self,
        user_id: UserId,
        candidate: &str,
    ) -> Result<String, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO account.token (key, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(candidate)
        .bind(user_id.as_i64())
        .execute(&self.pool)
        .await?;

        let key: String = sqlx::query_scalar("SELECT key FROM account.token WHERE user_id = $1")
            .bind(user_id.as_i64())
            .fetch_one(&self.pool)
            .await?;

        Ok(key)
    }

    async fn ensure_groups(&self) -> Result<u64, RepositoryError> {
        let mut created = 0;
        for role in Role::ALL {
            let result = sqlx::query(
                r#"INSERT INTO account."group" (name) VALUES ($1) ON CONFLICT (name) DO NOTHING"#,
            )
            .bind(role.group_name())
            .execute(&self.pool)
            .await?;
            created += result.rows_affected();
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_query_interpolates_clauses() {
        let sql = user_query(", u.password_hash", "u.username = $1");
        assert!(sql.contains("u.updated_at, u.password_hash,"));
        assert!(sql.contains("WHERE u.username = $1"));
        assert!(sql.contains("'{}'::TEXT[]"));
    }
}
