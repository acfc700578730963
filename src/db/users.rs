//! User queries.

use std::collections::HashMap;

use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use uuid::Uuid;

use super::{
    Repository, RepositoryTx,
    error::{DbError, DbResult},
    models::{User, UserParams},
};
use crate::scim::{Filter, ScimEmail, types::Page};

const USER_COLUMNS: &str =
    "id, username, external_id, name, display_name, locale, active, emails, created_at, updated_at";

fn parse_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        external_id: row.get("external_id"),
        name: row
            .get::<Option<Json<HashMap<String, String>>>, _>("name")
            .map(|j| j.0),
        display_name: row.get("display_name"),
        locale: row.get("locale"),
        active: row.get("active"),
        emails: row.get::<Json<Vec<ScimEmail>>, _>("emails").0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl Repository {
    /// Look up a user by identifier.
    pub async fn find_user(&self, id: Uuid) -> DbResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| parse_user(&r)).ok_or(DbError::NotFound)
    }

    /// Look up a user by username.
    pub async fn find_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| parse_user(&r)))
    }

    /// List users for a SCIM query, returning `(total_count, page)`.
    ///
    /// With a `userName eq` filter this short-circuits to a keyed lookup
    /// yielding zero or one rows; identity providers use that shape to probe
    /// whether a userName already exists before provisioning.
    pub async fn get_scim_users(
        &self,
        filters: &[Filter],
        page: &Page,
    ) -> DbResult<(i64, Vec<User>)> {
        if let Some(filter) = filters.first() {
            return match self.find_user_by_username(&filter.value).await? {
                Some(user) => Ok((1, vec![user])),
                None => Ok((0, Vec::new())),
            };
        }

        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM users")
            .fetch_one(self.pool())
            .await?
            .get("count");

        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC \
             LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;

        Ok((total, rows.iter().map(parse_user).collect()))
    }

    /// Replace a user's attributes (SCIM PUT semantics).
    pub async fn update_user(&self, id: Uuid, params: UserParams) -> DbResult<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                username = $1, external_id = $2, name = $3, display_name = $4,
                locale = $5, active = $6, emails = $7, updated_at = NOW()
            WHERE id = $8
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&params.username)
        .bind(&params.external_id)
        .bind(params.name.as_ref().map(Json))
        .bind(&params.display_name)
        .bind(&params.locale)
        .bind(params.active)
        .bind(Json(&params.emails))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_username_conflict)?;

        row.map(|r| parse_user(&r)).ok_or(DbError::NotFound)
    }

    /// Set a user's active flag (SCIM PATCH of `active`).
    pub async fn patch_user_active(&self, id: Uuid, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE users SET active = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(active)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

impl RepositoryTx {
    /// Insert a new user. A duplicate username maps to [`DbError::Conflict`];
    /// it is never silently overwritten.
    pub async fn create_user(&mut self, params: UserParams) -> DbResult<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, username, external_id, name, display_name, locale, active, emails)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&params.username)
        .bind(&params.external_id)
        .bind(params.name.as_ref().map(Json))
        .bind(&params.display_name)
        .bind(&params.locale)
        .bind(params.active)
        .bind(Json(&params.emails))
        .fetch_one(self.executor())
        .await
        .map_err(map_username_conflict)?;

        Ok(parse_user(&row))
    }

    /// Delete a user row. Membership rows are removed by cascade.
    pub async fn delete_user(&mut self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.executor())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

fn map_username_conflict(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::Conflict("user with this userName already exists".into())
        }
        _ => DbError::from(e),
    }
}
