//! Group and membership queries.

use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::{
    Repository, RepositoryTx,
    error::{DbError, DbResult},
    models::{Group, GroupMember},
};
use crate::scim::types::Page;

const GROUP_COLUMNS: &str = "id, display_name, created_at, updated_at";

fn parse_group(row: &PgRow) -> Group {
    Group {
        id: row.get("id"),
        display_name: row.get("display_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl Repository {
    /// Look up a group by identifier.
    pub async fn find_group(&self, id: Uuid) -> DbResult<Group> {
        let row = sqlx::query(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| parse_group(&r)).ok_or(DbError::NotFound)
    }

    /// Insert a new group.
    pub async fn create_group(&self, display_name: &str) -> DbResult<Group> {
        let row = sqlx::query(&format!(
            "INSERT INTO groups (id, display_name) VALUES ($1, $2) RETURNING {GROUP_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(display_name)
        .fetch_one(self.pool())
        .await?;

        Ok(parse_group(&row))
    }

    /// List groups, returning `(total_count, page)`.
    pub async fn get_groups(&self, page: &Page) -> DbResult<(i64, Vec<Group>)> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM groups")
            .fetch_one(self.pool())
            .await?
            .get("count");

        let rows = sqlx::query(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups ORDER BY created_at ASC, id ASC \
             LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;

        Ok((total, rows.iter().map(parse_group).collect()))
    }

    /// Read a group's membership projection, with usernames joined in for
    /// display.
    pub async fn get_group_membership(&self, group_id: Uuid) -> DbResult<Vec<GroupMember>> {
        let rows = sqlx::query(
            r#"
            SELECT m.group_id, m.user_id, u.username
            FROM group_membership m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1
            ORDER BY u.username ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| GroupMember {
                group_id: row.get("group_id"),
                user_id: row.get("user_id"),
                username: row.get("username"),
            })
            .collect())
    }
}

impl RepositoryTx {
    /// Update a group's display name.
    pub async fn patch_group_display_name(
        &mut self,
        id: Uuid,
        display_name: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE groups SET display_name = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(display_name)
        .bind(id)
        .execute(self.executor())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    /// Delete a group row. Membership rows are removed by cascade.
    pub async fn delete_group(&mut self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(self.executor())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    /// Insert membership rows for the given users.
    ///
    /// Re-adding an existing member is a no-op, keeping this side of the dual
    /// write idempotent like the authorization side.
    pub async fn add_users_to_group(
        &mut self,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> DbResult<()> {
        for user_id in user_ids {
            sqlx::query(
                r#"
                INSERT INTO group_membership (group_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (group_id, user_id) DO NOTHING
                "#,
            )
            .bind(group_id)
            .bind(user_id)
            .execute(self.executor())
            .await?;
        }

        Ok(())
    }

    /// Remove one membership row. Absent rows are a no-op.
    pub async fn remove_user_from_group(
        &mut self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM group_membership WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(self.executor())
            .await?;

        Ok(())
    }

    /// Replace a group's full membership set.
    pub async fn replace_users_in_group(
        &mut self,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM group_membership WHERE group_id = $1")
            .bind(group_id)
            .execute(self.executor())
            .await?;

        self.add_users_to_group(group_id, user_ids).await
    }
}
