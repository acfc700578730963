//! API key queries.
//!
//! One row in `scim_api_keys` designates the active SCIM credential. At most
//! one such row exists at a time; rotation is delete-before-insert inside a
//! single transaction.

use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::{
    Repository, RepositoryTx,
    error::DbResult,
    models::{ApiKey, InsertApiKeyParams},
};

const API_KEY_COLUMNS: &str =
    "id, encoded_hash, owner, system, description, created_at, updated_at";

fn parse_api_key(row: &PgRow) -> ApiKey {
    ApiKey {
        id: row.get("id"),
        encoded_hash: row.get("encoded_hash"),
        owner: row.get("owner"),
        system: row.get("system"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl Repository {
    /// Find the designated SCIM API key, if one is configured.
    ///
    /// A missing row is not an error at this layer; the caller maps "no
    /// credential" to "unauthenticated".
    pub async fn find_scim_api_key(&self) -> DbResult<Option<ApiKey>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {API_KEY_COLUMNS}
            FROM api_keys
            WHERE id = (SELECT api_key_id FROM scim_api_keys)
            "#
        ))
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| parse_api_key(&r)))
    }
}

impl RepositoryTx {
    /// Insert an API key row.
    pub async fn insert_api_key(&mut self, params: InsertApiKeyParams) -> DbResult<ApiKey> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO api_keys (id, encoded_hash, owner, system, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {API_KEY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&params.encoded_hash)
        .bind(&params.owner)
        .bind(params.system)
        .bind(&params.description)
        .fetch_one(self.executor())
        .await?;

        Ok(parse_api_key(&row))
    }

    /// Remove the current SCIM API key designation and its backing key row,
    /// if any.
    pub async fn delete_scim_api_key(&mut self) -> DbResult<()> {
        // Deleting the api_keys row cascades to scim_api_keys.
        sqlx::query("DELETE FROM api_keys WHERE id IN (SELECT api_key_id FROM scim_api_keys)")
            .execute(self.executor())
            .await?;

        Ok(())
    }

    /// Insert a new SCIM API key and designate it as the active credential.
    ///
    /// Call [`RepositoryTx::delete_scim_api_key`] first; the singleton
    /// constraint on `scim_api_keys` rejects a second designation.
    pub async fn insert_scim_api_key(&mut self, encoded_hash: String) -> DbResult<ApiKey> {
        let api_key = self
            .insert_api_key(InsertApiKeyParams {
                encoded_hash,
                owner: "SCIM".to_string(),
                system: true,
                description: Some("SCIM API key".to_string()),
            })
            .await?;

        sqlx::query("INSERT INTO scim_api_keys (api_key_id) VALUES ($1)")
            .bind(api_key.id)
            .execute(self.executor())
            .await?;

        Ok(api_key)
    }
}
