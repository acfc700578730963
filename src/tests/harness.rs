//! Test harness for integration testing.
//!
//! Starts one shared PostgreSQL container per test run and hands each test
//! an isolated schema with fresh migrations, plus an in-memory stand-in for
//! the authorization store that honors the [`Authorizer`] contract.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use sqlx::PgPool;
use testcontainers_modules::{
    postgres::Postgres,
    testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner},
};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::fga::{Authorizer, FgaResult, TupleKey};

/// Shared container state, initialized once per test run.
struct SharedContainer {
    #[allow(dead_code)] // Keeps the container alive for the whole run.
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static SHARED_CONTAINER: OnceLock<OnceCell<SharedContainer>> = OnceLock::new();

async fn get_shared_container() -> &'static SharedContainer {
    let cell = SHARED_CONTAINER.get_or_init(OnceCell::new);
    cell.get_or_init(|| async {
        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .expect("Failed to start PostgreSQL container");

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        SharedContainer {
            container,
            connection_string: format!("postgres://postgres:postgres@{host}:{port}/postgres"),
        }
    })
    .await
}

/// Create a pool bound to a fresh, isolated schema with migrations applied.
pub async fn create_migrated_pool() -> PgPool {
    let shared = get_shared_container().await;

    let admin_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&shared.connection_string)
        .await
        .expect("Failed to connect to PostgreSQL");

    let schema_name = format!("test_{}", Uuid::new_v4().simple());
    sqlx::query(&format!("CREATE SCHEMA \"{schema_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test schema");

    let isolated_url = format!(
        "{}?options=-c search_path={}",
        shared.connection_string, schema_name
    );

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&isolated_url)
        .await
        .expect("Failed to connect to isolated schema");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// In-memory [`Authorizer`] honoring the tuple-store contract: add skips
/// existing tuples, remove is a no-op for absent tuples, and removals by
/// group or user delete exactly the matching set.
#[derive(Default)]
pub struct InMemoryAuthorizer {
    tuples: Mutex<HashSet<(Uuid, Uuid)>>,
}

impl InMemoryAuthorizer {
    pub fn members_of(&self, group_id: Uuid) -> HashSet<Uuid> {
        self.tuples
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, group)| *group == group_id)
            .map(|(user, _)| *user)
            .collect()
    }
}

#[async_trait]
impl Authorizer for InMemoryAuthorizer {
    async fn user_tuples(&self, user_id: Uuid, _object_kind: &str) -> FgaResult<Vec<TupleKey>> {
        Ok(self
            .tuples
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(user, group)| TupleKey::membership(*user, *group))
            .collect())
    }

    async fn user_in_group(&self, user_id: Uuid, group_id: Uuid) -> FgaResult<bool> {
        Ok(self.tuples.lock().unwrap().contains(&(user_id, group_id)))
    }

    async fn add_users_to_group(&self, user_ids: &[Uuid], group_id: Uuid) -> FgaResult<()> {
        let mut tuples = self.tuples.lock().unwrap();
        for user_id in user_ids {
            tuples.insert((*user_id, group_id));
        }
        Ok(())
    }

    async fn remove_user_from_group(&self, user_id: Uuid, group_id: Uuid) -> FgaResult<()> {
        self.tuples.lock().unwrap().remove(&(user_id, group_id));
        Ok(())
    }

    async fn remove_all_users_in_group(&self, group_id: Uuid) -> FgaResult<()> {
        self.tuples
            .lock()
            .unwrap()
            .retain(|(_, group)| *group != group_id);
        Ok(())
    }

    async fn remove_user(&self, user_id: Uuid) -> FgaResult<()> {
        self.tuples
            .lock()
            .unwrap()
            .retain(|(user, _)| *user != user_id);
        Ok(())
    }

    async fn replace_users_in_group(&self, user_ids: &[Uuid], group_id: Uuid) -> FgaResult<()> {
        let mut tuples = self.tuples.lock().unwrap();
        tuples.retain(|(_, group)| *group != group_id);
        for user_id in user_ids {
            tuples.insert((*user_id, group_id));
        }
        Ok(())
    }
}
