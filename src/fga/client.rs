//! Authorization store client.
//!
//! Translates group-membership intent into tuple-store operations, hiding
//! the store's pagination and idempotency quirks from the provisioning
//! engine. The store's write call is not idempotent (a duplicate write is an
//! error, not a no-op), so idempotency is enforced on this side with
//! existence pre-checks.

use async_trait::async_trait;
use uuid::Uuid;

use super::error::{FgaError, FgaResult};
use super::types::{
    GROUP_OBJECT_KIND, ReadRequest, ReadResponse, TupleKey, TupleKeys, WriteRequest,
};

/// Membership facts in the authorization store.
///
/// Stateless facade over a shared HTTP client; safe for concurrent use by
/// multiple requests. Every error from the store propagates verbatim so the
/// provisioning engine can abort and roll back the relational half.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Single-page read of all tuples where the subject is the given user
    /// and the object is of the given kind.
    async fn user_tuples(&self, user_id: Uuid, object_kind: &str) -> FgaResult<Vec<TupleKey>>;

    /// Whether a (user, "member", group) tuple exists.
    async fn user_in_group(&self, user_id: Uuid, group_id: Uuid) -> FgaResult<bool>;

    /// Add the given users to a group. Users already present are skipped;
    /// the remainder is written in one batch. No write call is made when
    /// every candidate already exists.
    async fn add_users_to_group(&self, user_ids: &[Uuid], group_id: Uuid) -> FgaResult<()>;

    /// Remove one user from a group. A no-op when the tuple is confirmed
    /// absent; the delete is only issued when it is present.
    async fn remove_user_from_group(&self, user_id: Uuid, group_id: Uuid) -> FgaResult<()>;

    /// Remove every member tuple of a group, paging through the store until
    /// it reports no further pages.
    async fn remove_all_users_in_group(&self, group_id: Uuid) -> FgaResult<()>;

    /// Remove every tuple referencing the given user, one batched delete per
    /// object kind. Kinds with no tuples are skipped without an API call.
    async fn remove_user(&self, user_id: Uuid) -> FgaResult<()>;

    /// Replace a group's membership with the given set. Not atomic: the
    /// group is transiently empty between the removal and the add.
    async fn replace_users_in_group(&self, user_ids: &[Uuid], group_id: Uuid) -> FgaResult<()>;
}

/// [`Authorizer`] over the OpenFGA HTTP API.
#[derive(Clone)]
pub struct OpenFgaClient {
    http: reqwest::Client,
    api_url: String,
    store_id: String,
}

impl OpenFgaClient {
    pub fn new(api_url: impl Into<String>, store_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            store_id: store_id.into(),
        }
    }

    async fn read(
        &self,
        tuple_key: TupleKey,
        continuation_token: Option<String>,
    ) -> FgaResult<ReadResponse> {
        let url = format!("{}/stores/{}/read", self.api_url, self.store_id);
        let response = self
            .http
            .post(&url)
            .json(&ReadRequest {
                tuple_key,
                continuation_token,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FgaError::Api {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    async fn write(&self, body: &WriteRequest) -> FgaResult<()> {
        let url = format!("{}/stores/{}/write", self.api_url, self.store_id);
        let response = self.http.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FgaError::Api {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Authorizer for OpenFgaClient {
    async fn user_tuples(&self, user_id: Uuid, object_kind: &str) -> FgaResult<Vec<TupleKey>> {
        let response = self
            .read(TupleKey::user_on_kind(user_id, object_kind), None)
            .await?;

        Ok(response.tuples.into_iter().map(|t| t.key).collect())
    }

    async fn user_in_group(&self, user_id: Uuid, group_id: Uuid) -> FgaResult<bool> {
        let response = self
            .read(TupleKey::membership(user_id, group_id), None)
            .await?;

        Ok(!response.tuples.is_empty())
    }

    async fn add_users_to_group(&self, user_ids: &[Uuid], group_id: Uuid) -> FgaResult<()> {
        let mut new_tuples = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if self.user_in_group(*user_id, group_id).await? {
                continue;
            }
            new_tuples.push(TupleKey::membership(*user_id, group_id));
        }

        if new_tuples.is_empty() {
            tracing::debug!(%group_id, "all candidate members already present, skipping write");
            return Ok(());
        }

        self.write(&WriteRequest {
            writes: Some(TupleKeys {
                tuple_keys: new_tuples,
            }),
            deletes: None,
        })
        .await
    }

    async fn remove_user_from_group(&self, user_id: Uuid, group_id: Uuid) -> FgaResult<()> {
        if !self.user_in_group(user_id, group_id).await? {
            return Ok(());
        }

        self.write(&WriteRequest {
            writes: None,
            deletes: Some(TupleKeys {
                tuple_keys: vec![TupleKey::membership(user_id, group_id)],
            }),
        })
        .await
    }

    async fn remove_all_users_in_group(&self, group_id: Uuid) -> FgaResult<()> {
        let mut token: Option<String> = None;

        loop {
            let response = self
                .read(TupleKey::group_members(group_id), token.clone())
                .await?;

            for tuple in &response.tuples {
                let user = tuple
                    .key
                    .user
                    .as_deref()
                    .ok_or_else(|| FgaError::MalformedTuple("tuple without a user".into()))?;
                let user_id = Uuid::parse_str(user)
                    .map_err(|_| FgaError::MalformedTuple(format!("bad user id '{user}'")))?;

                self.remove_user_from_group(user_id, group_id).await?;
            }

            let next = response.continuation_token.filter(|t| !t.is_empty());
            match next {
                None => break,
                // A store echoing the token it was just given would never
                // make progress; treat it as the end of the stream.
                Some(next) if token.as_deref() == Some(next.as_str()) => break,
                Some(next) => token = Some(next),
            }
        }

        Ok(())
    }

    async fn remove_user(&self, user_id: Uuid) -> FgaResult<()> {
        for object_kind in [GROUP_OBJECT_KIND] {
            let tuples = self.user_tuples(user_id, object_kind).await?;
            if tuples.is_empty() {
                continue;
            }

            self.write(&WriteRequest {
                writes: None,
                deletes: Some(TupleKeys { tuple_keys: tuples }),
            })
            .await?;
        }

        Ok(())
    }

    async fn replace_users_in_group(&self, user_ids: &[Uuid], group_id: Uuid) -> FgaResult<()> {
        self.remove_all_users_in_group(group_id).await?;
        self.add_users_to_group(user_ids, group_id).await
    }
}
