//! Remote store client speaking the backend's PostgREST-style API.
//!
//! Every table is exposed under `/rest/v1/<table>` with `column=op.value`
//! filters. Writes that must be idempotent go through upserts with
//! `Prefer: resolution=merge-duplicates` and an `on_conflict` key list.

use std::env;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::repository::StorageError;

mod repos;
mod rows;

/// Connection parameters for the remote store.
#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
    /// Per-user access token; falls back to the API key when absent
    /// (anonymous, read-only access).
    pub auth_token: Option<String>,
}

impl RestConfig {
    /// Reads configuration from the environment. Returns `None` when the
    /// store is not configured, which callers treat as cache-only operation.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("KDS_SUPABASE_URL").ok()?;
        let api_key = env::var("KDS_SUPABASE_ANON_KEY").ok()?;
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return None;
        }
        let auth_token = env::var("KDS_SUPABASE_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Some(Self {
            base_url,
            api_key,
            auth_token,
        })
    }
}

/// Remote store client. Cheap to clone; the underlying HTTP client pools
/// connections.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    config: RestConfig,
}

impl RestStore {
    #[must_use]
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{table}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn headers(&self) -> Result<HeaderMap, StorageError> {
        let mut headers = HeaderMap::new();
        let token = self
            .config
            .auth_token
            .as_deref()
            .unwrap_or(&self.config.api_key);
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|e| StorageError::Connection(e.to_string()))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| StorageError::Connection(e.to_string()))?,
        );
        Ok(headers)
    }

    async fn check(table: &str, response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(StorageError::Conflict);
        }
        if !status.is_success() {
            debug!(table, %status, "remote store request failed");
            return Err(StorageError::Connection(format!(
                "{table}: http status {status}"
            )));
        }
        Ok(response)
    }

    pub(super) async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StorageError> {
        let response = self
            .client
            .get(self.endpoint(table))
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let response = Self::check(table, response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub(super) async fn insert<B: Serialize + ?Sized>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .post(self.endpoint(table))
            .headers(self.headers()?)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Self::check(table, response).await?;
        Ok(())
    }

    pub(super) async fn upsert<B: Serialize + ?Sized>(
        &self,
        table: &str,
        on_conflict: &str,
        body: &B,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .post(self.endpoint(table))
            .headers(self.headers()?)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Self::check(table, response).await?;
        Ok(())
    }
}

/// Formats a PostgREST `in.(...)` filter over ids.
pub(super) fn in_filter<I: IntoIterator<Item = impl ToString>>(ids: I) -> String {
    let list: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
    format!("in.({})", list.join(","))
}
