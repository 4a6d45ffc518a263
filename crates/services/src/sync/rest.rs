use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use quiz_core::model::{StateSnapshot, UserId};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::repository::{RemoteDocument, RemoteStateRepository, StorageError};

const TABLE_PATH: &str = "rest/v1/app_state";

/// Upper bound for one remote request, connect to last body byte.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `QUIZ_SYNC_URL` and `QUIZ_SYNC_API_KEY`.
    ///
    /// Returns `None` (sync disabled) unless both are set and non-blank.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup("QUIZ_SYNC_URL").filter(|v| !v.trim().is_empty())?;
        let api_key = lookup("QUIZ_SYNC_API_KEY").filter(|v| !v.trim().is_empty())?;
        Some(Self::new(base_url.trim(), api_key.trim()))
    }

    fn table_url(&self) -> String {
        format!("{}/{TABLE_PATH}", self.base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `RemoteStateRepository` backed by a PostgREST-style `app_state` table.
#[derive(Clone, Debug)]
pub struct RestStateStore {
    client: Client,
    config: RemoteConfig,
}

impl RestStateStore {
    /// Build a store whose requests give up after `config.timeout`.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be initialized.
    pub fn new(config: RemoteConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }
}

#[derive(Debug, Deserialize)]
struct StateRow {
    state: Value,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct UpsertRow<'a> {
    user_id: &'a str,
    state: &'a StateSnapshot,
    updated_at: DateTime<Utc>,
}

fn transport(err: reqwest::Error) -> StorageError {
    StorageError::Connection(err.to_string())
}

fn ensure_success(response: &Response) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(StorageError::Connection(format!(
            "remote store responded with {status}"
        )))
    }
}

#[async_trait]
impl RemoteStateRepository for RestStateStore {
    async fn pull_state(&self, user_id: &UserId) -> Result<Option<RemoteDocument>, StorageError> {
        let filter = format!("eq.{}", user_id.as_str());
        let response = self
            .authorized(self.client.get(self.config.table_url()))
            .query(&[("user_id", filter.as_str()), ("select", "state,updated_at")])
            .send()
            .await
            .map_err(transport)?;
        ensure_success(&response)?;

        let rows: Vec<StateRow> = response
            .json()
            .await
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        debug!("pulled {} state row(s) for {user_id}", rows.len());

        Ok(rows.into_iter().next().map(|row| RemoteDocument {
            state: row.state,
            updated_at: row.updated_at.unwrap_or_default(),
        }))
    }

    async fn push_state(
        &self,
        user_id: &UserId,
        snapshot: &StateSnapshot,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let row = UpsertRow {
            user_id: user_id.as_str(),
            state: snapshot,
            updated_at,
        };
        let response = self
            .authorized(self.client.post(self.config.table_url()))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", "user_id")])
            .json(&row)
            .send()
            .await
            .map_err(transport)?;
        ensure_success(&response)
    }
}
