// Rank submission - tells the ranking service what the user thought of a card
// Fire-and-forget: the deck never waits on this, failures only get logged

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpRankingService;

use crate::deck::Rank;
use crate::error::ServiceResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub base_url: String,
    /// Identity store key holding the current user's id
    pub user_id_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            user_id_key: "userId".to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Async key/value lookup owned by the host (session storage, keychain, ...)
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get(&self, key: &str) -> ServiceResult<Option<String>>;
}

#[async_trait]
pub trait RankingService: Send + Sync {
    async fn submit_rank(&self, item_id: &str, rank: Rank, user_id: Option<&str>) -> ServiceResult<()>;
}

/// Identity store backed by a plain map, filled in by the host at startup
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(key, value);
        store
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.into(), value.into());
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get(&self, key: &str) -> ServiceResult<Option<String>> {
        Ok(self
            .values
            .read()
            .ok()
            .and_then(|values| values.get(key).cloned()))
    }
}

/// One accepted card's ranking, captured by value when the decision is made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankSubmission {
    pub item_id: String,
    pub rank: Rank,
}

#[derive(Clone)]
pub struct RankSubmitter {
    identity: Arc<dyn IdentityStore>,
    service: Arc<dyn RankingService>,
    user_id_key: String,
}

impl RankSubmitter {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        service: Arc<dyn RankingService>,
        user_id_key: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            service,
            user_id_key: user_id_key.into(),
        }
    }

    /// Spawn the submission and return immediately. The returned handle can
    /// be awaited, or dropped to let the call finish in the background.
    pub fn submit(&self, submission: RankSubmission) -> JoinHandle<()> {
        let submitter = self.clone();
        tokio::spawn(async move { submitter.run(submission).await })
    }

    async fn run(&self, submission: RankSubmission) {
        let RankSubmission { item_id, rank } = submission;

        let user_id = match self.identity.get(&self.user_id_key).await {
            Ok(user_id) => user_id,
            Err(e) => {
                warn!("Could not read {} from identity store: {}", self.user_id_key, e);
                None
            }
        };
        if user_id.is_none() {
            debug!("Submitting rank for {} without a user id", item_id);
        }

        match self
            .service
            .submit_rank(&item_id, rank, user_id.as_deref())
            .await
        {
            Ok(()) => info!("Submitted rank {} for item {}", rank, item_id),
            Err(e) => warn!("Rank submission for item {} failed: {}", item_id, e),
        }
    }
}
