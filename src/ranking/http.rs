use super::{RankingConfig, RankingService};
use crate::deck::Rank;
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RankBody<'a> {
    user_id: Option<&'a str>,
}

/// `POST {base_url}/rankings/{item_id}/{rank}` with `{"userId": ...}`
#[derive(Debug, Clone)]
pub struct HttpRankingService {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpRankingService {
    pub fn new(base_url: &str, timeout: Duration) -> ServiceResult<Self> {
        Self::with_client(base_url, crate::net::client(timeout)?)
    }

    pub fn from_config(config: &RankingConfig) -> ServiceResult<Self> {
        Self::new(&config.base_url, Duration::from_millis(config.timeout_ms))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> ServiceResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ServiceError::Request(format!("bad ranking url {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Request(format!("bad ranking url {:?}", base_url.as_str())));
        }
        Ok(Self { base_url, client })
    }

    /// Item ids are pushed as a single escaped path segment
    pub fn endpoint(&self, item_id: &str, rank: Rank) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("rankings")
                .push(item_id)
                .push(&rank.to_string());
        }
        url
    }
}

#[async_trait]
impl RankingService for HttpRankingService {
    async fn submit_rank(&self, item_id: &str, rank: Rank, user_id: Option<&str>) -> ServiceResult<()> {
        self.client
            .post(self.endpoint(item_id, rank))
            .json(&RankBody { user_id })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
