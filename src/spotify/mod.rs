// Spotify Web API - just the three calls playlist export needs
// Token acquisition lives outside this crate; we're handed a bearer token

use crate::error::{ServiceError, ServiceResult};
use crate::export::{CollectionApi, Profile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub api_base: String,
    /// Falls back to the SPOTIFY_ACCESS_TOKEN environment variable
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    15_000
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            access_token: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SpotifyConfig {
    pub fn resolve_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .or_else(|| std::env::var("SPOTIFY_ACCESS_TOKEN").ok())
            .filter(|token| !token.trim().is_empty())
    }
}

/// Stand-in when no token is configured: every export fails at the first step
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingToken;

impl MissingToken {
    fn error() -> ServiceError {
        ServiceError::Request("no Spotify access token configured".to_string())
    }
}

#[async_trait]
impl CollectionApi for MissingToken {
    async fn get_profile(&self) -> ServiceResult<Profile> {
        Err(Self::error())
    }

    async fn create_collection(&self, _: &str, _: &str, _: &str, _: bool) -> ServiceResult<String> {
        Err(Self::error())
    }

    async fn add_entries(&self, _: &str, _: &[String]) -> ServiceResult<()> {
        Err(Self::error())
    }
}

#[cfg(feature = "http")]
pub use client::SpotifyClient;

#[cfg(feature = "http")]
mod client {
    use super::SpotifyConfig;
    use crate::error::ServiceResult;
    use std::time::Duration;
    use crate::export::{CollectionApi, Profile};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use tracing::debug;

    #[derive(Debug, Serialize)]
    struct CreatePlaylist<'a> {
        name: &'a str,
        description: &'a str,
        public: bool,
    }

    #[derive(Debug, Deserialize)]
    struct Created {
        id: String,
    }

    #[derive(Debug, Serialize)]
    struct AddTracks<'a> {
        uris: &'a [String],
    }

    #[derive(Debug, Clone)]
    pub struct SpotifyClient {
        api_base: String,
        access_token: String,
        http: reqwest::Client,
    }

    impl SpotifyClient {
        pub fn new(
            api_base: impl Into<String>,
            access_token: impl Into<String>,
            timeout: Duration,
        ) -> ServiceResult<Self> {
            Ok(Self {
                api_base: api_base.into().trim_end_matches('/').to_string(),
                access_token: access_token.into(),
                http: crate::net::client(timeout)?,
            })
        }

        /// Ok(None) when no token is configured anywhere
        pub fn from_config(config: &SpotifyConfig) -> ServiceResult<Option<Self>> {
            config
                .resolve_token()
                .map(|token| {
                    Self::new(
                        config.api_base.clone(),
                        token,
                        Duration::from_millis(config.timeout_ms),
                    )
                })
                .transpose()
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.api_base, path)
        }
    }

    #[async_trait]
    impl CollectionApi for SpotifyClient {
        async fn get_profile(&self) -> ServiceResult<Profile> {
            let profile = self
                .http
                .get(self.url("/me"))
                .bearer_auth(&self.access_token)
                .send()
                .await?
                .error_for_status()?
                .json::<Profile>()
                .await?;
            debug!("Spotify profile: {}", profile.id);
            Ok(profile)
        }

        async fn create_collection(
            &self,
            owner_id: &str,
            name: &str,
            description: &str,
            public: bool,
        ) -> ServiceResult<String> {
            let created = self
                .http
                .post(self.url(&format!("/users/{}/playlists", owner_id)))
                .bearer_auth(&self.access_token)
                .json(&CreatePlaylist {
                    name,
                    description,
                    public,
                })
                .send()
                .await?
                .error_for_status()?
                .json::<Created>()
                .await?;
            Ok(created.id)
        }

        async fn add_entries(&self, collection_id: &str, uris: &[String]) -> ServiceResult<()> {
            self.http
                .post(self.url(&format!("/playlists/{}/tracks", collection_id)))
                .bearer_auth(&self.access_token)
                .json(&AddTracks { uris })
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        }
    }

}
