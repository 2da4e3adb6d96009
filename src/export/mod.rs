// Export - turns the liked list into a playlist on the user's streaming account
// Profile -> create collection -> add tracks, strictly in that order

use crate::deck::RankedItem;
use crate::error::{ExportError, ServiceResult};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Playlist name is "{prefix} {suffix}", suffix comes from the user
    pub name_prefix: String,
    pub description: String,
    pub public: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            name_prefix: "Ranked".to_string(),
            description: "Tracks I swiped right on".to_string(),
            public: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// The external account a playlist gets created on
#[async_trait]
pub trait CollectionApi: Send + Sync {
    async fn get_profile(&self) -> ServiceResult<Profile>;

    /// Returns the new collection's id
    async fn create_collection(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> ServiceResult<String>;

    async fn add_entries(&self, collection_id: &str, uris: &[String]) -> ServiceResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub collection_id: String,
    pub name: String,
    pub exported: usize,
    /// Liked cards without a usable track link
    pub skipped: usize,
}

fn track_link_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^(?:https?://open\.spotify\.com/(?:intl-[a-z]{2}(?:-[a-z]{2})?/)?track/|spotify:track:)([A-Za-z0-9]+)(?:[/?#].*)?$").ok()
        })
        .as_ref()
}

/// Pull a `spotify:track:{id}` uri out of a card's external link
pub fn track_uri(external_url: &str) -> Option<String> {
    let caps = track_link_pattern()?.captures(external_url.trim())?;
    caps.get(1)
        .map(|id| format!("spotify:track:{}", id.as_str()))
}

pub struct PlaylistExporter {
    api: Arc<dyn CollectionApi>,
    config: ExportConfig,
}

impl PlaylistExporter {
    pub fn new(api: Arc<dyn CollectionApi>, config: ExportConfig) -> Self {
        Self { api, config }
    }

    pub fn collection_name(&self, suffix: &str) -> String {
        format!("{} {}", self.config.name_prefix, suffix.trim())
    }

    /// Run the whole pipeline over a snapshot of the liked list. The first
    /// failing step aborts everything after it.
    pub async fn export(&self, liked: Vec<RankedItem>, suffix: &str) -> Result<ExportReport, ExportError> {
        if suffix.trim().is_empty() {
            return Err(ExportError::MissingName);
        }

        let profile = self.api.get_profile().await.map_err(ExportError::Profile)?;
        debug!("Exporting for profile {}", profile.id);

        let name = self.collection_name(suffix);
        let description = format!(
            "{} - {}",
            self.config.description,
            chrono::Local::now().format("%Y-%m-%d")
        );
        let collection_id = self
            .api
            .create_collection(&profile.id, &name, &description, self.config.public)
            .await
            .map_err(ExportError::CreateCollection)?;
        info!("Created collection '{}' ({})", name, collection_id);

        let uris: Vec<String> = liked
            .iter()
            .filter_map(|ranked| ranked.item.external_url.as_deref().and_then(track_uri))
            .collect();
        let skipped = liked.len() - uris.len();
        if skipped > 0 {
            warn!("Skipping {} liked items without a track link", skipped);
        }

        if !uris.is_empty() {
            self.api
                .add_entries(&collection_id, &uris)
                .await
                .map_err(ExportError::AddEntries)?;
        }

        info!("Exported {} tracks to '{}'", uris.len(), name);
        Ok(ExportReport {
            collection_id,
            name,
            exported: uris.len(),
            skipped,
        })
    }
}
