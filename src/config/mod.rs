// Configuration management for rankdeck
// Handles loading/saving settings, with sensible defaults when config is missing

use crate::audio::AudioConfig;
use crate::export::ExportConfig;
use crate::ranking::RankingConfig;
use crate::spotify::SpotifyConfig;
use crate::transition::TransitionConfig;
use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seeded into the identity store at startup
    pub user_id: Option<String>,
    pub ranking: RankingConfig,
    pub spotify: SpotifyConfig,
    pub gesture: GestureConfig,
    pub transition: TransitionConfig,
    pub audio: AudioConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Width the drag distances are measured against
    pub screen_width: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub filter: String,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self { screen_width: 390.0 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            filter: "info,rankdeck=debug".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: None,
            ranking: RankingConfig::default(),
            spotify: SpotifyConfig::default(),
            gesture: GestureConfig::default(),
            transition: TransitionConfig::default(),
            audio: AudioConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults there on first run
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("rankdeck");

        Ok(config_dir.join("config.toml"))
    }
}
