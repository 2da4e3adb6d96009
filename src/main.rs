// rankdeck - terminal host for a swipe-to-rank session
// Loads a deck of tracks, wires up the real services, hands control to the TUI

use anyhow::{Context, Result};
use clap::Parser;
use rand::seq::SliceRandom;
use rankdeck::{
    audio::{AudioBackend, NoOutputDevice, RodioBackend},
    config::Config,
    engine::{EngineServices, EngineSettings},
    export::CollectionApi,
    logging::init_logging,
    ranking::{HttpRankingService, MemoryIdentityStore},
    spotify::{MissingToken, SpotifyClient},
    ui::App,
    Friend, Item,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rankdeck")]
#[command(about = "Swipe through a deck of tracks, rank the ones you like, export them as a playlist")]
struct Args {
    /// JSON array of cards to rank
    #[arg(long)]
    deck: PathBuf,

    /// JSON array of friends, used to show who shared a card
    #[arg(long)]
    friends: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the gesture screen width
    #[arg(long)]
    width: Option<f64>,

    /// Shuffle the deck before starting
    #[arg(long)]
    shuffle: bool,

    /// Enable developer logging (stderr + debug output)
    #[arg(long)]
    dev: bool,
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {:?}", path))
}

/// No device (headless box, no ALSA/Pulse) still gives a working session,
/// just without previews
fn open_audio(config: &Config) -> (Option<rodio::OutputStream>, Arc<dyn AudioBackend>) {
    let unavailable = |reason: String| -> (Option<rodio::OutputStream>, Arc<dyn AudioBackend>) {
        warn!("Audio output unavailable, previews disabled: {}", reason);
        (None, Arc::new(NoOutputDevice { reason }))
    };

    match rodio::OutputStream::try_default() {
        Ok((stream, handle)) => match RodioBackend::new(handle, config.audio.clone()) {
            Ok(backend) => (Some(stream), Arc::new(backend)),
            Err(e) => unavailable(e.to_string()),
        },
        Err(e) => unavailable(e.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(width) = args.width {
        config.gesture.screen_width = width;
    }

    let _log_guard = init_logging(&config.logging, args.dev)?;
    info!("rankdeck starting up");

    let mut items: Vec<Item> = load_json(&args.deck)?;
    if args.shuffle {
        items.shuffle(&mut rand::thread_rng());
    }
    let friends: Vec<Friend> = match &args.friends {
        Some(path) => load_json(path)?,
        None => Vec::new(),
    };
    info!("Loaded {} cards, {} friends", items.len(), friends.len());

    // OutputStream isn't Send; it has to outlive the app right here
    let (_stream, audio) = open_audio(&config);

    let identity = MemoryIdentityStore::new();
    if let Some(user_id) = &config.user_id {
        identity.set(config.ranking.user_id_key.clone(), user_id.clone());
    }

    let collections: Arc<dyn CollectionApi> = match SpotifyClient::from_config(&config.spotify)? {
        Some(client) => Arc::new(client),
        None => {
            warn!("No Spotify access token configured, playlist export will fail");
            Arc::new(MissingToken)
        }
    };

    let services = EngineServices {
        audio,
        identity: Arc::new(identity),
        ranking: Arc::new(HttpRankingService::from_config(&config.ranking)?),
        collections,
    };
    let settings = EngineSettings::from(config);

    let mut app = App::new(items, friends, services, settings)?;
    app.run().await?;

    Ok(())
}
