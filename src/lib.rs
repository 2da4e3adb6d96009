// rankdeck - swipe through a deck of tracks, rank what you like, export it
// The engine is host-agnostic; the terminal UI is just one host

pub mod audio;      // preview playback channel + rodio backend
pub mod config;     // settings and preferences
pub mod deck;       // cards, gestures, cursor state machine
pub mod engine;     // one swipe session, wires everything together
pub mod error;      // typed errors per subsystem
pub mod export;     // liked list -> playlist
pub mod logging;    // tracing setup
#[cfg(feature = "http")]
pub mod net;        // reqwest client with deadlines
pub mod ranking;    // fire-and-forget rank submissions
pub mod spotify;    // Spotify Web API client
pub mod transition; // card exit/enter animations
#[cfg(feature = "tui")]
pub mod ui;         // terminal host

#[cfg(test)]
mod testing;

// Export the stuff hosts actually use
pub use audio::{AudioBackend, AudioChannel, NoOutputDevice, PreviewHandle};
pub use config::Config;
pub use deck::{Decision, DeckState, Friend, Item, Rank, RankedItem};
pub use engine::{EngineEvent, EngineServices, EngineSettings, RankingEngine, ReleaseOutcome};
pub use error::{AudioError, DeckError, ExportError, ServiceError};
pub use export::{CollectionApi, ExportReport, PlaylistExporter};
pub use ranking::{IdentityStore, MemoryIdentityStore, RankingService};
