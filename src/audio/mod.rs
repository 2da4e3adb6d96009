pub mod channel;
#[cfg(feature = "audio")]
pub mod player;

pub use channel::AudioChannel;
#[cfg(feature = "audio")]
pub use player::RodioBackend;

use crate::error::AudioResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub volume: f32, // 0.0 to 1.0
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
    /// Start the preview as soon as a card is presented
    pub autoplay: bool,
    /// How often a playing handle reports elapsed time
    pub status_interval_ms: u64,
    /// Give up on a remote preview after this long
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: 0.7,
            fade_in_ms: 300,  // smooth start
            fade_out_ms: 200, // quick but not a click
            autoplay: true,
            status_interval_ms: 250,
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// Snapshot pushed by a live preview handle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackStatus {
    pub elapsed: Duration,
    pub duration: Option<Duration>,
    pub playing: bool,
    /// The preview played to its natural end
    pub finished: bool,
}

/// A status update tagged with the load that produced it, and with the
/// play/pause command that was current when it was sent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusUpdate {
    pub generation: u64,
    pub epoch: u64,
    pub status: PlaybackStatus,
}

/// Sending half handed to a backend on every load. Updates sent after the
/// handle was replaced carry a stale generation, and updates sent before the
/// latest play/pause carry a stale epoch. The channel drops both.
#[derive(Debug, Clone)]
pub struct StatusSender {
    generation: u64,
    epoch: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusSender {
    pub(crate) fn new(generation: u64, epoch: Arc<AtomicU64>, tx: mpsc::UnboundedSender<StatusUpdate>) -> Self {
        Self { generation, epoch, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the owning channel is gone
    pub fn send(&self, status: PlaybackStatus) -> bool {
        self.tx
            .send(StatusUpdate {
                generation: self.generation,
                epoch: self.epoch.load(Ordering::Acquire),
                status,
            })
            .is_ok()
    }
}

/// Something that can turn a preview reference into a playable handle
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn load(&self, reference: &str, status: StatusSender) -> AudioResult<Box<dyn PreviewHandle>>;
}

/// One loaded preview. Owned exclusively by an [`AudioChannel`].
#[async_trait]
pub trait PreviewHandle: Send {
    async fn play(&mut self) -> AudioResult<()>;
    async fn pause(&mut self) -> AudioResult<()>;
    async fn stop(&mut self) -> AudioResult<()>;
    /// Free the underlying resource; the handle is dropped right after
    async fn unload(&mut self);
}

/// Stand-in when there is no output device: every load fails, so previews
/// surface as notices and the session carries on silently
#[derive(Debug, Clone, Default)]
pub struct NoOutputDevice {
    pub reason: String,
}

#[async_trait]
impl AudioBackend for NoOutputDevice {
    async fn load(&self, _reference: &str, _status: StatusSender) -> AudioResult<Box<dyn PreviewHandle>> {
        Err(crate::error::AudioError::Output(format!("no audio output: {}", self.reason)))
    }
}
