// Audio channel - the one place a preview handle is allowed to live
// Every load tears the previous handle down first, so there is never more than one

use super::{AudioBackend, PreviewHandle, StatusSender, StatusUpdate};
use crate::error::{AudioError, AudioResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct AudioChannel {
    backend: Arc<dyn AudioBackend>,
    handle: Option<Box<dyn PreviewHandle>>,
    /// Preview of the card on screen; loaded lazily by `play`
    source: Option<String>,
    /// Bumped on every release so late status updates can be told apart
    generation: u64,
    /// Bumped after every play/pause; shared with the live status sender
    epoch: Arc<AtomicU64>,
    playing: bool,
    elapsed: Duration,
    duration: Option<Duration>,
    status_tx: mpsc::UnboundedSender<StatusUpdate>,
    status_rx: mpsc::UnboundedReceiver<StatusUpdate>,
}

impl AudioChannel {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            handle: None,
            source: None,
            generation: 0,
            epoch: Arc::new(AtomicU64::new(0)),
            playing: false,
            elapsed: Duration::ZERO,
            duration: None,
            status_tx,
            status_rx,
        }
    }

    /// Point the channel at a new preview without loading it
    pub fn set_source(&mut self, source: Option<String>) {
        self.source = source;
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Release whatever is loaded, then acquire `reference`. On failure the
    /// channel is left empty.
    pub async fn load(&mut self, reference: &str) -> AudioResult<()> {
        self.release().await;

        let status = StatusSender::new(self.generation, self.epoch.clone(), self.status_tx.clone());
        match self.backend.load(reference, status).await {
            Ok(handle) => {
                debug!("Loaded preview {} (generation {})", reference, self.generation);
                self.handle = Some(handle);
                self.source = Some(reference.to_string());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load preview {}: {}", reference, e);
                Err(e)
            }
        }
    }

    /// Start playback, loading the current source first if nothing is loaded
    pub async fn play(&mut self) -> AudioResult<()> {
        if self.handle.is_none() {
            let reference = self.source.clone().ok_or(AudioError::NoSource)?;
            self.load(&reference).await?;
        }

        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.play().await {
                warn!("Preview playback failed: {}", e);
                self.release().await;
                return Err(e);
            }
            self.bump_epoch();
            self.playing = true;
        }

        Ok(())
    }

    pub async fn pause(&mut self) -> AudioResult<()> {
        if let Some(handle) = self.handle.as_mut() {
            handle.pause().await?;
        }
        // Anything the handle reported while still audible is now out of date
        self.bump_epoch();
        self.playing = false;
        Ok(())
    }

    /// Stop and release the loaded preview. The source is kept so a later
    /// `play` can bring it back.
    pub async fn stop(&mut self) {
        self.release().await;
    }

    pub async fn toggle_playback(&mut self) -> AudioResult<()> {
        if self.playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Apply one pushed status update. Returns false for updates from a
    /// handle that has since been released, or sent before the last
    /// play/pause.
    pub fn apply_status(&mut self, update: StatusUpdate) -> bool {
        if update.generation != self.generation
            || update.epoch != self.epoch.load(Ordering::Acquire)
            || self.handle.is_none()
        {
            return false;
        }

        let status = update.status;
        self.elapsed = status.elapsed;
        self.duration = status.duration;
        self.playing = status.playing && !status.finished;
        if status.finished {
            debug!("Preview finished after {:?}", status.elapsed);
        }
        true
    }

    /// Apply every update that has arrived so far
    pub fn drain_status(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.status_rx.try_recv() {
            if self.apply_status(update) {
                applied += 1;
            }
        }
        applied
    }

    fn bump_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    async fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.stop().await {
                warn!("Failed to stop preview cleanly: {}", e);
            }
            handle.unload().await;
        }

        self.generation += 1;
        self.playing = false;
        self.elapsed = Duration::ZERO;
        self.duration = None;
    }
}
