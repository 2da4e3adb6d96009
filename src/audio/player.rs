use super::{AudioBackend, AudioConfig, PlaybackStatus, PreviewHandle, StatusSender};
use crate::error::{AudioError, AudioResult};
use async_trait::async_trait;
use rodio::{Decoder, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Preview backend on top of a rodio output stream.
///
/// The `OutputStream` itself is not `Send`, so the host keeps it alive and
/// hands us the cloneable handle.
pub struct RodioBackend {
    stream_handle: OutputStreamHandle,
    http: reqwest::Client,
    config: AudioConfig,
}

impl RodioBackend {
    pub fn new(stream_handle: OutputStreamHandle, config: AudioConfig) -> AudioResult<Self> {
        let http = crate::net::client(Duration::from_millis(config.fetch_timeout_ms))
            .map_err(|e| AudioError::Output(format!("http client: {}", e)))?;

        Ok(Self {
            stream_handle,
            http,
            config,
        })
    }
}

/// Read a preview from disk or over http(s)
async fn fetch(http: &reqwest::Client, reference: &str) -> AudioResult<Arc<[u8]>> {
    let fetch_error = |e: reqwest::Error| AudioError::Fetch {
        reference: reference.to_string(),
        reason: e.to_string(),
    };

    if reference.starts_with("http://") || reference.starts_with("https://") {
        let response = http
            .get(reference)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_error)?;
        let bytes = response.bytes().await.map_err(fetch_error)?;
        Ok(Arc::from(&bytes[..]))
    } else {
        let bytes = tokio::fs::read(reference).await?;
        Ok(Arc::from(bytes))
    }
}

fn decode(bytes: &Arc<[u8]>) -> AudioResult<Decoder<Cursor<Arc<[u8]>>>> {
    Decoder::new(Cursor::new(bytes.clone())).map_err(|e| AudioError::Decode(e.to_string()))
}

#[async_trait]
impl AudioBackend for RodioBackend {
    async fn load(&self, reference: &str, status: StatusSender) -> AudioResult<Box<dyn PreviewHandle>> {
        let bytes = fetch(&self.http, reference).await?;
        let source = decode(&bytes)?;
        let duration = source.total_duration();

        let sink = Sink::try_new(&self.stream_handle).map_err(|e| AudioError::Output(e.to_string()))?;
        // Loaded paused - play() decides when sound comes out
        sink.pause();
        sink.set_volume(self.config.volume);
        sink.append(source);

        debug!("Decoded preview {} ({} bytes, {:?})", reference, bytes.len(), duration);

        Ok(Box::new(RodioHandle {
            sink: Arc::new(sink),
            bytes,
            duration,
            status,
            config: self.config.clone(),
            poller: None,
        }))
    }
}

struct RodioHandle {
    sink: Arc<Sink>,
    bytes: Arc<[u8]>,
    duration: Option<Duration>,
    status: StatusSender,
    config: AudioConfig,
    poller: Option<JoinHandle<()>>,
}

impl RodioHandle {
    /// Push elapsed/playing updates until the preview ends or the channel
    /// stops listening
    fn start_poller(&mut self) {
        if self.poller.as_ref().is_some_and(|p| !p.is_finished()) {
            return;
        }

        let sink = self.sink.clone();
        let status = self.status.clone();
        let duration = self.duration;
        let interval = Duration::from_millis(self.config.status_interval_ms.max(10));

        self.poller = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut elapsed = Duration::ZERO;
            loop {
                ticker.tick().await;

                let finished = sink.empty();
                let playing = !sink.is_paused() && !finished;
                if playing {
                    elapsed += interval;
                }
                if let Some(total) = duration {
                    elapsed = elapsed.min(total);
                }

                let delivered = status.send(PlaybackStatus {
                    elapsed,
                    duration,
                    playing,
                    finished,
                });
                if !delivered || finished {
                    break;
                }
            }
        }));
    }

    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }

    async fn fade_in(&self) {
        let target_volume = self.config.volume;
        let fade_duration = self.config.fade_in_ms;

        if fade_duration == 0 {
            self.sink.set_volume(target_volume);
            return;
        }

        self.sink.set_volume(0.0);
        let fade_steps = 10;
        let step_duration = Duration::from_millis(fade_duration / fade_steps);
        let volume_step = target_volume / fade_steps as f32;

        for step in 1..=fade_steps {
            self.sink.set_volume(volume_step * step as f32);
            tokio::time::sleep(step_duration).await;
        }

        self.sink.set_volume(target_volume);
    }

    async fn fade_out(&self, fade_duration: u64) {
        if fade_duration == 0 {
            return;
        }

        let current_volume = self.sink.volume();
        let fade_steps = 10;
        let step_duration = Duration::from_millis(fade_duration / fade_steps);
        let volume_step = current_volume / fade_steps as f32;

        for step in 1..=fade_steps {
            let new_volume = current_volume - (volume_step * step as f32);
            self.sink.set_volume(new_volume.max(0.0));
            tokio::time::sleep(step_duration).await;
        }

        self.sink.set_volume(0.0);
    }
}

#[async_trait]
impl PreviewHandle for RodioHandle {
    async fn play(&mut self) -> AudioResult<()> {
        if self.sink.empty() {
            // Played to the end before - queue it up again
            self.sink.append(decode(&self.bytes)?);
        }

        self.sink.play();
        self.fade_in().await;
        self.start_poller();
        Ok(())
    }

    async fn pause(&mut self) -> AudioResult<()> {
        // Quick fade so pausing doesn't click
        self.fade_out(100).await;
        self.sink.pause();
        self.sink.set_volume(self.config.volume);
        Ok(())
    }

    async fn stop(&mut self) -> AudioResult<()> {
        if !self.sink.is_paused() {
            self.fade_out(self.config.fade_out_ms).await;
        }
        self.sink.stop();
        self.stop_poller();
        Ok(())
    }

    async fn unload(&mut self) {
        self.stop_poller();
        self.sink.stop();
        debug!("Unloaded preview ({} bytes)", self.bytes.len());
    }
}

impl Drop for RodioHandle {
    fn drop(&mut self) {
        self.stop_poller();
        self.sink.stop();
    }
}
