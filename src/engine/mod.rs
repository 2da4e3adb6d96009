// Ranking engine - one swipe session from first card to export
//
// Drag -> release decision -> deck commit -> exit animation -> (tick) cursor
// advance -> audio swap -> enter animation. Accepts also fire a rank
// submission in the background; nothing here ever waits on the network.

use crate::audio::{AudioBackend, AudioChannel};
use crate::config::Config;
use crate::deck::{Deck, DeckState, Decision, Friend, GestureInterpreter, Item, RankedItem};
use crate::error::{DeckError, ExportError};
use crate::export::{CollectionApi, ExportConfig, ExportReport, PlaylistExporter};
use crate::ranking::{IdentityStore, RankSubmission, RankSubmitter, RankingService};
use crate::transition::{AnimationEvent, CardVisual, ExitDirection, TransitionAnimator, TransitionConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// External collaborators the host plugs in
#[derive(Clone)]
pub struct EngineServices {
    pub audio: Arc<dyn AudioBackend>,
    pub identity: Arc<dyn IdentityStore>,
    pub ranking: Arc<dyn RankingService>,
    pub collections: Arc<dyn CollectionApi>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub screen_width: f64,
    pub transition: TransitionConfig,
    pub autoplay: bool,
    pub user_id_key: String,
    pub export: ExportConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Config::default().into()
    }
}

impl From<Config> for EngineSettings {
    fn from(config: Config) -> Self {
        Self {
            screen_width: config.gesture.screen_width,
            transition: config.transition,
            autoplay: config.audio.autoplay,
            user_id_key: config.ranking.user_id_key,
            export: config.export,
        }
    }
}

/// What the engine tells its host
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    CardPresented { index: usize, item_id: String },
    DecisionRecorded { index: usize, item_id: String, decision: Decision },
    DeckExhausted { liked: usize, disliked: usize },
    /// Something the user should see (audio failure, export failure)
    Notice(String),
    ExportCompleted(ExportReport),
    ExportFailed,
    SessionComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckSummary {
    pub liked: usize,
    pub disliked: usize,
    pub position: usize,
    pub total: usize,
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// A transition was in flight, or the deck is done
    Ignored,
    SnappedBack,
    Committed(Decision),
}

/// The card on screen, ready for display
#[derive(Debug, Clone, Copy)]
pub struct CardView<'a> {
    pub item: &'a Item,
    pub shared_by: Option<&'a str>,
    pub position: usize,
    pub total: usize,
}

pub struct RankingEngine {
    session_id: Uuid,
    deck: Deck,
    friends: HashMap<u64, String>,
    gestures: GestureInterpreter,
    animator: TransitionAnimator,
    audio: AudioChannel,
    submitter: RankSubmitter,
    exporter: Arc<PlaylistExporter>,
    autoplay: bool,
    pending: Vec<JoinHandle<()>>,
    event_sender: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl RankingEngine {
    pub fn new(items: &[Item], friends: &[Friend], services: EngineServices, settings: EngineSettings) -> Self {
        let friends = friends
            .iter()
            .map(|friend| (friend.id, friend.username.clone()))
            .collect();

        Self {
            session_id: Uuid::new_v4(),
            deck: Deck::new(items),
            friends,
            gestures: GestureInterpreter::new(settings.screen_width),
            animator: TransitionAnimator::new(&settings.transition, settings.screen_width),
            audio: AudioChannel::new(services.audio),
            submitter: RankSubmitter::new(services.identity, services.ranking, settings.user_id_key),
            exporter: Arc::new(PlaylistExporter::new(services.collections, settings.export)),
            autoplay: settings.autoplay,
            pending: Vec::new(),
            event_sender: None,
        }
    }

    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<EngineEvent>) {
        self.event_sender = Some(sender);
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> DeckState {
        self.deck.state()
    }

    /// True while a card is on its way out - new gestures are ignored
    pub fn is_busy(&self) -> bool {
        self.deck.is_transitioning()
    }

    pub fn summary(&self) -> DeckSummary {
        DeckSummary {
            liked: self.deck.liked().len(),
            disliked: self.deck.disliked().len(),
            position: self.deck.position(),
            total: self.deck.len(),
            exhausted: self.deck.state().is_exhausted(),
        }
    }

    pub fn liked(&self) -> &[RankedItem] {
        self.deck.liked()
    }

    pub fn disliked(&self) -> &[Item] {
        self.deck.disliked()
    }

    pub fn friend_name(&self, friend_id: u64) -> Option<&str> {
        self.friends.get(&friend_id).map(String::as_str)
    }

    pub fn current_card(&self) -> Option<CardView<'_>> {
        let item = self.deck.current()?;
        Some(CardView {
            item,
            shared_by: item.shared_by.and_then(|id| self.friend_name(id)),
            position: self.deck.position(),
            total: self.deck.len(),
        })
    }

    pub fn visual(&self) -> CardVisual {
        self.animator.visual()
    }

    pub fn audio(&self) -> &AudioChannel {
        &self.audio
    }

    /// Present the first card (or report an empty deck)
    pub async fn start(&mut self, now: Instant) {
        info!(
            "Session {} started with {} cards",
            self.session_id,
            self.deck.len()
        );

        match self.deck.state() {
            DeckState::Presenting(index) => {
                self.animator.start_enter(now);
                self.present(index).await;
            }
            DeckState::Exhausted => self.on_exhausted(),
            DeckState::Transitioning { .. } => {}
        }
    }

    /// Live drag update. Returns the rank a release here would give, or
    /// None when gestures are currently ignored.
    pub fn drag(&mut self, dx: f64, dy: f64) -> Option<u8> {
        if self.is_busy() || self.deck.state().is_exhausted() {
            return None;
        }

        let rank = self.gestures.rank_from_offset(dx);
        self.animator.drag(dx, dy, rank);
        Some(rank)
    }

    /// Finger lifted at horizontal offset `dx` with velocity `vx`
    pub fn release(&mut self, dx: f64, vx: f64, now: Instant) -> ReleaseOutcome {
        if self.is_busy() {
            debug!("Release ignored, transition in flight");
            return ReleaseOutcome::Ignored;
        }

        let decision = self.gestures.release(dx, vx);
        self.decide(decision, now)
    }

    /// Like button - always a rank-5 accept
    pub fn like(&mut self, now: Instant) -> ReleaseOutcome {
        self.decide(Decision::like(), now)
    }

    /// Dislike button - recorded as a rank-1 accept, never a reject
    pub fn dislike(&mut self, now: Instant) -> ReleaseOutcome {
        self.decide(Decision::dislike(), now)
    }

    fn decide(&mut self, decision: Decision, now: Instant) -> ReleaseOutcome {
        let committed = match self.deck.commit(decision) {
            Ok(Some(committed)) => committed,
            Ok(None) => {
                self.animator.snap_back();
                return ReleaseOutcome::SnappedBack;
            }
            Err(DeckError::Busy) | Err(DeckError::Exhausted) | Err(DeckError::NotTransitioning) => {
                return ReleaseOutcome::Ignored;
            }
        };

        info!(
            "Card {} ({}) decided: {:?}",
            committed.index, committed.item_id, committed.decision
        );

        let direction = match committed.decision {
            Decision::Accept(rank) => {
                self.pending.retain(|task| !task.is_finished());
                self.pending.push(self.submitter.submit(RankSubmission {
                    item_id: committed.item_id.clone(),
                    rank,
                }));
                ExitDirection::Right
            }
            _ => ExitDirection::Left,
        };

        self.animator.start_exit(direction, now);
        self.emit(EngineEvent::DecisionRecorded {
            index: committed.index,
            item_id: committed.item_id,
            decision: committed.decision,
        });

        ReleaseOutcome::Committed(decision)
    }

    /// Drive animations and apply pushed audio status. The cursor only
    /// moves here, once the exit animation reports completion.
    pub async fn tick(&mut self, now: Instant) {
        self.audio.drain_status();

        if let Some(AnimationEvent::ExitFinished) = self.animator.poll(now) {
            self.finish_transition(now).await;
        }
    }

    /// Wait out the running transition, for hosts without their own clock
    pub async fn settle(&mut self) {
        while self.is_busy() {
            match self.animator.exit_deadline() {
                Some(deadline) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
                    self.tick(Instant::now()).await;
                }
                None => self.finish_transition(Instant::now()).await,
            }
        }
    }

    async fn finish_transition(&mut self, now: Instant) {
        // Outgoing preview goes away before anything new is loaded
        self.audio.stop().await;

        match self.deck.settle() {
            Ok(DeckState::Presenting(index)) => {
                self.animator.start_enter(now);
                self.present(index).await;
            }
            Ok(DeckState::Exhausted) => self.on_exhausted(),
            Ok(DeckState::Transitioning { .. }) => {}
            Err(e) => warn!("Transition finished without a pending decision: {}", e),
        }
    }

    async fn present(&mut self, index: usize) {
        let Some(item) = self.deck.items().get(index) else {
            return;
        };
        let item_id = item.id.clone();
        let preview = item.preview_url.clone();

        debug!("Presenting card {} ({})", index, item_id);
        self.audio.set_source(preview.clone());
        self.emit(EngineEvent::CardPresented { index, item_id });

        if self.autoplay && preview.is_some() {
            if let Err(e) = self.audio.play().await {
                self.notify(format!("Couldn't play preview: {}", e));
            }
        }
    }

    fn on_exhausted(&mut self) {
        self.animator.clear();
        self.audio.set_source(None);

        let summary = self.summary();
        info!(
            "Session {} exhausted: {} liked, {} disliked",
            self.session_id, summary.liked, summary.disliked
        );
        self.emit(EngineEvent::DeckExhausted {
            liked: summary.liked,
            disliked: summary.disliked,
        });
    }

    pub async fn toggle_playback(&mut self) {
        if self.is_busy() {
            return;
        }
        if let Err(e) = self.audio.toggle_playback().await {
            self.notify(format!("Couldn't play preview: {}", e));
        }
    }

    /// Start the playlist export in the background. Works on a copy of the
    /// liked list, so the session can move on (or end) meanwhile.
    pub fn export(&self, suffix: &str) -> Result<JoinHandle<Result<ExportReport, ExportError>>, ExportError> {
        if !self.deck.state().is_exhausted() {
            return Err(ExportError::NotExhausted);
        }
        if suffix.trim().is_empty() {
            return Err(ExportError::MissingName);
        }

        let liked = self.deck.liked().to_vec();
        let suffix = suffix.to_string();
        let exporter = self.exporter.clone();
        let sender = self.event_sender.clone();
        info!("Exporting {} liked items", liked.len());

        Ok(tokio::spawn(async move {
            let result = exporter.export(liked, &suffix).await;
            let events = match &result {
                Ok(report) => vec![EngineEvent::ExportCompleted(report.clone())],
                Err(e) => {
                    warn!("Playlist export failed: {}", e);
                    vec![
                        EngineEvent::Notice(ExportError::USER_MESSAGE.to_string()),
                        EngineEvent::ExportFailed,
                    ]
                }
            };
            if let Some(sender) = sender {
                for event in events {
                    let _ = sender.send(event);
                }
            }
            result
        }))
    }

    /// Wait for every rank submission issued so far
    pub async fn flush_submissions(&mut self) {
        for task in self.pending.drain(..) {
            if let Err(e) = task.await {
                warn!("Rank submission task failed: {}", e);
            }
        }
    }

    /// Release the preview and stop animating. Submissions keep running.
    pub async fn shutdown(&mut self) {
        self.audio.stop().await;
        self.animator.clear();
    }

    /// "Restart": tear this session down and tell the host to build a new one
    pub async fn complete_session(mut self) {
        self.shutdown().await;
        info!("Session {} complete", self.session_id);
        self.emit(EngineEvent::SessionComplete);
    }

    fn notify(&self, message: String) {
        warn!("{}", message);
        self.emit(EngineEvent::Notice(message));
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests;
