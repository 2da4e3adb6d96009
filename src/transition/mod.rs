// Card transitions - where the card is drawn, and when an exit is done
// Tick-driven: the host passes in `now`, nothing here sleeps

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Largest tilt applied to a card dragged a full screen width
const MAX_ROTATION_DEG: f64 = 15.0;
/// How far past the edge an exiting card travels, in screen widths
const EXIT_DISTANCE: f64 = 1.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub exit_ms: u64,
    pub enter_ms: u64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            exit_ms: 250,
            enter_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDirection {
    Left,
    Right,
}

/// Everything a host needs to draw the top card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardVisual {
    pub offset_x: f64,
    pub offset_y: f64,
    pub rotation_deg: f64,
    pub opacity: f64,
    /// Rank the card would get if released right now (0 = none)
    pub rank_preview: u8,
}

impl CardVisual {
    pub fn neutral() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            rotation_deg: 0.0,
            opacity: 1.0,
            rank_preview: 0,
        }
    }
}

impl Default for CardVisual {
    fn default() -> Self {
        Self::neutral()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Dragging,
    Exiting {
        direction: ExitDirection,
        started: Instant,
        from_x: f64,
    },
    Entering {
        started: Instant,
    },
}

/// Reported by [`TransitionAnimator::poll`] when a phase completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEvent {
    ExitFinished,
    EnterFinished,
}

#[derive(Debug, Clone)]
pub struct TransitionAnimator {
    exit_duration: Duration,
    enter_duration: Duration,
    screen_width: f64,
    phase: Phase,
    visual: CardVisual,
}

impl TransitionAnimator {
    pub fn new(config: &TransitionConfig, screen_width: f64) -> Self {
        Self {
            exit_duration: Duration::from_millis(config.exit_ms),
            enter_duration: Duration::from_millis(config.enter_ms),
            screen_width,
            phase: Phase::Idle,
            visual: CardVisual::neutral(),
        }
    }

    pub fn visual(&self) -> CardVisual {
        self.visual
    }

    pub fn is_exiting(&self) -> bool {
        matches!(self.phase, Phase::Exiting { .. })
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Exiting { .. } | Phase::Entering { .. })
    }

    /// Follow the finger. Ignored while a card is leaving.
    pub fn drag(&mut self, dx: f64, dy: f64, rank_preview: u8) {
        if self.is_exiting() {
            return;
        }

        let rotation = if self.screen_width > 0.0 {
            (dx / self.screen_width).clamp(-1.0, 1.0) * MAX_ROTATION_DEG
        } else {
            0.0
        };

        self.phase = Phase::Dragging;
        self.visual = CardVisual {
            offset_x: dx,
            offset_y: dy,
            rotation_deg: rotation,
            opacity: 1.0,
            rank_preview,
        };
    }

    /// Undecided release - back to the middle
    pub fn snap_back(&mut self) {
        if self.is_exiting() {
            return;
        }
        self.phase = Phase::Idle;
        self.visual = CardVisual::neutral();
    }

    pub fn start_exit(&mut self, direction: ExitDirection, now: Instant) {
        self.phase = Phase::Exiting {
            direction,
            started: now,
            from_x: self.visual.offset_x,
        };
    }

    pub fn start_enter(&mut self, now: Instant) {
        self.phase = Phase::Entering { started: now };
        self.visual = CardVisual {
            opacity: 0.0,
            ..CardVisual::neutral()
        };
    }

    /// Nothing left to show (deck exhausted)
    pub fn clear(&mut self) {
        self.phase = Phase::Idle;
        self.visual = CardVisual {
            opacity: 0.0,
            ..CardVisual::neutral()
        };
    }

    /// When the running exit will be done, if one is running
    pub fn exit_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Exiting { started, .. } => Some(started + self.exit_duration),
            _ => None,
        }
    }

    /// Advance the animation to `now`. Reports a phase that just completed.
    pub fn poll(&mut self, now: Instant) -> Option<AnimationEvent> {
        match self.phase {
            Phase::Exiting {
                direction,
                started,
                from_x,
            } => {
                let progress = progress(started, self.exit_duration, now);
                let target = match direction {
                    ExitDirection::Left => -EXIT_DISTANCE * self.screen_width,
                    ExitDirection::Right => EXIT_DISTANCE * self.screen_width,
                };
                self.visual.offset_x = from_x + (target - from_x) * progress;
                self.visual.opacity = 1.0 - progress;

                if progress >= 1.0 {
                    self.phase = Phase::Idle;
                    Some(AnimationEvent::ExitFinished)
                } else {
                    None
                }
            }
            Phase::Entering { started } => {
                let progress = progress(started, self.enter_duration, now);
                self.visual.opacity = progress;

                if progress >= 1.0 {
                    self.phase = Phase::Idle;
                    self.visual = CardVisual::neutral();
                    Some(AnimationEvent::EnterFinished)
                } else {
                    None
                }
            }
            Phase::Idle | Phase::Dragging => None,
        }
    }
}

fn progress(started: Instant, duration: Duration, now: Instant) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(started);
    (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
}
