// Gesture interpretation - turns a horizontal drag into a ranking decision
// Pure math, no state beyond the screen width

use super::item::Rank;

/// Fraction of the screen width a drag has to travel to count
const THRESHOLD_RATIO: f64 = 0.15;
/// Release velocity above which the distance bar is halved
const FLICK_VELOCITY: f64 = 0.1;
/// Number of rank steps spread across half the screen
const RANK_STEPS: f64 = 5.0;

/// Outcome of a gesture release (or a direct like/dislike press)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Not far enough either way - the card snaps back
    None,
    Accept(Rank),
    Reject,
}

impl Decision {
    /// What the "like" button records
    pub fn like() -> Self {
        Decision::Accept(Rank::MAX)
    }

    /// What the "dislike" button records. This is a rank-1 accept, not a
    /// reject: it still goes to the liked list and gets submitted.
    pub fn dislike() -> Self {
        Decision::Accept(Rank::MIN)
    }

    pub fn rank(&self) -> Option<Rank> {
        match self {
            Decision::Accept(rank) => Some(*rank),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Decision::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureInterpreter {
    screen_width: f64,
}

impl GestureInterpreter {
    pub fn new(screen_width: f64) -> Self {
        Self { screen_width }
    }

    pub fn screen_width(&self) -> f64 {
        self.screen_width
    }

    pub fn threshold(&self) -> f64 {
        THRESHOLD_RATIO * self.screen_width
    }

    pub fn small_threshold(&self) -> f64 {
        self.threshold() / 4.0
    }

    pub fn effective_threshold(&self, vx: f64) -> f64 {
        if vx > FLICK_VELOCITY {
            self.threshold() / 2.0
        } else {
            self.threshold()
        }
    }

    /// Rank implied by a rightward offset, 0..=5. Zero means no rightward
    /// intent yet. Also used live while dragging for the preview badge.
    pub fn rank_from_offset(&self, dx: f64) -> u8 {
        let max = self.screen_width / 2.0;
        if max.is_nan() || max <= 0.0 || !dx.is_finite() {
            return 0;
        }

        let clamped = dx.clamp(0.0, max);
        // Multiply before dividing so exact fractions of `max` stay exact
        (clamped * RANK_STEPS / max).ceil() as u8
    }

    /// Decide what a release at `dx` with horizontal velocity `vx` means.
    /// Every bound is exclusive, so a tie snaps back.
    pub fn release(&self, dx: f64, vx: f64) -> Decision {
        if self.screen_width.is_nan() || self.screen_width <= 0.0 || !dx.is_finite() {
            return Decision::None;
        }

        let threshold = self.threshold();
        let rank = self.rank_from_offset(dx);

        if dx > self.small_threshold() && rank == 1 {
            return Decision::Accept(Rank::MIN);
        }

        if dx > self.effective_threshold(vx) && rank > 1 {
            if let Some(rank) = Rank::new(rank) {
                return Decision::Accept(rank);
            }
        }

        if dx < -threshold {
            return Decision::Reject;
        }

        Decision::None
    }
}
