use crate::error::DeckError;

/// Where the deck is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckState {
    /// Card `i` is on screen and accepting gestures
    Presenting(usize),
    /// A decision for card `from` is recorded, exit animation still running
    Transitioning { from: usize },
    /// Every card has been decided
    Exhausted,
}

impl DeckState {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, DeckState::Exhausted)
    }
}

/// Monotonic position over a deck of `len` cards.
///
/// The position only moves forward, one step per completed transition, and
/// never past `len`.
#[derive(Debug, Clone)]
pub struct DeckCursor {
    len: usize,
    position: usize,
    transitioning: bool,
}

impl DeckCursor {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            position: 0,
            transitioning: false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn state(&self) -> DeckState {
        if self.position >= self.len {
            DeckState::Exhausted
        } else if self.transitioning {
            DeckState::Transitioning {
                from: self.position,
            }
        } else {
            DeckState::Presenting(self.position)
        }
    }

    /// Lock the current card for a transition. Returns its index.
    pub fn begin_transition(&mut self) -> Result<usize, DeckError> {
        match self.state() {
            DeckState::Presenting(index) => {
                self.transitioning = true;
                Ok(index)
            }
            DeckState::Transitioning { .. } => Err(DeckError::Busy),
            DeckState::Exhausted => Err(DeckError::Exhausted),
        }
    }

    /// Finish the in-flight transition, moving forward exactly one card
    pub fn complete_transition(&mut self) -> Result<DeckState, DeckError> {
        if !self.transitioning {
            return Err(DeckError::NotTransitioning);
        }

        self.transitioning = false;
        self.position += 1;
        Ok(self.state())
    }
}
