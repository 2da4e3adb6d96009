// Deck - the ordered cards of one ranking session plus what was decided so far
// The caller's cards are shared read-only; only the liked/disliked lists grow

pub mod cursor;  // position state machine
pub mod gesture; // drag -> decision mapping
pub mod item;    // cards, ranks, friends

pub use cursor::{DeckCursor, DeckState};
pub use gesture::{Decision, GestureInterpreter};
pub use item::{Friend, Item, Rank, RankedItem};

use crate::error::DeckError;
use std::sync::Arc;

/// Snapshot of a decision, taken by value when it's recorded so async work
/// never has to look back at the cursor
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub index: usize,
    pub item_id: String,
    pub decision: Decision,
}

#[derive(Debug, Clone)]
pub struct Deck {
    items: Arc<[Item]>,
    cursor: DeckCursor,
    liked: Vec<RankedItem>,
    disliked: Vec<Item>,
}

impl Deck {
    pub fn new(items: &[Item]) -> Self {
        let items: Arc<[Item]> = items.into();
        let cursor = DeckCursor::new(items.len());
        Self {
            items,
            cursor,
            liked: Vec::new(),
            disliked: Vec::new(),
        }
    }

    pub fn state(&self) -> DeckState {
        self.cursor.state()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_transitioning(&self) -> bool {
        self.cursor.is_transitioning()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The card currently on screen (or leaving it, mid-transition)
    pub fn current(&self) -> Option<&Item> {
        self.items.get(self.cursor.position())
    }

    pub fn liked(&self) -> &[RankedItem] {
        &self.liked
    }

    pub fn disliked(&self) -> &[Item] {
        &self.disliked
    }

    /// Record a decision for the current card and lock the deck until
    /// [`Deck::settle`]. `Decision::None` records nothing and returns `None`.
    pub fn commit(&mut self, decision: Decision) -> Result<Option<Committed>, DeckError> {
        if decision.is_none() {
            return match self.state() {
                DeckState::Presenting(_) => Ok(None),
                DeckState::Transitioning { .. } => Err(DeckError::Busy),
                DeckState::Exhausted => Err(DeckError::Exhausted),
            };
        }

        let index = self.cursor.begin_transition()?;
        let item = &self.items[index];

        match decision {
            Decision::Accept(rank) => self.liked.push(RankedItem::new(item, rank)),
            Decision::Reject => self.disliked.push(item.clone()),
            Decision::None => unreachable!("handled above"),
        }

        Ok(Some(Committed {
            index,
            item_id: item.id.clone(),
            decision,
        }))
    }

    /// Advance past the card whose transition just finished
    pub fn settle(&mut self) -> Result<DeckState, DeckError> {
        let state = self.cursor.complete_transition()?;
        debug_assert_eq!(self.liked.len() + self.disliked.len(), self.cursor.position());
        Ok(state)
    }
}
