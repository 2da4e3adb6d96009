use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank attached to an accepted card - always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rank(u8);

impl Rank {
    pub const MIN: Rank = Rank(1);
    pub const MAX: Rank = Rank(5);

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0).contains(&value).then_some(Rank(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rank {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rank::new(value).ok_or_else(|| format!("rank {} is outside 1..=5", value))
    }
}

impl From<Rank> for u8 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate card. Everything except `rank` is identity and never changes;
/// `rank` is only filled in on the copies that land in the liked list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    /// Friend id of whoever put this card in the deck
    #[serde(default)]
    pub shared_by: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            year: None,
            cover_url: None,
            genre: None,
            preview_url: None,
            external_url: None,
            shared_by: None,
            rank: None,
        }
    }

    pub fn with_preview(mut self, preview_url: impl Into<String>) -> Self {
        self.preview_url = Some(preview_url.into());
        self
    }

    pub fn with_external_url(mut self, external_url: impl Into<String>) -> Self {
        self.external_url = Some(external_url.into());
        self
    }

    pub fn shared_by(mut self, friend_id: u64) -> Self {
        self.shared_by = Some(friend_id);
        self
    }

    pub fn display_album(&self) -> String {
        self.album
            .clone()
            .unwrap_or_else(|| "Unknown Album".to_string())
    }

    pub fn display_line(&self) -> String {
        match self.year {
            Some(year) => format!("{} - {} ({})", self.title, self.artist, year),
            None => format!("{} - {}", self.title, self.artist),
        }
    }
}

/// An accepted card together with the rank it was given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub item: Item,
    pub rank: Rank,
}

impl RankedItem {
    pub fn new(item: &Item, rank: Rank) -> Self {
        let mut item = item.clone();
        item.rank = Some(rank);
        Self { item, rank }
    }
}

/// Entry in the friends list handed to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub id: u64,
    pub username: String,
}
