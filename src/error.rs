// Error types for the ranking engine
// Nothing in here is fatal - every variant has a recovery path in the engine

use thiserror::Error;

/// Deck bookkeeping errors. These mean the host asked for something the
/// current deck state doesn't allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeckError {
    #[error("a card transition is still in flight")]
    Busy,

    #[error("the deck is exhausted")]
    Exhausted,

    #[error("no transition is in flight")]
    NotTransitioning,
}

/// Audio preview failures - recovered locally, channel left empty
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no preview available for this card")]
    NoSource,

    #[error("failed to fetch preview '{reference}': {reason}")]
    Fetch { reference: String, reason: String },

    #[error("unsupported audio format or corrupted preview: {0}")]
    Decode(String),

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures talking to an external collaborator (ranking service,
/// identity store, collection API)
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ServiceError::Status {
                endpoint: err
                    .url()
                    .map(|u| u.path().to_string())
                    .unwrap_or_default(),
                status: status.as_u16(),
            },
            None if err.is_decode() => ServiceError::Malformed(err.to_string()),
            None => ServiceError::Request(err.to_string()),
        }
    }
}

/// Export pipeline failures. Each step has its own variant for the logs,
/// but the user only ever sees [`ExportError::USER_MESSAGE`].
#[derive(Error, Debug, Clone)]
pub enum ExportError {
    #[error("export is only available once the deck is exhausted")]
    NotExhausted,

    #[error("a playlist name is required")]
    MissingName,

    #[error("could not fetch profile: {0}")]
    Profile(ServiceError),

    #[error("could not create collection: {0}")]
    CreateCollection(ServiceError),

    #[error("could not add tracks to collection: {0}")]
    AddEntries(ServiceError),
}

impl ExportError {
    pub const USER_MESSAGE: &'static str = "Could not export your playlist. Please try again.";

    /// True for failures that happened after the pipeline started talking
    /// to the collection API
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ExportError::Profile(_) | ExportError::CreateCollection(_) | ExportError::AddEntries(_)
        )
    }
}

pub type AudioResult<T> = Result<T, AudioError>;
pub type ServiceResult<T> = Result<T, ServiceError>;
