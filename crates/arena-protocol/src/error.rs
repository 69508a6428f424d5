//! Error taxonomy for the note-driven match protocol.

use arena_engine::EngineError;

use crate::ports::NoteId;

/// Faults in building or checking a move commitment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    #[error("move {0} outside 1..=20")]
    InvalidMove(u64),

    #[error("nonce half {0} outside 1..=65536")]
    InvalidNoncePart(u64),

    #[error("commit half {0} outside 1..=65536")]
    InvalidCommitPart(u64),

    #[error("reveal does not match the published commitment")]
    Mismatch,
}

/// Failures reported by the chain client behind the ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("note not found: {0}")]
    NoteNotFound(NoteId),

    #[error("note {note} not consumable: {reason}")]
    NotConsumable { note: NoteId, reason: String },
}

impl TransportError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }
}

/// Key-value store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store lock was poisoned")]
    LockPoisoned,

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{action} not allowed while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("consumption of note {0} already in flight or done")]
    GuardBusy(NoteId),

    #[error("timeout not reached: height {current}, claimable after {required}")]
    TimeoutNotReached { current: u64, required: u64 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl ProtocolError {
    pub fn is_transient(&self) -> bool {
        match self {
            ProtocolError::Transport(err) => err.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
