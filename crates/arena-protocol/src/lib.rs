//! Note-driven match protocol for the arena.
//!
//! Two players coordinate a whole match (handshake, stakes, draft, battle
//! and settlement) purely through fungible transfers between their accounts.
//! Every signal is a transfer amount; [`wire`] holds the encoding and
//! [`classifier`] reads it back, always with the caller's current phase.
//!
//! The chain is reached only through the traits in [`ports`]. The `mock`
//! feature provides an in-memory implementation of all of them.

pub mod battle_session;
pub mod classifier;
pub mod commitment;
pub mod config;
pub mod context;
pub mod draft_session;
pub mod error;
pub mod lobby;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod persistence;
pub mod poller;
pub mod ports;
pub mod settlement;
pub mod wire;

pub use battle_session::{first_standing_attack, BattleSession, RoundProgress};
pub use classifier::{
    classify, classify_amount, classify_amount_in_phase, classify_for_phase, decode_for_phase,
    decode_note, ClassifiedNotes, DecodedNote, MatchPhase, Signal,
};
pub use commitment::{
    create_commitment, create_commitment_with_rng, create_reveal, verify_reveal, CommitData,
    RevealData,
};
pub use config::ArenaConfig;
pub use context::{ArenaContext, Ports};
pub use draft_session::{draft_key, DraftSession, DRAFT_KEY_PREFIX};
pub use error::{CommitError, ProtocolError, Result, StoreError, TransportError};
pub use lobby::{open_match, Lobby};
pub use persistence::{load_draft, save_draft, MemoryStore, PersistedDraft, RestoredDraft};
pub use poller::{poll_until, retry_with_backoff, CancelToken, Pacer, Step};
pub use ports::{
    AccountId, AssetId, ChainNote, FungibleAsset, KeyValueStore, NoteConsumer, NoteId, NoteSource,
    NoteType, TransferRequest, TransferSubmitter,
};
pub use settlement::{withdrawal_amount, ConsumeGuard, GuardState, Settlement, StakeState};
pub use wire::{
    ACCEPT_AMOUNT, AMOUNT_BOUND, COMMIT_CHUNK_MAX, JOIN_AMOUNT, NONCE_CHUNK_MAX, STAKE_AMOUNT,
};
