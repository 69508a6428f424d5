//! Narrow interfaces to the chain client and local storage.
//!
//! The protocol never talks to a network directly. It reads committed notes
//! through [`NoteSource`], emits transfers through [`TransferSubmitter`],
//! consumes notes through [`NoteConsumer`] and checkpoints through
//! [`KeyValueStore`]. Every async call is a suspension point.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, TransportError};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// On-chain account identifier.
    AccountId
);
string_id!(
    /// Identifier of one committed note.
    NoteId
);
string_id!(
    /// Fungible asset (faucet) identifier.
    AssetId
);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FungibleAsset {
    pub faucet: AssetId,
    pub amount: u64,
}

/// A committed note as reported by the note source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainNote {
    pub id: NoteId,
    pub sender: AccountId,
    pub assets: Vec<FungibleAsset>,
    /// Height from which the sender may reclaim the note.
    pub recall_height: Option<u64>,
}

impl ChainNote {
    /// Amount of the first asset, the only value the protocol reads.
    pub fn amount(&self) -> Option<u64> {
        self.assets.first().map(|a| a.amount)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteType {
    Public,
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub asset: AssetId,
    pub amount: u64,
    pub note_type: NoteType,
    pub recall_height: Option<u64>,
}

impl TransferRequest {
    pub fn new(from: AccountId, to: AccountId, asset: AssetId, amount: u64) -> Self {
        Self {
            from,
            to,
            asset,
            amount,
            note_type: NoteType::Public,
            recall_height: None,
        }
    }

    pub fn with_note_type(mut self, note_type: NoteType) -> Self {
        self.note_type = note_type;
        self
    }

    pub fn with_recall_height(mut self, height: u64) -> Self {
        self.recall_height = Some(height);
        self
    }
}

#[async_trait]
pub trait NoteSource: Send + Sync {
    /// Bring the local view up to date. Returns the current block height.
    async fn sync(&self) -> Result<u64, TransportError>;

    /// Unconsumed notes addressed to `account`, in commit order.
    async fn committed_notes(&self, account: &AccountId) -> Result<Vec<ChainNote>, TransportError>;
}

#[async_trait]
pub trait TransferSubmitter: Send + Sync {
    /// Create a note moving `request.amount` from `request.from` to `request.to`.
    async fn submit(&self, request: TransferRequest) -> Result<NoteId, TransportError>;
}

#[async_trait]
pub trait NoteConsumer: Send + Sync {
    /// Consume `notes` into `account`. All-or-nothing.
    async fn consume(&self, account: &AccountId, notes: &[NoteId]) -> Result<(), TransportError>;
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
