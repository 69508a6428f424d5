//! In-memory chain for tests and local simulation.
//!
//! Every submit and every sync produces one block. Notes keep creation order,
//! and consumption is all-or-nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::TransportError;
use crate::ports::{
    AccountId, AssetId, ChainNote, FungibleAsset, NoteConsumer, NoteId, NoteSource,
    TransferRequest, TransferSubmitter,
};

#[derive(Clone, Debug)]
struct StoredNote {
    note: ChainNote,
    recipient: AccountId,
    consumed: bool,
}

#[derive(Debug, Default)]
struct ChainState {
    height: u64,
    next_note: u64,
    notes: Vec<StoredNote>,
    balances: HashMap<(AccountId, AssetId), u64>,
    fail_submits: u32,
    fail_consumes: u32,
    fail_syncs: u32,
    submitted: Vec<TransferRequest>,
}

impl ChainState {
    fn balance_mut(&mut self, account: &AccountId, asset: &AssetId) -> &mut u64 {
        self.balances
            .entry((account.clone(), asset.clone()))
            .or_insert(0)
    }

    fn take_fault(counter: &mut u32, what: &str) -> Result<(), TransportError> {
        if *counter > 0 {
            *counter -= 1;
            return Err(TransportError::Network(format!("injected {what} failure")));
        }
        Ok(())
    }
}

/// Shared in-memory ledger. Clones see the same chain.
#[derive(Clone, Debug, Default)]
pub struct InMemoryChain {
    state: Arc<Mutex<ChainState>>,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mint `amount` of `asset` to `account`.
    pub fn fund(&self, account: &AccountId, asset: &AssetId, amount: u64) {
        let mut state = self.lock();
        let balance = state.balance_mut(account, asset);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, account: &AccountId, asset: &AssetId) -> u64 {
        self.lock()
            .balances
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn height(&self) -> u64 {
        self.lock().height
    }

    pub fn advance_blocks(&self, blocks: u64) {
        let mut state = self.lock();
        state.height += blocks;
    }

    /// Fail the next `n` submits with a network error.
    pub fn fail_submits(&self, n: u32) {
        self.lock().fail_submits = n;
    }

    pub fn fail_consumes(&self, n: u32) {
        self.lock().fail_consumes = n;
    }

    pub fn fail_syncs(&self, n: u32) {
        self.lock().fail_syncs = n;
    }

    /// Every accepted transfer, in submission order.
    pub fn submitted(&self) -> Vec<TransferRequest> {
        self.lock().submitted.clone()
    }

    /// Unconsumed notes from `sender`, in creation order.
    pub fn pending_from(&self, sender: &AccountId) -> Vec<ChainNote> {
        self.lock()
            .notes
            .iter()
            .filter(|n| !n.consumed && &n.note.sender == sender)
            .map(|n| n.note.clone())
            .collect()
    }

    pub fn is_consumed(&self, note: &NoteId) -> Option<bool> {
        self.lock()
            .notes
            .iter()
            .find(|n| &n.note.id == note)
            .map(|n| n.consumed)
    }
}

#[async_trait]
impl NoteSource for InMemoryChain {
    async fn sync(&self) -> Result<u64, TransportError> {
        let mut state = self.lock();
        ChainState::take_fault(&mut state.fail_syncs, "sync")?;
        state.height += 1;
        Ok(state.height)
    }

    async fn committed_notes(&self, account: &AccountId) -> Result<Vec<ChainNote>, TransportError> {
        Ok(self
            .lock()
            .notes
            .iter()
            .filter(|n| !n.consumed && &n.recipient == account)
            .map(|n| n.note.clone())
            .collect())
    }
}

#[async_trait]
impl TransferSubmitter for InMemoryChain {
    async fn submit(&self, request: TransferRequest) -> Result<NoteId, TransportError> {
        let mut state = self.lock();
        ChainState::take_fault(&mut state.fail_submits, "submit")?;
        if request.amount == 0 {
            return Err(TransportError::Rejected("zero amount".into()));
        }
        let balance = state.balance_mut(&request.from, &request.asset);
        if *balance < request.amount {
            return Err(TransportError::InsufficientBalance {
                required: request.amount,
                available: *balance,
            });
        }
        *balance -= request.amount;

        state.height += 1;
        state.next_note += 1;
        let id = NoteId::new(format!("note-{}", state.next_note));
        state.notes.push(StoredNote {
            note: ChainNote {
                id: id.clone(),
                sender: request.from.clone(),
                assets: vec![FungibleAsset {
                    faucet: request.asset.clone(),
                    amount: request.amount,
                }],
                recall_height: request.recall_height,
            },
            recipient: request.to.clone(),
            consumed: false,
        });
        state.submitted.push(request);
        Ok(id)
    }
}

#[async_trait]
impl NoteConsumer for InMemoryChain {
    async fn consume(&self, account: &AccountId, notes: &[NoteId]) -> Result<(), TransportError> {
        let mut state = self.lock();
        ChainState::take_fault(&mut state.fail_consumes, "consume")?;

        let height = state.height;
        let mut indices = Vec::with_capacity(notes.len());
        for id in notes {
            let index = state
                .notes
                .iter()
                .position(|n| &n.note.id == id)
                .ok_or_else(|| TransportError::NoteNotFound(id.clone()))?;
            let stored = &state.notes[index];
            let reason = if stored.consumed {
                Some("already consumed".to_string())
            } else if &stored.recipient == account {
                None
            } else if &stored.note.sender == account {
                match stored.note.recall_height {
                    Some(recall) if height >= recall => None,
                    Some(recall) => Some(format!("recallable at height {recall}, now {height}")),
                    None => Some("note has no recall height".to_string()),
                }
            } else {
                Some("account is neither recipient nor sender".to_string())
            };
            if let Some(reason) = reason {
                return Err(TransportError::NotConsumable {
                    note: id.clone(),
                    reason,
                });
            }
            if indices.contains(&index) {
                return Err(TransportError::NotConsumable {
                    note: id.clone(),
                    reason: "listed twice".to_string(),
                });
            }
            indices.push(index);
        }

        for index in indices {
            state.notes[index].consumed = true;
            let assets = state.notes[index].note.assets.clone();
            for asset in assets {
                let balance = state.balance_mut(account, &asset.faucet);
                *balance = balance.saturating_add(asset.amount);
            }
        }
        Ok(())
    }
}
