//! Explicitly owned session context.
//!
//! One [`ArenaContext`] exists per local player. It owns the ports, the
//! configuration and the root cancel token; every loop of the session
//! observes that token, so [`ArenaContext::dispose`] stops them all.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ArenaConfig;
use crate::error::Result;
use crate::poller::{retry_with_backoff, CancelToken, Pacer};
use crate::ports::{
    AccountId, ChainNote, KeyValueStore, NoteConsumer, NoteId, NoteSource, TransferRequest,
    TransferSubmitter,
};

/// The external collaborators a session talks to.
#[derive(Clone)]
pub struct Ports {
    pub notes: Arc<dyn NoteSource>,
    pub transfers: Arc<dyn TransferSubmitter>,
    pub consumer: Arc<dyn NoteConsumer>,
    pub store: Arc<dyn KeyValueStore>,
}

impl Ports {
    /// All chain ports backed by one client.
    pub fn from_chain<C>(chain: Arc<C>, store: Arc<dyn KeyValueStore>) -> Self
    where
        C: NoteSource + TransferSubmitter + NoteConsumer + 'static,
    {
        Self {
            notes: chain.clone(),
            transfers: chain.clone(),
            consumer: chain,
            store,
        }
    }
}

pub struct ArenaContext {
    account: AccountId,
    ports: Ports,
    config: ArenaConfig,
    token: CancelToken,
}

impl ArenaContext {
    /// Build the context and confirm the note source answers.
    pub async fn init(account: AccountId, ports: Ports, config: ArenaConfig) -> Result<Arc<Self>> {
        let ctx = Self {
            account,
            ports,
            config,
            token: CancelToken::new(),
        };
        let height = ctx.sync().await?;
        info!(account = %ctx.account, height, "arena context ready");
        Ok(Arc::new(ctx))
    }

    /// Cancel every loop running under this context.
    pub fn dispose(&self) {
        if !self.token.is_cancelled() {
            info!(account = %self.account, "disposing arena context");
        }
        self.token.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.ports.store.as_ref()
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::new(self.config.poll_interval, self.token.clone())
    }

    /// Sync with retry. Returns the current block height.
    pub async fn sync(&self) -> Result<u64> {
        let notes = self.ports.notes.as_ref();
        retry_with_backoff(
            self.config.retry_attempts,
            self.config.retry_backoff,
            "sync",
            || async move { Ok(notes.sync().await?) },
        )
        .await
    }

    /// Sync, then list unconsumed notes addressed to the local account.
    pub async fn inbox(&self) -> Result<(u64, Vec<ChainNote>)> {
        let height = self.sync().await?;
        let notes = self.ports.notes.as_ref();
        let account = &self.account;
        let inbox = retry_with_backoff(
            self.config.retry_attempts,
            self.config.retry_backoff,
            "committed_notes",
            || async move { Ok(notes.committed_notes(account).await?) },
        )
        .await?;
        Ok((height, inbox))
    }

    /// Unconsumed notes I sent to `to`, in commit order.
    pub async fn outbox(&self, to: &AccountId) -> Result<Vec<ChainNote>> {
        let notes = self.ports.notes.as_ref();
        let sent = retry_with_backoff(
            self.config.retry_attempts,
            self.config.retry_backoff,
            "committed_notes",
            || async move { Ok(notes.committed_notes(to).await?) },
        )
        .await?;
        Ok(sent.into_iter().filter(|n| n.sender == self.account).collect())
    }

    /// Send `amount` of the settlement asset to `to` as a signal or stake note.
    pub async fn send(&self, to: &AccountId, amount: u64, recall_height: Option<u64>) -> Result<NoteId> {
        let mut request = TransferRequest::new(
            self.account.clone(),
            to.clone(),
            self.config.faucet_id.clone(),
            amount,
        )
        .with_note_type(self.config.note_type);
        if let Some(height) = recall_height {
            request = request.with_recall_height(height);
        }
        self.transfer(request).await
    }

    pub async fn transfer(&self, request: TransferRequest) -> Result<NoteId> {
        let transfers = self.ports.transfers.as_ref();
        let request = &request;
        let note = retry_with_backoff(
            self.config.retry_attempts,
            self.config.retry_backoff,
            "submit",
            || async move { Ok(transfers.submit(request.clone()).await?) },
        )
        .await?;
        debug!(note = %note, to = %request.to, amount = request.amount, "transfer submitted");
        Ok(note)
    }

    pub async fn consume(&self, notes: &[NoteId]) -> Result<()> {
        let consumer = self.ports.consumer.as_ref();
        let account = &self.account;
        retry_with_backoff(
            self.config.retry_attempts,
            self.config.retry_backoff,
            "consume",
            || async move { Ok(consumer.consume(account, notes).await?) },
        )
        .await
    }
}

impl Drop for ArenaContext {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
