//! Snake draft driven by pick notes.
//!
//! My picks are validated locally, then published as `champion_id + 1`.
//! Opponent picks are read from the inbox in note order, each applied at
//! most once; one that arrives before its turn waits in the inbox. A
//! checkpoint is written after every mutation, and before each of my pick
//! notes goes out, so an interrupted pick can be reconciled with the chain.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use arena_engine::{Draft, EngineError, Picker, Role, TEAM_SIZE};

use crate::classifier::{decode_for_phase, MatchPhase, Signal};
use crate::context::ArenaContext;
use crate::error::Result;
use crate::persistence::{load_draft, save_draft, PersistedDraft};
use crate::ports::{AccountId, NoteId};
use crate::wire::{champion_from_pick, draft_pick_amount};

pub const DRAFT_KEY_PREFIX: &str = "arena:draft:";

pub fn draft_key(me: &AccountId, opponent: &AccountId) -> String {
    format!("{DRAFT_KEY_PREFIX}{me}:{opponent}")
}

pub struct DraftSession {
    ctx: Arc<ArenaContext>,
    opponent: AccountId,
    key: String,
    draft: Draft,
    /// Opponent notes already applied or dropped, in processing order.
    processed: Vec<NoteId>,
    /// My pick whose note may or may not have been published.
    pending_pick: Option<u8>,
    ignore: HashSet<NoteId>,
}

impl DraftSession {
    /// Resume from a valid checkpoint or start fresh.
    ///
    /// `ignore` lists opponent notes handled before the draft (lobby signals).
    pub fn open(
        ctx: Arc<ArenaContext>,
        role: Role,
        opponent: AccountId,
        ignore: HashSet<NoteId>,
    ) -> Result<Self> {
        let key = draft_key(ctx.account(), &opponent);
        let (draft, processed, pending_pick) = match load_draft(ctx.store(), &key, role)? {
            Some(restored) => {
                info!(
                    key,
                    pick_number = restored.draft.pick_number(),
                    pending_pick = ?restored.pending_pick,
                    "resuming draft"
                );
                (restored.draft, restored.processed, restored.pending_pick)
            }
            None => (Draft::new(role), Vec::new(), None),
        };
        Ok(Self {
            ctx,
            opponent,
            key,
            draft,
            processed,
            pending_pick,
            ignore,
        })
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn processed(&self) -> &[NoteId] {
        &self.processed
    }

    pub fn is_complete(&self) -> bool {
        self.draft.is_complete()
    }

    pub fn pending_pick(&self) -> Option<u8> {
        self.pending_pick
    }

    /// Submit my pick. Nothing is sent or mutated if the pick is illegal.
    ///
    /// An earlier pick left pending is reconciled first. If the send fails
    /// the pick stays pending until the chain shows whether it landed.
    pub async fn pick(&mut self, champion_id: u8) -> Result<()> {
        self.reconcile_pending().await?;
        let mut next = self.draft.clone();
        next.pick(Picker::Me, champion_id)?;
        let amount = draft_pick_amount(champion_id)?;

        self.pending_pick = Some(champion_id);
        if let Err(err) = self.checkpoint() {
            self.pending_pick = None;
            return Err(err);
        }
        self.ctx.send(&self.opponent, amount, None).await?;
        self.pending_pick = None;
        self.draft = next;
        info!(champion_id, pick_number = self.draft.pick_number(), "pick submitted");
        self.checkpoint()
    }

    /// Settle a pending pick against my notes on chain: apply it if its
    /// note is there, otherwise forget it so the turn is picked again.
    pub async fn reconcile_pending(&mut self) -> Result<()> {
        let Some(champion_id) = self.pending_pick else {
            return Ok(());
        };
        let amount = draft_pick_amount(champion_id)?;
        let landed = self
            .ctx
            .outbox(&self.opponent)
            .await?
            .iter()
            .any(|note| note.amount() == Some(amount));
        if landed {
            self.draft.pick(Picker::Me, champion_id)?;
            info!(champion_id, pick_number = self.draft.pick_number(), "pending pick found on chain");
        } else {
            warn!(champion_id, "pending pick never reached the chain, picking again");
        }
        self.pending_pick = None;
        self.checkpoint()
    }

    /// Apply pending opponent picks. Returns how many were applied.
    pub async fn ingest(&mut self) -> Result<usize> {
        let (_, inbox) = self.ctx.inbox().await?;
        let mut applied = 0;
        let mut changed = false;

        for (signal, note) in decode_for_phase(&inbox, &self.opponent, MatchPhase::Draft) {
            if self.draft.is_complete() {
                break;
            }
            if self.ignore.contains(&note.note_id) || self.processed.contains(&note.note_id) {
                continue;
            }
            if signal != Signal::DraftPick {
                debug!(note = %note.note_id, ?signal, "skipping non-pick note during draft");
                continue;
            }

            if self.draft.current_picker()? == Picker::Me {
                // stays unprocessed until the opponent's turn comes round
                debug!(note = %note.note_id, amount = note.amount, "opponent pick ahead of its turn");
                break;
            }
            let applied_pick = champion_from_pick(note.amount)
                .ok_or(EngineError::InvalidMove(note.amount))
                .and_then(|id| self.draft.pick(Picker::Opponent, id).map(|_| id));
            match applied_pick {
                Ok(champion_id) => {
                    applied += 1;
                    info!(
                        champion_id,
                        pick_number = self.draft.pick_number(),
                        "opponent pick applied"
                    );
                }
                Err(err) => {
                    warn!(note = %note.note_id, error = %err, "dropping invalid opponent pick");
                }
            }
            self.processed.push(note.note_id);
            changed = true;
        }

        if changed {
            self.checkpoint()?;
        }
        Ok(applied)
    }

    /// Drive the draft to completion, asking `choose` for each of my picks.
    ///
    /// Returns the final teams as (side A, side B).
    pub async fn run<F>(&mut self, mut choose: F) -> Result<([u8; TEAM_SIZE], [u8; TEAM_SIZE])>
    where
        F: FnMut(&Draft) -> u8,
    {
        let pacer = self.ctx.pacer();
        loop {
            pacer.check()?;
            match self.advance(&mut choose).await {
                Ok(()) => {}
                Err(err) if err.is_transient() => {
                    warn!(error = %err, "draft step failed");
                }
                Err(err) => return Err(err),
            }
            if self.draft.is_complete() {
                let teams = self.draft.teams_by_side()?;
                info!(?teams, "draft complete");
                self.ctx.store().remove(&self.key)?;
                return Ok(teams);
            }
            pacer.wait().await?;
        }
    }

    async fn advance<F>(&mut self, choose: &mut F) -> Result<()>
    where
        F: FnMut(&Draft) -> u8,
    {
        self.reconcile_pending().await?;
        self.ingest().await?;
        while !self.draft.is_complete() && self.draft.current_picker()? == Picker::Me {
            let champion_id = choose(&self.draft);
            self.pick(champion_id).await?;
        }
        Ok(())
    }

    fn checkpoint(&self) -> Result<()> {
        let persisted =
            PersistedDraft::capture(&self.draft, &self.processed).with_pending_pick(self.pending_pick);
        save_draft(self.ctx.store(), &self.key, &persisted)
    }
}

impl std::fmt::Debug for DraftSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftSession")
            .field("key", &self.key)
            .field("draft", &self.draft)
            .field("processed", &self.processed.len())
            .field("pending_pick", &self.pending_pick)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::ArenaConfig;
    use crate::context::Ports;
    use crate::mock::InMemoryChain;
    use crate::persistence::MemoryStore;
    use crate::error::ProtocolError;
    use crate::ports::{TransferRequest, TransferSubmitter};

    async fn session(chain: &InMemoryChain, role: Role) -> DraftSession {
        let config = ArenaConfig::default().with_poll_interval(Duration::from_millis(10));
        let me = AccountId::new(format!("{role:?}"));
        chain.fund(&me, &config.faucet_id, 1_000);
        let ports = Ports::from_chain(Arc::new(chain.clone()), Arc::new(MemoryStore::new()));
        let ctx = ArenaContext::init(me, ports, config).await.unwrap();
        DraftSession::open(ctx, role, AccountId::new("rival"), HashSet::new()).unwrap()
    }

    async fn opponent_pick(chain: &InMemoryChain, to: &str, champion_id: u8) -> NoteId {
        let rival = AccountId::new("rival");
        let faucet = ArenaConfig::default().faucet_id;
        chain.fund(&rival, &faucet, 100);
        let request = TransferRequest::new(
            rival,
            AccountId::new(to),
            faucet,
            draft_pick_amount(champion_id).unwrap(),
        );
        chain.submit(request).await.unwrap()
    }

    #[tokio::test]
    async fn illegal_pick_sends_nothing() {
        let chain = InMemoryChain::new();
        let mut host = session(&chain, Role::Host).await;

        host.pick(3).await.unwrap();
        assert_eq!(chain.submitted().len(), 1);
        assert_eq!(chain.submitted()[0].amount, 4);

        // the joiner picks next
        let err = host.pick(4).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Engine(EngineError::OutOfTurn { pick_number: 1 })));
        assert_eq!(chain.submitted().len(), 1);
        assert_eq!(host.draft().my_team(), [3]);
    }

    #[tokio::test]
    async fn opponent_picks_apply_once_in_order() {
        let chain = InMemoryChain::new();
        let mut host = session(&chain, Role::Host).await;
        host.pick(0).await.unwrap();

        let first = opponent_pick(&chain, "Host", 1).await;
        let second = opponent_pick(&chain, "Host", 2).await;
        assert_eq!(host.ingest().await.unwrap(), 2);
        assert_eq!(host.draft().opponent_team(), [1, 2]);
        assert_eq!(host.processed(), [first, second]);

        // redelivery of the same notes changes nothing
        assert_eq!(host.ingest().await.unwrap(), 0);
        assert_eq!(host.draft().pick_number(), 3);
    }

    #[tokio::test]
    async fn early_picks_wait_and_taken_picks_are_dropped() {
        let chain = InMemoryChain::new();
        let mut host = session(&chain, Role::Host).await;

        let early = opponent_pick(&chain, "Host", 5).await;
        assert_eq!(host.ingest().await.unwrap(), 0);
        assert!(host.processed().is_empty());
        assert_eq!(host.draft().pick_number(), 0);

        host.pick(0).await.unwrap();
        assert_eq!(host.ingest().await.unwrap(), 1);
        assert_eq!(host.draft().opponent_team(), [5]);
        assert_eq!(host.processed(), [early.clone()]);

        let taken = opponent_pick(&chain, "Host", 0).await;
        assert_eq!(host.ingest().await.unwrap(), 0);
        assert_eq!(host.draft().opponent_team(), [5]);
        assert_eq!(host.processed(), [early, taken]);
    }

    #[tokio::test]
    async fn reopening_resumes_from_the_checkpoint() {
        let chain = InMemoryChain::new();
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let config = ArenaConfig::default();
        let me = AccountId::new("Joiner");
        chain.fund(&me, &config.faucet_id, 1_000);
        let ports = Ports::from_chain(Arc::new(chain.clone()), store.clone());
        let ctx = ArenaContext::init(me, ports, config).await.unwrap();
        let rival = AccountId::new("rival");

        let mut joiner = DraftSession::open(ctx.clone(), Role::Joiner, rival.clone(), HashSet::new()).unwrap();
        let host_pick = opponent_pick(&chain, "Joiner", 0).await;
        joiner.ingest().await.unwrap();
        joiner.pick(7).await.unwrap();
        drop(joiner);

        let resumed = DraftSession::open(ctx, Role::Joiner, rival, HashSet::new()).unwrap();
        assert_eq!(resumed.draft().pick_number(), 2);
        assert_eq!(resumed.draft().my_team(), [7]);
        assert_eq!(resumed.draft().opponent_team(), [0]);
        assert_eq!(resumed.processed(), [host_pick]);
    }

    /// A host context over `store`, with a checkpoint written as if `pick(3)`
    /// was interrupted right after its marker was saved.
    async fn host_with_pending_pick(chain: &InMemoryChain, store: Arc<MemoryStore>) -> Arc<ArenaContext> {
        let config = ArenaConfig::default().with_poll_interval(Duration::from_millis(10));
        let me = AccountId::new("Host");
        chain.fund(&me, &config.faucet_id, 1_000);
        let persisted = PersistedDraft::capture(&Draft::new(Role::Host), &[]).with_pending_pick(Some(3));
        save_draft(store.as_ref(), &draft_key(&me, &AccountId::new("rival")), &persisted).unwrap();
        let ports = Ports::from_chain(Arc::new(chain.clone()), store);
        ArenaContext::init(me, ports, config).await.unwrap()
    }

    fn picks_sent_by(chain: &InMemoryChain, sender: &str) -> Vec<u64> {
        chain
            .submitted()
            .into_iter()
            .filter(|r| r.from == AccountId::new(sender))
            .map(|r| r.amount)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn published_pending_pick_is_applied_on_resume() {
        let chain = InMemoryChain::new();
        let ctx = host_with_pending_pick(&chain, Arc::new(MemoryStore::new())).await;
        // the pick note landed before the process went away
        ctx.send(&AccountId::new("rival"), draft_pick_amount(3).unwrap(), None)
            .await
            .unwrap();
        for champion_id in [2, 5, 9] {
            opponent_pick(&chain, "Host", champion_id).await;
        }

        let mut host = DraftSession::open(ctx, Role::Host, AccountId::new("rival"), HashSet::new()).unwrap();
        assert_eq!(host.pending_pick(), Some(3));
        assert_eq!(host.draft().pick_number(), 0);

        let teams = host.run(|d| d.pool()[0]).await.unwrap();
        assert_eq!(teams, ([3, 0, 1], [2, 5, 9]));
        assert_eq!(host.pending_pick(), None);
        assert_eq!(host.processed().len(), 3);
        // champion 3 was published exactly once
        assert_eq!(picks_sent_by(&chain, "Host"), [4, 1, 2]);
    }

    #[tokio::test]
    async fn unpublished_pending_pick_is_picked_again() {
        let chain = InMemoryChain::new();
        let ctx = host_with_pending_pick(&chain, Arc::new(MemoryStore::new())).await;

        let mut host = DraftSession::open(ctx, Role::Host, AccountId::new("rival"), HashSet::new()).unwrap();
        host.pick(6).await.unwrap();
        assert_eq!(host.pending_pick(), None);
        assert_eq!(host.draft().my_team(), [6]);
        assert_eq!(picks_sent_by(&chain, "Host"), [7]);
    }
}
