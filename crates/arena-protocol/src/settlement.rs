//! Stake lock, opponent-stake consumption and withdrawal.
//!
//! Each side locks [`STAKE_AMOUNT`] in a note addressed to the opponent with a
//! recall height. When the match ends the winner consumes the loser's stake
//! and reclaims its own once the recall height passes; on a draw both sides
//! reclaim their own; the loser collects nothing.

use std::collections::HashMap;

use tracing::{info, warn};

use arena_engine::{MatchResult, Side};

use crate::context::ArenaContext;
use crate::error::{ProtocolError, Result};
use crate::poller::{poll_until, Step};
use crate::ports::{AccountId, NoteId};
use crate::wire::STAKE_AMOUNT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeState {
    Unstaked,
    /// Own stake locked, opponent's not seen yet.
    Staked,
    BothStaked,
    MatchOver,
    Withdrawn,
}

impl StakeState {
    fn name(self) -> &'static str {
        match self {
            StakeState::Unstaked => "unstaked",
            StakeState::Staked => "staked",
            StakeState::BothStaked => "both staked",
            StakeState::MatchOver => "match over",
            StakeState::Withdrawn => "withdrawn",
        }
    }
}

/// Amount withdrawn at match end: two stakes for the winner, one on a draw,
/// nothing for the loser.
pub fn withdrawal_amount(result: MatchResult, my_side: Side, stake: u64) -> u64 {
    match result {
        MatchResult::Winner(side) if side == my_side => stake.saturating_mul(2),
        MatchResult::Winner(_) => 0,
        MatchResult::Draw => stake,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    InFlight,
    Done,
}

/// Per-note one-shot consumption guard.
///
/// `Idle -> InFlight` on attempt, `InFlight -> Done` on success and
/// `InFlight -> Idle` on failure so the attempt can be retried.
#[derive(Debug, Default)]
pub struct ConsumeGuard {
    states: HashMap<NoteId, GuardState>,
}

impl ConsumeGuard {
    pub fn state(&self, note: &NoteId) -> GuardState {
        self.states.get(note).copied().unwrap_or(GuardState::Idle)
    }

    /// Claim `note` for one attempt. False if in flight or done.
    pub fn try_begin(&mut self, note: &NoteId) -> bool {
        if self.state(note) != GuardState::Idle {
            return false;
        }
        self.states.insert(note.clone(), GuardState::InFlight);
        true
    }

    pub fn complete(&mut self, note: &NoteId) {
        if self.state(note) == GuardState::InFlight {
            self.states.insert(note.clone(), GuardState::Done);
        }
    }

    pub fn rollback(&mut self, note: &NoteId) {
        if self.state(note) == GuardState::InFlight {
            self.states.remove(note);
        }
    }
}

#[derive(Debug)]
pub struct Settlement {
    side: Side,
    stake: u64,
    state: StakeState,
    own_stake: Option<(NoteId, u64)>,
    opponent_stake: Option<NoteId>,
    result: Option<MatchResult>,
    guard: ConsumeGuard,
}

impl Settlement {
    pub fn new(side: Side) -> Self {
        Self::with_stake(side, STAKE_AMOUNT)
    }

    pub fn with_stake(side: Side, stake: u64) -> Self {
        Self {
            side,
            stake,
            state: StakeState::Unstaked,
            own_stake: None,
            opponent_stake: None,
            result: None,
            guard: ConsumeGuard::default(),
        }
    }

    pub fn state(&self) -> StakeState {
        self.state
    }

    pub fn stake(&self) -> u64 {
        self.stake
    }

    pub fn own_stake_note(&self) -> Option<&NoteId> {
        self.own_stake.as_ref().map(|(id, _)| id)
    }

    pub fn opponent_stake_note(&self) -> Option<&NoteId> {
        self.opponent_stake.as_ref()
    }

    pub fn guard(&self) -> &ConsumeGuard {
        &self.guard
    }

    /// Record our own locked stake.
    pub fn record_own_stake(&mut self, note: NoteId, recall_height: u64) -> Result<()> {
        if self.state != StakeState::Unstaked {
            return Err(self.invalid("record own stake"));
        }
        info!(note = %note, recall_height, "stake locked");
        self.own_stake = Some((note, recall_height));
        self.state = if self.opponent_stake.is_some() {
            StakeState::BothStaked
        } else {
            StakeState::Staked
        };
        Ok(())
    }

    /// Record the opponent's stake note. Repeats of the same note are no-ops.
    pub fn observe_opponent_stake(&mut self, note: NoteId) -> Result<()> {
        match &self.opponent_stake {
            Some(existing) if *existing == note => return Ok(()),
            Some(existing) => {
                warn!(note = %note, kept = %existing, "ignoring second opponent stake");
                return Ok(());
            }
            None => {}
        }
        if matches!(self.state, StakeState::MatchOver | StakeState::Withdrawn) {
            return Err(self.invalid("observe opponent stake"));
        }
        info!(note = %note, "opponent stake observed");
        self.opponent_stake = Some(note);
        if self.state == StakeState::Staked {
            self.state = StakeState::BothStaked;
        }
        Ok(())
    }

    /// Lock our stake with the opponent, recallable after the configured horizon.
    pub async fn lock(&mut self, ctx: &ArenaContext, opponent: &AccountId) -> Result<NoteId> {
        if self.state != StakeState::Unstaked {
            return Err(self.invalid("lock stake"));
        }
        let height = ctx.sync().await?;
        let recall_height = height + ctx.config().recall_blocks;
        let note = ctx.send(opponent, self.stake, Some(recall_height)).await?;
        self.record_own_stake(note.clone(), recall_height)?;
        Ok(note)
    }

    /// The match ended. Only a staked side has anything to settle.
    pub fn finish(&mut self, result: MatchResult) -> Result<u64> {
        if !matches!(self.state, StakeState::Staked | StakeState::BothStaked) {
            return Err(self.invalid("finish match"));
        }
        self.result = Some(result);
        self.state = StakeState::MatchOver;
        let amount = self.payout();
        info!(?result, side = ?self.side, amount, "match settled");
        Ok(amount)
    }

    /// Withdrawal amount for the terminal outcome. Zero before the match ends.
    pub fn payout(&self) -> u64 {
        match self.result {
            Some(result) => withdrawal_amount(result, self.side, self.stake),
            None => 0,
        }
    }

    /// Consume one stake note at most once.
    pub async fn consume_guarded(&mut self, ctx: &ArenaContext, note: &NoteId) -> Result<()> {
        if !self.guard.try_begin(note) {
            return Err(ProtocolError::GuardBusy(note.clone()));
        }
        match ctx.consume(std::slice::from_ref(note)).await {
            Ok(()) => {
                self.guard.complete(note);
                info!(note = %note, "stake note consumed");
                Ok(())
            }
            Err(err) => {
                self.guard.rollback(note);
                warn!(note = %note, error = %err, "stake consumption failed");
                Err(err)
            }
        }
    }

    /// Collect what the outcome entitles us to and forward it to `payout_to`.
    ///
    /// Safe to call again after a failure: consumed notes are skipped.
    pub async fn settle(&mut self, ctx: &ArenaContext, payout_to: &AccountId) -> Result<u64> {
        let Some(result) = self.result else {
            return Err(self.invalid("settle"));
        };
        if self.state == StakeState::Withdrawn {
            return Err(self.invalid("settle"));
        }
        let won = result == MatchResult::Winner(self.side);
        let draw = result == MatchResult::Draw;

        if won {
            if let Some(note) = self.opponent_stake.clone() {
                if self.guard.state(&note) != GuardState::Done {
                    self.consume_guarded(ctx, &note).await?;
                }
            }
        }
        if won || draw {
            if let Some((note, recall_height)) = self.own_stake.clone() {
                if self.guard.state(&note) != GuardState::Done {
                    wait_for_height(ctx, recall_height).await?;
                    self.consume_guarded(ctx, &note).await?;
                }
            }
        }

        let amount = self.payout();
        if amount > 0 {
            ctx.send(payout_to, amount, None).await?;
        }
        self.state = StakeState::Withdrawn;
        info!(amount, to = %payout_to, "stake withdrawn");
        Ok(amount)
    }

    fn invalid(&self, action: &'static str) -> ProtocolError {
        ProtocolError::InvalidState {
            action,
            state: self.state.name(),
        }
    }
}

async fn wait_for_height(ctx: &ArenaContext, height: u64) -> Result<()> {
    let pacer = ctx.pacer();
    poll_until(&pacer, || async move {
        let current = ctx.sync().await?;
        Ok(if current >= height {
            Step::Done(())
        } else {
            Step::Pending
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_is_a_function_of_the_outcome() {
        let stake = STAKE_AMOUNT;
        assert_eq!(withdrawal_amount(MatchResult::Winner(Side::A), Side::A, stake), 2 * stake);
        assert_eq!(withdrawal_amount(MatchResult::Winner(Side::B), Side::A, stake), 0);
        assert_eq!(withdrawal_amount(MatchResult::Draw, Side::A, stake), stake);
        assert_eq!(withdrawal_amount(MatchResult::Draw, Side::B, stake), stake);
        assert_eq!(withdrawal_amount(MatchResult::Winner(Side::B), Side::B, stake), 2 * stake);
    }

    #[test]
    fn guard_transitions() {
        let mut guard = ConsumeGuard::default();
        let note = NoteId::new("stake");
        assert_eq!(guard.state(&note), GuardState::Idle);
        assert!(guard.try_begin(&note));
        assert_eq!(guard.state(&note), GuardState::InFlight);
        assert!(!guard.try_begin(&note));

        guard.rollback(&note);
        assert_eq!(guard.state(&note), GuardState::Idle);

        assert!(guard.try_begin(&note));
        guard.complete(&note);
        assert_eq!(guard.state(&note), GuardState::Done);
        assert!(!guard.try_begin(&note));
        // rollback never reopens a finished note
        guard.rollback(&note);
        assert_eq!(guard.state(&note), GuardState::Done);
    }

    #[test]
    fn stake_state_machine() {
        let mut settlement = Settlement::new(Side::A);
        assert_eq!(settlement.state(), StakeState::Unstaked);
        assert!(settlement.finish(MatchResult::Draw).is_err());

        settlement.record_own_stake(NoteId::new("own"), 900).unwrap();
        assert_eq!(settlement.state(), StakeState::Staked);
        assert!(settlement.record_own_stake(NoteId::new("again"), 900).is_err());

        settlement.observe_opponent_stake(NoteId::new("theirs")).unwrap();
        settlement.observe_opponent_stake(NoteId::new("theirs")).unwrap();
        assert_eq!(settlement.state(), StakeState::BothStaked);

        assert_eq!(settlement.payout(), 0);
        assert_eq!(settlement.finish(MatchResult::Winner(Side::A)).unwrap(), 2 * STAKE_AMOUNT);
        assert_eq!(settlement.state(), StakeState::MatchOver);
        assert!(settlement.finish(MatchResult::Draw).is_err());
    }

    #[test]
    fn opponent_stake_may_arrive_first() {
        let mut settlement = Settlement::with_stake(Side::B, 5);
        settlement.observe_opponent_stake(NoteId::new("theirs")).unwrap();
        assert_eq!(settlement.state(), StakeState::Unstaked);
        settlement.record_own_stake(NoteId::new("own"), 10).unwrap();
        assert_eq!(settlement.state(), StakeState::BothStaked);
        assert_eq!(settlement.finish(MatchResult::Winner(Side::A)).unwrap(), 0);
    }
}
