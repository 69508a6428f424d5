//! Commit/reveal rounds driven by notes.
//!
//! Per round each side publishes two commit notes, then (once both
//! commitments are complete) three reveal notes: the move and the two nonce
//! halves. Opponent notes are consumed in note order. A round resolves when
//! my reveal is fully sent and the opponent's reveal is complete.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use arena_engine::{
    decode_move, encode_move, Battle, EngineError, ForfeitReason, MatchOutcome, MatchResult, Role, Side,
    Submission, TurnAction, TEAM_SIZE,
};

use crate::classifier::{decode_for_phase, MatchPhase, Signal};
use crate::commitment::{create_commitment, create_reveal, verify_reveal, CommitData, RevealData};
use crate::context::ArenaContext;
use crate::error::{CommitError, ProtocolError, Result};
use crate::ports::{AccountId, NoteId};
use crate::wire::{commit_amount, commit_part};

const COMMIT_NOTES: usize = 2;
const REVEAL_NOTES: usize = 3;

/// Commit/reveal progress of one side within a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoundProgress {
    None,
    Committed,
    Revealed,
}

#[derive(Debug, Default)]
struct RoundState {
    my_commit: Option<CommitData>,
    commits_sent: usize,
    reveals_sent: usize,
    opponent_commit: Vec<u64>,
    opponent_reveal: Vec<u64>,
    started_at: u64,
}

impl RoundState {
    fn starting_at(height: u64) -> Self {
        Self {
            started_at: height,
            ..Self::default()
        }
    }

    fn my_progress(&self) -> RoundProgress {
        if self.reveals_sent == REVEAL_NOTES {
            RoundProgress::Revealed
        } else if self.commits_sent == COMMIT_NOTES {
            RoundProgress::Committed
        } else {
            RoundProgress::None
        }
    }

    fn opponent_progress(&self) -> RoundProgress {
        if self.opponent_reveal.len() == REVEAL_NOTES {
            RoundProgress::Revealed
        } else if self.opponent_commit.len() == COMMIT_NOTES {
            RoundProgress::Committed
        } else {
            RoundProgress::None
        }
    }
}

pub struct BattleSession {
    ctx: Arc<ArenaContext>,
    opponent: AccountId,
    side: Side,
    battle: Battle,
    ignore: HashSet<NoteId>,
    processed: HashSet<NoteId>,
    round: RoundState,
}

impl BattleSession {
    /// `teams` are (side A, side B) as returned by the draft. `ignore` holds
    /// every opponent note handled before the battle.
    pub async fn start(
        ctx: Arc<ArenaContext>,
        role: Role,
        opponent: AccountId,
        teams: ([u8; TEAM_SIZE], [u8; TEAM_SIZE]),
        ignore: HashSet<NoteId>,
    ) -> Result<Self> {
        let battle = Battle::new(teams.0, teams.1)?.with_max_rounds(ctx.config().max_rounds);
        let height = ctx.sync().await?;
        info!(side = ?role.side(), ?teams, "battle started");
        Ok(Self {
            ctx,
            opponent,
            side: role.side(),
            battle,
            ignore,
            processed: HashSet::new(),
            round: RoundState::starting_at(height),
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.battle.outcome()
    }

    pub fn my_progress(&self) -> RoundProgress {
        self.round.my_progress()
    }

    pub fn opponent_progress(&self) -> RoundProgress {
        self.round.opponent_progress()
    }

    /// Commit to `action` for the current round. Validated before anything
    /// is published.
    pub fn commit(&mut self, action: TurnAction) -> Result<()> {
        if self.battle.is_over() {
            return Err(EngineError::MatchOver.into());
        }
        if self.round.my_commit.is_some() {
            return Err(ProtocolError::InvalidState {
                action: "commit",
                state: "committed",
            });
        }
        self.battle.check_action(self.side, &action)?;
        let commit = create_commitment(encode_move(&action)?)?;
        debug!(round = self.battle.round(), ?action, "move committed locally");
        self.round.my_commit = Some(commit);
        Ok(())
    }

    /// Publish whatever part of my commit or reveal is due. Each note is sent
    /// once; a failure resumes at the first unsent note.
    pub async fn submit_pending(&mut self) -> Result<bool> {
        let Some(commit) = self.round.my_commit.clone() else {
            return Ok(false);
        };
        let mut progressed = false;

        let commit_notes = [commit.part1, commit.part2];
        while self.round.commits_sent < COMMIT_NOTES {
            let part = commit_notes[self.round.commits_sent];
            let amount = commit_amount(part).ok_or(CommitError::InvalidCommitPart(part))?;
            self.ctx.send(&self.opponent, amount, None).await?;
            self.round.commits_sent += 1;
            progressed = true;
        }
        if self.round.commits_sent == COMMIT_NOTES && progressed {
            info!(round = self.battle.round(), "commitment submitted");
        }

        if self.round.opponent_commit.len() == COMMIT_NOTES {
            let reveal = create_reveal(&commit);
            let reveal_notes = [reveal.move_value, reveal.nonce_part1, reveal.nonce_part2];
            let was_revealed = self.round.reveals_sent == REVEAL_NOTES;
            while self.round.reveals_sent < REVEAL_NOTES {
                let amount = reveal_notes[self.round.reveals_sent];
                self.ctx.send(&self.opponent, amount, None).await?;
                self.round.reveals_sent += 1;
                progressed = true;
            }
            if !was_revealed {
                info!(round = self.battle.round(), "reveal submitted");
            }
        }
        Ok(progressed)
    }

    /// Read opponent commit and reveal notes for the current round.
    pub async fn ingest(&mut self) -> Result<bool> {
        let (_, inbox) = self.ctx.inbox().await?;
        let mut progressed = false;

        for (signal, note) in decode_for_phase(&inbox, &self.opponent, MatchPhase::Battle) {
            if self.ignore.contains(&note.note_id) || self.processed.contains(&note.note_id) {
                continue;
            }
            match signal {
                Signal::Commit => {
                    if self.round.opponent_commit.len() == COMMIT_NOTES {
                        // next round's commitment
                        break;
                    }
                    let Some(part) = commit_part(note.amount) else {
                        continue;
                    };
                    self.round.opponent_commit.push(part);
                }
                Signal::Reveal => {
                    if self.round.opponent_commit.len() < COMMIT_NOTES {
                        warn!(note = %note.note_id, amount = note.amount, "reveal before commitment, dropping");
                    } else if self.round.opponent_reveal.len() == REVEAL_NOTES {
                        break;
                    } else {
                        self.round.opponent_reveal.push(note.amount);
                    }
                }
                _ => continue,
            }
            self.processed.insert(note.note_id);
            progressed = true;
        }

        if progressed {
            debug!(
                round = self.battle.round(),
                commit = self.round.opponent_commit.len(),
                reveal = self.round.opponent_reveal.len(),
                "opponent notes ingested"
            );
        }
        Ok(progressed)
    }

    /// Resolve the round once both reveals are complete.
    pub async fn try_resolve(&mut self) -> Result<bool> {
        if self.round.reveals_sent < REVEAL_NOTES || self.round.opponent_reveal.len() < REVEAL_NOTES {
            return Ok(false);
        }
        let Some(commit) = self.round.my_commit.as_ref() else {
            return Ok(false);
        };
        let mine = Submission::Action(decode_move(commit.move_value)?);
        let theirs = self.opponent_submission();
        let (action_a, action_b) = match self.side {
            Side::A => (mine, theirs),
            Side::B => (theirs, mine),
        };

        let record = self.battle.resolve_round(action_a, action_b)?;
        info!(
            round = record.round,
            ?action_a,
            ?action_b,
            events = record.events.len(),
            "round resolved"
        );
        if let Some(outcome) = self.battle.outcome() {
            info!(result = ?outcome.result, rounds = outcome.total_rounds, "match over");
        }

        // the round is resolved; its state must not survive a failed sync
        let previous_start = self.round.started_at;
        self.round = RoundState::starting_at(previous_start);
        match self.ctx.sync().await {
            Ok(height) => self.round.started_at = height,
            Err(err) => {
                warn!(error = %err, round = self.battle.round(), "sync failed, next round keeps the previous start height");
            }
        }
        Ok(true)
    }

    fn opponent_submission(&self) -> Submission {
        let parts = &self.round.opponent_reveal;
        let reveal = RevealData {
            move_value: parts[0],
            nonce_part1: parts[1],
            nonce_part2: parts[2],
        };
        let commit = &self.round.opponent_commit;
        if let Err(err) = verify_reveal(&reveal, commit[0], commit[1]) {
            warn!(round = self.battle.round(), error = %err, "opponent reveal rejected");
            return Submission::Forfeit(ForfeitReason::CommitmentMismatch);
        }
        match decode_move(reveal.move_value) {
            Ok(action) => {
                debug!(round = self.battle.round(), ?action, "opponent reveal verified");
                Submission::Action(action)
            }
            Err(err) => {
                warn!(round = self.battle.round(), error = %err, "opponent revealed an invalid move");
                Submission::Forfeit(ForfeitReason::InvalidMove)
            }
        }
    }

    /// One poll iteration: commit if needed, publish, ingest, resolve.
    pub async fn step<F>(&mut self, choose: &mut F) -> Result<bool>
    where
        F: FnMut(&Battle, Side) -> TurnAction,
    {
        if self.battle.is_over() {
            return Ok(false);
        }
        if self.round.my_commit.is_none() {
            let action = choose(&self.battle, self.side);
            self.commit(action)?;
        }
        let mut progressed = self.submit_pending().await?;
        progressed |= self.ingest().await?;
        // the opponent's commitment may have just completed
        progressed |= self.submit_pending().await?;
        progressed |= self.try_resolve().await?;
        Ok(progressed)
    }

    /// Play until the match ends, claiming a timeout if the opponent stalls
    /// past the configured horizon.
    pub async fn run<F>(&mut self, mut choose: F) -> Result<MatchOutcome>
    where
        F: FnMut(&Battle, Side) -> TurnAction,
    {
        let pacer = self.ctx.pacer();
        loop {
            pacer.check()?;
            match self.step(&mut choose).await {
                Ok(true) => {}
                Ok(false) => match self.claim_timeout().await {
                    Ok(_) | Err(ProtocolError::TimeoutNotReached { .. }) => {}
                    Err(err) if err.is_transient() => {
                        warn!(error = %err, "timeout check failed");
                    }
                    Err(err) => return Err(err),
                },
                Err(err) if err.is_transient() => {
                    warn!(error = %err, "battle step failed");
                }
                Err(err) => return Err(err),
            }
            if let Some(outcome) = self.battle.outcome() {
                return Ok(*outcome);
            }
            pacer.wait().await?;
        }
    }

    /// End a stalled round by commit/reveal progress. Allowed only once the
    /// round has been open for more than the recall horizon.
    pub async fn claim_timeout(&mut self) -> Result<MatchOutcome> {
        if let Some(outcome) = self.battle.outcome() {
            return Ok(*outcome);
        }
        let current = self.ctx.sync().await?;
        let required = self.round.started_at + self.ctx.config().recall_blocks;
        if current <= required {
            return Err(ProtocolError::TimeoutNotReached { current, required });
        }
        self.ingest().await?;

        let mine = self.round.my_progress();
        let theirs = self.round.opponent_progress();
        let result = match mine.cmp(&theirs) {
            std::cmp::Ordering::Greater => MatchResult::Winner(self.side),
            std::cmp::Ordering::Less => MatchResult::Winner(self.side.opponent()),
            std::cmp::Ordering::Equal => MatchResult::Draw,
        };
        let outcome = self.battle.conclude(result);
        warn!(
            round = self.battle.round(),
            ?mine,
            ?theirs,
            ?result,
            "round timed out, match concluded"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for BattleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleSession")
            .field("side", &self.side)
            .field("round", &self.battle.round())
            .field("state", &self.round)
            .finish()
    }
}

/// First usable ability of the first standing champion.
pub fn first_standing_attack(battle: &Battle, side: Side) -> TurnAction {
    let champion_id = battle
        .active_champion(side)
        .map(|c| c.id)
        .unwrap_or_default();
    TurnAction {
        champion_id,
        ability_index: 0,
    }
}
