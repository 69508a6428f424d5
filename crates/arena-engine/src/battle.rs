//! Match state across rounds: both teams, the battle log and the terminal
//! outcome.

use crate::champions::get_champion;
use crate::combat::{init_champion_state, is_team_eliminated, resolve_round, validate_action, Teams};
use crate::draft::TEAM_SIZE;
use crate::error::{EngineError, Result};
use crate::pack::pack_champion_state;
use crate::types::{
    ChampionState, ForfeitReason, MatchOutcome, MatchResult, Mvp, Side, Submission, TurnAction,
    TurnRecord,
};

/// Rounds after which a match with both teams standing ends in a draw.
pub const DEFAULT_MAX_ROUNDS: u32 = 30;

#[derive(Clone, Debug)]
pub struct Battle {
    teams: Teams,
    active: [usize; 2],
    pending_selection: [bool; 2],
    log: Vec<TurnRecord>,
    max_rounds: u32,
    outcome: Option<MatchOutcome>,
}

impl Battle {
    pub fn new(team_a: [u8; TEAM_SIZE], team_b: [u8; TEAM_SIZE]) -> Result<Self> {
        let mut seen = [false; crate::champions::CHAMPION_COUNT];
        for &id in team_a.iter().chain(team_b.iter()) {
            get_champion(id).ok_or(EngineError::UnknownChampion(id))?;
            if std::mem::replace(&mut seen[id as usize], true) {
                return Err(EngineError::InvalidTeam("champion drafted twice"));
            }
        }
        let team_a = [
            init_champion_state(team_a[0])?,
            init_champion_state(team_a[1])?,
            init_champion_state(team_a[2])?,
        ];
        let team_b = [
            init_champion_state(team_b[0])?,
            init_champion_state(team_b[1])?,
            init_champion_state(team_b[2])?,
        ];
        Ok(Self {
            teams: [team_a, team_b],
            active: [0, 0],
            pending_selection: [false, false],
            log: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            outcome: None,
        })
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn team(&self, side: Side) -> &[ChampionState; TEAM_SIZE] {
        &self.teams[side.index()]
    }

    pub fn champion(&self, side: Side, champion_id: u8) -> Option<&ChampionState> {
        self.teams[side.index()].iter().find(|s| s.id == champion_id)
    }

    /// The champion currently fielded by `side`, if any is still standing.
    pub fn active_champion(&self, side: Side) -> Option<&ChampionState> {
        let team = &self.teams[side.index()];
        let slot = self.active[side.index()];
        if team[slot].is_alive() {
            Some(&team[slot])
        } else {
            team.iter().find(|s| s.is_alive())
        }
    }

    /// True once `side`'s active champion was knocked out and no replacement
    /// has been chosen. A default replacement is already fielded.
    pub fn needs_selection(&self, side: Side) -> bool {
        self.pending_selection[side.index()]
    }

    pub fn select_active(&mut self, side: Side, champion_id: u8) -> Result<()> {
        let team = &self.teams[side.index()];
        let slot = team
            .iter()
            .position(|s| s.id == champion_id && s.is_alive())
            .ok_or(EngineError::ChampionUnavailable { side, champion_id })?;
        self.active[side.index()] = slot;
        self.pending_selection[side.index()] = false;
        Ok(())
    }

    /// Validate a move before committing to it.
    pub fn check_action(&self, side: Side, action: &TurnAction) -> Result<()> {
        match validate_action(&self.teams[side.index()], action) {
            Ok(_) => Ok(()),
            Err(ForfeitReason::InvalidAbility) => Err(EngineError::InvalidAbility {
                champion_id: action.champion_id,
                ability_index: action.ability_index,
            }),
            Err(_) => Err(EngineError::ChampionUnavailable {
                side,
                champion_id: action.champion_id,
            }),
        }
    }

    /// Number of the round currently being played (1-based).
    pub fn round(&self) -> u32 {
        self.log.len() as u32 + 1
    }

    pub fn log(&self) -> &[TurnRecord] {
        &self.log
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Resolve the current round from both sides' verified submissions.
    pub fn resolve_round(&mut self, action_a: Submission, action_b: Submission) -> Result<&TurnRecord> {
        if self.is_over() {
            return Err(EngineError::MatchOver);
        }
        let round = self.round();
        let submissions = [action_a, action_b];
        let fallback = [
            self.fallback_slot(Side::A),
            self.fallback_slot(Side::B),
        ];
        let acting = [Side::A, Side::B].map(|side| {
            submissions[side.index()]
                .action()
                .and_then(|action| validate_action(&self.teams[side.index()], action).ok())
        });
        let events = resolve_round(&mut self.teams, submissions, fallback);

        for side in [Side::A, Side::B] {
            let i = side.index();
            if let Some(slot) = acting[i] {
                self.active[i] = slot;
                self.pending_selection[i] = false;
            }
            if self.teams[i][self.active[i]].is_ko && !is_team_eliminated(&self.teams[i]) {
                if let Some(slot) = self.teams[i].iter().position(|s| s.is_alive()) {
                    self.active[i] = slot;
                    self.pending_selection[i] = true;
                }
            }
        }

        self.log.push(TurnRecord {
            round,
            action_a,
            action_b,
            events,
        });

        let eliminated_a = is_team_eliminated(&self.teams[0]);
        let eliminated_b = is_team_eliminated(&self.teams[1]);
        let result = match (eliminated_a, eliminated_b) {
            (true, true) => Some(MatchResult::Draw),
            (true, false) => Some(MatchResult::Winner(Side::B)),
            (false, true) => Some(MatchResult::Winner(Side::A)),
            (false, false) if round >= self.max_rounds => Some(MatchResult::Draw),
            (false, false) => None,
        };
        if let Some(result) = result {
            self.conclude(result);
        }

        // just pushed
        Ok(&self.log[self.log.len() - 1])
    }

    /// End the match with `result` (e.g. after a timeout claim). A match that
    /// is already over keeps its first outcome.
    pub fn conclude(&mut self, result: MatchResult) -> MatchOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = MatchOutcome {
            result,
            total_rounds: self.log.len() as u32,
            mvp: self.mvp(),
        };
        self.outcome = Some(outcome);
        outcome
    }

    /// Highest damage dealer so far. Ties go to side A, then the lower slot.
    pub fn mvp(&self) -> Option<Mvp> {
        let mut best: Option<Mvp> = None;
        for side in [Side::A, Side::B] {
            for state in self.teams[side.index()].iter() {
                if state.total_damage_dealt == 0 {
                    continue;
                }
                if best.map_or(true, |b| state.total_damage_dealt > b.damage_dealt) {
                    best = Some(Mvp {
                        side,
                        champion_id: state.id,
                        damage_dealt: state.total_damage_dealt,
                    });
                }
            }
        }
        best
    }

    /// Packed state words of `side`'s team, in team order.
    pub fn state_words(&self, side: Side) -> Result<[[u64; 4]; TEAM_SIZE]> {
        let team = &self.teams[side.index()];
        Ok([
            pack_champion_state(&team[0])?,
            pack_champion_state(&team[1])?,
            pack_champion_state(&team[2])?,
        ])
    }

    fn fallback_slot(&self, side: Side) -> usize {
        let team = &self.teams[side.index()];
        let slot = self.active[side.index()];
        if team[slot].is_alive() {
            slot
        } else {
            team.iter().position(|s| s.is_alive()).unwrap_or(slot)
        }
    }
}
