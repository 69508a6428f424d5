//! Snake draft: six picks in the order A, B, B, A, A, B over a pool of ten
//! champions, three per team.

use crate::champions::CHAMPION_COUNT;
use crate::error::{EngineError, Result};
use crate::types::Side;

pub const TEAM_SIZE: usize = 3;
pub const TOTAL_PICKS: usize = 2 * TEAM_SIZE;

/// Which side owns each pick, indexed by pick number (0-based).
pub const DRAFT_ORDER: [Side; TOTAL_PICKS] = [Side::A, Side::B, Side::B, Side::A, Side::A, Side::B];

/// Local player's seat. The host drafts as side A.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    Host,
    Joiner,
}

impl Role {
    pub const fn side(self) -> Side {
        match self {
            Role::Host => Side::A,
            Role::Joiner => Side::B,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Picker {
    Me,
    Opponent,
}

/// Unpicked pool in ascending id order.
pub fn get_initial_pool() -> Vec<u8> {
    (0..CHAMPION_COUNT as u8).collect()
}

pub fn get_current_picker(pick_number: usize, role: Role) -> Result<Picker> {
    let side = DRAFT_ORDER
        .get(pick_number)
        .ok_or(EngineError::InvalidPickIndex(pick_number))?;
    Ok(if *side == role.side() {
        Picker::Me
    } else {
        Picker::Opponent
    })
}

pub fn is_draft_complete(my_team: &[u8], opponent_team: &[u8]) -> bool {
    my_team.len() == TEAM_SIZE && opponent_team.len() == TEAM_SIZE
}

/// The pool without `id`. Unchanged when `id` is absent.
pub fn remove_from_pool(pool: &[u8], id: u8) -> Vec<u8> {
    pool.iter().copied().filter(|&c| c != id).collect()
}

pub fn is_valid_pick(pool: &[u8], id: u8) -> bool {
    pool.contains(&id)
}

/// Draft progress owned by one local session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draft {
    role: Role,
    pool: Vec<u8>,
    my_team: Vec<u8>,
    opponent_team: Vec<u8>,
}

impl Draft {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            pool: get_initial_pool(),
            my_team: Vec::with_capacity(TEAM_SIZE),
            opponent_team: Vec::with_capacity(TEAM_SIZE),
        }
    }

    /// Rebuild a draft from checkpointed parts, rejecting anything that could
    /// not have been produced by a legal sequence of picks.
    pub fn from_parts(
        role: Role,
        pool: Vec<u8>,
        my_team: Vec<u8>,
        opponent_team: Vec<u8>,
        pick_number: usize,
    ) -> Result<Self> {
        if pick_number > TOTAL_PICKS {
            return Err(EngineError::InvalidPickIndex(pick_number));
        }
        if my_team.len() + opponent_team.len() != pick_number {
            return Err(EngineError::InvalidTeam("team sizes do not match pick number"));
        }
        let mut seen = [false; CHAMPION_COUNT];
        for &id in pool.iter().chain(&my_team).chain(&opponent_team) {
            let slot = seen
                .get_mut(id as usize)
                .ok_or(EngineError::UnknownChampion(id))?;
            if *slot {
                return Err(EngineError::InvalidTeam("champion listed twice"));
            }
            *slot = true;
        }
        if seen.iter().any(|s| !s) {
            return Err(EngineError::InvalidTeam("champion missing from pool and teams"));
        }
        let mine = DRAFT_ORDER[..pick_number]
            .iter()
            .filter(|&&s| s == role.side())
            .count();
        if mine != my_team.len() {
            return Err(EngineError::InvalidTeam("team sizes do not follow the draft order"));
        }
        Ok(Self {
            role,
            pool,
            my_team,
            opponent_team,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn pool(&self) -> &[u8] {
        &self.pool
    }

    pub fn my_team(&self) -> &[u8] {
        &self.my_team
    }

    pub fn opponent_team(&self) -> &[u8] {
        &self.opponent_team
    }

    pub fn pick_number(&self) -> usize {
        self.my_team.len() + self.opponent_team.len()
    }

    pub fn is_complete(&self) -> bool {
        is_draft_complete(&self.my_team, &self.opponent_team)
    }

    pub fn current_picker(&self) -> Result<Picker> {
        if self.is_complete() {
            return Err(EngineError::DraftComplete);
        }
        get_current_picker(self.pick_number(), self.role)
    }

    /// Apply one pick. Validated in full before anything is mutated.
    pub fn pick(&mut self, picker: Picker, champion_id: u8) -> Result<()> {
        let expected = self.current_picker()?;
        if expected != picker {
            return Err(EngineError::OutOfTurn {
                pick_number: self.pick_number(),
            });
        }
        if !is_valid_pick(&self.pool, champion_id) {
            return Err(EngineError::NotInPool(champion_id));
        }
        self.pool = remove_from_pool(&self.pool, champion_id);
        match picker {
            Picker::Me => self.my_team.push(champion_id),
            Picker::Opponent => self.opponent_team.push(champion_id),
        }
        Ok(())
    }

    /// Final teams as (side A, side B).
    pub fn teams_by_side(&self) -> Result<([u8; TEAM_SIZE], [u8; TEAM_SIZE])> {
        if !self.is_complete() {
            return Err(EngineError::InvalidTeam("draft not complete"));
        }
        let mine = [self.my_team[0], self.my_team[1], self.my_team[2]];
        let theirs = [
            self.opponent_team[0],
            self.opponent_team[1],
            self.opponent_team[2],
        ];
        Ok(match self.role.side() {
            Side::A => (mine, theirs),
            Side::B => (theirs, mine),
        })
    }
}
