//! Validation faults raised by the pure game rules.
//!
//! Every variant is produced before any state is touched, so a rejected input
//! leaves drafts and champion states exactly as they were.

use crate::types::Side;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("move amount {0} outside 1..=20")]
    InvalidMove(u64),

    #[error("unknown champion id {0}")]
    UnknownChampion(u8),

    #[error("ability index {ability_index} invalid for champion {champion_id}")]
    InvalidAbility { champion_id: u8, ability_index: u8 },

    #[error("pick index {0} outside 0..=5")]
    InvalidPickIndex(usize),

    #[error("champion {0} is not in the draft pool")]
    NotInPool(u8),

    #[error("not this player's pick (pick {pick_number})")]
    OutOfTurn { pick_number: usize },

    #[error("draft is already complete")]
    DraftComplete,

    #[error("invalid team: {0}")]
    InvalidTeam(&'static str),

    #[error("champion {champion_id} is not available to side {side:?}")]
    ChampionUnavailable { side: Side, champion_id: u8 },

    #[error("match is already over")]
    MatchOver,

    #[error("state word does not fit a field element: {0}")]
    FieldOverflow(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
