//! Game rules for the arena: champion content, the damage model, the snake
//! draft and round-by-round battle resolution.
//!
//! Everything here is deterministic and synchronous. Two players running the
//! same inputs through these functions reach the same state, which is what
//! lets the match be coordinated through notes alone.

pub mod battle;
pub mod champions;
pub mod codec;
pub mod combat;
pub mod damage;
pub mod draft;
pub mod elements;
pub mod error;
pub mod pack;
pub mod types;

pub use battle::{Battle, DEFAULT_MAX_ROUNDS};
pub use champions::{get_champion, CHAMPIONS, CHAMPION_COUNT};
pub use codec::{decode_move, encode_move, MOVE_MAX, MOVE_MIN};
pub use damage::{calculate_burn_damage, calculate_damage, DamageRoll};
pub use draft::{Draft, Picker, Role, DRAFT_ORDER, TEAM_SIZE, TOTAL_PICKS};
pub use elements::get_type_multiplier;
pub use error::{EngineError, Result};
pub use types::{
    Ability, AbilityType, Buff, Champion, ChampionState, Element, ForfeitReason, MatchOutcome,
    MatchResult, Mvp, Side, StatType, Submission, TurnAction, TurnEvent, TurnRecord,
};
