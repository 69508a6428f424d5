use crate::error::{EngineError, Result};
use crate::types::TurnAction;

pub const MOVE_MIN: u64 = 1;
pub const MOVE_MAX: u64 = 20;

/// Encode a turn action into a move value.
/// Formula: champion_id * 2 + ability_index + 1, range [1, 20]
pub fn encode_move(action: &TurnAction) -> Result<u64> {
    if action.ability_index > 1 {
        return Err(EngineError::InvalidAbility {
            champion_id: action.champion_id,
            ability_index: action.ability_index,
        });
    }
    let encoded = (action.champion_id as u64) * 2 + (action.ability_index as u64) + 1;
    if !(MOVE_MIN..=MOVE_MAX).contains(&encoded) {
        return Err(EngineError::UnknownChampion(action.champion_id));
    }
    Ok(encoded)
}

/// Decode a move value back into a turn action.
pub fn decode_move(value: u64) -> Result<TurnAction> {
    if !(MOVE_MIN..=MOVE_MAX).contains(&value) {
        return Err(EngineError::InvalidMove(value));
    }
    let value = value - 1;
    Ok(TurnAction {
        champion_id: (value / 2) as u8,
        ability_index: (value % 2) as u8,
    })
}
