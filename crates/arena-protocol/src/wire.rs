//! Amount encoding of every game signal. Notes carry no payload besides the
//! transferred amount, so these values are the whole wire format.

use arena_engine::{EngineError, CHAMPION_COUNT};

pub const JOIN_AMOUNT: u64 = 100;
pub const ACCEPT_AMOUNT: u64 = 101;

/// Decimals of the settlement asset.
pub const STAKE_DECIMALS: u32 = 6;
/// 10 whole tokens.
pub const STAKE_AMOUNT: u64 = 10 * 10u64.pow(STAKE_DECIMALS);

pub const DRAFT_PICK_MIN: u64 = 1;
pub const DRAFT_PICK_MAX: u64 = CHAMPION_COUNT as u64;

/// Nonce and commit halves are 16-bit values offset by one.
pub const CHUNK_SPAN: u64 = 1 << 16;
/// Upper bound of the reveal nonce range `1..=NONCE_CHUNK_MAX`.
pub const NONCE_CHUNK_MAX: u64 = CHUNK_SPAN;
/// Upper bound of the commit range `NONCE_CHUNK_MAX+1..=COMMIT_CHUNK_MAX`.
pub const COMMIT_CHUNK_MAX: u64 = NONCE_CHUNK_MAX + CHUNK_SPAN;

/// Every published amount stays below this bound.
pub const AMOUNT_BOUND: u64 = 1 << 62;

pub fn draft_pick_amount(champion_id: u8) -> Result<u64, EngineError> {
    if champion_id as usize >= CHAMPION_COUNT {
        return Err(EngineError::UnknownChampion(champion_id));
    }
    Ok(champion_id as u64 + 1)
}

pub fn champion_from_pick(amount: u64) -> Option<u8> {
    (DRAFT_PICK_MIN..=DRAFT_PICK_MAX)
        .contains(&amount)
        .then(|| (amount - 1) as u8)
}

/// Transfer amount publishing one commit half (`1..=65536`).
pub fn commit_amount(part: u64) -> Option<u64> {
    (1..=CHUNK_SPAN).contains(&part).then(|| NONCE_CHUNK_MAX + part)
}

pub fn commit_part(amount: u64) -> Option<u64> {
    (NONCE_CHUNK_MAX + 1..=COMMIT_CHUNK_MAX)
        .contains(&amount)
        .then(|| amount - NONCE_CHUNK_MAX)
}
