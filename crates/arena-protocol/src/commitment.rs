//! Hiding commitments to a move.
//!
//! A commitment is `RPO(move, nonce_part1, nonce_part2)`, the same hash the
//! settlement account checks reveals with. The full digest is kept as the
//! commit word; two 16-bit halves of it (offset by one) are what gets
//! published as transfer amounts. Nonce halves are 16-bit values offset by
//! one as well, so every published value fits comfortably in a note amount.

use miden_crypto::hash::rpo::Rpo256;
use miden_crypto::{Felt, StarkField};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use arena_engine::{MOVE_MAX, MOVE_MIN};

use crate::error::CommitError;
use crate::wire::CHUNK_SPAN;

/// Private state of a committed move, kept until the round resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitData {
    pub move_value: u64,
    pub nonce: [u8; 4],
    pub nonce_part1: u64,
    pub nonce_part2: u64,
    pub part1: u64,
    pub part2: u64,
    pub commit_word: [u64; 4],
}

/// Values disclosed after both sides committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealData {
    pub move_value: u64,
    pub nonce_part1: u64,
    pub nonce_part2: u64,
}

/// Commit to `move_value` with a fresh random nonce.
pub fn create_commitment(move_value: u64) -> Result<CommitData, CommitError> {
    create_commitment_with_rng(move_value, &mut rand::thread_rng())
}

pub fn create_commitment_with_rng<R: RngCore + ?Sized>(
    move_value: u64,
    rng: &mut R,
) -> Result<CommitData, CommitError> {
    let mut nonce = [0u8; 4];
    rng.fill_bytes(&mut nonce);
    commitment_from_nonce(move_value, nonce)
}

pub fn commitment_from_nonce(move_value: u64, nonce: [u8; 4]) -> Result<CommitData, CommitError> {
    if !(MOVE_MIN..=MOVE_MAX).contains(&move_value) {
        return Err(CommitError::InvalidMove(move_value));
    }
    let nonce_part1 = u16::from_be_bytes([nonce[0], nonce[1]]) as u64 + 1;
    let nonce_part2 = u16::from_be_bytes([nonce[2], nonce[3]]) as u64 + 1;
    let commit_word = hash_reveal(move_value, nonce_part1, nonce_part2);
    let (part1, part2) = commit_parts(&commit_word);
    Ok(CommitData {
        move_value,
        nonce,
        nonce_part1,
        nonce_part2,
        part1,
        part2,
        commit_word,
    })
}

/// Project a commitment onto what gets disclosed. No recomputation.
pub fn create_reveal(commit: &CommitData) -> RevealData {
    RevealData {
        move_value: commit.move_value,
        nonce_part1: commit.nonce_part1,
        nonce_part2: commit.nonce_part2,
    }
}

/// RPO digest of the revealed triple, as four field elements.
pub fn hash_reveal(move_value: u64, nonce_part1: u64, nonce_part2: u64) -> [u64; 4] {
    let digest = Rpo256::hash_elements(&[
        Felt::new(move_value),
        Felt::new(nonce_part1),
        Felt::new(nonce_part2),
    ]);
    let elements = digest.as_elements();
    [
        elements[0].as_int(),
        elements[1].as_int(),
        elements[2].as_int(),
        elements[3].as_int(),
    ]
}

/// Published halves of a commit word: low 16 bits of the first two
/// elements, each offset by one.
pub fn commit_parts(commit_word: &[u64; 4]) -> (u64, u64) {
    let half = |felt: u64| (felt % CHUNK_SPAN) + 1;
    (half(commit_word[0]), half(commit_word[1]))
}

/// Check a reveal against published commit halves.
///
/// The move itself is not range-checked here; an out-of-range move that
/// matches its commitment is a rules fault, not a commitment fault.
pub fn verify_reveal(reveal: &RevealData, part1: u64, part2: u64) -> Result<(), CommitError> {
    for part in [reveal.nonce_part1, reveal.nonce_part2] {
        if !(1..=CHUNK_SPAN).contains(&part) {
            return Err(CommitError::InvalidNoncePart(part));
        }
    }
    for part in [part1, part2] {
        if !(1..=CHUNK_SPAN).contains(&part) {
            return Err(CommitError::InvalidCommitPart(part));
        }
    }
    let word = hash_reveal(reveal.move_value, reveal.nonce_part1, reveal.nonce_part2);
    if commit_parts(&word) != (part1, part2) {
        return Err(CommitError::Mismatch);
    }
    Ok(())
}
