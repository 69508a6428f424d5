//! Turns the opponent's notes into typed game signals.
//!
//! The amount ranges overlap: draft picks (1..=10), revealed moves (1..=20)
//! and nonce halves (1..=65536) share values. A session is always in exactly
//! one [`MatchPhase`] and classifies with only that phase's rules.

use tracing::debug;

use crate::ports::{AccountId, ChainNote, NoteId};
use crate::wire::{
    ACCEPT_AMOUNT, COMMIT_CHUNK_MAX, DRAFT_PICK_MAX, DRAFT_PICK_MIN, JOIN_AMOUNT, NONCE_CHUNK_MAX,
    STAKE_AMOUNT,
};
use arena_engine::{MOVE_MAX, MOVE_MIN};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedNote {
    pub note_id: NoteId,
    pub sender: AccountId,
    pub amount: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    Join,
    Accept,
    Stake,
    DraftPick,
    Reveal,
    Commit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPhase {
    /// Handshake and stake lock.
    Lobby,
    Draft,
    Battle,
}

impl MatchPhase {
    /// Signals a session in this phase acts on.
    pub fn accepts(self, signal: Signal) -> bool {
        match self {
            MatchPhase::Lobby => matches!(signal, Signal::Join | Signal::Accept | Signal::Stake),
            MatchPhase::Draft => matches!(signal, Signal::DraftPick | Signal::Stake),
            MatchPhase::Battle => matches!(signal, Signal::Reveal | Signal::Commit),
        }
    }
}

/// Full precedence table: exact matches first, then draft picks before the
/// reveal ranges.
pub fn classify_amount(amount: u64) -> Option<Signal> {
    match amount {
        JOIN_AMOUNT => Some(Signal::Join),
        ACCEPT_AMOUNT => Some(Signal::Accept),
        STAKE_AMOUNT => Some(Signal::Stake),
        a if (DRAFT_PICK_MIN..=DRAFT_PICK_MAX).contains(&a) => Some(Signal::DraftPick),
        a if (MOVE_MIN..=MOVE_MAX).contains(&a) => Some(Signal::Reveal),
        a if a > 0 && a <= NONCE_CHUNK_MAX => Some(Signal::Reveal),
        a if a > NONCE_CHUNK_MAX && a <= COMMIT_CHUNK_MAX => Some(Signal::Commit),
        _ => None,
    }
}

/// The same table restricted to the rules active in `phase`.
pub fn classify_amount_in_phase(amount: u64, phase: MatchPhase) -> Option<Signal> {
    let table: &[Signal] = match phase {
        MatchPhase::Lobby => &[Signal::Join, Signal::Accept, Signal::Stake],
        MatchPhase::Draft => &[Signal::Stake, Signal::DraftPick],
        MatchPhase::Battle => &[Signal::Reveal, Signal::Commit],
    };
    table.iter().copied().find(|signal| matches_rule(*signal, amount))
}

fn matches_rule(signal: Signal, amount: u64) -> bool {
    match signal {
        Signal::Join => amount == JOIN_AMOUNT,
        Signal::Accept => amount == ACCEPT_AMOUNT,
        Signal::Stake => amount == STAKE_AMOUNT,
        Signal::DraftPick => (DRAFT_PICK_MIN..=DRAFT_PICK_MAX).contains(&amount),
        Signal::Reveal => amount > 0 && amount <= NONCE_CHUNK_MAX,
        Signal::Commit => amount > NONCE_CHUNK_MAX && amount <= COMMIT_CHUNK_MAX,
    }
}

/// Read sender and first-asset amount. Notes without assets carry no signal.
pub fn decode_note(note: &ChainNote) -> Option<DecodedNote> {
    let amount = note.amount()?;
    Some(DecodedNote {
        note_id: note.id.clone(),
        sender: note.sender.clone(),
        amount,
    })
}

/// Opponent notes valid in `phase`, in the order the source returned them.
pub fn decode_for_phase(
    notes: &[ChainNote],
    opponent: &AccountId,
    phase: MatchPhase,
) -> Vec<(Signal, DecodedNote)> {
    notes
        .iter()
        .filter_map(|note| {
            if &note.sender != opponent {
                return None;
            }
            let Some(decoded) = decode_note(note) else {
                debug!(note = %note.id, "dropping note without assets");
                return None;
            };
            match classify_amount_in_phase(decoded.amount, phase) {
                Some(signal) => Some((signal, decoded)),
                None => {
                    debug!(note = %note.id, amount = decoded.amount, ?phase, "dropping unclassified note");
                    None
                }
            }
        })
        .collect()
}

/// Disjoint signal buckets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassifiedNotes {
    pub join: Vec<DecodedNote>,
    pub accept: Vec<DecodedNote>,
    pub stake: Vec<DecodedNote>,
    pub draft_pick: Vec<DecodedNote>,
    pub reveal: Vec<DecodedNote>,
    pub commit: Vec<DecodedNote>,
}

impl ClassifiedNotes {
    pub fn bucket(&self, signal: Signal) -> &[DecodedNote] {
        match signal {
            Signal::Join => &self.join,
            Signal::Accept => &self.accept,
            Signal::Stake => &self.stake,
            Signal::DraftPick => &self.draft_pick,
            Signal::Reveal => &self.reveal,
            Signal::Commit => &self.commit,
        }
    }

    fn push(&mut self, signal: Signal, note: DecodedNote) {
        let bucket = match signal {
            Signal::Join => &mut self.join,
            Signal::Accept => &mut self.accept,
            Signal::Stake => &mut self.stake,
            Signal::DraftPick => &mut self.draft_pick,
            Signal::Reveal => &mut self.reveal,
            Signal::Commit => &mut self.commit,
        };
        bucket.push(note);
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.join,
            &self.accept,
            &self.stake,
            &self.draft_pick,
            &self.reveal,
            &self.commit,
        ]
        .iter()
        .all(|b| b.is_empty())
    }
}

/// Bucket opponent notes with the full precedence table.
pub fn classify(notes: &[ChainNote], opponent: &AccountId) -> ClassifiedNotes {
    let mut out = ClassifiedNotes::default();
    for note in notes.iter().filter(|n| &n.sender == opponent) {
        if let Some(decoded) = decode_note(note) {
            if let Some(signal) = classify_amount(decoded.amount) {
                out.push(signal, decoded);
            }
        }
    }
    out
}

/// Bucket opponent notes with only the rules of `phase`.
pub fn classify_for_phase(
    notes: &[ChainNote],
    opponent: &AccountId,
    phase: MatchPhase,
) -> ClassifiedNotes {
    let mut out = ClassifiedNotes::default();
    for (signal, decoded) in decode_for_phase(notes, opponent, phase) {
        out.push(signal, decoded);
    }
    out
}
