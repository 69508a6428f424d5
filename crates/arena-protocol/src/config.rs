//! Runtime configuration loaded from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use arena_engine::DEFAULT_MAX_ROUNDS;

use crate::ports::{AssetId, NoteType};

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_500;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 2_000;
const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
/// Blocks before an unconsumed stake can be recalled, and before a stalled
/// round can be claimed.
const DEFAULT_RECALL_BLOCKS: u64 = 900;
const DEFAULT_FAUCET_ID: &str = "arena-faucet";

#[derive(Clone, Debug)]
pub struct ArenaConfig {
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
    pub retry_attempts: u32,
    pub max_rounds: u32,
    pub recall_blocks: u64,
    pub faucet_id: AssetId,
    pub note_type: NoteType,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            recall_blocks: DEFAULT_RECALL_BLOCKS,
            faucet_id: AssetId::new(DEFAULT_FAUCET_ID),
            note_type: NoteType::Public,
        }
    }
}

impl ArenaConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `ARENA_POLL_INTERVAL_MS` - Sleep between poll iterations (default: 1500)
    /// - `ARENA_RETRY_BACKOFF_MS` - Backoff between retries (default: 2000)
    /// - `ARENA_RETRY_ATTEMPTS` - Attempts per transient fault (default: 5)
    /// - `ARENA_MAX_ROUNDS` - Round limit before a draw (default: 30)
    /// - `ARENA_RECALL_BLOCKS` - Stake recall and timeout horizon (default: 900)
    /// - `ARENA_FAUCET_ID` - Settlement asset id (default: arena-faucet)
    /// - `ARENA_NOTE_PUBLIC` - Publish public notes (default: true)
    pub fn from_env() -> Self {
        Self::from_env_over(Self::default())
    }

    /// Apply environment overrides on top of `base`.
    pub fn from_env_over(base: Self) -> Self {
        let mut config = base;

        if let Some(ms) = read_env::<u64>("ARENA_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = read_env::<u64>("ARENA_RETRY_BACKOFF_MS") {
            config.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(attempts) = read_env::<u32>("ARENA_RETRY_ATTEMPTS") {
            config.retry_attempts = attempts.max(1);
        }
        if let Some(rounds) = read_env::<u32>("ARENA_MAX_ROUNDS") {
            config.max_rounds = rounds.max(1);
        }
        if let Some(blocks) = read_env::<u64>("ARENA_RECALL_BLOCKS") {
            config.recall_blocks = blocks.max(1);
        }
        if let Some(faucet) = read_env::<String>("ARENA_FAUCET_ID") {
            if !faucet.is_empty() {
                config.faucet_id = AssetId::new(faucet);
            }
        }
        if let Some(public) = read_env_bool("ARENA_NOTE_PUBLIC") {
            config.note_type = if public {
                NoteType::Public
            } else {
                NoteType::Private
            };
        }

        config
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_backoff = backoff;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_recall_blocks(mut self, blocks: u64) -> Self {
        self.recall_blocks = blocks.max(1);
        self
    }

    pub fn with_faucet_id(mut self, faucet_id: AssetId) -> Self {
        self.faucet_id = faucet_id;
        self
    }

    pub fn with_note_type(mut self, note_type: NoteType) -> Self {
        self.note_type = note_type;
        self
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.trim().parse().ok()
}

fn read_env_bool(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
