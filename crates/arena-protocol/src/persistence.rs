//! Draft checkpoints and the in-memory key-value store.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use arena_engine::{Draft, Picker, Role, TOTAL_PICKS};

use crate::error::{ProtocolError, Result, StoreError};
use crate::ports::{KeyValueStore, NoteId};

/// Recovery checkpoint written after every draft mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PersistedDraft {
    pub pool: Vec<u8>,
    pub my_team: Vec<u8>,
    pub opponent_team: Vec<u8>,
    pub pick_number: usize,
    pub processed_opponent_notes: Vec<NoteId>,
    /// My pick whose note was being published when this was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_pick: Option<u8>,
}

/// A checkpoint that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoredDraft {
    pub draft: Draft,
    pub processed: Vec<NoteId>,
    pub pending_pick: Option<u8>,
}

impl PersistedDraft {
    pub fn capture<'a>(draft: &Draft, processed: impl IntoIterator<Item = &'a NoteId>) -> Self {
        Self {
            pool: draft.pool().to_vec(),
            my_team: draft.my_team().to_vec(),
            opponent_team: draft.opponent_team().to_vec(),
            pick_number: draft.pick_number(),
            processed_opponent_notes: processed.into_iter().cloned().collect(),
            pending_pick: None,
        }
    }

    pub fn with_pending_pick(mut self, champion_id: Option<u8>) -> Self {
        self.pending_pick = champion_id;
        self
    }

    /// Rebuild the draft. Fails on anything a legal draft could not produce.
    pub fn restore(&self, role: Role) -> arena_engine::Result<Draft> {
        Draft::from_parts(
            role,
            self.pool.clone(),
            self.my_team.clone(),
            self.opponent_team.clone(),
            self.pick_number,
        )
    }
}

/// Load a checkpoint. Malformed or inconsistent data counts as absent,
/// including a pending pick the restored draft would not accept.
pub fn load_draft(store: &dyn KeyValueStore, key: &str, role: Role) -> Result<Option<RestoredDraft>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    let persisted: PersistedDraft = match serde_json::from_str(&raw) {
        Ok(persisted) => persisted,
        Err(err) => {
            warn!(key, error = %err, "discarding malformed draft checkpoint");
            return Ok(None);
        }
    };
    if persisted.pick_number > TOTAL_PICKS {
        warn!(key, pick_number = persisted.pick_number, "discarding draft checkpoint");
        return Ok(None);
    }
    let draft = match persisted.restore(role) {
        Ok(draft) => draft,
        Err(err) => {
            warn!(key, error = %err, "discarding inconsistent draft checkpoint");
            return Ok(None);
        }
    };
    if let Some(champion_id) = persisted.pending_pick {
        if let Err(err) = draft.clone().pick(Picker::Me, champion_id) {
            warn!(key, champion_id, error = %err, "discarding draft checkpoint with an impossible pending pick");
            return Ok(None);
        }
    }
    Ok(Some(RestoredDraft {
        draft,
        processed: persisted.processed_opponent_notes,
        pending_pick: persisted.pending_pick,
    }))
}

pub fn save_draft(store: &dyn KeyValueStore, key: &str, draft: &PersistedDraft) -> Result<()> {
    let raw = serde_json::to_string(draft).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
    store.set(key, raw)?;
    Ok(())
}

/// In-memory store for tests and local sessions.
///
/// Thread-safe but not persistent across process restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> std::result::Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> std::result::Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "arena:draft:test";

    fn sample_draft() -> Draft {
        let mut draft = Draft::new(Role::Joiner);
        draft.pick(Picker::Opponent, 0).unwrap();
        draft.pick(Picker::Me, 4).unwrap();
        draft
    }

    #[test]
    fn checkpoint_survives_a_reload() {
        let store = MemoryStore::new();
        let draft = sample_draft();
        let processed = vec![NoteId::new("note-7")];
        save_draft(&store, KEY, &PersistedDraft::capture(&draft, &processed)).unwrap();

        let restored = load_draft(&store, KEY, Role::Joiner).unwrap().unwrap();
        assert_eq!(restored.draft, draft);
        assert_eq!(restored.processed, processed);
        assert_eq!(restored.pending_pick, None);
    }

    #[test]
    fn pending_pick_is_kept_only_when_still_legal() {
        let store = MemoryStore::new();
        // the joiner picks twice in a row after pick 2
        let persisted = PersistedDraft::capture(&sample_draft(), &[]).with_pending_pick(Some(6));
        save_draft(&store, KEY, &persisted).unwrap();
        let restored = load_draft(&store, KEY, Role::Joiner).unwrap().unwrap();
        assert_eq!(restored.pending_pick, Some(6));

        // champion 4 is already on the joiner's team
        let persisted = PersistedDraft::capture(&sample_draft(), &[]).with_pending_pick(Some(4));
        save_draft(&store, KEY, &persisted).unwrap();
        assert!(load_draft(&store, KEY, Role::Joiner).unwrap().is_none());
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let persisted = PersistedDraft::capture(&sample_draft(), &[]);
        let json = serde_json::to_value(&persisted).unwrap();
        assert_eq!(json["pickNumber"], 2);
        assert_eq!(json["myTeam"], serde_json::json!([4]));
        assert!(json["processedOpponentNotes"].as_array().unwrap().is_empty());
        assert!(json.get("pendingPick").is_none());
    }

    #[test]
    fn missing_checkpoint_is_none() {
        let store = MemoryStore::new();
        assert!(load_draft(&store, KEY, Role::Host).unwrap().is_none());
    }

    #[test]
    fn corrupt_checkpoints_fall_back_to_fresh() {
        let store = MemoryStore::new();
        let cases = [
            "not json",
            r#"{"pool":"x","myTeam":[],"opponentTeam":[],"pickNumber":0,"processedOpponentNotes":[]}"#,
            r#"{"pool":[0,1,2,3,4,5,6,7,8,9],"myTeam":[],"opponentTeam":[],"pickNumber":-1,"processedOpponentNotes":[]}"#,
            r#"{"pool":[],"myTeam":[],"opponentTeam":[],"pickNumber":7,"processedOpponentNotes":[]}"#,
            r#"{"pool":[0,1,2,3,4,5,6,7,8,9],"myTeam":[],"opponentTeam":[],"pickNumber":1,"processedOpponentNotes":[]}"#,
            r#"{"pool":[0,1,2,3,4,5,6,7,8,300],"myTeam":[],"opponentTeam":[],"pickNumber":0,"processedOpponentNotes":[]}"#,
            r#"{"pool":[1,2,3,4,5,6,7,8,9],"myTeam":[0],"opponentTeam":[],"pickNumber":1,"processedOpponentNotes":[]}"#,
        ];
        for (i, raw) in cases.iter().enumerate() {
            store.set(KEY, raw.to_string()).unwrap();
            // the last case is legal for a host but not for a joiner
            assert!(
                load_draft(&store, KEY, Role::Joiner).unwrap().is_none(),
                "case {i} should be rejected"
            );
        }
        assert!(load_draft(&store, KEY, Role::Host).unwrap().is_some());
    }

    #[test]
    fn memory_store_remove() {
        let store = MemoryStore::new();
        store.set("k", "v".into()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
