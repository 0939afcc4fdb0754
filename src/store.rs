//! External adapters (§6): durable key-value storage for optimizer state
//! and config, plus read-only lookups for machine schemas and rated-run
//! history. The core never talks to a concrete medium directly — it only
//! calls through these trait objects, the same "small adapter struct
//! behind a narrow interface" shape the teacher uses for its FRED client.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::BoConfig;
use crate::domain::{BoState, MachineSchema, Run};
use crate::error::{BoError, Result};

/// Store key for a (bean, machine) pair, per §6: `"<bean_id>_<machine_id>"`.
pub fn state_key(bean_id: &str, machine_id: &str) -> String {
    format!("{bean_id}_{machine_id}")
}

/// The well-known key the global configuration record lives under.
pub const CONFIG_KEY: &str = "__bo_config__";

/// A durable key-value map from state keys to serialized `BoState` records,
/// plus the config record under `CONFIG_KEY`. Upsert failures surface as
/// `BoError::Storage` from the calling service operation.
pub trait DurableStore {
    fn load_all(&self) -> Result<HashMap<String, BoState>>;
    fn load_one(&self, key: &str) -> Result<Option<BoState>>;
    fn upsert_one(&self, key: &str, state: BoState) -> Result<()>;
    fn remove_one(&self, key: &str) -> Result<()>;
    fn enumerate_keys(&self) -> Result<Vec<String>>;
    fn clear_all(&self) -> Result<()>;

    fn load_config(&self) -> Result<Option<BoConfig>>;
    fn save_config(&self, config: BoConfig) -> Result<()>;
}

/// Read-only machine schema lookup.
pub trait MachineSchemaSource {
    fn get_machine(&self, machine_id: &str) -> Result<Option<MachineSchema>>;
}

/// Read-only rated-run history lookup, used only during explicit
/// rebuild-from-history (e.g. after a run is deleted).
pub trait RunHistorySource {
    fn rated_runs_for(&self, bean_id: &str, machine_id: &str) -> Result<Vec<Run>>;
}

/// A reference `DurableStore` backed by an in-process map, guarded by a
/// single mutex per the concurrency model (§5): callers serialize access to
/// a given key through this one lock rather than the service managing
/// per-key locks itself.
#[derive(Default)]
pub struct InMemoryStore {
    states: Mutex<HashMap<String, BoState>>,
    config: Mutex<Option<BoConfig>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for InMemoryStore {
    fn load_all(&self) -> Result<HashMap<String, BoState>> {
        let guard = self
            .states
            .lock()
            .map_err(|_| BoError::storage("state store lock poisoned"))?;
        Ok(guard.clone())
    }

    fn load_one(&self, key: &str) -> Result<Option<BoState>> {
        let guard = self
            .states
            .lock()
            .map_err(|_| BoError::storage("state store lock poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    fn upsert_one(&self, key: &str, state: BoState) -> Result<()> {
        let mut guard = self
            .states
            .lock()
            .map_err(|_| BoError::storage("state store lock poisoned"))?;
        guard.insert(key.to_string(), state);
        Ok(())
    }

    fn remove_one(&self, key: &str) -> Result<()> {
        let mut guard = self
            .states
            .lock()
            .map_err(|_| BoError::storage("state store lock poisoned"))?;
        guard.remove(key);
        Ok(())
    }

    fn enumerate_keys(&self) -> Result<Vec<String>> {
        let guard = self
            .states
            .lock()
            .map_err(|_| BoError::storage("state store lock poisoned"))?;
        Ok(guard.keys().cloned().collect())
    }

    fn clear_all(&self) -> Result<()> {
        let mut guard = self
            .states
            .lock()
            .map_err(|_| BoError::storage("state store lock poisoned"))?;
        guard.clear();
        Ok(())
    }

    fn load_config(&self) -> Result<Option<BoConfig>> {
        let guard = self
            .config
            .lock()
            .map_err(|_| BoError::storage("config store lock poisoned"))?;
        Ok(*guard)
    }

    fn save_config(&self, config: BoConfig) -> Result<()> {
        let mut guard = self
            .config
            .lock()
            .map_err(|_| BoError::storage("config store lock poisoned"))?;
        *guard = Some(config);
        Ok(())
    }
}

/// Serialize a `BoState` to its portable JSON form, matching the teacher's
/// `io::curve` pattern of a plain serde round-trip for a persisted record.
pub fn serialize_state(state: &BoState) -> Result<String> {
    serde_json::to_string(state).map_err(|e| BoError::storage(format!("failed to serialize BO state: {e}")))
}

/// Deserialize a `BoState` from its portable JSON form.
pub fn deserialize_state(json: &str) -> Result<BoState> {
    serde_json::from_str(json).map_err(|e| BoError::storage(format!("failed to deserialize BO state: {e}")))
}
