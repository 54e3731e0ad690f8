use crate::domain::models::{Task, UserPreferences};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::KeyValueStore;

pub const TASKS_KEY: &str = "@velo/tasks";
pub const PREFERENCES_KEY: &str = "@velo/preferences";

pub async fn save_tasks<K: KeyValueStore + ?Sized>(store: &K, tasks: &[Task]) -> Result<(), InfraError> {
    let payload = serde_json::to_string(tasks)?;
    store.set(TASKS_KEY, payload).await?;
    tracing::debug!(count = tasks.len(), "persisted tasks");
    Ok(())
}

pub async fn save_preferences<K: KeyValueStore + ?Sized>(
    store: &K,
    preferences: &UserPreferences,
) -> Result<(), InfraError> {
    let payload = serde_json::to_string(preferences)?;
    store.set(PREFERENCES_KEY, payload).await?;
    tracing::debug!(blocked = preferences.blocked_hours.len(), "persisted preferences");
    Ok(())
}

/// `Ok(None)` when nothing has been saved yet.
pub async fn load_tasks<K: KeyValueStore + ?Sized>(store: &K) -> Result<Option<Vec<Task>>, InfraError> {
    let Some(raw) = store.get(TASKS_KEY).await? else {
        return Ok(None);
    };
    let tasks: Vec<Task> = serde_json::from_str(&raw)?;
    Ok(Some(tasks))
}

/// Any failure, including a payload of the wrong shape, yields `None`.
pub async fn load_preferences<K: KeyValueStore + ?Sized>(store: &K) -> Option<UserPreferences> {
    let raw = match store.get(PREFERENCES_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(%error, "failed to read preferences");
            return None;
        }
    };
    match serde_json::from_str::<UserPreferences>(&raw) {
        Ok(preferences) => Some(preferences),
        Err(error) => {
            tracing::warn!(%error, "stored preferences have an unexpected shape");
            None
        }
    }
}
