use crate::error::ModuleError;
use crate::location::Location;
use crate::unwrap::ScriptError;
use rquickjs::{Object, Persistent, Value};
use std::collections::HashMap;
use std::fmt;

/// Identity of a cached module: where it was loaded from, or the name of the
/// extension that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleKey {
    Location(Location),
    Extension(String),
}

impl ModuleKey {
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Location(location) => Some(location),
            Self::Extension(_) => None,
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Location(location) => write!(f, "{location}"),
            Self::Extension(name) => f.write_str(name),
        }
    }
}

impl From<Location> for ModuleKey {
    fn from(location: Location) -> Self {
        Self::Location(location)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Source fetched, body not started
    Pending,
    /// Body is on the call stack
    Executing,
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
pub(crate) enum CachedFailure {
    Load(String),
    Execution(ScriptError),
}

impl CachedFailure {
    pub(crate) fn to_error(&self, module: &ModuleKey) -> ModuleError {
        match self {
            Self::Load(reason) => ModuleError::Load {
                module: module.clone(),
                reason: reason.clone(),
            },
            Self::Execution(error) => ModuleError::Execution {
                module: module.clone(),
                error: error.clone(),
            },
        }
    }
}

/// Engine values are held as [`Persistent`] handles so the cache can live
/// outside a `Context::with` scope. They must be dropped before the runtime.
#[derive(Clone)]
pub(crate) enum ModuleState {
    Pending,
    Executing { module: Persistent<Object<'static>> },
    Loaded { exports: Persistent<Value<'static>> },
    Failed(CachedFailure),
}

impl ModuleState {
    pub(crate) fn status(&self) -> ModuleStatus {
        match self {
            Self::Pending => ModuleStatus::Pending,
            Self::Executing { .. } => ModuleStatus::Executing,
            Self::Loaded { .. } => ModuleStatus::Loaded,
            Self::Failed(_) => ModuleStatus::Failed,
        }
    }
}

#[derive(Default)]
pub(crate) struct ModuleCache {
    entries: HashMap<ModuleKey, ModuleState>,
}

impl ModuleCache {
    /// A copy of the record, so no borrow is held while script code runs
    pub(crate) fn get(&self, key: &ModuleKey) -> Option<ModuleState> {
        self.entries.get(key).cloned()
    }

    pub(crate) fn status(&self, key: &ModuleKey) -> Option<ModuleStatus> {
        self.entries.get(key).map(ModuleState::status)
    }

    /// Move `key` to `state`. Records only move forward, a finished record
    /// is never replaced.
    pub(crate) fn transition(&mut self, key: &ModuleKey, state: ModuleState) {
        let previous = self.entries.get(key).map(ModuleState::status);
        debug_assert!(
            !matches!(previous, Some(ModuleStatus::Loaded | ModuleStatus::Failed)),
            "module record for {key} is already settled"
        );
        tracing::debug!(module = %key, from = ?previous, to = ?state.status(), "module state");
        self.entries.insert(key.clone(), state);
    }

    pub(crate) fn modules(&self) -> Vec<(ModuleKey, ModuleStatus)> {
        let mut modules: Vec<_> = self
            .entries
            .iter()
            .map(|(key, state)| (key.clone(), state.status()))
            .collect();
        modules.sort_by(|a, b| a.0.cmp(&b.0));
        modules
    }

    /// Drop every record, releasing the engine handles
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = ModuleKey::from(Location::new("memory:///a.js"));
        assert_eq!(key.to_string(), "memory:///a.js");
        assert_eq!(ModuleKey::Extension("console".into()).to_string(), "console");
        assert!(ModuleKey::Extension("console".into()).location().is_none());
    }

    #[test]
    fn test_failed_record_is_listed() {
        let mut cache = ModuleCache::default();
        let key = ModuleKey::from(Location::new("memory:///a.js"));
        cache.transition(&key, ModuleState::Pending);
        assert_eq!(cache.status(&key), Some(ModuleStatus::Pending));

        cache.transition(
            &key,
            ModuleState::Failed(CachedFailure::Load("gone".to_string())),
        );
        assert_eq!(cache.modules(), vec![(key.clone(), ModuleStatus::Failed)]);

        let err = cache.get(&key).map(|state| match state {
            ModuleState::Failed(failure) => failure.to_error(&key).to_string(),
            _ => String::new(),
        });
        assert_eq!(
            err.as_deref(),
            Some("Cannot load module 'memory:///a.js': gone")
        );
    }
}
