use std::sync::Arc;

use crate::core::error::DchatError;
use crate::droids::Droid;

/// Registry of available droids, keyed by id, in registration order.
pub struct DroidRegistry {
    droids: Vec<Arc<Droid>>,
}

impl DroidRegistry {
    pub fn new() -> Self {
        Self { droids: Vec::new() }
    }

    /// Registry pre-loaded with the built-in droids.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for droid in super::builtin_droids() {
            // Built-in ids are distinct; registration cannot fail here.
            let _ = registry.register(droid);
        }
        registry
    }

    /// Register a droid. Ids are validated here so a bad entry fails at load
    /// time, not at the first lookup.
    pub fn register(&mut self, droid: Droid) -> Result<(), DchatError> {
        if droid.id.trim().is_empty() {
            return Err(DchatError::Config("droid id must not be empty".to_string()));
        }
        if self.droids.iter().any(|d| d.id == droid.id) {
            return Err(DchatError::Config(format!(
                "droid '{}' is already registered",
                droid.id
            )));
        }
        self.droids.push(Arc::new(droid));
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<Droid>, DchatError> {
        self.droids
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| DchatError::UnknownDroid(id.to_string()))
    }

    /// Enumerate registered ids in registration order. Feeds the command
    /// surface: completion and `/droids`.
    pub fn ids(&self) -> Vec<String> {
        self.droids.iter().map(|d| d.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Droid>> {
        self.droids.iter()
    }
}

impl Default for DroidRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
