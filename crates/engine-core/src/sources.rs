use model::execution::pipeline::SourceDefinition;
use std::{collections::HashMap, sync::RwLock};

/// Lookup of source definitions registered outside any single plan.
pub trait SourceRegistry: Send + Sync {
    fn get_source_definition(&self, name: &str) -> Option<SourceDefinition>;
}

#[derive(Debug, Default)]
pub struct InMemorySourceRegistry {
    sources: RwLock<HashMap<String, SourceDefinition>>,
}

impl InMemorySourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, definition: SourceDefinition) {
        let mut sources = self
            .sources
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sources.insert(definition.name.clone(), definition);
    }
}

impl SourceRegistry for InMemorySourceRegistry {
    fn get_source_definition(&self, name: &str) -> Option<SourceDefinition> {
        self.sources
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_resolves() {
        let registry = InMemorySourceRegistry::new();
        registry.register(SourceDefinition::new("orders", "memory"));
        assert!(registry.get_source_definition("orders").is_some());
        assert!(registry.get_source_definition("users").is_none());
    }
}
