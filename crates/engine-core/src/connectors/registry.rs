use crate::{
    connectors::connector::{Connector, ConnectorProvider},
    error::ConnectorError,
};
use std::{collections::HashMap, sync::Arc};

/// Connectors keyed by connector type.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connector_type: impl Into<String>, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector_type.into(), connector);
    }

    pub fn with(mut self, connector_type: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        self.register(connector_type, connector);
        self
    }

    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.connectors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl ConnectorProvider for ConnectorRegistry {
    fn connector(&self, connector_type: &str) -> Result<Arc<dyn Connector>, ConnectorError> {
        self.connectors
            .get(connector_type)
            .cloned()
            .ok_or_else(|| ConnectorError::UnknownConnector(connector_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::memory::MemoryConnector;

    #[test]
    fn resolves_registered_types() {
        let registry =
            ConnectorRegistry::new().with("memory", Arc::new(MemoryConnector::new("memory")));

        assert_eq!(registry.connector("memory").unwrap().name(), "memory");
        assert!(matches!(
            registry.connector("s3"),
            Err(ConnectorError::UnknownConnector(t)) if t == "s3"
        ));
        assert_eq!(registry.types(), vec!["memory"]);
    }
}
