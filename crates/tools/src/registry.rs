//! Name-indexed collection of adapters with the lookup surface the
//! orchestrator and rules engine need: by name, by category, by
//! availability, and by asset type produced/consumed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::adapters::default_adapters;
use crate::contract::{ToolAdapter, ToolCategory};

pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn ToolAdapter>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// A registry with all fifteen built-in adapters registered.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for adapter in default_adapters() {
            registry.register(adapter);
        }
        registry
    }

    /// Registration is additive; a duplicate name replaces the prior entry.
    pub fn register(&self, adapter: Arc<dyn ToolAdapter>) {
        let name = adapter.config().name.clone();
        self.tools.write().insert(name, adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolAdapter>> {
        self.tools.read().get(name).cloned()
    }

    pub fn all(&self) -> Vec<Arc<dyn ToolAdapter>> {
        self.tools.read().values().cloned().collect()
    }

    pub fn by_category(&self, category: ToolCategory) -> Vec<Arc<dyn ToolAdapter>> {
        self.tools
            .read()
            .values()
            .filter(|a| a.config().category == category)
            .cloned()
            .collect()
    }

    pub fn available(&self) -> Vec<Arc<dyn ToolAdapter>> {
        self.tools
            .read()
            .values()
            .filter(|a| a.is_available())
            .cloned()
            .collect()
    }

    /// Adapters whose `consumes` set includes `asset_type`.
    pub fn for_asset_type(&self, asset_type: &str) -> Vec<Arc<dyn ToolAdapter>> {
        self.tools
            .read()
            .values()
            .filter(|a| a.config().consumes.iter().any(|t| t == asset_type))
            .cloned()
            .collect()
    }

    /// Adapters whose `produces` set includes `asset_type`.
    pub fn producers_of(&self, asset_type: &str) -> Vec<Arc<dyn ToolAdapter>> {
        self.tools
            .read()
            .values()
            .filter(|a| a.config().produces.iter().any(|t| t == asset_type))
            .cloned()
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ScanOptions, ToolConfig, ToolResult};

    struct Stub(ToolConfig);
    impl ToolAdapter for Stub {
        fn config(&self) -> &ToolConfig {
            &self.0
        }
        fn build_command(&self, _t: &str, _o: &ScanOptions) -> Vec<String> {
            vec![self.0.binary.clone()]
        }
        fn parse_output(&self, _output: &str) -> ToolResult {
            ToolResult::empty_failure(self.0.name.clone())
        }
    }

    #[test]
    fn register_replaces_duplicate_names() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Stub(ToolConfig::new("x", "echo", ToolCategory::Osint, "first"))));
        registry.register(Arc::new(Stub(ToolConfig::new("x", "cat", ToolCategory::Osint, "second"))));
        assert_eq!(registry.all().len(), 1);
        assert_eq!(registry.get("x").unwrap().config().binary, "cat");
    }

    #[test]
    fn lookup_by_consumes_and_produces() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Stub(
            ToolConfig::new("httpx", "httpx", ToolCategory::WebProbe, "probe")
                .consumes(&["subdomain"])
                .produces(&["http_service"]),
        )));
        assert_eq!(registry.for_asset_type("subdomain").len(), 1);
        assert_eq!(registry.producers_of("http_service").len(), 1);
        assert_eq!(registry.for_asset_type("ip").len(), 0);
    }
}
