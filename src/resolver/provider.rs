//! Configuration lookup for named queries
//!
//! The resolver never reads the process environment directly; it is
//! handed a `ConfigProvider` instead.

use std::collections::HashMap;
use std::sync::Arc;

/// Key to string lookup used by `configuration_name`
pub trait ConfigProvider: Send + Sync {
    /// Look up a configuration value
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads values from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProvider;

impl ConfigProvider for EnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed in-memory values
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    values: HashMap<String, String>,
}

impl StaticProvider {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Builder method: add a value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigProvider for StaticProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Ordered chain of providers; the first one holding a key wins
#[derive(Clone, Default)]
pub struct LayeredProvider {
    layers: Vec<Arc<dyn ConfigProvider>>,
}

impl LayeredProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: append a lower-priority layer
    pub fn layer(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.layers.push(Arc::new(provider));
        self
    }
}

impl ConfigProvider for LayeredProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}
