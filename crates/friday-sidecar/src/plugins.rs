//! Plugin registry.
//!
//! Plugins are compiled in. [`PluginRegistry::discover`] registers every
//! built-in plugin except those listed in `disabled_plugins`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use friday_core::{SidecarConfig, SidecarError, SidecarResult};

/// A named unit of work invoked through `run_plugin`.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Registry key.
    fn name(&self) -> &str;

    async fn run(&self, payload: Map<String, Value>) -> SidecarResult<Value>;
}

/// Reference plugin that reports which payload keys it received.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExamplePlugin;

#[async_trait]
impl Plugin for ExamplePlugin {
    fn name(&self) -> &str {
        "example_plugin"
    }

    async fn run(&self, payload: Map<String, Value>) -> SidecarResult<Value> {
        let keys: Vec<&String> = payload.keys().collect();
        Ok(json!({
            "message": "Example plugin executed successfully",
            "payload_keys": keys,
        }))
    }
}

fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![Arc::new(ExamplePlugin)]
}

/// Plugins available to this process, keyed by name.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in plugins that are not disabled by configuration.
    pub fn discover(config: &SidecarConfig) -> Self {
        let mut registry = Self::new();
        for plugin in builtin_plugins() {
            if config.disabled_plugins.iter().any(|d| d == plugin.name()) {
                debug!(plugin = plugin.name(), "Plugin disabled by configuration");
                continue;
            }
            registry.register(plugin);
        }
        info!(count = registry.len(), "Plugins loaded");
        registry
    }

    /// Add or replace a plugin.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run the named plugin.
    pub async fn run(&self, name: &str, payload: Map<String, Value>) -> SidecarResult<Value> {
        let plugin = self.get(name).ok_or_else(|| {
            SidecarError::InvalidArgument(format!("unknown plugin '{}'", name))
        })?;
        info!(plugin = name, "Running plugin");
        plugin.run(payload).await.map_err(|e| match e {
            SidecarError::Plugin { .. } => e,
            other => SidecarError::plugin(name, other.to_string()),
        })
    }
}
