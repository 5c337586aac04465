//! Process-wide agent registry.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use switchboard_core::{Agent, AgentCapability, Error, Result};

/// Snapshot of one registered agent for catalogs and the agents endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<AgentCapability>,
}

/// Central registry mapping agent name to agent handle.
///
/// Registration is expected at startup; reads dominate afterwards. `list`
/// and `agents_info` preserve registration order.
#[derive(Default)]
pub struct AgentRegistry {
    agents: DashMap<String, Arc<dyn Agent>>,
    order: RwLock<Vec<String>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under its own name.
    ///
    /// Fails when the name is empty or already taken.
    pub fn register(&self, agent: Arc<dyn Agent>) -> Result<()> {
        let name = agent.name().to_string();
        if name.is_empty() {
            return Err(Error::config("agent name must be non-empty"));
        }
        if self.agents.contains_key(&name) {
            return Err(Error::config(format!("agent '{}' already registered", name)));
        }
        self.agents.insert(name.clone(), agent);
        self.order.write().unwrap_or_else(|e| e.into_inner()).push(name);
        Ok(())
    }

    /// Remove an agent. Returns true when one was present.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.agents.remove(name).is_some();
        if removed {
            self.order
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|n| n != name);
        }
        removed
    }

    /// Look up an agent handle by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).map(|entry| entry.value().clone())
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Registered agent names, in registration order.
    pub fn list(&self) -> Vec<String> {
        self.order
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Flattened capability list with the owning agent's name.
    pub fn get_all_capabilities(&self) -> Vec<(String, AgentCapability)> {
        let mut capabilities = Vec::new();
        for name in self.list() {
            if let Some(agent) = self.get(&name) {
                for cap in agent.capabilities() {
                    capabilities.push((name.clone(), cap));
                }
            }
        }
        capabilities
    }

    /// Per-agent snapshots in registration order.
    pub fn agents_info(&self) -> Vec<AgentInfo> {
        self.list()
            .into_iter()
            .filter_map(|name| {
                self.get(&name).map(|agent| AgentInfo {
                    name,
                    description: agent.description().to_string(),
                    capabilities: agent.capabilities(),
                })
            })
            .collect()
    }

    /// Probe every agent concurrently, best-effort.
    pub async fn health_check_all(&self) -> HashMap<String, bool> {
        let probes = self.list().into_iter().filter_map(|name| {
            self.get(&name)
                .map(|agent| async move { (name, agent.health_check().await) })
        });
        futures::future::join_all(probes).await.into_iter().collect()
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Remove every agent. For test reset.
    pub fn clear(&self) {
        self.agents.clear();
        self.order.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::mocks::MockAgent;

    #[test]
    fn register_and_lookup() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(MockAgent::named("gmail"))).unwrap();
        assert!(registry.contains("gmail"));
        assert!(registry.get("gmail").is_some());
        assert!(registry.get("weather").is_none());
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(MockAgent::named("gmail"))).unwrap();
        assert!(registry.register(Arc::new(MockAgent::named("gmail"))).is_err());
    }

    #[test]
    fn empty_name_fails() {
        let registry = AgentRegistry::new();
        assert!(registry.register(Arc::new(MockAgent::named(""))).is_err());
    }

    #[test]
    fn list_preserves_registration_order() {
        let registry = AgentRegistry::new();
        for name in ["weather", "gmail", "calendar"] {
            registry.register(Arc::new(MockAgent::named(name))).unwrap();
        }
        assert_eq!(registry.list(), vec!["weather", "gmail", "calendar"]);

        registry.unregister("gmail");
        assert_eq!(registry.list(), vec!["weather", "calendar"]);
    }

    #[test]
    fn capabilities_are_flattened_with_owner() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(MockAgent::named("gmail"))).unwrap();
        let caps = registry.get_all_capabilities();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].0, "gmail");
    }

    #[tokio::test]
    async fn health_check_reports_per_agent() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(MockAgent::named("gmail"))).unwrap();
        registry
            .register(Arc::new(MockAgent::named("weather").unhealthy()))
            .unwrap();

        let health = registry.health_check_all().await;
        assert_eq!(health.get("gmail"), Some(&true));
        assert_eq!(health.get("weather"), Some(&false));
    }

    #[test]
    fn clear_resets_registry() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(MockAgent::named("gmail"))).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
    }
}
