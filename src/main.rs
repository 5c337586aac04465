#![deny(unused)]
//! Switchboard - multi-agent routing gateway.
//!
//! Wires configuration, telemetry, the agent registry, the intent router,
//! and the HTTP/SSE server together and runs until the process exits.

use std::sync::Arc;

use switchboard_agents::{demo_agents, EchoAgent};
use switchboard_core::config::AppConfig;
use switchboard_gateway::{configure_tracing, setup_metrics_recorder, GatewayServer};
use switchboard_orchestrator::{
    builtin_rules, AgentRegistry, IntentClassifier, IntentRouter, OrchestratorAgent,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    configure_tracing(&config.logging)?;
    tracing::info!("Starting Switchboard v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Agent registry
    // =========================================================================
    let registry = Arc::new(AgentRegistry::new());

    let enabled = |name: &str| {
        config
            .agents
            .get(name)
            .map(|settings| settings.enabled)
            .unwrap_or(true)
    };
    let priority = |name: &str| {
        config
            .agents
            .get(name)
            .map(|settings| settings.priority)
            .unwrap_or(0)
    };

    let mut demos: Vec<_> = demo_agents()
        .into_iter()
        .filter(|(name, _)| enabled(name))
        .collect();
    demos.sort_by_key(|(name, _)| std::cmp::Reverse(priority(name)));
    for (name, agent) in demos {
        registry.register(Arc::new(agent))?;
        tracing::info!(agent = name, "registered demo agent");
    }
    if enabled("echo") {
        registry.register(Arc::new(EchoAgent))?;
        tracing::info!(agent = "echo", "registered demo agent");
    }

    // =========================================================================
    // Router and orchestrator
    // =========================================================================
    let mut classifier = IntentClassifier::new();
    for (name, keywords, patterns) in builtin_rules() {
        if registry.contains(name) {
            classifier.add_agent(name, &keywords, &patterns)?;
        }
    }
    // Agents without a builtin rule table match on their capability keywords.
    for info in registry.agents_info() {
        if classifier.agents().contains(&info.name.as_str()) {
            continue;
        }
        let keywords: Vec<String> = info
            .capabilities
            .iter()
            .flat_map(|cap| cap.keywords.iter().cloned())
            .collect();
        let keyword_refs: Vec<&str> = keywords.iter().map(|k| k.as_str()).collect();
        classifier.add_agent(&info.name, &keyword_refs, &[])?;
    }

    let router = IntentRouter::new(
        registry.clone(),
        classifier,
        config.routing.clone(),
        config.orchestrator.router_model.clone(),
    );
    if config.routing.llm_routing_enabled {
        // Model-provider credentials and clients are wired by the deployment;
        // without one, routing stops at the code-based steps.
        tracing::warn!("llm_routing_enabled is set but no model client is wired; skipping LLM fallback");
    }

    let orchestrator = Arc::new(OrchestratorAgent::new(
        config.clone(),
        registry,
        router,
        None,
    ));

    // =========================================================================
    // HTTP server
    // =========================================================================
    let metrics_handle = setup_metrics_recorder()?;
    let server = GatewayServer::new(config.server.clone(), orchestrator).with_metrics(metrics_handle);
    server.run().await?;

    Ok(())
}
