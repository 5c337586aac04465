//! Layered configuration for the gateway and orchestrator.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub orchestrator: OrchestratorConfig,
    pub routing: RoutingConfig,
    pub agents: HashMap<String, AgentSettings>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_origins: vec!["*".into()],
            debug: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Model used for direct handling.
    pub model: String,
    /// Model used for the LLM routing fallback.
    pub router_model: String,
    /// Session TTL in minutes.
    pub session_timeout_minutes: u64,
    /// Cap on stored turns per session.
    pub max_turns: usize,
    /// Deadline for orchestrator queries, in seconds.
    pub query_timeout_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".into(),
            router_model: "claude-3-5-haiku-20241022".into(),
            session_timeout_minutes: 30,
            max_turns: 20,
            query_timeout_seconds: 180,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RoutingConfig {
    /// Minimum classifier score for code-based routing.
    pub code_routing_threshold: f32,
    /// Enable the LLM routing fallback.
    pub llm_routing_enabled: bool,
    /// Enable follow-up continuation detection.
    pub follow_up_detection: bool,
    /// Agent to use when routing cannot decide, if any.
    pub default_agent: Option<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            code_routing_threshold: 0.7,
            llm_routing_enabled: true,
            follow_up_detection: true,
            default_agent: None,
        }
    }
}

/// Per-agent settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentSettings {
    pub enabled: bool,
    pub priority: i32,
    /// Deadline for direct-bypass queries to this agent, in seconds.
    pub timeout_seconds: u64,
    /// Spoken prefix emitted before streamed delegation, if any.
    pub announcement: Option<String>,
    /// Sliding-window budget protecting this agent.
    pub rate_limit: RateLimitSettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 0,
            timeout_seconds: 120,
            announcement: None,
            rate_limit: RateLimitSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_calls: usize,
    pub window_seconds: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_calls: 30,
            window_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_routing_decisions: bool,
    pub log_agent_responses: bool,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            log_routing_decisions: true,
            log_agent_responses: false,
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from layered files and the environment.
    ///
    /// Sources, later overriding earlier: `config/default`, an optional
    /// `config/<SWITCHBOARD_ENV>` file, an optional `config/local` file, then
    /// `SWITCHBOARD__SECTION__KEY` environment variables. The standalone
    /// `API_HOST` variable overrides the bind host last.
    pub fn load() -> Result<Self> {
        let env = std::env::var("SWITCHBOARD_ENV").unwrap_or_else(|_| "development".into());

        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map SWITCHBOARD__SERVER__PORT=8000 to server.port
            .add_source(Environment::with_prefix("SWITCHBOARD").separator("__"))
            .build()
            .map_err(|e| Error::config(e.to_string()))?;

        let mut app: AppConfig = settings
            .try_deserialize()
            .map_err(|e| Error::config(e.to_string()))?;

        if let Ok(host) = std::env::var("API_HOST") {
            if !host.is_empty() {
                app.server.host = host;
            }
        }

        app.validate()?;
        Ok(app)
    }

    /// Reject values the orchestrator cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.orchestrator.session_timeout_minutes == 0 {
            return Err(Error::config("session_timeout_minutes must be positive"));
        }
        if self.orchestrator.max_turns == 0 {
            return Err(Error::config("max_turns must be positive"));
        }
        if !(0.0..=1.0).contains(&self.routing.code_routing_threshold) {
            return Err(Error::config("code_routing_threshold must be in [0, 1]"));
        }
        Ok(())
    }

    /// Session TTL as a duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.orchestrator.session_timeout_minutes * 60)
    }

    /// Deadline for orchestrator queries.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.orchestrator.query_timeout_seconds)
    }

    /// Deadline for direct-bypass queries to `agent`.
    pub fn agent_timeout(&self, agent: &str) -> Duration {
        let secs = self
            .agents
            .get(agent)
            .map(|a| a.timeout_seconds)
            .unwrap_or_else(|| AgentSettings::default().timeout_seconds);
        Duration::from_secs(secs)
    }
}
