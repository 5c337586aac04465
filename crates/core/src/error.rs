//! Error types for Switchboard.

use thiserror::Error;

/// Result type alias using Switchboard's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Switchboard.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // =========================================================================
    // Dispatch Errors
    // =========================================================================
    #[error("Agent failure in '{agent}': {message}")]
    AgentFailure { agent: String, message: String },

    #[error("Routing failed: {0}")]
    RoutingFailed(String),

    #[error("Cancelled")]
    Cancelled,

    // =========================================================================
    // Boundary Errors
    // =========================================================================
    #[error("Model provider error: {0}")]
    ModelProvider(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an unknown agent error.
    pub fn unknown_agent(name: impl Into<String>) -> Self {
        Self::UnknownAgent(name.into())
    }

    /// Create a rate limited error.
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create an agent failure error.
    pub fn agent_failure(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AgentFailure {
            agent: agent.into(),
            message: message.into(),
        }
    }

    /// Create a routing failure error.
    pub fn routing_failed(msg: impl Into<String>) -> Self {
        Self::RoutingFailed(msg.into())
    }

    /// Create a model provider error.
    pub fn model_provider(msg: impl Into<String>) -> Self {
        Self::ModelProvider(msg.into())
    }

    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
