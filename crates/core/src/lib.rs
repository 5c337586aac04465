#![deny(unused)]
//! Core types, traits, config, and error definitions for Switchboard.
//!
//! This crate provides the foundational building blocks shared across the
//! orchestrator, gateway, and agent crates.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{Agent, ChatMessage, ChunkStream, LlmClient, LlmResponse, LlmUsage};
pub use types::{
    AgentCapability, AgentResponse, ConversationContext, ConversationTurn, RoutingDecision,
    FOLLOW_UP_PHRASES, FOLLOW_UP_PRONOUNS,
};
