//! Core traits for Switchboard.
//!
//! - `agent`: the specialist contract (Agent, ChunkStream)
//! - `llm`: the upstream model provider contract (LlmClient)

pub mod agent;
pub mod llm;

pub use agent::*;
pub use llm::*;
