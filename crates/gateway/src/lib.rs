#![deny(unused)]
//! HTTP/SSE endpoint layer for Switchboard.
//!
//! Translates HTTP requests into orchestrator calls and streams chunked
//! responses back as Server-Sent Events.

pub mod metrics;
pub mod server;
pub mod telemetry;

pub use metrics::setup_metrics_recorder;
pub use server::{AppState, GatewayServer};
pub use telemetry::configure_tracing;
