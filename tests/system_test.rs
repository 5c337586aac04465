//! End-to-end tests over the default wiring: demo agents, builtin classifier
//! rules, and the HTTP gateway.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use switchboard_agents::{demo_agents, EchoAgent};
use switchboard_core::config::AppConfig;
use switchboard_gateway::GatewayServer;
use switchboard_orchestrator::{
    builtin_rules, AgentRegistry, IntentClassifier, IntentRouter, OrchestratorAgent,
};

fn build_app() -> Router {
    let registry = Arc::new(AgentRegistry::new());
    for (_, agent) in demo_agents() {
        registry.register(Arc::new(agent)).unwrap();
    }
    registry.register(Arc::new(EchoAgent)).unwrap();

    let mut config = AppConfig::default();
    config.routing.llm_routing_enabled = false;
    config.routing.code_routing_threshold = 0.2;

    let mut classifier = IntentClassifier::new();
    for (name, keywords, patterns) in builtin_rules() {
        classifier.add_agent(name, &keywords, &patterns).unwrap();
    }
    classifier.add_agent("echo", &["echo", "repeat", "say"], &[]).unwrap();

    let router = IntentRouter::new(
        registry.clone(),
        classifier,
        config.routing.clone(),
        config.orchestrator.router_model.clone(),
    );
    let orchestrator = Arc::new(OrchestratorAgent::new(config.clone(), registry, router, None));
    GatewayServer::new(config.server, orchestrator).build_router()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_lists_all_demo_agents() {
    let app = build_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    for name in ["gmail", "calendar", "weather", "echo"] {
        assert_eq!(json["agents"][name], "available");
    }
}

#[tokio::test]
async fn email_query_reaches_the_gmail_demo() {
    let app = build_app();
    let response = app
        .oneshot(post_json("/api/v1/query", json!({"query": "check my email"})))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["agent_used"], "gmail");
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn echo_query_routes_on_capability_keywords() {
    let app = build_app();
    let response = app
        .oneshot(post_json("/api/v1/query", json!({"query": "echo hello out there"})))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["agent_used"], "echo");
    assert!(json["response"].as_str().unwrap().contains("hello"));
}

#[tokio::test]
async fn follow_up_sticks_with_the_previous_agent() {
    let app = build_app();
    let first = app
        .clone()
        .oneshot(post_json("/api/v1/query", json!({"query": "what's the weather"})))
        .await
        .unwrap();
    let first_json = body_json(first).await;
    assert_eq!(first_json["agent_used"], "weather");
    let sid = first_json["session_id"].as_str().unwrap().to_string();

    let second = app
        .oneshot(post_json(
            "/api/v1/query",
            json!({"query": "what about tomorrow?", "session_id": sid}),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(second).await["agent_used"], "weather");
}

#[tokio::test]
async fn stream_terminates_with_done() {
    let app = build_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/query/stream",
            json!({"query": "say something nice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    let frames: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect();
    assert!(frames.len() >= 2);
    assert_eq!(*frames.last().unwrap(), "[DONE]");
}
