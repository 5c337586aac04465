use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use switchboard_core::config::{AgentSettings, AppConfig, RateLimitSettings};
use switchboard_core::mocks::MockAgent;
use switchboard_gateway::GatewayServer;
use switchboard_orchestrator::{
    builtin_rules, AgentRegistry, IntentClassifier, IntentRouter, OrchestratorAgent,
};

fn build_app(agents: Vec<Arc<MockAgent>>, tweak: impl FnOnce(&mut AppConfig)) -> Router {
    let registry = Arc::new(AgentRegistry::new());
    for agent in agents {
        registry.register(agent).unwrap();
    }

    let mut config = AppConfig::default();
    config.routing.llm_routing_enabled = false;
    config.routing.code_routing_threshold = 0.2;
    tweak(&mut config);

    let mut classifier = IntentClassifier::new();
    for (name, keywords, patterns) in builtin_rules() {
        if registry.contains(name) {
            classifier.add_agent(name, &keywords, &patterns).unwrap();
        }
    }
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
async fn health_reports_available_agents() {
    let app = build_app(
        vec![
            Arc::new(MockAgent::named("gmail")),
            Arc::new(MockAgent::named("weather").unhealthy()),
        ],
        |_| {},
    );

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["agents"]["gmail"], "available");
    assert_eq!(json["agents"]["weather"], "unavailable");
    assert!(json["version"].as_str().is_some());
}

#[tokio::test]
async fn health_is_degraded_when_no_agent_available() {
    let app = build_app(vec![Arc::new(MockAgent::named("gmail").unhealthy())], |_| {});

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["status"], "degraded");
}

#[tokio::test]
async fn health_with_empty_registry_is_healthy() {
    let app = build_app(vec![], |_| {});
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn agents_endpoint_preserves_registration_order() {
    let app = build_app(
        vec![
            Arc::new(MockAgent::named("weather")),
            Arc::new(MockAgent::named("gmail")),
        ],
        |_| {},
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/agents")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["agents"][0]["name"], "weather");
    assert_eq!(json["agents"][1]["name"], "gmail");
    assert!(json["agents"][0]["capabilities"].is_array());
}

#[tokio::test]
async fn query_routes_by_keyword() {
    let app = build_app(vec![Arc::new(MockAgent::named("gmail"))], |_| {});

    let response = app
        .oneshot(post_json("/api/v1/query", json!({"query": "check my email"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["agent_used"], "gmail");
    assert!(!json["session_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn query_echoes_live_session_id() {
    let app = build_app(vec![Arc::new(MockAgent::named("gmail"))], |_| {});

    let first = app
        .clone()
        .oneshot(post_json("/api/v1/query", json!({"query": "check my email"})))
        .await
        .unwrap();
    let sid = body_json(first).await["session_id"].as_str().unwrap().to_string();

    let second = app
        .oneshot(post_json(
            "/api/v1/query",
            json!({"query": "any unread mail", "session_id": sid}),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(second).await["session_id"], sid.as_str());
}

#[tokio::test]
async fn greeting_is_answered_by_orchestrator() {
    let app = build_app(vec![Arc::new(MockAgent::named("gmail"))], |_| {});

    let response = app
        .oneshot(post_json("/api/v1/query", json!({"query": "hello"})))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["agent_used"], "orchestrator");
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn unmatched_query_uses_fallback() {
    let app = build_app(vec![Arc::new(MockAgent::named("gmail"))], |_| {});

    let response = app
        .oneshot(post_json("/api/v1/query", json!({"query": "fold my laundry"})))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["agent_used"], "fallback");
    assert_eq!(json["success"], true);
    assert!(json["response"].as_str().unwrap().contains("gmail"));
}

#[tokio::test]
async fn missing_query_field_is_bad_request() {
    let app = build_app(vec![], |_| {});
    let response = app
        .oneshot(post_json("/api/v1/query", json!({"session_id": "abc"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = build_app(vec![], |_| {});
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/query")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_query_is_bad_request() {
    let app = build_app(vec![], |_| {});
    let response = app
        .oneshot(post_json("/api/v1/query", json!({"query": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn direct_bypass_reaches_named_agent() {
    let app = build_app(vec![Arc::new(MockAgent::named("gmail"))], |_| {});

    let response = app
        .oneshot(post_json(
            "/api/v1/gmail/query",
            json!({"query": "fold my laundry"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["agent_used"], "gmail");
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn direct_bypass_to_unknown_agent_is_not_found() {
    let app = build_app(vec![Arc::new(MockAgent::named("gmail"))], |_| {});

    let response = app
        .oneshot(post_json("/api/v1/spotify/query", json!({"query": "play jazz"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn rate_limited_query_is_an_application_error() {
    let app = build_app(vec![Arc::new(MockAgent::named("gmail"))], |config| {
        config.agents.insert(
            "gmail".into(),
            AgentSettings {
                rate_limit: RateLimitSettings {
                    max_calls: 1,
                    window_seconds: 60,
                },
                ..AgentSettings::default()
            },
        );
    });

    let first = app
        .clone()
        .oneshot(post_json("/api/v1/query", json!({"query": "check my email"})))
        .await
        .unwrap();
    assert_eq!(body_json(first).await["success"], true);

    let second = app
        .oneshot(post_json("/api/v1/query", json!({"query": "check my email"})))
        .await
        .unwrap();
    // Application error: HTTP 200 with success=false.
    assert_eq!(second.status(), StatusCode::OK);
    let json = body_json(second).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "rate_limited");
    assert!(json["response"].as_str().unwrap().contains("try again"));
}
