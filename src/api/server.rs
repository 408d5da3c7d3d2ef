use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::{handlers, ws};
use crate::bus::EventBus;
use crate::decision::DecisionProvider;
use crate::engine::{MissionRuntime, Scheduler};
use crate::planner::Planner;
use crate::providers::LLMProvider;
use crate::store::MissionStore;
use crate::tools::ToolRuntime;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MissionStore>,
    pub events: EventBus,
    pub runtime: Arc<MissionRuntime>,
    pub scheduler: Arc<Scheduler>,
    pub planner: Arc<Planner>,
}

impl AppState {
    pub fn new(
        decider: Arc<dyn DecisionProvider>,
        llm: Arc<dyn LLMProvider>,
        tools: ToolRuntime,
    ) -> Self {
        let store = Arc::new(MissionStore::new());
        let events = EventBus::new();
        let runtime = Arc::new(MissionRuntime::new(
            store.clone(),
            events.clone(),
            decider,
            tools,
        ));
        let scheduler = Scheduler::new(runtime.clone());
        let planner = Arc::new(Planner::new(llm));

        Self {
            store,
            events,
            runtime,
            scheduler,
            planner,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/upload-artifact", post(handlers::upload_artifact))
        .route("/api/state", get(handlers::get_state))
        .route("/api/artifacts/:id", get(handlers::get_artifact))
        .route("/ws", get(ws::handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    log::info!("marionette control panel listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::decision::LlmDecisionProvider;
    use crate::providers::MockLLMProvider;
    use crate::types::{Artifact, ArtifactKind};
    use std::time::Duration;

    fn create_test_app() -> (Router, AppState) {
        let llm = Arc::new(MockLLMProvider::new());
        let state = AppState::new(
            Arc::new(LlmDecisionProvider::new(llm.clone())),
            llm,
            ToolRuntime::new().with_latency(Duration::ZERO),
        );
        (create_router(state.clone()), state)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_upload_then_fetch_round_trip() {
        let (app, _) = create_test_app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/upload-artifact")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r##"{"name": "notes.md", "content": "# Notes\nbody", "type": "markdown"}"##,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["artifact"]["createdBy"], "User");
        let id = json["artifact"]["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/artifacts/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["name"], "notes.md");
        assert_eq!(json["content"], "# Notes\nbody");
        assert_eq!(json["type"], "markdown");
    }

    #[tokio::test]
    async fn test_upload_missing_fields_is_rejected() {
        let (app, state) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/upload-artifact")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name": "notes.md"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // No partial state.
        assert!(state.store.list_artifacts().is_empty());
    }

    #[tokio::test]
    async fn test_get_artifact_not_found() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/artifacts/00000000-0000-0000-0000-000000000000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_state_snapshot() {
        let (app, state) = create_test_app();

        state.store.insert_artifact(Artifact::new(
            "a.txt",
            ArtifactKind::Text,
            "x",
            "User",
        ));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/state")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert!(json["agents"].as_array().unwrap().is_empty());
        assert!(json["tasks"].as_array().unwrap().is_empty());
        assert_eq!(json["artifacts"].as_array().unwrap().len(), 1);
        assert!(json["logs"].as_array().unwrap().is_empty());
    }
}
