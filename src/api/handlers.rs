use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::types::{Artifact, ArtifactId, ArtifactKind, ServerEvent};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
pub struct UploadArtifactRequest {
    pub name: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ArtifactKind>,
}

/// Feed a user-authored file to the agents. The artifact is broadcast so
/// connected panels render it immediately.
pub async fn upload_artifact(
    State(state): State<AppState>,
    Json(request): Json<UploadArtifactRequest>,
) -> Result<Json<Value>, ApiError> {
    let missing = || ApiError::BadRequest("Name and content are required".to_string());
    let name = request.name.filter(|n| !n.is_empty()).ok_or_else(missing)?;
    let content = request.content.filter(|c| !c.is_empty()).ok_or_else(missing)?;

    let artifact = Artifact::new(
        name,
        request.kind.unwrap_or(ArtifactKind::Text),
        content,
        "User",
    );
    state.store.insert_artifact(artifact.clone());
    state.events.send(ServerEvent::Artifact(artifact.clone()));
    log::info!("Artifact uploaded: {}", artifact.name);

    Ok(Json(json!({ "success": true, "artifact": artifact })))
}

pub async fn get_state(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "agents": state.store.list_agents(),
        "tasks": state.store.list_tasks(),
        "artifacts": state.store.list_artifacts(),
        "logs": state.store.list_logs(),
    }))
}

pub async fn get_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Artifact>, ApiError> {
    let not_found = || ApiError::NotFound("Artifact not found".to_string());
    let id: ArtifactId = id.parse().map_err(|_| not_found())?;
    state
        .store
        .get_artifact(id)
        .map(Json)
        .ok_or_else(not_found)
}
