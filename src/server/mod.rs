// SPDX-License-Identifier: MIT

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::{EngineError, RunStatus, WorkflowRunner, WorkflowState};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub runner: WorkflowRunner,
    /// Graph used when a start request names none
    pub default_graph: String,
}

#[derive(Debug, Default, Deserialize)]
struct StartRunRequest {
    graph_id: Option<String>,
    state: Option<Value>,
}

/// Errors surfaced to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Engine(EngineError),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Engine(EngineError::RunNotFound { .. }) => {
                (StatusCode::NOT_FOUND, "Run not found".to_string())
            }
            ApiError::Engine(err) if err.is_not_found() => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            ApiError::Engine(err) => {
                log::error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn make_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/graphs", get(list_graphs))
        .route("/api/runs", get(list_runs))
        .route("/run", post(start_run))
        .route("/result/{run_id}", get(get_result))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(port: u16, state: AppState) -> Result<(), EngineError> {
    let app = make_app(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_graphs(State(state): State<AppState>) -> Json<Value> {
    let graphs: Vec<_> = state
        .runner
        .graphs()
        .graphs()
        .iter()
        .map(|g| g.to_definition())
        .collect();
    Json(json!(graphs))
}

async fn list_runs(State(state): State<AppState>) -> Json<Value> {
    let ids = state.runner.result_ids().await;
    Json(json!({ "runs": ids }))
}

async fn start_run(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: StartRunRequest = if body.is_empty() {
        StartRunRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let graph_id = request
        .graph_id
        .unwrap_or_else(|| state.default_graph.clone());
    let overrides = request
        .state
        .map(WorkflowState::from_json)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let run_id = state.runner.start(&graph_id, overrides).await?;
    let record = state.runner.result(&run_id).await?;

    let message = match record.status {
        RunStatus::CompletedWithError => "Run finished with an error",
        RunStatus::Cancelled => "Run cancelled",
        _ => "Run finished",
    };

    Ok(Json(json!({
        "run_id": run_id,
        "status": record.status,
        "message": message,
    })))
}

async fn get_result(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.runner.result(&run_id).await?;
    Ok(Json(json!(record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{GraphCatalog, InMemoryRunStore, NodeRegistry, RunnerConfig, START};
    use crate::review;
    use axum::{body::Body, http::Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let mut registry = NodeRegistry::new();
        review::register_nodes(&mut registry).unwrap();
        let mut catalog = GraphCatalog::new();
        catalog.register(review::graph(START).unwrap()).unwrap();

        let runner = WorkflowRunner::new(
            Arc::new(catalog),
            Arc::new(registry),
            Arc::new(InMemoryRunStore::new()),
            RunnerConfig::default(),
        );
        make_app(AppState {
            runner,
            default_graph: review::GRAPH_ID.to_string(),
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_start_then_fetch_result() {
        let app = app();

        let response = app.clone().oneshot(post("/run", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let started = body_json(response).await;
        assert_eq!(started["status"], "COMPLETED_MAX_ITERATIONS");
        assert_eq!(started["message"], "Run finished");
        let run_id = started["run_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(get(&format!("/result/{}", run_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let result = body_json(response).await;
        assert_eq!(result["run_id"], run_id.as_str());
        assert_eq!(result["state"]["iteration"], 5);
        assert_eq!(result["state"]["quality_score"], 0);
        assert_eq!(result["logs"][0], "Running extract");
    }

    #[tokio::test]
    async fn test_start_with_state_override() {
        let body = r#"{"graph_id": "code-review-1", "state": {"quality_score": 95}}"#;
        let response = app().oneshot(post("/run", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "COMPLETED");
    }

    #[tokio::test]
    async fn test_start_unknown_graph_is_404() {
        let response = app()
            .oneshot(post("/run", r#"{"graph_id": "nope"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["error"],
            "Graph 'nope' not found"
        );
    }

    #[tokio::test]
    async fn test_start_malformed_body_is_400() {
        let response = app().oneshot(post("/run", "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(post("/run", r#"{"state": [1, 2]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_run_is_404() {
        let response = app().oneshot(get("/result/deadbeef")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({"error": "Run not found"}));
    }

    #[tokio::test]
    async fn test_list_graphs_and_runs() {
        let app = app();

        let response = app.clone().oneshot(get("/api/graphs")).await.unwrap();
        let graphs = body_json(response).await;
        assert_eq!(graphs[0]["id"], "code-review-1");
        assert_eq!(graphs[0]["edges"]["suggest"], "check");

        let response = app.clone().oneshot(post("/run", "")).await.unwrap();
        let run_id = body_json(response).await["run_id"].clone();

        let response = app.oneshot(get("/api/runs")).await.unwrap();
        assert_eq!(body_json(response).await["runs"], json!([run_id]));
    }
}
