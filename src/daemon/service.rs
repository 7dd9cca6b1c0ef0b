use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::solver::{ChallengeAction, ChallengePayload, ChallengeResponse, Solver};

/// Discovery document for the group version, listing the solver resource.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiResourceList {
    kind: &'static str,
    api_version: &'static str,
    group_version: String,
    resources: Vec<ApiResource>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiResource {
    name: String,
    singular_name: String,
    namespaced: bool,
    kind: &'static str,
    verbs: Vec<&'static str>,
}

#[derive(Clone)]
struct AppState {
    solver: Arc<dyn Solver>,
    group_name: Arc<str>,
}

/// Routes for the webhook API group served by this process.
pub fn router(solver: Arc<dyn Solver>, group_name: &str) -> Router {
    let state = AppState {
        solver,
        group_name: Arc::from(group_name),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/apis/{group}/v1alpha1", get(discovery))
        .route("/apis/{group}/v1alpha1/{solver}", post(solve))
        .with_state(state)
}

pub async fn run(listen: &str, group_name: &str, solver: Arc<dyn Solver>) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;

    info!(
        listen,
        group = group_name,
        solver = solver.name(),
        "Webhook server started"
    );

    axum::serve(listener, router(solver, group_name))
        .with_graceful_shutdown(async {
            if let Err(e) = wait_for_shutdown().await {
                error!("Error waiting for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, stopping webhook server");
        })
        .await
        .context("Webhook server failed")?;

    Ok(())
}

/// Run one challenge payload through the solver and fill in its response.
pub async fn process_payload(solver: &dyn Solver, mut payload: ChallengePayload) -> ChallengePayload {
    let response = match payload.request.as_ref() {
        None => ChallengeResponse::bad_request("", "challenge payload has no request"),
        Some(request) => {
            let result = match request.action {
                ChallengeAction::Present => Some(solver.present(request).await),
                ChallengeAction::CleanUp => Some(solver.clean_up(request).await),
                ChallengeAction::Unknown => None,
            };

            match result {
                Some(Ok(())) => ChallengeResponse::success(request.uid.clone()),
                Some(Err(e)) => ChallengeResponse::failure(request.uid.clone(), &e),
                None => {
                    warn!(uid = %request.uid, "Unsupported challenge action");
                    ChallengeResponse::bad_request(
                        request.uid.clone(),
                        "unsupported challenge action",
                    )
                }
            }
        }
    };

    payload.response = Some(response);
    payload
}

async fn healthz() -> &'static str {
    "ok"
}

async fn discovery(State(state): State<AppState>, Path(group): Path<String>) -> Response {
    if group != *state.group_name {
        return StatusCode::NOT_FOUND.into_response();
    }

    let name = state.solver.name().to_string();
    Json(ApiResourceList {
        kind: "APIResourceList",
        api_version: "v1",
        group_version: format!("{}/v1alpha1", group),
        resources: vec![ApiResource {
            singular_name: name.clone(),
            name,
            namespaced: false,
            kind: "ChallengePayload",
            verbs: vec!["create"],
        }],
    })
    .into_response()
}

async fn solve(
    State(state): State<AppState>,
    Path((group, solver)): Path<(String, String)>,
    Json(payload): Json<ChallengePayload>,
) -> Response {
    if group != *state.group_name || solver != state.solver.name() {
        return StatusCode::NOT_FOUND.into_response();
    }

    Json(process_payload(state.solver.as_ref(), payload).await).into_response()
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
