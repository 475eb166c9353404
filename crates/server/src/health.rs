use std::path::{Path, PathBuf};

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    template_path: PathBuf,
    transports: Vec<String>,
}

impl HealthState {
    pub fn new(template_path: PathBuf, transports: Vec<String>) -> Self {
        Self { template_path, transports }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub template: HealthCheck,
    pub transports: Vec<String>,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/", get(health)).route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let template = template_check(&state.template_path).await;
    let ready = template.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "quotedesk-server is running".to_string(),
        },
        template,
        transports: state.transports.clone(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn template_check(path: &Path) -> HealthCheck {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => HealthCheck {
            status: "ready",
            detail: format!("template found at {}", path.display()),
        },
        Ok(_) => HealthCheck {
            status: "degraded",
            detail: format!("{} is not a file", path.display()),
        },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("template unavailable at {}: {error}", path.display()),
        },
    }
}
