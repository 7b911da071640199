// src/server.rs

use crate::config::{ScannerConfig, ServerSettings};
use crate::core::error::ScanError;
use crate::core::models::ScanReport;
use crate::core::scanner::Scanner;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// State shared by every handler.
pub struct AppState {
    pub scanner: Scanner,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceBanner {
    pub service: String,
    pub version: String,
    pub status: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub modules: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub target: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Maps request-level scan failures onto HTTP responses.
pub struct ApiError(ScanError);

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ScanError::InvalidTarget(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ScanError::Orchestration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { detail: self.0.to_string() })).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/scan", post(scan_target))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the listener and serves the REST API until the process is stopped.
pub async fn serve(settings: ServerSettings, config: &ScannerConfig) -> color_eyre::Result<()> {
    let state = Arc::new(AppState { scanner: Scanner::new(config) });
    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    info!(addr = %settings.bind, "REST API listening.");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub async fn root() -> Json<ServiceBanner> {
    Json(ServiceBanner {
        service: "Exposure RS Scanner".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        description: "Attack Surface Discovery & Misconfiguration Assessment".to_string(),
    })
}

pub async fn health_check() -> Json<HealthResponse> {
    let modules = ["network", "tls", "headers", "domain", "email"]
        .into_iter()
        .map(|m| (m.to_string(), "operational".to_string()))
        .collect();
    Json(HealthResponse { status: "healthy".to_string(), modules })
}

pub async fn scan_target(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanReport>, ApiError> {
    info!(target = %request.target, "Scan requested over the API.");
    match state.scanner.scan(&request.target).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            match &e {
                ScanError::InvalidTarget(_) => warn!(error = %e, "Rejected scan request."),
                ScanError::Orchestration(_) => error!(error = %e, "Scan failed."),
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ProbeError;
    use crate::core::models::Category;
    use crate::core::risk_scorer::RiskScorer;
    use crate::core::runner::ModuleRunner;
    use crate::core::scanner::{ModuleOutcome, ProbeModule};
    use crate::core::target::Target;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Quiet;

    #[async_trait]
    impl ProbeModule for Quiet {
        fn name(&self) -> &'static str {
            "Quiet"
        }

        fn category(&self) -> Category {
            Category::Domain
        }

        async fn scan(&self, _target: &Target) -> Result<ModuleOutcome, ProbeError> {
            Ok(ModuleOutcome::default())
        }
    }

    fn state() -> Arc<AppState> {
        let scanner = Scanner::with_modules(
            vec![Arc::new(Quiet)],
            ModuleRunner::new(Duration::from_secs(1)),
            RiskScorer::default(),
        );
        Arc::new(AppState { scanner })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn banner_reports_operational() {
        let Json(banner) = root().await;
        assert_eq!(banner.status, "operational");
        assert_eq!(banner.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn health_lists_the_five_modules() {
        let Json(health) = health_check().await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.modules.len(), 5);
        assert!(health.modules.values().all(|s| s == "operational"));
        assert!(health.modules.contains_key("email"));
    }

    #[tokio::test]
    async fn scan_returns_a_report() {
        let request = ScanRequest { target: "example.com".into() };
        let Json(report) = scan_target(State(state()), Json(request)).await.ok().unwrap();
        assert_eq!(report.target, "example.com");
        assert_eq!(report.technical_view.modules_results.len(), 1);
    }

    #[tokio::test]
    async fn invalid_target_maps_to_unprocessable_entity() {
        let request = ScanRequest { target: "https://example.com/login".into() };
        let err = scan_target(State(state()), Json(request)).await.err().unwrap();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("not a full URL"));
    }

    #[tokio::test]
    async fn orchestration_failure_maps_to_internal_error() {
        let response = ApiError::from(ScanError::Orchestration("slot lost".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "scan orchestration failed: slot lost");
    }

    #[test]
    fn router_builds() {
        let _ = router(state());
    }
}
