//! Liveness, readiness and per-component health endpoints.

use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but something needs an operator's attention
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// The worse of the two.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn new(component: &str, status: HealthStatus, error: Option<String>) -> Self {
        Self {
            component: component.to_string(),
            status,
            error,
            timestamp: now(),
            details: None,
        }
    }

    pub fn healthy(component: &str) -> Self {
        Self::new(component, HealthStatus::Healthy, None)
    }

    pub fn degraded(component: &str, error: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Degraded, Some(error.into()))
    }

    pub fn unhealthy(component: &str, error: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Unhealthy, Some(error.into()))
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: i64,
    pub version: String,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub status: HealthStatus,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_ready: Vec<String>,
}

impl IntoResponse for ReadinessResponse {
    fn into_response(self) -> Response {
        let status = if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthResponse {
    pub status: HealthStatus,
    pub timestamp: i64,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl IntoResponse for ComponentHealthResponse {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}

#[derive(Clone)]
pub struct HealthChecker {
    state: Arc<AppState>,
}

impl HealthChecker {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn liveness(&self) -> HealthResponse {
        HealthResponse {
            status: HealthStatus::Healthy,
            timestamp: now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Ready when no component is unhealthy. A degraded component still
    /// takes traffic.
    pub async fn readiness(&self) -> ReadinessResponse {
        let components = self.check_all_components().await;
        let status = overall(&components);
        let not_ready = components
            .iter()
            .filter(|(_, health)| health.status == HealthStatus::Unhealthy)
            .map(|(name, _)| name.clone())
            .collect();
        ReadinessResponse {
            ready: status != HealthStatus::Unhealthy,
            status,
            timestamp: now(),
            not_ready,
        }
    }

    pub async fn components(&self) -> ComponentHealthResponse {
        let components = self.check_all_components().await;
        ComponentHealthResponse {
            status: overall(&components),
            timestamp: now(),
            components,
        }
    }

    async fn check_all_components(&self) -> BTreeMap<String, ComponentHealth> {
        let checker = self.clone();
        let checks = tokio::task::spawn_blocking(move || {
            [
                checker.check_resource_root(),
                checker.check_domains(),
                checker.check_temp_dir(),
            ]
        })
        .await;

        match checks {
            Ok(checks) => checks
                .into_iter()
                .map(|health| (health.component.clone(), health))
                .collect(),
            Err(error) => {
                let failed = ComponentHealth::unhealthy("health_checks", error.to_string());
                BTreeMap::from([(failed.component.clone(), failed)])
            }
        }
    }

    fn check_resource_root(&self) -> ComponentHealth {
        let root = self.state.config().resource_root.clone();
        match fs::read_dir(&root) {
            Ok(_) => ComponentHealth::healthy("resource_root")
                .with_details(serde_json::json!({ "path": root.display().to_string() })),
            Err(error) => ComponentHealth::unhealthy(
                "resource_root",
                format!("resource root {} is not readable: {error}", root.display()),
            ),
        }
    }

    fn check_domains(&self) -> ComponentHealth {
        let domains = self.state.domains();
        let rest: Vec<&str> = domains
            .names()
            .filter(|name| {
                domains
                    .get(name)
                    .is_some_and(|domain| domain.is_rest_enabled())
            })
            .collect();
        let details = serde_json::json!({
            "loaded": domains.len(),
            "rest_enabled": rest,
        });
        if rest.is_empty() {
            ComponentHealth::degraded("domains", "no domain is published on the REST API")
                .with_details(details)
        } else {
            ComponentHealth::healthy("domains").with_details(details)
        }
    }

    fn check_temp_dir(&self) -> ComponentHealth {
        let dir = self.state.temp_dir();
        let probe = fs::create_dir_all(&dir).and_then(|_| tempfile::tempfile_in(&dir));
        match probe {
            Ok(_) => ComponentHealth::healthy("temp_dir")
                .with_details(serde_json::json!({ "path": dir.display().to_string() })),
            Err(error) => ComponentHealth::unhealthy(
                "temp_dir",
                format!("cannot create files in {}: {error}", dir.display()),
            ),
        }
    }
}

fn overall(components: &BTreeMap<String, ComponentHealth>) -> HealthStatus {
    components
        .values()
        .fold(HealthStatus::Healthy, |status, health| status.combine(health.status))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub async fn liveness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.liveness()
}

pub async fn readiness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.readiness().await
}

pub async fn components_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.components().await
}
