/*!
 * # Health Check Module
 *
 * `GET /health` reports process liveness together with a database ping.
 * A failed ping turns the response into a 503.
 */

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::AppState;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Overall health information
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub database: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

impl HealthInfo {
    pub fn new(database: HealthStatus) -> Self {
        Self {
            status: database,
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            timestamp: Utc::now(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthInfo>) {
    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => HealthStatus::Up,
        Err(e) => {
            warn!(error = %e, "database health check failed");
            HealthStatus::Down
        }
    };

    let info = HealthInfo::new(database);
    (info.status_code(), Json(info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_database_is_unavailable() {
        let info = HealthInfo::new(HealthStatus::Down);
        assert_eq!(info.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["status"], "down");
        assert_eq!(value["database"], "down");
    }

    #[test]
    fn up_database_is_ok() {
        let info = HealthInfo::new(HealthStatus::Up);
        assert_eq!(info.status_code(), StatusCode::OK);
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }
}
