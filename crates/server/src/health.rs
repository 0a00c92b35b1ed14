//! `GET /health`: database reachability, decommission schema version and the depth of
//! the approval and execution queues. Any failed check answers 503.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use baja_core::domain::request::RequestState;
use baja_db::{migrations, DbPool};
use chrono::Utc;
use serde::Serialize;
use sqlx::Row;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

impl HealthCheck {
    fn ready(detail: impl Into<String>) -> Self {
        Self { status: "ready", detail: detail.into() }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self { status: "degraded", detail: detail.into() }
    }

    fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    pub awaiting_evaluation: i64,
    pub awaiting_execution: i64,
    pub in_execution: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub schema: HealthCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queues: Option<QueueDepth>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let schema = if database.is_ready() {
        schema_check(&state.db_pool).await
    } else {
        HealthCheck::degraded("skipped: database unreachable")
    };
    let queues = if schema.is_ready() { queue_depth(&state.db_pool).await } else { None };

    let ready = database.is_ready() && schema.is_ready();
    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        schema,
        queues,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck::ready("database query succeeded"),
        Err(error) => {
            warn!(
                event_name = "system.health.database_degraded",
                correlation_id = "health",
                error = %error,
                "health check could not reach the database"
            );
            HealthCheck::degraded(format!("database query failed: {error}"))
        }
    }
}

async fn schema_check(pool: &DbPool) -> HealthCheck {
    let expected = migrations::expected_version();
    match migrations::applied_version(pool).await {
        Ok(Some(applied)) if Some(applied) >= expected => {
            HealthCheck::ready(format!("decommission schema at version {applied}"))
        }
        Ok(None) => HealthCheck::degraded("no migrations applied; run `baja migrate`"),
        Ok(Some(applied)) => {
            warn!(
                event_name = "system.health.schema_behind",
                correlation_id = "health",
                applied,
                expected = expected.unwrap_or_default(),
                "decommission schema is behind this build"
            );
            HealthCheck::degraded(format!(
                "decommission schema at version {applied}, build expects {}",
                expected.unwrap_or_default()
            ))
        }
        Err(error) => HealthCheck::degraded(format!("migration ledger unreadable: {error}")),
    }
}

async fn queue_depth(pool: &DbPool) -> Option<QueueDepth> {
    let rows =
        sqlx::query("SELECT state, COUNT(*) AS total FROM decommission_request GROUP BY state")
            .fetch_all(pool)
            .await
            .ok()?;

    let mut depth = QueueDepth::default();
    for row in rows {
        let state: String = row.try_get("state").ok()?;
        let total: i64 = row.try_get("total").ok()?;
        match RequestState::parse(&state) {
            Some(RequestState::Pending) => depth.awaiting_evaluation = total,
            Some(RequestState::Approved) => depth.awaiting_execution = total,
            Some(RequestState::Executing) => depth.in_execution = total,
            _ => {}
        }
    }
    Some(depth)
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use baja_db::{connect_with_settings, migrations};

    use crate::health::{health, HealthState, QueueDepth};

    #[tokio::test]
    async fn health_reports_schema_version_and_queues_once_migrated() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations");
        sqlx::query(
            "INSERT INTO decommission_request (
                id, request_code, state, equipment_code, equipment_name, responsible_party,
                requester, decline_type, technical_justification, version, created_at, updated_at
             ) VALUES ('R-1', 'BAJA-2026-00001', 'pending', 'EQ-1', 'Autoclave', 'Dr. X',
                       'front desk', 'end_of_life', 'worn', 1, '2026-01-01T00:00:00Z',
                       '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert pending request");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.schema.detail, "decommission schema at version 1");
        assert_eq!(
            payload.queues,
            Some(QueueDepth { awaiting_evaluation: 1, awaiting_execution: 0, in_execution: 0 })
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn health_is_degraded_before_migrations_run() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.schema.status, "degraded");
        assert_eq!(payload.queues, None);

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.schema.detail, "skipped: database unreachable");
    }
}
