//! - GET /health：存活 + 采集计数器快照

use api_contract::{HealthDto, MetricsSnapshotDto};
use axum::{Json, response::IntoResponse};
use devhub_telemetry::metrics;

pub async fn health() -> impl IntoResponse {
    let snapshot = metrics().snapshot();
    Json(HealthDto {
        ok: true,
        metrics: MetricsSnapshotDto {
            messages_received: snapshot.messages_received,
            points_written: snapshot.points_written,
            dropped_unknown_topic: snapshot.dropped_unknown_topic,
            dropped_decode: snapshot.dropped_decode,
            sink_failures: snapshot.sink_failures,
            registrations_attempted: snapshot.registrations_attempted,
            registrations_succeeded: snapshot.registrations_succeeded,
            registrations_existing: snapshot.registrations_existing,
            registrations_failed: snapshot.registrations_failed,
            directory_refreshes: snapshot.directory_refreshes,
            directory_refresh_failures: snapshot.directory_refresh_failures,
            token_renewals: snapshot.token_renewals,
            reauthentications: snapshot.reauthentications,
        },
    })
}
