//! Budget alert trigger

use api_types::alert::{AlertFailureView, AlertRunResponse};
use axum::{Extension, Json, extract::State};
use chrono::Utc;

use crate::{Caller, ServerError, server::ServerState};

/// Run a budget alert evaluation over every user.
///
/// Meant for a scheduler hitting the API; per-user failures are reported in
/// the body, not as an error status.
pub async fn run(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<AlertRunResponse>, ServerError> {
    tracing::info!(user_id = %caller.user_id, "budget alert run requested");
    let summary = state.engine.run_budget_alerts(Utc::now()).await?;

    Ok(Json(AlertRunResponse {
        evaluated: summary.evaluated,
        sent: summary.sent,
        skipped: summary.skipped,
        failed: summary.failed,
        failures: summary
            .failures
            .into_iter()
            .map(|f| AlertFailureView {
                user_id: f.user_id,
                reason: f.reason,
            })
            .collect(),
    }))
}
