//! Budget API endpoints

use api_types::budget::{BudgetSet, BudgetView};
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use engine::{BudgetProgress, EngineError, MoneyCents};

use crate::{Caller, ServerError, server::ServerState, to_fixed};

fn view(progress: BudgetProgress) -> BudgetView {
    BudgetView {
        id: progress.budget.id,
        amount_minor: progress.budget.amount.cents(),
        last_alert_sent: progress.budget.last_alert_sent.map(to_fixed),
        spent_minor: progress.spent.cents(),
        percent_used: progress.percent_used,
    }
}

/// Budget ceiling and spending of the current month
pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<BudgetView>, ServerError> {
    let progress = state
        .engine
        .budget_progress(&caller.user_id, Utc::now())
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))?;
    Ok(Json(view(progress)))
}

pub async fn set(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetSet>,
) -> Result<Json<BudgetView>, ServerError> {
    let now = Utc::now();
    state
        .engine
        .set_budget(&caller.user_id, MoneyCents::new(payload.amount_minor), now)
        .await?;
    let progress = state
        .engine
        .budget_progress(&caller.user_id, now)
        .await?
        .ok_or_else(|| EngineError::InvalidState("budget missing after update".to_string()))?;
    Ok(Json(view(progress)))
}
