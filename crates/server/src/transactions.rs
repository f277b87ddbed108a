//! Transactions API endpoints

use api_types::transaction::{
    TransactionAmend, TransactionKind as ApiKind, TransactionListQuery, TransactionListResponse,
    TransactionNew, TransactionStatus as ApiStatus, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{
    AmendTransactionCmd, MoneyCents, PostTransactionCmd, TransactionKind, TransactionListFilter,
    TransactionStatus,
};
use uuid::Uuid;

use crate::{Caller, ServerError, server::ServerState, to_fixed};

const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 500;

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Income => ApiKind::Income,
        TransactionKind::Expense => ApiKind::Expense,
    }
}

fn unmap_kind(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Income => TransactionKind::Income,
        ApiKind::Expense => TransactionKind::Expense,
    }
}

fn map_status(status: TransactionStatus) -> ApiStatus {
    match status {
        TransactionStatus::Pending => ApiStatus::Pending,
        TransactionStatus::Completed => ApiStatus::Completed,
        TransactionStatus::Failed => ApiStatus::Failed,
    }
}

fn view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        account_id: tx.account_id,
        kind: map_kind(tx.kind),
        amount_minor: tx.amount.cents(),
        category: tx.category,
        description: tx.description,
        status: map_status(tx.status),
        occurred_at: to_fixed(tx.occurred_at),
        version: tx.version,
    }
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit > MAX_LIST_LIMIT {
        return Err(ServerError::Generic(format!(
            "limit must be <= {MAX_LIST_LIMIT}"
        )));
    }
    let filter = TransactionListFilter {
        account_id: query.account_id,
        kinds: query.kind.map(|kind| vec![unmap_kind(kind)]),
        from: query.from.map(|dt| dt.with_timezone(&Utc)),
        to: query.to.map(|dt| dt.with_timezone(&Utc)),
        limit: Some(limit),
    };

    let txs = state
        .engine
        .list_transactions(&caller.user_id, &filter)
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: txs.into_iter().map(view).collect(),
    }))
}

/// Post a new income or expense
pub async fn post(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let now = Utc::now();
    let occurred_at = payload
        .occurred_at
        .map_or(now, |dt| dt.with_timezone(&Utc));
    let mut cmd = PostTransactionCmd::new(
        caller.user_id,
        payload.account_id,
        unmap_kind(payload.kind),
        MoneyCents::new(payload.amount_minor),
        occurred_at,
    )
    .category(payload.category);
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }

    let tx = state.engine.post_transaction(cmd, now).await?;
    Ok((StatusCode::CREATED, Json(view(tx))))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(id, &caller.user_id).await?;
    Ok(Json(view(tx)))
}

/// Replace a transaction with the submitted state
pub async fn amend(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionAmend>,
) -> Result<Json<TransactionView>, ServerError> {
    let cmd = AmendTransactionCmd {
        user_id: caller.user_id,
        transaction_id: id,
        kind: unmap_kind(payload.kind),
        amount: MoneyCents::new(payload.amount_minor),
        account_id: payload.account_id,
        occurred_at: payload.occurred_at.with_timezone(&Utc),
        category: payload.category,
        description: payload.description,
    };

    let tx = state.engine.amend_transaction(cmd, Utc::now()).await?;
    Ok(Json(view(tx)))
}

pub async fn retract(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .retract_transaction(id, &caller.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
