//! Accounts API endpoints

use api_types::account::{AccountKind as ApiKind, AccountListResponse, AccountNew, AccountView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{AccountKind, MoneyCents, NewAccountCmd};
use uuid::Uuid;

use crate::{Caller, ServerError, server::ServerState, to_fixed};

fn map_kind(kind: AccountKind) -> ApiKind {
    match kind {
        AccountKind::Current => ApiKind::Current,
        AccountKind::Savings => ApiKind::Savings,
    }
}

fn view(account: engine::Account) -> AccountView {
    AccountView {
        id: account.id,
        name: account.name,
        kind: map_kind(account.kind),
        opening_balance_minor: account.opening_balance.cents(),
        balance_minor: account.balance.cents(),
        is_default: account.is_default,
        created_at: to_fixed(account.created_at),
    }
}

/// Handle requests for listing the caller's accounts
pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<AccountListResponse>, ServerError> {
    let accounts = state.engine.accounts(&caller.user_id).await?;
    Ok(Json(AccountListResponse {
        accounts: accounts.into_iter().map(view).collect(),
    }))
}

/// Handle requests for opening a new account
pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let kind = match payload.kind.unwrap_or_default() {
        ApiKind::Current => AccountKind::Current,
        ApiKind::Savings => AccountKind::Savings,
    };
    let cmd = NewAccountCmd::new(caller.user_id, payload.name, kind)
        .opening_balance(MoneyCents::new(payload.opening_balance_minor.unwrap_or(0)))
        .is_default(payload.is_default.unwrap_or(false));

    let account = state.engine.create_account(cmd, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(view(account))))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(id, &caller.user_id).await?;
    Ok(Json(view(account)))
}

pub async fn set_default(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.set_default_account(id, &caller.user_id).await?;
    Ok(Json(view(account)))
}

/// Rebuild the account balance from its transactions
pub async fn recompute(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.recompute_balance(id, &caller.user_id).await?;
    Ok(Json(view(account)))
}
