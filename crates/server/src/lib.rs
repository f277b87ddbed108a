use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, FixedOffset, Utc};
use engine::EngineError;

use serde::Serialize;
pub use server::{Caller, ServerState, router, run, run_with_listener};

mod accounts;
mod alerts;
mod budget;
mod server;
mod transactions;

pub mod types {
    pub mod account {
        pub use api_types::account::{AccountKind, AccountListResponse, AccountNew, AccountView};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            TransactionAmend, TransactionKind, TransactionListQuery, TransactionListResponse,
            TransactionNew, TransactionStatus, TransactionView,
        };
    }

    pub mod budget {
        pub use api_types::budget::{BudgetSet, BudgetView};
    }

    pub mod alert {
        pub use api_types::alert::{AlertFailureView, AlertRunResponse};
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::InvalidState(_) | EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::Transport(_) => StatusCode::BAD_GATEWAY,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Renders a stored UTC instant with an explicit `+00:00` offset.
pub(crate) fn to_fixed(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_unauthorized_maps_to_401() {
        let res = ServerError::from(EngineError::Unauthorized("who".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflicts_map_to_409() {
        let res = ServerError::from(EngineError::Conflict("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let res = ServerError::from(EngineError::InvalidState("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res =
            ServerError::from(EngineError::InvalidArgument("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn engine_transport_maps_to_502() {
        let res = ServerError::from(EngineError::Transport("smtp".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn database_errors_are_hidden() {
        let res = ServerError::from(EngineError::Database(sea_orm::DbErr::Custom(
            "disk full".to_string(),
        )))
        .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
