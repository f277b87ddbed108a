use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};
use chrono::Utc;

use std::sync::Arc;

use crate::{ServerError, accounts, alerts, budget, transactions};
use engine::{Engine, EngineError};

static USER_ID_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-user-id");
static USER_EMAIL_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-user-email");
static USER_NAME_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-user-name");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Identity of the caller, resolved by the auth middleware.
#[derive(Clone, Debug)]
pub struct Caller {
    pub user_id: String,
}

/// Implements `Header` for a non-empty, trimmed string header.
macro_rules! text_header {
    ($name:ident, $header:ident) => {
        #[derive(Debug)]
        struct $name(String);

        impl Header for $name {
            fn name() -> &'static axum::http::HeaderName {
                &$header
            }

            fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
            where
                Self: Sized,
                I: Iterator<Item = &'i axum::http::HeaderValue>,
            {
                let value = values.next().ok_or_else(AxumError::invalid)?;
                let Ok(value) = value.to_str() else {
                    return Err(AxumError::invalid());
                };
                let value = value.trim();
                if value.is_empty() {
                    return Err(AxumError::invalid());
                }

                Ok($name(value.to_string()))
            }

            fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
                match axum::http::HeaderValue::from_str(&self.0) {
                    Ok(value) => values.extend(std::iter::once(value)),
                    Err(_) => tracing::error!("failed to encode {} header", $header),
                }
            }
        }
    };
}

text_header!(UserIdHeader, USER_ID_HEADER);
text_header!(UserEmailHeader, USER_EMAIL_HEADER);
text_header!(UserNameHeader, USER_NAME_HEADER);

/// The gateway in front of the API authenticates the session and forwards
/// the subject in `x-user-id`. When it also forwards `x-user-email` the user
/// is registered on first sight.
async fn auth(
    user_id: Option<TypedHeader<UserIdHeader>>,
    email: Option<TypedHeader<UserEmailHeader>>,
    name: Option<TypedHeader<UserNameHeader>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(UserIdHeader(user_id))) = user_id else {
        return Err(EngineError::Unauthorized("missing caller identity".to_string()).into());
    };

    if let Some(TypedHeader(UserEmailHeader(email))) = email {
        let name = name.map(|TypedHeader(UserNameHeader(name))| name);
        state
            .engine
            .ensure_user(&user_id, &email, name.as_deref(), Utc::now())
            .await?;
    }

    request.extensions_mut().insert(Caller { user_id });
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts", get(accounts::list).post(accounts::create))
        .route("/accounts/{id}", get(accounts::get))
        .route("/accounts/{id}/default", post(accounts::set_default))
        .route("/accounts/{id}/recompute", post(accounts::recompute))
        .route(
            "/transactions",
            get(transactions::list).post(transactions::post),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .put(transactions::amend)
                .delete(transactions::retract),
        )
        .route("/budget", get(budget::get).put(budget::set))
        .route("/alerts/run", post(alerts::run))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Arc<Engine>, addr: &str) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine };

    axum::serve(listener, router(state)).await
}
