use std::{fmt, sync::Arc};

use sea_orm::DatabaseConnection;

use crate::{AlertPolicy, EngineError, Notifier, ResultEngine};

mod access;
mod accounts;
mod alerts;
mod balances;
mod budgets;
mod ledger;
mod users;

pub use ledger::TransactionListFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// An early `?` inside the block drops the transaction, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    notifier: Option<Arc<dyn Notifier>>,
    alert_policy: AlertPolicy,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("notifier", &self.notifier.is_some())
            .field("alert_policy", &self.alert_policy)
            .finish()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn alert_policy(&self) -> &AlertPolicy {
        &self.alert_policy
    }

    fn notifier(&self) -> ResultEngine<&dyn Notifier> {
        self.notifier
            .as_deref()
            .ok_or_else(|| EngineError::InvalidState("no notifier configured".to_string()))
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Option<Arc<dyn Notifier>>,
    alert_policy: AlertPolicy,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Transport used by budget alerts. Without it alert runs fail with
    /// `InvalidState`; ledger operations do not need it.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    pub fn alert_policy(mut self, policy: AlertPolicy) -> EngineBuilder {
        self.alert_policy = policy;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if matches!(self.database, DatabaseConnection::Disconnected) {
            return Err(EngineError::InvalidState(
                "database connection is required".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            notifier: self.notifier,
            alert_policy: self.alert_policy,
        })
    }
}
