//! Ledger and budget-alert core of Welth.
//!
//! The [`Engine`] owns a database connection and exposes two groups of
//! operations:
//!
//! - the ledger: posting, amending and retracting transactions while keeping
//!   every account balance equal to its opening balance plus its transactions;
//! - budget alerts: notifying users once per day when their spending hits a
//!   watched percentage of their budget.

pub use accounts::{Account, AccountKind};
pub use alerts::{
    AlertFailure, AlertMessage, AlertOutcome, AlertPolicy, AlertRunSummary, BudgetSelection,
    SpendPeriod, WATCHED_THRESHOLDS, spent_percent,
};
pub use budgets::{Budget, BudgetProgress};
pub use commands::{AmendTransactionCmd, NewAccountCmd, PostTransactionCmd};
pub use error::EngineError;
pub use money::MoneyCents;
pub use notifier::Notifier;
pub use ops::{Engine, EngineBuilder, TransactionListFilter};
pub use transactions::{Transaction, TransactionKind, TransactionStatus};
pub use users::User;

mod accounts;
mod alerts;
mod budgets;
mod commands;
mod error;
mod money;
mod notifier;
mod ops;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
