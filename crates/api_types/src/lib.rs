//! JSON shapes exchanged with the Welth HTTP API.
//!
//! Amounts travel as integer minor units (`*_minor`), timestamps as RFC 3339
//! strings with an offset.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum AccountKind {
        #[default]
        Current,
        Savings,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        pub kind: Option<AccountKind>,
        /// Starting balance in minor units, defaults to zero.
        pub opening_balance_minor: Option<i64>,
        pub is_default: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub name: String,
        pub kind: AccountKind,
        pub opening_balance_minor: i64,
        pub balance_minor: i64,
        pub is_default: bool,
        pub created_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountListResponse {
        pub accounts: Vec<AccountView>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum TransactionStatus {
        Pending,
        Completed,
        Failed,
    }

    /// Body of `POST /transactions`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub account_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub category: String,
        pub description: Option<String>,
        /// Defaults to the time the request is handled.
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    /// Body of `PUT /transactions/{id}`: the complete new state.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionAmend {
        pub account_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub category: String,
        pub description: Option<String>,
        pub occurred_at: DateTime<FixedOffset>,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        pub account_id: Option<Uuid>,
        pub kind: Option<TransactionKind>,
        /// Inclusive lower bound.
        pub from: Option<DateTime<FixedOffset>>,
        /// Exclusive upper bound.
        pub to: Option<DateTime<FixedOffset>>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub category: String,
        pub description: Option<String>,
        pub status: TransactionStatus,
        pub occurred_at: DateTime<FixedOffset>,
        pub version: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetSet {
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub amount_minor: i64,
        pub last_alert_sent: Option<DateTime<FixedOffset>>,
        /// Expenses of the current month, in minor units.
        pub spent_minor: i64,
        pub percent_used: i64,
    }
}

pub mod alert {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AlertFailureView {
        pub user_id: String,
        pub reason: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AlertRunResponse {
        pub evaluated: usize,
        pub sent: usize,
        pub skipped: usize,
        pub failed: usize,
        pub failures: Vec<AlertFailureView>,
    }
}
