//! Command structs for engine operations.
//!
//! These types group parameters for write operations (post/amend, account
//! creation), keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountKind, MoneyCents, TransactionKind};

/// Post a new transaction against an account.
#[derive(Clone, Debug)]
pub struct PostTransactionCmd {
    pub user_id: String,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount: MoneyCents,
    pub occurred_at: DateTime<Utc>,
    pub category: String,
    pub description: Option<String>,
}

impl PostTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        account_id: Uuid,
        kind: TransactionKind,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            account_id,
            kind,
            amount,
            occurred_at,
            category: String::new(),
            description: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Rewrite every field of an existing transaction.
///
/// All fields are required: the caller sends the full new state, as the
/// transaction edit form does.
#[derive(Clone, Debug)]
pub struct AmendTransactionCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub kind: TransactionKind,
    pub amount: MoneyCents,
    pub account_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub category: String,
    pub description: Option<String>,
}

impl AmendTransactionCmd {
    /// Starts from the current state of `tx`, so callers only override what
    /// changes.
    #[must_use]
    pub fn from_transaction(user_id: impl Into<String>, tx: &crate::Transaction) -> Self {
        Self {
            user_id: user_id.into(),
            transaction_id: tx.id,
            kind: tx.kind,
            amount: tx.amount,
            account_id: tx.account_id,
            occurred_at: tx.occurred_at,
            category: tx.category.clone(),
            description: tx.description.clone(),
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = amount;
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = account_id;
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Open a new account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub opening_balance: MoneyCents,
    pub is_default: bool,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind,
            opening_balance: MoneyCents::ZERO,
            is_default: false,
        }
    }

    #[must_use]
    pub fn opening_balance(mut self, opening_balance: MoneyCents) -> Self {
        self.opening_balance = opening_balance;
        self
    }

    #[must_use]
    pub fn is_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}
