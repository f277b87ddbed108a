//! Transaction primitives.
//!
//! A `Transaction` is one posted monetary event against one account. The
//! amount is always a positive magnitude; the direction comes from the kind.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    /// Signed balance change for `amount` posted with this kind.
    #[must_use]
    pub fn signed_delta(self, amount: MoneyCents) -> MoneyCents {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            other => Err(EngineError::InvalidArgument(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(EngineError::InvalidArgument(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub category: String,
    pub amount: MoneyCents,
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
    pub status: TransactionStatus,
    /// Bumped on every amend; used to detect concurrent writers.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        account_id: Uuid,
        kind: TransactionKind,
        category: String,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let amount = amount.require_positive("amount")?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            account_id,
            kind,
            category,
            amount,
            occurred_at,
            description,
            status: TransactionStatus::Completed,
            version: 0,
            created_at,
            updated_at: created_at,
        })
    }

    /// The amount this transaction contributes to its account balance.
    #[must_use]
    pub fn signed_delta(&self) -> MoneyCents {
        self.kind.signed_delta(self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub kind: String,
    pub category: String,
    pub amount_minor: i64,
    pub occurred_at: DateTimeUtc,
    pub description: Option<String>,
    pub status: String,
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            category: ActiveValue::Set(tx.category.clone()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            description: ActiveValue::Set(tx.description.clone()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            version: ActiveValue::Set(tx.version),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: model.user_id,
            account_id: parse_uuid(&model.account_id, "account")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            category: model.category,
            amount: MoneyCents::new(model.amount_minor),
            occurred_at: model.occurred_at,
            description: model.description,
            status: TransactionStatus::try_from(model.status.as_str())?,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_delta_follows_kind() {
        let amount = MoneyCents::new(100_00);
        assert_eq!(TransactionKind::Income.signed_delta(amount), amount);
        assert_eq!(TransactionKind::Expense.signed_delta(amount), -amount);
    }

    #[test]
    fn kind_rejects_unknown_values() {
        assert_eq!(TransactionKind::try_from("expense").unwrap(), TransactionKind::Expense);
        assert_eq!(
            TransactionKind::try_from("TRANSFER"),
            Err(EngineError::InvalidArgument(
                "invalid transaction kind: TRANSFER".to_string()
            ))
        );
    }

    #[test]
    fn new_rejects_non_positive_amounts() {
        let now = Utc::now();
        for cents in [0, -1] {
            let res = Transaction::new(
                "user_1".to_string(),
                Uuid::new_v4(),
                TransactionKind::Expense,
                "food".to_string(),
                MoneyCents::new(cents),
                now,
                None,
                now,
            );
            assert!(matches!(res, Err(EngineError::InvalidArgument(_))));
        }
    }

    #[test]
    fn new_transactions_are_completed() {
        let now = Utc::now();
        let tx = Transaction::new(
            "user_1".to_string(),
            Uuid::new_v4(),
            TransactionKind::Income,
            "salary".to_string(),
            MoneyCents::new(5_000_00),
            now,
            Some("January".to_string()),
            now,
        )
        .unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.version, 0);
        assert_eq!(tx.signed_delta(), MoneyCents::new(5_000_00));
    }
}
