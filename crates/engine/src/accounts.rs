//! The module contains `Account` struct and its implementation.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, util::parse_uuid};

/// Category of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountKind {
    #[default]
    Current,
    Savings,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "CURRENT",
            Self::Savings => "SAVINGS",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CURRENT" => Ok(Self::Current),
            "SAVINGS" => Ok(Self::Savings),
            other => Err(EngineError::InvalidArgument(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// An account.
///
/// An account is where money is held: a bank current account, a savings
/// account, cash. Its `balance` is denormalized: it always equals
/// `opening_balance` plus the signed amounts of every transaction posted
/// against it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub opening_balance: MoneyCents,
    pub balance: MoneyCents,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        user_id: String,
        name: String,
        kind: AccountKind,
        opening_balance: MoneyCents,
        is_default: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            kind,
            opening_balance,
            balance: opening_balance,
            is_default,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub opening_balance: i64,
    pub balance: i64,
    pub is_default: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            opening_balance: ActiveValue::Set(value.opening_balance.cents()),
            balance: ActiveValue::Set(value.balance.cents()),
            is_default: ActiveValue::Set(value.is_default),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            user_id: model.user_id,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            opening_balance: MoneyCents::new(model.opening_balance),
            balance: MoneyCents::new(model.balance),
            is_default: model.is_default,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(AccountKind::try_from("current").unwrap(), AccountKind::Current);
        assert_eq!(AccountKind::try_from(" SAVINGS ").unwrap(), AccountKind::Savings);
        assert!(AccountKind::try_from("credit").is_err());
    }

    #[test]
    fn new_account_starts_at_opening_balance() {
        let account = Account::new(
            "user_1".to_string(),
            "Current Account".to_string(),
            AccountKind::Current,
            MoneyCents::new(25_00),
            true,
            Utc::now(),
        );
        assert_eq!(account.balance, MoneyCents::new(25_00));
        assert_eq!(account.opening_balance, account.balance);
    }

    #[test]
    fn active_model_stores_kind_code() {
        let account = Account::new(
            "user_1".to_string(),
            "Savings".to_string(),
            AccountKind::Savings,
            MoneyCents::ZERO,
            false,
            Utc::now(),
        );
        let active = ActiveModel::from(&account);
        assert_eq!(active.kind, ActiveValue::Set("SAVINGS".to_string()));
        assert_eq!(active.id, ActiveValue::Set(account.id.to_string()));
    }
}
