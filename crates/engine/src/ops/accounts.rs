use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{Account, NewAccountCmd, ResultEngine, accounts, util::normalize_required};

use super::{Engine, with_tx};

impl Engine {
    /// Opens a new account for the caller.
    ///
    /// The first account of a user is always the default one; asking for a
    /// new default clears the flag on the previous one, so each user keeps at
    /// most one default account.
    pub async fn create_account(
        &self,
        cmd: NewAccountCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<Account> {
        let name = normalize_required(&cmd.name, "account name")?;
        cmd.opening_balance.require_in_range("opening balance")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.user_id).await?;

            let has_accounts = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(cmd.user_id.as_str()))
                .one(&db_tx)
                .await?
                .is_some();
            let is_default = cmd.is_default || !has_accounts;
            if is_default {
                self.clear_default_account(&db_tx, &cmd.user_id).await?;
            }

            let account = Account::new(
                cmd.user_id.clone(),
                name,
                cmd.kind,
                cmd.opening_balance,
                is_default,
                now,
            );
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            tracing::debug!(account_id = %account.id, user_id = %cmd.user_id, "account created");

            Ok(account)
        })
    }

    /// Lists the caller's accounts, newest first.
    pub async fn accounts(&self, user_id: &str) -> ResultEngine<Vec<Account>> {
        self.require_user(&self.database, user_id).await?;
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_desc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    pub async fn account(&self, account_id: Uuid, user_id: &str) -> ResultEngine<Account> {
        self.require_user(&self.database, user_id).await?;
        let model = self
            .require_account_owned(&self.database, account_id, user_id)
            .await?;
        Account::try_from(model)
    }

    /// Makes `account_id` the caller's default account.
    pub async fn set_default_account(
        &self,
        account_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            self.require_account_owned(&db_tx, account_id, user_id)
                .await?;
            self.clear_default_account(&db_tx, user_id).await?;

            let model = accounts::ActiveModel {
                id: ActiveValue::Set(account_id.to_string()),
                is_default: ActiveValue::Set(true),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            Account::try_from(model)
        })
    }

    async fn clear_default_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<()> {
        accounts::Entity::update_many()
            .col_expr(accounts::Column::IsDefault, Expr::value(false))
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::IsDefault.eq(true))
            .exec(db_tx)
            .await?;
        Ok(())
    }
}
