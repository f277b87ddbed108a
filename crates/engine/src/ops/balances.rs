use sea_orm::{ActiveValue, QueryFilter, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Account, EngineError, MoneyCents, ResultEngine, TransactionKind, accounts, transactions,
};

use super::{Engine, with_tx};

impl Engine {
    /// Recomputes the denormalized balance of an account from the ledger
    /// (opening balance plus every transaction posted against it).
    ///
    /// Returns the account with its repaired balance. A mismatch is logged,
    /// since it means a balance was changed outside the ledger.
    pub async fn recompute_balance(
        &self,
        account_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let model = self
                .require_account_owned(&db_tx, account_id, user_id)
                .await?;
            let stored = MoneyCents::new(model.balance);

            let rows: Vec<(String, i64)> = transactions::Entity::find()
                .select_only()
                .column(transactions::Column::Kind)
                .column(transactions::Column::AmountMinor)
                .filter(transactions::Column::AccountId.eq(account_id.to_string()))
                .into_tuple()
                .all(&db_tx)
                .await?;

            let mut balance = MoneyCents::new(model.opening_balance);
            for (kind, amount_minor) in rows {
                let delta = TransactionKind::try_from(kind.as_str())?
                    .signed_delta(MoneyCents::new(amount_minor));
                balance = balance.checked_add(delta).ok_or_else(|| {
                    EngineError::InvalidState("account balance overflow".to_string())
                })?;
            }

            if balance != stored {
                tracing::warn!(
                    %account_id,
                    stored = %stored,
                    recomputed = %balance,
                    "account balance drifted from ledger"
                );
            }

            let model = accounts::ActiveModel {
                id: ActiveValue::Set(account_id.to_string()),
                balance: ActiveValue::Set(balance.cents()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            Account::try_from(model)
        })
    }
}
