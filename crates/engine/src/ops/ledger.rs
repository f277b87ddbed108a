//! Ledger writes: post, amend and retract transactions.
//!
//! Every write runs in one DB transaction that touches both the
//! `transactions` row and the affected account balances. Balances are only
//! ever moved with relative updates (`balance = balance + delta`), never
//! written back from a value read earlier, so two writers on the same
//! account cannot lose each other's change. Amend and retract are gated on
//! the transaction `version`, so two concurrent edits of the same transaction
//! cannot both apply their reversal.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AmendTransactionCmd, EngineError, MoneyCents, PostTransactionCmd, ResultEngine, Transaction,
    TransactionKind, accounts, transactions,
    util::{normalize_optional_text, normalize_required},
};

use super::{Engine, with_tx};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionListFilter {
    pub account_id: Option<Uuid>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidArgument(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::InvalidArgument(
            "kinds must not be empty".to_string(),
        ));
    }
    if filter.limit == Some(0) {
        return Err(EngineError::InvalidArgument(
            "limit must be > 0".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Posts a new transaction and applies its signed amount to the account.
    ///
    /// Fails with `Unauthorized` when the caller is unknown or does not own the
    /// account, `KeyNotFound` when the account does not exist and
    /// `InvalidArgument` for an amount outside `1..=MoneyCents::MAX`, an empty
    /// category or a change that would overflow the account balance.
    pub async fn post_transaction(
        &self,
        cmd: PostTransactionCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        let category = normalize_required(&cmd.category, "category")?;
        let tx = Transaction::new(
            cmd.user_id.clone(),
            cmd.account_id,
            cmd.kind,
            category,
            cmd.amount,
            cmd.occurred_at,
            normalize_optional_text(cmd.description.as_deref()),
            now,
        )?;

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.user_id).await?;
            self.require_account_owned(&db_tx, cmd.account_id, &cmd.user_id)
                .await?;

            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            apply_balance_delta(&db_tx, tx.account_id, tx.signed_delta()).await?;
            tracing::debug!(
                transaction_id = %tx.id,
                account_id = %tx.account_id,
                delta = %tx.signed_delta(),
                "transaction posted"
            );

            Ok(tx)
        })
    }

    /// Rewrites a transaction, moving its balance contribution.
    ///
    /// The original signed amount is reversed on the original account and the
    /// new one applied on the target account, in the same DB transaction as the
    /// row update. When the account does not change only the difference is
    /// applied.
    pub async fn amend_transaction(
        &self,
        cmd: AmendTransactionCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        let category = normalize_required(&cmd.category, "category")?;
        cmd.amount.require_positive("amount")?;
        let description = normalize_optional_text(cmd.description.as_deref());
        let user_id = cmd.user_id.as_str();

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let current = self
                .require_transaction_owned(&db_tx, cmd.transaction_id, user_id)
                .await?;
            let current = Transaction::try_from(current)?;
            self.require_account_owned(&db_tx, current.account_id, user_id)
                .await?;
            if cmd.account_id != current.account_id {
                self.require_account_owned(&db_tx, cmd.account_id, user_id)
                    .await?;
            }

            let amended = Transaction {
                kind: cmd.kind,
                amount: cmd.amount,
                account_id: cmd.account_id,
                occurred_at: cmd.occurred_at,
                category,
                description,
                version: current.version + 1,
                updated_at: now,
                ..current.clone()
            };

            let res = transactions::Entity::update_many()
                .set(transactions::ActiveModel {
                    account_id: ActiveValue::Set(amended.account_id.to_string()),
                    kind: ActiveValue::Set(amended.kind.as_str().to_string()),
                    category: ActiveValue::Set(amended.category.clone()),
                    amount_minor: ActiveValue::Set(amended.amount.cents()),
                    occurred_at: ActiveValue::Set(amended.occurred_at),
                    description: ActiveValue::Set(amended.description.clone()),
                    version: ActiveValue::Set(amended.version),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                })
                .filter(transactions::Column::Id.eq(current.id.to_string()))
                .filter(transactions::Column::Version.eq(current.version))
                .exec(&db_tx)
                .await?;
            if res.rows_affected == 0 {
                return Err(EngineError::Conflict(
                    "transaction was modified concurrently".to_string(),
                ));
            }

            let old_delta = current.signed_delta();
            let new_delta = amended.signed_delta();
            if current.account_id == amended.account_id {
                let delta = new_delta.checked_sub(old_delta).ok_or_else(|| {
                    EngineError::InvalidArgument("amount change overflows".to_string())
                })?;
                apply_balance_delta(&db_tx, amended.account_id, delta).await?;
            } else {
                apply_balance_delta(&db_tx, current.account_id, -old_delta).await?;
                apply_balance_delta(&db_tx, amended.account_id, new_delta).await?;
            }
            tracing::debug!(
                transaction_id = %amended.id,
                from_account = %current.account_id,
                to_account = %amended.account_id,
                old_delta = %old_delta,
                new_delta = %new_delta,
                "transaction amended"
            );

            Ok(amended)
        })
    }

    /// Deletes a transaction and reverses its balance contribution.
    ///
    /// Returns the removed transaction.
    pub async fn retract_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let model = self
                .require_transaction_owned(&db_tx, transaction_id, user_id)
                .await?;
            let tx = Transaction::try_from(model)?;

            let res = transactions::Entity::delete_many()
                .filter(transactions::Column::Id.eq(tx.id.to_string()))
                .filter(transactions::Column::Version.eq(tx.version))
                .exec(&db_tx)
                .await?;
            if res.rows_affected == 0 {
                return Err(EngineError::Conflict(
                    "transaction was modified concurrently".to_string(),
                ));
            }

            apply_balance_delta(&db_tx, tx.account_id, -tx.signed_delta()).await?;
            tracing::debug!(
                transaction_id = %tx.id,
                account_id = %tx.account_id,
                "transaction retracted"
            );

            Ok(tx)
        })
    }

    pub async fn transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Transaction> {
        self.require_user(&self.database, user_id).await?;
        let model = self
            .require_transaction_owned(&self.database, transaction_id, user_id)
            .await?;
        Transaction::try_from(model)
    }

    /// Lists the caller's transactions, newest first.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;
        self.require_user(&self.database, user_id).await?;

        let mut query =
            transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id));
        if let Some(account_id) = filter.account_id {
            self.require_account_owned(&self.database, account_id, user_id)
                .await?;
            query = query.filter(transactions::Column::AccountId.eq(account_id.to_string()));
        }
        if let Some(kinds) = &filter.kinds {
            query = query.filter(
                transactions::Column::Kind.is_in(kinds.iter().map(|k| k.as_str().to_string())),
            );
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}

/// Moves an account balance by `delta` relative to its current stored value.
///
/// The update only matches while the new balance still fits in an `i64`, so an
/// overflowing change is rejected instead of being stored as a non-integer.
async fn apply_balance_delta(
    db_tx: &DatabaseTransaction,
    account_id: Uuid,
    delta: MoneyCents,
) -> ResultEngine<()> {
    let delta = delta.cents();
    let in_range = if delta >= 0 {
        accounts::Column::Balance.lte(i64::MAX - delta)
    } else {
        accounts::Column::Balance.gte(i64::MIN - delta)
    };
    let res = accounts::Entity::update_many()
        .col_expr(
            accounts::Column::Balance,
            Expr::col(accounts::Column::Balance).add(delta),
        )
        .filter(accounts::Column::Id.eq(account_id.to_string()))
        .filter(in_range)
        .exec(db_tx)
        .await?;
    if res.rows_affected == 0 {
        let exists = accounts::Entity::find_by_id(account_id.to_string())
            .one(db_tx)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::KeyNotFound("account not exists".to_string()));
        }
        return Err(EngineError::InvalidArgument(
            "account balance out of range".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_filter_rejects_inverted_range() {
        let now = Utc::now();
        let filter = TransactionListFilter {
            from: Some(now),
            to: Some(now),
            ..Default::default()
        };
        assert!(matches!(
            validate_list_filter(&filter),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn list_filter_rejects_empty_kinds_and_zero_limit() {
        let filter = TransactionListFilter {
            kinds: Some(Vec::new()),
            ..Default::default()
        };
        assert!(validate_list_filter(&filter).is_err());

        let filter = TransactionListFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert!(validate_list_filter(&filter).is_err());
        assert!(validate_list_filter(&TransactionListFilter::default()).is_ok());
    }
}
