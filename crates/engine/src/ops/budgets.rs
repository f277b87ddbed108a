use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    Budget, BudgetProgress, EngineError, MoneyCents, ResultEngine, TransactionKind,
    alerts::{month_window, spent_percent},
    budgets, transactions,
};

use super::{Engine, with_tx};

impl Engine {
    /// Sets the caller's budget ceiling.
    ///
    /// Updates the oldest existing budget in place (keeping its alert
    /// history) or creates one.
    pub async fn set_budget(
        &self,
        user_id: &str,
        amount: MoneyCents,
        now: DateTime<Utc>,
    ) -> ResultEngine<Budget> {
        let amount = amount.require_positive("budget amount")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let existing = budgets::Entity::find()
                .filter(budgets::Column::UserId.eq(user_id))
                .order_by_asc(budgets::Column::CreatedAt)
                .order_by_asc(budgets::Column::Id)
                .one(&db_tx)
                .await?;

            let model = match existing {
                Some(existing) => {
                    budgets::ActiveModel {
                        id: ActiveValue::Set(existing.id),
                        amount_minor: ActiveValue::Set(amount.cents()),
                        ..Default::default()
                    }
                    .update(&db_tx)
                    .await?
                }
                None => {
                    let budget = Budget::new(user_id.to_string(), amount, now)?;
                    budgets::ActiveModel::from(&budget).insert(&db_tx).await?
                }
            };

            Budget::try_from(model)
        })
    }

    /// All budgets of a user, oldest first.
    pub async fn budgets(&self, user_id: &str) -> ResultEngine<Vec<Budget>> {
        self.require_user(&self.database, user_id).await?;
        load_budgets(&self.database, user_id).await
    }

    /// Progress of the caller's budget over the calendar month containing
    /// `now`, using the alert policy time zone and budget selection.
    ///
    /// Returns `None` when no budget is set.
    pub async fn budget_progress(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Option<BudgetProgress>> {
        self.require_user(&self.database, user_id).await?;
        let budgets = load_budgets(&self.database, user_id).await?;
        let Some(budget) = crate::alerts::select_budget(budgets, self.alert_policy.selection)?
        else {
            return Ok(None);
        };

        let window = month_window(self.alert_policy.timezone, now)?;
        let spent = expense_total(&self.database, user_id, Some(window)).await?;
        let percent_used = spent_percent(spent, budget.amount)?;

        Ok(Some(BudgetProgress {
            budget,
            spent,
            percent_used,
        }))
    }
}

pub(super) async fn load_budgets<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> ResultEngine<Vec<Budget>> {
    budgets::Entity::find()
        .filter(budgets::Column::UserId.eq(user_id))
        .order_by_asc(budgets::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(Budget::try_from)
        .collect()
}

/// Sum of the user's expense amounts, optionally restricted to `[start, end)`.
pub(super) async fn expense_total<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> ResultEngine<MoneyCents> {
    let mut query = transactions::Entity::find()
        .select_only()
        .column(transactions::Column::AmountMinor)
        .filter(transactions::Column::UserId.eq(user_id))
        .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()));
    if let Some((start, end)) = window {
        query = query
            .filter(transactions::Column::OccurredAt.gte(start))
            .filter(transactions::Column::OccurredAt.lt(end));
    }

    let amounts: Vec<i64> = query.into_tuple().all(db).await?;
    amounts
        .into_iter()
        .try_fold(MoneyCents::ZERO, |acc, amount| {
            acc.checked_add(MoneyCents::new(amount))
        })
        .ok_or_else(|| EngineError::InvalidState("expense total overflow".to_string()))
}
