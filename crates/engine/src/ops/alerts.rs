//! Budget alert run.
//!
//! Users are evaluated one after the other. A failure for one user (no
//! usable budget ceiling, undeliverable notification, store error while
//! reading their data) is logged and counted, and the run moves on.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryOrder, prelude::*};

use crate::{
    AlertFailure, AlertMessage, AlertOutcome, AlertRunSummary, Notifier, ResultEngine, User,
    alerts::{select_budget, spent_percent},
    budgets, users,
};

use super::{
    Engine,
    budgets::{expense_total, load_budgets},
};

impl Engine {
    /// Evaluates every user's budget and sends the notifications that are due.
    ///
    /// Only fails when no notifier is configured or the user list cannot be
    /// read; per-user problems end up in the returned summary.
    pub async fn run_budget_alerts(&self, now: DateTime<Utc>) -> ResultEngine<AlertRunSummary> {
        let notifier = self.notifier()?;
        let user_models = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.database)
            .await?;

        let mut summary = AlertRunSummary::default();
        for model in user_models {
            let user = User::from(model);
            summary.evaluated += 1;
            match self.evaluate_budget_alert(notifier, &user, now).await {
                Ok(AlertOutcome::Sent { .. }) => summary.sent += 1,
                Ok(AlertOutcome::Skipped) => summary.skipped += 1,
                Err(err) => {
                    tracing::warn!(user_id = %user.id, "budget alert failed: {err}");
                    summary.failed += 1;
                    summary.failures.push(AlertFailure {
                        user_id: user.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            evaluated = summary.evaluated,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "budget alert run finished"
        );
        Ok(summary)
    }

    /// Evaluates the budget of a single user.
    pub async fn run_budget_alert_for_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<AlertOutcome> {
        let notifier = self.notifier()?;
        let user = self.user(user_id).await?;
        self.evaluate_budget_alert(notifier, &user, now).await
    }

    async fn evaluate_budget_alert(
        &self,
        notifier: &dyn Notifier,
        user: &User,
        now: DateTime<Utc>,
    ) -> ResultEngine<AlertOutcome> {
        let policy = &self.alert_policy;
        let budgets = load_budgets(&self.database, &user.id).await?;
        let Some(budget) = select_budget(budgets, policy.selection)? else {
            tracing::trace!(user_id = %user.id, "no budget, skipping");
            return Ok(AlertOutcome::Skipped);
        };

        let window = policy.spend_window(now)?;
        let spent = expense_total(&self.database, &user.id, window).await?;
        let percent = spent_percent(spent, budget.amount)?;
        if !policy.alert_due(percent, budget.last_alert_sent, now) {
            return Ok(AlertOutcome::Skipped);
        }

        let message = AlertMessage::budget_threshold(user, percent, spent, &budget);
        notifier
            .send(&user.email, &message.subject, &message.body)
            .await?;

        budgets::ActiveModel {
            id: ActiveValue::Set(budget.id.to_string()),
            last_alert_sent: ActiveValue::Set(Some(now)),
            ..Default::default()
        }
        .update(&self.database)
        .await?;
        tracing::info!(user_id = %user.id, percent, "budget alert sent");

        Ok(AlertOutcome::Sent { percent })
    }
}
