//! Budget alert policy and the pure parts of threshold evaluation.
//!
//! The database-facing run lives in `ops::alerts`; everything here is
//! deterministic given its inputs so it can be unit tested without a store.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{Budget, EngineError, MoneyCents, ResultEngine, User};

/// Percentages of the ceiling that trigger a notification, ascending.
pub const WATCHED_THRESHOLDS: [i64; 4] = [50, 70, 90, 100];

/// How a single budget is picked when a user has several.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetSelection {
    /// Oldest budget wins.
    #[default]
    FirstCreated,
    /// Newest budget wins.
    MostRecent,
    /// More than one budget is reported as `InvalidState`.
    RejectMultiple,
}

/// Which expenses count toward the spent total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendPeriod {
    /// Every expense ever recorded for the user.
    #[default]
    AllTime,
    /// Expenses in the calendar month of the run, in the policy time zone.
    CurrentMonth,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertPolicy {
    pub selection: BudgetSelection,
    pub period: SpendPeriod,
    /// Time zone used to decide what "today" and "this month" mean.
    pub timezone: Tz,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            selection: BudgetSelection::default(),
            period: SpendPeriod::default(),
            timezone: Tz::UTC,
        }
    }
}

impl AlertPolicy {
    pub(crate) fn calendar_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }

    /// `[start, end)` of the spend window containing `now`, or `None` for
    /// all-time.
    pub(crate) fn spend_window(
        &self,
        now: DateTime<Utc>,
    ) -> ResultEngine<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        match self.period {
            SpendPeriod::AllTime => Ok(None),
            SpendPeriod::CurrentMonth => month_window(self.timezone, now).map(Some),
        }
    }

    /// True when a watched threshold is hit and no alert went out today.
    pub fn alert_due(
        &self,
        spent_percent: i64,
        last_alert_sent: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        if !WATCHED_THRESHOLDS.contains(&spent_percent) {
            return false;
        }
        match last_alert_sent {
            None => true,
            Some(last) => self.calendar_date(last) != self.calendar_date(now),
        }
    }
}

/// Calendar month containing `now` in `tz`, converted back to UTC.
pub(crate) fn month_window(
    tz: Tz,
    now: DateTime<Utc>,
) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    let local = now.with_timezone(&tz);
    let (year, month) = (local.year(), local.month());
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    let start_of = |y: i32, m: u32| {
        tz.with_ymd_and_hms(y, m, 1, 0, 0, 0)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                EngineError::InvalidState(format!("cannot resolve start of month {y}-{m:02}"))
            })
    };

    Ok((start_of(year, month)?, start_of(next_year, next_month)?))
}

/// Spent share of `ceiling`, in percent, rounded half-up.
pub fn spent_percent(spent: MoneyCents, ceiling: MoneyCents) -> ResultEngine<i64> {
    if !ceiling.is_positive() {
        return Err(EngineError::InvalidState(format!(
            "budget ceiling must be > 0, got {ceiling}"
        )));
    }
    let spent = i128::from(spent.cents());
    let ceiling = i128::from(ceiling.cents());
    let doubled = spent * 200;
    let rounded = if doubled >= 0 {
        (doubled + ceiling) / (2 * ceiling)
    } else {
        (doubled - ceiling) / (2 * ceiling)
    };
    i64::try_from(rounded)
        .map_err(|_| EngineError::InvalidState("spent percentage out of range".to_string()))
}

/// Pick the budget consulted for a user according to `selection`.
pub(crate) fn select_budget(
    mut budgets: Vec<Budget>,
    selection: BudgetSelection,
) -> ResultEngine<Option<Budget>> {
    budgets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    match selection {
        BudgetSelection::FirstCreated => Ok(budgets.into_iter().next()),
        BudgetSelection::MostRecent => Ok(budgets.pop()),
        BudgetSelection::RejectMultiple if budgets.len() > 1 => Err(EngineError::InvalidState(
            format!("{} budgets configured, expected at most one", budgets.len()),
        )),
        BudgetSelection::RejectMultiple => Ok(budgets.pop()),
    }
}

/// Rendered notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    pub fn budget_threshold(
        user: &User,
        spent_percent: i64,
        spent: MoneyCents,
        budget: &Budget,
    ) -> Self {
        Self {
            subject: format!("Budget Alert: {spent_percent}% spent!"),
            body: format!(
                "Hi {},\n\nYou have spent {spent_percent}% of your budget ({}): {spent} so far.\n\nPlease review your spending.",
                user.display_name(),
                budget.amount,
            ),
        }
    }
}

/// What happened for one user in an alert run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlertOutcome {
    Sent { percent: i64 },
    /// No budget, no watched threshold hit, or already alerted today.
    Skipped,
}

/// A user whose evaluation failed during a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFailure {
    pub user_id: String,
    pub reason: String,
}

/// Aggregate result of an alert run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRunSummary {
    /// Users looked at.
    pub evaluated: usize,
    pub sent: usize,
    /// Users with no budget, no watched threshold hit, or already alerted today.
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<AlertFailure>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    use super::*;

    fn budget(created_at: DateTime<Utc>) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            user_id: "user_1".to_string(),
            amount: MoneyCents::new(100_00),
            last_alert_sent: None,
            created_at,
        }
    }

    #[test]
    fn spent_percent_rounds_half_up() {
        let ceiling = MoneyCents::new(100_00);
        assert_eq!(spent_percent(MoneyCents::new(70_00), ceiling).unwrap(), 70);
        assert_eq!(spent_percent(MoneyCents::new(69_50), ceiling).unwrap(), 70);
        assert_eq!(spent_percent(MoneyCents::new(69_49), ceiling).unwrap(), 69);
        assert_eq!(spent_percent(MoneyCents::ZERO, ceiling).unwrap(), 0);
        assert_eq!(spent_percent(MoneyCents::new(250_00), ceiling).unwrap(), 250);
    }

    #[test]
    fn spent_percent_rejects_zero_ceiling() {
        assert!(matches!(
            spent_percent(MoneyCents::new(10), MoneyCents::ZERO),
            Err(EngineError::InvalidState(_))
        ));
    }

    #[test]
    fn alert_due_only_on_exact_thresholds() {
        let policy = AlertPolicy::default();
        let now = Utc::now();
        for pct in WATCHED_THRESHOLDS {
            assert!(policy.alert_due(pct, None, now));
        }
        for pct in [0, 49, 51, 60, 75, 99, 101] {
            assert!(!policy.alert_due(pct, None, now));
        }
    }

    #[test]
    fn alert_due_once_per_calendar_day() {
        let policy = AlertPolicy::default();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap();
        let earlier_today = Utc.with_ymd_and_hms(2025, 3, 10, 0, 5, 0).unwrap();
        assert!(!policy.alert_due(70, Some(earlier_today), now));
        assert!(policy.alert_due(70, Some(now - Duration::days(1)), now));
    }

    #[test]
    fn calendar_day_uses_policy_timezone() {
        let policy = AlertPolicy {
            timezone: chrono_tz::Asia::Kolkata,
            ..AlertPolicy::default()
        };
        // 20:00 UTC on the 10th is already the 11th in Kolkata.
        let last = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 20, 0, 0).unwrap();
        assert!(policy.alert_due(90, Some(last), now));
        assert!(!AlertPolicy::default().alert_due(90, Some(last), now));
    }

    #[test]
    fn month_window_wraps_december() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
        let (start, end) = month_window(Tz::UTC, now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn select_budget_honours_policy() {
        let old = budget(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let new = budget(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        let both = vec![new.clone(), old.clone()];

        assert_eq!(
            select_budget(both.clone(), BudgetSelection::FirstCreated).unwrap(),
            Some(old.clone())
        );
        assert_eq!(
            select_budget(both.clone(), BudgetSelection::MostRecent).unwrap(),
            Some(new)
        );
        assert!(matches!(
            select_budget(both, BudgetSelection::RejectMultiple),
            Err(EngineError::InvalidState(_))
        ));
        assert_eq!(
            select_budget(vec![old.clone()], BudgetSelection::RejectMultiple).unwrap(),
            Some(old)
        );
        assert_eq!(select_budget(Vec::new(), BudgetSelection::FirstCreated).unwrap(), None);
    }

    #[test]
    fn message_mentions_percentage_and_totals() {
        let user = User {
            id: "user_1".to_string(),
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
            created_at: Utc::now(),
        };
        let msg = AlertMessage::budget_threshold(
            &user,
            70,
            MoneyCents::new(70_00),
            &budget(Utc::now()),
        );
        assert_eq!(msg.subject, "Budget Alert: 70% spent!");
        assert!(msg.body.starts_with("Hi Alice,"));
        assert!(msg.body.contains("70% of your budget (100.00): 70.00 so far"));
    }
}
