//! Budget progress and alerting over a user's transactions.
//!
//! Everything here is pure: callers hand in already user-scoped, already
//! validated records and get derived state back.

use serde::Serialize;

use crate::constants::{ALERT_EXCEEDED_THRESHOLD, ALERT_WARNING_THRESHOLD};
use crate::models::{Budget, FlowType, Transaction};
use crate::utils::format_currency;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    /// Rendered with destructive styling.
    Exceeded,
}

impl AlertSeverity {
    /// Classifies an unclamped consumption percentage.
    pub fn classify(percentage: f64) -> Option<Self> {
        if percentage >= ALERT_EXCEEDED_THRESHOLD {
            Some(AlertSeverity::Exceeded)
        } else if percentage >= ALERT_WARNING_THRESHOLD {
            Some(AlertSeverity::Warning)
        } else {
            None
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "Budget Alert",
            AlertSeverity::Exceeded => "Budget Exceeded",
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    Over,
    Under,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub actual: f64,
    /// Unclamped; drives alerting and the over/under text.
    pub percentage: f64,
    /// Clamped to `[0, 100]` for progress bars.
    pub display_percentage: f64,
    pub difference: f64,
    pub difference_percentage: f64,
    pub standing: Standing,
    pub alert: Option<AlertSeverity>,
}

impl BudgetStatus {
    /// "Over budget by ৳50.00 (10.0%)" style line.
    pub fn summary_line(&self) -> String {
        let label = match self.standing {
            Standing::Over => "Over",
            Standing::Under => "Under",
        };
        format!(
            "{} budget by {} ({:.1}%)",
            label,
            format_currency(self.difference.abs()),
            self.difference_percentage
        )
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BudgetAlert {
    pub budget_id: String,
    pub category: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub severity: AlertSeverity,
    pub percentage: f64,
    pub planned: f64,
    pub actual: f64,
    pub title: String,
    pub message: String,
}

fn matches_budget(budget: &Budget, transaction: &Transaction) -> bool {
    transaction.category == budget.category
        && transaction.flow == budget.flow
        && budget.period_start.as_str() <= transaction.date.as_str()
        && transaction.date.as_str() <= budget.period_end.as_str()
}

/// Sum of matching transactions inside the budget's inclusive period.
pub fn actual_for(budget: &Budget, transactions: &[Transaction]) -> f64 {
    transactions
        .iter()
        .filter(|t| matches_budget(budget, t))
        .map(|t| t.amount)
        .sum()
}

pub fn status_for(budget: &Budget, transactions: &[Transaction]) -> BudgetStatus {
    let actual = actual_for(budget, transactions);
    let planned = budget.planned_amount;
    let percentage = actual / planned * 100.0;
    let difference = actual - planned;

    BudgetStatus {
        budget: budget.clone(),
        actual,
        percentage,
        display_percentage: percentage.clamp(0.0, 100.0),
        difference,
        difference_percentage: difference / planned * 100.0,
        standing: if difference > 0.0 {
            Standing::Over
        } else {
            Standing::Under
        },
        alert: AlertSeverity::classify(percentage),
    }
}

/// One status per budget, in input order.
pub fn compute_budget_status(budgets: &[Budget], transactions: &[Transaction]) -> Vec<BudgetStatus> {
    budgets
        .iter()
        .map(|budget| status_for(budget, transactions))
        .collect()
}

pub fn budget_alerts(budgets: &[Budget], transactions: &[Transaction]) -> Vec<BudgetAlert> {
    compute_budget_status(budgets, transactions)
        .into_iter()
        .filter_map(|status| {
            let severity = status.alert?;
            let budget = status.budget;
            Some(BudgetAlert {
                message: format!(
                    "Your {} {} is at {:.0}% of budget ({} of {})",
                    budget.category,
                    budget.flow,
                    status.percentage,
                    format_currency(status.actual),
                    format_currency(budget.planned_amount)
                ),
                title: severity.title().to_string(),
                budget_id: budget.id,
                category: budget.category,
                flow: budget.flow,
                severity,
                percentage: status.percentage,
                planned: budget.planned_amount,
                actual: status.actual,
            })
        })
        .collect()
}

/// Inclusive range intersection; touching endpoints count as overlap.
pub fn periods_overlap(start_a: &str, end_a: &str, start_b: &str, end_b: &str) -> bool {
    start_a <= end_b && start_b <= end_a
}

/// First existing budget for the same category and flow whose period overlaps the candidate.
pub fn find_overlapping<'a>(
    existing: &'a [Budget],
    category: &str,
    flow: FlowType,
    period_start: &str,
    period_end: &str,
) -> Option<&'a Budget> {
    existing.iter().find(|b| {
        b.category == category
            && b.flow == flow
            && periods_overlap(&b.period_start, &b.period_end, period_start, period_end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(category: &str, flow: FlowType, planned: f64, start: &str, end: &str) -> Budget {
        Budget {
            id: format!("b-{}", category),
            category: category.to_string(),
            flow,
            planned_amount: planned,
            period_start: start.to_string(),
            period_end: end.to_string(),
        }
    }

    fn tx(category: &str, flow: FlowType, amount: f64, date: &str) -> Transaction {
        Transaction {
            id: format!("t-{}-{}", category, date),
            date: date.to_string(),
            amount,
            category: category.to_string(),
            flow,
            description: None,
        }
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(AlertSeverity::classify(79.999), None);
        assert_eq!(AlertSeverity::classify(80.0), Some(AlertSeverity::Warning));
        assert_eq!(AlertSeverity::classify(99.99), Some(AlertSeverity::Warning));
        assert_eq!(AlertSeverity::classify(100.0), Some(AlertSeverity::Exceeded));
        assert_eq!(AlertSeverity::classify(0.0), None);
    }

    #[test]
    fn non_round_amounts_hit_thresholds() {
        let b = budget("Snacks", FlowType::Outflow, 10.38, "2024-03-01", "2024-03-31");
        let status = status_for(&b, &[tx("Snacks", FlowType::Outflow, 10.38, "2024-03-05")]);
        assert_eq!(status.percentage, 100.0);
        assert_eq!(status.alert, Some(AlertSeverity::Exceeded));

        let b = budget("Books", FlowType::Outflow, 41.0, "2024-03-01", "2024-03-31");
        let status = status_for(&b, &[tx("Books", FlowType::Outflow, 32.80, "2024-03-05")]);
        assert_eq!(status.alert, Some(AlertSeverity::Warning));
    }

    #[test]
    fn period_bounds_are_inclusive() {
        let b = budget("Food", FlowType::Outflow, 100.0, "2024-03-01", "2024-03-31");
        let txs = vec![
            tx("Food", FlowType::Outflow, 10.0, "2024-03-01"),
            tx("Food", FlowType::Outflow, 20.0, "2024-03-31"),
            tx("Food", FlowType::Outflow, 40.0, "2024-04-01"),
            tx("Food", FlowType::Outflow, 80.0, "2024-02-29"),
        ];
        assert_eq!(actual_for(&b, &txs), 30.0);
    }

    #[test]
    fn flow_must_match() {
        let b = budget("Bonus", FlowType::Inflow, 100.0, "2024-01-01", "2024-12-31");
        let txs = vec![tx("Bonus", FlowType::Outflow, 50.0, "2024-06-01")];
        assert_eq!(actual_for(&b, &txs), 0.0);
    }

    #[test]
    fn exact_plan_is_under_budget() {
        let b = budget("Fuel", FlowType::Outflow, 200.0, "2024-01-01", "2024-01-31");
        let status = status_for(&b, &[tx("Fuel", FlowType::Outflow, 200.0, "2024-01-15")]);
        assert_eq!(status.standing, Standing::Under);
        assert_eq!(status.difference, 0.0);
        assert_eq!(status.alert, Some(AlertSeverity::Exceeded));
    }

    #[test]
    fn summary_line_formats_difference() {
        let b = budget("Groceries", FlowType::Outflow, 500.0, "2024-03-01", "2024-03-31");
        let status = status_for(&b, &[tx("Groceries", FlowType::Outflow, 550.0, "2024-03-10")]);
        assert_eq!(status.summary_line(), "Over budget by ৳50.00 (10.0%)");
    }
}
