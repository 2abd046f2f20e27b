//! Period totals, per-category breakdowns and the dashboard overview.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use time::Date;

use crate::error::ValidationError;
use crate::models::{FlowType, Transaction};
use crate::utils::{add_months, format_date, parse_date};

/// Inclusive `[start, end]` range of canonical `YYYY-MM-DD` dates.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub start: String,
    pub end: String,
}

impl DateWindow {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::DateOrder {
                start_field: "start_date",
                end_field: "end_date",
            });
        }
        Ok(DateWindow {
            start: format_date(start),
            end: format_date(end),
        })
    }

    /// Calendar month containing `date`.
    pub fn month_of(date: Date) -> Self {
        let first = date.replace_day(1).unwrap_or(date);
        let last = add_months(first, 1).previous_day().unwrap_or(first);
        DateWindow {
            start: format_date(first),
            end: format_date(last),
        }
    }

    /// Parses `YYYY-MM`.
    pub fn parse_month(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.len() != 7 {
            return Err(ValidationError::InvalidMonth(value.to_string()));
        }
        parse_date(&format!("{}-01", trimmed))
            .map(Self::month_of)
            .map_err(|_| ValidationError::InvalidMonth(value.to_string()))
    }

    pub fn previous_month(&self) -> Self {
        match parse_date(&self.start) {
            Ok(start) => Self::month_of(add_months(start, -1)),
            Err(_) => self.clone(),
        }
    }

    pub fn contains(&self, date: &str) -> bool {
        self.start.as_str() <= date && date <= self.end.as_str()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub window: DateWindow,
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub balance: f64,
    pub transaction_count: usize,
    pub inflow_by_category: Vec<CategoryTotal>,
    pub outflow_by_category: Vec<CategoryTotal>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonthlyTotals {
    /// `YYYY-MM`
    pub month: String,
    pub inflow: f64,
    pub outflow: f64,
    pub balance: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Overview {
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub balance: f64,
    pub current_month: DateWindow,
    pub current_month_inflow: f64,
    pub current_month_outflow: f64,
    pub current_month_balance: f64,
    pub previous_month_balance: f64,
    pub balance_change_percentage: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    inflow: f64,
    outflow: f64,
}

impl Totals {
    fn add(&mut self, transaction: &Transaction) {
        match transaction.flow {
            FlowType::Inflow => self.inflow += transaction.amount,
            FlowType::Outflow => self.outflow += transaction.amount,
        }
    }

    fn balance(&self) -> f64 {
        self.inflow - self.outflow
    }
}

fn totals<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Totals {
    let mut acc = Totals::default();
    for t in transactions {
        acc.add(t);
    }
    acc
}

/// Category totals for one flow, largest first (ties by name), truncated to `top_n`.
pub fn category_breakdown(
    transactions: &[Transaction],
    flow: FlowType,
    top_n: usize,
) -> Vec<CategoryTotal> {
    let mut by_category: HashMap<&str, f64> = HashMap::new();
    for t in transactions.iter().filter(|t| t.flow == flow) {
        *by_category.entry(t.category.as_str()).or_insert(0.0) += t.amount;
    }

    let mut entries: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category: category.to_string(),
            amount,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });
    entries.truncate(top_n);
    entries
}

pub fn summarize_period(
    transactions: &[Transaction],
    window: &DateWindow,
    top_n: usize,
) -> PeriodSummary {
    let selected: Vec<Transaction> = transactions
        .iter()
        .filter(|t| window.contains(&t.date))
        .cloned()
        .collect();
    let acc = totals(&selected);

    PeriodSummary {
        window: window.clone(),
        total_inflow: acc.inflow,
        total_outflow: acc.outflow,
        balance: acc.balance(),
        transaction_count: selected.len(),
        inflow_by_category: category_breakdown(&selected, FlowType::Inflow, top_n),
        outflow_by_category: category_breakdown(&selected, FlowType::Outflow, top_n),
    }
}

/// Per-month totals in chronological order, keeping the most recent `months` entries.
pub fn monthly_series(transactions: &[Transaction], months: usize) -> Vec<MonthlyTotals> {
    let mut by_month: BTreeMap<&str, Totals> = BTreeMap::new();
    for t in transactions {
        let Some(month) = t.date.get(..7) else {
            continue;
        };
        by_month.entry(month).or_default().add(t);
    }

    let skip = by_month.len().saturating_sub(months);
    by_month
        .into_iter()
        .skip(skip)
        .map(|(month, acc)| MonthlyTotals {
            month: month.to_string(),
            inflow: acc.inflow,
            outflow: acc.outflow,
            balance: acc.balance(),
        })
        .collect()
}

pub fn overview(transactions: &[Transaction], today: Date) -> Overview {
    let all = totals(transactions);
    let current_month = DateWindow::month_of(today);
    let previous_month = current_month.previous_month();

    let current = totals(transactions.iter().filter(|t| current_month.contains(&t.date)));
    let previous = totals(transactions.iter().filter(|t| previous_month.contains(&t.date)));

    let previous_balance = previous.balance();
    let divisor = if previous_balance == 0.0 {
        1.0
    } else {
        previous_balance.abs()
    };

    Overview {
        total_inflow: all.inflow,
        total_outflow: all.outflow,
        balance: all.balance(),
        current_month,
        current_month_inflow: current.inflow,
        current_month_outflow: current.outflow,
        current_month_balance: current.balance(),
        previous_month_balance: previous_balance,
        balance_change_percentage: (current.balance() - previous_balance) / divisor * 100.0,
    }
}
