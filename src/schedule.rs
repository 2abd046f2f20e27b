//! Occurrence dates for recurring transactions.

use time::{Date, Duration};

use crate::constants::MAX_OCCURRENCES_PER_RUN;
use crate::models::{Frequency, RecurringTransaction};
use crate::utils::{add_months, add_years, parse_date};

impl Frequency {
    /// The `n`-th occurrence counted from `start` (occurrence 0 is `start` itself).
    ///
    /// Months and years are counted from the anchor rather than chained, so a series
    /// starting on Jan 31 lands on Feb 29 and then Mar 31.
    pub fn occurrence(&self, start: Date, n: u32) -> Option<Date> {
        let steps = i32::try_from(n).ok()?;
        match self {
            Frequency::Daily => start.checked_add(Duration::days(i64::from(n))),
            Frequency::Weekly => start.checked_add(Duration::weeks(i64::from(n))),
            Frequency::Monthly => Some(add_months(start, steps)),
            Frequency::Yearly => Some(add_years(start, steps)),
        }
    }
}

/// Occurrences that are due but not yet materialized, oldest first.
///
/// An occurrence is due when it is after `last_generated` (or on/after
/// `start_date` when nothing was generated yet) and not after
/// `min(today, end_date)`. Inactive entries and unparsable dates yield nothing.
pub fn pending_occurrences(recurring: &RecurringTransaction, today: Date) -> Vec<Date> {
    if !recurring.is_active {
        return Vec::new();
    }
    let Ok(start) = parse_date(&recurring.start_date) else {
        return Vec::new();
    };

    let mut until = today;
    if let Some(end) = recurring.end_date.as_deref() {
        match parse_date(end) {
            Ok(end) => until = until.min(end),
            Err(_) => return Vec::new(),
        }
    }
    let after = match recurring.last_generated.as_deref().map(parse_date) {
        Some(Ok(last)) => Some(last),
        Some(Err(_)) => return Vec::new(),
        None => None,
    };

    let mut due = Vec::new();
    let mut n = 0u32;
    while due.len() < MAX_OCCURRENCES_PER_RUN {
        let Some(date) = recurring.frequency.occurrence(start, n) else {
            break;
        };
        if date > until {
            break;
        }
        if after.is_none_or(|last| date > last) {
            due.push(date);
        }
        n += 1;
    }
    due
}
