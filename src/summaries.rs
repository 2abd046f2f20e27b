use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use time::Date;

use crate::AppState;
use crate::auth::AuthContext;
use crate::constants::{DEFAULT_SERIES_MONTHS, DEFAULT_TOP_CATEGORIES, MAX_SERIES_MONTHS};
use crate::error::ValidationError;
use crate::models::{SeriesQuery, SummaryQuery};
use crate::summary::{
    DateWindow, MonthlyTotals, Overview, PeriodSummary, monthly_series, overview,
    summarize_period,
};
use crate::utils::{parse_date, today};

/// Window for a summary request: an explicit month, an explicit date range, or the current month.
pub fn resolve_window(query: &SummaryQuery, today: Date) -> Result<DateWindow, ValidationError> {
    match (
        query.month.as_deref(),
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    ) {
        (Some(month), None, None) => DateWindow::parse_month(month),
        (None, Some(start), Some(end)) => DateWindow::new(parse_date(start)?, parse_date(end)?),
        (None, None, None) => Ok(DateWindow::month_of(today)),
        (Some(_), _, _) => Err(ValidationError::InvalidQuery(
            "Use either month or start_date/end_date, not both".to_string(),
        )),
        _ => Err(ValidationError::InvalidQuery(
            "start_date and end_date must be given together".to_string(),
        )),
    }
}

pub fn resolve_top(top: Option<usize>) -> Result<usize, ValidationError> {
    match top {
        Some(0) => Err(ValidationError::InvalidQuery(
            "top must be greater than 0".to_string(),
        )),
        Some(n) => Ok(n),
        None => Ok(DEFAULT_TOP_CATEGORIES),
    }
}

pub fn resolve_months(months: Option<usize>) -> Result<usize, ValidationError> {
    match months {
        None => Ok(DEFAULT_SERIES_MONTHS),
        Some(n) if (1..=MAX_SERIES_MONTHS).contains(&n) => Ok(n),
        Some(_) => Err(ValidationError::InvalidQuery(format!(
            "months must be between 1 and {}",
            MAX_SERIES_MONTHS
        ))),
    }
}

pub async fn get_summary(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SummaryQuery>,
) -> Result<(StatusCode, Json<PeriodSummary>), (StatusCode, String)> {
    let window = resolve_window(&query, today())?;
    let top = resolve_top(query.top)?;

    let snapshot = state.snapshot(&auth).await?;
    Ok((
        StatusCode::OK,
        Json(summarize_period(&snapshot.transactions, &window, top)),
    ))
}

pub async fn get_overview(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<(StatusCode, Json<Overview>), (StatusCode, String)> {
    let snapshot = state.snapshot(&auth).await?;
    Ok((StatusCode::OK, Json(overview(&snapshot.transactions, today()))))
}

pub async fn get_monthly_series(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SeriesQuery>,
) -> Result<(StatusCode, Json<Vec<MonthlyTotals>>), (StatusCode, String)> {
    let months = resolve_months(query.months)?;

    let snapshot = state.snapshot(&auth).await?;
    Ok((
        StatusCode::OK,
        Json(monthly_series(&snapshot.transactions, months)),
    ))
}
