use axum::http::StatusCode;
use time::{
    Date, Month, OffsetDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::constants::*;
use crate::error::ValidationError;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn db_error_with_context(context: &str) -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Database error: {}", context),
    )
}

/// Logs the underlying store error and maps it to an opaque 500.
pub fn store_error(context: &'static str) -> impl FnOnce(anyhow::Error) -> (StatusCode, String) {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        db_error_with_context(context)
    }
}

pub fn validate_string_length(
    value: &str,
    field_name: &'static str,
    max_length: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field_name));
    }
    if value.len() > max_length {
        return Err(ValidationError::TooLong {
            field: field_name,
            max: max_length,
        });
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<(), ValidationError> {
    match description {
        Some(d) if d.len() > MAX_DESCRIPTION_LENGTH => Err(ValidationError::TooLong {
            field: "Description",
            max: MAX_DESCRIPTION_LENGTH,
        }),
        _ => Ok(()),
    }
}

/// Trims a description and drops it when nothing is left.
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Amounts are strictly positive and below one billion.
pub fn validate_amount(amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() || amount <= 0.0 || amount >= MAX_AMOUNT {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(())
}

pub fn parse_date(value: &str) -> Result<Date, ValidationError> {
    Date::parse(value.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parses and re-renders a date so stored strings compare lexicographically.
pub fn canonical_date(value: &str) -> Result<String, ValidationError> {
    parse_date(value).map(format_date)
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Same month and day `years` later, clamping Feb 29 to Feb 28.
pub fn add_years(date: Date, years: i32) -> Date {
    let year = date.year() + years;
    let day = date.day().min(time::util::days_in_year_month(year, date.month()));
    Date::from_calendar_date(year, date.month(), day).unwrap_or(date)
}

/// Adds whole months, clamping the day to the target month's length.
pub fn add_months(date: Date, months: i32) -> Date {
    let index = date.year() * 12 + i32::from(u8::from(date.month())) - 1 + months;
    let year = index.div_euclid(12);
    let month = match Month::try_from((index.rem_euclid(12) + 1) as u8) {
        Ok(m) => m,
        Err(_) => return date,
    };
    let day = date.day().min(time::util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).unwrap_or(date)
}

/// Transaction dates must fall between 2000-01-01 and one year from `today`.
pub fn validate_transaction_date(value: &str, today: Date) -> Result<String, ValidationError> {
    let date = parse_date(value)?;
    let min = parse_date(MIN_TRANSACTION_DATE)?;
    if date < min {
        return Err(ValidationError::DateTooEarly);
    }
    if date > add_years(today, MAX_FUTURE_YEARS) {
        return Err(ValidationError::DateTooLate);
    }
    Ok(format_date(date))
}

pub fn format_currency(amount: f64) -> String {
    format!("{}{:.2}", CURRENCY_SYMBOL, amount)
}

pub fn validate_limit(limit: Option<u32>, default: u32) -> Result<u32, ValidationError> {
    match limit {
        Some(0) => Err(ValidationError::InvalidQuery(
            "Limit must be greater than 0".to_string(),
        )),
        Some(l) if l > MAX_LIMIT => Err(ValidationError::InvalidQuery(format!(
            "Limit cannot exceed {}",
            MAX_LIMIT
        ))),
        Some(l) => Ok(l),
        None => Ok(default),
    }
}

pub fn validate_categories_limit(limit: Option<u32>) -> Result<u32, ValidationError> {
    validate_limit(limit, DEFAULT_CATEGORIES_LIMIT)
}

pub fn validate_transactions_limit(limit: Option<u32>) -> Result<u32, ValidationError> {
    validate_limit(limit, DEFAULT_TRANSACTIONS_LIMIT)
}

pub fn validate_offset(offset: Option<u32>) -> Result<u32, ValidationError> {
    match offset {
        Some(o) if o > MAX_OFFSET => Err(ValidationError::InvalidQuery(format!(
            "Offset cannot exceed {}",
            MAX_OFFSET
        ))),
        Some(o) => Ok(o),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn add_months_clamps_day() {
        assert_eq!(add_months(date!(2024 - 01 - 31), 1), date!(2024 - 02 - 29));
        assert_eq!(add_months(date!(2023 - 01 - 31), 1), date!(2023 - 02 - 28));
        assert_eq!(add_months(date!(2024 - 11 - 15), 3), date!(2025 - 02 - 15));
        assert_eq!(add_months(date!(2024 - 01 - 15), -1), date!(2023 - 12 - 15));
    }

    #[test]
    fn add_years_handles_leap_day() {
        assert_eq!(add_years(date!(2024 - 02 - 29), 1), date!(2025 - 02 - 28));
        assert_eq!(add_years(date!(2024 - 02 - 29), 4), date!(2028 - 02 - 29));
    }

    #[test]
    fn transaction_date_window() {
        let today = date!(2024 - 06 - 15);
        assert_eq!(
            validate_transaction_date("1999-12-31", today),
            Err(ValidationError::DateTooEarly)
        );
        assert_eq!(
            validate_transaction_date("2025-06-16", today),
            Err(ValidationError::DateTooLate)
        );
        assert_eq!(
            validate_transaction_date("2025-06-15", today),
            Ok("2025-06-15".to_string())
        );
        assert!(matches!(
            validate_transaction_date("2024-13-01", today),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn amount_bounds() {
        assert!(validate_amount(0.01).is_ok());
        assert!(validate_amount(999_999_999.99).is_ok());
        assert_eq!(validate_amount(0.0), Err(ValidationError::InvalidAmount));
        assert_eq!(validate_amount(-5.0), Err(ValidationError::InvalidAmount));
        assert_eq!(validate_amount(1e9), Err(ValidationError::InvalidAmount));
        assert_eq!(validate_amount(f64::NAN), Err(ValidationError::InvalidAmount));
    }

    #[test]
    fn currency_uses_two_decimals() {
        assert_eq!(format_currency(450.0), "৳450.00");
        assert_eq!(format_currency(12.5), "৳12.50");
    }
}
