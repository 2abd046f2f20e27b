use axum::http::StatusCode;
use thiserror::Error;

/// Rejections raised before a record is written. Aggregation never produces these.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("{field} must be less than {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("Please enter a valid amount between 0.01 and 999,999,999")]
    InvalidAmount,
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),
    #[error("Transaction date cannot be before year 2000")]
    DateTooEarly,
    #[error("Transaction date cannot be more than 1 year in the future")]
    DateTooLate,
    #[error("{start_field} must be before {end_field}")]
    DateOrder {
        start_field: &'static str,
        end_field: &'static str,
    },
    #[error("A budget already exists for this category in this period")]
    OverlappingBudget,
    #[error("Category name already exists for this type")]
    DuplicateCategory,
    #[error("{0}")]
    InvalidQuery(String),
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::OverlappingBudget | ValidationError::DuplicateCategory => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ValidationError> for (StatusCode, String) {
    fn from(err: ValidationError) -> Self {
        (err.status_code(), err.to_string())
    }
}
