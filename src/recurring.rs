use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use libsql::TransactionBehavior;
use std::time::Duration;
use time::Date;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthContext;
use crate::constants::MAX_CATEGORY_NAME_LENGTH;
use crate::database::{Db, list_user_ids, optional_text, text_or_null};
use crate::error::ValidationError;
use crate::models::{
    CreateRecurringPayload, FlowType, Frequency, GenerateResponse, RecurringTransaction,
    SetActivePayload, Transaction,
};
use crate::schedule::pending_occurrences;
use crate::snapshot::Change;
use crate::utils::{
    canonical_date, format_date, normalize_description, store_error, today, validate_amount,
    validate_description, validate_string_length,
};

const SELECT_COLUMNS: &str = "SELECT id, amount, category, type, description, frequency, start_date, end_date, is_active, last_generated FROM recurring_transactions";

pub fn extract_recurring_from_row(row: libsql::Row) -> anyhow::Result<RecurringTransaction> {
    let flow: String = row.get(3)?;
    let frequency: String = row.get(5)?;
    let is_active: i64 = row.get(8)?;

    Ok(RecurringTransaction {
        id: row.get(0)?,
        amount: row.get(1)?,
        category: row.get(2)?,
        flow: FlowType::parse(&flow)
            .ok_or_else(|| anyhow::anyhow!("invalid recurring type '{}'", flow))?,
        description: optional_text(&row, 4)?,
        frequency: Frequency::parse(&frequency)
            .ok_or_else(|| anyhow::anyhow!("invalid frequency '{}'", frequency))?,
        start_date: row.get(6)?,
        end_date: optional_text(&row, 7)?,
        is_active: is_active != 0,
        last_generated: optional_text(&row, 9)?,
    })
}

pub fn build_recurring(
    payload: &CreateRecurringPayload,
) -> Result<RecurringTransaction, ValidationError> {
    validate_amount(payload.amount)?;
    validate_string_length(&payload.category, "Category", MAX_CATEGORY_NAME_LENGTH)?;
    validate_description(payload.description.as_deref())?;

    let start_date = canonical_date(&payload.start_date)?;
    let end_date = payload.end_date.as_deref().map(canonical_date).transpose()?;
    if let Some(end) = &end_date {
        if *end <= start_date {
            return Err(ValidationError::DateOrder {
                start_field: "start_date",
                end_field: "end_date",
            });
        }
    }

    Ok(RecurringTransaction {
        id: Uuid::new_v4().to_string(),
        amount: payload.amount,
        category: payload.category.trim().to_string(),
        flow: payload.flow,
        description: normalize_description(payload.description.as_deref()),
        frequency: payload.frequency,
        start_date,
        end_date,
        is_active: true,
        last_generated: None,
    })
}

pub async fn insert_recurring(db: &Db, recurring: &RecurringTransaction) -> anyhow::Result<()> {
    let conn = db.write().await;
    conn.execute(
        "INSERT INTO recurring_transactions (id, amount, category, type, description, frequency, start_date, end_date, is_active, last_generated) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            recurring.id.as_str(),
            recurring.amount,
            recurring.category.as_str(),
            recurring.flow.as_str(),
            text_or_null(recurring.description.as_deref()),
            recurring.frequency.as_str(),
            recurring.start_date.as_str(),
            text_or_null(recurring.end_date.as_deref()),
            i64::from(recurring.is_active),
            text_or_null(recurring.last_generated.as_deref()),
        ),
    )
    .await?;
    Ok(())
}

async fn query_recurring(conn: &libsql::Connection) -> anyhow::Result<Vec<RecurringTransaction>> {
    let sql = format!("{} ORDER BY start_date ASC, id ASC", SELECT_COLUMNS);
    let mut rows = conn.query(&sql, ()).await?;

    let mut entries = Vec::new();
    while let Some(row) = rows.next().await? {
        entries.push(extract_recurring_from_row(row)?);
    }
    Ok(entries)
}

pub async fn list_recurring(db: &Db) -> anyhow::Result<Vec<RecurringTransaction>> {
    let conn = db.read().await;
    query_recurring(&conn).await
}

pub async fn set_active(db: &Db, id: &str, is_active: bool) -> anyhow::Result<bool> {
    let conn = db.write().await;
    let affected = conn
        .execute(
            "UPDATE recurring_transactions SET is_active = ? WHERE id = ?",
            (i64::from(is_active), id),
        )
        .await?;
    Ok(affected > 0)
}

/// Deletes the template. Transactions it already produced stay.
pub async fn remove_recurring(db: &Db, id: &str) -> anyhow::Result<bool> {
    let conn = db.write().await;
    let affected = conn
        .execute("DELETE FROM recurring_transactions WHERE id = ?", [id])
        .await?;
    Ok(affected > 0)
}

fn occurrence_transaction(recurring: &RecurringTransaction, date: Date) -> Transaction {
    Transaction {
        id: Uuid::new_v4().to_string(),
        date: format_date(date),
        amount: recurring.amount,
        category: recurring.category.clone(),
        flow: recurring.flow,
        description: recurring.description.clone(),
    }
}

/// Materializes every due occurrence up to `today` for one user.
///
/// Inserted transactions and the advanced `last_generated` markers commit
/// together, so running it twice for the same day adds nothing the second time.
/// Templates are read inside the same immediate transaction, so concurrent runs
/// against the same file serialize instead of both seeing the old markers.
pub async fn generate_for_user(db: &Db, today: Date) -> anyhow::Result<Vec<Transaction>> {
    let conn = db.write().await;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .await?;
    let entries = query_recurring(&tx).await?;

    let mut generated = Vec::new();
    for recurring in &entries {
        let due = pending_occurrences(recurring, today);
        let Some(last) = due.last().copied() else {
            continue;
        };

        for date in due {
            let transaction = occurrence_transaction(recurring, date);
            tx.execute(
                "INSERT INTO transactions (id, date, amount, category, type, description) VALUES (?, ?, ?, ?, ?, ?)",
                (
                    transaction.id.as_str(),
                    transaction.date.as_str(),
                    transaction.amount,
                    transaction.category.as_str(),
                    transaction.flow.as_str(),
                    text_or_null(transaction.description.as_deref()),
                ),
            )
            .await?;
            generated.push(transaction);
        }

        tx.execute(
            "UPDATE recurring_transactions SET last_generated = ? WHERE id = ?",
            (format_date(last), recurring.id.as_str()),
        )
        .await?;
    }

    tx.commit().await?;
    Ok(generated)
}

/// One generation pass over every registered user. Failures for one user are
/// logged and do not stop the others.
pub async fn run_generation_pass(state: &AppState, today: Date) -> anyhow::Result<usize> {
    let user_ids = list_user_ids(&state.main_db).await?;

    let mut total = 0;
    for user_id in user_ids {
        let user_db = match crate::database::get_user_db(&state.data_path, &user_id).await {
            Ok(db) => db,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "skipping user during recurring generation");
                continue;
            }
        };
        match generate_for_user(&user_db, today).await {
            Ok(generated) if generated.is_empty() => {}
            Ok(generated) => {
                tracing::info!(user_id = %user_id, count = generated.len(), "generated recurring transactions");
                total += generated.len();
                state.snapshots.invalidate(&user_id);
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "recurring generation failed");
            }
        }
    }
    Ok(total)
}

pub fn spawn_scheduler(state: AppState, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            match run_generation_pass(&state, today()).await {
                Ok(total) => tracing::debug!(total, "recurring generation pass finished"),
                Err(e) => tracing::error!(error = %e, "recurring generation pass failed"),
            }
        }
    })
}

pub async fn create_recurring(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateRecurringPayload>,
) -> Result<(StatusCode, Json<RecurringTransaction>), (StatusCode, String)> {
    let recurring = build_recurring(&payload)?;

    let user_db = state.user_db(&auth).await?;
    insert_recurring(&user_db, &recurring)
        .await
        .map_err(store_error("failed to create recurring transaction"))?;

    Ok((StatusCode::CREATED, Json(recurring)))
}

pub async fn get_recurring(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<(StatusCode, Json<Vec<RecurringTransaction>>), (StatusCode, String)> {
    let user_db = state.user_db(&auth).await?;
    let entries = list_recurring(&user_db)
        .await
        .map_err(store_error("failed to list recurring transactions"))?;
    Ok((StatusCode::OK, Json(entries)))
}

pub async fn set_recurring_active(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recurring_id): Path<String>,
    Json(payload): Json<SetActivePayload>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user_db = state.user_db(&auth).await?;
    let updated = set_active(&user_db, &recurring_id, payload.is_active)
        .await
        .map_err(store_error("failed to update recurring transaction"))?;
    if !updated {
        return Err((
            StatusCode::NOT_FOUND,
            "Recurring transaction not found".to_string(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_recurring(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recurring_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user_db = state.user_db(&auth).await?;
    let removed = remove_recurring(&user_db, &recurring_id)
        .await
        .map_err(store_error("failed to delete recurring transaction"))?;
    if !removed {
        return Err((
            StatusCode::NOT_FOUND,
            "Recurring transaction not found".to_string(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn generate_now(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<(StatusCode, Json<GenerateResponse>), (StatusCode, String)> {
    let user_db = state.user_db(&auth).await?;
    let generated = generate_for_user(&user_db, today())
        .await
        .map_err(store_error("recurring generation failed"))?;

    for transaction in &generated {
        state.record_change(&auth, Change::TransactionUpserted(transaction.clone()));
    }
    Ok((StatusCode::OK, Json(GenerateResponse { generated })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn payload() -> CreateRecurringPayload {
        CreateRecurringPayload {
            amount: 1200.0,
            category: " Rent ".to_string(),
            flow: FlowType::Outflow,
            description: Some("  ".to_string()),
            frequency: Frequency::Monthly,
            start_date: "2024-01-31".to_string(),
            end_date: None,
        }
    }

    #[test]
    fn build_recurring_normalizes_fields() {
        let recurring = build_recurring(&payload()).unwrap();
        assert_eq!(recurring.category, "Rent");
        assert_eq!(recurring.description, None);
        assert!(recurring.is_active);
        assert!(recurring.last_generated.is_none());
    }

    #[test]
    fn build_recurring_rejects_end_before_start() {
        let mut p = payload();
        p.end_date = Some("2023-12-31".to_string());
        assert!(matches!(
            build_recurring(&p),
            Err(ValidationError::DateOrder { .. })
        ));
    }

    #[test]
    fn build_recurring_rejects_non_positive_amount() {
        let mut p = payload();
        p.amount = 0.0;
        assert!(build_recurring(&p).is_err());
    }

    #[test]
    fn occurrence_copies_template() {
        let recurring = build_recurring(&payload()).unwrap();
        let tx = occurrence_transaction(&recurring, date!(2024 - 02 - 29));
        assert_eq!(tx.date, "2024-02-29");
        assert_eq!(tx.category, "Rent");
        assert_eq!(tx.flow, FlowType::Outflow);
        assert_ne!(tx.id, recurring.id);
    }
}
