use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use time::Date;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthContext;
use crate::constants::MAX_CATEGORY_NAME_LENGTH;
use crate::database::{Db, optional_text, text_or_null};
use crate::error::ValidationError;
use crate::models::{
    CreateTransactionPayload, FlowType, GetTransactionsQuery, GetTransactionsResponse,
    Transaction, UpdateTransactionPayload,
};
use crate::snapshot::Change;
use crate::utils::{
    canonical_date, normalize_description, store_error, today, validate_amount,
    validate_description, validate_offset, validate_string_length, validate_transaction_date,
    validate_transactions_limit,
};

const SELECT_COLUMNS: &str = "SELECT id, date, amount, category, type, description FROM transactions";

pub fn extract_transaction_from_row(row: libsql::Row) -> Result<Transaction, (StatusCode, String)> {
    let column_error = |field: &str, e: &dyn std::fmt::Display| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to get transaction {}: {}", field, e),
        )
    };

    let id: String = row.get(0).map_err(|e| column_error("id", &e))?;
    let date: String = row.get(1).map_err(|e| column_error("date", &e))?;
    let amount: f64 = row.get(2).map_err(|e| column_error("amount", &e))?;
    let category: String = row.get(3).map_err(|e| column_error("category", &e))?;
    let flow: String = row.get(4).map_err(|e| column_error("type", &e))?;
    let flow = FlowType::parse(&flow).ok_or_else(|| column_error("type", &flow))?;
    let description = optional_text(&row, 5).map_err(|e| column_error("description", &e))?;

    Ok(Transaction {
        id,
        date,
        amount,
        category,
        flow,
        description,
    })
}

fn transaction_from_row(row: libsql::Row) -> anyhow::Result<Transaction> {
    extract_transaction_from_row(row).map_err(|(_, msg)| anyhow::anyhow!(msg))
}

/// Validates and normalizes a new transaction, assigning it a fresh id.
pub fn build_transaction(
    payload: &CreateTransactionPayload,
    today: Date,
) -> Result<Transaction, ValidationError> {
    validate_amount(payload.amount)?;
    let date = validate_transaction_date(&payload.date, today)?;
    validate_string_length(&payload.category, "Category", MAX_CATEGORY_NAME_LENGTH)?;
    validate_description(payload.description.as_deref())?;

    Ok(Transaction {
        id: Uuid::new_v4().to_string(),
        date,
        amount: payload.amount,
        category: payload.category.trim().to_string(),
        flow: payload.flow,
        description: normalize_description(payload.description.as_deref()),
    })
}

/// Applies the provided fields on top of `existing`, validating each one.
pub fn apply_update(
    existing: &Transaction,
    update: &UpdateTransactionPayload,
    today: Date,
) -> Result<Transaction, ValidationError> {
    if update.date.is_none()
        && update.amount.is_none()
        && update.category.is_none()
        && update.flow.is_none()
        && update.description.is_none()
    {
        return Err(ValidationError::InvalidQuery(
            "At least one field must be provided for update".to_string(),
        ));
    }

    let mut updated = existing.clone();
    if let Some(date) = update.date.as_deref() {
        updated.date = validate_transaction_date(date, today)?;
    }
    if let Some(amount) = update.amount {
        validate_amount(amount)?;
        updated.amount = amount;
    }
    if let Some(category) = update.category.as_deref() {
        validate_string_length(category, "Category", MAX_CATEGORY_NAME_LENGTH)?;
        updated.category = category.trim().to_string();
    }
    if let Some(flow) = update.flow {
        updated.flow = flow;
    }
    if let Some(description) = update.description.as_deref() {
        validate_description(Some(description))?;
        updated.description = normalize_description(Some(description));
    }
    Ok(updated)
}

pub async fn insert_transaction(db: &Db, tx: &Transaction) -> anyhow::Result<()> {
    let conn = db.write().await;
    conn.execute(
        "INSERT INTO transactions (id, date, amount, category, type, description) VALUES (?, ?, ?, ?, ?, ?)",
        (
            tx.id.as_str(),
            tx.date.as_str(),
            tx.amount,
            tx.category.as_str(),
            tx.flow.as_str(),
            text_or_null(tx.description.as_deref()),
        ),
    )
    .await?;
    Ok(())
}

/// Inclusive date range and flow filter for listing.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub flow: Option<FlowType>,
    pub limit: u32,
    pub offset: u32,
}

impl TransactionFilter {
    pub fn from_query(query: &GetTransactionsQuery) -> Result<Self, ValidationError> {
        let start_date = query.start_date.as_deref().map(canonical_date).transpose()?;
        let end_date = query.end_date.as_deref().map(canonical_date).transpose()?;
        if let (Some(start), Some(end)) = (&start_date, &end_date) {
            if start > end {
                return Err(ValidationError::DateOrder {
                    start_field: "start_date",
                    end_field: "end_date",
                });
            }
        }

        Ok(TransactionFilter {
            start_date,
            end_date,
            flow: query.flow,
            limit: validate_transactions_limit(query.limit)?,
            offset: validate_offset(query.offset)?,
        })
    }
}

/// Newest first, with the total number of matches ignoring limit and offset.
pub async fn list_transactions(
    db: &Db,
    filter: &TransactionFilter,
) -> anyhow::Result<(Vec<Transaction>, u32)> {
    let conn = db.read().await;
    let start = filter.start_date.as_deref().unwrap_or("0000-01-01");
    let end = filter.end_date.as_deref().unwrap_or("9999-12-31");
    let flow = text_or_null(filter.flow.as_ref().map(FlowType::as_str));

    let mut count_rows = conn
        .query(
            "SELECT COUNT(*) FROM transactions WHERE date BETWEEN ? AND ? AND (? IS NULL OR type = ?)",
            (start, end, flow.clone(), flow.clone()),
        )
        .await?;
    let total_count: u32 = match count_rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };

    let sql = format!(
        "{} WHERE date BETWEEN ? AND ? AND (? IS NULL OR type = ?) ORDER BY date DESC, id ASC LIMIT ? OFFSET ?",
        SELECT_COLUMNS
    );
    let mut rows = conn
        .query(
            &sql,
            (start, end, flow.clone(), flow, filter.limit, filter.offset),
        )
        .await?;

    let mut transactions = Vec::new();
    while let Some(row) = rows.next().await? {
        transactions.push(transaction_from_row(row)?);
    }
    Ok((transactions, total_count))
}

/// Every transaction the user owns; feeds aggregation.
pub async fn list_all_transactions(db: &Db) -> anyhow::Result<Vec<Transaction>> {
    let conn = db.read().await;
    let sql = format!("{} ORDER BY date DESC, id ASC", SELECT_COLUMNS);
    let mut rows = conn.query(&sql, ()).await?;

    let mut transactions = Vec::new();
    while let Some(row) = rows.next().await? {
        transactions.push(transaction_from_row(row)?);
    }
    Ok(transactions)
}

pub async fn get_transaction(db: &Db, id: &str) -> anyhow::Result<Option<Transaction>> {
    let conn = db.read().await;
    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    let mut rows = conn.query(&sql, [id]).await?;
    match rows.next().await? {
        Some(row) => Ok(Some(transaction_from_row(row)?)),
        None => Ok(None),
    }
}

pub async fn save_transaction(db: &Db, tx: &Transaction) -> anyhow::Result<bool> {
    let conn = db.write().await;
    let affected = conn
        .execute(
            "UPDATE transactions SET date = ?, amount = ?, category = ?, type = ?, description = ? WHERE id = ?",
            (
                tx.date.as_str(),
                tx.amount,
                tx.category.as_str(),
                tx.flow.as_str(),
                text_or_null(tx.description.as_deref()),
                tx.id.as_str(),
            ),
        )
        .await?;
    Ok(affected > 0)
}

pub async fn remove_transaction(db: &Db, id: &str) -> anyhow::Result<bool> {
    let conn = db.write().await;
    let affected = conn
        .execute("DELETE FROM transactions WHERE id = ?", [id])
        .await?;
    Ok(affected > 0)
}

pub async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateTransactionPayload>,
) -> Result<(StatusCode, Json<Transaction>), (StatusCode, String)> {
    let transaction = build_transaction(&payload, today())?;

    let user_db = state.user_db(&auth).await?;
    insert_transaction(&user_db, &transaction)
        .await
        .map_err(store_error("failed to create transaction"))?;

    state.record_change(&auth, Change::TransactionUpserted(transaction.clone()));
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn get_transactions(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<GetTransactionsQuery>,
) -> Result<(StatusCode, Json<GetTransactionsResponse>), (StatusCode, String)> {
    let filter = TransactionFilter::from_query(&query)?;

    let user_db = state.user_db(&auth).await?;
    let (transactions, total_count) = list_transactions(&user_db, &filter)
        .await
        .map_err(store_error("failed to query transactions"))?;

    Ok((
        StatusCode::OK,
        Json(GetTransactionsResponse {
            transactions,
            total_count,
        }),
    ))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(transaction_id): Path<String>,
    Json(payload): Json<UpdateTransactionPayload>,
) -> Result<(StatusCode, Json<Transaction>), (StatusCode, String)> {
    let user_db = state.user_db(&auth).await?;
    let existing = get_transaction(&user_db, &transaction_id)
        .await
        .map_err(store_error("failed to load transaction"))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Transaction not found".to_string()))?;

    let updated = apply_update(&existing, &payload, today())?;
    let saved = save_transaction(&user_db, &updated)
        .await
        .map_err(store_error("failed to update transaction"))?;
    if !saved {
        return Err((StatusCode::NOT_FOUND, "Transaction not found".to_string()));
    }

    state.record_change(&auth, Change::TransactionUpserted(updated.clone()));
    Ok((StatusCode::OK, Json(updated)))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(transaction_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user_db = state.user_db(&auth).await?;
    let removed = remove_transaction(&user_db, &transaction_id)
        .await
        .map_err(store_error("failed to delete transaction"))?;
    if !removed {
        return Err((StatusCode::NOT_FOUND, "Transaction not found".to_string()));
    }

    state.record_change(&auth, Change::TransactionDeleted(transaction_id));
    Ok(StatusCode::NO_CONTENT)
}
