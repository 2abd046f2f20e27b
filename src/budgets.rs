use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use libsql::TransactionBehavior;
use uuid::Uuid;

use crate::AppState;
use crate::aggregator::{BudgetAlert, BudgetStatus, find_overlapping};
use crate::auth::AuthContext;
use crate::constants::MAX_CATEGORY_NAME_LENGTH;
use crate::database::Db;
use crate::error::ValidationError;
use crate::models::{Budget, CreateBudgetPayload, FlowType};
use crate::snapshot::Change;
use crate::utils::{canonical_date, store_error, validate_amount, validate_string_length};

const SELECT_COLUMNS: &str =
    "SELECT id, category, type, planned_amount, period_start, period_end FROM budgets";

pub fn extract_budget_from_row(row: libsql::Row) -> anyhow::Result<Budget> {
    let flow: String = row.get(2)?;
    Ok(Budget {
        id: row.get(0)?,
        category: row.get(1)?,
        flow: FlowType::parse(&flow)
            .ok_or_else(|| anyhow::anyhow!("invalid budget type '{}'", flow))?,
        planned_amount: row.get(3)?,
        period_start: row.get(4)?,
        period_end: row.get(5)?,
    })
}

/// Checks the creation-time rules that do not need the store: amount bounds and period order.
pub fn build_budget(payload: &CreateBudgetPayload) -> Result<Budget, ValidationError> {
    validate_string_length(&payload.category, "Category", MAX_CATEGORY_NAME_LENGTH)?;
    let period_start = canonical_date(&payload.period_start)?;
    let period_end = canonical_date(&payload.period_end)?;
    if period_start >= period_end {
        return Err(ValidationError::DateOrder {
            start_field: "Period start",
            end_field: "period end",
        });
    }
    validate_amount(payload.planned_amount)?;

    Ok(Budget {
        id: Uuid::new_v4().to_string(),
        category: payload.category.trim().to_string(),
        flow: payload.flow,
        planned_amount: payload.planned_amount,
        period_start,
        period_end,
    })
}

/// Inserts `budget` unless an existing budget for the same category and flow overlaps it.
///
/// The overlap check and the insert run in one immediate transaction.
pub async fn insert_budget(
    db: &Db,
    budget: &Budget,
) -> anyhow::Result<Result<(), ValidationError>> {
    let conn = db.write().await;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .await?;

    let sql = format!("{} WHERE category = ? AND type = ?", SELECT_COLUMNS);
    let mut rows = tx
        .query(&sql, (budget.category.as_str(), budget.flow.as_str()))
        .await?;
    let mut existing = Vec::new();
    while let Some(row) = rows.next().await? {
        existing.push(extract_budget_from_row(row)?);
    }

    if let Some(clash) = find_overlapping(
        &existing,
        &budget.category,
        budget.flow,
        &budget.period_start,
        &budget.period_end,
    ) {
        tracing::debug!(existing = %clash.id, "rejecting overlapping budget");
        return Ok(Err(ValidationError::OverlappingBudget));
    }

    tx.execute(
        "INSERT INTO budgets (id, category, type, planned_amount, period_start, period_end) VALUES (?, ?, ?, ?, ?, ?)",
        (
            budget.id.as_str(),
            budget.category.as_str(),
            budget.flow.as_str(),
            budget.planned_amount,
            budget.period_start.as_str(),
            budget.period_end.as_str(),
        ),
    )
    .await?;
    tx.commit().await?;
    Ok(Ok(()))
}

pub async fn list_budgets(db: &Db) -> anyhow::Result<Vec<Budget>> {
    let conn = db.read().await;
    let sql = format!("{} ORDER BY period_start DESC, category ASC", SELECT_COLUMNS);
    let mut rows = conn.query(&sql, ()).await?;

    let mut budgets = Vec::new();
    while let Some(row) = rows.next().await? {
        budgets.push(extract_budget_from_row(row)?);
    }
    Ok(budgets)
}

pub async fn remove_budget(db: &Db, id: &str) -> anyhow::Result<bool> {
    let conn = db.write().await;
    let affected = conn
        .execute("DELETE FROM budgets WHERE id = ?", [id])
        .await?;
    Ok(affected > 0)
}

pub async fn create_budget(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateBudgetPayload>,
) -> Result<(StatusCode, Json<Budget>), (StatusCode, String)> {
    let budget = build_budget(&payload)?;

    let user_db = state.user_db(&auth).await?;
    insert_budget(&user_db, &budget)
        .await
        .map_err(store_error("budget creation failed"))??;

    state.record_change(&auth, Change::BudgetUpserted(budget.clone()));
    Ok((StatusCode::CREATED, Json(budget)))
}

pub async fn get_budgets(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<(StatusCode, Json<Vec<Budget>>), (StatusCode, String)> {
    let user_db = state.user_db(&auth).await?;
    let budgets = list_budgets(&user_db)
        .await
        .map_err(store_error("failed to list budgets"))?;
    Ok((StatusCode::OK, Json(budgets)))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(budget_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user_db = state.user_db(&auth).await?;
    let removed = remove_budget(&user_db, &budget_id)
        .await
        .map_err(store_error("budget deletion failed"))?;
    if !removed {
        return Err((StatusCode::NOT_FOUND, "Budget not found".to_string()));
    }

    state.record_change(&auth, Change::BudgetDeleted(budget_id));
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_budget_status(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<(StatusCode, Json<Vec<BudgetStatus>>), (StatusCode, String)> {
    let snapshot = state.snapshot(&auth).await?;
    Ok((StatusCode::OK, Json(snapshot.budget_statuses())))
}

pub async fn get_budget_alerts(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<(StatusCode, Json<Vec<BudgetAlert>>), (StatusCode, String)> {
    let snapshot = state.snapshot(&auth).await?;
    Ok((StatusCode::OK, Json(snapshot.budget_alerts())))
}
