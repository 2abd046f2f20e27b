use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthContext;
use crate::constants::MAX_CATEGORY_NAME_LENGTH;
use crate::database::Db;
use crate::error::ValidationError;
use crate::models::{Category, CreateCategoryPayload, FlowType, GetCategoriesQuery};
use crate::utils::{db_error_with_context, store_error, validate_categories_limit, validate_string_length};

pub fn validate_category_name(name: &str) -> Result<(), ValidationError> {
    validate_string_length(name, "Category name", MAX_CATEGORY_NAME_LENGTH)
}

pub fn extract_category_from_row(row: libsql::Row) -> Result<Category, (StatusCode, String)> {
    let id: String = row
        .get(0)
        .map_err(|_| db_error_with_context("invalid category data"))?;
    let name: String = row
        .get(1)
        .map_err(|_| db_error_with_context("invalid category data"))?;
    let flow: String = row
        .get(2)
        .map_err(|_| db_error_with_context("invalid category data"))?;
    let flow =
        FlowType::parse(&flow).ok_or_else(|| db_error_with_context("invalid category type"))?;

    Ok(Category { id, name, flow })
}

fn category_from_row(row: libsql::Row) -> anyhow::Result<Category> {
    extract_category_from_row(row).map_err(|(_, msg)| anyhow::anyhow!(msg))
}

/// Inserts a category unless the same name (case-insensitive) already exists for its flow.
///
/// Names may repeat across flows: "Gifts" can be both an inflow and an outflow category.
pub async fn insert_category(
    db: &Db,
    name: &str,
    flow: FlowType,
) -> anyhow::Result<Result<Category, ValidationError>> {
    let conn = db.write().await;

    let mut existing = conn
        .query(
            "SELECT id FROM categories WHERE LOWER(name) = LOWER(?) AND type = ?",
            (name, flow.as_str()),
        )
        .await?;
    if existing.next().await?.is_some() {
        return Ok(Err(ValidationError::DuplicateCategory));
    }

    let id = Uuid::new_v4().to_string();
    let inserted = conn
        .execute(
            "INSERT INTO categories (id, name, type) VALUES (?, ?, ?)",
            (id.as_str(), name, flow.as_str()),
        )
        .await;
    match inserted {
        Ok(_) => {}
        Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
            return Ok(Err(ValidationError::DuplicateCategory));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Ok(Category {
        id,
        name: name.to_string(),
        flow,
    }))
}

pub async fn list_categories(
    db: &Db,
    flow: Option<FlowType>,
    limit: u32,
) -> anyhow::Result<Vec<Category>> {
    let conn = db.read().await;
    let mut rows = match flow {
        Some(flow) => {
            conn.query(
                "SELECT id, name, type FROM categories WHERE type = ? ORDER BY name ASC LIMIT ?",
                (flow.as_str(), limit),
            )
            .await?
        }
        None => {
            conn.query(
                "SELECT id, name, type FROM categories ORDER BY type ASC, name ASC LIMIT ?",
                [limit],
            )
            .await?
        }
    };

    let mut categories = Vec::new();
    while let Some(row) = rows.next().await? {
        categories.push(category_from_row(row)?);
    }
    Ok(categories)
}

/// Removes the category only. Transactions and budgets keep the name as a plain label.
pub async fn remove_category(db: &Db, category_id: &str) -> anyhow::Result<bool> {
    let conn = db.write().await;
    let affected = conn
        .execute("DELETE FROM categories WHERE id = ?", [category_id])
        .await?;
    Ok(affected > 0)
}

pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<(StatusCode, Json<Category>), (StatusCode, String)> {
    validate_category_name(&payload.name)?;
    let category_name = payload.name.trim();

    let user_db = state.user_db(&auth).await?;
    let category = insert_category(&user_db, category_name, payload.flow)
        .await
        .map_err(store_error("category creation failed"))??;

    tracing::debug!(user_id = %auth.user_id, category = %category.name, "created category");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_categories(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<GetCategoriesQuery>,
) -> Result<(StatusCode, Json<Vec<Category>>), (StatusCode, String)> {
    let limit = validate_categories_limit(query.limit)?;
    let user_db = state.user_db(&auth).await?;
    let categories = list_categories(&user_db, query.flow, limit)
        .await
        .map_err(store_error("failed to list categories"))?;

    Ok((StatusCode::OK, Json(categories)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(category_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user_db = state.user_db(&auth).await?;
    let removed = remove_category(&user_db, &category_id)
        .await
        .map_err(store_error("category deletion failed"))?;

    if !removed {
        return Err((StatusCode::NOT_FOUND, "Category not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
