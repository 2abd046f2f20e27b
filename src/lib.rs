//! Personal finance tracking server: transactions, categories, budgets with
//! progress alerts, recurring entries and period summaries over per-user
//! libsql stores.

use axum::{
    Router,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod aggregator;
pub mod auth;
pub mod budgets;
pub mod categories;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod models;
pub mod recurring;
pub mod schedule;
pub mod snapshot;
pub mod summaries;
pub mod summary;
pub mod transactions;
pub mod utils;

use crate::auth::AuthContext;
use crate::constants::ERR_DATABASE_ACCESS;
use crate::database::{Db, get_user_db};
use crate::snapshot::{Change, Snapshot, SnapshotCache};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub main_db: Db,
    pub data_path: Arc<str>,
    pub snapshots: Arc<SnapshotCache>,
}

impl AppState {
    pub fn new(main_db: Db, data_path: &str) -> Self {
        AppState {
            main_db,
            data_path: Arc::from(data_path),
            snapshots: Arc::new(SnapshotCache::new()),
        }
    }

    /// Store scoped to the authenticated caller.
    pub async fn user_db(&self, auth: &AuthContext) -> Result<Db, (StatusCode, String)> {
        self.user_db_for(&auth.user_id).await
    }

    pub async fn user_db_for(&self, user_id: &str) -> Result<Db, (StatusCode, String)> {
        get_user_db(&self.data_path, user_id).await.map_err(|e| {
            tracing::error!(error = %e, user_id, "failed to open user database");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ERR_DATABASE_ACCESS.to_string(),
            )
        })
    }

    /// Cached transactions and budgets for the caller, loading them on a miss.
    ///
    /// A load that was superseded while in flight still answers this request
    /// but does not replace the cached view.
    pub async fn snapshot(&self, auth: &AuthContext) -> Result<Arc<Snapshot>, (StatusCode, String)> {
        if let Some(snapshot) = self.snapshots.get(&auth.user_id) {
            return Ok(snapshot);
        }

        let ticket = self.snapshots.begin_fetch(&auth.user_id);
        let user_db = self.user_db(auth).await?;
        let snapshot = Snapshot {
            transactions: transactions::list_all_transactions(&user_db)
                .await
                .map_err(utils::store_error("failed to load transactions"))?,
            budgets: budgets::list_budgets(&user_db)
                .await
                .map_err(utils::store_error("failed to load budgets"))?,
        };
        self.snapshots
            .complete_fetch(&auth.user_id, ticket, snapshot.clone());
        Ok(Arc::new(snapshot))
    }

    pub fn record_change(&self, auth: &AuthContext, change: Change) {
        self.snapshots.apply(&auth.user_id, change);
    }

    /// Drops everything cached for a user whose session ended.
    pub fn forget_user(&self, user_id: &str) {
        self.snapshots.invalidate(user_id);
    }
}

async fn health() -> &'static str {
    "ok"
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route(
            "/categories",
            post(categories::create_category).get(categories::get_categories),
        )
        .route("/categories/{id}", delete(categories::delete_category))
        .route(
            "/transactions",
            post(transactions::create_transaction).get(transactions::get_transactions),
        )
        .route(
            "/transactions/{id}",
            put(transactions::update_transaction).delete(transactions::delete_transaction),
        )
        .route(
            "/budgets",
            post(budgets::create_budget).get(budgets::get_budgets),
        )
        .route("/budgets/status", get(budgets::get_budget_status))
        .route("/budgets/alerts", get(budgets::get_budget_alerts))
        .route("/budgets/{id}", delete(budgets::delete_budget))
        .route(
            "/recurring",
            post(recurring::create_recurring).get(recurring::get_recurring),
        )
        .route("/recurring/generate", post(recurring::generate_now))
        .route("/recurring/{id}", delete(recurring::delete_recurring))
        .route("/recurring/{id}/active", put(recurring::set_recurring_active))
        .route("/summary", get(summaries::get_summary))
        .route("/summary/overview", get(summaries::get_overview))
        .route("/summary/monthly", get(summaries::get_monthly_series))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
