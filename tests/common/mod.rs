#![allow(dead_code)]

use my_finance_server::budgets::insert_budget;
use my_finance_server::database::{Db, get_user_db, init_main_db};
use my_finance_server::models::{Budget, FlowType, Transaction};
use my_finance_server::transactions::insert_transaction;
use tempfile::{TempDir, tempdir};
use uuid::Uuid;

/// Fresh data directory with the main registry and one provisioned user store.
/// The returned `TempDir` must outlive the test.
pub async fn setup_test_environment() -> (String, String, TempDir) {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let data_path = temp_dir
        .path()
        .to_str()
        .expect("Failed to convert path to string")
        .to_string();
    let user_id = Uuid::new_v4().to_string();

    init_main_db(&data_path)
        .await
        .unwrap_or_else(|e| panic!("Failed to initialize main database at {}: {}", data_path, e));
    get_user_db(&data_path, &user_id).await.unwrap_or_else(|e| {
        panic!(
            "Failed to initialize user database for user {} at {}: {}",
            user_id, data_path, e
        )
    });

    (data_path, user_id, temp_dir)
}

pub async fn user_db(data_path: &str, user_id: &str) -> Db {
    get_user_db(data_path, user_id)
        .await
        .unwrap_or_else(|e| panic!("Failed to get user database for {}: {}", user_id, e))
}

pub fn transaction(date: &str, amount: f64, category: &str, flow: FlowType) -> Transaction {
    Transaction {
        id: Uuid::new_v4().to_string(),
        date: date.to_string(),
        amount,
        category: category.to_string(),
        flow,
        description: None,
    }
}

pub fn budget(category: &str, flow: FlowType, planned: f64, start: &str, end: &str) -> Budget {
    Budget {
        id: Uuid::new_v4().to_string(),
        category: category.to_string(),
        flow,
        planned_amount: planned,
        period_start: start.to_string(),
        period_end: end.to_string(),
    }
}

pub async fn create_test_transaction(
    db: &Db,
    date: &str,
    amount: f64,
    category: &str,
    flow: FlowType,
) -> Transaction {
    let tx = transaction(date, amount, category, flow);
    insert_transaction(db, &tx)
        .await
        .unwrap_or_else(|e| panic!("Failed to insert transaction {:?}: {}", tx, e));
    tx
}

pub async fn create_test_budget(
    db: &Db,
    category: &str,
    flow: FlowType,
    planned: f64,
    start: &str,
    end: &str,
) -> Budget {
    let b = budget(category, flow, planned, start, end);
    insert_budget(db, &b)
        .await
        .expect("Failed to insert budget")
        .unwrap_or_else(|e| panic!("Budget {:?} rejected: {}", b, e));
    b
}
