/*!
 * Transaction store integration tests: filtering, pagination, ordering,
 * updates and deletes against an isolated per-user database.
 */

use my_finance_server::models::{
    CreateTransactionPayload, FlowType, GetTransactionsQuery, UpdateTransactionPayload,
};
use my_finance_server::transactions::{
    TransactionFilter, apply_update, build_transaction, get_transaction, list_transactions,
    remove_transaction, save_transaction,
};
use time::macros::date;

mod common;
use common::*;

async fn seed(db: &my_finance_server::database::Db) {
    create_test_transaction(db, "2024-01-05", 2000.0, "Salary", FlowType::Inflow).await;
    create_test_transaction(db, "2024-01-10", 300.0, "Food", FlowType::Outflow).await;
    create_test_transaction(db, "2024-02-01", 1000.0, "Rent", FlowType::Outflow).await;
    create_test_transaction(db, "2024-02-15", 500.0, "Freelance", FlowType::Inflow).await;
}

fn filter(query: GetTransactionsQuery) -> TransactionFilter {
    TransactionFilter::from_query(&query).expect("valid query")
}

#[tokio::test]
async fn test_empty_database() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;

    let (transactions, total) = list_transactions(&db, &filter(GetTransactionsQuery::default()))
        .await
        .unwrap();
    assert!(transactions.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_newest_first() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;
    seed(&db).await;

    let (transactions, total) = list_transactions(&db, &filter(GetTransactionsQuery::default()))
        .await
        .unwrap();
    assert_eq!(total, 4);
    let dates: Vec<&str> = transactions.iter().map(|t| t.date.as_str()).collect();
    assert_eq!(
        dates,
        vec!["2024-02-15", "2024-02-01", "2024-01-10", "2024-01-05"]
    );
}

#[tokio::test]
async fn test_date_range_is_inclusive() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;
    seed(&db).await;

    let query = GetTransactionsQuery {
        start_date: Some("2024-01-10".to_string()),
        end_date: Some("2024-02-01".to_string()),
        ..Default::default()
    };
    let (transactions, total) = list_transactions(&db, &filter(query)).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(transactions.len(), 2);
}

#[tokio::test]
async fn test_flow_filter_and_pagination() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;
    seed(&db).await;

    let query = GetTransactionsQuery {
        flow: Some(FlowType::Outflow),
        limit: Some(1),
        offset: Some(1),
        ..Default::default()
    };
    let (transactions, total) = list_transactions(&db, &filter(query)).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].category, "Food");
}

#[tokio::test]
async fn test_invalid_queries_rejected() {
    let reversed = GetTransactionsQuery {
        start_date: Some("2024-02-01".to_string()),
        end_date: Some("2024-01-01".to_string()),
        ..Default::default()
    };
    assert!(TransactionFilter::from_query(&reversed).is_err());

    let zero_limit = GetTransactionsQuery {
        limit: Some(0),
        ..Default::default()
    };
    assert!(TransactionFilter::from_query(&zero_limit).is_err());

    let bad_date = GetTransactionsQuery {
        start_date: Some("01/02/2024".to_string()),
        ..Default::default()
    };
    assert!(TransactionFilter::from_query(&bad_date).is_err());
}

#[tokio::test]
async fn test_build_transaction_validation() {
    let today = date!(2024 - 06 - 01);
    let payload = CreateTransactionPayload {
        date: "2024-05-20".to_string(),
        amount: 12.5,
        category: "  Coffee ".to_string(),
        flow: FlowType::Outflow,
        description: Some("  latte ".to_string()),
    };
    let tx = build_transaction(&payload, today).unwrap();
    assert_eq!(tx.category, "Coffee");
    assert_eq!(tx.description.as_deref(), Some("latte"));

    let too_early = CreateTransactionPayload {
        date: "1999-12-31".to_string(),
        ..payload.clone()
    };
    assert!(build_transaction(&too_early, today).is_err());

    let too_late = CreateTransactionPayload {
        date: "2025-06-02".to_string(),
        ..payload.clone()
    };
    assert!(build_transaction(&too_late, today).is_err());

    let negative = CreateTransactionPayload {
        amount: -5.0,
        ..payload
    };
    assert!(build_transaction(&negative, today).is_err());
}

#[tokio::test]
async fn test_update_and_delete() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;
    let original = create_test_transaction(&db, "2024-03-01", 40.0, "Food", FlowType::Outflow).await;

    let update = UpdateTransactionPayload {
        amount: Some(55.0),
        description: Some("groceries".to_string()),
        ..Default::default()
    };
    let updated = apply_update(&original, &update, date!(2024 - 03 - 10)).unwrap();
    assert!(save_transaction(&db, &updated).await.unwrap());

    let stored = get_transaction(&db, &original.id).await.unwrap().unwrap();
    assert_eq!(stored.amount, 55.0);
    assert_eq!(stored.date, "2024-03-01");
    assert_eq!(stored.description.as_deref(), Some("groceries"));

    assert!(remove_transaction(&db, &original.id).await.unwrap());
    assert!(get_transaction(&db, &original.id).await.unwrap().is_none());
    assert!(!remove_transaction(&db, &original.id).await.unwrap());
}

#[tokio::test]
async fn test_empty_update_rejected() {
    let tx = transaction("2024-03-01", 10.0, "Food", FlowType::Outflow);
    assert!(apply_update(&tx, &UpdateTransactionPayload::default(), date!(2024 - 03 - 10)).is_err());
}
