use axum::http::StatusCode;
use my_finance_server::categories::{
    extract_category_from_row, insert_category, list_categories, remove_category,
    validate_category_name,
};
use my_finance_server::error::ValidationError;
use my_finance_server::models::FlowType;
use my_finance_server::transactions::list_all_transactions;

mod common;
use common::*;

#[tokio::test]
async fn test_validate_category_name_valid() {
    assert!(validate_category_name("Groceries").is_ok());
}

#[tokio::test]
async fn test_validate_category_name_whitespace_only() {
    let err = validate_category_name("   ").unwrap_err();
    let (status, message): (StatusCode, String) = err.into();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(message.contains("Category name cannot be empty"));
}

#[tokio::test]
async fn test_validate_category_name_too_long() {
    let long_name = "a".repeat(101);
    let err = validate_category_name(&long_name).unwrap_err();
    assert!(err.to_string().contains("must be less than"));
}

#[tokio::test]
async fn test_insert_and_extract_category() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;

    let created = insert_category(&db, "Salary", FlowType::Inflow)
        .await
        .expect("store error")
        .expect("category rejected");

    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT id, name, type FROM categories WHERE id = ?",
            [created.id.as_str()],
        )
        .await
        .expect("Failed to query category");
    let row = rows
        .next()
        .await
        .expect("Failed to read row")
        .expect("No category found");
    let category = extract_category_from_row(row).expect("extraction failed");
    assert_eq!(category, created);
    assert_eq!(category.flow, FlowType::Inflow);
}

#[tokio::test]
async fn test_same_name_allowed_across_flows() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;

    insert_category(&db, "Gifts", FlowType::Inflow)
        .await
        .unwrap()
        .expect("inflow category rejected");
    insert_category(&db, "Gifts", FlowType::Outflow)
        .await
        .unwrap()
        .expect("outflow category rejected");

    let all = list_categories(&db, None, 100).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_duplicate_name_rejected_case_insensitively() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;

    insert_category(&db, "Food", FlowType::Outflow)
        .await
        .unwrap()
        .unwrap();
    let duplicate = insert_category(&db, "FOOD", FlowType::Outflow)
        .await
        .unwrap();
    assert_eq!(duplicate, Err(ValidationError::DuplicateCategory));
    assert_eq!(
        ValidationError::DuplicateCategory.status_code(),
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn test_list_categories_filters_by_flow() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;

    for (name, flow) in [
        ("Salary", FlowType::Inflow),
        ("Rent", FlowType::Outflow),
        ("Food", FlowType::Outflow),
    ] {
        insert_category(&db, name, flow).await.unwrap().unwrap();
    }

    let outflows = list_categories(&db, Some(FlowType::Outflow), 100)
        .await
        .unwrap();
    let names: Vec<&str> = outflows.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Food", "Rent"]);

    let limited = list_categories(&db, None, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_delete_category_keeps_transactions() {
    let (data_path, user_id, _temp_dir) = setup_test_environment().await;
    let db = user_db(&data_path, &user_id).await;

    let category = insert_category(&db, "Food", FlowType::Outflow)
        .await
        .unwrap()
        .unwrap();
    create_test_transaction(&db, "2024-03-01", 42.0, "Food", FlowType::Outflow).await;

    assert!(remove_category(&db, &category.id).await.unwrap());
    assert!(!remove_category(&db, &category.id).await.unwrap());

    let transactions = list_all_transactions(&db).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].category, "Food");
}
