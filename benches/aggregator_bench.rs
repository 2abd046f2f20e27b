use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tempfile::tempdir;
use tokio::runtime::Runtime;
use uuid::Uuid;

use my_finance_server::aggregator::{budget_alerts, compute_budget_status};
use my_finance_server::database::{Db, get_user_db, init_main_db};
use my_finance_server::models::{Budget, FlowType, Transaction};
use my_finance_server::summary::{DateWindow, monthly_series, summarize_period};
use my_finance_server::transactions::{
    TransactionFilter, insert_transaction, list_all_transactions, list_transactions,
};

const BENCH_TRANSACTION_COUNT: usize = 1000;
const BENCH_CATEGORIES: [&str; 10] = [
    "Food",
    "Rent",
    "Transport",
    "Utilities",
    "Health",
    "Fun",
    "Gifts",
    "Travel",
    "Books",
    "Misc",
];

fn sample_transactions(count: usize) -> Vec<Transaction> {
    (0..count)
        .map(|i| Transaction {
            id: Uuid::new_v4().to_string(),
            date: format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1),
            amount: 10.0 + (i % 100) as f64,
            category: BENCH_CATEGORIES[i % BENCH_CATEGORIES.len()].to_string(),
            flow: if i % 5 == 0 {
                FlowType::Inflow
            } else {
                FlowType::Outflow
            },
            description: None,
        })
        .collect()
}

fn sample_budgets() -> Vec<Budget> {
    (1..=12)
        .flat_map(|month| {
            BENCH_CATEGORIES.iter().map(move |category| Budget {
                id: Uuid::new_v4().to_string(),
                category: category.to_string(),
                flow: FlowType::Outflow,
                planned_amount: 500.0,
                period_start: format!("2024-{:02}-01", month),
                period_end: format!("2024-{:02}-28", month),
            })
        })
        .collect()
}

async fn setup_benchmark_db(data_path: &str, transactions: &[Transaction]) -> Db {
    init_main_db(data_path).await.unwrap();
    let db = get_user_db(data_path, &Uuid::new_v4().to_string())
        .await
        .unwrap();
    for tx in transactions {
        insert_transaction(&db, tx).await.unwrap();
    }
    db
}

fn criterion_benchmark(c: &mut Criterion) {
    let transactions = sample_transactions(BENCH_TRANSACTION_COUNT);
    let budgets = sample_budgets();
    let march = DateWindow::parse_month("2024-03").unwrap();

    c.bench_function("compute_budget_status", |b| {
        b.iter(|| compute_budget_status(black_box(&budgets), black_box(&transactions)))
    });

    c.bench_function("budget_alerts", |b| {
        b.iter(|| budget_alerts(black_box(&budgets), black_box(&transactions)))
    });

    c.bench_function("summarize_period", |b| {
        b.iter(|| summarize_period(black_box(&transactions), &march, 5))
    });

    c.bench_function("monthly_series", |b| {
        b.iter(|| monthly_series(black_box(&transactions), 12))
    });

    let rt = Runtime::new().unwrap();
    let temp_dir = tempdir().unwrap();
    let data_path = temp_dir.path().to_str().unwrap().to_string();
    let db = rt.block_on(setup_benchmark_db(&data_path, &transactions));

    c.bench_function("list_all_transactions", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(list_all_transactions(&db).await.unwrap()) })
    });

    let filter = TransactionFilter {
        start_date: Some("2024-03-01".to_string()),
        end_date: Some("2024-06-30".to_string()),
        flow: Some(FlowType::Outflow),
        limit: 500,
        offset: 0,
    };
    c.bench_function("list_transactions_filtered", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(list_transactions(&db, &filter).await.unwrap()) })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
