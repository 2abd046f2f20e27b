use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
}

#[derive(Deserialize, Debug)]
pub struct RegisterPayload {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

/// Direction of money movement. Categories, transactions and budgets are all scoped by it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Inflow,
    Outflow,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::Inflow => "inflow",
            FlowType::Outflow => "outflow",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inflow" => Some(FlowType::Inflow),
            "outflow" => Some(FlowType::Outflow),
            _ => None,
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
}

#[derive(Deserialize, Debug)]
pub struct CreateCategoryPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
}

#[derive(Deserialize, Debug, Default)]
pub struct GetCategoriesQuery {
    #[serde(rename = "type")]
    pub flow: Option<FlowType>,
    pub limit: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub date: String,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateTransactionPayload {
    pub date: String,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpdateTransactionPayload {
    pub date: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub flow: Option<FlowType>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GetTransactionsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub flow: Option<FlowType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GetTransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub total_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: String,
    pub category: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub planned_amount: f64,
    pub period_start: String,
    pub period_end: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateBudgetPayload {
    pub category: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub planned_amount: f64,
    pub period_start: String,
    pub period_end: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            "yearly" => Some(Frequency::Yearly),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecurringTransaction {
    pub id: String,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub start_date: String,
    pub end_date: Option<String>,
    pub is_active: bool,
    /// Date of the last materialized occurrence.
    pub last_generated: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateRecurringPayload {
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub start_date: String,
    pub end_date: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SetActivePayload {
    pub is_active: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GenerateResponse {
    pub generated: Vec<Transaction>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SummaryQuery {
    pub month: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub top: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SeriesQuery {
    pub months: Option<usize>,
}
