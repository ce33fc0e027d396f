//! Domain models for Tally

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest amount or cost a single transaction may carry
pub const MAX_AMOUNT: f64 = 1e12;

/// Whether a transaction brings money in or takes it out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Revenue,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "revenue" | "income" => Ok(Self::Revenue),
            "expense" | "expenses" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored transaction
///
/// Only `business_id`, the year/month of `date`, `tx_type`, `amount`, `cost`,
/// `students` and `clients` contribute to aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub business_id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub category: Option<String>,
    pub amount: f64,
    /// Cost of goods riding on the transaction, counted as an expense
    /// whatever the transaction type
    pub cost: Option<f64>,
    pub students: Option<u32>,
    pub clients: Option<u32>,
    pub date: NaiveDateTime,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A transaction that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub business_id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub students: Option<u32>,
    #[serde(default)]
    pub clients: Option<u32>,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl NewTransaction {
    /// Minimal transaction with no optional fields set
    pub fn new(
        business_id: impl Into<String>,
        tx_type: TransactionType,
        amount: f64,
        date: NaiveDateTime,
    ) -> Self {
        Self {
            business_id: business_id.into(),
            tx_type,
            category: None,
            amount,
            cost: None,
            students: None,
            clients: None,
            date,
            notes: None,
            payment_method: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_students(mut self, students: u32) -> Self {
        self.students = Some(students);
        self
    }

    pub fn with_clients(mut self, clients: u32) -> Self {
        self.clients = Some(clients);
        self
    }

    /// Reject records that must never reach the aggregator
    pub fn validate(&self) -> Result<()> {
        if self.business_id.trim().is_empty() {
            return Err(Error::InvalidData("businessId is required".to_string()));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidData(format!(
                "amount must be a positive number, got {}",
                self.amount
            )));
        }
        if self.amount > MAX_AMOUNT {
            return Err(Error::InvalidData(format!(
                "amount must not exceed {}, got {}",
                MAX_AMOUNT, self.amount
            )));
        }
        if let Some(cost) = self.cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(Error::InvalidData(format!(
                    "cost must be a non-negative number, got {}",
                    cost
                )));
            }
            if cost > MAX_AMOUNT {
                return Err(Error::InvalidData(format!(
                    "cost must not exceed {}, got {}",
                    MAX_AMOUNT, cost
                )));
            }
        }
        Ok(())
    }
}

/// Parse a transaction date as entered in forms, CSV files or the CLI
///
/// Accepts plain dates (`2024-01-15`), `datetime-local` values
/// (`2024-01-15T10:30`), full timestamps and RFC 3339 (converted to UTC).
pub fn parse_transaction_date(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default());
    }

    for format in [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .map_err(|_| Error::InvalidData(format!("Invalid date: {}", s)))
}

/// Revenue, expenses and counts for one business in one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    #[serde(rename = "businessId")]
    pub business_id: String,
    pub year: i32,
    pub month: u32,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub students_count: i64,
    pub clients_count: i64,
    pub transactions_count: i64,
    pub avg_ticket: f64,
    /// Change in net profit against the previous entry of the sequence,
    /// whichever business that entry belongs to. Absent for the first entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_vs_prev: Option<f64>,
    /// Change in net profit against the previous bucket of the same business.
    /// Absent for a business's first bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_growth_vs_prev: Option<f64>,
}

impl MonthlyAggregate {
    /// Empty bucket for a business and calendar month
    pub fn new(business_id: impl Into<String>, year: i32, month: u32) -> Self {
        Self {
            business_id: business_id.into(),
            year,
            month,
            total_revenue: 0.0,
            total_expenses: 0.0,
            net_profit: 0.0,
            students_count: 0,
            clients_count: 0,
            transactions_count: 0,
            avg_ticket: 0.0,
            growth_vs_prev: None,
            business_growth_vs_prev: None,
        }
    }

    /// Whether every money total is a finite number
    pub fn is_finite(&self) -> bool {
        self.total_revenue.is_finite()
            && self.total_expenses.is_finite()
            && self.net_profit.is_finite()
            && self.avg_ticket.is_finite()
    }

    /// Sort key shared by every business: `year * 100 + month`
    pub fn period_key(&self) -> i64 {
        i64::from(self.year) * 100 + i64::from(self.month)
    }

    /// Display label, e.g. `2024/1`
    pub fn label(&self) -> String {
        format!("{}/{}", self.year, self.month)
    }
}

/// How many periods backed a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Next-period projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub forecast_revenue: f64,
    pub forecast_profit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_growth_rate: Option<f64>,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub based_on_months: Option<usize>,
}

impl ForecastResult {
    /// Zero projection returned whenever there is not enough history
    pub fn low_confidence() -> Self {
        Self {
            forecast_revenue: 0.0,
            forecast_profit: 0.0,
            avg_growth_rate: None,
            confidence: Confidence::Low,
            based_on_months: None,
        }
    }
}

/// An employee record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub role: Option<String>,
    pub business_id: Option<String>,
    pub monthly_salary: Option<f64>,
    pub hired_at: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or replacing an employee
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub business_id: Option<String>,
    #[serde(default)]
    pub monthly_salary: Option<f64>,
    #[serde(default)]
    pub hired_at: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewEmployee {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidData("name is required".to_string()));
        }
        if let Some(salary) = self.monthly_salary {
            if !salary.is_finite() || salary < 0.0 {
                return Err(Error::InvalidData(format!(
                    "monthlySalary must be a non-negative number, got {}",
                    salary
                )));
            }
        }
        Ok(())
    }
}
