//! Transaction filter builder for constructing dynamic SQL queries
//!
//! Shared by the transaction listing and the CSV export so both apply the
//! same WHERE clause.

use chrono::{Days, NaiveDate};

use crate::models::TransactionType;

/// Builder for constructing transaction query filters
///
/// The lifetime `'query` covers the borrowed business id.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransactionFilter<'query> {
    pub business_id: Option<&'query str>,
    pub tx_type: Option<TransactionType>,
    /// Inclusive
    pub start_date: Option<NaiveDate>,
    /// Inclusive; the whole day is included
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// LIMIT/OFFSET clause (empty when unpaged)
    pub page_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl<'query> TransactionFilter<'query> {
    /// Create a new filter builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn business_id(mut self, id: Option<&'query str>) -> Self {
        self.business_id = id;
        self
    }

    pub fn tx_type(mut self, tx_type: Option<TransactionType>) -> Self {
        self.tx_type = tx_type;
        self
    }

    pub fn date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn page(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Build the filter components
    pub fn build(self) -> FilterResult {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(business_id) = self.business_id {
            conditions.push("business_id = ?");
            params.push(Box::new(business_id.to_string()));
        }

        if let Some(tx_type) = self.tx_type {
            conditions.push("type = ?");
            params.push(Box::new(tx_type.as_str()));
        }

        // Dates are stored as ISO text, so plain string comparison orders them
        if let Some(start) = self.start_date {
            conditions.push("date >= ?");
            params.push(Box::new(start.format("%Y-%m-%d").to_string()));
        }

        if let Some(end) = self.end_date {
            match end.checked_add_days(Days::new(1)) {
                Some(next_day) => {
                    conditions.push("date < ?");
                    params.push(Box::new(next_day.format("%Y-%m-%d").to_string()));
                }
                None => {
                    conditions.push("date <= ?");
                    params.push(Box::new(format!("{}T23:59:59.999", end.format("%Y-%m-%d"))));
                }
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let page_clause = match (self.limit, self.offset) {
            (Some(limit), offset) => {
                params.push(Box::new(limit));
                params.push(Box::new(offset.unwrap_or(0)));
                "LIMIT ? OFFSET ?".to_string()
            }
            (None, Some(offset)) => {
                params.push(Box::new(offset));
                "LIMIT -1 OFFSET ?".to_string()
            }
            (None, None) => String::new(),
        };

        FilterResult {
            where_clause,
            page_clause,
            params,
        }
    }
}
