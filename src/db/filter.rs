//! Query filter utilities for building parameterized SQL queries.

use duckdb::types::Value;

/// Date range filter for queries.
#[derive(Debug, Clone)]
pub struct DateFilter<'a> {
    pub column: &'a str,
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
}

impl<'a> DateFilter<'a> {
    /// Create a new date filter on the `date` column.
    pub const fn new(start: Option<&'a str>, end: Option<&'a str>) -> Self {
        Self {
            column: "date",
            start,
            end,
        }
    }

    /// Filter on another (e.g. table-qualified) column.
    pub const fn on_column(mut self, column: &'a str) -> Self {
        self.column = column;
        self
    }

    /// Append date filter clauses to a query string.
    /// Bounds are inclusive calendar dates in `YYYY-MM-DD` form.
    pub fn apply(&self, query: &mut String, params: &mut Vec<String>) {
        if let Some(start) = self.start {
            query.push_str(&format!(" AND {} >= CAST(? AS DATE)", self.column));
            params.push(start.to_string());
        }
        if let Some(end) = self.end {
            query.push_str(&format!(" AND {} <= CAST(? AS DATE)", self.column));
            params.push(end.to_string());
        }
    }

    /// Convert string params to DuckDB Values.
    pub fn to_values(params: &[String]) -> Vec<Value> {
        params.iter().map(|s| Value::Text(s.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_filter_none() {
        let filter = DateFilter::new(None, None);
        let mut query = "SELECT * FROM days WHERE 1=1".to_string();
        let mut params = Vec::new();
        filter.apply(&mut query, &mut params);

        assert_eq!(query, "SELECT * FROM days WHERE 1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_date_filter_start_only() {
        let filter = DateFilter::new(Some("2024-01-01"), None);
        let mut query = "SELECT * FROM days WHERE 1=1".to_string();
        let mut params = Vec::new();
        filter.apply(&mut query, &mut params);

        assert_eq!(
            query,
            "SELECT * FROM days WHERE 1=1 AND date >= CAST(? AS DATE)"
        );
        assert_eq!(params, vec!["2024-01-01"]);
    }

    #[test]
    fn test_date_filter_both_on_qualified_column() {
        let filter = DateFilter::new(Some("2024-01-01"), Some("2024-12-31")).on_column("d.date");
        let mut query = "SELECT * FROM days d WHERE 1=1".to_string();
        let mut params = Vec::new();
        filter.apply(&mut query, &mut params);

        assert_eq!(
            query,
            "SELECT * FROM days d WHERE 1=1 AND d.date >= CAST(? AS DATE) AND d.date <= CAST(? AS DATE)"
        );
        assert_eq!(params, vec!["2024-01-01", "2024-12-31"]);
    }
}
