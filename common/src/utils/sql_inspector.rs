//! SQL statement inspection.
//!
//! Keyword-level heuristics used to canonicalize query signatures and to
//! phrase optimization hints. These never parse SQL properly and never
//! reject a statement.

/// Longest signature kept in a metric.
pub const MAX_SIGNATURE_LEN: usize = 500;

/// Keyword-level SQL inspection.
pub struct SqlInspector;

impl SqlInspector {
    /// Collapses whitespace and truncates to [`MAX_SIGNATURE_LEN`] characters.
    pub fn signature(sql: &str) -> String {
        let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() <= MAX_SIGNATURE_LEN {
            collapsed
        } else {
            collapsed.chars().take(MAX_SIGNATURE_LEN).collect()
        }
    }

    /// Checks if the SQL is a SELECT query.
    pub fn is_select(sql: &str) -> bool {
        sql.trim().to_uppercase().starts_with("SELECT")
    }

    /// True for a SELECT without any WHERE clause.
    pub fn lacks_where(sql: &str) -> bool {
        Self::is_select(sql) && !Self::contains_keyword(sql, "WHERE")
    }

    /// True when the statement selects every column.
    pub fn selects_star(sql: &str) -> bool {
        sql.to_uppercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .windows(2)
            .any(|w| w[0] == "SELECT" && w[1] == "*")
    }

    /// True when rows are ordered but not limited.
    pub fn orders_without_limit(sql: &str) -> bool {
        let upper = Self::signature(&sql.to_uppercase());
        upper.contains("ORDER BY") && !Self::contains_keyword(sql, "LIMIT")
    }

    fn contains_keyword(sql: &str, keyword: &str) -> bool {
        sql.to_uppercase()
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .any(|token| token == keyword)
    }
}
