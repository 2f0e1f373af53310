//! WHERE-clause assembly for listing, count and aggregate queries

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use crate::models::to_db_timestamp;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Int(i)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Eq { column: &'static str, value: SqlValue },
    NotEq { column: &'static str, value: SqlValue },
    Search { columns: Vec<&'static str>, term: String },
    Since { column: &'static str, from: String },
    Before { column: &'static str, until: String },
    Between { column: &'static str, from: String, to: String },
}

/// AND-combined filter over one aliased table.
///
/// Missing optional filters add no clause, so they never narrow the result.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditions {
    alias: &'static str,
    clauses: Vec<Clause>,
}

impl Conditions {
    pub fn new(alias: &'static str) -> Self {
        Self {
            alias,
            clauses: Vec::new(),
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.clauses.push(Clause::Eq {
            column,
            value: value.into(),
        });
        self
    }

    pub fn eq_opt<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(column, value),
            None => self,
        }
    }

    pub fn not_eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.clauses.push(Clause::NotEq {
            column,
            value: value.into(),
        });
        self
    }

    /// Case-insensitive `%term%` match OR-ed across `columns`
    pub fn search(mut self, columns: &[&'static str], term: Option<&str>) -> Self {
        if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
            self.clauses.push(Clause::Search {
                columns: columns.to_vec(),
                term: term.to_string(),
            });
        }
        self
    }

    pub fn since(mut self, column: &'static str, from: DateTime<Utc>) -> Self {
        self.clauses.push(Clause::Since {
            column,
            from: to_db_timestamp(from),
        });
        self
    }

    pub fn before(mut self, column: &'static str, until: DateTime<Utc>) -> Self {
        self.clauses.push(Clause::Before {
            column,
            until: to_db_timestamp(until),
        });
        self
    }

    /// Closed range `[from, to]`
    pub fn between(mut self, column: &'static str, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.clauses.push(Clause::Between {
            column,
            from: to_db_timestamp(from),
            to: to_db_timestamp(to),
        });
        self
    }

    /// Copy with every equality filter on `column` removed
    pub fn without(&self, column: &str) -> Self {
        Self {
            alias: self.alias,
            clauses: self
                .clauses
                .iter()
                .filter(|clause| !matches!(clause, Clause::Eq { column: c, .. } if *c == column))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (index, clause) in self.clauses.iter().enumerate() {
            qb.push(if index == 0 { " WHERE " } else { " AND " });
            match clause {
                Clause::Eq { column, value } => {
                    qb.push(format!("{}.{} = ", self.alias, column));
                    push_value(qb, value);
                }
                Clause::NotEq { column, value } => {
                    qb.push(format!("{}.{} != ", self.alias, column));
                    push_value(qb, value);
                }
                Clause::Search { columns, term } => {
                    qb.push("(");
                    for (i, column) in columns.iter().enumerate() {
                        if i > 0 {
                            qb.push(" OR ");
                        }
                        qb.push(format!("{}.{} LIKE ", self.alias, column));
                        qb.push_bind(format!("%{}%", term));
                    }
                    qb.push(")");
                }
                Clause::Since { column, from } => {
                    qb.push(format!("{}.{} >= ", self.alias, column));
                    qb.push_bind(from.clone());
                }
                Clause::Before { column, until } => {
                    qb.push(format!("{}.{} < ", self.alias, column));
                    qb.push_bind(until.clone());
                }
                Clause::Between { column, from, to } => {
                    qb.push(format!("{}.{} >= ", self.alias, column));
                    qb.push_bind(from.clone());
                    qb.push(format!(" AND {}.{} <= ", self.alias, column));
                    qb.push_bind(to.clone());
                }
            }
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &SqlValue) {
    match value {
        SqlValue::Text(text) => qb.push_bind(text.clone()),
        SqlValue::Int(int) => qb.push_bind(*int),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(conditions: &Conditions) -> String {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM logs l");
        conditions.push_where(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn test_empty_conditions_add_nothing() {
        let conditions = Conditions::new("l")
            .eq_opt::<String>("app_id", None)
            .search(&["message"], None)
            .search(&["message"], Some("   "));
        assert!(conditions.is_empty());
        assert_eq!(render(&conditions), "SELECT COUNT(*) FROM logs l");
    }

    #[test]
    fn test_search_is_or_combined_inside_and() {
        let conditions = Conditions::new("l")
            .eq("app_id", "A1B2C3")
            .search(&["message", "endpoint", "app_name"], Some("timeout"));
        assert_eq!(
            render(&conditions),
            "SELECT COUNT(*) FROM logs l WHERE l.app_id = ? AND \
             (l.message LIKE ? OR l.endpoint LIKE ? OR l.app_name LIKE ?)"
        );
    }

    #[test]
    fn test_without_strips_only_the_named_filter() {
        let conditions = Conditions::new("l")
            .eq("app_id", "A1B2C3")
            .eq("log_type", "error")
            .search(&["message"], Some("db"));
        let stripped = conditions.without("log_type");

        assert_eq!(
            render(&stripped),
            "SELECT COUNT(*) FROM logs l WHERE l.app_id = ? AND (l.message LIKE ?)"
        );
        assert_eq!(stripped, conditions.without("log_type").without("log_type"));
    }

    #[test]
    fn test_between_is_closed_range() {
        let now = Utc::now();
        let conditions = Conditions::new("l").between("created_at", now, now);
        assert_eq!(
            render(&conditions),
            "SELECT COUNT(*) FROM logs l WHERE l.created_at >= ? AND l.created_at <= ?"
        );
    }
}
