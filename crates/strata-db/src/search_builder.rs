//! Search Query Builder
//!
//! Translates a [`QueryOptions`] into SQL clause fragments for the generic
//! search/count machinery: filter predicates to parameterized WHERE clauses,
//! the cross-field search token to an escaped LIKE disjunction, sort keys to
//! a stable ORDER BY, and the pagination window to LIMIT/OFFSET.
//!
//! Count and search build from the same WHERE output, which is what makes
//! `count == search().len()` hold whenever the page covers all matches.
//! Filter and order fields are validated against the entity's column
//! allowlist; the builder never interpolates caller strings into SQL.

use strata_core::{
    Error, FilterOperator, FilterOption, OrderDirection, ParamValue, QueryOptions, Result,
};

use crate::escape_like;

/// Result of building the clause set for one search/count call.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// WHERE clause with leading ` WHERE `, or empty when unfiltered.
    pub where_clause: String,
    /// ORDER BY clause with leading ` ORDER BY `; always present for
    /// searches (stable `id` tie-break), empty only when built for a count.
    pub order_clause: String,
    /// ` LIMIT n OFFSET m` window; `LIMIT -1` renders an unbounded page.
    pub limit_clause: String,
    /// Bind values in clause order.
    pub params: Vec<ParamValue>,
}

/// Builds SQL clause fragments from query options for one entity.
pub struct SearchQueryBuilder<'a> {
    options: &'a QueryOptions,
    columns: &'static [&'static str],
    default_search_fields: &'static [&'static str],
    /// Pre-resolved clauses (suffix fragment, extra-parameter equality),
    /// each with its own bind values.
    extra_clauses: Vec<(String, Vec<ParamValue>)>,
}

impl<'a> SearchQueryBuilder<'a> {
    pub fn new(
        options: &'a QueryOptions,
        columns: &'static [&'static str],
        default_search_fields: &'static [&'static str],
    ) -> Self {
        Self {
            options,
            columns,
            default_search_fields,
            extra_clauses: Vec::new(),
        }
    }

    /// Prepend an already-parameterized clause (a catalog fragment or an
    /// extra-parameter equality predicate).
    pub fn with_clause(mut self, clause: impl Into<String>, params: Vec<ParamValue>) -> Self {
        self.extra_clauses.push((clause.into(), params));
        self
    }

    /// Build the clause set. `with_window` controls whether ORDER BY and
    /// LIMIT/OFFSET are rendered (searches) or suppressed (counts).
    pub fn build(self, with_window: bool) -> Result<SearchQuery> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<ParamValue> = Vec::new();

        for (clause, clause_params) in &self.extra_clauses {
            clauses.push(clause.clone());
            params.extend(clause_params.iter().cloned());
        }

        for filter in &self.options.filters {
            let (clause, filter_params) = self.build_filter(filter)?;
            clauses.push(clause);
            params.extend(filter_params);
        }

        if let Some(term) = &self.options.multiple_filter {
            let fields: Vec<&str> = if term.fields.is_empty() {
                self.default_search_fields.to_vec()
            } else {
                term.fields.iter().map(String::as_str).collect()
            };
            if fields.is_empty() {
                return Err(Error::InvalidInput(
                    "cross-field search token given but no search fields are defined".to_string(),
                ));
            }
            let mut parts = Vec::with_capacity(fields.len());
            for field in fields {
                self.check_column(field)?;
                parts.push(format!("{field} LIKE ? ESCAPE '\\'"));
                params.push(ParamValue::Text(format!("%{}%", escape_like(&term.value))));
            }
            clauses.push(format!("({})", parts.join(" OR ")));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let (order_clause, limit_clause) = if with_window {
            (self.build_order()?, self.build_window())
        } else {
            (String::new(), String::new())
        };

        Ok(SearchQuery {
            where_clause,
            order_clause,
            limit_clause,
            params,
        })
    }

    fn build_filter(&self, filter: &FilterOption) -> Result<(String, Vec<ParamValue>)> {
        self.check_column(&filter.field)?;
        let field = &filter.field;
        Ok(match (&filter.operator, &filter.value) {
            // NULL comparisons need IS, not =.
            (FilterOperator::Equals, ParamValue::Null) => (format!("{field} IS NULL"), vec![]),
            (FilterOperator::NotEquals, ParamValue::Null) => {
                (format!("{field} IS NOT NULL"), vec![])
            }
            (FilterOperator::Equals, v) => (format!("{field} = ?"), vec![v.clone()]),
            (FilterOperator::NotEquals, v) => (format!("{field} <> ?"), vec![v.clone()]),
            (FilterOperator::Greater, v) => (format!("{field} > ?"), vec![v.clone()]),
            (FilterOperator::GreaterOrEquals, v) => (format!("{field} >= ?"), vec![v.clone()]),
            (FilterOperator::Less, v) => (format!("{field} < ?"), vec![v.clone()]),
            (FilterOperator::LessOrEquals, v) => (format!("{field} <= ?"), vec![v.clone()]),
            (FilterOperator::Like, ParamValue::Text(s)) => (
                format!("{field} LIKE ? ESCAPE '\\'"),
                vec![ParamValue::Text(format!("%{}%", escape_like(s)))],
            ),
            (FilterOperator::Like, _) => {
                return Err(Error::InvalidInput(format!(
                    "LIKE filter on {field:?} requires a text value"
                )))
            }
            (FilterOperator::In, ParamValue::IntList(ids)) if ids.is_empty() => {
                // Matches no row, same as an empty IN list would.
                ("0 = 1".to_string(), vec![])
            }
            (FilterOperator::In, ParamValue::IntList(ids)) => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                (
                    format!("{field} IN ({placeholders})"),
                    ids.iter().map(|id| ParamValue::Int(*id)).collect(),
                )
            }
            (FilterOperator::In, _) => {
                return Err(Error::InvalidInput(format!(
                    "IN filter on {field:?} requires an id-list value"
                )))
            }
        })
    }

    fn build_order(&self) -> Result<String> {
        let mut keys = Vec::with_capacity(self.options.order_by.len() + 1);
        let mut saw_id = false;
        for order in &self.options.order_by {
            self.check_column(&order.field)?;
            let direction = match order.direction {
                OrderDirection::Asc => "ASC",
                OrderDirection::Desc => "DESC",
            };
            if order.field == "id" {
                saw_id = true;
            }
            keys.push(format!("{} {direction}", order.field));
        }
        // Stable final tie-break so pagination windows never overlap.
        if !saw_id {
            keys.push("id ASC".to_string());
        }
        Ok(format!(" ORDER BY {}", keys.join(", ")))
    }

    fn build_window(&self) -> String {
        let limit = match self.options.number_of_results {
            Some(n) => i64::from(n),
            // SQLite treats a negative LIMIT as unbounded.
            None => -1,
        };
        format!(" LIMIT {limit} OFFSET {}", self.options.from_index)
    }

    fn check_column(&self, field: &str) -> Result<()> {
        if self.columns.contains(&field) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "unknown filter/order field {field:?}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["id", "name", "description", "process_instance_id", "list_index"];
    const SEARCH_FIELDS: &[&str] = &["name", "description"];

    #[test]
    fn test_unfiltered_build_has_no_where() {
        let options = QueryOptions::ALL_RESULTS;
        let built = SearchQueryBuilder::new(&options, COLUMNS, SEARCH_FIELDS)
            .build(true)
            .unwrap();
        assert_eq!(built.where_clause, "");
        assert_eq!(built.order_clause, " ORDER BY id ASC");
        assert_eq!(built.limit_clause, " LIMIT -1 OFFSET 0");
        assert!(built.params.is_empty());
    }

    #[test]
    fn test_filters_are_and_combined_in_order() {
        let options = QueryOptions::page(10, 5)
            .filter(FilterOption::equals("process_instance_id", 42i64))
            .filter(FilterOption::greater("list_index", -1i64));
        let built = SearchQueryBuilder::new(&options, COLUMNS, SEARCH_FIELDS)
            .build(true)
            .unwrap();
        assert_eq!(
            built.where_clause,
            " WHERE process_instance_id = ? AND list_index > ?"
        );
        assert_eq!(built.limit_clause, " LIMIT 5 OFFSET 10");
        assert_eq!(built.params.len(), 2);
    }

    #[test]
    fn test_multiple_filter_builds_escaped_like_disjunction() {
        let options = QueryOptions::DEFAULT_PAGE.multiple_filter(Vec::<String>::new(), "100%_done");
        let built = SearchQueryBuilder::new(&options, COLUMNS, SEARCH_FIELDS)
            .build(true)
            .unwrap();
        assert_eq!(
            built.where_clause,
            " WHERE (name LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')"
        );
        assert_eq!(
            built.params[0],
            ParamValue::Text("%100\\%\\_done%".to_string())
        );
    }

    #[test]
    fn test_order_by_is_stable_with_id_tiebreak() {
        let options = QueryOptions::ALL_RESULTS
            .order_by("document_mapping", "name", OrderDirection::Desc)
            .order_by("document_mapping", "list_index", OrderDirection::Asc);
        let built = SearchQueryBuilder::new(&options, COLUMNS, SEARCH_FIELDS)
            .build(true)
            .unwrap();
        assert_eq!(
            built.order_clause,
            " ORDER BY name DESC, list_index ASC, id ASC"
        );
    }

    #[test]
    fn test_count_build_suppresses_window() {
        let options = QueryOptions::page(0, 10);
        let built = SearchQueryBuilder::new(&options, COLUMNS, SEARCH_FIELDS)
            .build(false)
            .unwrap();
        assert_eq!(built.order_clause, "");
        assert_eq!(built.limit_clause, "");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let options =
            QueryOptions::DEFAULT_PAGE.filter(FilterOption::equals("no_such_column", 1i64));
        let err = SearchQueryBuilder::new(&options, COLUMNS, SEARCH_FIELDS)
            .build(true)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_in_filter_expands_placeholders() {
        let options = QueryOptions::ALL_RESULTS.filter(FilterOption::is_in("id", vec![1, 2, 3]));
        let built = SearchQueryBuilder::new(&options, COLUMNS, SEARCH_FIELDS)
            .build(false)
            .unwrap();
        assert_eq!(built.where_clause, " WHERE id IN (?, ?, ?)");
        assert_eq!(built.params.len(), 3);

        let empty = QueryOptions::ALL_RESULTS.filter(FilterOption::is_in("id", Vec::new()));
        let built = SearchQueryBuilder::new(&empty, COLUMNS, SEARCH_FIELDS)
            .build(false)
            .unwrap();
        assert_eq!(built.where_clause, " WHERE 0 = 1");
    }
}
