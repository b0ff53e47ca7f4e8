//! Query descriptor model: pagination, ordering, and filtering value objects
//! attached to list/search/count operations.
//!
//! Pure value construction, no I/O. Filters are AND-combined; there is no OR
//! composition in this model — callers needing OR issue multiple queries and
//! merge. Ordering ties are broken by the order entries were added (stable
//! sort downstream).

use serde::Serialize;

use crate::defaults;
use crate::descriptor::ParamValue;

/// Sort direction for an order-by entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// One sort key: `(entity, field, direction)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByOption {
    /// Logical entity name the field belongs to.
    pub entity: String,
    /// Column the sort applies to.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderByOption {
    pub fn new(
        entity: impl Into<String>,
        field: impl Into<String>,
        direction: OrderDirection,
    ) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
            direction,
        }
    }
}

/// Comparison operator for a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Greater,
    GreaterOrEquals,
    Less,
    LessOrEquals,
    Like,
    In,
}

/// One filter predicate: `(field, operator, value)`. Predicates on the same
/// options are AND-combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub field: String,
    pub operator: FilterOperator,
    pub value: ParamValue,
}

impl FilterOption {
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<ParamValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self::new(field, FilterOperator::Equals, value)
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self::new(field, FilterOperator::NotEquals, value)
    }

    pub fn greater(field: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self::new(field, FilterOperator::Greater, value)
    }

    pub fn less_or_equals(field: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self::new(field, FilterOperator::LessOrEquals, value)
    }

    pub fn is_in(field: impl Into<String>, ids: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, ParamValue::IntList(ids))
    }
}

/// Cross-field search token: one value matched (LIKE-style, substring)
/// against each named field, OR-combined across fields.
///
/// An empty field list means "the entity's default search fields".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    pub fields: Vec<String>,
    pub value: String,
}

impl SearchTerm {
    pub fn new<I, S>(fields: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }
}

/// Pagination window, ordering, and filtering for a list/search/count
/// operation.
///
/// `number_of_results: None` means "unbounded". Offsets and page sizes are
/// unsigned, so the non-negativity invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Zero-based index of the first row of the page.
    pub from_index: u32,
    /// Page size; `None` is unbounded.
    pub number_of_results: Option<u32>,
    /// Sort keys; insertion order is the tie-break order.
    pub order_by: Vec<OrderByOption>,
    /// AND-combined filter predicates.
    pub filters: Vec<FilterOption>,
    /// Optional cross-field search token.
    pub multiple_filter: Option<SearchTerm>,
}

impl QueryOptions {
    /// Process-wide default page: offset 0, page size 20, no filters.
    pub const DEFAULT_PAGE: QueryOptions = QueryOptions {
        from_index: defaults::PAGE_OFFSET,
        number_of_results: Some(defaults::PAGE_SIZE),
        order_by: Vec::new(),
        filters: Vec::new(),
        multiple_filter: None,
    };

    /// Process-wide "all results" window: offset 0, unbounded.
    pub const ALL_RESULTS: QueryOptions = QueryOptions {
        from_index: defaults::PAGE_OFFSET,
        number_of_results: None,
        order_by: Vec::new(),
        filters: Vec::new(),
        multiple_filter: None,
    };

    /// A bounded page starting at `from_index`.
    pub fn page(from_index: u32, number_of_results: u32) -> Self {
        Self {
            from_index,
            number_of_results: Some(number_of_results),
            ..Self::ALL_RESULTS
        }
    }

    /// Append a sort key.
    pub fn order_by(
        mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        direction: OrderDirection,
    ) -> Self {
        self.order_by
            .push(OrderByOption::new(entity, field, direction));
        self
    }

    /// Append a filter predicate.
    pub fn filter(mut self, filter: FilterOption) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the cross-field search token.
    pub fn multiple_filter<I, S>(mut self, fields: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.multiple_filter = Some(SearchTerm::new(fields, value));
        self
    }

    /// Whether any filter predicate or search token is present.
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty() || self.multiple_filter.is_some()
    }

    /// Whether any sort key is present.
    pub fn has_order_by(&self) -> bool {
        !self.order_by.is_empty()
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::DEFAULT_PAGE
    }
}
