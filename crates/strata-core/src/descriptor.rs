//! Typed select descriptors: named query requests consumed by a read
//! persistence service.
//!
//! A descriptor binds a logical query name, a parameter map, and the Rust
//! type rows decode into. The return type may legitimately differ from the
//! stored entity type (projections, joins, scalar counts), which is why the
//! type parameter is the *row* type and the entity name travels alongside it
//! for routing and instrumentation.
//!
//! Descriptors are pure values: read-only, side-effect-free, structurally
//! comparable (used as logging keys, never as cache keys here).

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::query::QueryOptions;

/// A tagged parameter value bound into a named query, filter, or partial
/// update.
///
/// The enumeration replaces reflection-based value passing: every value a
/// query can bind is one of these shapes, and the store layer knows how to
/// bind each one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParamValue {
    /// Integer parameter (ids, indices, counts).
    Int(i64),
    /// Text parameter.
    Text(String),
    /// Boolean parameter.
    Bool(bool),
    /// Binary blob parameter.
    Bytes(Vec<u8>),
    /// Timestamp parameter.
    Timestamp(DateTime<Utc>),
    /// Id-list parameter, expanded into an IN clause by the store layer.
    IntList(Vec<i64>),
    /// SQL NULL.
    Null,
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        ParamValue::Bytes(v)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(v: DateTime<Utc>) -> Self {
        ParamValue::Timestamp(v)
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(v: Vec<i64>) -> Self {
        ParamValue::IntList(v)
    }
}

/// Parameter map for named queries, keyed by the parameter names the query
/// catalog declares. BTreeMap keeps iteration (and Debug output) stable.
pub type Parameters = BTreeMap<String, ParamValue>;

/// Build a [`Parameters`] map from `(name, value)` pairs.
pub fn parameters<I>(items: I) -> Parameters
where
    I: IntoIterator<Item = (&'static str, ParamValue)>,
{
    items
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Fetch exactly one row by primary key.
///
/// Absence is `Ok(None)` at this layer; callers wanting a domain error wrap
/// it themselves.
pub struct SelectByIdDescriptor<T> {
    /// Logical entity name, for routing and instrumentation.
    pub entity: &'static str,
    /// Primary key of the requested row.
    pub id: i64,
    _row: PhantomData<fn() -> T>,
}

impl<T> SelectByIdDescriptor<T> {
    pub fn new(entity: &'static str, id: i64) -> Self {
        Self {
            entity,
            id,
            _row: PhantomData,
        }
    }
}

/// Fetch at most one row matching a named query.
///
/// More than one matching row is a store-level error left undefined here:
/// callers must pick queries that are unique by construction.
pub struct SelectOneDescriptor<T> {
    /// Logical entity name, for routing and instrumentation.
    pub entity: &'static str,
    /// Name of a catalog-registered query.
    pub query_name: String,
    /// Values for the parameters the query declares.
    pub parameters: Parameters,
    _row: PhantomData<fn() -> T>,
}

impl<T> SelectOneDescriptor<T> {
    pub fn new(entity: &'static str, query_name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            entity,
            query_name: query_name.into(),
            parameters,
            _row: PhantomData,
        }
    }
}

/// Fetch a page of rows matching a named query, shaped by [`QueryOptions`].
///
/// The options field is not optional: a list-shaped query without a
/// pagination window cannot be constructed.
pub struct SelectListDescriptor<T> {
    /// Logical entity name, for routing and instrumentation.
    pub entity: &'static str,
    /// Name of a catalog-registered query.
    pub query_name: String,
    /// Values for the parameters the query declares.
    pub parameters: Parameters,
    /// Pagination, ordering, and filtering for the page.
    pub options: QueryOptions,
    _row: PhantomData<fn() -> T>,
}

impl<T> SelectListDescriptor<T> {
    pub fn new(
        entity: &'static str,
        query_name: impl Into<String>,
        parameters: Parameters,
        options: QueryOptions,
    ) -> Self {
        Self {
            entity,
            query_name: query_name.into(),
            parameters,
            options,
            _row: PhantomData,
        }
    }
}

// Manual impls: the row type parameter is phantom, so equality, cloning and
// Debug must not require anything of it.

impl<T> Clone for SelectByIdDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity,
            id: self.id,
            _row: PhantomData,
        }
    }
}

impl<T> PartialEq for SelectByIdDescriptor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity && self.id == other.id
    }
}

impl<T> Eq for SelectByIdDescriptor<T> {}

impl<T> fmt::Debug for SelectByIdDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectByIdDescriptor")
            .field("entity", &self.entity)
            .field("id", &self.id)
            .finish()
    }
}

impl<T> Clone for SelectOneDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity,
            query_name: self.query_name.clone(),
            parameters: self.parameters.clone(),
            _row: PhantomData,
        }
    }
}

impl<T> PartialEq for SelectOneDescriptor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
            && self.query_name == other.query_name
            && self.parameters == other.parameters
    }
}

impl<T> Eq for SelectOneDescriptor<T> {}

impl<T> fmt::Debug for SelectOneDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectOneDescriptor")
            .field("entity", &self.entity)
            .field("query_name", &self.query_name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl<T> Clone for SelectListDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity,
            query_name: self.query_name.clone(),
            parameters: self.parameters.clone(),
            options: self.options.clone(),
            _row: PhantomData,
        }
    }
}

impl<T> PartialEq for SelectListDescriptor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
            && self.query_name == other.query_name
            && self.parameters == other.parameters
            && self.options == other.options
    }
}

impl<T> Eq for SelectListDescriptor<T> {}

impl<T> fmt::Debug for SelectListDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectListDescriptor")
            .field("entity", &self.entity)
            .field("query_name", &self.query_name)
            .field("parameters", &self.parameters)
            .field("options", &self.options)
            .finish()
    }
}
