//! Bind-parameter helpers shared by the read services, recorder, and
//! archive service.
//!
//! Id-list values never reach these helpers: templates and builders expand
//! them into placeholder groups first, so a list here is a programming
//! error surfaced as invalid input rather than a silent misbind.

use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{Sqlite, SqliteArguments};

use strata_core::{Error, ParamValue, Result};

pub(crate) fn bind_query<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: ParamValue,
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
    Ok(match value {
        ParamValue::Int(v) => query.bind(v),
        ParamValue::Text(v) => query.bind(v),
        ParamValue::Bool(v) => query.bind(v),
        ParamValue::Bytes(v) => query.bind(v),
        ParamValue::Timestamp(v) => query.bind(v),
        ParamValue::Null => query.bind(Option::<i64>::None),
        ParamValue::IntList(_) => {
            return Err(Error::InvalidInput(
                "id-list parameter was not expanded before binding".to_string(),
            ))
        }
    })
}

pub(crate) fn bind_query_as<'q, O>(
    query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    value: ParamValue,
) -> Result<QueryAs<'q, Sqlite, O, SqliteArguments<'q>>> {
    Ok(match value {
        ParamValue::Int(v) => query.bind(v),
        ParamValue::Text(v) => query.bind(v),
        ParamValue::Bool(v) => query.bind(v),
        ParamValue::Bytes(v) => query.bind(v),
        ParamValue::Timestamp(v) => query.bind(v),
        ParamValue::Null => query.bind(Option::<i64>::None),
        ParamValue::IntList(_) => {
            return Err(Error::InvalidInput(
                "id-list parameter was not expanded before binding".to_string(),
            ))
        }
    })
}
