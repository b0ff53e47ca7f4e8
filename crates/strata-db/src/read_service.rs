//! Read persistence service: executes select descriptors and the generic
//! search/count machinery against one physical store.
//!
//! Two instances exist per engine — one bound to the journal, one to the
//! archive ("definitive archive read service") — selected explicitly by
//! constructor injection, never by dynamic routing. Every operation is
//! read-only and side-effect-free: nothing here starts or requires a write
//! transaction.

use std::sync::Arc;
use std::time::Instant;

use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;

use strata_core::{
    Error, ParamValue, Parameters, PersistentEntity, QueryOptions, Result, SearchableEntity,
    SelectByIdDescriptor, SelectListDescriptor, SelectOneDescriptor, StoreBinding,
};

use crate::binding::bind_query_as;
use crate::catalog::{expand_template, QueryCatalog};
use crate::search_builder::SearchQueryBuilder;

/// Executes typed read operations against one physical store.
#[derive(Clone)]
pub struct ReadPersistenceService {
    pool: SqlitePool,
    store: StoreBinding,
    catalog: Arc<QueryCatalog>,
}

impl ReadPersistenceService {
    /// Service over the journal (mutable, current-state) store.
    pub fn journal(pool: SqlitePool, catalog: Arc<QueryCatalog>) -> Self {
        Self {
            pool,
            store: StoreBinding::Journal,
            catalog,
        }
    }

    /// Service over the archive (immutable, historical) store.
    pub fn archive(pool: SqlitePool, catalog: Arc<QueryCatalog>) -> Self {
        Self {
            pool,
            store: StoreBinding::Archive,
            catalog,
        }
    }

    /// Which store this instance is bound to.
    pub fn store(&self) -> StoreBinding {
        self.store
    }

    /// Fetch exactly one row by primary key; absence is `Ok(None)`.
    pub async fn select_by_id<T: SearchableEntity>(
        &self,
        descriptor: SelectByIdDescriptor<T>,
    ) -> Result<Option<T>> {
        self.check_binding::<T>()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            T::COLUMNS.join(", "),
            T::TABLE
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(descriptor.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::read(format!("{} by id", T::ENTITY), e))
    }

    /// Fetch at most one row matching a named query.
    ///
    /// A query matching several rows is a caller error left undefined by
    /// contract; the first row is returned.
    pub async fn select_one<T>(&self, descriptor: SelectOneDescriptor<T>) -> Result<Option<T>>
    where
        T: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let template = self.catalog.query(&descriptor.query_name)?;
        let (sql, binds) = expand_template(template, &descriptor.parameters)?;
        let mut query = sqlx::query_as::<_, T>(&sql);
        for value in binds {
            query = bind_query_as(query, value)?;
        }
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::read(descriptor.query_name.clone(), e))
    }

    /// Fetch a page of rows matching a named query, shaped by the
    /// descriptor's [`QueryOptions`].
    pub async fn select_list<T>(&self, descriptor: SelectListDescriptor<T>) -> Result<Vec<T>>
    where
        T: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let start = Instant::now();
        let template = self.catalog.query(&descriptor.query_name)?;
        let (mut sql, binds) = expand_template(template, &descriptor.parameters)?;

        let options = &descriptor.options;
        if options.has_order_by() {
            let mut keys = Vec::with_capacity(options.order_by.len());
            for order in &options.order_by {
                check_order_field(&order.field)?;
                let direction = match order.direction {
                    strata_core::OrderDirection::Asc => "ASC",
                    strata_core::OrderDirection::Desc => "DESC",
                };
                keys.push(format!("{} {direction}", order.field));
            }
            sql.push_str(&format!(" ORDER BY {}", keys.join(", ")));
        }
        let limit = options.number_of_results.map_or(-1, i64::from);
        sql.push_str(&format!(" LIMIT {limit} OFFSET {}", options.from_index));

        let mut query = sqlx::query_as::<_, T>(&sql);
        for value in binds {
            query = bind_query_as(query, value)?;
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::read(descriptor.query_name.clone(), e))?;

        debug!(
            subsystem = "db",
            component = "read_service",
            op = "select_list",
            store = self.store.as_str(),
            query_name = %descriptor.query_name,
            result_count = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "select list executed"
        );
        Ok(rows)
    }

    /// Count rows matching the generic search predicate.
    pub async fn get_number_of_entities<T: SearchableEntity>(
        &self,
        options: &QueryOptions,
        parameters: &Parameters,
    ) -> Result<i64> {
        self.count_inner::<T>(None, options, parameters).await
    }

    /// Count rows matching a named variant of the generic search predicate.
    pub async fn get_number_of_entities_with_suffix<T: SearchableEntity>(
        &self,
        suffix: &str,
        options: &QueryOptions,
        parameters: &Parameters,
    ) -> Result<i64> {
        self.count_inner::<T>(Some(suffix), options, parameters)
            .await
    }

    /// Search rows with pagination, ordering, and filtering.
    pub async fn search_entity<T: SearchableEntity>(
        &self,
        options: &QueryOptions,
        parameters: &Parameters,
    ) -> Result<Vec<T>> {
        self.search_inner::<T>(None, options, parameters).await
    }

    /// Search a named variant (e.g. `forProcessInstance`) without a bespoke
    /// descriptor type.
    pub async fn search_entity_with_suffix<T: SearchableEntity>(
        &self,
        suffix: &str,
        options: &QueryOptions,
        parameters: &Parameters,
    ) -> Result<Vec<T>> {
        self.search_inner::<T>(Some(suffix), options, parameters)
            .await
    }

    async fn count_inner<T: SearchableEntity>(
        &self,
        suffix: Option<&str>,
        options: &QueryOptions,
        parameters: &Parameters,
    ) -> Result<i64> {
        self.check_binding::<T>()?;
        let built = self.build_search::<T>(suffix, options, parameters, false)?;
        let sql = format!(
            "SELECT COUNT(id) FROM {}{}",
            T::TABLE,
            built.where_clause
        );
        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        for value in built.params {
            query = bind_query_as(query, value)?;
        }
        let (count,) = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::read(format!("{} count", T::ENTITY), e))?;
        Ok(count)
    }

    async fn search_inner<T: SearchableEntity>(
        &self,
        suffix: Option<&str>,
        options: &QueryOptions,
        parameters: &Parameters,
    ) -> Result<Vec<T>> {
        self.check_binding::<T>()?;
        let start = Instant::now();
        let built = self.build_search::<T>(suffix, options, parameters, true)?;
        let sql = format!(
            "SELECT {} FROM {}{}{}{}",
            T::COLUMNS.join(", "),
            T::TABLE,
            built.where_clause,
            built.order_clause,
            built.limit_clause
        );
        let mut query = sqlx::query_as::<_, T>(&sql);
        for value in built.params {
            query = bind_query_as(query, value)?;
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::read(format!("{} search", T::ENTITY), e))?;

        debug!(
            subsystem = "db",
            component = "read_service",
            op = "search",
            store = self.store.as_str(),
            entity = T::ENTITY,
            result_count = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "search executed"
        );
        Ok(rows)
    }

    /// Assemble clause fragments: the optional suffix fragment first, then
    /// any extra parameters not consumed by it as equality predicates, then
    /// the options' own filters.
    fn build_search<T: SearchableEntity>(
        &self,
        suffix: Option<&str>,
        options: &QueryOptions,
        parameters: &Parameters,
        with_window: bool,
    ) -> Result<crate::search_builder::SearchQuery> {
        let mut builder = SearchQueryBuilder::new(options, T::COLUMNS, T::SEARCH_FIELDS);
        let mut consumed: Vec<&str> = Vec::new();

        if let Some(suffix) = suffix {
            let fragment = self.catalog.fragment(T::ENTITY, suffix)?;
            let mut params = Vec::with_capacity(fragment.parameters.len());
            for name in &fragment.parameters {
                let value = parameters.get(*name).ok_or_else(|| {
                    Error::InvalidInput(format!("missing query parameter {name:?}"))
                })?;
                params.push(value.clone());
                consumed.push(*name);
            }
            builder = builder.with_clause(fragment.clause.clone(), params);
        }

        for (name, value) in parameters {
            if consumed.contains(&name.as_str()) {
                continue;
            }
            if !T::COLUMNS.contains(&name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "extra parameter {name:?} is not a column of {}",
                    T::ENTITY
                )));
            }
            match value {
                ParamValue::Null => {
                    builder = builder.with_clause(format!("{name} IS NULL"), vec![]);
                }
                other => {
                    builder = builder.with_clause(format!("{name} = ?"), vec![other.clone()]);
                }
            }
        }

        builder.build(with_window)
    }

    fn check_binding<T: PersistentEntity>(&self) -> Result<()> {
        if T::STORE == self.store {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "entity {} belongs to the {} store, but this service is bound to the {} store",
                T::ENTITY,
                T::STORE.as_str(),
                self.store.as_str()
            )))
        }
    }
}

/// Sort fields on list descriptors may address joined columns (`m.name`),
/// so they are validated lexically instead of against one entity's columns.
fn check_order_field(field: &str) -> Result<()> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "malformed order-by field {field:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_field_validation() {
        assert!(check_order_field("name").is_ok());
        assert!(check_order_field("m.list_index").is_ok());
        assert!(check_order_field("name; DROP TABLE document").is_err());
        assert!(check_order_field("").is_err());
    }
}
