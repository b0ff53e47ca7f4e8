//! Named-query catalog: the resolver that maps logical query names to
//! executable SQL templates.
//!
//! Select descriptors carry a `query_name`; the concrete query text behind
//! each name is engine configuration, registered here, not something the
//! descriptor layer defines. Templates declare their bind-parameter names in
//! order; id-list parameters are written as `IN ?` and expanded into a
//! placeholder group at execution time.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use strata_core::{Error, ParamValue, Parameters, Result};

/// One registered query: SQL text plus the parameter names bound, in order,
/// to its `?` placeholders.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    pub sql: String,
    pub parameters: Vec<&'static str>,
}

/// A named WHERE-fragment variant for the generic search/count machinery,
/// keyed by `(entity, suffix)`.
#[derive(Debug, Clone)]
pub struct QueryFragment {
    /// Clause text without a leading `WHERE`/`AND`.
    pub clause: String,
    /// Parameter names bound, in order, to the clause's `?` placeholders.
    pub parameters: Vec<&'static str>,
}

/// Registry of named queries and search-variant fragments.
#[derive(Debug, Default)]
pub struct QueryCatalog {
    queries: HashMap<String, QueryTemplate>,
    fragments: HashMap<(String, String), QueryFragment>,
}

impl QueryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named query.
    pub fn register_query(
        &mut self,
        name: impl Into<String>,
        sql: impl Into<String>,
        parameters: Vec<&'static str>,
    ) {
        self.queries.insert(
            name.into(),
            QueryTemplate {
                sql: sql.into(),
                parameters,
            },
        );
    }

    /// Register a search/count variant fragment for an entity.
    pub fn register_fragment(
        &mut self,
        entity: impl Into<String>,
        suffix: impl Into<String>,
        clause: impl Into<String>,
        parameters: Vec<&'static str>,
    ) {
        self.fragments.insert(
            (entity.into(), suffix.into()),
            QueryFragment {
                clause: clause.into(),
                parameters,
            },
        );
    }

    /// Resolve a named query.
    pub fn query(&self, name: &str) -> Result<&QueryTemplate> {
        self.queries
            .get(name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown query {name:?}")))
    }

    /// Resolve a search/count variant fragment.
    pub fn fragment(&self, entity: &str, suffix: &str) -> Result<&QueryFragment> {
        self.fragments
            .get(&(entity.to_string(), suffix.to_string()))
            .ok_or_else(|| {
                Error::InvalidInput(format!("unknown query suffix {suffix:?} for entity {entity:?}"))
            })
    }

    /// The query catalog the engine ships with: document lifecycle queries
    /// and their search variants.
    pub fn engine_defaults() -> Self {
        let mut catalog = Self::new();

        const MAPPED_DOCUMENT_COLUMNS: &str = "m.id AS mapping_id, m.document_id, \
             m.process_instance_id, m.name, m.description, m.version, m.list_index, \
             m.creation_date, d.author, d.file_name, d.mime_type, d.url, d.has_content";

        const ARCHIVED_MAPPED_DOCUMENT_COLUMNS: &str = "a.source_object_id AS mapping_id, \
             a.document_id, a.process_instance_id, a.name, a.description, a.version, \
             a.list_index, a.creation_date, d.author, d.file_name, d.mime_type, d.url, \
             d.has_content";

        catalog.register_query(
            "getMappedDocumentOfProcessInstanceWithName",
            format!(
                "SELECT {MAPPED_DOCUMENT_COLUMNS} \
                 FROM document_mapping m JOIN document d ON d.id = m.document_id \
                 WHERE m.process_instance_id = ? AND m.name = ? AND m.list_index = -1"
            ),
            vec!["process_instance_id", "name"],
        );

        catalog.register_query(
            "getMappedDocumentOfProcessInstanceWithNameAndIndex",
            format!(
                "SELECT {MAPPED_DOCUMENT_COLUMNS} \
                 FROM document_mapping m JOIN document d ON d.id = m.document_id \
                 WHERE m.process_instance_id = ? AND m.name = ? AND m.list_index = ?"
            ),
            vec!["process_instance_id", "name", "list_index"],
        );

        // The snapshot current at time t is the earliest one frozen after t.
        catalog.register_query(
            "getArchivedMappedDocumentAt",
            format!(
                "SELECT {ARCHIVED_MAPPED_DOCUMENT_COLUMNS} \
                 FROM arch_document_mapping a JOIN document d ON d.id = a.document_id \
                 WHERE a.process_instance_id = ? AND a.name = ? AND a.archive_date > ? \
                 ORDER BY a.archive_date ASC"
            ),
            vec!["process_instance_id", "name", "time"],
        );

        catalog.register_query(
            "getDocumentListCreatedBefore",
            format!(
                "SELECT {MAPPED_DOCUMENT_COLUMNS} \
                 FROM document_mapping m JOIN document d ON d.id = m.document_id \
                 WHERE m.process_instance_id = ? AND m.name = ? AND m.creation_date <= ? \
                 ORDER BY m.list_index ASC, m.id ASC"
            ),
            vec!["process_instance_id", "name", "time"],
        );

        catalog.register_query(
            "getArchivedDocumentListCreatedBefore",
            format!(
                "SELECT {ARCHIVED_MAPPED_DOCUMENT_COLUMNS} \
                 FROM arch_document_mapping a JOIN document d ON d.id = a.document_id \
                 WHERE a.process_instance_id = ? AND a.name = ? AND a.creation_date <= ? \
                 ORDER BY a.list_index ASC, a.archive_date ASC"
            ),
            vec!["process_instance_id", "name", "time"],
        );

        catalog.register_query(
            "getDocumentMappingsOfProcessInstance",
            "SELECT id, tenant_id, document_id, process_instance_id, name, description, \
             version, list_index, creation_date \
             FROM document_mapping WHERE process_instance_id = ?",
            vec!["process_instance_id"],
        );

        catalog.register_query(
            "getArchivedMappingIdsOfProcessInstances",
            "SELECT id, document_id FROM arch_document_mapping \
             WHERE process_instance_id IN ?",
            vec!["process_instance_ids"],
        );

        catalog.register_query(
            "deleteDocumentsByIds",
            "DELETE FROM document WHERE id IN ?",
            vec!["ids"],
        );

        catalog.register_query(
            "deleteArchivedDocumentMappingsByIds",
            "DELETE FROM arch_document_mapping WHERE id IN ?",
            vec!["ids"],
        );

        catalog.register_fragment(
            "document_mapping",
            "forProcessInstance",
            "process_instance_id = ?",
            vec!["process_instance_id"],
        );

        catalog.register_fragment(
            "arch_document_mapping",
            "forProcessInstance",
            "process_instance_id = ?",
            vec!["process_instance_id"],
        );

        catalog
    }
}

/// Process-wide engine catalog, shared by every service instance.
static ENGINE_CATALOG: Lazy<Arc<QueryCatalog>> =
    Lazy::new(|| Arc::new(QueryCatalog::engine_defaults()));

pub fn engine_catalog() -> Arc<QueryCatalog> {
    Arc::clone(&ENGINE_CATALOG)
}

/// Expand a template against a parameter map: resolves each declared
/// parameter name, expands id-list values into `(?, ?, ...)` groups, and
/// returns the final SQL plus the flat bind list.
///
/// An empty id-list expands to `(NULL)`, which matches no row.
pub(crate) fn expand_template(
    template: &QueryTemplate,
    parameters: &Parameters,
) -> Result<(String, Vec<ParamValue>)> {
    let pieces: Vec<&str> = template.sql.split('?').collect();
    if pieces.len() != template.parameters.len() + 1 {
        return Err(Error::InvalidInput(format!(
            "query declares {} parameters but its SQL has {} placeholders",
            template.parameters.len(),
            pieces.len() - 1
        )));
    }

    let mut sql = String::with_capacity(template.sql.len());
    let mut binds = Vec::with_capacity(template.parameters.len());

    for (piece, name) in pieces.iter().zip(template.parameters.iter()) {
        sql.push_str(piece);
        let value = parameters
            .get(*name)
            .ok_or_else(|| Error::InvalidInput(format!("missing query parameter {name:?}")))?;
        match value {
            ParamValue::IntList(ids) if ids.is_empty() => sql.push_str("(NULL)"),
            ParamValue::IntList(ids) => {
                sql.push('(');
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push('?');
                    binds.push(ParamValue::Int(*id));
                }
                sql.push(')');
            }
            other => {
                sql.push('?');
                binds.push(other.clone());
            }
        }
    }
    if let Some(tail) = pieces.last() {
        sql.push_str(tail);
    }

    Ok((sql, binds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::parameters;

    #[test]
    fn test_engine_defaults_resolve() {
        let catalog = QueryCatalog::engine_defaults();
        assert!(catalog.query("getMappedDocumentOfProcessInstanceWithName").is_ok());
        assert!(catalog.fragment("document_mapping", "forProcessInstance").is_ok());
        assert!(catalog.query("nonexistent").is_err());
        assert!(catalog.fragment("document_mapping", "nonexistent").is_err());
    }

    #[test]
    fn test_expand_template_binds_in_declared_order() {
        let template = QueryTemplate {
            sql: "SELECT * FROM t WHERE a = ? AND b = ?".to_string(),
            parameters: vec!["a", "b"],
        };
        let params = parameters([
            ("b", ParamValue::Int(2)),
            ("a", ParamValue::Int(1)),
        ]);
        let (sql, binds) = expand_template(&template, &params).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b = ?");
        assert_eq!(binds, vec![ParamValue::Int(1), ParamValue::Int(2)]);
    }

    #[test]
    fn test_expand_template_expands_id_lists() {
        let template = QueryTemplate {
            sql: "DELETE FROM t WHERE id IN ?".to_string(),
            parameters: vec!["ids"],
        };
        let params = parameters([("ids", ParamValue::IntList(vec![3, 5, 8]))]);
        let (sql, binds) = expand_template(&template, &params).unwrap();
        assert_eq!(sql, "DELETE FROM t WHERE id IN (?, ?, ?)");
        assert_eq!(binds.len(), 3);

        let empty = parameters([("ids", ParamValue::IntList(Vec::new()))]);
        let (sql, binds) = expand_template(&template, &empty).unwrap();
        assert_eq!(sql, "DELETE FROM t WHERE id IN (NULL)");
        assert!(binds.is_empty());
    }

    #[test]
    fn test_expand_template_rejects_missing_parameter() {
        let template = QueryTemplate {
            sql: "SELECT * FROM t WHERE a = ?".to_string(),
            parameters: vec!["a"],
        };
        let err = expand_template(&template, &Parameters::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
