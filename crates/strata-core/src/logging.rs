//! Structured logging schema and field name constants for strata.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (pool startup, migration), operation completions |
//! | DEBUG | Decision points, per-operation summaries, dispatch gates |
//! | TRACE | Per-row iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event. Value: "db".
pub const SUBSYSTEM: &str = "subsystem";

/// Component within the subsystem.
/// Examples: "pool", "recorder", "archive", "read_service", "documents"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "insert", "search", "attach", "drain"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Logical entity name being operated on (e.g. "document_mapping").
pub const ENTITY: &str = "entity";

/// Row id being operated on.
pub const ENTITY_ID: &str = "entity_id";

/// Store the operation is bound to: "journal" or "archive".
pub const STORE: &str = "store";

/// Named query resolved through the catalog.
pub const QUERY_NAME: &str = "query_name";

/// Process instance scoping a document operation.
pub const PROCESS_INSTANCE_ID: &str = "process_instance_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a query or removed by a sweep.
pub const RESULT_COUNT: &str = "result_count";
