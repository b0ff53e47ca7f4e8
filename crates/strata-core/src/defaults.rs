//! Centralized default constants for the strata persistence core.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates and embedding services should reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list/search operations.
pub const PAGE_SIZE: u32 = 20;

/// Default page offset.
pub const PAGE_OFFSET: u32 = 0;

/// Internal page size used by the document drain loop
/// (`delete_documents_from_process_instance`).
pub const DELETE_BATCH_SIZE: u32 = 100;

// =============================================================================
// EVENTS
// =============================================================================

/// Broadcast buffer capacity for the recorder event bus.
///
/// 256 for production; tests typically use 32.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// VERSIONING
// =============================================================================

/// Version string assigned to a freshly attached document mapping.
pub const INITIAL_VERSION: &str = "1";
