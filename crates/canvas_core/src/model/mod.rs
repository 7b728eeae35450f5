//! Object model domain types.
//!
//! # Responsibility
//! - Define the six metadata/data entities plus application containers.
//! - Hold pure domain rules (primary value derivation, merge, config overlay)
//!   that repositories apply inside their transactions.
//!
//! # Invariants
//! - Every entity id carries its type prefix (see [`ids::EntityKind`]).
//! - Open payloads are insertion-ordered [`JsonMap`] values.

pub mod application;
pub mod field;
pub mod ids;
pub mod object;
pub mod object_field;
pub mod record;
pub mod relationship;
pub mod validation;

/// Insertion-ordered JSON object used for every open key/value payload.
///
/// `serde_json` is built with `preserve_order`, so iteration follows the
/// order keys were first inserted.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
