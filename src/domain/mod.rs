// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define what the
// pipeline talks about: rating events, catalog rows, dense
// id mappings and the two pluggable model interfaces.
//
// Rules for this layer:
//   - NO sparse-matrix or CSV types here
//   - NO file I/O
//   - Only plain data, the id mapping and trait definitions
//
// Everything downstream (data, ml, infra, application)
// speaks in these types.

/// Raw and derived row types (events, catalog, merged rows, maps)
pub mod rating;

/// Two-way raw id <-> dense index mapping
pub mod id_index;

/// Typed pipeline errors
pub mod error;

/// Core abstractions (traits) that other layers implement
pub mod traits;
