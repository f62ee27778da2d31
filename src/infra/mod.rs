// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in any one stage:
//
//   artifact_store.rs  — Reading and writing every pipeline
//                        artifact under one output directory:
//                        CSV tables (csv + serde), the sparse
//                        matrix (Matrix Market via sprs) and
//                        JSON documents (serde_json).
//
//   run_stats.rs       — Per-run counters (rows kept and
//                        dropped at each stage, matrix size)
//                        logged and saved as JSON.
//
// Nothing here knows how a table was produced; it only knows
// how to put it on disk and get it back.

/// Artifact persistence for the processed directory
pub mod artifact_store;

/// Pipeline run counters
pub mod run_stats;
