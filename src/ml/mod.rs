// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// Trained factorization and gradient-boosted models are built
// outside this crate and reach it only through the Recommender
// and Ranker traits from Layer 3. This layer holds the small
// baseline implementations of those traits:
//
//   popularity.rs    — Recommender that ranks items by how many
//                      train ratings they received, skipping
//                      items the user already rated
//
//   linear_ranker.rs — Ranker that scores a feature row with a
//                      weighted sum; weights load from JSON
//
// They give the recommendation reader something to run with
// when no trained model is supplied, and a reference point a
// trained model should beat.

/// Most-popular-items recommender
pub mod popularity;

/// Weighted-sum ranker over the ranker feature columns
pub mod linear_ranker;
