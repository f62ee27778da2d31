// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
//
//   pipeline_use_case   → raw files in, processed artifacts out
//   recommend_use_case  → processed artifacts in, per-user
//                         history and recommendations out
//
// Rules for this layer:
//   - No parsing, joining or matrix code here (that's Layer 4)
//   - No printing here (that's Layer 1)
//   - File access only through the artifact store (Layer 6)

pub mod pipeline_use_case;

pub mod recommend_use_case;
