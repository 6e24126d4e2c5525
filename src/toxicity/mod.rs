// Toxicity scoring: trait-based abstraction for swappable providers.
//
// The ToxicityScorer trait defines the interface. The external scorers (local
// ONNX model, Perspective API) implement it; KeywordScorer is the deterministic
// stand-in the adapter pins itself to when no external scorer can be built.

pub mod adapter;
pub mod download;
pub mod keyword;
pub mod onnx;
pub mod perspective;
pub mod rate_limiter;
pub mod traits;
