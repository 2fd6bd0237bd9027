//! Chart insight extraction and validation for graphlens.
//!
//! Sends a chart image to a vision model for a structured insight draft,
//! looks up previously extracted values for the same metric, asks a text
//! model to audit the draft against that history, and records the new data
//! points in the append-only historical store.

pub mod analyzer;
pub mod error;
pub mod gemini;
pub mod image;
pub mod model;
pub mod parse;
pub mod prompts;
pub mod store;

pub use analyzer::{AnalysisOutcome, Analyzer, AnalyzerConfig, ValidationStatus};
pub use error::AnalyzeError;
pub use gemini::GeminiClient;
pub use image::{fingerprint, ChartImage, ImageFormat};
pub use model::{TextModel, VisionModel};
pub use parse::parse_insight;
pub use store::{HistoryStore, PgHistoryStore};
