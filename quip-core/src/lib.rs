//! Anti-repetition caption generation pipeline.
//!
//! Given a content [`Mode`], the pipeline produces one short,
//! policy-compliant line plus a rendered image reference while avoiding
//! recently used phrasing, words, and frame templates:
//!
//! - frame selection under a per-frame (and per-user) cooldown
//! - slot-filling from word banks under an advisory word cooldown
//! - post-processing and blocklist gating of the completed text
//! - a mode-specific lexical quality gate
//! - Jaccard-similarity dedup against the recent window
//! - a bounded retry loop with a static per-mode fallback
//!
//! # Quick start
//!
//! ```ignore
//! use quip_core::{Generator, Mode};
//! use studio::{CompletionClient, CompositionClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let generator = Generator::new(
//!         CompletionClient::from_env().unwrap(),
//!         CompositionClient::from_env().unwrap(),
//!     );
//!     let artifact = generator.generate(Mode::Humor, Some("user-42")).await;
//!     println!("{} -> {}", artifact.final_line, artifact.image_reference);
//! }
//! ```

pub mod catalog;
pub mod generator;
pub mod hash;
pub mod history;
pub mod pick;
pub mod pipeline;
pub mod services;
pub mod testing;

// Primary public API
pub use catalog::{Catalog, CatalogError, Mode};
pub use generator::{GeneratedArtifact, Generator, GeneratorConfig};
pub use history::{GenerationHistory, GenerationRecord, SharedHistory};
pub use pick::{Picker, RandomPicker, SequencePicker};
pub use services::{
    CompletionRequest, CompletionResponse, CompletionService, CompositionRequest,
    CompositionResponse, CompositionService, ServiceError,
};
