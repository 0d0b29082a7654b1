//! The generation orchestrator: runs the attempt pipeline in a bounded
//! retry loop and commits accepted results into history.
//!
//! `generate` never fails from the caller's point of view. Every per-attempt
//! failure triggers the next attempt, and an exhausted retry budget yields
//! the mode's static fallback artifact.

use crate::catalog::{Catalog, Mode, BACKGROUNDS};
use crate::hash;
use crate::history::{GenerationRecord, SharedHistory};
use crate::pick::{Picker, RandomPicker};
use crate::pipeline;
use crate::services::{
    self, CompletionRequest, CompletionService, CompositionRequest, CompositionService,
    ServiceError,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Tuning for the orchestrator. Defaults match production policy.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Maximum pipeline attempts before the fallback artifact.
    pub max_attempts: usize,
    /// Window during which a used frame is ineligible.
    pub frame_cooldown: Duration,
    /// Window during which a used word is deprioritized.
    pub word_cooldown: Duration,
    /// Jaccard similarity above which a candidate is rejected.
    pub similarity_threshold: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            frame_cooldown: Duration::minutes(5),
            word_cooldown: Duration::minutes(2),
            similarity_threshold: 0.85,
        }
    }
}

impl GeneratorConfig {
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_frame_cooldown(mut self, window: Duration) -> Self {
        self.frame_cooldown = window;
        self
    }

    pub fn with_word_cooldown(mut self, window: Duration) -> Self {
        self.word_cooldown = window;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

/// The pipeline's output: a caption line plus its rendered image
/// reference. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub id: Uuid,
    pub final_line: String,
    pub background_key: String,
    pub image_reference: String,
    pub mode: Mode,
    /// `None` marks a fallback artifact.
    pub frame_index: Option<usize>,
    pub chosen_words: Vec<String>,
    pub content_hash: String,
}

/// Why one attempt failed. Internal; attempts are retried, never surfaced.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("no eligible frame for {0}")]
    NoEligibleFrame(Mode),

    #[error("completion service failed: {0}")]
    Generation(ServiceError),

    #[error("candidate matched the safety blocklist")]
    Policy,

    #[error("candidate failed the quality gate")]
    QualityRejected,

    #[error("candidate too similar to recent output")]
    TooSimilar,
}

/// Caption generator, generic over its two collaborators.
pub struct Generator<C, I> {
    catalog: &'static Catalog,
    config: GeneratorConfig,
    history: SharedHistory,
    completion: C,
    compositor: I,
    picker: Box<dyn Picker>,
}

impl<C, I> Generator<C, I>
where
    C: CompletionService,
    I: CompositionService,
{
    pub fn new(completion: C, compositor: I) -> Self {
        Self {
            catalog: Catalog::builtin(),
            config: GeneratorConfig::default(),
            history: SharedHistory::new(),
            completion,
            compositor,
            picker: Box::new(RandomPicker),
        }
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: &'static Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_history(mut self, history: SharedHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_picker(mut self, picker: Box<dyn Picker>) -> Self {
        self.picker = picker;
        self
    }

    /// The shared history handle, for introspection and for sharing one
    /// history across generators.
    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    /// Generate one caption artifact. Infallible: retries up to the
    /// configured budget, then returns the mode's static fallback.
    pub async fn generate(&self, mode: Mode, user_id: Option<&str>) -> GeneratedArtifact {
        for attempt in 1..=self.config.max_attempts {
            match self.attempt(mode, user_id).await {
                Ok(artifact) => return artifact,
                Err(err) => debug!(%mode, attempt, %err, "generation attempt failed"),
            }
        }
        warn!(%mode, attempts = self.config.max_attempts, "retry budget exhausted, using fallback");
        self.fallback(mode).await
    }

    async fn attempt(
        &self,
        mode: Mode,
        user_id: Option<&str>,
    ) -> Result<GeneratedArtifact, AttemptError> {
        let spec = self.catalog.mode(mode);
        let now = Utc::now();

        let (frame_index, assembly) = {
            let history = self.history.lock().await;
            let index = pipeline::select_frame(
                spec,
                mode,
                &history,
                user_id,
                self.config.frame_cooldown,
                now,
                self.picker.as_ref(),
            )
            .ok_or(AttemptError::NoEligibleFrame(mode))?;
            let assembly = pipeline::assemble(
                &spec.frames()[index],
                spec,
                &history,
                self.config.word_cooldown,
                now,
                self.picker.as_ref(),
            );
            (index, assembly)
        };

        let response = self
            .completion
            .complete(CompletionRequest::new(mode, assembly.text.clone()))
            .await
            .map_err(AttemptError::Generation)?;
        if response.line.trim().is_empty() {
            return Err(AttemptError::Generation(ServiceError::EmptyPayload));
        }

        let line = pipeline::post_process(&response.line, spec.max_words(), self.catalog.blocklist())
            .map_err(|_| AttemptError::Policy)?;

        if !pipeline::passes_quality(&line, mode) {
            return Err(AttemptError::QualityRejected);
        }

        {
            let history = self.history.lock().await;
            if pipeline::too_similar(
                &line,
                history.recent_lines(),
                self.config.similarity_threshold,
            ) {
                return Err(AttemptError::TooSimilar);
            }
        }

        let background_key = self.pick_background();
        let image_reference = self.compose(&line, background_key).await;
        let content_hash = hash::content_hash(&line);

        let record = GenerationRecord {
            mode,
            frame_index: Some(frame_index),
            chosen_words: assembly.chosen_words.clone(),
            final_line: line.clone(),
            created_at: Utc::now(),
            content_hash: content_hash.clone(),
        };
        self.history.lock().await.record(record, user_id);

        Ok(GeneratedArtifact {
            id: Uuid::new_v4(),
            final_line: line,
            background_key: background_key.to_string(),
            image_reference,
            mode,
            frame_index: Some(frame_index),
            chosen_words: assembly.chosen_words,
            content_hash,
        })
    }

    /// Call the composition service; on any failure fall back to the
    /// deterministic client-side reference.
    async fn compose(&self, line: &str, background_key: &str) -> String {
        let request = CompositionRequest {
            line: line.to_string(),
            background_key: background_key.to_string(),
        };
        match self.compositor.compose(request).await {
            Ok(response) if !response.image_url.trim().is_empty() => response.image_url,
            Ok(_) => {
                warn!(background_key, "composition returned empty url, using fallback reference");
                services::fallback_image_reference(line, background_key)
            }
            Err(err) => {
                warn!(background_key, %err, "composition failed, using fallback reference");
                services::fallback_image_reference(line, background_key)
            }
        }
    }

    /// The static per-mode fallback artifact. Appends to the recent ring
    /// but never touches cooldowns or user history.
    async fn fallback(&self, mode: Mode) -> GeneratedArtifact {
        let spec = self.catalog.mode(mode);
        let line = spec.fallback_line().to_string();
        let background_key = self.pick_background();
        let image_reference = services::fallback_image_reference(&line, background_key);
        let content_hash = hash::content_hash(&line);

        let record = GenerationRecord {
            mode,
            frame_index: None,
            chosen_words: Vec::new(),
            final_line: line.clone(),
            created_at: Utc::now(),
            content_hash: content_hash.clone(),
        };
        self.history.lock().await.record(record, None);

        GeneratedArtifact {
            id: Uuid::new_v4(),
            final_line: line,
            background_key: background_key.to_string(),
            image_reference,
            mode,
            frame_index: None,
            chosen_words: Vec::new(),
            content_hash,
        }
    }

    fn pick_background(&self) -> &'static str {
        BACKGROUNDS[self.picker.pick(BACKGROUNDS.len())]
    }
}
