//! The per-attempt generation pipeline: frame selection, slot assembly,
//! post-processing, the quality gate, and the similarity filter.
//!
//! Every function here is a pure read over the catalog and history; the
//! orchestrator in [`crate::generator`] owns all state mutation.

use crate::catalog::{Mode, ModeSpec};
use crate::history::GenerationHistory;
use crate::pick::Picker;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use thiserror::Error;

/// A candidate line matched the safety blocklist.
#[derive(Debug, Error)]
#[error("candidate line matched the safety blocklist")]
pub struct PolicyViolation;

/// Frame indices eligible at `now`: outside the frame cooldown window and,
/// when a user is given, not already served to that user within the window.
pub fn eligible_frames(
    spec: &ModeSpec,
    mode: Mode,
    history: &GenerationHistory,
    user_id: Option<&str>,
    window: Duration,
    now: DateTime<Utc>,
) -> Vec<usize> {
    (0..spec.frames().len())
        .filter(|&index| {
            if !history.frame_available(mode, index, window, now) {
                return false;
            }
            match user_id {
                Some(user) => !history.user_used_frame(user, mode, index, window, now),
                None => true,
            }
        })
        .collect()
}

/// Pick one eligible frame uniformly at random, or `None` when every frame
/// is cooling down.
pub fn select_frame(
    spec: &ModeSpec,
    mode: Mode,
    history: &GenerationHistory,
    user_id: Option<&str>,
    window: Duration,
    now: DateTime<Utc>,
    picker: &dyn Picker,
) -> Option<usize> {
    let eligible = eligible_frames(spec, mode, history, user_id, window, now);
    if eligible.is_empty() {
        return None;
    }
    Some(eligible[picker.pick(eligible.len())])
}

/// A fully substituted frame plus the words chosen for it.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub text: String,
    pub chosen_words: Vec<String>,
}

/// Substitute every bracketed placeholder in `frame` with a word from its
/// bank, left to right.
///
/// Words inside their cooldown window are skipped while any alternative
/// remains; an exhausted bank falls back to the full bank, so assembly
/// never blocks. A placeholder with no matching bank is left verbatim.
pub fn assemble(
    frame: &str,
    spec: &ModeSpec,
    history: &GenerationHistory,
    window: Duration,
    now: DateTime<Utc>,
    picker: &dyn Picker,
) -> Assembly {
    let mut text = String::with_capacity(frame.len());
    let mut chosen_words = Vec::new();
    let mut rest = frame;

    while let Some(start) = rest.find('[') {
        text.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(']') {
            Some(end) => {
                let name = &after[..end];
                match spec.bank(name) {
                    Some(bank) => {
                        let available: Vec<&String> = bank
                            .iter()
                            .filter(|w| history.word_available(w, window, now))
                            .collect();
                        // Cooldown is advisory: fall back to the whole bank
                        // rather than blocking.
                        let word = if available.is_empty() {
                            &bank[picker.pick(bank.len())]
                        } else {
                            available[picker.pick(available.len())]
                        };
                        text.push_str(word);
                        chosen_words.push(word.clone());
                    }
                    None => {
                        text.push('[');
                        text.push_str(name);
                        text.push(']');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated bracket; copy through.
                text.push('[');
                rest = after;
            }
        }
    }
    text.push_str(rest);

    Assembly { text, chosen_words }
}

/// Normalize a raw candidate: uppercase, trim, strip characters outside
/// the allowed set, prefix-truncate to the word cap, then check the
/// safety blocklist case-insensitively.
pub fn post_process(
    raw: &str,
    max_words: usize,
    blocklist: &[String],
) -> Result<String, PolicyViolation> {
    let upper = raw.trim().to_uppercase();
    let cleaned: String = upper
        .chars()
        .filter(|c| {
            c.is_alphanumeric()
                || *c == '_'
                || c.is_whitespace()
                || matches!(c, '.' | ',' | '!' | '?' | '-')
        })
        .collect();

    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let capped = words[..words.len().min(max_words)].join(" ");

    let lowered = capped.to_lowercase();
    if blocklist.iter().any(|term| lowered.contains(term.as_str())) {
        return Err(PolicyViolation);
    }
    Ok(capped)
}

/// Absolute-emphasis words required for inspiration lines.
const EMPHASIS_WORDS: &[&str] = &["ALWAYS", "NEVER", "EVERY", "NOTHING", "UNSTOPPABLE", "ZERO"];

/// Signature openings of the humor frames.
const HUMOR_SIGNATURES: &[&str] = &[
    "WHEN YOUR",
    "ME TRYING",
    "POV",
    "THAT FEELING",
    "NOBODY TOLD",
];

/// Playful-exaggeration markers accepted for humor lines.
const HUMOR_EXAGGERATIONS: &[&str] = &["LITERALLY", "100", "EVERY TIME", "ABSOLUTELY", "COMPLETELY"];

/// Coarse lexical acceptance check. False negatives are expected and are
/// absorbed by the orchestrator's retry loop.
pub fn passes_quality(line: &str, mode: Mode) -> bool {
    match mode {
        Mode::Inspiration => EMPHASIS_WORDS.iter().any(|w| line.contains(w)),
        Mode::Humor => {
            HUMOR_SIGNATURES.iter().any(|s| line.contains(s))
                || HUMOR_EXAGGERATIONS.iter().any(|s| line.contains(s))
        }
    }
}

/// Jaccard similarity over the word sets of two lines. Tokens are
/// case-sensitive with duplicates collapsed; two empty sets count as
/// identical.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// Whether `candidate` is too close to any recent line. Rejects strictly
/// above the threshold.
pub fn too_similar<'a>(
    candidate: &str,
    mut recent: impl Iterator<Item = &'a str>,
    threshold: f64,
) -> bool {
    recent.any(|line| jaccard(candidate, line) > threshold)
}
