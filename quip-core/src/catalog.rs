//! Static caption catalog: modes, frame templates, word banks, and policy data.
//!
//! The catalog is immutable for the lifetime of the process. Frame indices
//! are stable, so cooldown bookkeeping in [`crate::history`] can key on them.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Content mode. Selects which frames, word banks, length cap, and
/// quality rule apply to a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Humor,
    Inspiration,
}

impl Mode {
    /// All modes, in declaration order.
    pub fn all() -> [Mode; 2] {
        [Mode::Humor, Mode::Inspiration]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Humor => "humor",
            Mode::Inspiration => "inspiration",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Background asset keys for image composition. Chosen uniformly at
/// random; backgrounds carry no cooldown.
pub const BACKGROUNDS: &[&str] = &[
    "gradient-dawn",
    "paper-grain",
    "midnight-wave",
    "citrus-pop",
    "soft-slate",
    "neon-grid",
];

/// Errors from catalog validation. A bad catalog is a startup-time fatal
/// condition, never a per-request error.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("mode {0} is missing from the catalog")]
    MissingMode(Mode),

    #[error("mode {0} has no frame templates")]
    NoFrames(Mode),

    #[error("word bank {bank} for mode {mode} is empty")]
    EmptyBank { mode: Mode, bank: String },
}

/// Per-mode catalog entry: frames, word banks, length cap, fallback line.
#[derive(Debug, Clone)]
pub struct ModeSpec {
    frames: Vec<String>,
    banks: HashMap<String, Vec<String>>,
    max_words: usize,
    fallback_line: String,
}

impl ModeSpec {
    pub fn new(
        frames: Vec<String>,
        banks: HashMap<String, Vec<String>>,
        max_words: usize,
        fallback_line: impl Into<String>,
    ) -> Self {
        Self {
            frames,
            banks,
            max_words,
            fallback_line: fallback_line.into(),
        }
    }

    /// Frame templates, in stable index order.
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Word bank for a placeholder name, if one exists.
    pub fn bank(&self, name: &str) -> Option<&[String]> {
        self.banks.get(name).map(|b| b.as_slice())
    }

    /// Maximum word count for accepted lines in this mode.
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// The static line returned when the retry budget is exhausted.
    pub fn fallback_line(&self) -> &str {
        &self.fallback_line
    }
}

/// The full immutable catalog: one [`ModeSpec`] per mode plus the safety
/// blocklist shared by all modes.
#[derive(Debug, Clone)]
pub struct Catalog {
    modes: HashMap<Mode, ModeSpec>,
    blocklist: Vec<String>,
}

impl Catalog {
    /// Build and validate a catalog. Every mode must be present with at
    /// least one frame, and no word bank may be empty.
    pub fn new(
        modes: HashMap<Mode, ModeSpec>,
        blocklist: Vec<String>,
    ) -> Result<Self, CatalogError> {
        for mode in Mode::all() {
            let spec = modes.get(&mode).ok_or(CatalogError::MissingMode(mode))?;
            if spec.frames.is_empty() {
                return Err(CatalogError::NoFrames(mode));
            }
            for (name, bank) in &spec.banks {
                if bank.is_empty() {
                    return Err(CatalogError::EmptyBank {
                        mode,
                        bank: name.clone(),
                    });
                }
            }
        }
        Ok(Self { modes, blocklist })
    }

    /// The built-in production catalog.
    pub fn builtin() -> &'static Catalog {
        static BUILTIN: Lazy<Catalog> =
            Lazy::new(|| builtin_catalog().expect("built-in catalog is valid"));
        &BUILTIN
    }

    /// Catalog entry for a mode. The constructor guarantees every mode is
    /// present.
    pub fn mode(&self, mode: Mode) -> &ModeSpec {
        &self.modes[&mode]
    }

    /// Lowercase substrings that make a candidate line a policy violation.
    pub fn blocklist(&self) -> &[String] {
        &self.blocklist
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin_catalog() -> Result<Catalog, CatalogError> {
    let humor = ModeSpec::new(
        strings(&[
            "WHEN YOUR [NOUN] STARTS TO [VERB] AT THE WORST TIME",
            "ME TRYING TO [VERB] MY [NOUN] BEFORE MONDAY",
            "POV: YOUR [NOUN] HAS [ADJ] PLANS AGAIN",
            "NOBODY TOLD MY [NOUN] IT COULD JUST [VERB]",
            "THAT FEELING WHEN THE [NOUN] IS LITERALLY [ADJ]",
        ]),
        HashMap::from([
            (
                "NOUN".to_string(),
                strings(&["WIFI", "COFFEE", "CAT", "INBOX", "CALENDAR", "LAUNDRY"]),
            ),
            (
                "VERB".to_string(),
                strings(&["BUFFER", "PANIC", "NEGOTIATE", "VANISH", "SULK"]),
            ),
            (
                "ADJ".to_string(),
                strings(&["DRAMATIC", "UNHINGED", "MYSTERIOUS", "AMBITIOUS"]),
            ),
        ]),
        12,
        "WHEN IN DOUBT, BLAME THE WIFI",
    );

    let inspiration = ModeSpec::new(
        strings(&[
            "YOU WILL ALWAYS [VERB] HIGHER THAN YOUR [NOUN]",
            "NEVER LET A [ADJ] [NOUN] DEFINE YOUR STORY",
            "EVERY [NOUN] IS A CHANCE TO [VERB] AGAIN",
            "GREAT THINGS NEVER COME FROM A [ADJ] [NOUN]",
            "ALWAYS [VERB] LIKE YOUR [NOUN] DEPENDS ON IT",
        ]),
        HashMap::from([
            (
                "NOUN".to_string(),
                strings(&["DOUBT", "FEAR", "COMFORT ZONE", "YESTERDAY", "LIMIT"]),
            ),
            (
                "VERB".to_string(),
                strings(&["CLIMB", "RISE", "BEGIN", "PUSH", "DREAM"]),
            ),
            (
                "ADJ".to_string(),
                strings(&["SMALL", "QUIET", "BORROWED", "TIRED"]),
            ),
        ]),
        10,
        "KEEP GOING. THE BEST IS STILL AHEAD",
    );

    Catalog::new(
        HashMap::from([(Mode::Humor, humor), (Mode::Inspiration, inspiration)]),
        strings(&[
            "kill", "hate", "die", "stupid", "ugly", "dumb", "worthless",
        ]),
    )
}
