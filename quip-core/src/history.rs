//! Generation history: the mutable anti-repetition state.
//!
//! Holds a bounded ring of recent outputs, last-used timestamps for frames
//! and words, and a bounded per-user selection history. All mutation goes
//! through [`SharedHistory`], a single mutex-guarded handle, so concurrent
//! requests cannot race on eviction or cooldown updates.

use crate::catalog::Mode;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Maximum number of recent records kept for similarity checks.
pub const RECENT_CAPACITY: usize = 100;

/// Maximum number of entries kept per user.
pub const USER_CAPACITY: usize = 10;

/// One committed generation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub mode: Mode,
    /// Index of the frame used, or `None` for a fallback artifact.
    pub frame_index: Option<usize>,
    /// Words substituted into the frame, in left-to-right order.
    pub chosen_words: Vec<String>,
    pub final_line: String,
    pub created_at: DateTime<Utc>,
    /// Hex SHA-1 of `final_line`.
    pub content_hash: String,
}

/// One entry in a user's recent-selection history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub mode: Mode,
    pub frame_index: usize,
    pub final_line: String,
    pub created_at: DateTime<Utc>,
}

/// Process-wide anti-repetition state. Lives for the process lifetime;
/// created empty at startup.
#[derive(Debug, Default)]
pub struct GenerationHistory {
    recent: VecDeque<GenerationRecord>,
    frame_cooldown: HashMap<(Mode, usize), DateTime<Utc>>,
    word_cooldown: HashMap<String, DateTime<Utc>>,
    user_history: HashMap<String, VecDeque<UserEntry>>,
}

impl GenerationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame is outside its cooldown window at `now`.
    pub fn frame_available(
        &self,
        mode: Mode,
        index: usize,
        window: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        match self.frame_cooldown.get(&(mode, index)) {
            Some(last) => now.signed_duration_since(*last) >= window,
            None => true,
        }
    }

    /// Whether a word is outside its cooldown window at `now`.
    pub fn word_available(&self, word: &str, window: Duration, now: DateTime<Utc>) -> bool {
        match self.word_cooldown.get(word) {
            Some(last) => now.signed_duration_since(*last) >= window,
            None => true,
        }
    }

    /// Whether this user was already served this frame for this mode
    /// within the window.
    pub fn user_used_frame(
        &self,
        user_id: &str,
        mode: Mode,
        index: usize,
        window: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        self.user_history
            .get(user_id)
            .map(|entries| {
                entries.iter().any(|e| {
                    e.mode == mode
                        && e.frame_index == index
                        && now.signed_duration_since(e.created_at) < window
                })
            })
            .unwrap_or(false)
    }

    /// Final lines of recent records, oldest first.
    pub fn recent_lines(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(|r| r.final_line.as_str())
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    pub fn user_history_len(&self, user_id: &str) -> usize {
        self.user_history.get(user_id).map_or(0, |e| e.len())
    }

    /// Commit a record: append to the recent ring (evicting FIFO beyond
    /// capacity) and, for non-fallback records, stamp the frame and word
    /// cooldowns and append to the user's history.
    ///
    /// Fallback records (`frame_index == None`) only touch the ring.
    pub fn record(&mut self, record: GenerationRecord, user_id: Option<&str>) {
        let now = record.created_at;

        if let Some(index) = record.frame_index {
            stamp(&mut self.frame_cooldown, (record.mode, index), now);
            for word in &record.chosen_words {
                stamp(&mut self.word_cooldown, word.clone(), now);
            }
            if let Some(user_id) = user_id {
                let entries = self.user_history.entry(user_id.to_string()).or_default();
                entries.push_back(UserEntry {
                    mode: record.mode,
                    frame_index: index,
                    final_line: record.final_line.clone(),
                    created_at: now,
                });
                while entries.len() > USER_CAPACITY {
                    entries.pop_front();
                }
            }
        }

        self.recent.push_back(record);
        while self.recent.len() > RECENT_CAPACITY {
            self.recent.pop_front();
        }
    }
}

/// Timestamps are monotonically non-decreasing per key.
fn stamp<K: std::hash::Hash + Eq>(
    map: &mut HashMap<K, DateTime<Utc>>,
    key: K,
    now: DateTime<Utc>,
) {
    let slot = map.entry(key).or_insert(now);
    if now > *slot {
        *slot = now;
    }
}

/// Clonable, mutex-guarded handle to the process-wide history. The only
/// way requests read or mutate history.
#[derive(Clone, Default)]
pub struct SharedHistory {
    inner: Arc<Mutex<GenerationHistory>>,
}

impl SharedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, GenerationHistory> {
        self.inner.lock().await
    }
}
