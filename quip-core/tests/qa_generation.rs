//! QA tests for the full generation pipeline using mock collaborators.
//!
//! These tests verify the end-to-end contract:
//! - accepted lines honor the word cap, blocklist, and similarity bound
//! - history commits update cooldowns and evict FIFO at capacity
//! - exhausted retries produce the static per-mode fallback
//! - cooldowns steer frame and word selection

use chrono::{Duration, Utc};
use quip_core::catalog::{Catalog, Mode};
use quip_core::generator::Generator;
use quip_core::hash::content_hash;
use quip_core::history::{GenerationHistory, GenerationRecord, RECENT_CAPACITY};
use quip_core::pick::SequencePicker;
use quip_core::pipeline;
use quip_core::testing::{MockCompletion, MockCompositor};

fn deterministic_generator(
    completion: MockCompletion,
    compositor: MockCompositor,
) -> Generator<MockCompletion, MockCompositor> {
    Generator::new(completion, compositor).with_picker(Box::new(SequencePicker::zeros()))
}

fn committed_record(mode: Mode, frame: usize, line: &str) -> GenerationRecord {
    GenerationRecord {
        mode,
        frame_index: Some(frame),
        chosen_words: Vec::new(),
        final_line: line.to_string(),
        created_at: Utc::now(),
        content_hash: content_hash(line),
    }
}

// =============================================================================
// ACCEPTED-LINE PROPERTIES
// =============================================================================

#[tokio::test]
async fn test_accepted_line_respects_cap_blocklist_and_hash() {
    let catalog = Catalog::builtin();

    for mode in Mode::all() {
        let generator = deterministic_generator(MockCompletion::echo(), MockCompositor::fixed());
        let artifact = generator.generate(mode, None).await;
        let spec = catalog.mode(mode);

        assert!(artifact.frame_index.is_some(), "echo completion should be accepted");
        assert!(artifact.final_line.split_whitespace().count() <= spec.max_words());

        let lowered = artifact.final_line.to_lowercase();
        assert!(!catalog
            .blocklist()
            .iter()
            .any(|term| lowered.contains(term.as_str())));

        assert_eq!(artifact.content_hash, content_hash(&artifact.final_line));
        assert!(!artifact.image_reference.is_empty());
        assert!(!artifact.background_key.is_empty());
    }
}

#[tokio::test]
async fn test_repeat_candidate_rejected_as_too_similar() {
    // Every scripted candidate is the same quality-passing line. The first
    // call accepts it; the second call sees similarity 1.0 on all five
    // attempts and falls back.
    let line = "ME TRYING TO NEGOTIATE WITH MY COFFEE";
    let generator = deterministic_generator(
        MockCompletion::scripted(vec![line; 6]),
        MockCompositor::fixed(),
    );

    let first = generator.generate(Mode::Humor, None).await;
    assert_eq!(first.final_line, line);

    let second = generator.generate(Mode::Humor, None).await;
    assert_eq!(second.frame_index, None);
    assert_eq!(
        second.final_line,
        Catalog::builtin().mode(Mode::Humor).fallback_line()
    );
}

// =============================================================================
// FALLBACK BEHAVIOR
// =============================================================================

#[tokio::test]
async fn test_unreachable_completion_yields_fallback_without_mutation() {
    let generator = deterministic_generator(MockCompletion::failing(), MockCompositor::fixed());

    let artifact = generator.generate(Mode::Humor, Some("user-1")).await;

    assert_eq!(artifact.frame_index, None);
    assert!(artifact.chosen_words.is_empty());
    assert_eq!(
        artifact.final_line,
        Catalog::builtin().mode(Mode::Humor).fallback_line()
    );
    assert_eq!(artifact.content_hash, content_hash(&artifact.final_line));

    // The fallback appends to the recent ring, but frames, words, and the
    // user history are untouched.
    let history = generator.history().lock().await;
    let now = Utc::now();
    let window = Duration::minutes(5);
    assert_eq!(history.recent_len(), 1);
    assert_eq!(history.user_history_len("user-1"), 0);
    for index in 0..Catalog::builtin().mode(Mode::Humor).frames().len() {
        assert!(history.frame_available(Mode::Humor, index, window, now));
    }
}

#[tokio::test]
async fn test_exhausted_frame_bank_yields_inspiration_fallback() {
    let generator = deterministic_generator(MockCompletion::echo(), MockCompositor::fixed());

    // Cool down every inspiration frame.
    {
        let mut history = generator.history().lock().await;
        let count = Catalog::builtin().mode(Mode::Inspiration).frames().len();
        for index in 0..count {
            history.record(
                committed_record(Mode::Inspiration, index, &format!("LINE {index}")),
                None,
            );
        }
    }

    let artifact = generator.generate(Mode::Inspiration, None).await;

    assert_eq!(artifact.frame_index, None);
    assert_eq!(
        artifact.final_line,
        Catalog::builtin().mode(Mode::Inspiration).fallback_line()
    );
}

// =============================================================================
// HISTORY AND COOLDOWN STEERING
// =============================================================================

#[tokio::test]
async fn test_ring_eviction_after_150_commits() {
    let generator = deterministic_generator(MockCompletion::echo(), MockCompositor::fixed());

    let mut history = generator.history().lock().await;
    for i in 0..150 {
        history.record(committed_record(Mode::Humor, 0, &format!("LINE {i}")), None);
    }
    assert_eq!(history.recent_len(), RECENT_CAPACITY);
    assert_eq!(history.recent_lines().next(), Some("LINE 50"));
}

#[tokio::test]
async fn test_user_not_offered_recent_frame_again() {
    let spec = Catalog::builtin().mode(Mode::Humor);
    let mut history = GenerationHistory::new();
    let now = Utc::now();
    let window = Duration::minutes(5);

    history.record(committed_record(Mode::Humor, 3, "A HUMOR LINE"), Some("user-1"));

    let eligible =
        pipeline::eligible_frames(spec, Mode::Humor, &history, Some("user-1"), window, now);
    assert!(!eligible.contains(&3));
    assert!(!eligible.is_empty(), "other frames must stay eligible");
}

#[tokio::test]
async fn test_commit_stamps_frame_and_word_cooldowns() {
    let generator = deterministic_generator(MockCompletion::echo(), MockCompositor::fixed());

    let artifact = generator.generate(Mode::Humor, None).await;
    let frame_index = artifact.frame_index.expect("accepted artifact has a frame");

    let history = generator.history().lock().await;
    let now = Utc::now();
    assert!(!history.frame_available(Mode::Humor, frame_index, Duration::minutes(5), now));
    for word in &artifact.chosen_words {
        assert!(!history.word_available(word, Duration::minutes(2), now));
    }
}

#[test]
fn test_cooled_word_excluded_while_alternatives_remain() {
    let spec = Catalog::builtin().mode(Mode::Humor);
    let mut history = GenerationHistory::new();
    let now = Utc::now();
    let window = Duration::minutes(2);

    let mut record = committed_record(Mode::Humor, 0, "A LINE");
    record.chosen_words = vec!["BUFFER".to_string()];
    history.record(record, None);

    // Whatever the picker does, the cooled word cannot be chosen while the
    // rest of the bank is available.
    for value in 0..10 {
        let picker = SequencePicker::new(vec![value]);
        let assembly = pipeline::assemble("[VERB]", spec, &history, window, now, &picker);
        assert_ne!(assembly.text, "BUFFER");
        assert!(spec.bank("VERB").unwrap().contains(&assembly.text));
    }
}

// =============================================================================
// SIMILARITY WINDOW INVARIANT
// =============================================================================

#[tokio::test]
async fn test_recent_window_stays_dissimilar_as_lines_are_accepted() {
    // Scripted, pairwise-dissimilar quality-passing lines; after each
    // accept, every pair in the window must sit at or below the threshold.
    let lines = vec![
        "WHEN YOUR CAT STARTS TO PANIC AT DAWN",
        "ME TRYING TO VANISH BEFORE MONDAY ARRIVES",
        "POV YOUR CALENDAR HAS UNHINGED PLANS TONIGHT",
    ];
    let generator = deterministic_generator(
        MockCompletion::scripted(lines.clone()),
        MockCompositor::fixed(),
    );

    for expected in &lines {
        let artifact = generator.generate(Mode::Humor, None).await;
        assert_eq!(&artifact.final_line, expected);

        let history = generator.history().lock().await;
        let window: Vec<String> = history.recent_lines().map(String::from).collect();
        for (i, a) in window.iter().enumerate() {
            for b in window.iter().skip(i + 1) {
                assert!(pipeline::jaccard(a, b) <= 0.85, "{a:?} vs {b:?}");
            }
        }
    }
}
