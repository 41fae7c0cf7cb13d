use serde::Serialize;

use crate::text::{allowed_edits, edit_distance, is_fuzzy_match};

/// How far past the cursor the aligner looks for each target word
pub const LOOKAHEAD_WINDOW: usize = 6;

/// Outcome of aligning a transcript against a passage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassageScore {
    /// Percentage of target words that were spoken, 0..=100
    pub score: u8,
    /// Target positions that found a spoken counterpart, ascending
    pub matched_indices: Vec<usize>,
}

impl PassageScore {
    fn silent() -> Self {
        Self {
            score: 0,
            matched_indices: Vec::new(),
        }
    }

    pub fn matched(&self) -> usize {
        self.matched_indices.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WordHighlight {
    Matched,
    Missed,
    /// Nothing has been heard yet
    Pending,
}

fn no_speech(spoken: &[String]) -> bool {
    spoken.is_empty() || (spoken.len() == 1 && spoken[0].is_empty())
}

/// Greedy windowed alignment of `spoken` against `target`.
///
/// Each target word looks at most `LOOKAHEAD_WINDOW` words past the cursor,
/// preferring the leftmost exact match and then the leftmost fuzzy match. A
/// match moves the cursor past the consumed spoken word; a miss leaves it in
/// place.
pub fn score_passage(target: &[String], spoken: &[String]) -> PassageScore {
    if no_speech(spoken) || target.is_empty() {
        return PassageScore::silent();
    }

    let mut cursor = 0;
    let mut matched_indices = Vec::new();

    for (idx, word) in target.iter().enumerate() {
        let window_end = (cursor + LOOKAHEAD_WINDOW).min(spoken.len());
        let window = &spoken[cursor..window_end];

        let exact = window.iter().position(|candidate| candidate == word);
        let hit = exact.or_else(|| {
            let budget = allowed_edits(word);
            window
                .iter()
                .position(|candidate| edit_distance(word, candidate) <= budget)
        });

        if let Some(offset) = hit {
            matched_indices.push(idx);
            cursor += offset + 1;
        }
    }

    let ratio = matched_indices.len() as f64 / target.len() as f64;
    let score = (ratio * 100.0).round().min(100.0) as u8;

    PassageScore {
        score,
        matched_indices,
    }
}

/// Per-word colouring for the live passage view.
///
/// Looser than [`score_passage`]: a target word is matched if it appears
/// anywhere in the transcript, in any order.
pub fn highlight_words(target: &[String], spoken: &[String]) -> Vec<WordHighlight> {
    if no_speech(spoken) {
        return vec![WordHighlight::Pending; target.len()];
    }

    target
        .iter()
        .map(|word| {
            if spoken.iter().any(|candidate| is_fuzzy_match(word, candidate)) {
                WordHighlight::Matched
            } else {
                WordHighlight::Missed
            }
        })
        .collect()
}
