use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
};

use crate::scorer::WordHighlight;
use crate::text::normalize;

fn style_for(highlight: Option<WordHighlight>) -> Style {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match highlight {
        Some(WordHighlight::Matched) => bold.fg(Color::Green),
        Some(WordHighlight::Missed) => bold.fg(Color::Red),
        Some(WordHighlight::Pending) => bold.add_modifier(Modifier::DIM),
        None => Style::default().add_modifier(Modifier::DIM),
    }
}

/// Pair each word of the original passage with the highlight of its
/// normalized token. Words that normalize to nothing (a lone dash) get `None`.
pub fn word_highlights<'a>(
    passage: &'a str,
    highlights: &[WordHighlight],
) -> Vec<(&'a str, Option<WordHighlight>)> {
    let mut token = 0;
    passage
        .split_whitespace()
        .map(|raw| {
            let tokens = normalize(raw).len();
            let highlight = if tokens == 0 {
                None
            } else {
                highlights.get(token).copied()
            };
            token += tokens;
            (raw, highlight)
        })
        .collect()
}

pub fn passage_spans(passage: &str, highlights: &[WordHighlight]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (i, (word, highlight)) in word_highlights(passage, highlights).into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(word.to_string(), style_for(highlight)));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use WordHighlight::*;

    #[test]
    fn test_punctuation_stays_with_its_word() {
        let mapped = word_highlights("Hello, world!", &[Matched, Missed]);
        assert_eq!(
            mapped,
            vec![("Hello,", Some(Matched)), ("world!", Some(Missed))]
        );
    }

    #[test]
    fn test_bare_punctuation_has_no_highlight() {
        let mapped = word_highlights("wait - what", &[Matched, Missed]);
        assert_eq!(
            mapped,
            vec![("wait", Some(Matched)), ("-", None), ("what", Some(Missed))]
        );
    }

    #[test]
    fn test_spans_interleave_spaces() {
        let spans = passage_spans("a b", &[Pending, Pending]);
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a b");
        assert_eq!(spans.len(), 3);
    }
}
