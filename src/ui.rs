pub mod passage;
pub mod screen;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{Activity, App, DictionaryView, MenuItem, QuizView, SpeakingView, WritingView};
use crate::audio::AudioSink;
use crate::generator::ContentGenerator;
use crate::quiz::QuestionSet;
use crate::session::MicState;
use passage::passage_spans;
use screen::{current_screen, is_finished, Screen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

impl<G: ContentGenerator, S: AudioSink> Widget for &App<G, S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let screen = current_screen(self);
        let finished = self.activity.as_ref().is_some_and(is_finished);
        let recording = matches!(
            &self.activity,
            Some(Activity::Speaking(view)) if view.session.is_recording()
        );

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Length(1), // notice
                Constraint::Min(1),    // body
                Constraint::Length(1), // legend
            ])
            .split(area);

        let mut header = vec![
            Span::styled("parlance", bold().fg(Color::Magenta)),
            Span::styled(format!("  level {}", self.config.level), dim()),
        ];
        if let Screen::Activity(item) = screen {
            header.push(Span::styled(format!("  {item}"), bold()));
        }
        if self.player().is_playing() {
            header.push(Span::styled("  ♪ narration", Style::default().fg(Color::Cyan)));
        }
        if !self.is_online() {
            header.push(Span::styled("  offline", italic().fg(Color::Yellow)));
        }
        Paragraph::new(Line::from(header)).render(chunks[0], buf);

        if let Some(notice) = self.notice {
            Paragraph::new(Span::styled(notice, bold().fg(Color::Red)))
                .alignment(Alignment::Center)
                .render(chunks[1], buf);
        }

        match (screen, &self.activity) {
            (Screen::Loading(label), _) => render_loading(label, chunks[2], buf),
            (Screen::Home, _) | (_, None) => render_home(self, chunks[2], buf),
            (Screen::Activity(_), Some(activity)) => match activity {
                Activity::Reading(view) => {
                    render_quiz(view, Some(view.quiz.passage.as_str()), chunks[2], buf)
                }
                Activity::Listening(view) => {
                    // the story is only revealed once the answers are in
                    let story = view.result.map(|_| view.quiz.story.as_str());
                    render_quiz(view, story, chunks[2], buf)
                }
                Activity::Writing(view) => render_writing(view, chunks[2], buf),
                Activity::Speaking(view) => render_speaking(view, chunks[2], buf),
                Activity::Dictionary(view) => render_dictionary(view, chunks[2], buf),
            },
        }

        Paragraph::new(Span::styled(screen.legend(finished, recording), italic()))
            .render(chunks[3], buf);
    }
}

fn render_home<G: ContentGenerator, S: AudioSink>(app: &App<G, S>, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![
        Line::from(Span::styled(
            "practise English one skill at a time",
            italic().fg(Color::Cyan),
        )),
        Line::default(),
    ];

    for (i, item) in MenuItem::ALL.iter().enumerate() {
        let selected = *item == app.selected_item();
        let marker = if selected { "> " } else { "  " };
        let style = if selected {
            bold().fg(Color::Green)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{} {item:<12}", i + 1), style),
            Span::styled(item.blurb(), dim()),
        ]));
    }

    if !app.is_online() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!(
                "no API key: set {} to unlock generated activities; speaking works offline",
                crate::config::API_KEY_ENV
            ),
            italic().fg(Color::Yellow),
        )));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn render_loading(label: &str, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        label.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);
}

fn option_style(selected: bool, correct: bool, graded: bool) -> Style {
    match (graded, selected, correct) {
        (true, _, true) => bold().fg(Color::Green),
        (true, true, false) => bold().fg(Color::Red),
        (true, false, false) => dim(),
        (false, true, _) => bold().fg(Color::Cyan),
        (false, false, _) => Style::default(),
    }
}

fn render_quiz<Q: QuestionSet>(view: &QuizView<Q>, text: Option<&str>, area: Rect, buf: &mut Buffer) {
    let graded = view.result.is_some();
    let mut lines = vec![Line::from(Span::styled(view.quiz.title().to_string(), bold()))];

    match text {
        Some(text) => lines.push(Line::from(text.to_string())),
        None => lines.push(Line::from(Span::styled(
            "(the story is hidden until you submit; press p to listen)",
            italic(),
        ))),
    }
    lines.push(Line::default());

    for (i, question) in view.quiz.questions().iter().enumerate() {
        let marker = if i == view.current && !graded { ">" } else { " " };
        lines.push(Line::from(Span::styled(
            format!("{marker} {}. {}", i + 1, question.prompt),
            bold(),
        )));
        let chosen = view.attempt.answer(i);
        for (j, option) in question.options.iter().enumerate() {
            let letter = (b'a' + j as u8) as char;
            lines.push(Line::from(Span::styled(
                format!("    {letter}) {option}"),
                option_style(chosen == Some(j), question.answer == j, graded),
            )));
        }
        if graded && !question.explanation.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("    {}", question.explanation),
                italic(),
            )));
        }
    }

    if let Some(result) = view.result {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!(
                "score: {}/{} ({}%)",
                result.correct, result.total, result.score
            ),
            bold().fg(Color::Magenta),
        )));
    } else if !view.attempt.is_complete() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "unanswered questions count as wrong",
            dim(),
        )));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn render_writing(view: &WritingView, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(vec![
        Line::from(Span::styled(view.task.topic.clone(), bold())),
        Line::from(Span::styled(view.task.instructions.clone(), italic())),
    ])
    .wrap(Wrap { trim: true })
    .render(chunks[0], buf);

    match &view.report {
        None => {
            Paragraph::new(format!("{}_", view.draft))
                .block(Block::default().borders(Borders::ALL).title("your text"))
                .wrap(Wrap { trim: false })
                .render(chunks[1], buf);

            let count = view.word_count();
            let style = if count >= view.task.min_words {
                bold().fg(Color::Green)
            } else {
                dim()
            };
            Paragraph::new(Span::styled(
                format!("{count} / {} words", view.task.min_words),
                style,
            ))
            .render(chunks[2], buf);
        }
        Some(report) => {
            let mut lines = vec![
                Line::from(Span::styled(
                    format!("grammar score: {}%", report.score),
                    bold().fg(Color::Magenta),
                )),
                Line::default(),
                Line::from(Span::styled("corrected", bold())),
                Line::from(report.corrected_text.clone()),
                Line::default(),
            ];
            if report.issues.is_empty() {
                lines.push(Line::from(Span::styled("no issues found", italic())));
            }
            for issue in &report.issues {
                lines.push(Line::from(vec![
                    Span::styled(issue.original.clone(), bold().fg(Color::Red)),
                    Span::raw(" → "),
                    Span::styled(issue.suggestion.clone(), bold().fg(Color::Green)),
                ]));
                if !issue.explanation.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", issue.explanation),
                        italic(),
                    )));
                }
            }
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .render(chunks[1], buf);
        }
    }
}

fn mic_line(view: &SpeakingView) -> Line<'static> {
    match view.session.mic() {
        MicState::Idle => Line::from(Span::styled("mic ready", dim())),
        MicState::Recording => Line::from(vec![
            Span::styled("● recording  ", bold().fg(Color::Red)),
            Span::raw(format!("{}_", view.line)),
        ]),
        MicState::PermissionDenied => Line::from(Span::styled(
            "microphone access denied; grant it and press g",
            bold().fg(Color::Yellow),
        )),
        MicState::Unsupported => Line::from(Span::styled(
            "speech recognition is not available here",
            bold().fg(Color::Yellow),
        )),
    }
}

fn render_speaking(view: &SpeakingView, area: Rect, buf: &mut Buffer) {
    let passage = view.session.passage();
    let max_width = area.width.max(1) as usize;
    let passage_lines = if passage.width() <= max_width {
        1
    } else {
        (passage.width() as f64 / max_width as f64).ceil() as u16 + 1
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(passage_lines),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Span::styled(view.title.clone(), bold())).render(chunks[0], buf);

    let spans = passage_spans(passage, &view.session.live_highlights());
    Paragraph::new(Line::from(spans))
        .alignment(if passage_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);

    Paragraph::new(mic_line(view)).render(chunks[3], buf);

    if let Some(score) = view.session.score() {
        let style = if view.session.is_recording() {
            dim()
        } else {
            bold().fg(Color::Magenta)
        };
        Paragraph::new(vec![
            Line::from(Span::styled(format!("fluency {}%", score.score), style)),
            Line::from(Span::styled(
                format!(
                    "{} of {} words heard in order",
                    score.matched(),
                    view.session.target().len()
                ),
                dim(),
            )),
        ])
        .render(chunks[4], buf);
    }
}

fn render_dictionary(view: &DictionaryView, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("look up: ", dim()),
            Span::styled(format!("{}_", view.query), bold()),
        ]),
        Line::default(),
    ];

    if let Some(entry) = &view.entry {
        let mut head = vec![Span::styled(entry.word.clone(), bold().fg(Color::Cyan))];
        if !entry.phonetic.is_empty() {
            head.push(Span::styled(format!("  {}", entry.phonetic), dim()));
        }
        head.push(Span::styled(format!("  {}", entry.part_of_speech), italic()));
        lines.push(Line::from(head));

        lines.extend(
            entry
                .definitions
                .iter()
                .enumerate()
                .map(|(i, d)| Line::from(format!("{}. {d}", i + 1))),
        );
        lines.extend(
            entry
                .examples
                .iter()
                .map(|e| Line::from(Span::styled(format!("  \"{e}\""), italic()))),
        );
        if !entry.synonyms.is_empty() {
            lines.push(Line::default());
            lines.push(Line::from(vec![
                Span::styled("synonyms: ", dim()),
                Span::raw(entry.synonyms.iter().join(", ")),
            ]));
        }
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Pending;
    use crate::audio::PcmAudio;
    use crate::config::Config;
    use crate::error::Result;
    use crate::generator::fake::FakeGenerator;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use serde_json::json;

    struct NullSink;

    impl AudioSink for NullSink {
        fn play(&mut self, _clip: &PcmAudio) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self) {}

        fn is_playing(&self) -> bool {
            false
        }
    }

    fn rendered<G: ContentGenerator, S: AudioSink>(app: &App<G, S>) -> String {
        let area = Rect::new(0, 0, 100, 30);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    fn press<G: ContentGenerator, S: AudioSink>(app: &mut App<G, S>, code: KeyCode) {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_home_lists_every_activity() {
        let app: App<FakeGenerator, NullSink> = App::new(Config::default(), None, NullSink);
        let screen = rendered(&app);
        for item in MenuItem::ALL {
            assert!(screen.contains(&item.to_string()), "missing {item}");
        }
        assert!(screen.contains("offline"));
    }

    #[test]
    fn test_loading_screen_while_pending() {
        let mut app: App<FakeGenerator, NullSink> = App::new(Config::default(), None, NullSink);
        app.pending = Some(Pending::Grade);
        assert!(rendered(&app).contains("checking your writing"));
    }

    #[test]
    fn test_notice_is_shown() {
        let mut app: App<FakeGenerator, NullSink> = App::new(Config::default(), None, NullSink);
        app.notice = Some("something went wrong");
        assert!(rendered(&app).contains("something went wrong"));
    }

    #[tokio::test]
    async fn test_listening_story_hidden_until_graded() {
        let generator = FakeGenerator::replying(vec![json!({
            "title": "Market Day",
            "story": "Tom buys apples.",
            "questions": [
                {"prompt": "What does Tom buy?", "options": ["apples", "pears"], "answer": 0, "explanation": "He buys apples."}
            ]
        })]);
        let mut app = App::new(Config::default(), Some(generator), NullSink);
        app.open(MenuItem::Listening);
        app.run_pending().await;

        let before = rendered(&app);
        assert!(!before.contains("Tom buys apples."));
        assert!(before.contains("What does Tom buy?"));

        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);
        let after = rendered(&app);
        assert!(after.contains("Tom buys apples."));
        assert!(after.contains("1/1 (100%)"));
    }

    #[tokio::test]
    async fn test_speaking_screen_shows_score_after_stop() {
        let mut app: App<FakeGenerator, NullSink> = App::new(Config::default(), None, NullSink);
        app.open(MenuItem::Speaking);
        app.run_pending().await;
        assert!(rendered(&app).contains("mic ready"));

        press(&mut app, KeyCode::Char('r'));
        assert!(rendered(&app).contains("recording"));
        for c in "completely unrelated words".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Tab);

        let screen = rendered(&app);
        assert!(screen.contains("fluency"));
        assert!(screen.contains("words heard in order"));
    }

    #[tokio::test]
    async fn test_dictionary_entry_lists_synonyms() {
        let generator = FakeGenerator::replying(vec![json!({
            "word": "brisk",
            "phonetic": "/brɪsk/",
            "part_of_speech": "adjective",
            "definitions": ["quick and energetic"],
            "examples": ["a brisk walk"],
            "synonyms": ["quick", "lively"]
        })]);
        let mut app = App::new(Config::default(), Some(generator), NullSink);
        app.open(MenuItem::Dictionary);
        app.run_pending().await;
        for c in "brisk".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        app.run_pending().await;

        let screen = rendered(&app);
        assert!(screen.contains("quick and energetic"));
        assert!(screen.contains("quick, lively"));
    }

    #[test]
    fn test_small_area_does_not_panic() {
        let app: App<FakeGenerator, NullSink> = App::new(Config::default(), None, NullSink);
        let area = Rect::new(0, 0, 12, 4);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
        assert_eq!(*buffer.area(), area);
    }
}
