use std::sync::mpsc::Sender;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{error, info};

use crate::audio::{AudioSink, SpeechPlayer};
use crate::config::Config;
use crate::dictionary::{lookup, DictionaryEntry};
use crate::error::{Error, Result};
use crate::generator::ContentGenerator;
use crate::passages;
use crate::quiz::{
    generate_listening, generate_reading, generate_speaking_passage, generate_writing_task,
    grade_writing, GrammarReport, ListeningQuiz, QuestionSet, QuizAttempt, QuizResult,
    ReadingQuiz, SpeakingPassage, WritingTask,
};
use crate::session::{DictationRecognizer, MicState, SpeakingSession, TranscriptEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum MenuItem {
    Reading,
    Listening,
    Writing,
    Speaking,
    Dictionary,
}

impl MenuItem {
    pub const ALL: [MenuItem; 5] = [
        MenuItem::Reading,
        MenuItem::Listening,
        MenuItem::Writing,
        MenuItem::Speaking,
        MenuItem::Dictionary,
    ];

    pub fn blurb(&self) -> &'static str {
        match self {
            MenuItem::Reading => "read a short passage and answer questions",
            MenuItem::Listening => "listen to a story and answer questions",
            MenuItem::Writing => "write on a topic and get grammar feedback",
            MenuItem::Speaking => "read a passage aloud and get a fluency score",
            MenuItem::Dictionary => "look up any English word",
        }
    }
}

/// Slow work the UI should draw a loading screen for before running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Open(MenuItem),
    Play(String),
    Grade,
    Lookup(String),
}

#[derive(Debug)]
pub struct QuizView<Q: QuestionSet> {
    pub quiz: Q,
    pub attempt: QuizAttempt,
    pub current: usize,
    pub result: Option<QuizResult>,
}

impl<Q: QuestionSet> QuizView<Q> {
    pub fn new(quiz: Q) -> Self {
        let attempt = QuizAttempt::new(quiz.questions());
        Self {
            quiz,
            attempt,
            current: 0,
            result: None,
        }
    }

    /// Returns true when the learner asked to submit.
    fn on_key(&mut self, key: KeyEvent) -> bool {
        if self.result.is_some() {
            return false;
        }
        let count = self.quiz.questions().len();
        match key.code {
            KeyCode::Up => self.current = self.current.saturating_sub(1),
            KeyCode::Down => self.current = (self.current + 1).min(count.saturating_sub(1)),
            KeyCode::Enter => return true,
            KeyCode::Char(c @ 'a'..='h') => {
                let option = (c as u8 - b'a') as usize;
                if self.attempt.select(self.quiz.questions(), self.current, option)
                    && self.current + 1 < count
                {
                    self.current += 1;
                }
            }
            _ => {}
        }
        false
    }

    fn submit(&mut self) {
        let result = self.attempt.grade(self.quiz.questions());
        info!(
            "{} graded: {}/{}",
            self.quiz.title(),
            result.correct,
            result.total
        );
        self.result = Some(result);
    }
}

#[derive(Debug)]
pub struct WritingView {
    pub task: WritingTask,
    pub draft: String,
    pub report: Option<GrammarReport>,
}

impl WritingView {
    pub fn word_count(&self) -> usize {
        self.draft.split_whitespace().count()
    }
}

pub struct SpeakingView {
    pub title: String,
    pub session: SpeakingSession<DictationRecognizer>,
    pub line: String,
    dictation: Sender<TranscriptEvent>,
}

impl SpeakingView {
    fn new(passage: SpeakingPassage) -> Self {
        let recognizer = DictationRecognizer::new();
        let dictation = recognizer.sender();
        Self {
            title: passage.title,
            session: SpeakingSession::new(&passage.text, recognizer),
            line: String::new(),
            dictation,
        }
    }

    fn replace_passage(&mut self, passage: SpeakingPassage) {
        self.session.reset(&passage.text);
        self.title = passage.title;
        self.line.clear();
    }

    fn send(&self, event: TranscriptEvent) {
        // the receiver lives in our own session, so this only fails during teardown
        let _ = self.dictation.send(event);
    }
}

#[derive(Debug, Default)]
pub struct DictionaryView {
    pub query: String,
    pub entry: Option<DictionaryEntry>,
}

pub enum Activity {
    Reading(QuizView<ReadingQuiz>),
    Listening(QuizView<ListeningQuiz>),
    Writing(WritingView),
    Speaking(SpeakingView),
    Dictionary(DictionaryView),
}

impl Activity {
    pub fn item(&self) -> MenuItem {
        match self {
            Activity::Reading(_) => MenuItem::Reading,
            Activity::Listening(_) => MenuItem::Listening,
            Activity::Writing(_) => MenuItem::Writing,
            Activity::Speaking(_) => MenuItem::Speaking,
            Activity::Dictionary(_) => MenuItem::Dictionary,
        }
    }
}

pub struct App<G: ContentGenerator, S: AudioSink> {
    pub config: Config,
    generator: Option<G>,
    player: SpeechPlayer<S>,
    pub menu_index: usize,
    pub activity: Option<Activity>,
    pub pending: Option<Pending>,
    pub notice: Option<&'static str>,
    pub should_quit: bool,
}

impl<G: ContentGenerator, S: AudioSink> App<G, S> {
    /// `generator` is `None` when no credentials are configured.
    pub fn new(config: Config, generator: Option<G>, sink: S) -> Self {
        Self {
            config,
            generator,
            player: SpeechPlayer::new(sink),
            menu_index: 0,
            activity: None,
            pending: None,
            notice: None,
            should_quit: false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.generator.is_some() && !self.config.offline
    }

    pub fn player(&self) -> &SpeechPlayer<S> {
        &self.player
    }

    pub fn selected_item(&self) -> MenuItem {
        MenuItem::ALL[self.menu_index % MenuItem::ALL.len()]
    }

    pub fn open(&mut self, item: MenuItem) {
        self.notice = None;
        self.pending = Some(Pending::Open(item));
    }

    /// Tear down the current activity and go back to the home screen.
    pub fn go_home(&mut self) {
        self.player.stop();
        self.activity = None;
        self.pending = None;
    }

    pub fn on_tick(&mut self) {
        if let Some(Activity::Speaking(view)) = self.activity.as_mut() {
            view.session.pump();
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.pending.is_some() {
            return;
        }

        if key.code == KeyCode::Esc {
            if self.activity.is_some() {
                self.go_home();
            } else {
                self.should_quit = true;
            }
            return;
        }

        if self.activity.is_none() {
            self.on_home_key(key);
            return;
        }
        let Some(activity) = self.activity.as_mut() else {
            return;
        };

        let outcome: Result<Option<Pending>> = match activity {
            Activity::Reading(view) => Ok(quiz_key(view, key, MenuItem::Reading)),
            Activity::Listening(view) => {
                if view.result.is_none() && key.code == KeyCode::Char('p') {
                    Ok(Some(Pending::Play(view.quiz.story.clone())))
                } else {
                    Ok(quiz_key(view, key, MenuItem::Listening))
                }
            }
            Activity::Writing(view) => Ok(writing_key(view, key)),
            Activity::Speaking(view) => speaking_key(view, key),
            Activity::Dictionary(view) => Ok(dictionary_key(view, key)),
        };

        match outcome {
            Ok(Some(pending)) => {
                self.notice = None;
                self.pending = Some(pending);
            }
            Ok(None) => {}
            Err(e) => self.report(e),
        }
    }

    fn on_home_key(&mut self, key: KeyEvent) {
        let count = MenuItem::ALL.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.menu_index = (self.menu_index + count - 1) % count
            }
            KeyCode::Down | KeyCode::Char('j') => self.menu_index = (self.menu_index + 1) % count,
            KeyCode::Enter => self.open(self.selected_item()),
            KeyCode::Char(c @ '1'..='5') => {
                self.menu_index = (c as u8 - b'1') as usize;
                self.open(self.selected_item());
            }
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn report(&mut self, e: Error) {
        error!("{e}");
        self.notice = Some(e.user_message());
    }

    /// Run whatever slow work the last key press queued.
    pub async fn run_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if let Err(e) = self.execute(pending).await {
            self.report(e);
        }
    }

    async fn execute(&mut self, pending: Pending) -> Result<()> {
        match pending {
            Pending::Open(item) => self.build(item).await,
            Pending::Play(text) => {
                let generator = online(&self.config, self.generator.as_ref())?;
                self.player.play(generator, &text).await
            }
            Pending::Grade => {
                let generator = online(&self.config, self.generator.as_ref())?;
                if let Some(Activity::Writing(view)) = self.activity.as_mut() {
                    let report = grade_writing(generator, &view.task, &view.draft).await?;
                    view.report = Some(report);
                }
                Ok(())
            }
            Pending::Lookup(word) => {
                let generator = online(&self.config, self.generator.as_ref())?;
                let entry = lookup(generator, &word).await?;
                if let Some(Activity::Dictionary(view)) = self.activity.as_mut() {
                    view.entry = Some(entry);
                }
                Ok(())
            }
        }
    }

    async fn build(&mut self, item: MenuItem) -> Result<()> {
        self.player.stop();
        let level = self.config.level;
        let questions = self.config.questions_per_quiz.max(1);

        let activity = match item {
            MenuItem::Reading => {
                let generator = online(&self.config, self.generator.as_ref())?;
                let quiz = generate_reading(generator, level, questions).await?;
                Activity::Reading(QuizView::new(quiz))
            }
            MenuItem::Listening => {
                let generator = online(&self.config, self.generator.as_ref())?;
                let quiz = generate_listening(generator, level, questions).await?;
                Activity::Listening(QuizView::new(quiz))
            }
            MenuItem::Writing => {
                let generator = online(&self.config, self.generator.as_ref())?;
                Activity::Writing(WritingView {
                    task: generate_writing_task(generator, level).await?,
                    draft: String::new(),
                    report: None,
                })
            }
            MenuItem::Speaking => {
                let passage = match self.generator.as_ref().filter(|_| !self.config.offline) {
                    Some(generator) => generate_speaking_passage(generator, level).await?,
                    None => {
                        info!("offline: using a built-in passage");
                        passages::random_passage()?
                    }
                };
                if let Some(Activity::Speaking(view)) = self.activity.as_mut() {
                    view.replace_passage(passage);
                    return Ok(());
                }
                Activity::Speaking(SpeakingView::new(passage))
            }
            MenuItem::Dictionary => Activity::Dictionary(DictionaryView::default()),
        };

        self.activity = Some(activity);
        Ok(())
    }
}

fn online<'a, G>(config: &Config, generator: Option<&'a G>) -> Result<&'a G> {
    if config.offline {
        return Err(Error::MissingCredentials);
    }
    generator.ok_or(Error::MissingCredentials)
}

fn quiz_key<Q: QuestionSet>(
    view: &mut QuizView<Q>,
    key: KeyEvent,
    item: MenuItem,
) -> Option<Pending> {
    if view.result.is_some() {
        return match key.code {
            KeyCode::Char('n') => Some(Pending::Open(item)),
            _ => None,
        };
    }
    if view.on_key(key) {
        view.submit();
    }
    None
}

fn writing_key(view: &mut WritingView, key: KeyEvent) -> Option<Pending> {
    if view.report.is_some() {
        return match key.code {
            KeyCode::Char('n') => Some(Pending::Open(MenuItem::Writing)),
            KeyCode::Char('e') => {
                view.report = None;
                None
            }
            _ => None,
        };
    }
    match key.code {
        KeyCode::Tab => return Some(Pending::Grade),
        KeyCode::Enter => view.draft.push('\n'),
        KeyCode::Backspace => {
            view.draft.pop();
        }
        KeyCode::Char(c) => view.draft.push(c),
        _ => {}
    }
    None
}

fn speaking_key(view: &mut SpeakingView, key: KeyEvent) -> Result<Option<Pending>> {
    if view.session.is_recording() {
        match key.code {
            KeyCode::Tab => {
                let line = std::mem::take(&mut view.line);
                if !line.trim().is_empty() {
                    view.send(TranscriptEvent::Final(line));
                }
                let score = view.session.stop_recording().map(|s| s.score);
                if score == Some(0) && view.session.transcript().is_empty() {
                    return Err(Error::NoSpeech);
                }
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut view.line);
                view.send(TranscriptEvent::Final(line));
            }
            KeyCode::Backspace => {
                view.line.pop();
                view.send(TranscriptEvent::Interim(view.line.clone()));
            }
            KeyCode::Char(c) => {
                view.line.push(c);
                view.send(TranscriptEvent::Interim(view.line.clone()));
            }
            _ => {}
        }
        view.session.pump();
        return Ok(None);
    }

    match key.code {
        KeyCode::Char('r') => {
            view.line.clear();
            view.session.start_recording()?;
        }
        KeyCode::Char('g') if view.session.mic() == MicState::PermissionDenied => {
            view.session.regrant();
        }
        KeyCode::Char('n') => return Ok(Some(Pending::Open(MenuItem::Speaking))),
        KeyCode::Char('p') => return Ok(Some(Pending::Play(view.session.passage().to_string()))),
        _ => {}
    }
    Ok(None)
}

fn dictionary_key(view: &mut DictionaryView, key: KeyEvent) -> Option<Pending> {
    match key.code {
        KeyCode::Enter if !view.query.trim().is_empty() => {
            return Some(Pending::Lookup(view.query.trim().to_string()))
        }
        KeyCode::Backspace => {
            view.query.pop();
        }
        KeyCode::Char(c) => view.query.push(c),
        _ => {}
    }
    None
}
