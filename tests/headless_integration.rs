use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parlance::app::{Activity, App, MenuItem};
use parlance::audio::{AudioSink, PcmAudio};
use parlance::config::Config;
use parlance::generator::ContentGenerator;
use parlance::runtime::{AppEvent, FixedTicker, Runner, TestEventSource};
use parlance::session::{ScriptedRecognizer, SpeakingSession, TranscriptEvent};
use parlance::{Error, Result};
use serde_json::Value;

// Stands in for the hosted model when no key is configured
struct NoGenerator;

impl ContentGenerator for NoGenerator {
    async fn generate_json(&self, _prompt: &str, _schema: &Value) -> Result<Value> {
        Err(Error::MissingCredentials)
    }

    async fn synthesize_speech(&self, _text: &str) -> Result<PcmAudio> {
        Err(Error::MissingCredentials)
    }

    async fn transcribe(&self, _wav: &[u8]) -> Result<String> {
        Err(Error::MissingCredentials)
    }
}

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

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

// Drives the app exactly like the terminal loop does, minus the drawing.
#[test]
fn headless_offline_speaking_flow() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut app: App<NoGenerator, NullSink> = App::new(Config::default(), None, NullSink);

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(key(KeyCode::Char('4'))).unwrap();

    for _ in 0..50u32 {
        if app.pending.is_some() {
            rt.block_on(app.run_pending());
            break;
        }
        match runner.step() {
            AppEvent::Key(key) => app.on_key(key),
            AppEvent::Resize => {}
            AppEvent::Tick => app.on_tick(),
        }
    }

    let passage = match app.activity.as_ref() {
        Some(Activity::Speaking(view)) => view.session.passage().to_string(),
        _ => panic!("speaking activity should be open"),
    };

    tx.send(key(KeyCode::Char('r'))).unwrap();
    for c in passage.chars() {
        tx.send(key(KeyCode::Char(c))).unwrap();
    }
    tx.send(key(KeyCode::Enter)).unwrap();
    tx.send(key(KeyCode::Tab)).unwrap();

    for _ in 0..(passage.len() as u32 + 50) {
        match runner.step() {
            AppEvent::Key(key) => app.on_key(key),
            AppEvent::Resize => {}
            AppEvent::Tick => {
                app.on_tick();
                break;
            }
        }
    }

    let Some(Activity::Speaking(view)) = app.activity.as_ref() else {
        panic!("speaking activity should still be open");
    };
    assert!(!view.session.is_recording());
    assert_eq!(view.session.score().unwrap().score, 100);

    tx.send(key(KeyCode::Esc)).unwrap();
    tx.send(key(KeyCode::Esc)).unwrap();
    for _ in 0..10u32 {
        if let AppEvent::Key(key) = runner.step() {
            app.on_key(key);
        }
        if app.should_quit {
            break;
        }
    }
    assert!(app.activity.is_none());
    assert!(app.should_quit);
}

#[test]
fn headless_reading_needs_credentials() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut app: App<NoGenerator, NullSink> = App::new(Config::default(), None, NullSink);

    app.open(MenuItem::Reading);
    rt.block_on(app.run_pending());

    assert!(app.activity.is_none());
    assert_eq!(app.notice, Some(Error::MissingCredentials.user_message()));
}

#[test]
fn headless_session_pumped_by_ticks() {
    let recognizer = ScriptedRecognizer::new(vec![
        TranscriptEvent::Interim("the old".into()),
        TranscriptEvent::Final("the old lighthouse".into()),
        TranscriptEvent::Interim("stood on the".into()),
    ]);
    let mut session = SpeakingSession::new("The old lighthouse stood on the cliff.", recognizer);

    let (_tx, rx) = mpsc::channel::<AppEvent>();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    );

    session.start_recording().unwrap();
    for _ in 0..3u32 {
        if let AppEvent::Tick = runner.step() {
            session.pump();
        }
    }

    assert_eq!(session.transcript(), "the old lighthouse stood on the");
    let score = session.stop_recording().cloned().unwrap();
    assert_eq!(score.matched_indices, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(score.score, 86);
    assert_eq!(session.recognizer().stops, 1);
}
