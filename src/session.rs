use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::scorer::{highlight_words, score_passage, PassageScore, WordHighlight};
use crate::text::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerStatus {
    Available,
    Unsupported,
    PermissionDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicState {
    Idle,
    Recording,
    /// Sticks until [`SpeakingSession::regrant`]
    PermissionDenied,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Best guess so far for the words being spoken; replaced by the next event
    Interim(String),
    /// Settled text, appended to the transcript
    Final(String),
}

/// A speech-to-text capability
pub trait Recognizer {
    fn status(&self) -> RecognizerStatus;
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn try_recv(&mut self) -> Option<TranscriptEvent>;
}

/// Recognizer fed by the terminal UI: dictated or typed lines arrive as events
pub struct DictationRecognizer {
    tx: Sender<TranscriptEvent>,
    rx: Receiver<TranscriptEvent>,
    listening: bool,
}

impl DictationRecognizer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            listening: false,
        }
    }

    /// Handle for whoever produces the text
    pub fn sender(&self) -> Sender<TranscriptEvent> {
        self.tx.clone()
    }
}

impl Default for DictationRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for DictationRecognizer {
    fn status(&self) -> RecognizerStatus {
        RecognizerStatus::Available
    }

    fn start(&mut self) -> Result<()> {
        // drop anything typed before the microphone was "on"
        while self.rx.try_recv().is_ok() {}
        self.listening = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.listening = false;
    }

    fn try_recv(&mut self) -> Option<TranscriptEvent> {
        if !self.listening {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Replays a fixed list of events; used by tests and demos
#[derive(Debug, Clone)]
pub struct ScriptedRecognizer {
    status: RecognizerStatus,
    script: VecDeque<TranscriptEvent>,
    pub starts: usize,
    pub stops: usize,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<TranscriptEvent>) -> Self {
        Self {
            status: RecognizerStatus::Available,
            script: script.into(),
            starts: 0,
            stops: 0,
        }
    }

    pub fn with_status(status: RecognizerStatus) -> Self {
        Self {
            status,
            ..Self::new(Vec::new())
        }
    }
}

impl Recognizer for ScriptedRecognizer {
    fn status(&self) -> RecognizerStatus {
        self.status
    }

    fn start(&mut self) -> Result<()> {
        match self.status {
            RecognizerStatus::Available => {
                self.starts += 1;
                Ok(())
            }
            RecognizerStatus::Unsupported => Err(Error::RecognitionUnsupported),
            RecognizerStatus::PermissionDenied => Err(Error::PermissionDenied),
        }
    }

    fn stop(&mut self) {
        self.stops += 1;
    }

    fn try_recv(&mut self) -> Option<TranscriptEvent> {
        self.script.pop_front()
    }
}

/// State of one speaking test: the passage, the microphone and what was heard
pub struct SpeakingSession<R: Recognizer> {
    passage: String,
    target: Vec<String>,
    recognizer: R,
    mic: MicState,
    finals: Vec<String>,
    interim: String,
    score: Option<PassageScore>,
}

impl<R: Recognizer> SpeakingSession<R> {
    pub fn new(passage: &str, recognizer: R) -> Self {
        let mic = match recognizer.status() {
            RecognizerStatus::Available => MicState::Idle,
            RecognizerStatus::Unsupported => MicState::Unsupported,
            RecognizerStatus::PermissionDenied => MicState::PermissionDenied,
        };

        Self {
            passage: passage.to_string(),
            target: normalize(passage),
            recognizer,
            mic,
            finals: Vec::new(),
            interim: String::new(),
            score: None,
        }
    }

    pub fn passage(&self) -> &str {
        &self.passage
    }

    pub fn target(&self) -> &[String] {
        &self.target
    }

    pub fn mic(&self) -> MicState {
        self.mic
    }

    pub fn is_recording(&self) -> bool {
        self.mic == MicState::Recording
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Begin a fresh recording attempt. Ignored while already recording.
    pub fn start_recording(&mut self) -> Result<()> {
        match self.mic {
            MicState::Recording => return Ok(()),
            MicState::PermissionDenied => return Err(Error::PermissionDenied),
            MicState::Unsupported => return Err(Error::RecognitionUnsupported),
            MicState::Idle => {}
        }

        if let Err(e) = self.recognizer.start() {
            self.mic = match e {
                Error::PermissionDenied => MicState::PermissionDenied,
                Error::RecognitionUnsupported => MicState::Unsupported,
                _ => MicState::Idle,
            };
            warn!("could not start recognition: {e}");
            return Err(e);
        }

        self.finals.clear();
        self.interim.clear();
        self.score = None;
        self.mic = MicState::Recording;
        info!("recording started for {} target words", self.target.len());
        Ok(())
    }

    /// Move pending recognition events into the transcript.
    pub fn pump(&mut self) -> usize {
        if !self.is_recording() {
            return 0;
        }

        let mut received = 0;
        while let Some(event) = self.recognizer.try_recv() {
            received += 1;
            match event {
                TranscriptEvent::Interim(text) => self.interim = text,
                TranscriptEvent::Final(text) => {
                    self.interim.clear();
                    if !text.trim().is_empty() {
                        self.finals.push(text.trim().to_string());
                    }
                }
            }
        }
        if received > 0 {
            debug!("{received} transcript events");
        }
        received
    }

    /// Stop listening and score what was heard. Safe to call repeatedly.
    pub fn stop_recording(&mut self) -> Option<&PassageScore> {
        if self.is_recording() {
            self.pump();
            self.recognizer.stop();
            self.mic = MicState::Idle;
            if !self.interim.trim().is_empty() {
                let tail = std::mem::take(&mut self.interim);
                self.finals.push(tail.trim().to_string());
            }
            let result = score_passage(&self.target, &self.spoken_words());
            info!(
                "recording stopped: {} of {} words, score {}",
                result.matched(),
                self.target.len(),
                result.score
            );
            self.score = Some(result);
        }
        self.score.as_ref()
    }

    /// Start over with a new passage, releasing any live recording.
    pub fn reset(&mut self, passage: &str) {
        if self.is_recording() {
            self.recognizer.stop();
            self.mic = MicState::Idle;
        }
        self.passage = passage.to_string();
        self.target = normalize(passage);
        self.finals.clear();
        self.interim.clear();
        self.score = None;
    }

    /// Leave the permission-denied state after the user grants access again.
    pub fn regrant(&mut self) -> bool {
        if self.mic == MicState::PermissionDenied
            && self.recognizer.status() == RecognizerStatus::Available
        {
            self.mic = MicState::Idle;
            return true;
        }
        false
    }

    /// Everything heard so far, including the unsettled tail.
    pub fn transcript(&self) -> String {
        let mut parts: Vec<&str> = self.finals.iter().map(String::as_str).collect();
        if !self.interim.trim().is_empty() {
            parts.push(self.interim.trim());
        }
        parts.join(" ")
    }

    pub fn spoken_words(&self) -> Vec<String> {
        normalize(&self.transcript())
    }

    /// Cached score after recording, or a live one while still recording.
    pub fn score(&self) -> Option<PassageScore> {
        if self.is_recording() {
            return Some(score_passage(&self.target, &self.spoken_words()));
        }
        self.score.clone()
    }

    pub fn live_highlights(&self) -> Vec<WordHighlight> {
        highlight_words(&self.target, &self.spoken_words())
    }
}

impl<R: Recognizer> Drop for SpeakingSession<R> {
    fn drop(&mut self) {
        if self.is_recording() {
            self.recognizer.stop();
        }
    }
}
