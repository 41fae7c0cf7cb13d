use crate::app::{Activity, App, MenuItem, Pending};
use crate::audio::AudioSink;
use crate::generator::ContentGenerator;

/// What the terminal is showing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Loading(&'static str),
    Activity(MenuItem),
}

impl Screen {
    pub fn legend(&self, finished: bool, recording: bool) -> &'static str {
        match self {
            Screen::Home => "(1-5) choose / (↑↓) move / (enter) open / (q)uit",
            Screen::Loading(_) => "(ctrl-c) quit",
            Screen::Activity(MenuItem::Reading) if finished => "(n)ew quiz / (esc) home",
            Screen::Activity(MenuItem::Reading) => {
                "(a-h) answer / (↑↓) question / (enter) submit / (esc) home"
            }
            Screen::Activity(MenuItem::Listening) if finished => "(n)ew quiz / (esc) home",
            Screen::Activity(MenuItem::Listening) => {
                "(p)lay / (a-h) answer / (↑↓) question / (enter) submit / (esc) home"
            }
            Screen::Activity(MenuItem::Writing) if finished => "(e)dit / (n)ew topic / (esc) home",
            Screen::Activity(MenuItem::Writing) => "(tab) submit / (esc) home",
            Screen::Activity(MenuItem::Speaking) if recording => {
                "type or dictate / (enter) end line / (tab) stop"
            }
            Screen::Activity(MenuItem::Speaking) => {
                "(r)ecord / (p)lay / (n)ew passage / (g)rant mic / (esc) home"
            }
            Screen::Activity(MenuItem::Dictionary) => "(enter) look up / (esc) home",
        }
    }
}

fn loading_label(pending: &Pending) -> &'static str {
    match pending {
        Pending::Open(MenuItem::Reading) => "writing a reading passage...",
        Pending::Open(MenuItem::Listening) => "writing a story...",
        Pending::Open(MenuItem::Writing) => "choosing a topic...",
        Pending::Open(MenuItem::Speaking) => "choosing a passage...",
        Pending::Open(MenuItem::Dictionary) => "opening the dictionary...",
        Pending::Play(_) => "preparing audio...",
        Pending::Grade => "checking your writing...",
        Pending::Lookup(_) => "looking it up...",
    }
}

/// Pick the screen for the app's current state
pub fn current_screen<G: ContentGenerator, S: AudioSink>(app: &App<G, S>) -> Screen {
    if let Some(pending) = &app.pending {
        return Screen::Loading(loading_label(pending));
    }
    match &app.activity {
        None => Screen::Home,
        Some(activity) => Screen::Activity(activity.item()),
    }
}

/// Whether the activity is showing its results
pub fn is_finished(activity: &Activity) -> bool {
    match activity {
        Activity::Reading(view) => view.result.is_some(),
        Activity::Listening(view) => view.result.is_some(),
        Activity::Writing(view) => view.report.is_some(),
        Activity::Speaking(view) => !view.session.is_recording() && view.session.score().is_some(),
        Activity::Dictionary(view) => view.entry.is_some(),
    }
}
