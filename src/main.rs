use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use log::{error, info, warn};
use parlance::{
    app::App,
    app_dirs::AppDirs,
    audio::{read_wav_clip, AudioSink, OutputSink},
    config::{Config, ConfigStore, FileConfigStore},
    dictionary::{self, DictionaryEntry},
    generator::{ContentGenerator, GeminiClient},
    logging, passages,
    quiz::Level,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    scorer::score_passage,
    text::normalize,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use serde_json::json;
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use tokio::runtime::Runtime;

const TICK_RATE_MS: u64 = 100;

/// english practice in the terminal with a forgiving pronunciation scorer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Practise English reading, listening, writing and speaking. Quizzes, stories and narration come from a hosted model; the speaking test scores how much of a passage you read aloud, forgiving small slips."
)]
pub struct Cli {
    /// level the generated material is pitched at
    #[clap(short = 'l', long, value_enum)]
    level: Option<Level>,

    /// never call the hosted model; only the speaking test with built-in passages works
    #[clap(long)]
    offline: bool,

    /// number of questions per reading or listening quiz
    #[clap(short = 'q', long)]
    questions: Option<usize>,

    /// store the level, question count and offline flag as the new defaults
    #[clap(long)]
    save_config: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// score a transcript against the passage it was read from
    Score {
        /// the passage that should have been read
        #[clap(long)]
        target: String,

        /// what was actually heard
        #[clap(long)]
        spoken: String,

        /// print the result as JSON
        #[clap(long)]
        json: bool,
    },
    /// transcribe a WAV recording and score it
    Speak {
        /// passage text or the title of a built-in passage; a random built-in one when omitted
        #[clap(long)]
        passage: Option<String>,

        /// recording of the passage being read aloud
        #[clap(long)]
        audio: PathBuf,

        /// print the result as JSON
        #[clap(long)]
        json: bool,
    },
    /// look a word up in the dictionary
    Lookup { word: String },
}

impl Cli {
    /// Flags override the stored configuration for this run.
    fn apply(&self, config: &mut Config) {
        if let Some(level) = self.level {
            config.level = level;
        }
        if let Some(questions) = self.questions {
            config.questions_per_quiz = questions.max(1);
        }
        if self.offline {
            config.offline = true;
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        None => logging::init_file_logging(),
        Some(_) => logging::init_stderr_logging(),
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);
    if cli.save_config {
        store.save(&config)?;
        info!("saved configuration to {}", store.path().display());
    }

    match cli.command {
        None => run_tui(config),
        Some(command) => {
            if let Err(e) = run_command(command, &config) {
                error!("{e}");
                eprintln!("{}", e.user_message());
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn run_command(command: Command, config: &Config) -> parlance::Result<()> {
    match command {
        Command::Score {
            target,
            spoken,
            json,
        } => {
            println!("{}", report_score(&target, &spoken, json)?);
        }
        Command::Speak {
            passage,
            audio,
            json,
        } => {
            let target = match passage {
                Some(text) => match passages::by_title(&text)? {
                    Some(builtin) => builtin.text,
                    None => text,
                },
                None => {
                    let builtin = passages::random_passage()?;
                    eprintln!("passage: {}", builtin.title);
                    builtin.text
                }
            };
            let clip = read_wav_clip(&audio)?;
            let generator = GeminiClient::from_config(config)?;
            let spoken = Runtime::new()?.block_on(generator.transcribe(&clip))?;
            println!("{}", report_score(&target, &spoken, json)?);
        }
        Command::Lookup { word } => {
            let generator = GeminiClient::from_config(config)?;
            let entry = Runtime::new()?.block_on(dictionary::lookup(&generator, &word))?;
            println!("{}", format_entry(&entry));
        }
    }
    Ok(())
}

fn report_score(target: &str, spoken: &str, as_json: bool) -> Result<String, serde_json::Error> {
    let target_words = normalize(target);
    let spoken_words = normalize(spoken);
    let result = score_passage(&target_words, &spoken_words);

    if as_json {
        return serde_json::to_string_pretty(&json!({
            "score": result.score,
            "matched_indices": result.matched_indices,
            "target": target_words,
            "spoken": spoken_words,
        }));
    }

    let missed = target_words
        .iter()
        .enumerate()
        .filter(|(i, _)| !result.matched_indices.contains(i))
        .map(|(_, w)| w)
        .join(" ");
    let mut report = format!(
        "score {} ({}/{} words)",
        result.score,
        result.matched(),
        target_words.len()
    );
    if !missed.is_empty() {
        report.push_str(&format!("\nmissed: {missed}"));
    }
    Ok(report)
}

fn format_entry(entry: &DictionaryEntry) -> String {
    let mut out = format!("{} {} ({})", entry.word, entry.phonetic, entry.part_of_speech);
    for (i, definition) in entry.definitions.iter().enumerate() {
        out.push_str(&format!("\n  {}. {definition}", i + 1));
    }
    for example in &entry.examples {
        out.push_str(&format!("\n  \"{example}\""));
    }
    if !entry.synonyms.is_empty() {
        out.push_str(&format!("\n  synonyms: {}", entry.synonyms.iter().join(", ")));
    }
    out
}

fn run_tui(config: Config) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let generator = if config.offline {
        None
    } else {
        match GeminiClient::from_config(&config) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("{e}; only the offline speaking test is available");
                None
            }
        }
    };
    let rt = Runtime::new()?;
    let mut app = App::new(config, generator, OutputSink::open(AppDirs::audio_dir()));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &rt);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, G: ContentGenerator, S: AudioSink>(
    terminal: &mut Terminal<B>,
    app: &mut App<G, S>,
    rt: &Runtime,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        // the loading screen is on screen now; run the slow call
        if app.pending.is_some() {
            rt.block_on(app.run_pending());
            continue;
        }

        match runner.step() {
            AppEvent::Key(key) => app.on_key(key),
            AppEvent::Resize => {}
            AppEvent::Tick => app.on_tick(),
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
