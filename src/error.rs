use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no API key configured (set GEMINI_API_KEY or api_key in the config file)")]
    MissingCredentials,

    #[error("request to content generator failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content generator returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("malformed response from content generator: {0}")]
    MalformedResponse(String),

    #[error("could not decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no speech was detected")]
    NoSpeech,

    #[error("speech recognition is not available")]
    RecognitionUnsupported,

    #[error("microphone permission was denied")]
    PermissionDenied,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("audio encoding failed: {0}")]
    Audio(#[from] hound::Error),

    #[error("no audio output: {0}")]
    Output(#[from] rodio::StreamError),

    #[error("could not start playback: {0}")]
    Playback(#[from] rodio::PlayError),
}

impl Error {
    /// Static text shown to the learner; the full error goes to the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::MissingCredentials => {
                "No API key found. Set GEMINI_API_KEY and try again."
            }
            Error::Http(_) | Error::Service { .. } => {
                "Could not reach the content service. Please start a new test."
            }
            Error::MalformedResponse(_) | Error::Json(_) => {
                "The generated content was not usable. Please start a new test."
            }
            Error::NoSpeech => "We didn't catch any speech. Try recording again.",
            Error::RecognitionUnsupported => {
                "Speech recognition is not available on this system."
            }
            Error::PermissionDenied => {
                "Microphone access was denied. Grant access to keep practising."
            }
            Error::InvalidInput(_) => "Please check your input and try again.",
            Error::Io(_) | Error::Audio(_) => "Something went wrong on this machine.",
            Error::Output(_) | Error::Playback(_) => "Audio could not be played on this machine.",
        }
    }
}
