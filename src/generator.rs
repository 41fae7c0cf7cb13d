use base64::{engine::general_purpose, Engine as _};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audio::PcmAudio;
use crate::config::Config;
use crate::error::{Error, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// The hosted model that writes quizzes, reads text aloud and hears recordings.
#[allow(async_fn_in_trait)]
pub trait ContentGenerator {
    /// Ask for JSON that follows `schema`.
    async fn generate_json(&self, prompt: &str, schema: &Value) -> Result<Value>;

    /// Read `text` aloud.
    async fn synthesize_speech(&self, text: &str) -> Result<PcmAudio>;

    /// Transcribe a WAV recording.
    async fn transcribe(&self, wav: &[u8]) -> Result<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_parts(self) -> Result<Vec<ResponsePart>> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::Service {
                status: 200,
                message: format!("prompt blocked: {reason}"),
            });
        }

        self.candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| Error::MalformedResponse("response has no candidates".into()))
    }

    fn text(self) -> Result<String> {
        let text: String = self
            .into_parts()?
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            return Err(Error::MalformedResponse("response has no text".into()));
        }
        Ok(text)
    }

    fn audio(self) -> Result<PcmAudio> {
        let inline = self
            .into_parts()?
            .into_iter()
            .find_map(|part| part.inline_data)
            .ok_or_else(|| Error::MalformedResponse("response has no audio".into()))?;

        debug!("received audio as {}", inline.mime_type);
        let bytes = general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| Error::MalformedResponse(format!("audio is not base64: {e}")))?;
        PcmAudio::from_le_bytes(&bytes)
    }
}

/// Client for the Gemini `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    text_model: String,
    speech_model: String,
    voice: String,
}

impl GeminiClient {
    pub fn new(api_key: String, text_model: String, speech_model: String, voice: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            text_model,
            speech_model,
            voice,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or(Error::MissingCredentials)?;
        Ok(Self::new(
            api_key,
            config.text_model.clone(),
            config.speech_model.clone(),
            config.voice.clone(),
        ))
    }

    async fn send(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{API_BASE}/{model}:generateContent");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("{model} answered {status}");
            return Err(Error::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl ContentGenerator for GeminiClient {
    async fn generate_json(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(schema.clone()),
                ..GenerationConfig::default()
            }),
        };

        let text = self.send(&self.text_model, &request).await?.text()?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn synthesize_speech(&self, text: &str) -> Result<PcmAudio> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".into()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.voice.clone(),
                        },
                    },
                }),
                ..GenerationConfig::default()
            }),
        };

        self.send(&self.speech_model, &request).await?.audio()
    }

    async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: "Transcribe the following audio exactly as spoken. Only return \
                               the transcription text without any commentary or formatting. \
                               If nothing is said, return an empty line."
                            .to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "audio/wav".to_string(),
                            data: general_purpose::STANDARD.encode(wav),
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                ..GenerationConfig::default()
            }),
        };

        match self.send(&self.text_model, &request).await?.text() {
            Ok(text) => Ok(text.trim().to_string()),
            Err(Error::MalformedResponse(_)) => Err(Error::NoSpeech),
            Err(e) => Err(e),
        }
    }
}

/// Canned generator used by unit tests across the crate
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeGenerator {
        pub json_replies: Mutex<VecDeque<Value>>,
        pub transcript: String,
        pub silent_speech: bool,
        pub prompts: Mutex<Vec<String>>,
        speech_calls: AtomicUsize,
    }

    impl FakeGenerator {
        pub fn replying(replies: Vec<Value>) -> Self {
            Self {
                json_replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        /// Synthesizes empty clips
        pub fn silent() -> Self {
            Self {
                silent_speech: true,
                ..Self::default()
            }
        }

        pub fn speech_calls(&self) -> usize {
            self.speech_calls.load(Ordering::SeqCst)
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().cloned()
        }
    }

    impl ContentGenerator for FakeGenerator {
        async fn generate_json(&self, prompt: &str, _schema: &Value) -> Result<Value> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.json_replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Service {
                    status: 503,
                    message: "no canned reply".into(),
                })
        }

        async fn synthesize_speech(&self, text: &str) -> Result<PcmAudio> {
            self.speech_calls.fetch_add(1, Ordering::SeqCst);
            if self.silent_speech {
                return Ok(PcmAudio { samples: vec![] });
            }
            Ok(PcmAudio {
                samples: vec![0; text.len() * 10],
            })
        }

        async fn transcribe(&self, _wav: &[u8]) -> Result<String> {
            if self.transcript.trim().is_empty() {
                return Err(Error::NoSpeech);
            }
            Ok(self.transcript.clone())
        }
    }
}
