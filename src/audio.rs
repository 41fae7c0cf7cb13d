use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use log::{debug, info, warn};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::error::{Error, Result};
use crate::generator::ContentGenerator;

/// Sample rate of synthesized speech
pub const SAMPLE_RATE: u32 = 24_000;

/// Mono 16-bit PCM clip at [`SAMPLE_RATE`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    pub samples: Vec<i16>,
}

impl PcmAudio {
    /// Decode raw little-endian 16-bit samples.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(Error::MalformedResponse(format!(
                "PCM payload has odd length {}",
                bytes.len()
            )));
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Self { samples })
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / SAMPLE_RATE as f64)
    }

    /// Wrap the samples in a WAV container.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }
}

/// Read a recorded clip from disk, rejecting files with no samples.
pub fn read_wav_clip(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)?;
    let reader = hound::WavReader::new(Cursor::new(&bytes))?;
    if reader.duration() == 0 {
        return Err(Error::NoSpeech);
    }
    Ok(bytes)
}

/// Somewhere synthesized speech can be played
pub trait AudioSink {
    /// Start `clip`, cutting off whatever this sink was playing.
    fn play(&mut self, clip: &PcmAudio) -> Result<()>;
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

/// Plays clips on the default output device
pub struct DeviceSink {
    // dropping the stream silences every sink created from its handle
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
}

impl DeviceSink {
    pub fn try_default() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
            sink: None,
        })
    }
}

impl AudioSink for DeviceSink {
    fn play(&mut self, clip: &PcmAudio) -> Result<()> {
        self.stop();
        let sink = Sink::try_new(&self.handle)?;
        sink.append(SamplesBuffer::new(1, SAMPLE_RATE, clip.samples.clone()));
        debug!("playing {:.1}s of narration", clip.duration().as_secs_f64());
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }
}

/// Fallback for machines without an output device: each clip is written to a
/// WAV file and handed to the system's default player.
///
/// An external player cannot be interrupted, so `stop` only deletes the file.
/// At most one narration file exists at a time.
#[derive(Debug)]
pub struct WavFileSink {
    dir: PathBuf,
    launch: bool,
    current: Option<PathBuf>,
    ends: Option<Instant>,
}

impl WavFileSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            launch: true,
            current: None,
            ends: None,
        }
    }

    /// Write files without opening them
    pub fn silent<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            launch: false,
            ..Self::new(dir)
        }
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }
}

impl AudioSink for WavFileSink {
    fn play(&mut self, clip: &PcmAudio) -> Result<()> {
        self.stop();
        std::fs::create_dir_all(&self.dir)?;
        let name = format!("narration-{}.wav", Local::now().format("%Y%m%d-%H%M%S%3f"));
        let path = self.dir.join(name);
        std::fs::write(&path, clip.to_wav_bytes()?)?;
        debug!("wrote narration to {}", path.display());

        if self.launch {
            webbrowser::open(&path.to_string_lossy())?;
        }
        self.current = Some(path);
        self.ends = Some(Instant::now() + clip.duration());
        Ok(())
    }

    fn stop(&mut self) {
        self.ends = None;
        if let Some(path) = self.current.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!("could not remove {}: {e}", path.display());
            }
        }
    }

    fn is_playing(&self) -> bool {
        self.ends.is_some_and(|ends| Instant::now() < ends)
    }
}

/// The output device when there is one, WAV files otherwise
pub enum OutputSink {
    Device(DeviceSink),
    File(WavFileSink),
}

impl OutputSink {
    pub fn open<P: AsRef<Path>>(fallback_dir: P) -> Self {
        match DeviceSink::try_default() {
            Ok(device) => OutputSink::Device(device),
            Err(e) => {
                warn!(
                    "{e}; narration will be written to {}",
                    fallback_dir.as_ref().display()
                );
                OutputSink::File(WavFileSink::new(fallback_dir))
            }
        }
    }
}

impl AudioSink for OutputSink {
    fn play(&mut self, clip: &PcmAudio) -> Result<()> {
        match self {
            OutputSink::Device(sink) => sink.play(clip),
            OutputSink::File(sink) => sink.play(clip),
        }
    }

    fn stop(&mut self) {
        match self {
            OutputSink::Device(sink) => sink.stop(),
            OutputSink::File(sink) => sink.stop(),
        }
    }

    fn is_playing(&self) -> bool {
        match self {
            OutputSink::Device(sink) => sink.is_playing(),
            OutputSink::File(sink) => sink.is_playing(),
        }
    }
}

/// Single-voice playback with a speech cache keyed by source text
pub struct SpeechPlayer<S: AudioSink> {
    sink: S,
    cache: HashMap<String, PcmAudio>,
    playing: Option<String>,
}

impl<S: AudioSink> SpeechPlayer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            cache: HashMap::new(),
            playing: None,
        }
    }

    /// Speak `text`, synthesizing it only the first time it is requested.
    pub async fn play<G: ContentGenerator>(&mut self, generator: &G, text: &str) -> Result<()> {
        self.stop();

        if !self.cache.contains_key(text) {
            info!("synthesizing speech for {} chars", text.len());
            let clip = generator.synthesize_speech(text).await?;
            if clip.is_empty() {
                return Err(Error::NoSpeech);
            }
            self.cache.insert(text.to_string(), clip);
        }

        if let Some(clip) = self.cache.get(text) {
            self.sink.play(clip)?;
            self.playing = Some(text.to_string());
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.playing.take().is_some() {
            self.sink.stop();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some() && self.sink.is_playing()
    }

    pub fn is_cached(&self, text: &str) -> bool {
        self.cache.contains_key(text)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: AudioSink> Drop for SpeechPlayer<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
