use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("parlance"))
        } else {
            ProjectDirs::from("", "", "parlance").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("parlance.log"))
    }

    /// Where narration WAV files are written for playback
    pub fn audio_dir() -> PathBuf {
        ProjectDirs::from("", "", "parlance")
            .map(|pd| pd.cache_dir().join("audio"))
            .unwrap_or_else(|| std::env::temp_dir().join("parlance-audio"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_file_name() {
        if let Some(path) = AppDirs::log_path() {
            assert_eq!(path.file_name().unwrap(), "parlance.log");
        }
    }

    #[test]
    fn test_audio_dir_is_named() {
        assert!(AppDirs::audio_dir().to_string_lossy().contains("audio"));
    }
}
