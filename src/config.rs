use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, PrepError};

/// Environment variable holding the extraction service credential
pub const API_KEY_ENV: &str = "SUBTITLE_EXTRACTOR_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Base URL of the extraction REST API
    pub api_url: String,
    /// Update channel endpoint; the API key is appended as `?token=`
    pub ws_url: String,
    /// Bearer credential. Normally supplied through the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Extraction method, passed to the service verbatim
    pub method: String,
    /// Language hint, passed to the service verbatim
    pub language: String,
    /// Where the downloaded subtitle file is written
    pub output_path: PathBuf,
    /// Upper bound on the wait for a terminal job status. Unset waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Root directory for audio segments and the dataset table
    pub output_dir: PathBuf,
    /// Segment directory, relative to `output_dir`
    pub audio_dir: String,
    /// Dataset table file name, relative to `output_dir`
    pub dataset_file: String,
    /// What to do with a subtitle block that cannot be parsed
    pub on_malformed: MalformedPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedPolicy {
    /// Abort: fail the whole file on the first malformed block
    #[default]
    Abort,
    /// Skip: log the malformed block and keep going
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Sample rate of the demultiplexed audio track
    pub sample_rate: u32,
    /// Channel count of the demultiplexed audio track
    pub channels: u16,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_url: "https://subtitleextractor.com/api/v1".to_string(),
            ws_url: "wss://api.subtitleextractor.com/updates".to_string(),
            api_key: None,
            method: "vision".to_string(),
            language: "Auto-Detect".to_string(),
            output_path: PathBuf::from("subtitle.srt"),
            completion_timeout_secs: None,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            audio_dir: "audios".to_string(),
            dataset_file: "dataset.csv".to_string(),
            on_malformed: MalformedPolicy::Abort,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            sample_rate: 16000,
            channels: 1,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PrepError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| PrepError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;

        std::fs::write(path, content)
            .map_err(|e| PrepError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PrepError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Override the API key with a value taken from the environment, if any.
    /// Empty values are ignored.
    pub fn apply_api_key(&mut self, env_value: Option<String>) {
        if let Some(key) = env_value.filter(|k| !k.trim().is_empty()) {
            self.extractor.api_key = Some(key);
        }
    }

    /// Copy of the configuration that is safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.extractor.api_key.is_some() {
            copy.extractor.api_key = Some("<redacted>".to_string());
        }
        copy
    }
}

impl DatasetConfig {
    pub fn audio_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.audio_dir)
    }

    pub fn table_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.dataset_file)
    }
}
