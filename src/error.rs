use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Extraction service error: {0}")]
    Service(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Update channel error: {0}")]
    Channel(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Subtitle parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, PrepError>;
