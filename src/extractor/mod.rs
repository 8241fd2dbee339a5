// Subtitle extraction service
//
// - Client: HTTP + update channel implementation of `ExtractionService`
// - Pipeline: upload → extract → wait → download, with top-level error logging

pub mod client;
pub mod pipeline;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use client::*;
pub use pipeline::*;

use crate::error::Result;

/// Presigned upload location issued by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDescriptor {
    pub upload_url: String,
    pub upload_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Remote extraction job as returned on creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionJob {
    pub id: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub output_url: Option<String>,
}

/// One frame received on the update channel
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<JobStatus>,
    pub output_url: Option<String>,
    pub message: Option<String>,
}

/// How the wait for a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded(String),
    Failed(String),
    ConnectionClosed,
}

/// Operations offered by the remote extraction service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Ask for a presigned upload location
    async fn request_upload_slot(&self) -> Result<UploadDescriptor>;

    /// Stream a local file to a presigned URL
    async fn upload_file(&self, path: &Path, upload_url: &str) -> Result<()>;

    /// Start an extraction job for an uploaded file
    async fn create_extraction_job(
        &self,
        upload_id: &str,
        method: &str,
        language: &str,
    ) -> Result<ExtractionJob>;

    /// Subscribe to job updates and wait for a terminal status
    async fn await_completion(&self, job_id: &str) -> Result<JobOutcome>;

    /// Download the produced subtitle file, returning the byte count
    async fn download_artifact(&self, output_url: &str, dest_path: &Path) -> Result<u64>;
}
