use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::config::{API_KEY_ENV, ExtractorConfig};
use crate::error::{Result, PrepError};
use super::{ExtractionJob, ExtractionService, JobOutcome, JobStatus, UpdateMessage, UploadDescriptor};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadSlotResponse {
    upload_url: Option<String>,
    upload_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobResponse {
    id: Option<String>,
    status: Option<JobStatus>,
    output_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP and update-channel client for the subtitle extraction service
pub struct SubtitleExtractorClient {
    config: ExtractorConfig,
    api_key: String,
    client: Client,
}

impl SubtitleExtractorClient {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PrepError::Auth(format!("No API key configured, set {}", API_KEY_ENV)))?;

        let client = Client::builder()
            .user_agent(concat!("asrprep/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, api_key, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    fn updates_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.config.ws_url)
            .map_err(|e| PrepError::Config(format!("Invalid ws_url {:?}: {}", self.config.ws_url, e)))?;
        url.query_pairs_mut().append_pair("token", &self.api_key);
        Ok(url)
    }

    /// Wait on the update channel without any time bound
    async fn listen(&self, job_id: &str) -> Result<JobOutcome> {
        let url = self.updates_url()?;
        debug!("Connecting to update channel {}", self.config.ws_url);

        let (mut socket, _) = connect_async(url.as_str()).await.map_err(|e| match e {
            tungstenite::Error::Http(ref response) if matches!(response.status().as_u16(), 401 | 403) => {
                PrepError::Auth(format!("Update channel rejected the API key (HTTP {})", response.status()))
            }
            other => PrepError::Channel(format!("Failed to connect to update channel: {}", other)),
        })?;

        let subscribe = json!({ "action": "subscribe", "jobId": job_id });
        socket
            .send(Message::Text(subscribe.to_string()))
            .await
            .map_err(|e| PrepError::Channel(format!("Failed to subscribe to job {}: {}", job_id, e)))?;
        info!("Subscribed to updates for job {}", job_id);

        while let Some(frame) = socket.next().await {
            let frame = frame.map_err(|e| PrepError::Channel(format!("Update channel failed: {}", e)))?;

            let text = match frame {
                Message::Text(text) => text,
                Message::Close(close) => {
                    info!("Update channel closed by server: {:?}", close);
                    return Ok(JobOutcome::ConnectionClosed);
                }
                _ => continue,
            };

            let update: UpdateMessage = match serde_json::from_str(&text) {
                Ok(update) => update,
                Err(e) => {
                    warn!("Ignoring unreadable update {:?}: {}", text, e);
                    continue;
                }
            };
            if update.kind.as_deref() != Some("status") {
                debug!("Ignoring update of type {:?}", update.kind);
                continue;
            }

            let outcome = match update.status {
                Some(JobStatus::Succeeded) => match update.output_url {
                    Some(output_url) => {
                        info!("Extraction completed. Subtitle URL: {}", output_url);
                        JobOutcome::Succeeded(output_url)
                    }
                    None => {
                        let _ = socket.close(None).await;
                        return Err(PrepError::Service(format!(
                            "Job {} succeeded without an output URL",
                            job_id
                        )));
                    }
                },
                Some(JobStatus::Failed) => {
                    let reason = update.message.unwrap_or_else(|| "unknown reason".to_string());
                    warn!("Extraction job {} failed: {}", job_id, reason);
                    JobOutcome::Failed(reason)
                }
                other => {
                    debug!("Job {} status: {:?}", job_id, other);
                    continue;
                }
            };

            if let Err(e) = socket.close(None).await {
                debug!("Closing update channel: {}", e);
            }
            return Ok(outcome);
        }

        info!("Update channel ended");
        Ok(JobOutcome::ConnectionClosed)
    }
}

/// Map a non-success response to the error taxonomy. 401/403 are credential
/// problems; anything else carries the remote `message` when there is one.
async fn check_response(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(PrepError::Auth(format!("{} rejected the API key (HTTP {})", what, status)));
    }

    let body = response.text().await.unwrap_or_default();
    debug!("{} error body: {}", what, body);
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| "Unknown error".to_string());

    Err(PrepError::Service(format!("{} failed: {} (HTTP {})", what, message, status)))
}

#[async_trait]
impl ExtractionService for SubtitleExtractorClient {
    async fn request_upload_slot(&self) -> Result<UploadDescriptor> {
        info!("Requesting presigned upload URL");

        let response = self
            .client
            .post(self.endpoint("upload/file"))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await?;
        let response = check_response(response, "Upload slot request").await?;

        let body: UploadSlotResponse = response
            .json()
            .await
            .map_err(|e| PrepError::Service(format!("Invalid presigned URL response: {}", e)))?;

        match (body.upload_url, body.upload_id) {
            (Some(upload_url), Some(upload_id)) if !upload_url.is_empty() && !upload_id.is_empty() => {
                debug!("Received upload slot {}", upload_id);
                Ok(UploadDescriptor { upload_url, upload_id })
            }
            _ => Err(PrepError::Service("Invalid presigned URL response".to_string())),
        }
    }

    async fn upload_file(&self, path: &Path, upload_url: &str) -> Result<()> {
        if !path.exists() {
            return Err(PrepError::FileNotFound(path.display().to_string()));
        }

        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        info!("Uploading {} ({} bytes)", path.display(), length);

        let response = self
            .client
            .put(upload_url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|e| PrepError::Upload(format!("File upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PrepError::Upload(format!(
                "File upload failed with status {}",
                status.as_u16()
            )));
        }

        info!("Upload completed");
        Ok(())
    }

    async fn create_extraction_job(
        &self,
        upload_id: &str,
        method: &str,
        language: &str,
    ) -> Result<ExtractionJob> {
        info!("Creating extraction job (method: {}, language: {})", method, language);

        let response = self
            .client
            .post(self.endpoint("extract"))
            .header(AUTHORIZATION, self.bearer())
            .json(&json!({
                "method": method,
                "uploadId": upload_id,
                "language": language,
            }))
            .send()
            .await?;
        let response = check_response(response, "Extraction creation").await?;

        let body: CreateJobResponse = response
            .json()
            .await
            .map_err(|e| PrepError::Service(format!("Invalid extraction response: {}", e)))?;

        let id = body
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PrepError::Service("No extraction ID received in response".to_string()))?;

        info!("Created extraction job {}", id);
        Ok(ExtractionJob {
            id,
            status: body.status,
            output_url: body.output_url,
        })
    }

    async fn await_completion(&self, job_id: &str) -> Result<JobOutcome> {
        match self.config.completion_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), self.listen(job_id))
                .await
                .map_err(|_| {
                    PrepError::Channel(format!("Timed out after {}s waiting for job {}", secs, job_id))
                })?,
            None => self.listen(job_id).await,
        }
    }

    async fn download_artifact(&self, output_url: &str, dest_path: &Path) -> Result<u64> {
        info!("Downloading subtitle file to {}", dest_path.display());

        let response = self.client.get(output_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PrepError::Service(format!("Subtitle download failed with status {}", status)));
        }

        if let Some(parent) = dest_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest_path).await?;

        let pb = match response.content_length() {
            Some(length) => ProgressBar::new(length),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }
        file.flush().await?;

        pb.finish_with_message("Download completed");
        info!("Download completed: {} bytes", written);
        Ok(written)
    }
}
