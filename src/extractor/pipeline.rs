use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::ExtractorConfig;
use crate::error::{Result, PrepError};
use super::{ExtractionService, JobOutcome};

/// Drives one video through the extraction service and saves the subtitles
pub struct ExtractionPipeline<S: ExtractionService> {
    service: S,
    method: String,
    language: String,
    output_path: PathBuf,
}

impl<S: ExtractionService> ExtractionPipeline<S> {
    pub fn new(service: S, config: &ExtractorConfig) -> Self {
        Self {
            service,
            method: config.method.clone(),
            language: config.language.clone(),
            output_path: config.output_path.clone(),
        }
    }

    /// Upload, extract, wait and download. Stops at the first failing step.
    pub async fn run<P: AsRef<Path>>(&self, video_path: P) -> Result<PathBuf> {
        let video_path = video_path.as_ref();
        info!("Extracting subtitles from {}", video_path.display());

        if !video_path.exists() {
            return Err(PrepError::FileNotFound(video_path.display().to_string()));
        }

        let slot = self.service.request_upload_slot().await?;
        self.service.upload_file(video_path, &slot.upload_url).await?;

        let job = self
            .service
            .create_extraction_job(&slot.upload_id, &self.method, &self.language)
            .await?;

        match self.service.await_completion(&job.id).await? {
            JobOutcome::Succeeded(output_url) => {
                self.service.download_artifact(&output_url, &self.output_path).await?;
                info!("Subtitles saved to {}", self.output_path.display());
                Ok(self.output_path.clone())
            }
            JobOutcome::Failed(reason) => Err(PrepError::Service(format!(
                "Extraction job {} failed: {}",
                job.id, reason
            ))),
            JobOutcome::ConnectionClosed => Err(PrepError::Channel(
                "Update channel closed before the job completed".to_string(),
            )),
        }
    }

    /// Like [`run`](Self::run), but any error is logged and swallowed
    pub async fn run_process<P: AsRef<Path>>(&self, video_path: P) -> Option<PathBuf> {
        let video_path = video_path.as_ref();
        match self.run(video_path).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!(video = %video_path.display(), error = ?e, "Subtitle extraction failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ExtractionJob, JobStatus, MockExtractionService, UploadDescriptor};
    use mockall::Sequence;

    fn config(output: &Path) -> ExtractorConfig {
        ExtractorConfig {
            method: "vision".to_string(),
            language: "Auto-Detect".to_string(),
            output_path: output.to_path_buf(),
            ..ExtractorConfig::default()
        }
    }

    fn slot() -> UploadDescriptor {
        UploadDescriptor {
            upload_url: "https://storage.test/put?sig=1".to_string(),
            upload_id: "upload-1".to_string(),
        }
    }

    fn job() -> ExtractionJob {
        ExtractionJob {
            id: "job-1".to_string(),
            status: Some(JobStatus::Pending),
            output_url: None,
        }
    }

    #[tokio::test]
    async fn test_happy_path_runs_steps_in_order() {
        let video = tempfile::NamedTempFile::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("subtitle.srt");

        let mut seq = Sequence::new();
        let mut service = MockExtractionService::new();
        service
            .expect_request_upload_slot()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(slot()));
        let video_path = video.path().to_path_buf();
        service
            .expect_upload_file()
            .withf(move |path, url| path == video_path && url == "https://storage.test/put?sig=1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        service
            .expect_create_extraction_job()
            .withf(|id, method, language| id == "upload-1" && method == "vision" && language == "Auto-Detect")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(job()));
        service
            .expect_await_completion()
            .withf(|id| id == "job-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(JobOutcome::Succeeded("https://cdn.test/out.srt".to_string())));
        let expected_dest = dest.clone();
        service
            .expect_download_artifact()
            .withf(move |url, path| url == "https://cdn.test/out.srt" && path == expected_dest)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(42));

        let pipeline = ExtractionPipeline::new(service, &config(&dest));
        assert_eq!(pipeline.run(video.path()).await.unwrap(), dest);
    }

    #[tokio::test]
    async fn test_job_creation_failure_never_subscribes() {
        let video = tempfile::NamedTempFile::new().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut service = MockExtractionService::new();
        service.expect_request_upload_slot().returning(|| Ok(slot()));
        service.expect_upload_file().returning(|_, _| Ok(()));
        service.expect_create_extraction_job().times(1).returning(|_, _, _| {
            Err(PrepError::Service("Extraction creation failed: quota exceeded".to_string()))
        });
        service.expect_await_completion().times(0);
        service.expect_download_artifact().times(0);

        let pipeline = ExtractionPipeline::new(service, &config(&dir.path().join("s.srt")));
        match pipeline.run(video.path()).await {
            Err(PrepError::Service(message)) => assert!(message.contains("quota exceeded")),
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_process_logs_job_creation_failure() {
        use crate::test_support::CapturedLogs;
        use tracing::instrument::WithSubscriber;

        let video = tempfile::NamedTempFile::new().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut service = MockExtractionService::new();
        service.expect_request_upload_slot().returning(|| Ok(slot()));
        service.expect_upload_file().returning(|_, _| Ok(()));
        service.expect_create_extraction_job().returning(|_, _, _| {
            Err(PrepError::Service("Extraction creation failed: quota exceeded".to_string()))
        });
        service.expect_await_completion().times(0);

        let logs = CapturedLogs::default();
        let pipeline = ExtractionPipeline::new(service, &config(&dir.path().join("s.srt")));
        let saved = pipeline
            .run_process(video.path())
            .with_subscriber(logs.subscriber())
            .await;

        assert!(saved.is_none());
        let logs = logs.contents();
        let line = logs
            .lines()
            .find(|l| l.contains("ERROR"))
            .unwrap_or_else(|| panic!("no error logged:\n{}", logs));
        assert!(line.contains("Subtitle extraction failed"));
        assert!(line.contains("Service("));
        assert!(line.contains("quota exceeded"));
        assert!(line.contains(&video.path().display().to_string()));
    }

    #[tokio::test]
    async fn test_run_process_swallows_errors() {
        let video = tempfile::NamedTempFile::new().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut service = MockExtractionService::new();
        service.expect_request_upload_slot().returning(|| Ok(slot()));
        service
            .expect_upload_file()
            .returning(|_, _| Err(PrepError::Upload("File upload failed with status 403".to_string())));
        service.expect_create_extraction_job().times(0);
        service.expect_await_completion().times(0);

        let pipeline = ExtractionPipeline::new(service, &config(&dir.path().join("s.srt")));
        assert!(pipeline.run_process(video.path()).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_job_skips_download() {
        let video = tempfile::NamedTempFile::new().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut service = MockExtractionService::new();
        service.expect_request_upload_slot().returning(|| Ok(slot()));
        service.expect_upload_file().returning(|_, _| Ok(()));
        service.expect_create_extraction_job().returning(|_, _, _| Ok(job()));
        service
            .expect_await_completion()
            .returning(|_| Ok(JobOutcome::Failed("no text found".to_string())));
        service.expect_download_artifact().times(0);

        let pipeline = ExtractionPipeline::new(service, &config(&dir.path().join("s.srt")));
        match pipeline.run(video.path()).await {
            Err(PrepError::Service(message)) => {
                assert!(message.contains("job-1"));
                assert!(message.contains("no text found"));
            }
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_channel_is_channel_error() {
        let video = tempfile::NamedTempFile::new().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut service = MockExtractionService::new();
        service.expect_request_upload_slot().returning(|| Ok(slot()));
        service.expect_upload_file().returning(|_, _| Ok(()));
        service.expect_create_extraction_job().returning(|_, _, _| Ok(job()));
        service
            .expect_await_completion()
            .returning(|_| Ok(JobOutcome::ConnectionClosed));
        service.expect_download_artifact().times(0);

        let pipeline = ExtractionPipeline::new(service, &config(&dir.path().join("s.srt")));
        assert!(matches!(pipeline.run(video.path()).await, Err(PrepError::Channel(_))));
    }

    #[tokio::test]
    async fn test_missing_video_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();

        let mut service = MockExtractionService::new();
        service.expect_request_upload_slot().times(0);

        let pipeline = ExtractionPipeline::new(service, &config(&dir.path().join("s.srt")));
        let result = pipeline.run(dir.path().join("missing.mp4")).await;
        assert!(matches!(result, Err(PrepError::FileNotFound(_))));
    }
}
