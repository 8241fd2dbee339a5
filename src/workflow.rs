use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::dataset::{AudioSegmenter, DatasetRow, append_dataset};
use crate::error::{Result, PrepError};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::subtitle::parse_srt_file;

/// Dataset pipeline: subtitles + video in, audio clips and table rows out
pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessorTrait>,
}

impl Workflow {
    pub fn new(config: Config) -> Self {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        Self::with_media(config, media)
    }

    pub fn with_media(config: Config, media: Box<dyn MediaProcessorTrait>) -> Self {
        Self { config, media }
    }

    /// Make sure ffmpeg can be run
    pub async fn check_dependencies(&self) -> Result<()> {
        self.media.check_availability().await
    }

    /// Parse `srt_path`, cut one clip per entry out of `video_path` into
    /// `<output_dir>/audios` and append the rows to `<output_dir>/dataset.csv`.
    /// Returns the whole table after the append.
    pub async fn process_video_and_srt<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        srt_path: P,
        output_dir: Option<Q>,
    ) -> Result<Vec<DatasetRow>> {
        let video_path = video_path.as_ref();
        let srt_path = srt_path.as_ref();

        if !video_path.exists() {
            return Err(PrepError::FileNotFound(video_path.display().to_string()));
        }

        let output_dir = match output_dir {
            Some(dir) => dir.as_ref().to_path_buf(),
            None => self.config.dataset.output_dir.clone(),
        };

        info!("Parsing SRT file...");
        let entries = parse_srt_file(srt_path, self.config.dataset.on_malformed).await?;

        info!("Extracting audio segments...");
        let segmenter = AudioSegmenter::new(self.media.as_ref());
        let rows = segmenter
            .extract_segments(video_path, &entries, self.config.dataset.audio_path(&output_dir))
            .await?;

        info!("Creating dataset file...");
        let table = append_dataset(&rows, self.config.dataset.table_path(&output_dir))?;

        info!("Dataset pipeline finished: {} new rows, {} total", rows.len(), table.len());
        Ok(table)
    }
}
