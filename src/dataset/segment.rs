use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::audio::Waveform;
use crate::error::Result;
use crate::media::MediaProcessorTrait;
use crate::subtitle::{SubtitleEntry, format_srt_time};
use super::DatasetRow;

/// File name of the `idx`-th segment
pub fn segment_file_name(idx: usize) -> String {
    format!("segment_{:04}.wav", idx)
}

/// Cuts one WAV clip per subtitle entry out of a video's audio track
pub struct AudioSegmenter<'a> {
    media: &'a dyn MediaProcessorTrait,
}

impl<'a> AudioSegmenter<'a> {
    pub fn new(media: &'a dyn MediaProcessorTrait) -> Self {
        Self { media }
    }

    /// Write `segment_NNNN.wav` into `output_dir` for each entry, in order,
    /// and return the matching dataset rows.
    pub async fn extract_segments<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        entries: &[SubtitleEntry],
        output_dir: Q,
    ) -> Result<Vec<DatasetRow>> {
        let video_path = video_path.as_ref();
        let output_dir = output_dir.as_ref();
        info!("Extracting {} audio segments from {}", entries.len(), video_path.display());

        fs::create_dir_all(output_dir).await?;

        // Removed on drop, including on the error paths below
        let full_audio = tempfile::Builder::new()
            .prefix("asrprep-audio-")
            .suffix(".wav")
            .tempfile()?;

        self.media.extract_audio(video_path, full_audio.path()).await?;
        let waveform = Waveform::open(full_audio.path())?;
        let audio_ms = waveform.duration_ms();

        let mut rows = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let segment_path = output_dir.join(segment_file_name(idx));
            if segment_path.exists() {
                warn!(
                    "{} already exists and will be overwritten; rows from an earlier run may point at it",
                    segment_path.display()
                );
            }

            if (entry.end_time * 1000.0).round() > audio_ms {
                warn!(
                    "Segment {} ({} --> {}) runs past the end of the audio ({}), clip will be short",
                    idx,
                    format_srt_time(entry.start_time),
                    format_srt_time(entry.end_time),
                    format_srt_time(audio_ms / 1000.0)
                );
            }

            let samples = waveform.slice_seconds(entry.start_time, entry.end_time);
            waveform.write_samples(&segment_path, samples)?;
            debug!("Wrote {} ({} samples)", segment_path.display(), samples.len());

            rows.push(DatasetRow {
                text: entry.text.clone(),
                audio_path: segment_path.to_string_lossy().into_owned(),
                start_time: entry.start_time,
                end_time: entry.end_time,
                duration: entry.duration,
            });
        }

        full_audio.close()?;

        info!("Wrote {} segments to {}", rows.len(), output_dir.display());
        Ok(rows)
    }
}
