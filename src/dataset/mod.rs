// Dataset building
//
// - Segment: slice the audio track of a video along subtitle timings
// - Writer: append rows to the CSV dataset table

pub mod segment;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use segment::*;
pub use writer::*;

/// One row of the dataset table: an audio clip and its transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub text: String,
    pub audio_path: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
}
