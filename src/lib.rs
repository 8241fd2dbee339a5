//! asrprep - ASR training data preparation
//!
//! Two pipelines: extracting subtitles from a video through a remote
//! subtitle-extraction service, and slicing a video's audio track into one
//! clip per subtitle line recorded in a CSV dataset.

pub mod audio;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extractor;
pub mod media;
pub mod subtitle;
pub mod workflow;

#[cfg(test)]
mod test_support;
