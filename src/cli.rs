use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract subtitles from a video with the remote extraction service
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the downloaded subtitle file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extraction method sent to the service
        #[arg(long)]
        method: Option<String>,

        /// Language hint sent to the service
        #[arg(long)]
        language: Option<String>,
    },

    /// Slice a video's audio along its subtitles and append to the dataset
    Dataset {
        /// Input video file
        #[arg(short = 'i', long)]
        video: PathBuf,

        /// Subtitle file for the video
        #[arg(short, long)]
        srt: PathBuf,

        /// Dataset root directory (audio clips and dataset.csv)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Parse a subtitle file and print its entries as JSON
    Parse {
        /// Subtitle file
        #[arg(short, long)]
        srt: PathBuf,
    },

    /// Print the effective configuration
    Config,
}
