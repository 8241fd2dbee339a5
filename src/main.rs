//! asrprep - ASR training data preparation
//!
//! Entry point for the `extract`, `dataset`, `parse` and `config` commands.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use asrprep::cli::{Args, Commands};
use asrprep::config::{API_KEY_ENV, Config};
use asrprep::extractor::{ExtractionPipeline, SubtitleExtractorClient};
use asrprep::subtitle::parse_srt_file;
use asrprep::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let dotenv_path = dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;
    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    config.apply_api_key(std::env::var(API_KEY_ENV).ok());

    match args.command {
        Commands::Extract { input, output, method, language } => {
            if let Some(output) = output {
                config.extractor.output_path = output;
            }
            if let Some(method) = method {
                config.extractor.method = method;
            }
            if let Some(language) = language {
                config.extractor.language = language;
            }

            // Failures are logged, not propagated
            match SubtitleExtractorClient::new(config.extractor.clone()) {
                Ok(client) => {
                    let pipeline = ExtractionPipeline::new(client, &config.extractor);
                    if let Some(path) = pipeline.run_process(&input).await {
                        println!("{}", path.display());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Subtitle extraction failed: {}", e),
            }
        }
        Commands::Dataset { video, srt, output_dir } => {
            info!("Processing video {} with subtitles {}", video.display(), srt.display());

            let workflow = Workflow::new(config);
            workflow.check_dependencies().await?;
            let table = workflow.process_video_and_srt(&video, &srt, output_dir.as_ref()).await?;
            println!("Dataset now holds {} rows", table.len());
        }
        Commands::Parse { srt } => {
            let entries = parse_srt_file(&srt, config.dataset.on_malformed).await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Config => {
            print!("{}", config.redacted().to_toml()?);
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".asrprep").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "asrprep.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("asrprep.log").display());

    Ok(())
}
