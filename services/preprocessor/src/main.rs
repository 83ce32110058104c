//! Time-atlas preprocessor CLI.
//!
//! `build` runs the full fetch/aggregate/write pipeline for a preset;
//! `inspect` prints the metadata of an existing container.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use preprocessor::inspect::describe;
use preprocessor::{Pipeline, PresetConfig, PRODUCTION_PRESET};
use record_source::HttpPageSource;

#[derive(Parser, Debug)]
#[command(name = "preprocessor")]
#[command(about = "Build and inspect time-atlas visualization containers")]
struct Args {
    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch records and write a container
    Build {
        /// YAML file of named presets
        #[arg(long, env = "PRESETS_FILE")]
        config: Option<PathBuf>,

        /// Preset to run
        #[arg(long, env = "PRESET", default_value = PRODUCTION_PRESET)]
        preset: String,

        /// Output path, overriding the preset and OUTPUT_PATH
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the discovered vocabulary as JSON
        #[arg(long)]
        vocabulary_out: Option<PathBuf>,
    },

    /// Print a container's metadata without decoding its sections
    Inspect {
        file: PathBuf,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs);

    match args.command {
        Command::Build {
            config,
            preset,
            output,
            vocabulary_out,
        } => build(config, &preset, output, vocabulary_out).await,
        Command::Inspect { file } => {
            let metadata = container::read_metadata(&file)
                .with_context(|| format!("Failed to read container: {}", file.display()))?;
            print!("{}", describe(&metadata));
            Ok(())
        }
    }
}

async fn build(
    presets_file: Option<PathBuf>,
    preset_name: &str,
    output: Option<PathBuf>,
    vocabulary_out: Option<PathBuf>,
) -> Result<()> {
    let mut preset = PresetConfig::resolve(presets_file.as_deref(), preset_name)?;
    preset.apply_env();
    if let Some(output) = output {
        preset.output_path = output;
    }

    info!(
        preset = preset_name,
        base_url = %preset.database.base_url,
        output = %preset.output_path.display(),
        "Starting build"
    );

    let source = HttpPageSource::new(&preset.database).context("Failed to create HTTP client")?;
    let pipeline = Pipeline::new(preset, source).context("Invalid preset")?;
    let report = pipeline.run().await.context("Build failed")?;

    if let Some(path) = vocabulary_out {
        let json = report.vocabulary.to_json()?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write vocabulary: {}", path.display()))?;
        info!(path = %path.display(), "Vocabulary written");
    }

    Ok(())
}
