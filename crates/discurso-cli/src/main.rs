//! discurso — builds a topic-classified sentence corpus from quarterly report PDFs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use discurso_classify::Classifier;
use discurso_core::{CorpusPaths, PipelineConfig};
use discurso_corpus::{run_extraction, run_metadata, run_normalization, BatchOptions, DEFAULT_SOURCE};

#[derive(Parser)]
#[command(name = "discurso")]
#[command(about = "Extract, classify and enrich quarterly report text")]
struct Cli {
    /// Data root (defaults to $DISCURSO_DATA_DIR or ./data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract PDFs and write one bucket record per document
    Extract {
        /// Directory of PDFs (defaults to <data>/raw)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output root, partitioned by year (defaults to <data>/extracted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pipeline configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Also write <stem>.rejected.json next to each record
        #[arg(long)]
        keep_rejected: bool,
    },
    /// Normalize extracted records for annotation
    Normalize {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write metadata companions for preprocessed records
    Metadata {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Publishing institution recorded in every file
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: String,
    },
    /// Show how a single sentence would be filtered and bucketed
    Classify {
        #[arg(short, long)]
        sentence: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_classifier(config: Option<&Path>) -> Result<Classifier> {
    let config = PipelineConfig::load_or_default(config).context("loading pipeline config")?;
    Classifier::from_config(&config).context("compiling keyword tables")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let paths = match cli.data_dir {
        Some(dir) => CorpusPaths::new(dir),
        None => CorpusPaths::from_env(),
    };

    match cli.command {
        Commands::Extract {
            input,
            output,
            config,
            keep_rejected,
        } => {
            let classifier = load_classifier(config.as_deref())?;
            let options = BatchOptions {
                input_dir: input.unwrap_or(paths.raw),
                output_dir: output.unwrap_or(paths.extracted),
                keep_rejected,
            };
            let report = run_extraction(&classifier, &options).with_context(|| {
                format!("extracting documents from {}", options.input_dir.display())
            })?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Normalize { input, output } => {
            let input = input.unwrap_or(paths.extracted);
            let output = output.unwrap_or(paths.preprocessed);
            let report = run_normalization(&input, &output)
                .with_context(|| format!("normalizing records under {}", input.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Metadata {
            input,
            output,
            source,
        } => {
            let input = input.unwrap_or(paths.preprocessed);
            let output = output.unwrap_or(paths.metadata);
            let written = run_metadata(&input, &output, &source)
                .with_context(|| format!("writing metadata for {}", input.display()))?;
            info!("{} metadata files in {}", written.len(), output.display());
        }
        Commands::Classify { sentence, config } => {
            let classifier = load_classifier(config.as_deref())?;
            let verdict = classifier.verdict(sentence.trim());
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
    }

    Ok(())
}
