//! Command-line entrypoint: summarize a local PDF and print the result.
//!
//! Shares configuration and the summary pipeline with the HTTP server. Logs go to stderr so the
//! summary can be piped or redirected from stdout.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rustydigest::{
    config, logging,
    processing::{DocumentMetadata, SourceDocument, SummaryOutcome, SummaryService},
};

#[derive(Parser)]
#[command(
    name = "summarize-pdf",
    about = "Summarize a PDF with the configured LLM provider"
)]
struct Cli {
    /// Document to summarize.
    input: PathBuf,
    /// Summary length: flash (~500 words), detailed (~2500), or extra (~7500).
    #[arg(long, short, default_value = "flash")]
    tier: String,
    /// Override DIGEST_MAX_CHUNK_SIZE for this run.
    #[arg(long)]
    max_chunk_size: Option<usize>,
    /// Treat the input as plain UTF-8 text instead of a PDF.
    #[arg(long)]
    text: bool,
    /// Write the summary to this file instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Emit the full outcome as JSON.
    #[arg(long)]
    json: bool,
    /// Log pipeline progress to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_tracing(cli.verbose);

    let mut config = config::init_config()
        .context("invalid configuration")?
        .clone();
    if let Some(size) = cli.max_chunk_size {
        anyhow::ensure!(size > 0, "--max-chunk-size must be greater than zero");
        config.max_chunk_size = size;
    }
    let service =
        SummaryService::from_config(&config).context("failed to initialize generation client")?;

    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let result = if cli.text {
        let text = String::from_utf8(bytes).context("input is not valid UTF-8")?;
        let metadata = DocumentMetadata {
            title: cli
                .input
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned()),
            ..Default::default()
        };
        service
            .summarize_text(SourceDocument::new(text, metadata), &cli.tier)
            .await
    } else {
        service.summarize_pdf(bytes, &cli.tier).await
    };
    let outcome = result
        .map_err(|error| anyhow::anyhow!("{} stage failed: {error}", stage_name(&error)))?;

    let rendered = render(&outcome, cli.json)?;
    match cli.output {
        Some(path) => {
            tokio::fs::write(&path, rendered)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "wrote {} words ({} chunks, target ~{}) to {}",
                outcome.word_count,
                outcome.chunk_count,
                outcome.target_word_count,
                path.display()
            );
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn stage_name(error: &rustydigest::processing::PipelineError) -> String {
    format!("{:?}", error.stage()).to_lowercase()
}

fn render(outcome: &SummaryOutcome, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(outcome).context("failed to serialize summary");
    }
    let mut rendered = String::new();
    if let Some(title) = outcome.metadata.title.as_deref() {
        rendered.push_str(&format!("# {title}\n\n"));
    }
    rendered.push_str(&outcome.summary_text);
    Ok(rendered)
}
