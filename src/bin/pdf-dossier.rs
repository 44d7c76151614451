use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pdf_dossier::{run_pipeline, PipelineOptions, DEFAULT_OPACITY};

/// Watermark grouped PDFs and assemble them into one combined dossier
#[derive(Parser, Debug)]
#[command(name = "pdf-dossier", version, about)]
struct Cli {
    /// Directory whose subfolders hold the source PDFs, one folder per group
    #[arg(short, long)]
    source: PathBuf,

    /// Text stamped diagonally on every page
    #[arg(long, default_value = "DOCUMENT RESERVE A LA LOCATION")]
    watermark: String,

    /// Title printed on the generated title page
    #[arg(long, default_value = "Dossier de Location")]
    title: String,

    /// Watermark fill opacity, between 0.0 and 1.0
    #[arg(long, default_value_t = DEFAULT_OPACITY)]
    opacity: f64,

    /// Keep the per-document watermarked PDFs in a temp_watermarked folder
    #[arg(long)]
    keep_intermediates: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&cli.opacity) {
        anyhow::bail!("opacity must be between 0.0 and 1.0, got {}", cli.opacity);
    }

    let options = PipelineOptions {
        source: cli.source.clone(),
        watermark_text: cli.watermark,
        title: cli.title,
        opacity: cli.opacity,
        keep_intermediates: cli.keep_intermediates,
    };

    let report = run_pipeline(&options)
        .with_context(|| format!("processing {}", cli.source.display()))?;

    info!(
        output = %report.output.display(),
        pages = report.total_pages,
        processed = report.succeeded(),
        skipped = report.failed(),
        "done"
    );

    for document in report.documents.iter().filter(|d| d.result.is_err()) {
        if let Err(err) = &document.result {
            error!(path = %document.source.display(), "skipped: {err}");
        }
    }

    Ok(())
}
