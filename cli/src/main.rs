//! Command line interface of rusiaa.
//!
//! ```bash
//! # Instance-based agreement of a brat project
//! rusiaa path/to/project
//!
//! # Token-based agreement, with the scores of ann1 against the others and the F1 matrix
//! rusiaa path/to/project -t --annotator ann1 --matrix
//!
//! # Export the scores as JSON lines
//! rusiaa path/to/project --jsonl scores.jsonl
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rusiaa::{
    compute_f1_agreement, AgreementConfigBuilder, BratProject, EvaluationMode, IaaReport,
    DEFAULT_PRECISION,
};
use serde_jsonlines::write_json_lines;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Computes the F1 inter-annotator agreement of a brat project.
///
/// Every subdirectory of the project root holds the annotations of one annotator. The agreement
/// documents are the `.ann` files found in every annotator directory.
#[derive(Parser, Debug)]
#[command(name = "rusiaa", version, about)]
struct Cli {
    /// Root of the brat project
    project_root: PathBuf,

    /// Number of digits of the scores
    #[arg(short, long, default_value_t = DEFAULT_PRECISION)]
    precision: usize,

    /// Only log errors
    #[arg(short, long)]
    silent: bool,

    /// Compare the tokens covered by the annotations instead of the whole annotations
    #[arg(short, long)]
    tokens: bool,

    /// Compare the annotator pairs of a document on multiple threads
    #[arg(long)]
    parallel: bool,

    /// Report the agreement of this annotator with all the others
    #[arg(long)]
    annotator: Option<String>,

    /// Report the pairwise F1 matrix
    #[arg(long)]
    matrix: bool,

    /// Labels to use instead of the entities of annotation.conf
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Write the scores to this file, one JSON object per line
    #[arg(long)]
    jsonl: Option<PathBuf>,
}

fn init_logging(silent: bool) {
    let default_level = if silent { "error" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.silent);

    let mode = if cli.tokens {
        EvaluationMode::Token
    } else {
        EvaluationMode::Instance
    };
    let mut builder = AgreementConfigBuilder::default()
        .mode(mode)
        .parallel(cli.parallel)
        .precision(cli.precision);
    if let Some(labels) = cli.labels {
        builder = builder.labels(labels);
    }
    let config = builder.build();
    info!("{}", config);

    let project = BratProject::new(&cli.project_root);
    let agreement = compute_f1_agreement(&project, &config).with_context(|| {
        format!(
            "Could not compute the agreement of {}",
            cli.project_root.display()
        )
    })?;

    let mut report = IaaReport::new(agreement, config.precision()).with_matrix(cli.matrix);
    if let Some(annotator) = &cli.annotator {
        report = report.one_vs_rest(annotator)?;
    }
    print!("{}", report.render()?);

    if let Some(path) = &cli.jsonl {
        write_json_lines(path, report.rows()?)
            .with_context(|| format!("Could not write {}", path.display()))?;
        info!(path = %path.display(), "scores written");
    }
    Ok(())
}
