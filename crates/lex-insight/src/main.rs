//! CLI entry point for the analysis engine.

use anyhow::Result;
use clap::Parser;
use lex_insight::{
    AnalysisConfig, AnalysisOutput, Analyzer, DatasetLoader, OutputEncoding, encode_output,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Automated exploratory data analysis",
    long_about = "Analyzes a tabular dataset and prints one JSON report to stdout.\n\n\
                  Analysis errors are reported as {\"error\": \"...\"} on stdout.\n\
                  Logs go to stderr.\n\n\
                  EXAMPLES:\n  \
                  # Analyze a CSV file\n  \
                  lex-insight data.csv\n\n  \
                  # Reproducible scatter samples, indented output\n  \
                  lex-insight data.csv --seed 42 --pretty\n\n  \
                  # ASCII-only output for legacy consumers\n  \
                  lex-insight data.csv --ascii"
)]
struct Args {
    /// Path to the dataset (.csv, .tsv, .txt, .xls or .xlsx)
    file_path: String,

    /// Seed for scatter plot sampling
    ///
    /// Without a seed, every run samples different points.
    #[arg(long)]
    seed: Option<u64>,

    /// Escape every non-ASCII character in the output
    #[arg(long)]
    ascii: bool,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

/// Initialize the tracing subscriber for logging.
///
/// Logs are written to stderr so stdout only carries the JSON document.
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = AnalysisConfig::builder();
    if let Some(seed) = args.seed {
        config = config.sample_seed(seed);
    }
    let analyzer = Analyzer::builder().config(config.build()?).build()?;

    let output = match DatasetLoader::load(&args.file_path) {
        Ok(df) => analyzer.run(&df),
        Err(e) => {
            error!("Could not load {}: {}", args.file_path, e);
            AnalysisOutput::error(e.to_string())
        }
    };

    let encoding = if args.ascii {
        OutputEncoding::Ascii
    } else {
        OutputEncoding::Utf8
    };
    println!("{}", encode_output(&output, encoding, args.pretty)?);

    if !output.is_error() {
        info!("Analysis of {} complete", args.file_path);
    }
    Ok(())
}
