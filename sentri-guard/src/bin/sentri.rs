use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sentri_guard::checks::CheckRegistry;
use sentri_guard::config::ValidationConfig;
use sentri_guard::core::CheckManager;
use sentri_guard::formatters::{FormatterConfig, HumanFormatter, JsonFormatter, RunFormatter};
use sentri_guard::logging::setup::{init_logging, LoggingConfig};
use sentri_guard::sources::{CsvSource, DataSource};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Human,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Validation configuration (YAML or JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// CSV file or glob pattern; overrides the configured source
    #[arg(short, long)]
    data: Option<String>,

    /// Run only this configured check type
    #[arg(long, value_name = "CHECK_TYPE")]
    check: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run check types in parallel
    #[arg(long)]
    parallel: bool,

    /// Number of parallel workers (1-16)
    #[arg(long)]
    workers: Option<usize>,

    /// Log level for sentri (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<Level>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Exit with status 1 when any check warns
    #[arg(long)]
    exit_on_warning: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(2);
        }
    }
}

async fn run(args: Args) -> Result<i32> {
    let config = ValidationConfig::from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let level = match args.log_level {
        Some(level) => level,
        None => config
            .logging
            .level
            .parse()
            .with_context(|| format!("invalid logging.level '{}'", config.logging.level))?,
    };
    let json_logs = args.log_json || config.logging.format.eq_ignore_ascii_case("json");
    init_logging(
        LoggingConfig::default()
            .with_engine_level(level)
            .with_json(json_logs),
    )
    .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))?;

    let source = match (&args.data, &config.source) {
        (Some(pattern), _) => CsvSource::new(pattern.clone()),
        (None, Some(descriptor)) => CsvSource::from_descriptor(descriptor)?,
        (None, None) => anyhow::bail!("no data given: pass --data or configure a source"),
    };
    let dataset = source
        .load()
        .await
        .with_context(|| format!("loading {}", source.description()))?;

    let mut execution = config.execution.clone();
    if args.parallel {
        execution.parallel_enabled = true;
    }
    if let Some(workers) = args.workers {
        execution.max_workers = workers;
    }

    let manager = CheckManager::new(Arc::new(CheckRegistry::builtin()), execution);
    let outcome = match &args.check {
        Some(check_type) => {
            manager
                .run_check(dataset, &config.metadata, &config.checks, check_type)
                .await?
        }
        None => manager.run(dataset, &config.metadata, &config.checks).await?,
    };
    for record in outcome.failed() {
        tracing::warn!(
            check.name = %record.check_type,
            check.column = record.column.as_deref().unwrap_or("-"),
            result.metric = ?record.metric_value,
            "Check failed"
        );
    }

    let report = match args.format {
        OutputFormat::Json => JsonFormatter::new()
            .with_pretty(config.output.pretty_print)
            .format(&config.metadata, &outcome)?,
        OutputFormat::Human => {
            let colors = args.output.is_none() && std::io::stdout().is_terminal();
            HumanFormatter::with_config(FormatterConfig::default().with_colors(colors))
                .format(&config.metadata, &outcome)?
        }
    };

    match &args.output {
        Some(path) => std::fs::write(path, report)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{report}"),
    }

    let mut policy = config.output.exit_code;
    if args.exit_on_warning {
        policy.exit_on_warning = true;
    }
    Ok(policy.exit_code(&outcome.summary))
}
