use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use osrsbox_core::config::{FailurePolicy, NormalizeConfig};
use osrsbox_core::file_utils::{load_raw_entities, record_file_name, write_record};
use osrsbox_core::rarity::drop_rarity;
use osrsbox_core::{BuildOutcome, EntityContext, NormalizationError, RawEntity, build_item, build_monster};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(
    name = "osrsbox",
    version = "0.1.0",
    about = "CLI tool for normalizing OSRS wiki infobox data into typed JSON records",
    long_about = None
)]
struct Cli {
    /// Path to log file
    #[arg(long, global = true, default_value = "/tmp/osrsbox.log")]
    log_file: PathBuf,

    /// Verbosity level (repeat for more verbose output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw item infoboxes into item records
    NormalizeItems(NormalizeArgs),

    /// Normalize raw monster infoboxes and drops into monster records
    NormalizeMonsters(NormalizeArgs),

    /// Evaluate a single drop rarity text
    Rarity {
        /// Raw rarity text, e.g. "1/128" or "Rare"
        value: String,
        /// Base value for drop-table formulas
        #[arg(long)]
        base: Option<f64>,
    },
}

#[derive(clap::Args)]
struct NormalizeArgs {
    /// JSON file or directory of JSON files holding raw entities
    #[arg(long)]
    input: PathBuf,
    /// Directory for the typed JSON records
    #[arg(long)]
    output_dir: PathBuf,
    /// TOML normalize config
    #[arg(long, env = "OSRSBOX_CONFIG")]
    config: Option<PathBuf>,
    /// Override the configured failure policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
    /// Override the configured failure report path (CSV)
    #[arg(long)]
    failure_report: Option<PathBuf>,
    /// Quiet mode (0=show messages/warnings, 1=suppress messages, 2=suppress both)
    #[arg(long, default_value_t = 0)]
    quiet: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Skip,
    Partial,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Skip => FailurePolicy::Skip,
            PolicyArg::Partial => FailurePolicy::Partial,
        }
    }
}

#[derive(Clone, Copy)]
enum EntityKind {
    Item,
    Monster,
}

impl EntityKind {
    fn label(self) -> &'static str {
        match self {
            EntityKind::Item => "item",
            EntityKind::Monster => "monster",
        }
    }

    fn build(self, entity: &RawEntity, ctx: &EntityContext) -> osrsbox_core::Result<BuildOutcome> {
        match self {
            EntityKind::Item => build_item(&entity.infobox, entity.bonuses.as_ref(), ctx),
            EntityKind::Monster => build_monster(&entity.infobox, &entity.drops, ctx),
        }
    }
}

/// One row of the failure report.
#[derive(Serialize)]
struct FailureRow<'a> {
    entity_id: i64,
    entity_name: &'a str,
    version: &'a str,
    field_name: &'a str,
    raw_value: &'a str,
    reason: String,
}

#[derive(Default)]
struct BatchSummary {
    written: usize,
    skipped: usize,
    invalid: usize,
    failed_fields: usize,
}

fn setup_logging(verbose: u8, log_file: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let filter_level = match verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(filter_level.into());

    let file_appender = tracing_appender::rolling::never(
        log_file.parent().unwrap_or(Path::new(".")),
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("osrsbox.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::Layer::new().with_writer(std::io::stderr).with_ansi(true))
        .with(fmt::Layer::new().with_writer(non_blocking).with_ansi(false));

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

fn load_config(args: &NormalizeArgs) -> Result<NormalizeConfig> {
    let mut config = match &args.config {
        Some(path) => NormalizeConfig::from_file(path)?,
        None => NormalizeConfig::default(),
    };
    if let Some(policy) = args.policy {
        config.failure_policy = policy.into();
    }
    if let Some(report) = &args.failure_report {
        config.failure_report = Some(report.clone());
    }
    Ok(config)
}

fn progress_bar(len: usize, quiet: u8) -> ProgressBar {
    if quiet > 0 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        pb.set_style(style);
    }
    pb
}

fn normalize(kind: EntityKind, args: &NormalizeArgs) -> Result<BatchSummary> {
    let config = load_config(args)?;
    let entities = load_raw_entities(&args.input)?;
    if args.quiet == 0 {
        info!("Loaded {} raw {} entities from {:?}", entities.len(), kind.label(), args.input);
    }

    let jobs: Vec<(&RawEntity, EntityContext)> = entities
        .iter()
        .flat_map(|entity| entity.contexts().into_iter().map(move |ctx| (entity, ctx)))
        .collect();

    let pb = progress_bar(jobs.len(), args.quiet);
    let results: Vec<_> = jobs
        .par_iter()
        .map(|(entity, ctx)| {
            let result = kind.build(entity, ctx);
            pb.inc(1);
            (*entity, ctx, result)
        })
        .collect();
    pb.finish_and_clear();

    let mut summary = BatchSummary::default();
    let mut report_rows: Vec<(&RawEntity, &EntityContext, NormalizationError)> = Vec::new();

    for (entity, ctx, result) in results {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if args.quiet < 2 {
                    tracing::warn!("Failed to validate {} {}: {}", kind.label(), entity.id, e);
                }
                summary.invalid += 1;
                continue;
            }
        };

        summary.failed_fields += outcome.failures.len();
        let accepted = config.failure_policy.accepts(outcome.failures.len());
        if !outcome.is_complete() && args.quiet < 2 {
            tracing::warn!(
                "{} {} ({}) has {} failed fields: {}",
                kind.label(),
                entity.id,
                entity.name,
                outcome.failures.len(),
                outcome.failed_fields().join(", ")
            );
        }

        if accepted {
            let file_name = record_file_name(entity.id, ctx.version());
            write_record(&args.output_dir, &file_name, &outcome.record, config.pretty)?;
            summary.written += 1;
        } else {
            summary.skipped += 1;
        }
        report_rows.extend(outcome.failures.into_iter().map(|f| (entity, ctx, f)));
    }

    if let Some(report_path) = &config.failure_report {
        let mut writer = csv::Writer::from_path(report_path)?;
        for (entity, ctx, failure) in &report_rows {
            writer.serialize(FailureRow {
                entity_id: failure.entity_id,
                entity_name: &entity.name,
                version: ctx.version().unwrap_or(""),
                field_name: &failure.field_name,
                raw_value: &failure.raw_value,
                reason: failure.reason.to_string(),
            })?;
        }
        writer.flush()?;
        if args.quiet == 0 {
            info!("Wrote {} failure rows to {:?}", report_rows.len(), report_path);
        }
    }

    Ok(summary)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = setup_logging(cli.verbose, &cli.log_file)?;

    info!("Starting osrsbox CLI");

    match cli.command {
        Commands::NormalizeItems(args) => {
            let summary = normalize(EntityKind::Item, &args)?;
            log_summary(EntityKind::Item, &summary, &args);
        }
        Commands::NormalizeMonsters(args) => {
            let summary = normalize(EntityKind::Monster, &args)?;
            log_summary(EntityKind::Monster, &summary, &args);
        }
        Commands::Rarity { value, base } => match drop_rarity(Some(&value), base) {
            Some(rarity) => println!("{}", rarity),
            None => println!("null"),
        },
    }

    Ok(())
}

fn log_summary(kind: EntityKind, summary: &BatchSummary, args: &NormalizeArgs) {
    if args.quiet == 0 {
        info!(
            "Wrote {} {} records to {:?} ({} skipped, {} invalid, {} failed fields)",
            summary.written,
            kind.label(),
            args.output_dir,
            summary.skipped,
            summary.invalid,
            summary.failed_fields
        );
    }
}
