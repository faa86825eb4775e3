use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tf_module_versions::check::{CheckOptions, check_modules};
use tf_module_versions::config::{self, Config, parse_header};
use tf_module_versions::logging::{self, LogFormat, LogOptions};
use tf_module_versions::module_call::ParsedModuleCall;
use tf_module_versions::output::{self, Format, ModuleRow, UpdateRow};
use tf_module_versions::parser::{ConfigKind, ModuleCallRecord};
use tf_module_versions::scan::Scanner;
use tf_module_versions::version::fetcher::RemoteVersionFetcher;
use tf_module_versions::version::resolver::UpdateResolver;

#[derive(Parser)]
#[command(name = "tf-module-versions")]
#[command(version, about = "Checks Terraform module references for newer versions")]
struct Cli {
    /// Suppress log output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write logs to a file (the data directory's log file when no path is given)
    #[arg(long, global = true, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List referenced modules with their detected versions
    List(ScanArgs),
    /// Check referenced modules' sources for newer versions
    Check(CheckArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Configuration directories or files
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Include only this module (repeatable; all modules by default)
    #[arg(long = "module")]
    modules: Vec<String>,

    /// Follow local module references
    #[arg(short, long)]
    recursive: bool,

    /// Read terragrunt.hcl files instead of *.tf files
    #[arg(long)]
    terragrunt: bool,

    #[arg(short, long, value_enum, default_value_t = Format::Markdown)]
    output: Format,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    scan: ScanArgs,

    /// Include modules without updates
    #[arg(short, long)]
    all: bool,

    /// Consider pre-release versions
    #[arg(long)]
    pre_release: bool,

    /// Exit with code 1 when updates within the constraints are found
    #[arg(short = 'e', long)]
    updates_found_nonzero_exit: bool,

    /// Exit with code 1 when any updates are found
    #[arg(short = 'n', long)]
    any_updates_found_nonzero_exit: bool,

    /// Extra HTTP header for module registry requests ("Name: value", repeatable)
    #[arg(short = 'H', long = "registry-header")]
    registry_headers: Vec<String>,

    /// Timeout for resolving one module in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Number of modules checked concurrently
    #[arg(long)]
    concurrency: Option<usize>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let _guard = logging::init(&LogOptions {
        quiet: cli.quiet,
        file: cli
            .log_file
            .clone()
            .map(|path| path.unwrap_or_else(config::log_path)),
        format: cli.log_format,
    })?;

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::List(args) => list(&args, &config),
        Command::Check(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(check(args, config));
            // Abandoned git listings may still hold blocking threads
            runtime.shutdown_background();
            result
        }
    }
}

/// Scans the requested paths and applies the `--module` filter
fn scan(args: &ScanArgs, recursive: bool) -> anyhow::Result<Vec<ModuleCallRecord>> {
    let kind = if args.terragrunt {
        ConfigKind::Terragrunt
    } else {
        ConfigKind::Terraform
    };

    let output = Scanner::new(kind).scan(&args.paths, recursive)?;
    for branch_error in &output.branch_errors {
        error!("{}", branch_error);
    }

    let filter: HashSet<&str> = args.modules.iter().map(String::as_str).collect();
    let records: Vec<_> = output
        .records
        .into_iter()
        .filter(|record| filter.is_empty() || filter.contains(record.name.as_str()))
        .collect();
    info!("Found {} {} module calls", records.len(), kind.as_str());

    Ok(records)
}

fn list(args: &ScanArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let records = scan(args, args.recursive || config.check.recursive)?;

    let mut rows: Vec<ModuleRow> = records
        .iter()
        .map(|record| match ParsedModuleCall::parse(record.clone()) {
            Ok(parsed) => ModuleRow::new(record, Some(&parsed)),
            Err(e) => {
                error!("{:?} in {:?}: {}", record.name, record.file, e);
                ModuleRow::new(record, None)
            }
        })
        .collect();
    output::sort_modules(&mut rows);

    let mut stdout = std::io::stdout().lock();
    output::write_modules(&mut stdout, &rows, args.output)?;
    stdout.flush()?;

    Ok(ExitCode::SUCCESS)
}

async fn check(args: CheckArgs, mut config: Config) -> anyhow::Result<ExitCode> {
    for raw in &args.registry_headers {
        let (name, value) =
            parse_header(raw).with_context(|| format!("invalid registry header {:?}", raw))?;
        config.registry.headers.insert(name, value);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.registry.timeout_ms = timeout_ms;
    }

    let options = CheckOptions {
        include_prerelease: args.pre_release || config.check.include_prerelease,
        concurrency: args.concurrency.unwrap_or(config.check.concurrency),
        timeout: Duration::from_millis(config.registry.timeout_ms),
    };

    let records = scan(&args.scan, args.scan.recursive || config.check.recursive)?;

    let fetcher = RemoteVersionFetcher::from_config(&config)?;
    let resolver = UpdateResolver::new(Arc::new(fetcher));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining checks");
            ctrl_c.cancel();
        }
    });

    let checks = check_modules(&resolver, records, &options, &cancel).await;

    let mut found_matching_updates = false;
    let mut found_any_updates = false;
    let mut rows = Vec::new();
    for check in &checks {
        let Some(row) = UpdateRow::from_check(check) else {
            continue;
        };
        found_matching_updates |= row.matching_update;
        found_any_updates |= row.has_update();
        if args.all || row.has_update() {
            rows.push(row);
        }
    }
    output::sort_updates(&mut rows);

    let failed = checks.iter().filter(|check| check.result.is_err()).count();
    if failed > 0 {
        warn!("{} of {} modules could not be checked", failed, checks.len());
    }

    let mut stdout = std::io::stdout().lock();
    output::write_updates(&mut stdout, &rows, args.scan.output)?;
    stdout.flush()?;

    let exit_nonzero = (args.updates_found_nonzero_exit && found_matching_updates)
        || (args.any_updates_found_nonzero_exit && found_any_updates);
    Ok(if exit_nonzero {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
