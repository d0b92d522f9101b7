use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hellodiff_core::{
    compare_raw, group_digests_by_ip, CaptureDir, DecodeAdapter, DigestConsistency,
    TsharkAdapter,
};

mod config;
mod inputs;
mod output;

use config::{Config, Overrides};
use inputs::{parse_capture_arg, CaptureArg};
use output::{DigestListing, OutputFormat};

#[derive(Parser)]
#[command(name = "hellodiff")]
#[command(about = "Compare TLS ClientHello fingerprints across packet captures")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// tshark executable [default: tshark]
    #[arg(long, global = true)]
    tshark: Option<PathBuf>,

    /// Output format: "text" (tables) or "json" (NDJSON, one object per line)
    #[arg(short, long, global = true, value_parser = OutputFormat::parse)]
    output: Option<OutputFormat>,

    /// Debug logging and raw JA3 strings
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    /// Destination address of the ClientHello to fingerprint
    #[arg(long, conflicts_with = "target_host")]
    target_ip: Option<IpAddr>,

    /// Host name resolved to the destination address (first IPv4 wins)
    #[arg(long)]
    target_host: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the ClientHello sent to the target across captures
    ///
    /// Columns follow the order of --file; put the baseline first.
    Compare {
        /// Capture as [LABEL=]PATH; "-" reads a capture from stdin
        #[arg(short, long = "file", required = true, value_parser = parse_capture_arg)]
        files: Vec<CaptureArg>,

        #[command(flatten)]
        target: TargetArgs,

        /// Exit with failure when any field mismatches
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Keep stdin captures in this directory instead of a scratch one
        #[arg(long)]
        capture_dir: Option<PathBuf>,
    },

    /// List the decoder's JA3 digests per destination and check consistency
    Digests {
        /// Capture as [LABEL=]PATH
        #[arg(short, long = "file", required = true, value_parser = parse_capture_arg)]
        files: Vec<CaptureArg>,

        #[command(flatten)]
        target: TargetArgs,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load_optional(cli.config.as_deref())?;
    let target = match &cli.command {
        Commands::Compare { target, .. } | Commands::Digests { target, .. } => target,
    };
    config.apply(Overrides {
        tshark: cli.tshark.clone(),
        target_ip: target.target_ip,
        target_host: target.target_host.clone(),
        format: cli.output,
        verbose: cli.verbose,
    });
    config.validate()?;

    let default_level = if config.output.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let adapter = TsharkAdapter::new(config.adapter.tshark.clone());
    info!("Decoder: {}", adapter.binary().display());

    match cli.command {
        Commands::Compare {
            files,
            strict,
            capture_dir,
            ..
        } => run_compare(&adapter, &config, &files, strict, capture_dir),
        Commands::Digests { files, .. } => run_digests(&adapter, &config, &files),
    }
}

fn run_compare(
    adapter: &TsharkAdapter,
    config: &Config,
    files: &[CaptureArg],
    strict: bool,
    capture_dir: Option<PathBuf>,
) -> Result<ExitCode> {
    let target = config
        .target
        .resolve()?
        .context("A target is required: pass --target-ip or --target-host")?;

    let mut stdin = std::io::stdin().lock();
    let (captures, _spool) = inputs::materialize(files, &mut stdin, || match &capture_dir {
        Some(dir) => CaptureDir::persistent(dir),
        None => CaptureDir::scratch(),
    })?;

    let report = compare_raw(adapter, &captures, target).context("Comparison abandoned")?;
    output::print_report(&report, config.output.format)?;

    let mismatched = report.mismatched_fields();
    if !mismatched.is_empty() {
        info!("Fields differing between captures: {}", mismatched.join(", "));
        if strict {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_digests(adapter: &TsharkAdapter, config: &Config, files: &[CaptureArg]) -> Result<ExitCode> {
    inputs::validate(files)?;
    if files.iter().any(|f| f.path.as_os_str() == inputs::STDIN) {
        anyhow::bail!("digests does not read captures from stdin");
    }
    let target = config.target.resolve()?;

    let mut labelled = Vec::with_capacity(files.len());
    for file in files {
        let mut records = adapter
            .digests(&file.path)
            .with_context(|| format!("Failed to read digests from {}", file.path.display()))?;
        if let Some(ip) = target {
            records.retain(|r| r.ip == ip);
        }
        labelled.push((file.label.clone(), records));
    }

    let grouped: Vec<_> = labelled
        .iter()
        .map(|(label, records)| (label.as_str(), group_digests_by_ip(records.iter().cloned())))
        .collect();
    let listings: Vec<DigestListing<'_>> = grouped
        .iter()
        .map(|(label, by_ip)| DigestListing { label, by_ip })
        .collect();

    // Consistency is only meaningful for a single destination.
    let consistency = target.map(|_| DigestConsistency::check(&labelled));
    if let Some(check) = &consistency {
        if !check.is_consistent() {
            warn!("Fingerprint digests are not consistent across requests or captures");
        }
    }

    output::print_digests(
        &listings,
        consistency.as_ref(),
        config.output.format,
        config.output.verbose,
    )?;
    Ok(ExitCode::SUCCESS)
}
