//! Cloudflare CDN purge CLI.
//!
//! Invalidate a set of URLs or a whole zone, e.g. at deploy time:
//!
//! ```bash
//! # Purge individual URLs
//! cloudflare-purge --url https://example.com/my-page/ --url https://example.com/other/
//!
//! # Purge everything in one zone
//! cloudflare-purge --zone 023e105f4ecef8ad9ca31a8372d0c353
//! ```
//!
//! The API token comes from `CLOUDFLARE_API_TOKEN`; the domain → zone
//! mapping from `--zones` (inline JSON) or `--zones-file`.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cloudflare_purge::config::API_TOKEN_VAR;
use cloudflare_purge::{PurgeClient, PurgeConfig, PurgeReport, ZoneRegistry};

/// Purge Cloudflare CDN caches
#[derive(Parser, Debug)]
#[command(name = "cloudflare-purge", version, about)]
struct Cli {
    /// Absolute URL to purge (repeatable)
    #[arg(long = "url")]
    urls: Vec<String>,

    /// Zone ID to purge entirely
    #[arg(long)]
    zone: Option<String>,

    /// Domain → zone id mapping as inline JSON, e.g. '{"example.com": "zone-id"}'
    #[arg(long, env = "CLOUDFLARE_ZONES")]
    zones: Option<String>,

    /// Path to a JSON file with the domain → zone id mapping
    #[arg(long, env = "CLOUDFLARE_ZONES_FILE")]
    zones_file: Option<PathBuf>,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let client = PurgeClient::new(config);

    if !client.is_active() {
        eprintln!("❌ CDN is not configured properly (set {API_TOKEN_VAR})");
        return Ok(ExitCode::FAILURE);
    }

    if !cli.quiet {
        println!("Invalidating CDN caches");
    }

    if !cli.urls.is_empty() {
        let report = client.purge_urls(&cli.urls).await;
        return Ok(finish(
            &report,
            "Purged CDN caches for URLs successfully",
            cli.quiet,
        ));
    }

    if let Some(zone) = cli.zone.as_deref() {
        let report = client.purge_zone(zone).await;
        let message = format!("Purged CDN caches for zone \"{zone}\" successfully");
        return Ok(finish(&report, &message, cli.quiet));
    }

    eprintln!("❌ Nothing done: pass --url or --zone");
    Ok(ExitCode::FAILURE)
}

fn load_config(cli: &Cli) -> Result<PurgeConfig> {
    let zones = if let Some(json) = &cli.zones {
        ZoneRegistry::from_json(json).context("invalid zone mapping")?
    } else if let Some(path) = &cli.zones_file {
        ZoneRegistry::from_file(path).context("invalid zone mapping file")?
    } else {
        ZoneRegistry::new()
    };
    let api_token = env::var(API_TOKEN_VAR).ok();
    Ok(PurgeConfig::new(api_token, zones))
}

/// Report the purge result to the operator. Unlike hook-triggered purges,
/// a CLI invocation is a direct single-shot operation: failed calls are
/// printed with the provider's diagnostic and the exit code is non-zero.
fn finish(report: &PurgeReport, success_message: &str, quiet: bool) -> ExitCode {
    if report.is_empty() {
        eprintln!("❌ Nothing purged: no given URL belongs to a configured zone");
        return ExitCode::FAILURE;
    }
    if report.success() {
        if !quiet {
            println!("✅ {success_message}");
        }
        return ExitCode::SUCCESS;
    }
    eprintln!("❌ An error occurred while purging caches");
    for failure in report.failures() {
        if let Err(e) = &failure.result {
            eprintln!("   zone {}: {e}", failure.zone_id);
        }
    }
    ExitCode::FAILURE
}
