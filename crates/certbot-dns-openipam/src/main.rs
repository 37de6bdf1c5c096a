// # certbot-dns-openipam
//
// Certbot manual hook answering dns-01 challenges through OpenIPAM.
//
// This binary is a THIN integration layer: it parses flags, sets up logging,
// loads credentials and hands the challenge to `openipam_dns_core::RecordManager`.
// No DNS logic lives here.
//
// ## Usage with Certbot
//
// ```bash
// certbot certonly --manual --preferred-challenges dns \
//   --manual-auth-hook \
//     "certbot-dns-openipam --dns-openipam-credentials ~/.secrets/certbot/openipam.ini auth" \
//   --manual-cleanup-hook \
//     "certbot-dns-openipam --dns-openipam-credentials ~/.secrets/certbot/openipam.ini cleanup" \
//   -d example.com
// ```
//
// Certbot passes the challenge through `CERTBOT_DOMAIN` and
// `CERTBOT_VALIDATION`; `--domain` / `--validation` override them.
//
// ## Environment
//
// - `DNS_OPENIPAM_CREDENTIALS`: credentials INI file
// - `DNS_OPENIPAM_PROPAGATION_SECONDS`: propagation wait
// - `DNS_OPENIPAM_MODE=dry-run`: log create/delete requests instead of sending them
// - `DNS_OPENIPAM_LOG_LEVEL`: trace, debug, info, warn, error

mod cli;

use anyhow::{Context, Result};
use cli::{Cli, Command};
use openipam_dns_client::OpenIpamClient;
use openipam_dns_core::{CleanupOutcome, Credentials, ManagerConfig, RecordManager};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the hook
///
/// - 0: Success (cleanup always succeeds once configured)
/// - 1: Configuration or startup error
/// - 2: The challenge could not be set up
#[derive(Debug, Clone, Copy)]
enum HookExitCode {
    Success = 0,
    ConfigError = 1,
    ChallengeFailed = 2,
}

impl From<HookExitCode> for ExitCode {
    fn from(code: HookExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(e) = cli.validate() {
        eprintln!("Configuration validation error: {}", e);
        return HookExitCode::ConfigError.into();
    }

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout belongs to Certbot (it forwards auth hook output to the cleanup hook)
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HookExitCode::ConfigError.into();
    }

    let manager = match build_manager(&cli) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return HookExitCode::ConfigError.into();
        }
    };

    // Single-threaded: the hook handles one challenge and blocks on the wait
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HookExitCode::ConfigError.into();
        }
    };

    rt.block_on(run_hook(&cli, &manager)).into()
}

/// Load credentials and assemble client and manager
fn build_manager(cli: &Cli) -> Result<RecordManager> {
    let path = cli
        .credentials
        .as_deref()
        .context("--dns-openipam-credentials is required")?;

    let credentials = Credentials::load(path)?;

    let dry_run = cli.dry_run || openipam_dns_client::dry_run_requested();
    if dry_run {
        warn!("OpenIPAM client running in DRY-RUN mode - no changes will be made");
    }

    let config = ManagerConfig::with_propagation_seconds(cli.propagation_seconds);
    let client = OpenIpamClient::new(
        &credentials,
        Duration::from_secs(config.request_timeout_secs),
        dry_run,
    )?;

    // Nobody consumes lifecycle events here; the logs carry the same information
    let (manager, _events) = RecordManager::new(Box::new(client), config)?;
    Ok(manager)
}

/// Run the selected hook
async fn run_hook(cli: &Cli, manager: &RecordManager) -> HookExitCode {
    match &cli.command {
        Command::Auth(target) => {
            let challenges = target.challenges();
            info!("Setting up {} dns-01 challenge(s)", challenges.len());

            match manager.perform_all(&challenges).await {
                Ok(records) => {
                    for record in &records {
                        info!("Challenge record ready: {}", record.name);
                    }
                    HookExitCode::Success
                }
                Err(e) => {
                    error!("{}", e);
                    HookExitCode::ChallengeFailed
                }
            }
        }
        Command::Cleanup(target) => {
            let challenges = target.challenges();
            for outcome in manager.cleanup_all(&challenges).await {
                report_cleanup(&outcome);
            }
            // Cleanup problems never fail the issuance
            HookExitCode::Success
        }
    }
}

fn report_cleanup(outcome: &CleanupOutcome) {
    match outcome {
        CleanupOutcome::Deleted { record_name, .. } => info!("Removed {}", record_name),
        CleanupOutcome::NotFound { record_name } => info!("Nothing to remove at {}", record_name),
        CleanupOutcome::Ambiguous {
            record_name,
            candidates,
        } => warn!(
            "Left {} foreign TXT record(s) at {} untouched",
            candidates, record_name
        ),
        CleanupOutcome::Warning { warning, .. } => warn!("{}", warning),
    }
}

