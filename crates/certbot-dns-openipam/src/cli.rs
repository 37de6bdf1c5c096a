use clap::{Args, Parser, Subcommand};
use openipam_dns_core::Challenge;
use openipam_dns_core::config::DEFAULT_PROPAGATION_SECONDS;
use std::path::PathBuf;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Answer Certbot dns-01 challenges with TXT records managed through OpenIPAM
#[derive(Debug, Parser)]
#[command(name = "certbot-dns-openipam", version, about)]
pub struct Cli {
    /// OpenIPAM credentials INI file
    #[arg(
        long = "dns-openipam-credentials",
        env = "DNS_OPENIPAM_CREDENTIALS",
        value_name = "PATH",
        global = true
    )]
    pub credentials: Option<PathBuf>,

    /// Seconds to wait for DNS to propagate before the ACME server verifies the record
    #[arg(
        long = "dns-openipam-propagation-seconds",
        env = "DNS_OPENIPAM_PROPAGATION_SECONDS",
        value_name = "SECONDS",
        default_value_t = DEFAULT_PROPAGATION_SECONDS,
        global = true
    )]
    pub propagation_seconds: u64,

    /// Log create/delete requests instead of sending them
    #[arg(long = "dns-openipam-dry-run", global = true)]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        env = "DNS_OPENIPAM_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Publish the validation record and wait for propagation (manual auth hook)
    Auth(ChallengeArgs),

    /// Remove the validation record (manual cleanup hook)
    Cleanup(ChallengeArgs),
}

#[derive(Debug, Args)]
pub struct ChallengeArgs {
    /// Domain being validated
    #[arg(long, env = "CERTBOT_DOMAIN")]
    pub domain: String,

    /// Validation value to publish
    #[arg(long, env = "CERTBOT_VALIDATION")]
    pub validation: String,
}

impl ChallengeArgs {
    /// Certbot runs the hook once per domain
    pub fn challenges(&self) -> Vec<Challenge> {
        vec![Challenge::new(self.domain.clone(), self.validation.clone())]
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Reject values clap cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        let level = self.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "Unknown log level '{}', expected one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }
}
