// # Authenticator Trait
//
// The plugin surface an ACME host drives: argument registration plus the
// batch `perform` / `cleanup` entry points, each called once per issuance
// attempt with every `(domain, validation)` pair of the order.

use crate::challenge::Challenge;
use crate::manager::CleanupOutcome;
use async_trait::async_trait;

/// Prefix of every flag this plugin registers
pub const PLUGIN_NAMESPACE: &str = "dns-openipam";

/// A command-line argument declared by a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginArgument {
    /// Argument name without the plugin namespace (e.g. "credentials")
    pub name: &'static str,
    /// Help text
    pub help: &'static str,
    /// Default value, if any
    pub default: Option<String>,
    /// Whether the host must supply a value
    pub required: bool,
}

impl PluginArgument {
    /// Full long flag, e.g. `--dns-openipam-credentials`
    pub fn flag(&self) -> String {
        format!("--{}-{}", PLUGIN_NAMESPACE, self.name)
    }
}

/// Trait implemented by DNS-01 authenticators
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Plugin name as selected by `--authenticator`
    fn name(&self) -> &'static str;

    /// One-line description shown in plugin listings
    fn description(&self) -> &'static str;

    /// Longer description of what the plugin does
    fn more_info(&self) -> &'static str;

    /// Arguments the plugin wants the host to parse
    fn parser_arguments() -> Vec<PluginArgument>
    where
        Self: Sized;

    /// Publish the validation records and wait for propagation
    ///
    /// Returns once every record has had the configured propagation time,
    /// or an error naming the challenges that could not be set up.
    async fn perform(&self, challenges: &[Challenge]) -> Result<(), crate::Error>;

    /// Remove the validation records
    ///
    /// Never fails: problems are reported per challenge in the outcomes.
    async fn cleanup(&self, challenges: &[Challenge]) -> Vec<CleanupOutcome>;
}
