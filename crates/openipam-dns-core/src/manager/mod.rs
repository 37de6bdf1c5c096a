//! DNS record manager
//!
//! The RecordManager is responsible for:
//! - Turning `(domain, validation)` pairs into validated TXT records
//! - Creating them through a [`RecordApi`]
//! - Holding the caller for the propagation interval
//! - Deleting exactly the record it created during cleanup
//!
//! ## Lifecycle of one challenge
//!
//! ```text
//! Idle → RecordRequested → RecordCreated → AwaitingPropagation
//!      → (host validates with the CA)
//!      → CleanupRequested → RecordDeleted | RecordNotFound → Idle
//! ```
//!
//! The manager keeps no per-challenge state. Cleanup asks the API which
//! records exist at the challenge name, so it works in a fresh process and
//! after an earlier crash.

use crate::challenge::{Challenge, ChallengeRecord, record_name};
use crate::config::ManagerConfig;
use crate::error::{Error, Result};
use crate::traits::{
    Authenticator, CreatedRecord, DeleteResult, PluginArgument, RecordApi, TxtRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Lifecycle events emitted by the RecordManager
///
/// Serializes as an internally tagged object (`{"event": "record_created", ...}`)
/// so monitoring can forward events as JSON lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ManagerEvent {
    /// A create call is about to be made
    RecordRequested { record_name: String },

    /// The API accepted the record
    RecordCreated {
        record_name: String,
        record_id: Option<String>,
    },

    /// The API rejected the record or could not be reached
    CreationFailed { record_name: String, error: String },

    /// Propagation wait started
    AwaitingPropagation {
        record_names: Vec<String>,
        until: DateTime<Utc>,
    },

    /// Cleanup started
    CleanupRequested { record_name: String },

    /// Our record was removed
    RecordDeleted {
        record_name: String,
        record_id: String,
    },

    /// No record carrying our value exists
    RecordNotFound { record_name: String },

    /// Records exist at the name but none is ours; nothing was deleted
    CleanupSkipped {
        record_name: String,
        candidates: usize,
    },

    /// Cleanup could not complete
    CleanupFailed { record_name: String, error: String },
}

/// Outcome of cleaning up one challenge
#[derive(Debug)]
pub enum CleanupOutcome {
    /// The record carrying the validation value was deleted
    Deleted {
        record_name: String,
        record_id: String,
    },

    /// Nothing to delete
    NotFound { record_name: String },

    /// Several records exist at the name and none carries the value
    Ambiguous {
        record_name: String,
        candidates: usize,
    },

    /// Cleanup failed; reported, never fatal
    Warning { record_name: String, warning: Error },
}

impl CleanupOutcome {
    /// Whether the zone is known to be free of our record
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Deleted { .. } | Self::NotFound { .. })
    }

    /// Record name the outcome refers to
    pub fn record_name(&self) -> &str {
        match self {
            Self::Deleted { record_name, .. }
            | Self::NotFound { record_name }
            | Self::Ambiguous { record_name, .. }
            | Self::Warning { record_name, .. } => record_name,
        }
    }
}

/// DNS-01 record manager
///
/// Holds only read-only data (API client and timings), so one instance may
/// serve different domains concurrently. Calls for the same domain are not
/// serialised; that is up to the host.
pub struct RecordManager {
    /// API used to create and delete records
    api: Box<dyn RecordApi>,

    /// Wait after creation
    propagation: Duration,

    /// TTL for created records
    ttl: u32,

    /// Upper bound for each API call
    request_timeout: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ManagerEvent>,
}

impl RecordManager {
    /// Create a new record manager
    ///
    /// # Returns
    ///
    /// A tuple of (manager, event_receiver) where event_receiver yields
    /// lifecycle events. Dropping the receiver is fine; events are then
    /// discarded.
    pub fn new(
        api: Box<dyn RecordApi>,
        config: ManagerConfig,
    ) -> Result<(Self, mpsc::Receiver<ManagerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let manager = Self {
            api,
            propagation: config.propagation(),
            ttl: config.ttl,
            request_timeout: config.request_timeout(),
            event_tx: tx,
        };

        Ok((manager, rx))
    }

    /// Configured propagation wait
    pub fn propagation(&self) -> Duration {
        self.propagation
    }

    /// Create the validation record for `domain` and wait for propagation
    ///
    /// # Returns
    ///
    /// - `Ok(ChallengeRecord)`: The record exists and has had the full
    ///   propagation interval
    /// - `Err(Error::InvalidInput)`: The domain or value is unusable; no API call made
    /// - `Err(Error::RecordCreation)`: The API call failed; no wait happened
    pub async fn perform(&self, domain: &str, validation: &str) -> Result<ChallengeRecord> {
        let record = self.create(domain, validation).await?;
        self.wait_for_propagation(std::slice::from_ref(&record)).await;
        Ok(record)
    }

    /// Create the records of a whole order, then wait once
    ///
    /// Each challenge is attempted independently. The wait happens when at
    /// least one record was created, even if others failed, so the caller
    /// can still validate the successful domains.
    pub async fn perform_all(&self, challenges: &[Challenge]) -> Result<Vec<ChallengeRecord>> {
        let mut created = Vec::with_capacity(challenges.len());
        let mut failed = Vec::new();

        for challenge in challenges {
            match self.create(&challenge.domain, &challenge.validation).await {
                Ok(record) => created.push(record),
                Err(_) => failed.push(challenge.domain.clone()),
            }
        }

        if !created.is_empty() {
            self.wait_for_propagation(&created).await;
        }

        if failed.is_empty() {
            Ok(created)
        } else {
            Err(Error::ChallengeFailed { failed })
        }
    }

    /// Delete the validation record for `domain` carrying `validation`
    ///
    /// Idempotent: when no such record exists the outcome is `NotFound`.
    /// Failures come back as `CleanupOutcome::Warning`, never as an error.
    pub async fn cleanup(&self, domain: &str, validation: &str) -> CleanupOutcome {
        let record = match ChallengeRecord::new(domain, validation, self.ttl) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping cleanup for {}: {}", domain, e);
                return CleanupOutcome::Warning {
                    record_name: record_name(domain),
                    warning: Error::record_deletion(domain, e.to_string()),
                };
            }
        };

        self.emit_event(ManagerEvent::CleanupRequested {
            record_name: record.name.clone(),
        });

        match self.remove(&record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let warning = Error::record_deletion(domain, e.to_string());
                warn!("{}; the record may need to be removed manually", warning);
                self.emit_event(ManagerEvent::CleanupFailed {
                    record_name: record.name.clone(),
                    error: e.to_string(),
                });
                CleanupOutcome::Warning {
                    record_name: record.name,
                    warning,
                }
            }
        }
    }

    /// Clean up every challenge of an order
    pub async fn cleanup_all(&self, challenges: &[Challenge]) -> Vec<CleanupOutcome> {
        let mut outcomes = Vec::with_capacity(challenges.len());
        for challenge in challenges {
            outcomes.push(self.cleanup(&challenge.domain, &challenge.validation).await);
        }
        outcomes
    }

    /// Validate and create one record, without waiting
    async fn create(&self, domain: &str, validation: &str) -> Result<ChallengeRecord> {
        let record = ChallengeRecord::new(domain, validation, self.ttl).inspect_err(|e| {
            error!("Refusing to create record for {}: {}", domain, e);
        })?;

        debug!(
            "Creating TXT record {} (ttl: {}) via {}",
            record.name,
            record.ttl,
            self.api.provider_name()
        );
        self.emit_event(ManagerEvent::RecordRequested {
            record_name: record.name.clone(),
        });

        match self
            .call("create", self.api.create_txt_record(&record))
            .await
        {
            Ok(CreatedRecord { id }) => {
                info!(
                    "Created TXT record {} (id: {})",
                    record.name,
                    id.as_deref().unwrap_or("unknown")
                );
                self.emit_event(ManagerEvent::RecordCreated {
                    record_name: record.name.clone(),
                    record_id: id,
                });
                Ok(record)
            }
            Err(e) => {
                error!("Failed to create TXT record {}: {}", record.name, e);
                self.emit_event(ManagerEvent::CreationFailed {
                    record_name: record.name.clone(),
                    error: e.to_string(),
                });
                Err(Error::record_creation(domain, e.to_string()))
            }
        }
    }

    /// Find our record and delete it
    async fn remove(&self, record: &ChallengeRecord) -> Result<CleanupOutcome> {
        let listed = self
            .call("find", self.api.find_txt_records(&record.name))
            .await?;

        let candidates: Vec<TxtRecord> = listed
            .into_iter()
            .filter(|r| r.name_matches(&record.name) && r.is_txt())
            .collect();

        // We added one record, so we remove one even if duplicates exist
        let Some(ours) = candidates.iter().find(|r| r.content_matches(&record.value)) else {
            if candidates.len() > 1 {
                let err = Error::AmbiguousRecord {
                    record_name: record.name.clone(),
                    candidates: candidates.len(),
                };
                warn!("{}; leaving them untouched", err);
                self.emit_event(ManagerEvent::CleanupSkipped {
                    record_name: record.name.clone(),
                    candidates: candidates.len(),
                });
                return Ok(CleanupOutcome::Ambiguous {
                    record_name: record.name.clone(),
                    candidates: candidates.len(),
                });
            }

            debug!("TXT record {} not found; no cleanup needed", record.name);
            return Ok(self.not_found(record));
        };

        debug!("Deleting TXT record {} (id: {})", record.name, ours.id);
        match self.call("delete", self.api.delete_record(&ours.id)).await? {
            DeleteResult::Deleted => {
                info!("Deleted TXT record {} (id: {})", record.name, ours.id);
                self.emit_event(ManagerEvent::RecordDeleted {
                    record_name: record.name.clone(),
                    record_id: ours.id.clone(),
                });
                Ok(CleanupOutcome::Deleted {
                    record_name: record.name.clone(),
                    record_id: ours.id.clone(),
                })
            }
            DeleteResult::NotFound => {
                debug!("TXT record {} was already gone", record.name);
                Ok(self.not_found(record))
            }
        }
    }

    fn not_found(&self, record: &ChallengeRecord) -> CleanupOutcome {
        self.emit_event(ManagerEvent::RecordNotFound {
            record_name: record.name.clone(),
        });
        CleanupOutcome::NotFound {
            record_name: record.name.clone(),
        }
    }

    /// Hold the caller for the full propagation interval
    async fn wait_for_propagation(&self, records: &[ChallengeRecord]) {
        let until = chrono::Duration::from_std(self.propagation)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .unwrap_or_else(Utc::now);

        info!(
            "Waiting {} seconds for DNS changes to propagate (until {})",
            self.propagation.as_secs(),
            until.format("%H:%M:%S UTC")
        );
        self.emit_event(ManagerEvent::AwaitingPropagation {
            record_names: records.iter().map(|r| r.name.clone()).collect(),
            until,
        });

        tokio::time::sleep(self.propagation).await;
    }

    /// Run one API call under the request timeout
    async fn call<T>(
        &self,
        operation: &str,
        request: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "{} {} did not answer within {}s",
                self.api.provider_name(),
                operation,
                self.request_timeout.as_secs()
            ))),
        }
    }

    /// Emit a manager event
    fn emit_event(&self, event: ManagerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[async_trait]
impl Authenticator for RecordManager {
    fn name(&self) -> &'static str {
        crate::traits::PLUGIN_NAMESPACE
    }

    fn description(&self) -> &'static str {
        "Obtain certificates using a DNS TXT record (if you are using OpenIPAM for DNS)."
    }

    fn more_info(&self) -> &'static str {
        "This plugin configures a DNS TXT record to respond to a dns-01 challenge using the OpenIPAM API."
    }

    fn parser_arguments() -> Vec<PluginArgument> {
        vec![
            PluginArgument {
                name: "credentials",
                help: "OpenIPAM credentials INI file.",
                default: None,
                required: true,
            },
            PluginArgument {
                name: "propagation-seconds",
                help: "The number of seconds to wait for DNS to propagate before asking the ACME server to verify the DNS record.",
                default: Some(crate::config::DEFAULT_PROPAGATION_SECONDS.to_string()),
                required: false,
            },
        ]
    }

    async fn perform(&self, challenges: &[Challenge]) -> Result<()> {
        self.perform_all(challenges).await.map(|_| ())
    }

    async fn cleanup(&self, challenges: &[Challenge]) -> Vec<CleanupOutcome> {
        self.cleanup_all(challenges).await
    }
}
