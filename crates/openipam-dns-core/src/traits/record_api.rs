// # Record API Trait
//
// Defines the interface the record manager uses to talk to the DNS
// management system.
//
// ## Implementations
//
// - OpenIPAM: `openipam-dns-client` crate
//
// ## Usage
//
// ```rust,ignore
// use openipam_dns_core::{ChallengeRecord, RecordApi};
//
// let record = ChallengeRecord::new("example.usu.edu", "tokenXYZ", 300)?;
// let created = api.create_txt_record(&record).await?;
//
// for txt in api.find_txt_records(&record.name).await? {
//     if txt.content_matches(&record.value) {
//         api.delete_record(&txt.id).await?;
//     }
// }
// ```

use crate::challenge::ChallengeRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a create call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedRecord {
    /// Record ID, when the API reports one
    pub id: Option<String>,
}

/// Result of a delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    /// Record was removed
    Deleted,
    /// Record did not exist (already removed)
    NotFound,
}

/// A TXT record as listed by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtRecord {
    /// Record ID (provider-specific)
    pub id: String,
    /// Record name as stored by the provider
    pub name: String,
    /// Record content
    pub content: String,
    /// Record type, when the listing reports it
    pub dns_type: Option<String>,
    /// TTL, when the listing reports it
    pub ttl: Option<u32>,
}

impl TxtRecord {
    /// Whether the record sits at `record_name`
    ///
    /// Providers may return fully-qualified names with a trailing dot and
    /// DNS names compare case-insensitively.
    pub fn name_matches(&self, record_name: &str) -> bool {
        self.name
            .trim_end_matches('.')
            .eq_ignore_ascii_case(record_name.trim_end_matches('.'))
    }

    /// Whether the record is a TXT record (unreported types count as TXT)
    pub fn is_txt(&self) -> bool {
        self.dns_type
            .as_deref()
            .is_none_or(|t| t.eq_ignore_ascii_case("TXT"))
    }

    /// Whether the content equals `value` exactly
    ///
    /// Surrounding double quotes added by the zone storage are ignored.
    pub fn content_matches(&self, value: &str) -> bool {
        let content = self.content.trim();
        let content = content
            .strip_prefix('"')
            .and_then(|c| c.strip_suffix('"'))
            .unwrap_or(content);
        content == value
    }
}

/// Trait for DNS management API implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// ## Contract
///
/// - One logical API operation per call
/// - No retry or backoff: failures are returned to the manager, which
///   reports them to the host
/// - No caching: the remote API is the only source of truth for which
///   records exist
/// - The API token never appears in logs or error messages
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// Create a TXT record
    ///
    /// # Returns
    ///
    /// - `Ok(CreatedRecord)`: The API accepted the record
    /// - `Err(Error)`: The API rejected the request or could not be reached
    async fn create_txt_record(
        &self,
        record: &ChallengeRecord,
    ) -> Result<CreatedRecord, crate::Error>;

    /// List the TXT records stored at `record_name`
    ///
    /// An empty list means no record exists at that name.
    async fn find_txt_records(&self, record_name: &str) -> Result<Vec<TxtRecord>, crate::Error>;

    /// Delete a record by its ID
    ///
    /// A record that no longer exists yields `DeleteResult::NotFound`, not
    /// an error.
    async fn delete_record(&self, record_id: &str) -> Result<DeleteResult, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
