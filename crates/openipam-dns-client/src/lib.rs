// # OpenIPAM DNS Client
//
// [`RecordApi`] implementation for the OpenIPAM REST API.
//
// - One logical API operation per call, errors returned to the manager
// - HTTP timeout on every request
// - Status codes mapped to specific errors (401/403, 404, 429, 5xx)
// - Dry-run mode for safe testing
// - ❌ NO retry logic (the ACME host decides whether to retry)
// - ❌ NO caching (the API is the source of truth)
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Client construction fails fast if the token is empty
//
// ## API Reference
//
// - Create record: POST `{endpoint}dns/add/` (form: dns_type, name, content, ttl) → 201
// - List records:  GET `{endpoint}dns/?name=...` → 200, paginated `{"results": [...], "next": ...}`
// - Delete record: DELETE `{endpoint}dns/:id/delete/` → 204
// - Auth header:   `Authorization: Token <api_token>`

use async_trait::async_trait;
use openipam_dns_core::traits::{CreatedRecord, DeleteResult, RecordApi, TxtRecord};
use openipam_dns_core::{ChallengeRecord, Credentials, Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Default HTTP timeout for API requests
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable switching the client to dry-run mode
pub const MODE_ENV_VAR: &str = "DNS_OPENIPAM_MODE";

/// Upper bound on listing pages followed for one name
const MAX_PAGES: usize = 50;

const PROVIDER: &str = "openipam";

/// OpenIPAM DNS API client
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Perform listing requests
/// - Log the intended create/delete requests
/// - **NOT** modify any DNS record
pub struct OpenIpamClient {
    /// API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, always ending in `/`
    endpoint: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, list records but skip create/delete
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for OpenIpamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenIpamClient")
            .field("api_token", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl OpenIpamClient {
    /// Create a new OpenIPAM client
    ///
    /// # Parameters
    ///
    /// - `credentials`: API token and endpoint
    /// - `timeout`: Per-request HTTP timeout
    /// - `dry_run`: If true, list records but skip create/delete
    pub fn new(credentials: &Credentials, timeout: Duration, dry_run: bool) -> Result<Self> {
        if credentials.api_token().is_empty() {
            return Err(Error::config("OpenIPAM API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let mut endpoint = credentials.api_endpoint().to_string();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }

        Ok(Self {
            api_token: credentials.api_token().to_string(),
            endpoint,
            client,
            dry_run,
        })
    }

    /// Create a client in live mode with the default timeout
    pub fn new_live(credentials: &Credentials) -> Result<Self> {
        Self::new(credentials, DEFAULT_HTTP_TIMEOUT, false)
    }

    /// Create a client in dry-run mode with the default timeout
    pub fn new_dry_run(credentials: &Credentials) -> Result<Self> {
        Self::new(credentials, DEFAULT_HTTP_TIMEOUT, true)
    }

    /// Normalised API base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether create/delete requests are suppressed
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("Token {}", self.api_token),
        )
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<reqwest::Response> {
        self.authorized(request)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(format!("OpenIPAM {} request timed out: {}", operation, e))
                } else {
                    Error::http(format!("OpenIPAM {} request failed: {}", operation, e))
                }
            })
    }

    /// Resolve a pagination link, refusing links that leave the API origin
    ///
    /// Every request carries the API token, so following a link to another
    /// host would hand the token to that host.
    fn next_page_url(&self, next: &str) -> Result<reqwest::Url> {
        let base = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| Error::config(format!("Invalid OpenIPAM endpoint: {}", e)))?;
        let url = base.join(next).map_err(|e| {
            Error::provider(PROVIDER, format!("Invalid pagination link '{}': {}", next, e))
        })?;

        if url.origin() != base.origin() {
            tracing::warn!(
                "Refusing to follow pagination link to {} outside {}",
                url.origin().ascii_serialization(),
                base.origin().ascii_serialization()
            );
            return Err(Error::provider(
                PROVIDER,
                format!(
                    "Pagination link points outside the API origin: {}",
                    url.origin().ascii_serialization()
                ),
            ));
        }

        Ok(url)
    }

    /// Fetch one listing page
    async fn fetch_page(&self, request: reqwest::RequestBuilder) -> Result<Listing> {
        let response = self.send(request, "list").await?;

        if !response.status().is_success() {
            return Err(status_error(response, "Record lookup").await);
        }

        response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))
    }
}

/// Whether dry-run mode was requested through the environment
pub fn dry_run_requested() -> bool {
    std::env::var(MODE_ENV_VAR)
        .unwrap_or_default()
        .eq_ignore_ascii_case("dry-run")
}

/// Map a non-success response to an error
async fn status_error(response: reqwest::Response, what: &str) -> Error {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", what, status)),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            PROVIDER,
            format!("OpenIPAM server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider(
            PROVIDER,
            format!("{} failed: {} - {}", what, status, error_text),
        ),
    }
}

/// Record IDs come back as numbers or strings depending on the serializer
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Number(u64),
    Text(String),
}

impl RecordId {
    fn into_string(self) -> String {
        match self {
            RecordId::Number(n) => n.to_string(),
            RecordId::Text(s) => s,
        }
    }
}

/// A DNS record as serialized by OpenIPAM
#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: RecordId,
    name: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    text_content: Option<String>,
    #[serde(default)]
    dns_type: Option<Value>,
    #[serde(default)]
    ttl: Option<Value>,
}

impl From<ApiRecord> for TxtRecord {
    fn from(record: ApiRecord) -> Self {
        // `dns_type` is either "TXT" or a nested object with a name
        let dns_type = record.dns_type.and_then(|t| match t {
            Value::String(s) => Some(s),
            Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        });

        TxtRecord {
            id: record.id.into_string(),
            name: record.name,
            content: record.content.or(record.text_content).unwrap_or_default(),
            dns_type,
            ttl: record
                .ttl
                .and_then(|t| t.as_u64())
                .and_then(|t| u32::try_from(t).ok()),
        }
    }
}

/// Listing payload: paginated or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Page {
        results: Vec<ApiRecord>,
        #[serde(default)]
        next: Option<String>,
    },
    Plain(Vec<ApiRecord>),
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    id: Option<RecordId>,
}

#[async_trait]
impl RecordApi for OpenIpamClient {
    /// Create a TXT record
    ///
    /// # API Call
    ///
    /// ```http
    /// POST {endpoint}dns/add/
    /// Authorization: Token <token>
    /// Content-Type: application/x-www-form-urlencoded
    ///
    /// dns_type=TXT&name=_acme-challenge.example.com&content=...&ttl=300
    /// ```
    async fn create_txt_record(&self, record: &ChallengeRecord) -> Result<CreatedRecord> {
        let url = self.url("dns/add/");
        let form = [
            ("dns_type", "TXT".to_string()),
            ("name", record.name.clone()),
            ("content", record.value.clone()),
            ("ttl", record.ttl.to_string()),
        ];

        tracing::debug!(
            "Attempting to add record: {} (ttl: {}) [mode: {}]",
            record.name,
            record.ttl,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} for TXT record {}",
                url,
                record.name
            );
            return Ok(CreatedRecord::default());
        }

        let response = self
            .send(self.client.post(&url).form(&form), "create")
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response, "Failed to add DNS record").await);
        }

        // The id is optional: older deployments answer 201 with an empty body
        let body = response.text().await.unwrap_or_default();
        let id = serde_json::from_str::<CreateResponse>(&body)
            .ok()
            .and_then(|r| r.id)
            .map(RecordId::into_string);

        tracing::debug!("Successfully added TXT record: {}", record.name);
        Ok(CreatedRecord { id })
    }

    /// List records at a name, following pagination
    ///
    /// # API Call
    ///
    /// ```http
    /// GET {endpoint}dns/?name=_acme-challenge.example.com
    /// Authorization: Token <token>
    /// ```
    async fn find_txt_records(&self, record_name: &str) -> Result<Vec<TxtRecord>> {
        tracing::debug!("Attempting to find record: {}", record_name);

        let mut records = Vec::new();
        let mut request = self
            .client
            .get(self.url("dns/"))
            .query(&[("name", record_name)]);

        for _ in 0..MAX_PAGES {
            match self.fetch_page(request).await? {
                Listing::Plain(page) => {
                    records.extend(page.into_iter().map(TxtRecord::from));
                    return Ok(records);
                }
                Listing::Page { results, next } => {
                    records.extend(results.into_iter().map(TxtRecord::from));
                    match next {
                        Some(next) if !next.is_empty() => {
                            request = self.client.get(self.next_page_url(&next)?)
                        }
                        _ => return Ok(records),
                    }
                }
            }
        }

        tracing::warn!(
            "Stopped listing {} after {} pages; some records were not inspected",
            record_name,
            MAX_PAGES
        );
        Ok(records)
    }

    /// Delete a record by ID
    ///
    /// # API Call
    ///
    /// ```http
    /// DELETE {endpoint}dns/:id/delete/
    /// Authorization: Token <token>
    /// ```
    async fn delete_record(&self, record_id: &str) -> Result<DeleteResult> {
        if record_id.is_empty()
            || !record_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid_input(format!(
                "Refusing to delete record with malformed id '{}'",
                record_id
            )));
        }

        let url = self.url(&format!("dns/{}/delete/", record_id));

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(DeleteResult::Deleted);
        }

        tracing::debug!("Attempting to delete record with record_id: {}", record_id);
        let response = self.send(self.client.delete(&url), "delete").await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("Record {} already deleted", record_id);
            return Ok(DeleteResult::NotFound);
        }

        if !response.status().is_success() {
            return Err(status_error(response, "Failed to delete DNS record").await);
        }

        tracing::debug!("Successfully deleted TXT record with record_id: {}", record_id);
        Ok(DeleteResult::Deleted)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
