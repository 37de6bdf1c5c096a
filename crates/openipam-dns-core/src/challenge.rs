//! DNS-01 challenge records
//!
//! A [`ChallengeRecord`] can only be built from a validated domain and
//! validation value, so every record the manager sends to the API carries a
//! name derived exactly from the domain the host asked about.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Label prepended to the validated domain
pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// Maximum length of a DNS name in presentation format (RFC 1035)
const MAX_NAME_LEN: usize = 253;

/// Maximum length of a single label (RFC 1035)
const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a single TXT character-string
const MAX_TXT_LEN: usize = 255;

/// A `(domain, validation)` pair as handed over by the ACME host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Base domain being validated (no `_acme-challenge.` prefix)
    pub domain: String,
    /// Value the TXT record must carry
    pub validation: String,
}

impl Challenge {
    pub fn new(domain: impl Into<String>, validation: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            validation: validation.into(),
        }
    }
}

/// One validation TXT record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    /// Domain being validated
    pub domain: String,
    /// `_acme-challenge.<domain>`
    pub name: String,
    /// TXT content
    pub value: String,
    /// Record TTL in seconds
    pub ttl: u32,
}

impl ChallengeRecord {
    /// Validate the inputs and build the record
    pub fn new(domain: &str, value: &str, ttl: u32) -> Result<Self> {
        validate_domain(domain)?;
        validate_value(value)?;

        let name = record_name(domain);
        if name.len() > MAX_NAME_LEN {
            return Err(Error::invalid_input(format!(
                "Record name too long: {} chars (max {}). Got: {}",
                name.len(),
                MAX_NAME_LEN,
                name
            )));
        }

        Ok(Self {
            domain: domain.to_string(),
            name,
            value: value.to_string(),
            ttl,
        })
    }

    /// Build the record for a host challenge
    pub fn from_challenge(challenge: &Challenge, ttl: u32) -> Result<Self> {
        Self::new(&challenge.domain, &challenge.validation, ttl)
    }
}

/// Name of the validation record for `domain`
///
/// Pure concatenation: no case folding, no trailing-dot handling.
pub fn record_name(domain: &str) -> String {
    format!("{}.{}", ACME_CHALLENGE_LABEL, domain)
}

/// Validate that a string is a usable domain name
///
/// Basic RFC 1035 checks: length limits, non-empty labels, ASCII letters,
/// digits and hyphens only, no leading or trailing hyphen. A trailing dot is
/// an empty label and therefore rejected.
pub fn validate_domain(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::invalid_input("Domain name cannot be empty"));
    }

    if domain.len() > MAX_NAME_LEN {
        return Err(Error::invalid_input(format!(
            "Domain name too long: {} chars (max {}). Got: {}",
            domain.len(),
            MAX_NAME_LEN,
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::invalid_input(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > MAX_LABEL_LEN {
            return Err(Error::invalid_input(format!(
                "Domain label too long: {} chars (max {}). Label: '{}'",
                label.len(),
                MAX_LABEL_LEN,
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::invalid_input(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::invalid_input(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// Validate a TXT validation value
///
/// The value is opaque (normally a base64url digest), but it must fit a
/// single TXT string and contain no whitespace, quotes or control characters.
pub fn validate_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::invalid_input("Validation value cannot be empty"));
    }

    if value.len() > MAX_TXT_LEN {
        return Err(Error::invalid_input(format!(
            "Validation value too long: {} chars (max {})",
            value.len(),
            MAX_TXT_LEN
        )));
    }

    if !value.chars().all(|c| c.is_ascii_graphic() && c != '"') {
        return Err(Error::invalid_input(
            "Validation value must be printable ASCII without whitespace or quotes",
        ));
    }

    Ok(())
}
