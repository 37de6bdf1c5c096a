// # openipam-dns-core
//
// Core library of the OpenIPAM DNS-01 authenticator.
//
// ## Architecture Overview
//
// - **RecordApi**: Trait for creating, listing and deleting TXT records via a DNS API
// - **Authenticator**: Plugin interface the ACME host drives (perform / cleanup / arguments)
// - **RecordManager**: Validates challenges, creates records, waits for propagation,
//   removes exactly the record it is responsible for
// - **Credentials / ManagerConfig**: Read-only configuration built once at startup
//
// ## Design Principles
//
// 1. **Exact targeting**: Record names are `_acme-challenge.<domain>`, verbatim
// 2. **Value-scoped cleanup**: Only the record carrying our validation value is deleted
// 3. **Idempotency**: Cleanup of a missing record is a no-op
// 4. **Stateless**: The remote API is the source of truth; nothing is persisted
// 5. **Library-First**: The binary is a thin wrapper around this crate

pub mod challenge;
pub mod config;
pub mod error;
pub mod manager;
pub mod traits;

// Re-export core types for convenience
pub use challenge::{Challenge, ChallengeRecord, record_name};
pub use config::{Credentials, ManagerConfig};
pub use error::{Error, Result};
pub use manager::{CleanupOutcome, ManagerEvent, RecordManager};
pub use traits::{Authenticator, RecordApi};
