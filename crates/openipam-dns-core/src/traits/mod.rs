//! Core traits for the authenticator
//!
//! - [`RecordApi`]: Create, list and delete TXT records through a DNS API
//! - [`Authenticator`]: Plugin interface driven by the ACME host

pub mod authenticator;
pub mod record_api;

pub use authenticator::{Authenticator, PLUGIN_NAMESPACE, PluginArgument};
pub use record_api::{CreatedRecord, DeleteResult, RecordApi, TxtRecord};
