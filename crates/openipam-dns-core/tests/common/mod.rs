//! Test doubles and common utilities for contract tests
//!
//! [`FakeRecordApi`] keeps an in-memory zone and counts calls, so tests can
//! check exactly which records were created and removed.

#![allow(dead_code)]

use openipam_dns_core::error::{Error, Result};
use openipam_dns_core::traits::{CreatedRecord, DeleteResult, RecordApi, TxtRecord};
use openipam_dns_core::{ChallengeRecord, ManagerConfig, ManagerEvent, RecordManager};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// In-memory stand-in for the OpenIPAM API
pub struct FakeRecordApi {
    zone: Arc<Mutex<Vec<TxtRecord>>>,
    next_id: Arc<AtomicUsize>,
    create_call_count: Arc<AtomicUsize>,
    find_call_count: Arc<AtomicUsize>,
    delete_call_count: Arc<AtomicUsize>,
    /// Domains whose create call is answered with an auth failure
    rejected: Arc<Mutex<HashSet<String>>>,
    hang_create: Arc<AtomicBool>,
    hang_find: Arc<AtomicBool>,
    fail_delete: Arc<AtomicBool>,
}

impl FakeRecordApi {
    pub fn new() -> Self {
        Self {
            zone: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
            create_call_count: Arc::new(AtomicUsize::new(0)),
            find_call_count: Arc::new(AtomicUsize::new(0)),
            delete_call_count: Arc::new(AtomicUsize::new(0)),
            rejected: Arc::new(Mutex::new(HashSet::new())),
            hang_create: Arc::new(AtomicBool::new(false)),
            hang_find: Arc::new(AtomicBool::new(false)),
            fail_delete: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a FakeRecordApi that shares zone and counters with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            zone: Arc::clone(&other.zone),
            next_id: Arc::clone(&other.next_id),
            create_call_count: Arc::clone(&other.create_call_count),
            find_call_count: Arc::clone(&other.find_call_count),
            delete_call_count: Arc::clone(&other.delete_call_count),
            rejected: Arc::clone(&other.rejected),
            hang_create: Arc::clone(&other.hang_create),
            hang_find: Arc::clone(&other.hang_find),
            fail_delete: Arc::clone(&other.fail_delete),
        }
    }

    /// Put a record in the zone directly, as another client would
    pub fn seed(&self, name: &str, content: &str, dns_type: &str) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.zone.lock().unwrap().push(TxtRecord {
            id: id.clone(),
            name: name.to_string(),
            content: content.to_string(),
            dns_type: Some(dns_type.to_string()),
            ttl: Some(300),
        });
        id
    }

    /// Answer create calls for `domain` with HTTP 401
    pub fn reject_domain(&self, domain: &str) {
        self.rejected
            .lock()
            .unwrap()
            .insert(format!("_acme-challenge.{}", domain));
    }

    /// Never answer create calls
    pub fn hang_on_create(&self) {
        self.hang_create.store(true, Ordering::SeqCst);
    }

    /// Never answer list calls
    pub fn hang_on_find(&self) {
        self.hang_find.store(true, Ordering::SeqCst);
    }

    /// Answer delete calls with a server error
    pub fn fail_on_delete(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    /// Snapshot of the zone
    pub fn records(&self) -> Vec<TxtRecord> {
        self.zone.lock().unwrap().clone()
    }

    /// Contents stored at `name`
    pub fn contents_at(&self, name: &str) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.name == name)
            .map(|r| r.content)
            .collect()
    }

    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    pub fn find_call_count(&self) -> usize {
        self.find_call_count.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordApi for FakeRecordApi {
    async fn create_txt_record(&self, record: &ChallengeRecord) -> Result<CreatedRecord> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);

        if self.hang_create.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if self.rejected.lock().unwrap().contains(&record.name) {
            return Err(Error::auth("Invalid token. (HTTP 401)"));
        }

        let id = self.seed(&record.name, &record.value, "TXT");
        Ok(CreatedRecord { id: Some(id) })
    }

    async fn find_txt_records(&self, record_name: &str) -> Result<Vec<TxtRecord>> {
        self.find_call_count.fetch_add(1, Ordering::SeqCst);

        if self.hang_find.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        Ok(self
            .records()
            .into_iter()
            .filter(|r| r.name == record_name)
            .collect())
    }

    async fn delete_record(&self, record_id: &str) -> Result<DeleteResult> {
        self.delete_call_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::provider("fake", "server error (HTTP 500)"));
        }

        let mut zone = self.zone.lock().unwrap();
        let before = zone.len();
        zone.retain(|r| r.id != record_id);

        if zone.len() < before {
            Ok(DeleteResult::Deleted)
        } else {
            Ok(DeleteResult::NotFound)
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Build a manager around a fake sharing state with `api`
pub fn manager_with(
    api: &FakeRecordApi,
    propagation_seconds: u64,
) -> (RecordManager, mpsc::Receiver<ManagerEvent>) {
    RecordManager::new(
        Box::new(FakeRecordApi::sharing_state_with(api)),
        ManagerConfig::with_propagation_seconds(propagation_seconds),
    )
    .expect("manager construction succeeds")
}

/// Drain every event currently buffered
pub fn drain_events(rx: &mut mpsc::Receiver<ManagerEvent>) -> Vec<ManagerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
