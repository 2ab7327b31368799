#![allow(dead_code)]

use std::sync::Arc;

use bookingsync_core::Clock;
use bookingsync_domain::Result;
use bookingsync_infra::database::DbManager;
use bookingsync_infra::integrations::google::{AssertionClaims, AssertionSigner};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with migrations applied.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("bookings.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(now) })
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Signer that encodes the claims it was asked to sign, so tests can assert
/// on them without an RSA key.
#[derive(Default)]
pub struct RecordingSigner {
    pub signed: Mutex<Vec<AssertionClaims>>,
}

impl AssertionSigner for RecordingSigner {
    fn sign(&self, claims: &AssertionClaims) -> Result<String> {
        self.signed.lock().push(claims.clone());
        Ok(format!("assertion-for-{}-{}", claims.iss, claims.iat))
    }
}
