//! Shared test helpers for license tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ezlicense::{
    AdminLicenseProgram, ClientLicenseProgram, Expiry, LicenseData, SignedEnvelope, TimeSource,
    TimeSourceError, armor,
};
use rand::rngs::OsRng;
use rsa::{Pss, RsaPrivateKey};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

/// Small keys keep the suite fast; PSS with SHA-256 needs at least 528 bits.
pub const TEST_KEY_BITS: usize = 1024;

/// Instant used as "now" by fixed clocks in tests.
pub const NOW: i64 = 1_750_000_000;

/// Routes `tracing` output through the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Issuer shared by every test in the binary.
pub fn issuer() -> &'static AdminLicenseProgram {
    static ISSUER: OnceLock<AdminLicenseProgram> = OnceLock::new();
    init_tracing();
    ISSUER.get_or_init(|| AdminLicenseProgram::new("LICENSE", TEST_KEY_BITS).unwrap())
}

/// A second, unrelated issuer.
pub fn other_issuer() -> &'static AdminLicenseProgram {
    static ISSUER: OnceLock<AdminLicenseProgram> = OnceLock::new();
    ISSUER.get_or_init(|| AdminLicenseProgram::new("LICENSE", TEST_KEY_BITS).unwrap())
}

/// Client trusting [`issuer`].
pub fn client(time_source: impl TimeSource + 'static) -> ClientLicenseProgram {
    ClientLicenseProgram::new(issuer().public_key(), time_source)
}

/// License data expiring at `expires` with a seat count.
pub fn expiring_at(expires: i64) -> LicenseData {
    LicenseData::new()
        .with_expiry(Expiry::At(expires))
        .with_field("seats", 5)
}

/// Signs an arbitrary `data` string the way the issuer does, bypassing the codec.
pub fn sign_raw(key: &RsaPrivateKey, data: &str, label: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    let signature = key
        .sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), &digest)
        .unwrap();
    let envelope = SignedEnvelope {
        data: data.to_string(),
        signature: BASE64.encode(signature),
    };
    armor::wrap(label, &serde_json::to_vec(&envelope).unwrap())
}

/// Unwraps a license, lets `edit` change the envelope, and wraps it again.
pub fn rewrap(license: &str, edit: impl FnOnce(&mut SignedEnvelope)) -> String {
    let armored = armor::unwrap(license).unwrap();
    let mut envelope: SignedEnvelope = serde_json::from_slice(&armored.body).unwrap();
    edit(&mut envelope);
    armor::wrap(&armored.label, &serde_json::to_vec(&envelope).unwrap())
}

// ── Fake clocks ──────────────────────────────────────────────────

/// One scripted reply from a [`ScriptedTimeSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// The instant has passed.
    Passed,
    /// The instant is still in the future.
    Fresh,
    /// The clock could not be read.
    Error,
}

/// Replies from a script; the last reply repeats forever.
pub struct ScriptedTimeSource {
    script: Mutex<VecDeque<Answer>>,
    last: Mutex<Answer>,
    calls: AtomicUsize,
}

impl ScriptedTimeSource {
    pub fn new(script: impl IntoIterator<Item = Answer>) -> Self {
        let script: VecDeque<Answer> = script.into_iter().collect();
        let last = script.back().copied().unwrap_or(Answer::Fresh);
        Self {
            script: Mutex::new(script),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(answer: Answer) -> Self {
        Self::new([answer])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeSource for ScriptedTimeSource {
    async fn has_passed(&self, _instant: i64) -> Result<bool, TimeSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = match self.script.lock().unwrap().pop_front() {
            Some(answer) => {
                *self.last.lock().unwrap() = answer;
                answer
            }
            None => *self.last.lock().unwrap(),
        };
        match answer {
            Answer::Passed => Ok(true),
            Answer::Fresh => Ok(false),
            Answer::Error => Err(TimeSourceError::Network("scripted outage".into())),
        }
    }
}

/// Blocks every check until released, then reports the instant as passed.
#[derive(Default)]
pub struct GatedTimeSource {
    pub entered: Notify,
    pub release: Notify,
    calls: AtomicUsize,
}

impl GatedTimeSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeSource for GatedTimeSource {
    async fn has_passed(&self, _instant: i64) -> Result<bool, TimeSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(true)
    }
}

/// Counts how often an expiry callback ran.
#[derive(Default)]
pub struct CallbackCounter {
    count: AtomicUsize,
    last: Mutex<Option<LicenseData>>,
}

impl CallbackCounter {
    pub fn record(&self, data: &LicenseData) {
        self.count.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(data.clone());
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<LicenseData> {
        self.last.lock().unwrap().clone()
    }
}
