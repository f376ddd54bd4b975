//! Scripted capability implementations for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{MirrorError, Unavailable};
use crate::exchange::{FilterVerdict, PolicySet};
use crate::interfaces::{ContentFilter, MirrorRecord, MirrorSink, ResponseGenerator};

/// Content filter that returns the same outcome for every call and
/// records the text it was asked to check.
pub struct ScriptedFilter {
    outcome: Result<FilterVerdict, Unavailable>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedFilter {
    pub fn new(outcome: Result<FilterVerdict, Unavailable>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn passing() -> Self {
        Self::new(Ok(FilterVerdict::pass()))
    }

    pub fn blocking(violations: &[&str]) -> Self {
        Self::new(Ok(FilterVerdict::block(violations.iter().copied())))
    }

    pub fn unavailable() -> Self {
        Self::new(Err(Unavailable::Transport("connection refused".into())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentFilter for ScriptedFilter {
    async fn check(&self, text: &str, _policies: &PolicySet) -> Result<FilterVerdict, Unavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(text.to_string());
        self.outcome.clone()
    }
}

/// Generator that returns a fixed reply or failure.
pub struct ScriptedGenerator {
    outcome: Result<String, Unavailable>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            outcome: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            outcome: Err(Unavailable::Status {
                status: 503,
                body: "service unavailable".into(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, Unavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Mirror sink that keeps every record in memory, or fails every write.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<MirrorRecord>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<MirrorRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MirrorSink for RecordingSink {
    async fn mirror(&self, record: &MirrorRecord) -> Result<(), MirrorError> {
        if self.fail {
            return Err(MirrorError::Transport("mirror store offline".into()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
