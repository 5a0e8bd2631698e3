//! Recording medium with injectable failures

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use trellis_storage::{MemoryMedium, StateMedium, StorageBackend, StorageError, StorageResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediumOp {
    Read(String),
    Write(String),
    Delete(String),
    List(String),
}

/// In-memory medium that records every operation
#[derive(Clone)]
pub struct MockMedium {
    inner: MemoryMedium,
    ops: Arc<Mutex<Vec<MediumOp>>>,
    failing_reads: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
    reads_open: Arc<watch::Sender<bool>>,
}

impl MockMedium {
    pub fn new() -> Self {
        let (reads_open, _) = watch::channel(true);
        Self {
            inner: MemoryMedium::new(),
            ops: Arc::new(Mutex::new(Vec::new())),
            failing_reads: Arc::new(Mutex::new(Vec::new())),
            fail_writes: Arc::new(AtomicBool::new(false)),
            reads_open: Arc::new(reads_open),
        }
    }

    pub fn ops(&self) -> Vec<MediumOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    pub fn write_count(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, MediumOp::Write(_)))
            .count()
    }

    /// Writes to keys ending with `key`
    pub fn writes_to(&self, key: &str) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, MediumOp::Write(k) if k.ends_with(key)))
            .count()
    }

    /// Namespace-wide listings. The gate and the store only issue these when clearing.
    pub fn clear_count(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| match op {
                MediumOp::List(prefix) => prefix.matches(':').count() == 1 && prefix.ends_with(':'),
                _ => false,
            })
            .count()
    }

    /// Make reads of keys ending with `key` fail.
    pub fn fail_reads_of(&self, key: &str) {
        self.failing_reads.lock().unwrap().push(key.to_string());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Block reads until [`MockMedium::release_reads`] is called.
    pub fn hold_reads(&self) {
        self.reads_open.send_replace(false);
    }

    pub fn release_reads(&self) {
        self.reads_open.send_replace(true);
    }

    fn record(&self, op: MediumOp) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl StateMedium for MockMedium {
    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let mut open = self.reads_open.subscribe();
        let _ = open.wait_for(|open| *open).await;

        self.record(MediumOp::Read(key.to_string()));
        let failing = self
            .failing_reads
            .lock()
            .unwrap()
            .iter()
            .any(|suffix| key.ends_with(suffix.as_str()));
        if failing {
            return Err(StorageError::ReadFailed(format!("injected read failure: {}", key)));
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: String) -> StorageResult<()> {
        self.record(MediumOp::Write(key.to_string()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(format!(
                "injected write failure: {}",
                key
            )));
        }
        self.inner.write(key, value).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.record(MediumOp::Delete(key.to_string()));
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.record(MediumOp::List(prefix.to_string()));
        self.inner.list(prefix).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
