use async_trait::async_trait;
use bytes::Bytes;
use pallet_core::{ContentHash, Metadata, PackageName, SpaceName, VersionNumber};
use pallet_storage::{StorageResult, Version};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Wraps a version handle to inject delays and concurrent writers and to
/// count writes.
#[allow(dead_code)]
pub struct InstrumentedVersion {
    inner: Arc<dyn Version>,
    read_delay: Option<Duration>,
    intruder: Mutex<Option<Bytes>>,
    pub writes: AtomicUsize,
    pub read_started: AtomicBool,
}

#[allow(dead_code)]
impl InstrumentedVersion {
    pub fn new(inner: Arc<dyn Version>) -> Self {
        Self {
            inner,
            read_delay: None,
            intruder: Mutex::new(None),
            writes: AtomicUsize::new(0),
            read_started: AtomicBool::new(false),
        }
    }

    /// Delay every `get_content` call.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// After the next read, another writer stores `data` before the caller
    /// gets to write.
    pub fn with_intruder(self, data: Bytes) -> Self {
        Self {
            intruder: Mutex::new(Some(data)),
            ..self
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Version for InstrumentedVersion {
    fn space(&self) -> &SpaceName {
        self.inner.space()
    }

    fn package(&self) -> &PackageName {
        self.inner.package()
    }

    fn number(&self) -> &VersionNumber {
        self.inner.number()
    }

    async fn get_content(&self) -> StorageResult<Bytes> {
        self.read_started.store(true, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        let data = self.inner.get_content().await?;
        if let Some(intruder) = self.intruder.lock().await.take() {
            self.inner.put_content(intruder, None).await?;
        }
        Ok(data)
    }

    async fn put_content(
        &self,
        data: Bytes,
        precondition: Option<ContentHash>,
    ) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put_content(data, precondition).await
    }

    async fn metadata(&self) -> StorageResult<Metadata> {
        self.inner.metadata().await
    }

    async fn values(&self) -> StorageResult<Bytes> {
        self.inner.values().await
    }
}
