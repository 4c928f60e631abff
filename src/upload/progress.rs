use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

struct Inner {
    total: u64,
    sent: AtomicU64,
    last: AtomicU8,
    callback: ProgressCallback,
}

/// Byte-driven percentage reporter. Reported values never decrease and
/// repeated values are not re-emitted.
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<Inner>,
}

impl ProgressReporter {
    pub fn new(total_bytes: u64, callback: ProgressCallback) -> Self {
        Self {
            inner: Arc::new(Inner {
                total: total_bytes,
                sent: AtomicU64::new(0),
                last: AtomicU8::new(0),
                callback,
            }),
        }
    }

    /// Reporter that discards all updates.
    pub fn silent() -> Self {
        Self::new(0, Arc::new(|_: u8| {}))
    }

    pub fn total_bytes(&self) -> u64 {
        self.inner.total
    }

    pub fn sent_bytes(&self) -> u64 {
        self.inner.sent.load(Ordering::SeqCst)
    }

    /// Emits the initial 0%.
    pub fn start(&self) {
        (self.inner.callback)(self.inner.last.load(Ordering::SeqCst));
    }

    pub fn advance(&self, bytes: u64) {
        let sent = self.inner.sent.fetch_add(bytes, Ordering::SeqCst) + bytes;
        if self.inner.total == 0 {
            return;
        }
        let percent = (sent.min(self.inner.total) * 100 / self.inner.total) as u8;
        self.emit(percent);
    }

    /// Jumps to 100% once the server has acknowledged the transfer.
    pub fn complete(&self) {
        self.emit(100);
    }

    fn emit(&self, percent: u8) {
        let previous = self.inner.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            (self.inner.callback)(percent);
        }
    }
}
