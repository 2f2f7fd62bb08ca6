//! Producer half: the write path.
//!
//! The release store of `write_pos` after the byte copy pairs with the
//! consumer's acquire load, so a consumer that observes the advanced
//! cursor also observes the bytes behind it. The producer never blocks:
//! a full ring yields a zero-byte write and retry policy stays with the
//! caller.

use std::sync::Arc;

use super::{Ordering, RingCore};
use crate::diagnostics::RingDiagnostics;

/// Writing half of the ring, held by exactly one thread at a time.
///
/// `write` takes `&mut self`, so sharing a `Producer` across threads
/// without external synchronization is rejected at compile time. The
/// handle itself may be moved freely; the shared storage never relocates.
pub struct Producer {
    core: Arc<RingCore>,
    diagnostics: Option<Arc<RingDiagnostics>>,
}

impl Producer {
    pub(crate) fn new(core: Arc<RingCore>, diagnostics: Option<Arc<RingDiagnostics>>) -> Self {
        Self { core, diagnostics }
    }

    /// Append as many bytes of `data` as currently fit.
    ///
    /// Returns the number of bytes actually written, which may be less
    /// than `data.len()` or 0 when the ring is full. A short write is the
    /// normal backpressure signal, not an error; callers retry once the
    /// consumer has drained.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let write = self.core.write_pos.load(Ordering::Relaxed);
        let read = self.core.read_pos.load(Ordering::Acquire);
        let free = self.core.capacity() - self.core.used_between(read, write);

        let n = data.len().min(free);
        if n == 0 {
            return 0;
        }

        // SAFETY: the n bytes starting at `write` are inside the free
        // region. The consumer only reads `[read_pos, write_pos)` and
        // cannot observe these slots until the release store below.
        unsafe { self.core.copy_in(write, &data[..n]) };
        self.core
            .write_pos
            .store(self.core.advance(write, n), Ordering::Release);

        if let Some(diag) = &self.diagnostics {
            diag.writes
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            diag.bytes_written
                .fetch_add(n, std::sync::atomic::Ordering::Relaxed);
        }
        n
    }

    /// Bytes the ring can still accept, derived from the live cursors.
    pub fn free_bytes(&self) -> usize {
        self.core.capacity() - self.used_bytes()
    }

    /// Bytes currently buffered, derived from the live cursors.
    pub fn used_bytes(&self) -> usize {
        let write = self.core.write_pos.load(Ordering::Relaxed);
        let read = self.core.read_pos.load(Ordering::Acquire);
        self.core.used_between(read, write)
    }

    /// Usable capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    pub fn is_full(&self) -> bool {
        self.free_bytes() == 0
    }
}
