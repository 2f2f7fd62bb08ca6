//! Optional operation counters, injectable at construction time.
//!
//! The counters are diagnostic-only. A ring built without a sink performs
//! no counting at all, and nothing on the data path ever reads a counter —
//! correctness never depends on this module.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Shared counter sink for one ring (or several, if the caller prefers
/// aggregate numbers). Attach via
/// [`RingConfig::with_diagnostics`](crate::RingConfig::with_diagnostics).
#[derive(Debug, Default)]
pub struct RingDiagnostics {
    pub writes: AtomicUsize,
    pub bytes_written: AtomicUsize,
    pub reads: AtomicUsize,
    pub bytes_read: AtomicUsize,
    pub skips: AtomicUsize,
    pub peeks: AtomicUsize,
    pub save_read_calls: AtomicUsize,
    pub restore_read_calls: AtomicUsize,
    pub clear_save_calls: AtomicUsize,
    pub nested_saves_ignored: AtomicUsize,
    pub rewinds: AtomicUsize,
    pub failed_seeks: AtomicUsize,
}

impl RingDiagnostics {
    pub fn reset(&self) {
        self.writes.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.reads.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.skips.store(0, Ordering::Relaxed);
        self.peeks.store(0, Ordering::Relaxed);
        self.save_read_calls.store(0, Ordering::Relaxed);
        self.restore_read_calls.store(0, Ordering::Relaxed);
        self.clear_save_calls.store(0, Ordering::Relaxed);
        self.nested_saves_ignored.store(0, Ordering::Relaxed);
        self.rewinds.store(0, Ordering::Relaxed);
        self.failed_seeks.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            skips: self.skips.load(Ordering::Relaxed),
            peeks: self.peeks.load(Ordering::Relaxed),
            save_read_calls: self.save_read_calls.load(Ordering::Relaxed),
            restore_read_calls: self.restore_read_calls.load(Ordering::Relaxed),
            clear_save_calls: self.clear_save_calls.load(Ordering::Relaxed),
            nested_saves_ignored: self.nested_saves_ignored.load(Ordering::Relaxed),
            rewinds: self.rewinds.load(Ordering::Relaxed),
            failed_seeks: self.failed_seeks.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters, serializable for reports.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DiagnosticsSnapshot {
    pub writes: usize,
    pub bytes_written: usize,
    pub reads: usize,
    pub bytes_read: usize,
    pub skips: usize,
    pub peeks: usize,
    pub save_read_calls: usize,
    pub restore_read_calls: usize,
    pub clear_save_calls: usize,
    pub nested_saves_ignored: usize,
    pub rewinds: usize,
    pub failed_seeks: usize,
}

impl DiagnosticsSnapshot {
    /// True when every `save_read` has been matched by a restore or an
    /// explicit clear, with at most one save still outstanding. A larger
    /// gap suggests the lookahead protocol is leaking save states.
    pub fn save_restore_balanced(&self) -> bool {
        let settled = self.restore_read_calls + self.clear_save_calls;
        self.save_read_calls.saturating_sub(settled) <= 1
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ring::{create_ring_with, RingConfig};

    #[test]
    fn counters_track_operations() {
        let diag = Arc::new(RingDiagnostics::default());
        let (mut producer, mut consumer) =
            create_ring_with(RingConfig::new(32).with_diagnostics(Arc::clone(&diag))).unwrap();

        producer.write(&[1; 10]);
        let mut buf = [0u8; 4];
        consumer.peek(&mut buf).unwrap();
        consumer.save_read();
        consumer.read(&mut buf);
        consumer.save_read(); // nested, ignored
        consumer.rewind(2).unwrap();
        consumer.restore_read().unwrap();
        consumer.skip(3);

        let snap = diag.snapshot();
        assert_eq!(snap.writes, 1);
        assert_eq!(snap.bytes_written, 10);
        assert_eq!(snap.reads, 1);
        assert_eq!(snap.bytes_read, 4);
        assert_eq!(snap.peeks, 1);
        assert_eq!(snap.skips, 1);
        assert_eq!(snap.save_read_calls, 1);
        assert_eq!(snap.nested_saves_ignored, 1);
        assert_eq!(snap.rewinds, 1);
        assert_eq!(snap.restore_read_calls, 1);
        assert!(snap.save_restore_balanced());
    }

    #[test]
    fn failed_seeks_are_counted() {
        let diag = Arc::new(RingDiagnostics::default());
        let (mut producer, mut consumer) =
            create_ring_with(RingConfig::new(8).with_diagnostics(Arc::clone(&diag))).unwrap();

        producer.write(&[1; 4]);
        consumer.save_read();
        consumer.skip(2);
        assert!(consumer.rewind(3).is_err());
        assert!(consumer.seek(10).is_err());

        assert_eq!(diag.snapshot().failed_seeks, 2);
    }

    #[test]
    fn reset_zeroes_everything() {
        let diag = RingDiagnostics::default();
        diag.writes.store(7, Ordering::Relaxed);
        diag.save_read_calls.store(3, Ordering::Relaxed);
        diag.reset();
        let snap = diag.snapshot();
        assert_eq!(snap.writes, 0);
        assert_eq!(snap.save_read_calls, 0);
    }

    #[test]
    fn unbalanced_saves_are_flagged() {
        let snap = DiagnosticsSnapshot {
            writes: 0,
            bytes_written: 0,
            reads: 0,
            bytes_read: 0,
            skips: 0,
            peeks: 0,
            save_read_calls: 5,
            restore_read_calls: 1,
            clear_save_calls: 2,
            nested_saves_ignored: 0,
            rewinds: 0,
            failed_seeks: 0,
        };
        assert!(!snap.save_restore_balanced());
    }
}
