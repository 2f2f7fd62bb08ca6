//! Consumer half: read/peek/skip plus the save/restore/rewind/seek state
//! machine.
//!
//! ## Peek protocol
//!
//! ```text
//!            save_read()                restore_read()
//!  Normal ───────────────► Peeking ───────────────────► Normal (rolled back)
//!    ▲                        │
//!    └────────────────────────┘
//!          clear_save_state()  (committed)
//! ```
//!
//! The anchor is a plain `Option<usize>` field on this handle. It never
//! crosses the thread boundary: the producer sizes its free region from
//! the published read cursor alone, which is exactly what lets the whole
//! protocol run without a third shared counter.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{Ordering, RingCore, RingState};
use crate::diagnostics::RingDiagnostics;
use crate::error::{Result, RingError};

/// Reading half of the ring, held by exactly one thread at a time.
///
/// All peek/rollback state lives on this handle; the producer half has no
/// way to observe it.
pub struct Consumer {
    core: Arc<RingCore>,
    /// Saved read cursor; `Some` while peeking.
    anchor: Option<usize>,
    diagnostics: Option<Arc<RingDiagnostics>>,
}

impl Consumer {
    pub(crate) fn new(core: Arc<RingCore>, diagnostics: Option<Arc<RingDiagnostics>>) -> Self {
        Self {
            core,
            anchor: None,
            diagnostics,
        }
    }

    // ── Draining ─────────────────────────────────────────────────────────

    /// Copy up to `dest.len()` buffered bytes into `dest` and consume them.
    ///
    /// Returns the number of bytes actually transferred; 0 when the ring
    /// is empty. A short read is the normal backpressure signal, not an
    /// error.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        let want = dest.len();
        let n = self.drain(want, Some(dest));
        if let Some(diag) = &self.diagnostics {
            diag.reads
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            diag.bytes_read
                .fetch_add(n, std::sync::atomic::Ordering::Relaxed);
        }
        n
    }

    /// Consume up to `len` bytes without copying them anywhere.
    ///
    /// The discard twin of [`read`](Self::read) — a distinct operation
    /// because it is the hot path when advancing past bytes already
    /// examined via [`peek`](Self::peek).
    pub fn skip(&mut self, len: usize) -> usize {
        let n = self.drain(len, None);
        if let Some(diag) = &self.diagnostics {
            diag.skips
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        n
    }

    /// Copy exactly `dest.len()` bytes from the front of the ring without
    /// consuming them.
    ///
    /// All-or-nothing: fails with `InsufficientData` when fewer than
    /// `dest.len()` bytes are buffered, because callers typically need a
    /// complete fixed-size header before they can decide anything. Two
    /// peeks with no intervening read/skip observe identical bytes.
    pub fn peek(&self, dest: &mut [u8]) -> Result<usize> {
        let read = self.core.read_pos.load(Ordering::Relaxed);
        let write = self.core.write_pos.load(Ordering::Acquire);
        let used = self.core.used_between(read, write);

        if dest.len() > used {
            return Err(RingError::InsufficientData {
                requested: dest.len(),
                available: used,
            });
        }
        if !dest.is_empty() {
            // SAFETY: dest.len() <= used, so the source bytes lie inside
            // `[read_pos, write_pos)`; the producer does not write there
            // until read_pos advances, which peek never does.
            unsafe { self.core.copy_out(read, dest) };
        }
        if let Some(diag) = &self.diagnostics {
            diag.peeks
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        Ok(dest.len())
    }

    fn drain(&mut self, want: usize, dest: Option<&mut [u8]>) -> usize {
        let read = self.core.read_pos.load(Ordering::Relaxed);
        let write = self.core.write_pos.load(Ordering::Acquire);
        let used = self.core.used_between(read, write);

        let n = want.min(used);
        if n == 0 {
            return 0;
        }
        if let Some(dest) = dest {
            // SAFETY: n <= used, so the source bytes lie inside
            // `[read_pos, write_pos)`; the producer will not overwrite them
            // until the release store below publishes the advance.
            unsafe { self.core.copy_out(read, &mut dest[..n]) };
        }
        self.core
            .read_pos
            .store(self.core.advance(read, n), Ordering::Release);
        n
    }

    // ── Peek state machine ───────────────────────────────────────────────

    /// Mark the current read position as the rollback anchor
    /// (Normal → Peeking).
    ///
    /// No-op while already peeking: a nested save must not move the anchor
    /// forward, or the outermost lookahead would silently lose its
    /// rollback point. Nested calls are counted by the diagnostics sink.
    ///
    /// Bytes consumed past the anchor are republished to the producer as
    /// free space immediately; a producer that fills every last free byte
    /// can reach them, so keep speculative reads well below
    /// [`free_bytes`](Self::free_bytes) unless the producer is quiescent.
    pub fn save_read(&mut self) {
        if self.anchor.is_some() {
            if let Some(diag) = &self.diagnostics {
                diag.nested_saves_ignored
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            debug!("save_read ignored: already peeking");
            return;
        }
        let read = self.core.read_pos.load(Ordering::Relaxed);
        self.anchor = Some(read);
        if let Some(diag) = &self.diagnostics {
            diag.save_read_calls
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        debug!(read, "read position saved");
    }

    /// Roll the read cursor back to the anchor and leave peeking mode
    /// (Peeking → Normal).
    ///
    /// # Errors
    /// `NoSaveState` when no anchor is set; the cursor is untouched.
    pub fn restore_read(&mut self) -> Result<()> {
        let Some(anchor) = self.anchor.take() else {
            warn!("restore_read called without a saved read position");
            return Err(RingError::NoSaveState);
        };
        self.core.read_pos.store(anchor, Ordering::Release);
        if let Some(diag) = &self.diagnostics {
            diag.restore_read_calls
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        debug!(anchor, "read position restored");
        Ok(())
    }

    /// Leave peeking mode keeping the current read position, committing
    /// everything consumed since the anchor (Peeking → Normal).
    ///
    /// Idempotent: calling in Normal mode does nothing.
    pub fn clear_save_state(&mut self) {
        if self.anchor.take().is_some() {
            if let Some(diag) = &self.diagnostics {
                diag.clear_save_calls
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            debug!("save state cleared, lookahead committed");
        }
    }

    /// Move the read cursor backward by `len` bytes, staying at or after
    /// the anchor.
    ///
    /// # Errors
    /// - `NoSaveState` in Normal mode.
    /// - `BoundsExceeded` when `len` is greater than
    ///   [`consumed_since_anchor`](Self::consumed_since_anchor); the cursor
    ///   is untouched.
    pub fn rewind(&mut self, len: usize) -> Result<usize> {
        if self.anchor.is_none() {
            warn!("rewind called without a saved read position");
            return Err(RingError::NoSaveState);
        }
        let consumed = self.consumed_since_anchor();
        if len > consumed {
            if let Some(diag) = &self.diagnostics {
                diag.failed_seeks
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            return Err(RingError::BoundsExceeded {
                requested: len,
                limit: consumed,
            });
        }
        if len > 0 {
            let read = self.core.read_pos.load(Ordering::Relaxed);
            self.core
                .read_pos
                .store(self.core.retreat(read, len), Ordering::Release);
        }
        if let Some(diag) = &self.diagnostics {
            diag.rewinds
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        Ok(len)
    }

    /// Move the read cursor by a signed byte offset: forward like
    /// [`skip`](Self::skip), backward like [`rewind`](Self::rewind).
    ///
    /// Unlike `skip`, a forward seek past the buffered data is an error
    /// rather than a clamp; use [`can_seek`](Self::can_seek) to probe
    /// first. `delta == 0` always succeeds.
    ///
    /// # Errors
    /// - `BoundsExceeded` when the offset overshoots the available bytes
    ///   (forward) or the anchor distance (backward).
    /// - `NoSaveState` for any backward seek in Normal mode.
    pub fn seek(&mut self, delta: isize) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        if delta > 0 {
            let step = delta as usize;
            let used = self.used_bytes();
            if step > used {
                if let Some(diag) = &self.diagnostics {
                    diag.failed_seeks
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                return Err(RingError::BoundsExceeded {
                    requested: step,
                    limit: used,
                });
            }
            let read = self.core.read_pos.load(Ordering::Relaxed);
            self.core
                .read_pos
                .store(self.core.advance(read, step), Ordering::Release);
            Ok(())
        } else {
            self.rewind(delta.unsigned_abs()).map(|_| ())
        }
    }

    /// Whether [`seek`](Self::seek) with this `delta` would succeed, with
    /// no state change either way.
    pub fn can_seek(&self, delta: isize) -> bool {
        if delta == 0 {
            true
        } else if delta > 0 {
            delta as usize <= self.used_bytes()
        } else {
            self.anchor.is_some() && delta.unsigned_abs() <= self.consumed_since_anchor()
        }
    }

    /// True while an anchor is set (Peeking mode).
    pub fn is_peeking(&self) -> bool {
        self.anchor.is_some()
    }

    /// Bytes consumed since the anchor was taken; 0 in Normal mode.
    ///
    /// This is the rewind budget. Space accounting
    /// ([`used_bytes`](Self::used_bytes)/[`free_bytes`](Self::free_bytes))
    /// is always relative to the live cursor, never the anchor.
    pub fn consumed_since_anchor(&self) -> usize {
        match self.anchor {
            Some(anchor) => {
                let read = self.core.read_pos.load(Ordering::Relaxed);
                self.core.used_between(anchor, read)
            }
            None => 0,
        }
    }

    // ── Accounting & lifecycle ───────────────────────────────────────────

    /// Bytes currently buffered ahead of the read cursor.
    pub fn used_bytes(&self) -> usize {
        let read = self.core.read_pos.load(Ordering::Relaxed);
        let write = self.core.write_pos.load(Ordering::Acquire);
        self.core.used_between(read, write)
    }

    /// Bytes the producer can still append.
    pub fn free_bytes(&self) -> usize {
        self.core.capacity() - self.used_bytes()
    }

    /// Usable capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.used_bytes() == 0
    }

    /// Return the ring to its freshly-constructed state: both cursors
    /// zeroed, anchor cleared.
    ///
    /// Both sides must be quiescent — no in-flight `write` on the producer
    /// thread. The cursors are atomics, so a violation cannot corrupt
    /// memory, but it can drop or duplicate buffered bytes.
    pub fn reset(&mut self) {
        self.anchor = None;
        self.core.read_pos.store(0, Ordering::Release);
        self.core.write_pos.store(0, Ordering::Release);
        debug!("ring reset");
    }

    /// Point-in-time view of cursors and accounting, for debugging.
    pub fn state(&self) -> RingState {
        let read = self.core.read_pos.load(Ordering::Relaxed);
        let write = self.core.write_pos.load(Ordering::Acquire);
        let used = self.core.used_between(read, write);
        RingState {
            capacity: self.core.capacity(),
            read_pos: read,
            write_pos: write,
            anchor: self.anchor,
            used,
            free: self.core.capacity() - used,
            peeking: self.anchor.is_some(),
        }
    }

    /// Non-authoritative consistency check for tests and debug assertions;
    /// never consulted on the data path.
    pub fn validate(&self) -> bool {
        let modulus = self.core.storage_len();
        let read = self.core.read_pos.load(Ordering::Relaxed);
        let write = self.core.write_pos.load(Ordering::Acquire);
        if read >= modulus || write >= modulus {
            return false;
        }
        if let Some(anchor) = self.anchor {
            if anchor >= modulus {
                return false;
            }
        }
        let used = self.core.used_between(read, write);
        used <= self.core.capacity()
    }
}
