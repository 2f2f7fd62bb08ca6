//! Lock-free SPSC byte ring with a consumer-side peek protocol.
//!
//! ## Layout
//!
//! Storage is a single heap allocation of `capacity + 1` bytes. The extra
//! slot is permanently reserved so that `read_pos == write_pos` always
//! means empty and a completely full ring stops one slot short of the read
//! cursor — no separate full/empty flag, no shared byte counter.
//!
//! ## Cursor ownership
//!
//! ```text
//! Producer::write   copies bytes, then Release-stores write_pos
//! Consumer::read    Acquire-loads write_pos, then reads the bytes
//! Consumer::read    advances, then Release-stores read_pos
//! Producer::write   Acquire-loads read_pos to size the free region
//! ```
//!
//! The release/acquire pairing in both directions is the entire
//! synchronization story: each side owns one cursor, and free/used space
//! is always derived from the two published values. The consumer's saved
//! anchor never crosses the thread boundary.

pub mod consumer;
pub mod producer;
pub(crate) mod region;

use std::alloc::{self, Layout};
use std::ptr;
use std::sync::Arc;

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use serde::Serialize;

use crate::diagnostics::RingDiagnostics;
use crate::error::{Result, RingError};

pub use consumer::Consumer;
pub use producer::Producer;

/// Shared storage and cursor pair behind both handles.
///
/// # Invariants
/// - `storage` points to `capacity + 1` allocated, zero-initialized bytes.
/// - `write_pos` and `read_pos` are always in `[0, capacity]`.
/// - Only the producer half stores `write_pos`; only the consumer half
///   stores `read_pos` (`Consumer::reset` is the documented exception and
///   requires both sides quiescent).
/// - Bytes in the logical range `[read_pos, write_pos)` are owned by the
///   consumer for reading; the rest of storage minus the reserved slot is
///   owned by the producer for writing.
pub(crate) struct RingCore {
    storage: *mut u8,
    capacity: usize,
    /// Producer's cursor: next byte to write. Padded so the two cursors
    /// never share a cache line.
    pub(crate) write_pos: CachePadded<AtomicUsize>,
    /// Consumer's cursor: next byte to read.
    pub(crate) read_pos: CachePadded<AtomicUsize>,
}

// SAFETY: the cursor protocol above keeps producer writes and consumer
// reads on disjoint storage regions; the cursors themselves are atomics.
unsafe impl Send for RingCore {}
unsafe impl Sync for RingCore {}

impl RingCore {
    fn allocate(capacity: usize) -> Result<Self> {
        let storage_len = match capacity.checked_add(1) {
            Some(n) if capacity > 0 => n,
            _ => return Err(RingError::InvalidCapacity { requested: capacity }),
        };
        let layout = Layout::array::<u8>(storage_len)
            .map_err(|_| RingError::InvalidCapacity { requested: capacity })?;

        // SAFETY: layout has non-zero size (storage_len >= 2).
        let storage = unsafe { alloc::alloc_zeroed(layout) };
        if storage.is_null() {
            return Err(RingError::AllocationFailure { capacity });
        }

        Ok(Self {
            storage,
            capacity,
            write_pos: CachePadded::new(AtomicUsize::new(0)),
            read_pos: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    /// Usable capacity in bytes (the reserved slot is never reported).
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Storage length; also the modulus for all cursor arithmetic.
    #[inline]
    pub(crate) fn storage_len(&self) -> usize {
        self.capacity + 1
    }

    /// Bytes readable between a cursor pair, in `[0, capacity]`.
    #[inline]
    pub(crate) fn used_between(&self, read: usize, write: usize) -> usize {
        (write + self.storage_len() - read) % self.storage_len()
    }

    #[inline]
    pub(crate) fn advance(&self, pos: usize, by: usize) -> usize {
        debug_assert!(by <= self.capacity);
        (pos + by) % self.storage_len()
    }

    #[inline]
    pub(crate) fn retreat(&self, pos: usize, by: usize) -> usize {
        debug_assert!(by <= self.capacity);
        (pos + self.storage_len() - by) % self.storage_len()
    }

    /// Copy `src` into storage starting at logical position `at`, splitting
    /// at the wraparound boundary when needed.
    ///
    /// # Safety
    /// The caller must be the producer half and must have verified that the
    /// `src.len()` bytes starting at `at` lie inside the free region, so no
    /// concurrent consumer read overlaps them.
    pub(crate) unsafe fn copy_in(&self, at: usize, src: &[u8]) {
        let (first, second) = region::wrapping_ranges(at, src.len(), self.storage_len());
        let head = first.len();
        // SAFETY: both ranges are in-bounds of the allocation by
        // construction; disjointness from concurrent reads is the caller's
        // contract.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.storage.add(first.start), head);
            if let Some(second) = second {
                ptr::copy_nonoverlapping(
                    src.as_ptr().add(head),
                    self.storage.add(second.start),
                    second.len(),
                );
            }
        }
    }

    /// Copy `dst.len()` bytes out of storage starting at logical position
    /// `at`, splitting at the wraparound boundary when needed.
    ///
    /// # Safety
    /// The caller must be the consumer half and must have verified that the
    /// `dst.len()` bytes starting at `at` lie inside the used region, so no
    /// concurrent producer write overlaps them.
    pub(crate) unsafe fn copy_out(&self, at: usize, dst: &mut [u8]) {
        let (first, second) = region::wrapping_ranges(at, dst.len(), self.storage_len());
        let head = first.len();
        // SAFETY: both ranges are in-bounds of the allocation by
        // construction; disjointness from concurrent writes is the caller's
        // contract.
        unsafe {
            ptr::copy_nonoverlapping(self.storage.add(first.start), dst.as_mut_ptr(), head);
            if let Some(second) = second {
                ptr::copy_nonoverlapping(
                    self.storage.add(second.start),
                    dst.as_mut_ptr().add(head),
                    second.len(),
                );
            }
        }
    }
}

impl Drop for RingCore {
    fn drop(&mut self) {
        // SAFETY: storage was allocated in `allocate` with this exact size
        // and alignment 1.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.storage_len(), 1);
            alloc::dealloc(self.storage, layout);
        }
    }
}

/// Configuration for ring construction.
///
/// `create_ring` covers the common case; use this when attaching a
/// diagnostics sink.
#[derive(Clone, Debug)]
pub struct RingConfig {
    /// Usable capacity in bytes. One extra slot is allocated internally.
    pub capacity_bytes: usize,
    /// Optional operation counters. When `None`, no counting happens at
    /// all; the ring's behavior never depends on this field.
    pub diagnostics: Option<Arc<RingDiagnostics>>,
}

impl RingConfig {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            diagnostics: None,
        }
    }

    /// Attach a shared counter sink to both handles.
    pub fn with_diagnostics(mut self, sink: Arc<RingDiagnostics>) -> Self {
        self.diagnostics = Some(sink);
        self
    }
}

/// Point-in-time view of the ring, taken from the consumer side.
///
/// Serializable so it can be dumped alongside diagnostics snapshots when
/// debugging a stuck stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RingState {
    pub capacity: usize,
    pub read_pos: usize,
    pub write_pos: usize,
    pub anchor: Option<usize>,
    pub used: usize,
    pub free: usize,
    pub peeking: bool,
}

/// Create a matched producer/consumer pair over fresh ring storage.
///
/// # Errors
/// - `RingError::InvalidCapacity` when `capacity_bytes` is zero or too
///   large for an allocation layout.
/// - `RingError::AllocationFailure` when the allocator cannot satisfy the
///   request. No partially-usable pair is ever returned.
pub fn create_ring(capacity_bytes: usize) -> Result<(Producer, Consumer)> {
    create_ring_with(RingConfig::new(capacity_bytes))
}

/// Create a producer/consumer pair from a full [`RingConfig`].
pub fn create_ring_with(config: RingConfig) -> Result<(Producer, Consumer)> {
    let core = Arc::new(RingCore::allocate(config.capacity_bytes)?);
    tracing::debug!(capacity = config.capacity_bytes, "ring created");
    Ok((
        Producer::new(Arc::clone(&core), config.diagnostics.clone()),
        Consumer::new(core, config.diagnostics),
    ))
}
