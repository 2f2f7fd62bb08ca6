//! # peekring-core
//!
//! Lock-free single-producer/single-consumer byte ring buffer with a
//! speculative peek/rollback protocol.
//!
//! ## Architecture
//!
//! ```text
//! producer thread                            consumer thread
//! Producer::write ──► [ capacity+1 bytes ] ──► Consumer::read / peek / skip
//!      │ Release write_pos          Acquire ▲          │
//!      ▲ Acquire read_pos           Release │    save_read / rewind /
//!      └────────────────────────────────────┘    restore_read  (anchor,
//!                                                 consumer-private)
//! ```
//!
//! The consumer can mark its position (`save_read`), read ahead to parse a
//! variable-length frame header, and either commit (`clear_save_state`) or
//! roll back (`restore_read`, `rewind`) when the lookahead fails to yield
//! a usable unit. Space accounting is always derived from the two
//! atomically published cursors; the anchor never crosses the thread
//! boundary.
//!
//! No operation blocks or sleeps. Every call completes in time bounded by
//! the bytes it moves, returning however much work it could do (possibly
//! zero) — backoff policy belongs to the caller.
//!
//! ## Example
//!
//! ```
//! use peekring_core::create_ring;
//!
//! let (mut producer, mut consumer) = create_ring(64).unwrap();
//! producer.write(b"\x03abcrest");
//!
//! // Parse a length-prefixed frame speculatively.
//! let mut header = [0u8; 1];
//! consumer.peek(&mut header).unwrap();
//! consumer.save_read();
//! consumer.skip(1);
//!
//! let mut payload = vec![0u8; header[0] as usize];
//! if consumer.read(&mut payload) == payload.len() {
//!     consumer.clear_save_state(); // frame complete — commit
//! } else {
//!     consumer.restore_read().unwrap(); // incomplete — retry later
//! }
//! assert_eq!(&payload, b"abc");
//! ```

#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod diagnostics;
pub mod error;
pub mod ring;

// Convenience re-exports for downstream crates
pub use diagnostics::{DiagnosticsSnapshot, RingDiagnostics};
pub use error::{Result, RingError};
pub use ring::{create_ring, create_ring_with, Consumer, Producer, RingConfig, RingState};
