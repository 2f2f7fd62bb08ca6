//! End-to-end scenarios for the peek/rollback protocol.

use peekring_core::{create_ring, RingError};

#[test]
fn peek_then_abort_replays_the_full_stream() {
    let (mut producer, mut consumer) = create_ring(16).unwrap();

    let data: Vec<u8> = (0..10).collect();
    assert_eq!(producer.write(&data), 10);

    // Lookahead at a 4-byte header leaves the accounting untouched.
    let mut header = [0u8; 4];
    assert_eq!(consumer.peek(&mut header), Ok(4));
    assert_eq!(header, [0, 1, 2, 3]);
    assert_eq!(consumer.used_bytes(), 10);

    // Speculatively consume the header...
    consumer.save_read();
    let mut buf = [0u8; 4];
    assert_eq!(consumer.read(&mut buf), 4);
    assert_eq!(buf, [0, 1, 2, 3]);
    assert_eq!(consumer.used_bytes(), 6);

    // ...then decide the frame is unusable and roll back.
    consumer.restore_read().unwrap();
    assert_eq!(consumer.used_bytes(), 10);

    let mut all = [0u8; 10];
    assert_eq!(consumer.read(&mut all), 10);
    assert_eq!(all.to_vec(), data);
}

#[test]
fn full_ring_reserves_exactly_one_slot() {
    // Capacity 8 means 9 storage bytes; the 9th is the reserved slot.
    let (mut producer, mut consumer) = create_ring(8).unwrap();

    assert_eq!(producer.write(&[0xAA; 8]), 8);
    assert_eq!(producer.write(&[0xBB]), 0, "full ring must refuse a 9th byte");

    let mut one = [0u8; 1];
    assert_eq!(consumer.read(&mut one), 1);
    assert_eq!(producer.write(&[0xBB]), 1, "draining one byte reopens one slot");
}

#[test]
fn replay_after_restore_returns_identical_bytes() {
    let (mut producer, mut consumer) = create_ring(32).unwrap();
    producer.write(b"abcdefgh");

    consumer.save_read();
    let mut first = [0u8; 5];
    assert_eq!(consumer.read(&mut first), 5);

    consumer.restore_read().unwrap();

    let mut second = [0u8; 5];
    assert_eq!(consumer.read(&mut second), 5);
    assert_eq!(first, second);
}

#[test]
fn round_trip_across_the_wraparound_boundary() {
    let (mut producer, mut consumer) = create_ring(16).unwrap();

    // Park the cursors near the end of the 17-byte storage array.
    assert_eq!(producer.write(&[0; 14]), 14);
    assert_eq!(consumer.skip(14), 14);

    // This write must split across the physical end of storage.
    let data: Vec<u8> = (100..112).collect();
    assert_eq!(producer.write(&data), 12);

    let mut out = [0u8; 12];
    assert_eq!(consumer.read(&mut out), 12);
    assert_eq!(out.to_vec(), data);
    assert!(consumer.validate());
}

#[test]
fn peek_and_rewind_work_across_the_wraparound_boundary() {
    let (mut producer, mut consumer) = create_ring(8).unwrap();

    // Cursor at position 7 of a 9-byte storage array.
    producer.write(&[0; 7]);
    consumer.skip(7);
    producer.write(&[1, 2, 3, 4, 5, 6]);

    let mut peeked = [0u8; 6];
    assert_eq!(consumer.peek(&mut peeked), Ok(6));
    assert_eq!(peeked, [1, 2, 3, 4, 5, 6]);

    consumer.save_read();
    consumer.skip(5);
    assert_eq!(consumer.consumed_since_anchor(), 5);
    assert_eq!(consumer.rewind(5), Ok(5));

    let mut out = [0u8; 6];
    assert_eq!(consumer.read(&mut out), 6);
    assert_eq!(out, [1, 2, 3, 4, 5, 6]);
}

#[test]
fn write_read_totals_stay_consistent() {
    let (mut producer, mut consumer) = create_ring(24).unwrap();

    let mut written = 0usize;
    let mut read = 0usize;
    let mut sink = [0u8; 7];

    for round in 0..64 {
        written += producer.write(&[round as u8; 5]);
        read += consumer.read(&mut sink);
        assert_eq!(consumer.used_bytes(), written - read);
        assert!(consumer.used_bytes() <= consumer.capacity());
    }

    read += consumer.skip(usize::MAX);
    assert_eq!(written, read);
    assert!(consumer.is_empty());
}

#[test]
fn frame_parser_retries_until_payload_arrives() {
    // The motivating use: a parser peeks a length header, tries to take the
    // payload, and rolls back when the producer has not caught up yet.
    let (mut producer, mut consumer) = create_ring(64).unwrap();

    producer.write(&[5]); // header: 5-byte payload
    producer.write(b"ab"); // partial payload

    let mut header = [0u8; 1];
    consumer.peek(&mut header).unwrap();
    let payload_len = header[0] as usize;

    consumer.save_read();
    consumer.skip(1);
    let mut payload = vec![0u8; payload_len];
    let got = consumer.read(&mut payload);
    assert_eq!(got, 2, "only part of the payload is buffered");
    consumer.restore_read().unwrap();
    assert_eq!(consumer.used_bytes(), 3, "nothing was committed");

    // Producer finishes the frame; the second attempt commits.
    producer.write(b"cde");
    consumer.save_read();
    consumer.skip(1);
    assert_eq!(consumer.read(&mut payload), 5);
    consumer.clear_save_state();

    assert_eq!(&payload, b"abcde");
    assert!(consumer.is_empty());
    assert!(!consumer.is_peeking());
}

#[test]
fn backward_seek_in_normal_mode_never_moves_the_cursor() {
    let (mut producer, mut consumer) = create_ring(16).unwrap();
    producer.write(&[1; 10]);
    consumer.skip(6);

    let before = consumer.state();
    assert_eq!(consumer.seek(-3), Err(RingError::NoSaveState));
    assert_eq!(consumer.rewind(3), Err(RingError::NoSaveState));
    assert_eq!(consumer.state(), before);
}

#[test]
fn seek_generalizes_skip_and_rewind() {
    let (mut producer, mut consumer) = create_ring(32).unwrap();
    producer.write(b"0123456789");

    consumer.save_read();
    assert_eq!(consumer.seek(4), Ok(()));
    assert_eq!(consumer.consumed_since_anchor(), 4);
    assert_eq!(consumer.seek(-2), Ok(()));
    assert_eq!(consumer.consumed_since_anchor(), 2);

    let mut buf = [0u8; 2];
    consumer.peek(&mut buf).unwrap();
    assert_eq!(&buf, b"23");

    // Bounds are checked before any movement.
    assert_eq!(
        consumer.seek(-3),
        Err(RingError::BoundsExceeded {
            requested: 3,
            limit: 2
        })
    );
    assert_eq!(
        consumer.seek(9),
        Err(RingError::BoundsExceeded {
            requested: 9,
            limit: 8
        })
    );
    assert_eq!(consumer.consumed_since_anchor(), 2);
}
