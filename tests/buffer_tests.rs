use std::io::Cursor;

use web_server::buffer::Buffer;

#[test]
fn test_offsets_track_append_and_consume() {
    let mut buf = Buffer::new(16);
    assert_eq!(buf.readable_bytes(), 0);
    assert_eq!(buf.writable_bytes(), 16);
    assert_eq!(buf.prependable_bytes(), 0);

    buf.append(b"hello");
    assert_eq!(buf.readable_bytes(), 5);
    assert_eq!(buf.writable_bytes(), 11);

    buf.has_read(2);
    assert_eq!(buf.readable_bytes(), 3);
    assert_eq!(buf.prependable_bytes(), 2);
    assert_eq!(buf.peek(), b"llo");
}

#[test]
fn test_take_string_round_trip() {
    let mut buf = Buffer::default();
    buf.append(b"append then take");
    assert_eq!(buf.take_string(), "append then take");
    assert_eq!(buf.readable_bytes(), 0);
    assert_eq!(buf.prependable_bytes(), 0);
}

#[test]
fn test_large_append_survives_growth() {
    // 200 kB of a rolling pattern through a tiny initial arena.
    let payload: Vec<u8> = (0..200 * 1024).map(|i| (i % 251) as u8).collect();
    let mut buf = Buffer::new(64);
    buf.append(&payload);
    assert_eq!(buf.readable_bytes(), payload.len());
    assert_eq!(buf.peek(), &payload[..]);
}

#[test]
fn test_compaction_reclaims_consumed_space() {
    let mut buf = Buffer::new(8);
    buf.append(b"abcdef");
    buf.has_read(4);
    // Two readable bytes; compaction alone makes room for six more.
    buf.append(b"123456");
    assert_eq!(buf.peek(), b"ef123456");
    assert_eq!(buf.prependable_bytes(), 0);
}

#[test]
fn test_append_buffer_copies_unread_region() {
    let mut a = Buffer::default();
    let mut b = Buffer::default();
    b.append(b"xyz");
    b.has_read(1);
    a.append(b"ab");
    a.append_buffer(&b);
    assert_eq!(a.peek(), b"abyz");
    assert_eq!(b.readable_bytes(), 2);
}

#[test]
fn test_gather_read_fits_writable_region() {
    let mut buf = Buffer::new(64);
    let mut src = Cursor::new(b"short".to_vec());
    let n = buf.read_from(&mut src).unwrap();
    assert_eq!(n, 5);
    assert_eq!(buf.peek(), b"short");
}

#[test]
fn test_gather_read_overflow_lands_in_arena() {
    let payload: Vec<u8> = (0..4096).map(|i| (i % 13) as u8 + b'a').collect();
    let mut buf = Buffer::new(16);
    let mut src = Cursor::new(payload.clone());
    let n = buf.read_from(&mut src).unwrap();
    assert_eq!(n, 4096);
    assert_eq!(buf.readable_bytes(), 4096);
    assert_eq!(buf.peek(), &payload[..]);
}

#[test]
fn test_write_to_advances_read_pos() {
    let mut buf = Buffer::default();
    buf.append(b"drain me");
    let mut out = Vec::new();
    let n = buf.write_to(&mut out).unwrap();
    assert_eq!(n, 8);
    assert_eq!(out, b"drain me");
    assert_eq!(buf.readable_bytes(), 0);
}
