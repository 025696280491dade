//! Small byte-twiddling helpers shared by the frame codecs.

use bytes::{Buf, BufMut};

/// Reads a 24-bit big-endian unsigned integer (HTTP/2 frame `Length`).
pub(super) fn read_u24(buf: &[u8]) -> u32 {
    (u32::from(buf[0]) << 16) | (u32::from(buf[1]) << 8) | u32::from(buf[2])
}

/// Writes a 24-bit big-endian unsigned integer.
pub(super) fn write_u24<B: BufMut>(dst: &mut B, v: u32) {
    dst.put_u8((v >> 16) as u8);
    dst.put_u8((v >> 8) as u8);
    dst.put_u8(v as u8);
}

/// Reads a 31-bit big-endian unsigned integer with the reserved top bit
/// masked off (used for stream ids and window increments).
pub(super) fn read_u31(buf: &mut impl Buf) -> u32 {
    buf.get_u32() & !(1 << 31)
}
