//! Binary encoding primitives for WebAssembly values.
//!
//! Provides LEB128 integer encoding, fixed-width patchable LEB128 slots,
//! IEEE 754 float encoding, and byte vector encoding as specified by the
//! WebAssembly binary format.
//!
//! All functions write directly into a caller-provided `&mut Vec<u8>` buffer,
//! avoiding intermediate allocations.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io;

// ---------------------------------------------------------------------------
// Module framing constants (spec section 5.5.16)
// ---------------------------------------------------------------------------

/// Module preamble magic number: `\0asm`.
pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

/// Binary format version.
pub const VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Unsigned LEB128
// ---------------------------------------------------------------------------

/// Appends the unsigned LEB128 encoding of a u32 value to `buf`.
pub fn write_vu32(buf: &mut Vec<u8>, v: u32) {
    let mut value = v;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

/// Appends a single-bit boolean as a one-byte LEB128 value (0x00 or 0x01).
pub fn write_vu1(buf: &mut Vec<u8>, v: bool) {
    buf.push(if v { 1 } else { 0 });
}

// ---------------------------------------------------------------------------
// Signed LEB128
// ---------------------------------------------------------------------------

/// Appends the signed LEB128 encoding of an i32 value to `buf`.
pub fn write_vs32(buf: &mut Vec<u8>, v: i32) {
    let mut value = v;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0) {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

// ---------------------------------------------------------------------------
// Patchable fixed-width LEB128
// ---------------------------------------------------------------------------

/// Width in bytes of a patchable unsigned LEB128 slot.
///
/// Five 7-bit groups cover the full u32 range; the fifth byte carries the
/// top four bits with its continuation flag clear.
pub const PATCHABLE_WIDTH: usize = 5;

/// Reserves a five-byte LEB128 slot in `buf` and returns its start position.
///
/// The slot is written speculatively as the encoding of zero
/// (`0x80 0x80 0x80 0x80 0x00`) and overwritten in place by [`patch_vu32`]
/// once the final value is known. The fixed width trades up to four bytes
/// of output per slot for single-pass streaming emission: section and body
/// sizes are only knowable after their contents have been written.
pub fn write_patchable_vu32(buf: &mut Vec<u8>) -> usize {
    let pos = buf.len();
    buf.extend_from_slice(&[0x80, 0x80, 0x80, 0x80, 0x00]);
    pos
}

/// Overwrites the five-byte slot at `pos` with the padded encoding of `v`.
///
/// Continuation bits are set on the first four bytes and clear on the fifth,
/// so the slot decodes as `v` for any u32. Total over u32; values wider than
/// 32 bits do not fit the slot and are rejected by the callers that compute
/// them.
pub fn patch_vu32(buf: &mut [u8], pos: usize, v: u32) {
    buf[pos] = 0x80 | (v & 0x7f) as u8;
    buf[pos + 1] = 0x80 | ((v >> 7) & 0x7f) as u8;
    buf[pos + 2] = 0x80 | ((v >> 14) & 0x7f) as u8;
    buf[pos + 3] = 0x80 | ((v >> 21) & 0x7f) as u8;
    buf[pos + 4] = ((v >> 28) & 0x0f) as u8;
}

// ---------------------------------------------------------------------------
// IEEE 754 floats (little-endian)
// ---------------------------------------------------------------------------

/// Appends the little-endian IEEE 754 encoding of an f32 value to `buf`.
pub fn write_f32(buf: &mut Vec<u8>, v: f32) {
    let mut bytes = [0u8; 4];
    let mut wtr = io::Cursor::new(&mut bytes[..]);
    wtr.write_f32::<LittleEndian>(v).unwrap();
    buf.extend_from_slice(&bytes);
}

/// Appends the little-endian IEEE 754 encoding of an f64 value to `buf`.
pub fn write_f64(buf: &mut Vec<u8>, v: f64) {
    let mut bytes = [0u8; 8];
    let mut wtr = io::Cursor::new(&mut bytes[..]);
    wtr.write_f64::<LittleEndian>(v).unwrap();
    buf.extend_from_slice(&bytes);
}

// ---------------------------------------------------------------------------
// Length-prefixed byte vector
// ---------------------------------------------------------------------------

/// Appends a length-prefixed byte vector (vu32 length + raw bytes) to `buf`.
pub fn write_u8vec(buf: &mut Vec<u8>, v: &[u8]) {
    write_vu32(buf, v.len() as u32);
    buf.extend_from_slice(v);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
