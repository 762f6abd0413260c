//! Binary wire codec primitives.
//!
//! The rules, applied recursively by every type's `write`/`read` pair:
//! - integers marked var-int on the wire are little-endian 7-bit groups with
//!   the high bit as a continuation flag
//! - sequences are a var-int length followed by the elements
//! - hashes, keys and signatures are raw POD bytes
//! - sum types are a one-byte tag followed by the payload
//!
//! Decoding is fallible everywhere; nothing in this module panics on
//! malformed input. Every failure carries the byte offset it was detected at.

/// Variant tags. These are part of the on-wire contract and must not change.
pub mod tags {
    /// Coinbase input.
    pub const TXIN_GEN: u8 = 0xff;
    /// Script input (reserved for forward compatibility).
    pub const TXIN_TO_SCRIPT: u8 = 0x00;
    /// Script-hash input (reserved for forward compatibility).
    pub const TXIN_TO_SCRIPTHASH: u8 = 0x01;
    /// One-time-key input.
    pub const TXIN_TO_KEY: u8 = 0x02;

    /// Script output.
    pub const TXOUT_TO_SCRIPT: u8 = 0x00;
    /// Script-hash output.
    pub const TXOUT_TO_SCRIPTHASH: u8 = 0x01;
    /// One-time-key output.
    pub const TXOUT_TO_KEY: u8 = 0x02;

    /// Wrapper tag identifying a transaction blob inside archive containers.
    pub const TRANSACTION: u8 = 0xcc;
    /// Wrapper tag identifying a block blob inside archive containers.
    pub const BLOCK: u8 = 0xbb;
}

/// A decode failure: the blob is not a valid encoding.
///
/// `offset` is the position (in bytes, from the start of the reader) at which
/// the failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("malformed blob at byte {offset}: {reason}")]
pub struct MalformedBlob {
    /// Byte offset the failure was detected at.
    pub offset: usize,
    /// Human-readable failure cause.
    pub reason: &'static str,
}

/// Cursor over an immutable byte slice.
///
/// All `read_*` methods advance the cursor and fail with [`MalformedBlob`]
/// (never panic) when the slice is exhausted or the encoding is invalid.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader over `bytes`, positioned at the start.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current offset from the start of the slice.
    pub const fn offset(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Construct a [`MalformedBlob`] at the current offset.
    pub const fn malformed(&self, reason: &'static str) -> MalformedBlob {
        MalformedBlob {
            offset: self.pos,
            reason,
        }
    }

    /// Read a single byte.
    ///
    /// # Errors
    /// Fails if the reader is exhausted.
    pub fn read_u8(&mut self) -> Result<u8, MalformedBlob> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(self.malformed("unexpected end of blob"))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read `len` raw bytes.
    ///
    /// # Errors
    /// Fails if fewer than `len` bytes remain. Impossible lengths are
    /// already rejected by [`Self::read_length`], so hitting this means
    /// the blob ends mid-value.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], MalformedBlob> {
        if len > self.remaining() {
            return Err(self.malformed("unexpected end of blob"));
        }
        let bytes = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read a fixed-width array of raw bytes.
    ///
    /// # Errors
    /// Fails if fewer than `N` bytes remain.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], MalformedBlob> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a fixed-width little-endian `u64`.
    ///
    /// # Errors
    /// Fails if fewer than 8 bytes remain.
    pub fn read_u64_le(&mut self) -> Result<u64, MalformedBlob> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a var-int into a `u64`.
    ///
    /// # Errors
    /// Fails on truncation, on an encoding longer than 10 bytes, and on a
    /// value that overflows 64 bits.
    pub fn read_varint(&mut self) -> Result<u64, MalformedBlob> {
        let start = self.pos;
        let mut value: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = self.read_u8()?;
            let group = u64::from(byte & 0x7f);
            // The 10th group only has room for the topmost bit of a u64.
            if shift == 63 && group > 1 {
                return Err(MalformedBlob {
                    offset: start,
                    reason: "var-int overflows u64",
                });
            }
            value |= group << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(MalformedBlob {
            offset: start,
            reason: "var-int longer than 10 bytes",
        })
    }

    /// Read a var-int into a `u128`.
    ///
    /// Wide integers (cumulative difficulty) may span up to 19 groups.
    ///
    /// # Errors
    /// Fails on truncation, on an encoding longer than 19 bytes, and on a
    /// value that overflows 128 bits.
    pub fn read_varint_u128(&mut self) -> Result<u128, MalformedBlob> {
        let start = self.pos;
        let mut value: u128 = 0;
        for shift in (0..128).step_by(7) {
            let byte = self.read_u8()?;
            let group = u128::from(byte & 0x7f);
            if shift == 126 && group > 3 {
                return Err(MalformedBlob {
                    offset: start,
                    reason: "var-int overflows u128",
                });
            }
            value |= group << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(MalformedBlob {
            offset: start,
            reason: "var-int longer than 19 bytes",
        })
    }

    /// Read a var-int length prefix, bounded by the remaining byte count.
    ///
    /// Every element of a sequence occupies at least one byte, so a length
    /// greater than [`Self::remaining`] can never decode and is rejected up
    /// front. This keeps allocations proportional to the input size.
    ///
    /// # Errors
    /// Fails on an invalid var-int or an impossible length.
    pub fn read_length(&mut self) -> Result<usize, MalformedBlob> {
        let start = self.pos;
        let len = self.read_varint()?;
        if len > self.remaining() as u64 {
            return Err(MalformedBlob {
                offset: start,
                reason: "length prefix exceeds remaining bytes",
            });
        }
        usize::try_from(len).map_err(|_| MalformedBlob {
            offset: start,
            reason: "length prefix exceeds remaining bytes",
        })
    }

    /// Fail unless the reader is fully consumed.
    ///
    /// # Errors
    /// Fails if any bytes remain.
    pub fn finish(&self) -> Result<(), MalformedBlob> {
        if self.remaining() != 0 {
            return Err(self.malformed("trailing bytes after value"));
        }
        Ok(())
    }
}

/// Append a `u64` var-int to `out`.
pub fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        #[allow(clippy::cast_possible_truncation)] // masked to 7 bits
        let group = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(group);
            return;
        }
        out.push(group | 0x80);
    }
}

/// Append a `u128` var-int to `out`.
pub fn write_varint_u128(mut value: u128, out: &mut Vec<u8>) {
    loop {
        #[allow(clippy::cast_possible_truncation)] // masked to 7 bits
        let group = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(group);
            return;
        }
        out.push(group | 0x80);
    }
}

/// Append a var-int length prefix followed by raw bytes.
pub fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    write_varint(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn roundtrip(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(value, &mut out);
        let mut r = ByteReader::new(&out);
        assert_eq!(r.read_varint().unwrap(), value);
        r.finish().unwrap();
        out
    }

    #[test]
    fn varint_roundtrip_boundaries() {
        assert_eq!(roundtrip(0), [0x00]);
        assert_eq!(roundtrip(0x7f), [0x7f]);
        assert_eq!(roundtrip(0x80), [0x80, 0x01]);
        assert_eq!(roundtrip(300), [0xac, 0x02]);
        assert_eq!(roundtrip(u64::MAX).len(), 10);
        for value in [1, 127, 128, 16383, 16384, u64::from(u32::MAX), u64::MAX] {
            roundtrip(value);
        }
    }

    #[test]
    fn varint_rejects_overlong_and_overflow() {
        // 11 continuation groups can never be a u64.
        let overlong = [0x80u8; 11];
        let err = ByteReader::new(&overlong).read_varint().unwrap_err();
        assert_eq!(err.reason, "var-int longer than 10 bytes");

        // 10 groups whose final group sets more than the top bit.
        let mut overflow = [0xffu8; 10];
        overflow[9] = 0x02;
        let err = ByteReader::new(&overflow).read_varint().unwrap_err();
        assert_eq!(err.reason, "var-int overflows u64");

        // Truncated mid-value.
        let err = ByteReader::new(&[0x80]).read_varint().unwrap_err();
        assert_eq!(err.reason, "unexpected end of blob");
    }

    #[test]
    fn varint_u128_roundtrip() {
        for value in [0u128, 1, u128::from(u64::MAX), u128::MAX] {
            let mut out = Vec::new();
            write_varint_u128(value, &mut out);
            let mut r = ByteReader::new(&out);
            assert_eq!(r.read_varint_u128().unwrap(), value);
            r.finish().unwrap();
        }
        let mut out = Vec::new();
        write_varint_u128(u128::MAX, &mut out);
        assert_eq!(out.len(), 19);
    }

    #[test]
    fn length_prefix_bounded_by_input() {
        // Claims 200 elements but only 1 byte follows.
        let blob = [0xc8, 0x01, 0x00];
        let mut r = ByteReader::new(&blob);
        let err = r.read_length().unwrap_err();
        assert_eq!(err.reason, "length prefix exceeds remaining bytes");
        assert_eq!(err.offset, 0);
    }

    /// The variant tags are frozen: they are the wire contract.
    #[test]
    fn tags_are_stable() {
        assert_eq!(tags::TXIN_GEN, 0xff);
        assert_eq!(tags::TXIN_TO_SCRIPT, 0x00);
        assert_eq!(tags::TXIN_TO_SCRIPTHASH, 0x01);
        assert_eq!(tags::TXIN_TO_KEY, 0x02);
        assert_eq!(tags::TXOUT_TO_SCRIPT, 0x00);
        assert_eq!(tags::TXOUT_TO_SCRIPTHASH, 0x01);
        assert_eq!(tags::TXOUT_TO_KEY, 0x02);
        assert_eq!(tags::TRANSACTION, 0xcc);
        assert_eq!(tags::BLOCK, 0xbb);
    }

    #[test]
    fn reader_tracks_offsets() {
        let mut r = ByteReader::new(&[1, 2, 3, 4]);
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.offset(), 1);
        assert_eq!(r.read_bytes(2).unwrap(), &[2, 3]);
        assert_eq!(r.offset(), 3);
        let err = r.read_bytes(2).unwrap_err();
        assert_eq!(err.offset, 3);
    }
}
