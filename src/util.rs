// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The variable-length zig-zag integer codec shared by every other component,
//! plus the allocation guard used when decoding untrusted length prefixes.

use crate::{AvroResult, error::Error};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Maximum number of bytes that can be allocated when decoding
/// Avro-encoded values. This is a protection against ill-formed
/// data, whose length field might be interpreted as enormous.
pub const DEFAULT_MAX_ALLOCATION_BYTES: usize = 512 * 1024 * 1024;
static MAX_ALLOCATION_BYTES: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_ALLOCATION_BYTES);

/// Set a new maximum number of bytes that can be allocated when decoding data.
///
/// Returns the previous maximum.
pub fn max_allocation_bytes(num_bytes: usize) -> usize {
    MAX_ALLOCATION_BYTES.swap(num_bytes, Ordering::AcqRel)
}

pub(crate) fn safe_len(len: usize) -> AvroResult<usize> {
    let max_bytes = MAX_ALLOCATION_BYTES.load(Ordering::Acquire);

    if len <= max_bytes {
        Ok(len)
    } else {
        Err(Error::MemoryAllocation {
            desired: len,
            maximum: max_bytes,
        })
    }
}

pub(crate) fn zig_i32<W: Write>(n: i32, writer: W) -> AvroResult<usize> {
    zig_i64(n as i64, writer)
}

pub(crate) fn zig_i64<W: Write>(n: i64, writer: W) -> AvroResult<usize> {
    encode_variable(zigzag(n), writer)
}

pub(crate) fn zag_i32<R: Read>(reader: &mut R) -> AvroResult<i32> {
    let i = zag_i64(reader)?;
    i32::try_from(i).map_err(|_| Error::IntegerOverflow)
}

pub(crate) fn zag_i64<R: Read>(reader: &mut R) -> AvroResult<i64> {
    decode_variable(reader).map(unzigzag)
}

/// Number of bytes `zig_i64` produces for `n`, without producing them.
pub(crate) fn zig_len(n: i64) -> usize {
    let zz = zigzag(n);
    ((64 - (zz | 1).leading_zeros() as usize) + 6) / 7
}

#[inline]
fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
fn unzigzag(z: u64) -> i64 {
    if z & 0x1 == 0 {
        (z >> 1) as i64
    } else {
        !(z >> 1) as i64
    }
}

fn encode_variable<W: Write>(mut z: u64, mut writer: W) -> AvroResult<usize> {
    let mut buffer = [0u8; 10];
    let mut i: usize = 0;
    loop {
        if z <= 0x7F {
            buffer[i] = (z & 0x7F) as u8;
            i += 1;
            break;
        } else {
            buffer[i] = (0x80 | (z & 0x7F)) as u8;
            i += 1;
            z >>= 7;
        }
    }
    writer
        .write_all(&buffer[..i])
        .map_err(Error::WriteBytes)
        .map(|()| i)
}

fn decode_variable<R: Read>(reader: &mut R) -> AvroResult<u64> {
    let mut i = 0u64;
    let mut buf = [0u8; 1];

    let mut j = 0;
    loop {
        if j > 9 {
            // j * 7 > 64
            return Err(Error::IntegerOverflow);
        }
        reader
            .read_exact(&mut buf[..])
            .map_err(|e| Error::io_read(e, "a variable-length integer"))?;
        i |= u64::from(buf[0] & 0x7F) << (j * 7);
        if (buf[0] >> 7) == 0 {
            break;
        } else {
            j += 1;
        }
    }

    Ok(i)
}

/// Slice-based twin of `zag_i64` for the skip operation: decodes one zig-zag
/// long starting at `pos` and returns it with the new position.
pub(crate) fn zag_i64_slice(buf: &[u8], pos: usize) -> AvroResult<(i64, usize)> {
    let mut i = 0u64;
    let mut j = 0;
    loop {
        if j > 9 {
            return Err(Error::IntegerOverflow);
        }
        let byte = *buf
            .get(pos + j)
            .ok_or(Error::Truncated("a variable-length integer"))?;
        i |= u64::from(byte & 0x7F) << (j * 7);
        if (byte >> 7) == 0 {
            return Ok((unzigzag(i), pos + j + 1));
        }
        j += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zigzag_int_long_agree() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        zig_i32(42i32, &mut a).unwrap();
        zig_i64(42i64, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zig_i64() {
        let mut s = Vec::new();

        zig_i64(0, &mut s).unwrap();
        assert_eq!(s, [0]);

        s.clear();
        zig_i64(-1, &mut s).unwrap();
        assert_eq!(s, [1]);

        s.clear();
        zig_i64(1, &mut s).unwrap();
        assert_eq!(s, [2]);

        s.clear();
        zig_i64(-64, &mut s).unwrap();
        assert_eq!(s, [127]);

        s.clear();
        zig_i64(64, &mut s).unwrap();
        assert_eq!(s, [128, 1]);

        s.clear();
        zig_i64(i64::MAX, &mut s).unwrap();
        assert_eq!(s, [254, 255, 255, 255, 255, 255, 255, 255, 255, 1]);

        s.clear();
        zig_i64(i64::MIN, &mut s).unwrap();
        assert_eq!(s, [255, 255, 255, 255, 255, 255, 255, 255, 255, 1]);
    }

    #[test]
    fn test_zag_round_trip() {
        for n in [0i64, 1, -1, 63, 64, -65, i32::MAX as i64, i64::MAX, i64::MIN] {
            let mut s = Vec::new();
            zig_i64(n, &mut s).unwrap();
            assert_eq!(zag_i64(&mut &s[..]).unwrap(), n);
            assert_eq!(zag_i64_slice(&s, 0).unwrap(), (n, s.len()));
        }
    }

    #[test]
    fn test_zig_len_matches_encoding() {
        for n in [
            0i64,
            1,
            -1,
            63,
            64,
            -65,
            300,
            i32::MAX as i64,
            i32::MIN as i64,
            i64::MAX,
            i64::MIN,
        ] {
            let mut s = Vec::new();
            zig_i64(n, &mut s).unwrap();
            assert_eq!(zig_len(n), s.len(), "length mismatch for {n}");
        }
    }

    #[test]
    fn test_truncated_varint() {
        let incomplete: &[u8] = &[0x80];
        match zag_i64(&mut &*incomplete) {
            Err(Error::Truncated(_)) => {}
            other => panic!("expected Truncated, got {other:?}"),
        }
        match zag_i64_slice(incomplete, 0) {
            Err(Error::Truncated(_)) => {}
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn test_overflow() {
        let too_long: &[u8] = &[0xff; 11];
        match zag_i64(&mut &*too_long) {
            Err(Error::IntegerOverflow) => {}
            other => panic!("expected IntegerOverflow, got {other:?}"),
        }
        match zag_i64_slice(too_long, 0) {
            Err(Error::IntegerOverflow) => {}
            other => panic!("expected IntegerOverflow, got {other:?}"),
        }
    }

    #[test]
    fn test_safe_len() {
        assert_eq!(42usize, safe_len(42usize).unwrap());
        assert!(safe_len(usize::MAX).is_err());
    }
}
