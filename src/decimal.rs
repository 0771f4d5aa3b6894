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

use crate::{AvroResult, error::Error};
use num_bigint::{BigInt, Sign};

/// An unscaled arbitrary-precision decimal value.
///
/// The wire representation is the two's-complement big-endian bytes of the
/// unscaled integer; the scale lives in the schema. The byte length the value
/// was constructed with is preserved so that `read(write(v)) == v` holds down
/// to the bytes.
#[derive(Debug, Clone, Eq)]
pub struct Decimal {
    value: BigInt,
    len: usize,
}

// Two decimals are the same number even when captured at different widths.
impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Decimal {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Number of decimal digits in the unscaled value, for precision checks.
    pub(crate) fn digits(&self) -> usize {
        let (_, digits) = self.value.to_radix_le(10);
        digits.len()
    }

    pub(crate) fn to_vec(&self) -> AvroResult<Vec<u8>> {
        self.to_sign_extended_bytes_with_len(self.len)
    }

    /// The two's-complement big-endian bytes, sign-extended to exactly `len`
    /// bytes.
    pub(crate) fn to_sign_extended_bytes_with_len(&self, len: usize) -> AvroResult<Vec<u8>> {
        let magnitude = self.value.to_signed_bytes_be();
        if magnitude.len() > len {
            return Err(Error::DecimalSignExtend {
                size: len,
                needed: magnitude.len(),
            });
        }
        let fill = match self.value.sign() {
            Sign::Minus => 0xFF,
            _ => 0x00,
        };
        Ok(std::iter::repeat_n(fill, len - magnitude.len())
            .chain(magnitude)
            .collect())
    }
}

impl From<Decimal> for BigInt {
    fn from(decimal: Decimal) -> Self {
        decimal.value
    }
}

impl<T: AsRef<[u8]>> From<T> for Decimal {
    fn from(bytes: T) -> Self {
        let bytes_ref = bytes.as_ref();
        Self {
            value: BigInt::from_signed_bytes_be(bytes_ref),
            len: bytes_ref.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_decimal_byte_round_trip() -> TestResult {
        let input = vec![1, 24];
        let d = Decimal::from(&input);
        assert_eq!(d.to_vec()?, input);
        Ok(())
    }

    #[test]
    fn test_negative_sign_extension() -> TestResult {
        let d = Decimal::from([0xFF_u8, 0x38]); // -200
        assert_eq!(
            d.to_sign_extended_bytes_with_len(4)?,
            vec![0xFF, 0xFF, 0xFF, 0x38]
        );
        Ok(())
    }

    #[test]
    fn test_sign_extension_too_small() {
        let d = Decimal::from([0x01_u8, 0x00, 0x00]);
        match d.to_sign_extended_bytes_with_len(2) {
            Err(Error::DecimalSignExtend { size: 2, needed: 3 }) => {}
            other => panic!("expected DecimalSignExtend, got {other:?}"),
        }
    }

    #[test]
    fn test_digits() {
        assert_eq!(Decimal::from([0_u8]).digits(), 1);
        assert_eq!(Decimal::from([100_u8]).digits(), 3);
        // -200 has three significant digits.
        assert_eq!(Decimal::from([0xFF_u8, 0x38]).digits(), 3);
    }
}
