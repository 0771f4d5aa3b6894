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

use crate::{
    AvroResult,
    decimal::Decimal,
    duration::Duration,
    error::Error,
    schema::{
        DecimalSchema, EnumSchema, FixedSchema, Name, RecordSchema, ResolvedSchema, Schema,
        UnionSchema,
    },
    types::Value,
    util::{safe_len, zag_i32, zag_i64, zag_i64_slice},
};
use std::{borrow::Borrow, collections::HashMap, io::Read, str::FromStr};
use uuid::Uuid;

/// Decode one `Value` from Avro binary format, driven by its `Schema`.
pub fn decode<R: Read>(schema: &Schema, reader: &mut R) -> AvroResult<Value> {
    let rs = ResolvedSchema::try_from(schema)?;
    decode_internal(schema, rs.get_names(), reader)
}

fn decode_len<R: Read>(reader: &mut R) -> AvroResult<usize> {
    let len = zag_i64(reader)?;
    let len = usize::try_from(len).map_err(|_| Error::Truncated("a negative length prefix"))?;
    safe_len(len)
}

fn decode_exact<R: Read>(len: usize, what: &'static str, reader: &mut R) -> AvroResult<Vec<u8>> {
    let mut buf = vec![0u8; safe_len(len)?];
    reader
        .read_exact(&mut buf)
        .map_err(|e| Error::io_read(e, what))?;
    Ok(buf)
}

/// Read one collection block header and return the number of items in the
/// block. A negative count carries a byte-length prefix which is read and
/// discarded here.
fn decode_block_count<R: Read>(reader: &mut R) -> AvroResult<usize> {
    let count = zag_i64(reader)?;
    if count < 0 {
        let _byte_length = zag_i64(reader)?;
        Ok(count.unsigned_abs() as usize)
    } else {
        Ok(count as usize)
    }
}

pub(crate) fn decode_internal<R: Read, S: Borrow<Schema>>(
    schema: &Schema,
    names: &HashMap<Name, S>,
    reader: &mut R,
) -> AvroResult<Value> {
    match schema {
        Schema::Ref { name } => {
            let resolved = names
                .get(name)
                .ok_or_else(|| Error::UnknownType(name.fullname()))?;
            decode_internal(resolved.borrow(), names, reader)
        }
        Schema::Null => Ok(Value::Null),
        Schema::Boolean => {
            let mut buf = [0u8; 1];
            reader
                .read_exact(&mut buf)
                .map_err(|e| Error::io_read(e, "a boolean"))?;
            match buf[0] {
                0 => Ok(Value::Boolean(false)),
                1 => Ok(Value::Boolean(true)),
                other => Err(Error::BoolValue(other)),
            }
        }
        Schema::Int => zag_i32(reader).map(Value::Int),
        Schema::Long => zag_i64(reader).map(Value::Long),
        Schema::Float => {
            let mut buf = [0u8; 4];
            reader
                .read_exact(&mut buf)
                .map_err(|e| Error::io_read(e, "a float"))?;
            Ok(Value::Float(f32::from_le_bytes(buf)))
        }
        Schema::Double => {
            let mut buf = [0u8; 8];
            reader
                .read_exact(&mut buf)
                .map_err(|e| Error::io_read(e, "a double"))?;
            Ok(Value::Double(f64::from_le_bytes(buf)))
        }
        Schema::Bytes => {
            let len = decode_len(reader)?;
            decode_exact(len, "a byte string", reader).map(Value::Bytes)
        }
        Schema::String => {
            let len = decode_len(reader)?;
            let buf = decode_exact(len, "a string", reader)?;
            String::from_utf8(buf)
                .map(Value::String)
                .map_err(Error::InvalidUtf8)
        }
        Schema::Fixed(FixedSchema { size, .. }) => {
            decode_exact(*size, "a fixed", reader).map(|bytes| Value::Fixed(*size, bytes))
        }
        Schema::Array(inner) => {
            let mut items = Vec::new();
            loop {
                let count = decode_block_count(reader)?;
                if count == 0 {
                    break;
                }
                items.reserve(count.min(1024));
                for _ in 0..count {
                    items.push(decode_internal(inner, names, reader)?);
                }
            }
            Ok(Value::Array(items))
        }
        Schema::Map(inner) => {
            let mut items = HashMap::new();
            loop {
                let count = decode_block_count(reader)?;
                if count == 0 {
                    break;
                }
                for _ in 0..count {
                    let key_len = decode_len(reader)?;
                    let key = String::from_utf8(decode_exact(key_len, "a map key", reader)?)
                        .map_err(Error::InvalidUtf8)?;
                    let value = decode_internal(inner, names, reader)?;
                    items.insert(key, value);
                }
            }
            Ok(Value::Map(items))
        }
        Schema::Union(UnionSchema { schemas }) => {
            let index = zag_i64(reader)?;
            let branch = usize::try_from(index)
                .ok()
                .and_then(|i| schemas.get(i))
                .ok_or(Error::UnionBranchOutOfRange {
                    index,
                    num_branches: schemas.len(),
                })?;
            let value = decode_internal(branch, names, reader)?;
            Ok(Value::Union(index as u32, Box::new(value)))
        }
        Schema::Record(RecordSchema { fields, .. }) => {
            let mut record = Vec::with_capacity(fields.len());
            for field in fields {
                let value = decode_internal(&field.schema, names, reader)?;
                record.push((field.name.clone(), value));
            }
            Ok(Value::Record(record))
        }
        Schema::Enum(EnumSchema { symbols, .. }) => {
            let index = zag_i32(reader)?;
            let ordinal = usize::try_from(index).unwrap_or(usize::MAX);
            match symbols.get(ordinal) {
                Some(symbol) => Ok(Value::Enum(ordinal as u32, symbol.clone())),
                None => Err(Error::EnumOutOfRange {
                    index: index as u32,
                    num_symbols: symbols.len(),
                }),
            }
        }
        Schema::Decimal(DecimalSchema { inner, .. }) => match &**inner {
            Schema::Fixed(FixedSchema { size, .. }) => {
                let bytes = decode_exact(*size, "a fixed decimal", reader)?;
                Ok(Value::Decimal(Decimal::from(bytes)))
            }
            _ => {
                let len = decode_len(reader)?;
                let bytes = decode_exact(len, "a decimal", reader)?;
                Ok(Value::Decimal(Decimal::from(bytes)))
            }
        },
        Schema::Uuid => {
            let len = decode_len(reader)?;
            let buf = decode_exact(len, "a uuid", reader)?;
            let text = String::from_utf8(buf).map_err(Error::InvalidUtf8)?;
            Uuid::from_str(&text)
                .map(Value::Uuid)
                .map_err(Error::ConvertStrToUuid)
        }
        Schema::Date => zag_i32(reader).map(Value::Date),
        Schema::TimeMillis => zag_i32(reader).map(Value::TimeMillis),
        Schema::TimeMicros => zag_i64(reader).map(Value::TimeMicros),
        Schema::TimestampMillis => zag_i64(reader).map(Value::TimestampMillis),
        Schema::TimestampMicros => zag_i64(reader).map(Value::TimestampMicros),
        Schema::LocalTimestampMillis => zag_i64(reader).map(Value::LocalTimestampMillis),
        Schema::LocalTimestampMicros => zag_i64(reader).map(Value::LocalTimestampMicros),
        Schema::Duration(_) => {
            let mut bytes = [0u8; 12];
            reader
                .read_exact(&mut bytes)
                .map_err(|e| Error::io_read(e, "a duration"))?;
            Ok(Value::Duration(Duration::from(bytes)))
        }
    }
}

/// Advance over one encoded value without materializing it.
///
/// Returns the position just past the value. Never reads past `buf`; input
/// ending mid-value fails with [`Error::Truncated`].
pub fn skip(schema: &Schema, buf: &[u8], pos: usize) -> AvroResult<usize> {
    let rs = ResolvedSchema::try_from(schema)?;
    skip_internal(schema, rs.get_names(), buf, pos)
}

fn skip_bounds(buf: &[u8], pos: usize, len: usize, what: &'static str) -> AvroResult<usize> {
    let end = pos.checked_add(len).ok_or(Error::Truncated(what))?;
    if end <= buf.len() {
        Ok(end)
    } else {
        Err(Error::Truncated(what))
    }
}

pub(crate) fn skip_internal<S: Borrow<Schema>>(
    schema: &Schema,
    names: &HashMap<Name, S>,
    buf: &[u8],
    pos: usize,
) -> AvroResult<usize> {
    match schema {
        Schema::Ref { name } => {
            let resolved = names
                .get(name)
                .ok_or_else(|| Error::UnknownType(name.fullname()))?;
            skip_internal(resolved.borrow(), names, buf, pos)
        }
        Schema::Null => Ok(pos),
        Schema::Boolean => skip_bounds(buf, pos, 1, "a boolean"),
        Schema::Int | Schema::Long | Schema::Date | Schema::TimeMillis | Schema::TimeMicros
        | Schema::TimestampMillis | Schema::TimestampMicros | Schema::LocalTimestampMillis
        | Schema::LocalTimestampMicros => {
            let (_, pos) = zag_i64_slice(buf, pos)?;
            Ok(pos)
        }
        Schema::Float => skip_bounds(buf, pos, 4, "a float"),
        Schema::Double => skip_bounds(buf, pos, 8, "a double"),
        Schema::Bytes | Schema::String | Schema::Uuid => {
            let (len, pos) = zag_i64_slice(buf, pos)?;
            let len =
                usize::try_from(len).map_err(|_| Error::Truncated("a negative length prefix"))?;
            skip_bounds(buf, pos, len, "a byte string")
        }
        Schema::Fixed(FixedSchema { size, .. }) => skip_bounds(buf, pos, *size, "a fixed"),
        Schema::Duration(_) => skip_bounds(buf, pos, 12, "a duration"),
        Schema::Decimal(DecimalSchema { inner, .. }) => skip_internal(inner, names, buf, pos),
        Schema::Enum(_) => {
            let (_, pos) = zag_i64_slice(buf, pos)?;
            Ok(pos)
        }
        Schema::Array(inner) => skip_blocks(buf, pos, |buf, pos| {
            skip_internal(inner, names, buf, pos)
        }),
        Schema::Map(inner) => skip_blocks(buf, pos, |buf, pos| {
            let pos = skip_internal(&Schema::String, names, buf, pos)?;
            skip_internal(inner, names, buf, pos)
        }),
        Schema::Union(UnionSchema { schemas }) => {
            let (index, pos) = zag_i64_slice(buf, pos)?;
            let branch = usize::try_from(index)
                .ok()
                .and_then(|i| schemas.get(i))
                .ok_or(Error::UnionBranchOutOfRange {
                    index,
                    num_branches: schemas.len(),
                })?;
            skip_internal(branch, names, buf, pos)
        }
        Schema::Record(RecordSchema { fields, .. }) => {
            let mut pos = pos;
            for field in fields {
                pos = skip_internal(&field.schema, names, buf, pos)?;
            }
            Ok(pos)
        }
    }
}

/// Skip over collection blocks until the empty terminator. A block with a
/// byte-length prefix is skipped wholesale, without visiting its items.
fn skip_blocks(
    buf: &[u8],
    mut pos: usize,
    mut skip_item: impl FnMut(&[u8], usize) -> AvroResult<usize>,
) -> AvroResult<usize> {
    loop {
        let (count, next) = zag_i64_slice(buf, pos)?;
        pos = next;
        if count == 0 {
            return Ok(pos);
        }
        if count < 0 {
            let (byte_length, next) = zag_i64_slice(buf, pos)?;
            let byte_length = usize::try_from(byte_length)
                .map_err(|_| Error::Truncated("a block byte length"))?;
            pos = skip_bounds(buf, next, byte_length, "a collection block")?;
        } else {
            for _ in 0..count {
                pos = skip_item(buf, pos)?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_to_vec;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_decode_primitives() -> TestResult {
        assert_eq!(decode(&Schema::Null, &mut &[][..])?, Value::Null);
        assert_eq!(
            decode(&Schema::Boolean, &mut &[1u8][..])?,
            Value::Boolean(true)
        );
        assert_eq!(decode(&Schema::Long, &mut &[0x54u8][..])?, Value::Long(42));
        assert_eq!(
            decode(&Schema::String, &mut &[0x06, b'f', b'o', b'o'][..])?,
            Value::String("foo".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_invalid_boolean_byte() {
        match decode(&Schema::Boolean, &mut &[2u8][..]) {
            Err(Error::BoolValue(2)) => {}
            other => panic!("expected BoolValue, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_string() {
        let bytes: &[u8] = &[0x06, b'f'];
        match decode(&Schema::String, &mut &*bytes) {
            Err(Error::Truncated(_)) => {}
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_string() {
        let bytes: &[u8] = &[0x04, 0xC0, 0x80];
        match decode(&Schema::String, &mut &*bytes) {
            Err(Error::InvalidUtf8(_)) => {}
            other => panic!("expected InvalidUtf8, got {other:?}"),
        }
    }

    #[test]
    fn test_enum_out_of_range() -> TestResult {
        let schema = Schema::parse_str(r#"{"type": "enum", "name": "e", "symbols": ["a", "b"]}"#)?;
        let bytes: &[u8] = &[0x08]; // ordinal 4
        match decode(&schema, &mut &*bytes) {
            Err(Error::EnumOutOfRange {
                index: 4,
                num_symbols: 2,
            }) => {}
            other => panic!("expected EnumOutOfRange, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_union_branch_out_of_range() -> TestResult {
        let schema = Schema::parse_str(r#"["null", "long"]"#)?;
        let bytes: &[u8] = &[0x08];
        match decode(&schema, &mut &*bytes) {
            Err(Error::UnionBranchOutOfRange { index: 4, .. }) => {}
            other => panic!("expected UnionBranchOutOfRange, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_illformed_length_is_guarded() -> TestResult {
        let schema = Schema::parse_str(
            r#"
            {
                "type": "record",
                "name": "test",
                "fields": [
                    {"name": "a", "type": "long", "default": 42},
                    {"name": "b", "type": "string"}
                ]
            }
            "#,
        )?;
        // Would allocate 18446744073709551605 bytes.
        let illformed: &[u8] = &[0x3e, 0x15, 0xff, 0x1f, 0x15, 0xff];
        assert!(decode(&schema, &mut &*illformed).is_err());
        Ok(())
    }

    #[test]
    fn test_reader_accepts_multiple_blocks() -> TestResult {
        // Two blocks of one int each, then the terminator.
        let schema = Schema::array(Schema::Int);
        let bytes: &[u8] = &[0x02, 0x02, 0x02, 0x04, 0x00];
        assert_eq!(
            decode(&schema, &mut &*bytes)?,
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        Ok(())
    }

    #[test]
    fn test_reader_accepts_byte_length_prefixed_blocks() -> TestResult {
        // One block with a negative count carrying its byte length.
        let schema = Schema::array(Schema::Int);
        let bytes: &[u8] = &[0x03, 0x04, 0x02, 0x04, 0x00];
        assert_eq!(
            decode(&schema, &mut &*bytes)?,
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        // Skip can jump the whole block from its byte length.
        assert_eq!(skip(&schema, bytes, 0)?, bytes.len());
        Ok(())
    }

    #[test]
    fn test_skip_advances_exactly_as_far_as_decode() -> TestResult {
        let schema = Schema::parse_str(
            r#"
            {
                "type": "record",
                "name": "everything",
                "fields": [
                    {"name": "b", "type": "boolean"},
                    {"name": "i", "type": "int"},
                    {"name": "l", "type": "long"},
                    {"name": "f", "type": "float"},
                    {"name": "d", "type": "double"},
                    {"name": "s", "type": "string"},
                    {"name": "by", "type": "bytes"},
                    {"name": "fx", "type": {"type": "fixed", "name": "four", "size": 4}},
                    {"name": "e", "type": {"type": "enum", "name": "col", "symbols": ["red", "blue"]}},
                    {"name": "a", "type": {"type": "array", "items": "long"}},
                    {"name": "m", "type": {"type": "map", "values": "string"}},
                    {"name": "u", "type": ["null", "string"]}
                ]
            }
            "#,
        )?;
        let mut map = HashMap::new();
        map.insert("k".to_string(), Value::from("v"));
        let value = Value::Record(vec![
            ("b".to_string(), Value::Boolean(true)),
            ("i".to_string(), Value::Int(-34)),
            ("l".to_string(), Value::Long(1_000_000)),
            ("f".to_string(), Value::Float(1.5)),
            ("d".to_string(), Value::Double(-2.25)),
            ("s".to_string(), Value::from("hello")),
            ("by".to_string(), Value::Bytes(vec![1, 2, 3])),
            ("fx".to_string(), Value::Fixed(4, vec![9, 9, 9, 9])),
            ("e".to_string(), Value::Enum(1, "blue".to_string())),
            (
                "a".to_string(),
                Value::Array(vec![Value::Long(1), Value::Long(2)]),
            ),
            ("m".to_string(), Value::Map(map)),
            ("u".to_string(), Value::Union(1, Box::new(Value::from("x")))),
        ]);
        let bytes = encode_to_vec(&value, &schema)?;
        assert_eq!(skip(&schema, &bytes, 0)?, bytes.len());
        Ok(())
    }

    #[test]
    fn test_skip_truncated_input() -> TestResult {
        let schema = Schema::parse_str(r#"{"type": "fixed", "name": "f", "size": 8}"#)?;
        match skip(&schema, &[0u8; 4], 0) {
            Err(Error::Truncated(_)) => {}
            other => panic!("expected Truncated, got {other:?}"),
        }
        Ok(())
    }
}
