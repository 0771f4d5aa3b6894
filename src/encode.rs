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
    error::Error,
    schema::{
        DecimalSchema, EnumSchema, FixedSchema, Name, RecordSchema, ResolvedSchema, Schema,
    },
    types::{Value, union_branch, value_from_json},
    util::{zig_i32, zig_i64, zig_len},
};
use std::{borrow::Borrow, collections::HashMap, io::Write};

/// Encode a `Value` into Avro binary format.
///
/// The schema guides the encoding of complex values and is the arbiter of
/// shape mismatches.
pub fn encode<W: Write>(value: &Value, schema: &Schema, writer: &mut W) -> AvroResult<usize> {
    let rs = ResolvedSchema::try_from(schema)?;
    encode_internal(value, schema, rs.get_names(), writer)
}

/// The exact number of bytes [`encode`] will produce for `value`, without
/// producing them.
pub fn encoded_size(value: &Value, schema: &Schema) -> AvroResult<usize> {
    let rs = ResolvedSchema::try_from(schema)?;
    encoded_size_internal(value, schema, rs.get_names())
}

/// Encode a `Value` into a freshly allocated buffer, sized in a pre-pass so
/// the allocation happens exactly once.
pub fn encode_to_vec(value: &Value, schema: &Schema) -> AvroResult<Vec<u8>> {
    let rs = ResolvedSchema::try_from(schema)?;
    let size = encoded_size_internal(value, schema, rs.get_names())?;
    let mut buffer = Vec::with_capacity(size);
    encode_internal(value, schema, rs.get_names(), &mut buffer)?;
    debug_assert_eq!(buffer.len(), size, "size pre-pass disagrees with encoder");
    Ok(buffer)
}

pub(crate) fn encode_bytes<B: AsRef<[u8]> + ?Sized, W: Write>(
    s: &B,
    writer: &mut W,
) -> AvroResult<usize> {
    let bytes = s.as_ref();
    let prefix = encode_long(bytes.len() as i64, writer)?;
    writer.write_all(bytes).map_err(Error::WriteBytes)?;
    Ok(prefix + bytes.len())
}

pub(crate) fn encode_long<W: Write>(i: i64, writer: &mut W) -> AvroResult<usize> {
    zig_i64(i, writer)
}

pub(crate) fn encode_int<W: Write>(i: i32, writer: &mut W) -> AvroResult<usize> {
    zig_i32(i, writer)
}

fn mismatch(value: &Value, schema: &Schema) -> Error {
    Error::SchemaMismatch {
        value: value.into(),
        schema: schema.into(),
    }
}

fn enum_ordinal(index: u32, symbol: &str, symbols: &[String]) -> AvroResult<u32> {
    match symbols.get(index as usize) {
        Some(s) if s == symbol => Ok(index),
        // Trust the symbol over a stale ordinal.
        _ => symbols
            .iter()
            .position(|s| s == symbol)
            .map(|p| p as u32)
            .ok_or_else(|| Error::UnknownEnumSymbol(symbol.to_string())),
    }
}

fn decimal_bytes(value: &Value, decimal: &crate::decimal::Decimal, schema: &DecimalSchema) -> AvroResult<(Vec<u8>, bool)> {
    let digits = decimal.digits();
    if digits > schema.precision {
        return Err(Error::DecimalOutOfPrecision {
            digits,
            precision: schema.precision,
        });
    }
    match &*schema.inner {
        Schema::Fixed(FixedSchema { size, .. }) => {
            Ok((decimal.to_sign_extended_bytes_with_len(*size)?, true))
        }
        Schema::Bytes => Ok((decimal.to_vec()?, false)),
        other => Err(mismatch(value, other)),
    }
}

/// Look up each schema field in the record value, falling back to the
/// schema's default when the value lacks the field.
fn record_field_value<'v, S: Borrow<Schema>>(
    fields: &'v [(String, Value)],
    schema_field: &crate::schema::RecordField,
    names: &HashMap<Name, S>,
) -> AvroResult<std::borrow::Cow<'v, Value>> {
    match fields.iter().find(|(name, _)| *name == schema_field.name) {
        Some((_, value)) => Ok(std::borrow::Cow::Borrowed(value)),
        None => match &schema_field.default {
            Some(default) => Ok(std::borrow::Cow::Owned(value_from_json(
                default,
                &schema_field.schema,
                names,
            )?)),
            None => Err(Error::FieldMissing(schema_field.name.clone())),
        },
    }
}

pub(crate) fn encode_internal<W: Write, S: Borrow<Schema>>(
    value: &Value,
    schema: &Schema,
    names: &HashMap<Name, S>,
    writer: &mut W,
) -> AvroResult<usize> {
    if let Schema::Ref { name } = schema {
        let resolved = names
            .get(name)
            .ok_or_else(|| Error::UnknownType(name.fullname()))?;
        return encode_internal(value, resolved.borrow(), names, writer);
    }

    // A union schema wraps every branch encoding with the branch index.
    if let Schema::Union(union) = schema {
        let (index, branch) = union_branch(value, union, names)?;
        let mut written = encode_long(index as i64, writer)?;
        let inner = match value {
            Value::Union(_, inner) => inner,
            other => other,
        };
        written += encode_internal(inner, branch, names, writer)?;
        return Ok(written);
    }

    match value {
        Value::Null => match schema {
            Schema::Null => Ok(0),
            _ => Err(mismatch(value, schema)),
        },
        Value::Boolean(b) => match schema {
            Schema::Boolean => {
                writer.write_all(&[u8::from(*b)]).map_err(Error::WriteBytes)?;
                Ok(1)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Int(i) => match schema {
            Schema::Int | Schema::Date | Schema::TimeMillis => encode_int(*i, writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::Date(i) => match schema {
            Schema::Date | Schema::Int => encode_int(*i, writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::TimeMillis(i) => match schema {
            Schema::TimeMillis | Schema::Int => encode_int(*i, writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::Long(i) => match schema {
            Schema::Long
            | Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros => encode_long(*i, writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::TimeMicros(i) => match schema {
            Schema::TimeMicros | Schema::Long => encode_long(*i, writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::TimestampMillis(i) => match schema {
            Schema::TimestampMillis | Schema::Long => encode_long(*i, writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::TimestampMicros(i) => match schema {
            Schema::TimestampMicros | Schema::Long => encode_long(*i, writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::LocalTimestampMillis(i) => match schema {
            Schema::LocalTimestampMillis | Schema::Long => encode_long(*i, writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::LocalTimestampMicros(i) => match schema {
            Schema::LocalTimestampMicros | Schema::Long => encode_long(*i, writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::Float(x) => match schema {
            Schema::Float => {
                writer.write_all(&x.to_le_bytes()).map_err(Error::WriteBytes)?;
                Ok(4)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Double(x) => match schema {
            Schema::Double => {
                writer.write_all(&x.to_le_bytes()).map_err(Error::WriteBytes)?;
                Ok(8)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Bytes(bytes) => match schema {
            Schema::Bytes => encode_bytes(bytes, writer),
            Schema::Fixed(FixedSchema { size, .. }) => {
                if bytes.len() != *size {
                    return Err(Error::FixedSizeMismatch {
                        expected: *size,
                        actual: bytes.len(),
                    });
                }
                writer.write_all(bytes).map_err(Error::WriteBytes)?;
                Ok(bytes.len())
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::String(s) => match schema {
            Schema::String | Schema::Uuid => encode_bytes(s, writer),
            Schema::Enum(EnumSchema { symbols, .. }) => {
                let position = symbols
                    .iter()
                    .position(|symbol| symbol == s)
                    .ok_or_else(|| Error::UnknownEnumSymbol(s.clone()))?;
                encode_int(position as i32, writer)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Fixed(_, bytes) => match schema {
            Schema::Fixed(FixedSchema { size, .. })
            | Schema::Duration(FixedSchema { size, .. }) => {
                if bytes.len() != *size {
                    return Err(Error::FixedSizeMismatch {
                        expected: *size,
                        actual: bytes.len(),
                    });
                }
                writer.write_all(bytes).map_err(Error::WriteBytes)?;
                Ok(bytes.len())
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Enum(index, symbol) => match schema {
            Schema::Enum(EnumSchema { symbols, .. }) => {
                let ordinal = enum_ordinal(*index, symbol, symbols)?;
                encode_int(ordinal as i32, writer)
            }
            _ => Err(mismatch(value, schema)),
        },
        // A tagged union value against a non-union schema.
        Value::Union(_, _) => Err(mismatch(value, schema)),
        Value::Array(items) => match schema {
            Schema::Array(inner) => {
                let mut written = 0;
                if !items.is_empty() {
                    written += encode_long(items.len() as i64, writer)?;
                    for item in items {
                        written += encode_internal(item, inner, names, writer)?;
                    }
                }
                written += encode_long(0, writer)?;
                Ok(written)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Map(items) => match schema {
            Schema::Map(inner) => {
                let mut written = 0;
                if !items.is_empty() {
                    written += encode_long(items.len() as i64, writer)?;
                    for (key, item) in items {
                        written += encode_bytes(key, writer)?;
                        written += encode_internal(item, inner, names, writer)?;
                    }
                }
                written += encode_long(0, writer)?;
                Ok(written)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Record(fields) => match schema {
            Schema::Record(RecordSchema {
                fields: schema_fields,
                ..
            }) => {
                let mut written = 0;
                for schema_field in schema_fields {
                    let field_value = record_field_value(fields, schema_field, names)?;
                    written +=
                        encode_internal(&field_value, &schema_field.schema, names, writer)?;
                }
                Ok(written)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Decimal(decimal) => match schema {
            Schema::Decimal(decimal_schema) => {
                let (bytes, raw) = decimal_bytes(value, decimal, decimal_schema)?;
                if raw {
                    writer.write_all(&bytes).map_err(Error::WriteBytes)?;
                    Ok(bytes.len())
                } else {
                    encode_bytes(&bytes, writer)
                }
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Uuid(uuid) => match schema {
            Schema::Uuid | Schema::String => encode_bytes(&uuid.to_string(), writer),
            _ => Err(mismatch(value, schema)),
        },
        Value::Duration(duration) => match schema {
            Schema::Duration(_) | Schema::Fixed(FixedSchema { size: 12, .. }) => {
                let bytes: [u8; 12] = (*duration).into();
                writer.write_all(&bytes).map_err(Error::WriteBytes)?;
                Ok(12)
            }
            _ => Err(mismatch(value, schema)),
        },
    }
}

/// The size pre-pass: mirrors [`encode_internal`] arm for arm, using the
/// bit-count formula for variable-length integers.
pub(crate) fn encoded_size_internal<S: Borrow<Schema>>(
    value: &Value,
    schema: &Schema,
    names: &HashMap<Name, S>,
) -> AvroResult<usize> {
    if let Schema::Ref { name } = schema {
        let resolved = names
            .get(name)
            .ok_or_else(|| Error::UnknownType(name.fullname()))?;
        return encoded_size_internal(value, resolved.borrow(), names);
    }

    if let Schema::Union(union) = schema {
        let (index, branch) = union_branch(value, union, names)?;
        let inner = match value {
            Value::Union(_, inner) => inner,
            other => other,
        };
        return Ok(zig_len(index as i64) + encoded_size_internal(inner, branch, names)?);
    }

    match value {
        Value::Null => match schema {
            Schema::Null => Ok(0),
            _ => Err(mismatch(value, schema)),
        },
        Value::Boolean(_) => match schema {
            Schema::Boolean => Ok(1),
            _ => Err(mismatch(value, schema)),
        },
        Value::Int(i) => match schema {
            Schema::Int | Schema::Date | Schema::TimeMillis => Ok(zig_len(*i as i64)),
            _ => Err(mismatch(value, schema)),
        },
        Value::Date(i) => match schema {
            Schema::Date | Schema::Int => Ok(zig_len(*i as i64)),
            _ => Err(mismatch(value, schema)),
        },
        Value::TimeMillis(i) => match schema {
            Schema::TimeMillis | Schema::Int => Ok(zig_len(*i as i64)),
            _ => Err(mismatch(value, schema)),
        },
        Value::Long(i) => match schema {
            Schema::Long
            | Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros => Ok(zig_len(*i)),
            _ => Err(mismatch(value, schema)),
        },
        Value::TimeMicros(i) => match schema {
            Schema::TimeMicros | Schema::Long => Ok(zig_len(*i)),
            _ => Err(mismatch(value, schema)),
        },
        Value::TimestampMillis(i) => match schema {
            Schema::TimestampMillis | Schema::Long => Ok(zig_len(*i)),
            _ => Err(mismatch(value, schema)),
        },
        Value::TimestampMicros(i) => match schema {
            Schema::TimestampMicros | Schema::Long => Ok(zig_len(*i)),
            _ => Err(mismatch(value, schema)),
        },
        Value::LocalTimestampMillis(i) => match schema {
            Schema::LocalTimestampMillis | Schema::Long => Ok(zig_len(*i)),
            _ => Err(mismatch(value, schema)),
        },
        Value::LocalTimestampMicros(i) => match schema {
            Schema::LocalTimestampMicros | Schema::Long => Ok(zig_len(*i)),
            _ => Err(mismatch(value, schema)),
        },
        Value::Float(_) => match schema {
            Schema::Float => Ok(4),
            _ => Err(mismatch(value, schema)),
        },
        Value::Double(_) => match schema {
            Schema::Double => Ok(8),
            _ => Err(mismatch(value, schema)),
        },
        Value::Bytes(bytes) => match schema {
            Schema::Bytes => Ok(zig_len(bytes.len() as i64) + bytes.len()),
            Schema::Fixed(FixedSchema { size, .. }) => {
                if bytes.len() != *size {
                    return Err(Error::FixedSizeMismatch {
                        expected: *size,
                        actual: bytes.len(),
                    });
                }
                Ok(bytes.len())
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::String(s) => match schema {
            Schema::String | Schema::Uuid => Ok(zig_len(s.len() as i64) + s.len()),
            Schema::Enum(EnumSchema { symbols, .. }) => {
                let position = symbols
                    .iter()
                    .position(|symbol| symbol == s)
                    .ok_or_else(|| Error::UnknownEnumSymbol(s.clone()))?;
                Ok(zig_len(position as i64))
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Fixed(_, bytes) => match schema {
            Schema::Fixed(FixedSchema { size, .. })
            | Schema::Duration(FixedSchema { size, .. }) => {
                if bytes.len() != *size {
                    return Err(Error::FixedSizeMismatch {
                        expected: *size,
                        actual: bytes.len(),
                    });
                }
                Ok(bytes.len())
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Enum(index, symbol) => match schema {
            Schema::Enum(EnumSchema { symbols, .. }) => {
                let ordinal = enum_ordinal(*index, symbol, symbols)?;
                Ok(zig_len(ordinal as i64))
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Union(_, _) => Err(mismatch(value, schema)),
        Value::Array(items) => match schema {
            Schema::Array(inner) => {
                let mut size = zig_len(0);
                if !items.is_empty() {
                    size += zig_len(items.len() as i64);
                    for item in items {
                        size += encoded_size_internal(item, inner, names)?;
                    }
                }
                Ok(size)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Map(items) => match schema {
            Schema::Map(inner) => {
                let mut size = zig_len(0);
                if !items.is_empty() {
                    size += zig_len(items.len() as i64);
                    for (key, item) in items {
                        size += zig_len(key.len() as i64) + key.len();
                        size += encoded_size_internal(item, inner, names)?;
                    }
                }
                Ok(size)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Record(fields) => match schema {
            Schema::Record(RecordSchema {
                fields: schema_fields,
                ..
            }) => {
                let mut size = 0;
                for schema_field in schema_fields {
                    let field_value = record_field_value(fields, schema_field, names)?;
                    size += encoded_size_internal(&field_value, &schema_field.schema, names)?;
                }
                Ok(size)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Decimal(decimal) => match schema {
            Schema::Decimal(decimal_schema) => {
                let (bytes, raw) = decimal_bytes(value, decimal, decimal_schema)?;
                if raw {
                    Ok(bytes.len())
                } else {
                    Ok(zig_len(bytes.len() as i64) + bytes.len())
                }
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Uuid(_) => match schema {
            Schema::Uuid | Schema::String => {
                let len = uuid::fmt::Hyphenated::LENGTH;
                Ok(zig_len(len as i64) + len)
            }
            _ => Err(mismatch(value, schema)),
        },
        Value::Duration(_) => match schema {
            Schema::Duration(_) | Schema::Fixed(FixedSchema { size: 12, .. }) => Ok(12),
            _ => Err(mismatch(value, schema)),
        },
    }
}
