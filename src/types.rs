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

//! Logic handling the intermediate representation of Avro values.

use crate::{
    AvroResult,
    decimal::Decimal,
    duration::Duration,
    error::Error,
    schema::{
        DecimalSchema, EnumSchema, FixedSchema, Name, RecordSchema, Schema, UnionSchema,
    },
};
use serde_json::Value as JsonValue;
use std::borrow::Borrow;
use std::collections::HashMap;
use strum::EnumDiscriminants;
use uuid::Uuid;

/// Represents any valid Avro value.
///
/// More information about Avro values can be found in the
/// [Avro Specification](https://avro.apache.org/docs/++version++/specification/#schema-declaration)
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(ValueKind))]
pub enum Value {
    /// A `null` Avro value.
    Null,
    /// A `boolean` Avro value.
    Boolean(bool),
    /// An `int` Avro value.
    Int(i32),
    /// A `long` Avro value.
    Long(i64),
    /// A `float` Avro value.
    Float(f32),
    /// A `double` Avro value.
    Double(f64),
    /// A `bytes` Avro value.
    Bytes(Vec<u8>),
    /// A `string` Avro value.
    String(String),
    /// A `fixed` Avro value: byte count and bytes.
    Fixed(usize, Vec<u8>),
    /// An `enum` Avro value: symbol ordinal and symbol name.
    Enum(u32, String),
    /// A `union` Avro value: the zero-based branch index and the branch
    /// value. Building this variant directly is the caller-provided branch
    /// override; any other value written against a union schema goes through
    /// automatic branch selection.
    Union(u32, Box<Value>),
    /// An `array` Avro value.
    Array(Vec<Value>),
    /// A `map` Avro value.
    Map(HashMap<String, Value>),
    /// A `record` Avro value: ordered list of (field name, field value).
    Record(Vec<(String, Value)>),
    /// A `decimal` Avro value.
    Decimal(Decimal),
    /// A `uuid` Avro value.
    Uuid(Uuid),
    /// A number of days since the unix epoch.
    Date(i32),
    /// The time of day in milliseconds after midnight.
    TimeMillis(i32),
    /// The time of day in microseconds after midnight.
    TimeMicros(i64),
    /// Milliseconds since the unix epoch.
    TimestampMillis(i64),
    /// Microseconds since the unix epoch.
    TimestampMicros(i64),
    /// Local milliseconds since the unix epoch.
    LocalTimestampMillis(i64),
    /// Local microseconds since the unix epoch.
    LocalTimestampMicros(i64),
    /// A months/days/milliseconds amount of time.
    Duration(Duration),
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(value: HashMap<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

/// `None` becomes the first branch of a `[null, T]` union, `Some` the second.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            None => Self::Union(0, Box::new(Self::Null)),
            Some(inner) => Self::Union(1, Box::new(inner.into())),
        }
    }
}

/// Utility interface to build `Value::Record` objects.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    /// List of fields attached to the record object, in schema declaration
    /// order.
    pub fields: Vec<(String, Value)>,
    schema: &'a RecordSchema,
}

impl<'a> Record<'a> {
    /// Create a `Record` given a `Schema`.
    ///
    /// If the `Schema` is not a `Schema::Record` variant, `None` will be
    /// returned.
    pub fn new(schema: &Schema) -> Option<Record<'_>> {
        match schema {
            Schema::Record(record_schema) => {
                let mut fields = Vec::with_capacity(record_schema.fields.len());
                for field in &record_schema.fields {
                    fields.push((field.name.clone(), Value::Null));
                }
                Some(Record {
                    fields,
                    schema: record_schema,
                })
            }
            _ => None,
        }
    }

    /// Put a value at the given field name, ignoring fields the schema does
    /// not declare.
    pub fn put<V: Into<Value>>(&mut self, field: &str, value: V) {
        if let Some(position) = self.schema.fields.iter().position(|f| f.name == field) {
            self.fields[position].1 = value.into();
        }
    }
}

impl From<Record<'_>> for Value {
    fn from(value: Record<'_>) -> Self {
        Self::Record(value.fields)
    }
}

impl Value {
    /// Derive the value's preferred schema, where its shape alone determines
    /// one.
    ///
    /// Records, enums and unions are only meaningful against a declared
    /// schema, and empty collections carry no element type; those shapes
    /// fail with [`Error::DeriveSchema`]. Typed values derive their schema
    /// from their type instead, through
    /// [`AvroSchema`](crate::bridge::AvroSchema).
    pub fn derive_schema(&self) -> AvroResult<Schema> {
        match self {
            Value::Null => Ok(Schema::Null),
            Value::Boolean(_) => Ok(Schema::Boolean),
            Value::Int(_) => Ok(Schema::Int),
            Value::Long(_) => Ok(Schema::Long),
            Value::Float(_) => Ok(Schema::Float),
            Value::Double(_) => Ok(Schema::Double),
            Value::Bytes(_) => Ok(Schema::Bytes),
            Value::String(_) => Ok(Schema::String),
            Value::Fixed(size, _) => Ok(Schema::Fixed(FixedSchema {
                name: Name::new(&format!("fixed_{size}"))?,
                aliases: None,
                doc: None,
                size: *size,
            })),
            Value::Array(items) => match items.first() {
                Some(first) => Ok(Schema::array(first.derive_schema()?)),
                None => Err(Error::DeriveSchema(self.into())),
            },
            Value::Map(items) => match items.values().next() {
                Some(first) => Ok(Schema::map(first.derive_schema()?)),
                None => Err(Error::DeriveSchema(self.into())),
            },
            Value::Uuid(_) => Ok(Schema::Uuid),
            Value::Date(_) => Ok(Schema::Date),
            Value::TimeMillis(_) => Ok(Schema::TimeMillis),
            Value::TimeMicros(_) => Ok(Schema::TimeMicros),
            Value::TimestampMillis(_) => Ok(Schema::TimestampMillis),
            Value::TimestampMicros(_) => Ok(Schema::TimestampMicros),
            Value::LocalTimestampMillis(_) => Ok(Schema::LocalTimestampMillis),
            Value::LocalTimestampMicros(_) => Ok(Schema::LocalTimestampMicros),
            Value::Duration(_) => Ok(Schema::Duration(FixedSchema {
                name: Name::new("duration")?,
                aliases: None,
                doc: None,
                size: 12,
            })),
            Value::Decimal(decimal) => Ok(Schema::Decimal(DecimalSchema {
                precision: decimal.digits().max(1),
                scale: 0,
                inner: Box::new(Schema::Bytes),
            })),
            Value::Record(_) | Value::Enum(_, _) | Value::Union(_, _) => {
                Err(Error::DeriveSchema(self.into()))
            }
        }
    }
}

/// Select the union branch to write `value` with.
///
/// The rule: a null value picks the first `null` branch; an explicit
/// [`Value::Union`] is the caller-provided override and only has its index
/// validated; otherwise the first branch the value's shape matches wins,
/// preferring named-type matches. With no match the write fails with
/// [`Error::NoUnionBranch`].
pub(crate) fn union_branch<'s, S: Borrow<Schema>>(
    value: &Value,
    union: &'s UnionSchema,
    names: &'s HashMap<Name, S>,
) -> AvroResult<(usize, &'s Schema)> {
    let branches = union.variants();
    match value {
        Value::Union(index, _) => branches
            .get(*index as usize)
            .map(|branch| (*index as usize, branch))
            .ok_or(Error::UnionBranchOutOfRange {
                index: *index as i64,
                num_branches: branches.len(),
            }),
        Value::Null => branches
            .iter()
            .position(|branch| matches!(branch, Schema::Null))
            .map(|position| (position, &branches[position]))
            .ok_or(Error::NoUnionBranch(ValueKind::Null)),
        other => {
            // An exact kind match beats a representational one, so a string
            // in a `[uuid, string]` union still lands on the string branch.
            for strict in [true, false] {
                for (position, branch) in branches.iter().enumerate() {
                    if value_matches(other, branch, names, strict) {
                        return Ok((position, branch));
                    }
                }
            }
            Err(Error::NoUnionBranch(other.into()))
        }
    }
}

/// Shallow shape compatibility between a value and a schema, used for union
/// branch selection. Deep mismatches surface later, during encode. In
/// non-strict mode, values also match the schemas that share their base
/// encoding.
fn value_matches<S: Borrow<Schema>>(
    value: &Value,
    schema: &Schema,
    names: &HashMap<Name, S>,
    strict: bool,
) -> bool {
    match (value, schema) {
        (_, Schema::Ref { name }) => match names.get(name) {
            Some(resolved) => value_matches(value, resolved.borrow(), names, strict),
            None => false,
        },
        (Value::Null, Schema::Null) => true,
        (Value::Boolean(_), Schema::Boolean) => true,
        (Value::Int(_), Schema::Int) => true,
        (Value::Int(_), Schema::Date | Schema::TimeMillis) => !strict,
        (Value::Long(_), Schema::Long) => true,
        (
            Value::Long(_),
            Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros,
        ) => !strict,
        (Value::Float(_), Schema::Float) => true,
        (Value::Double(_), Schema::Double) => true,
        (Value::Bytes(_), Schema::Bytes) => true,
        (Value::String(_), Schema::String) => true,
        (Value::String(_), Schema::Uuid) => !strict,
        (Value::Fixed(size, _), Schema::Fixed(FixedSchema { size: n, .. })) => size == n,
        (Value::Fixed(12, _), Schema::Duration(_)) => !strict,
        (Value::Enum(_, symbol), Schema::Enum(EnumSchema { symbols, .. })) => {
            symbols.contains(symbol)
        }
        (Value::Array(_), Schema::Array(_)) => true,
        (Value::Map(_), Schema::Map(_)) => true,
        (Value::Record(fields), Schema::Record(RecordSchema { fields: schema_fields, .. })) => {
            schema_fields.iter().all(|schema_field| {
                schema_field.default.is_some()
                    || fields.iter().any(|(name, _)| *name == schema_field.name)
            })
        }
        (Value::Decimal(_), Schema::Decimal(_)) => true,
        (Value::Uuid(_), Schema::Uuid) => true,
        (Value::Uuid(_), Schema::String) => !strict,
        (Value::Date(_), Schema::Date) => true,
        (Value::Date(_), Schema::Int) => !strict,
        (Value::TimeMillis(_), Schema::TimeMillis) => true,
        (Value::TimeMillis(_), Schema::Int) => !strict,
        (Value::TimeMicros(_), Schema::TimeMicros) => true,
        (Value::TimestampMillis(_), Schema::TimestampMillis) => true,
        (Value::TimestampMicros(_), Schema::TimestampMicros) => true,
        (Value::LocalTimestampMillis(_), Schema::LocalTimestampMillis) => true,
        (Value::LocalTimestampMicros(_), Schema::LocalTimestampMicros) => true,
        (
            Value::TimeMicros(_)
            | Value::TimestampMillis(_)
            | Value::TimestampMicros(_)
            | Value::LocalTimestampMillis(_)
            | Value::LocalTimestampMicros(_),
            Schema::Long,
        ) => !strict,
        (Value::Duration(_), Schema::Duration(_)) => true,
        _ => false,
    }
}

/// Materialize a field default, retained as raw JSON by the parser, into a
/// `Value` of the field's schema.
///
/// Bytes and fixed defaults follow the Avro JSON convention of a string whose
/// code points are the byte values. A union default always describes the
/// union's first branch.
pub(crate) fn value_from_json<S: Borrow<Schema>>(
    json: &JsonValue,
    schema: &Schema,
    names: &HashMap<Name, S>,
) -> AvroResult<Value> {
    let mismatch = || Error::InvalidDefault(json.clone());
    match schema {
        Schema::Ref { name } => {
            let resolved = names
                .get(name)
                .ok_or_else(|| Error::UnknownType(name.fullname()))?;
            value_from_json(json, resolved.borrow(), names)
        }
        Schema::Null => match json {
            JsonValue::Null => Ok(Value::Null),
            _ => Err(mismatch()),
        },
        Schema::Boolean => json.as_bool().map(Value::Boolean).ok_or_else(mismatch),
        Schema::Int => json
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int)
            .ok_or_else(mismatch),
        Schema::Long => json.as_i64().map(Value::Long).ok_or_else(mismatch),
        Schema::Float => json
            .as_f64()
            .map(|f| Value::Float(f as f32))
            .ok_or_else(mismatch),
        Schema::Double => json.as_f64().map(Value::Double).ok_or_else(mismatch),
        Schema::Bytes => json
            .as_str()
            .map(json_string_to_bytes)
            .map(Value::Bytes)
            .ok_or_else(mismatch),
        Schema::String => json
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(mismatch),
        Schema::Fixed(FixedSchema { size, .. }) => {
            let bytes = json.as_str().map(json_string_to_bytes).ok_or_else(mismatch)?;
            if bytes.len() == *size {
                Ok(Value::Fixed(*size, bytes))
            } else {
                Err(mismatch())
            }
        }
        Schema::Enum(EnumSchema { symbols, .. }) => {
            let symbol = json.as_str().ok_or_else(mismatch)?;
            symbols
                .iter()
                .position(|s| s == symbol)
                .map(|i| Value::Enum(i as u32, symbol.to_string()))
                .ok_or_else(mismatch)
        }
        Schema::Array(items) => {
            let defaults = json.as_array().ok_or_else(mismatch)?;
            defaults
                .iter()
                .map(|item| value_from_json(item, items, names))
                .collect::<AvroResult<Vec<_>>>()
                .map(Value::Array)
        }
        Schema::Map(values) => {
            let defaults = json.as_object().ok_or_else(mismatch)?;
            defaults
                .iter()
                .map(|(k, v)| Ok((k.clone(), value_from_json(v, values, names)?)))
                .collect::<AvroResult<HashMap<_, _>>>()
                .map(Value::Map)
        }
        Schema::Record(RecordSchema { fields, .. }) => {
            let defaults = json.as_object().ok_or_else(mismatch)?;
            let mut record = Vec::with_capacity(fields.len());
            for field in fields {
                let value = match defaults.get(&field.name).or(field.default.as_ref()) {
                    Some(json) => value_from_json(json, &field.schema, names)?,
                    None => return Err(Error::FieldMissing(field.name.clone())),
                };
                record.push((field.name.clone(), value));
            }
            Ok(Value::Record(record))
        }
        Schema::Union(union) => {
            let first = union.variants().first().ok_or_else(mismatch)?;
            let value = value_from_json(json, first, names)?;
            Ok(Value::Union(0, Box::new(value)))
        }
        Schema::Decimal(DecimalSchema { inner, .. }) => {
            let bytes = json.as_str().map(json_string_to_bytes).ok_or_else(mismatch)?;
            if let Schema::Fixed(FixedSchema { size, .. }) = &**inner {
                if bytes.len() != *size {
                    return Err(mismatch());
                }
            }
            Ok(Value::Decimal(Decimal::from(bytes)))
        }
        Schema::Uuid => json
            .as_str()
            .ok_or_else(mismatch)
            .and_then(|s| Uuid::parse_str(s).map_err(Error::ConvertStrToUuid))
            .map(Value::Uuid),
        Schema::Date => value_from_json(json, &Schema::Int, names).map(|v| match v {
            Value::Int(i) => Value::Date(i),
            other => other,
        }),
        Schema::TimeMillis => value_from_json(json, &Schema::Int, names).map(|v| match v {
            Value::Int(i) => Value::TimeMillis(i),
            other => other,
        }),
        Schema::TimeMicros => value_from_json(json, &Schema::Long, names).map(|v| match v {
            Value::Long(i) => Value::TimeMicros(i),
            other => other,
        }),
        Schema::TimestampMillis => value_from_json(json, &Schema::Long, names).map(|v| match v {
            Value::Long(i) => Value::TimestampMillis(i),
            other => other,
        }),
        Schema::TimestampMicros => value_from_json(json, &Schema::Long, names).map(|v| match v {
            Value::Long(i) => Value::TimestampMicros(i),
            other => other,
        }),
        Schema::LocalTimestampMillis => {
            value_from_json(json, &Schema::Long, names).map(|v| match v {
                Value::Long(i) => Value::LocalTimestampMillis(i),
                other => other,
            })
        }
        Schema::LocalTimestampMicros => {
            value_from_json(json, &Schema::Long, names).map(|v| match v {
                Value::Long(i) => Value::LocalTimestampMicros(i),
                other => other,
            })
        }
        Schema::Duration(_) => {
            let bytes = json.as_str().map(json_string_to_bytes).ok_or_else(mismatch)?;
            let bytes: [u8; 12] = bytes.try_into().map_err(|_| mismatch())?;
            Ok(Value::Duration(Duration::from(bytes)))
        }
    }
}

/// The Avro JSON convention for byte strings: one byte per code point.
fn json_string_to_bytes(s: &str) -> Vec<u8> {
    s.chars().map(|c| c as u8).collect()
}
