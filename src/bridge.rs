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

//! The bridge between Rust types and the Avro data model: deriving a schema
//! from a type, turning values of the type into the intermediate
//! representation, and constructing the type back from decoded parts.

use crate::{
    AvroResult,
    duration::Duration,
    error::Error,
    schema::{FixedSchema, Name, Schema, SchemaKind, UnionSchema},
    types::Value,
};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Types that have an Avro schema derivable from the type alone.
pub trait AvroSchema {
    fn get_schema() -> Schema;
}

/// Types that can cross the bridge in both directions: into the intermediate
/// [`Value`] representation for encoding, and back out of it after decoding.
///
/// Generated code implements this for records, enums and fixeds; the
/// implementations below cover the primitive and collection mappings.
pub trait AvroDatum: AvroSchema + Sized {
    fn into_value(self) -> Value;
    fn from_value(value: Value) -> AvroResult<Self>;
}

fn mismatch(value: &Value, expected: SchemaKind) -> Error {
    Error::SchemaMismatch {
        value: value.into(),
        schema: expected,
    }
}

impl AvroSchema for () {
    fn get_schema() -> Schema {
        Schema::Null
    }
}

impl AvroDatum for () {
    fn into_value(self) -> Value {
        Value::Null
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Null => Ok(()),
            other => Err(mismatch(&other, SchemaKind::Null)),
        }
    }
}

impl AvroSchema for bool {
    fn get_schema() -> Schema {
        Schema::Boolean
    }
}

impl AvroDatum for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(mismatch(&other, SchemaKind::Boolean)),
        }
    }
}

impl AvroSchema for i32 {
    fn get_schema() -> Schema {
        Schema::Int
    }
}

impl AvroDatum for i32 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            // The date and time-millis logical types share the int base.
            Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => Ok(i),
            other => Err(mismatch(&other, SchemaKind::Int)),
        }
    }
}

impl AvroSchema for i64 {
    fn get_schema() -> Schema {
        Schema::Long
    }
}

impl AvroDatum for i64 {
    fn into_value(self) -> Value {
        Value::Long(self)
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            // The long-based logical types share the long base.
            Value::Long(i)
            | Value::TimeMicros(i)
            | Value::TimestampMillis(i)
            | Value::TimestampMicros(i)
            | Value::LocalTimestampMillis(i)
            | Value::LocalTimestampMicros(i) => Ok(i),
            Value::Int(i) => Ok(i as i64),
            other => Err(mismatch(&other, SchemaKind::Long)),
        }
    }
}

impl AvroSchema for f32 {
    fn get_schema() -> Schema {
        Schema::Float
    }
}

impl AvroDatum for f32 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Float(x) => Ok(x),
            other => Err(mismatch(&other, SchemaKind::Float)),
        }
    }
}

impl AvroSchema for f64 {
    fn get_schema() -> Schema {
        Schema::Double
    }
}

impl AvroDatum for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Double(x) => Ok(x),
            other => Err(mismatch(&other, SchemaKind::Double)),
        }
    }
}

impl AvroSchema for String {
    fn get_schema() -> Schema {
        Schema::String
    }
}

impl AvroDatum for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch(&other, SchemaKind::String)),
        }
    }
}

impl AvroSchema for &str {
    fn get_schema() -> Schema {
        Schema::String
    }
}

/// A `bytes` value for the typed bridge.
///
/// `Vec<u8>` cannot be both an Avro `bytes` and an array of ints under one
/// trait, so byte sequences cross the bridge in this wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl AvroSchema for Bytes {
    fn get_schema() -> Schema {
        Schema::Bytes
    }
}

impl AvroDatum for Bytes {
    fn into_value(self) -> Value {
        Value::Bytes(self.0)
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Bytes(bytes) => Ok(Bytes(bytes)),
            other => Err(mismatch(&other, SchemaKind::Bytes)),
        }
    }
}

impl<T: AvroSchema> AvroSchema for Box<T> {
    fn get_schema() -> Schema {
        T::get_schema()
    }
}

impl<T: AvroDatum> AvroDatum for Box<T> {
    fn into_value(self) -> Value {
        (*self).into_value()
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: AvroSchema> AvroSchema for Option<T> {
    fn get_schema() -> Schema {
        Schema::Union(
            UnionSchema::new(vec![Schema::Null, T::get_schema()])
                .expect("null and one non-null branch always form a valid union"),
        )
    }
}

impl<T: AvroDatum> AvroDatum for Option<T> {
    fn into_value(self) -> Value {
        match self {
            None => Value::Union(0, Box::new(Value::Null)),
            Some(inner) => Value::Union(1, Box::new(inner.into_value())),
        }
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Null => Ok(None),
            Value::Union(_, inner) => match *inner {
                Value::Null => Ok(None),
                other => T::from_value(other).map(Some),
            },
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: AvroSchema> AvroSchema for Vec<T> {
    fn get_schema() -> Schema {
        Schema::array(T::get_schema())
    }
}

impl<T: AvroDatum> AvroDatum for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(T::into_value).collect())
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch(&other, SchemaKind::Array)),
        }
    }
}

impl<T: AvroSchema> AvroSchema for HashMap<String, T> {
    fn get_schema() -> Schema {
        Schema::map(T::get_schema())
    }
}

impl<T: AvroDatum> AvroDatum for HashMap<String, T> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(key, value)| (key, value.into_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Map(items) => items
                .into_iter()
                .map(|(key, value)| Ok((key, T::from_value(value)?)))
                .collect(),
            other => Err(mismatch(&other, SchemaKind::Map)),
        }
    }
}

impl<T: AvroSchema> AvroSchema for BTreeMap<String, T> {
    fn get_schema() -> Schema {
        Schema::map(T::get_schema())
    }
}

impl<T: AvroDatum> AvroDatum for BTreeMap<String, T> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(key, value)| (key, value.into_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Map(items) => items
                .into_iter()
                .map(|(key, value)| Ok((key, T::from_value(value)?)))
                .collect(),
            other => Err(mismatch(&other, SchemaKind::Map)),
        }
    }
}

impl AvroSchema for Uuid {
    fn get_schema() -> Schema {
        Schema::Uuid
    }
}

impl AvroDatum for Uuid {
    fn into_value(self) -> Value {
        Value::Uuid(self)
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Uuid(uuid) => Ok(uuid),
            Value::String(text) => Uuid::parse_str(&text).map_err(Error::ConvertStrToUuid),
            other => Err(mismatch(&other, SchemaKind::Uuid)),
        }
    }
}

impl AvroSchema for Duration {
    fn get_schema() -> Schema {
        Schema::Duration(FixedSchema {
            name: Name {
                name: "duration".to_string(),
                namespace: None,
            },
            aliases: None,
            doc: None,
            size: 12,
        })
    }
}

impl AvroDatum for Duration {
    fn into_value(self) -> Value {
        Value::Duration(self)
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Duration(duration) => Ok(duration),
            Value::Fixed(12, bytes) => {
                let bytes: [u8; 12] =
                    bytes.try_into().map_err(|_| Error::FixedSizeMismatch {
                        expected: 12,
                        actual: 0,
                    })?;
                Ok(Duration::from(bytes))
            }
            other => Err(mismatch(&other, SchemaKind::Duration)),
        }
    }
}
