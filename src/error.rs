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

//! Errors raised while parsing schemas, encoding or decoding values, and
//! reading or writing object container files.

use crate::{schema::SchemaKind, types::ValueKind};

/// Errors encountered by Avro.
///
/// All errors propagate out to the caller; none are caught internally.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input ended in the middle of an encoded value or block.
    #[error("unexpected end of input while reading {0}")]
    Truncated(&'static str),

    /// A variable-length integer ran past the 10 bytes a long can occupy.
    #[error("variable-length integer is longer than 10 bytes")]
    IntegerOverflow,

    /// The source does not start with the `Obj\x01` magic.
    #[error("invalid object container magic: {0:?}")]
    BadMagic([u8; 4]),

    /// A block's trailing sync marker does not match the file header.
    #[error("block sync marker does not match the file sync marker")]
    CorruptSync,

    /// The codec named in the container metadata is not registered.
    #[error("compression codec {0:?} is not supported")]
    UnknownCodec(String),

    /// A JSON schema references a name that was never defined.
    #[error("unknown type reference: {0}")]
    UnknownType(String),

    /// A union violates the Avro specification.
    #[error("invalid union: {0}")]
    InvalidUnion(&'static str),

    /// No branch of the union matches the value being written.
    #[error("value of kind {0:?} does not match any branch of the union")]
    NoUnionBranch(ValueKind),

    /// The value's shape is incompatible with the schema it is written or
    /// sized against.
    #[error("value of kind {value:?} is not compatible with schema of kind {schema:?}")]
    SchemaMismatch {
        value: ValueKind,
        schema: SchemaKind,
    },

    /// A decoded enum ordinal is not within the symbol list.
    #[error("enum ordinal {index} is out of range for an enum with {num_symbols} symbols")]
    EnumOutOfRange { index: u32, num_symbols: usize },

    /// A string payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),

    /// A decimal's unscaled value does not fit its declared precision.
    #[error("decimal with {digits} digits exceeds the declared precision {precision}")]
    DecimalOutOfPrecision { digits: usize, precision: usize },

    /// A decimal does not fit the fixed schema backing it.
    #[error("decimal needs {needed} bytes which does not fit in fixed({size})")]
    DecimalSignExtend { size: usize, needed: usize },

    /// A decoded boolean byte is neither `0x00` nor `0x01`.
    #[error("invalid boolean byte: {0:#04x}")]
    BoolValue(u8),

    /// A decoded union branch index is not within the union.
    #[error("union branch index {index} is out of range for a union with {num_branches} branches")]
    UnionBranchOutOfRange { index: i64, num_branches: usize },

    /// A fixed value's byte count disagrees with its schema.
    #[error("fixed value has {actual} bytes but the schema declares {expected}")]
    FixedSizeMismatch { expected: usize, actual: usize },

    /// A record value lacks a field required by the schema, and the schema
    /// declares no default for it.
    #[error("record value is missing field {0:?} and the schema has no default for it")]
    FieldMissing(String),

    /// A field default in the schema cannot express a value of the field's
    /// type.
    #[error("default value {0} is not compatible with the field schema")]
    InvalidDefault(serde_json::Value),

    /// A string written against an enum schema is not one of its symbols.
    #[error("{0:?} is not a symbol of the enum")]
    UnknownEnumSymbol(String),

    #[error("schema text is not valid JSON")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("a JSON schema must be a string, object or array, found: {0}")]
    ParseSchemaFromValidJson(serde_json::Value),

    #[error("invalid schema name {0:?}")]
    InvalidSchemaName(String),

    #[error("invalid namespace {0:?}")]
    InvalidNamespace(String),

    #[error("schema object is missing a \"name\" field")]
    GetNameField,

    #[error("schema object is missing a \"type\" field")]
    GetComplexTypeField,

    #[error("record schema is missing a \"fields\" array")]
    GetRecordFieldsJson,

    #[error("enum schema is missing a \"symbols\" array of strings")]
    GetEnumSymbols,

    #[error("fixed schema is missing a non-negative \"size\" integer")]
    GetFixedSize,

    #[error("array schema is missing an \"items\" field")]
    GetArrayItems,

    #[error("map schema is missing a \"values\" field")]
    GetMapValues,

    #[error("decimal metadata field {0:?} must be a non-negative integer")]
    GetDecimalMetadata(&'static str),

    #[error("decimal precision {precision} must be at least 1")]
    DecimalPrecisionMustBePositive { precision: usize },

    #[error("decimal scale {scale} must not exceed precision {precision}")]
    DecimalScaleExceedsPrecision { precision: usize, scale: usize },

    #[error("duplicate field name {0:?} in record")]
    FieldNameDuplicate(String),

    #[error("duplicate symbol {0:?} in enum")]
    EnumSymbolDuplicate(String),

    #[error("container metadata entry {0:?} must be a byte string")]
    BadMetadata(&'static str),

    #[error("metadata keys starting with \"avro.\" are reserved: {0}")]
    InvalidMetadataKey(String),

    #[error("the container header has already been written")]
    FileHeaderAlreadyWritten,

    #[error("row index {index} is out of range for a table with {len} rows")]
    RowOutOfRange { index: usize, len: usize },

    /// A schema cannot be derived from the value's shape alone.
    #[error("cannot derive a schema from a value of kind {0:?}")]
    DeriveSchema(ValueKind),

    #[error("a decoded value did not consume any input")]
    ReadBlockStalled,

    #[error("memory allocation of {desired} bytes exceeds the maximum of {maximum}")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("failed to read from the source")]
    ReadBytes(#[source] std::io::Error),

    #[error("failed to write to the sink")]
    WriteBytes(#[source] std::io::Error),

    #[error("failed to flush the sink")]
    FlushWriter(#[source] std::io::Error),

    #[error("failed to seek in the source")]
    Seek(#[source] std::io::Error),

    #[error("failed to read schema from file")]
    ReadSchemaFile(#[source] std::io::Error),

    #[error("failed to serialize schema to JSON")]
    ConvertSchemaToJson(#[source] serde_json::Error),

    #[error("failed to parse UUID from string")]
    ConvertStrToUuid(#[source] uuid::Error),

    #[error("failed to decompress a block")]
    Decompress(#[source] std::io::Error),

    #[error("failed to compress a block")]
    Compress(#[source] std::io::Error),
}

impl Error {
    /// Maps an I/O error from a read into the crate's truncation semantics:
    /// a clean end-of-input mid-value is [`Error::Truncated`], anything else
    /// is an I/O failure.
    pub(crate) fn io_read(err: std::io::Error, what: &'static str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Truncated(what)
        } else {
            Error::ReadBytes(err)
        }
    }
}
