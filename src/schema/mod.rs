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

//! Logic for parsing and interacting with schemas in Avro format.

mod name;
mod parser;

pub use crate::schema::name::{Name, Names, NamesRef, Namespace};
use crate::{AvroResult, error::Error};
use digest::Digest;
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use strum::{Display, EnumDiscriminants};

/// Represents documentation for complex Avro schemas.
pub type Documentation = Option<String>;

/// Represents any valid Avro schema.
///
/// More information about Avro schemas can be found in the
/// [Avro Specification](https://avro.apache.org/docs/++version++/specification/#schema-declaration)
#[derive(Clone, Debug, PartialEq, EnumDiscriminants, Display)]
#[strum_discriminants(name(SchemaKind), derive(Hash, Ord, PartialOrd))]
pub enum Schema {
    /// A `null` Avro schema.
    Null,
    /// A `boolean` Avro schema.
    Boolean,
    /// An `int` Avro schema.
    Int,
    /// A `long` Avro schema.
    Long,
    /// A `float` Avro schema.
    Float,
    /// A `double` Avro schema.
    Double,
    /// A `bytes` Avro schema: a sequence of 8-bit unsigned bytes.
    Bytes,
    /// A `string` Avro schema: a unicode character sequence.
    String,
    /// An `array` Avro schema. All items have the same schema.
    Array(Box<Schema>),
    /// A `map` Avro schema. Keys are always strings and all values have the
    /// same schema.
    Map(Box<Schema>),
    /// A `union` Avro schema.
    Union(UnionSchema),
    /// A `record` Avro schema.
    Record(RecordSchema),
    /// An `enum` Avro schema.
    Enum(EnumSchema),
    /// A `fixed` Avro schema.
    Fixed(FixedSchema),
    /// Logical type which represents `Decimal` values. The underlying type is
    /// serialized and deserialized as `Schema::Bytes` or `Schema::Fixed`.
    Decimal(DecimalSchema),
    /// A universally unique identifier, annotating a string.
    Uuid,
    /// Logical type which represents the number of days since the unix epoch.
    /// Serialization format is `Schema::Int`.
    Date,
    /// The time of day in number of milliseconds after midnight.
    TimeMillis,
    /// The time of day in number of microseconds after midnight.
    TimeMicros,
    /// An instant in time represented as the number of milliseconds after the
    /// UNIX epoch.
    TimestampMillis,
    /// An instant in time represented as the number of microseconds after the
    /// UNIX epoch.
    TimestampMicros,
    /// An instant in local time represented as the number of milliseconds
    /// after the UNIX epoch.
    LocalTimestampMillis,
    /// An instant in local time represented as the number of microseconds
    /// after the UNIX epoch.
    LocalTimestampMicros,
    /// An amount of time defined by a number of months, days and
    /// milliseconds, annotating a `fixed` of size 12.
    Duration(FixedSchema),
    /// A back-reference to a named schema defined earlier in the document.
    Ref { name: Name },
}

/// A description of a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The fully qualified name of the schema.
    pub name: Name,
    /// The aliases of the schema.
    pub aliases: Option<Vec<String>>,
    /// The documentation of the schema.
    pub doc: Documentation,
    /// The set of fields of the schema, in declaration order.
    pub fields: Vec<RecordField>,
}

/// Represents a field in a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    /// The name of the field.
    pub name: String,
    /// The documentation of the field.
    pub doc: Documentation,
    /// The default value of the field, retained as the raw JSON the schema
    /// carried. The codec consults it only when the write-side value lacks
    /// the field.
    pub default: Option<JsonValue>,
    /// The schema of the field.
    pub schema: Schema,
    /// The position of the field in the record.
    pub position: usize,
}

/// A description of an enum schema.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The fully qualified name of the schema.
    pub name: Name,
    /// The aliases of the schema.
    pub aliases: Option<Vec<String>>,
    /// The documentation of the schema.
    pub doc: Documentation,
    /// The ordered set of symbols of the schema. A symbol's ordinal is its
    /// position.
    pub symbols: Vec<String>,
    /// An optional default symbol used for compatibility.
    pub default: Option<String>,
}

/// A description of a fixed schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The fully qualified name of the schema.
    pub name: Name,
    /// The aliases of the schema.
    pub aliases: Option<Vec<String>>,
    /// The documentation of the schema.
    pub doc: Documentation,
    /// The number of bytes of the fixed schema.
    pub size: usize,
}

/// A description of a decimal schema.
///
/// `scale` defaults to 0 and must not exceed `precision`, which is an integer
/// greater than 0. The inner schema is `bytes` or `fixed`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecimalSchema {
    /// The maximum number of digits in the unscaled value.
    pub precision: usize,
    /// The number of digits to the right of the decimal point.
    pub scale: usize,
    /// The inner schema of the decimal (`bytes` or `fixed`).
    pub inner: Box<Schema>,
}

/// A description of a union schema.
///
/// A union may not contain two branches of the same non-named kind, nor two
/// named branches with the same fullname, nor another union directly.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    pub(crate) schemas: Vec<Schema>,
}

impl UnionSchema {
    /// Creates a new union from its ordered branches, validating them.
    pub fn new(schemas: Vec<Schema>) -> AvroResult<Self> {
        let mut seen_kinds = Vec::with_capacity(schemas.len());
        let mut seen_names = Vec::new();
        for schema in &schemas {
            if let Schema::Union(_) = schema {
                return Err(Error::InvalidUnion("unions may not directly contain a union"));
            }
            match schema.name() {
                Some(name) => {
                    if seen_names.contains(&name) {
                        return Err(Error::InvalidUnion(
                            "unions may not contain duplicate named types",
                        ));
                    }
                    seen_names.push(name);
                }
                None => {
                    let kind = SchemaKind::from(schema);
                    if seen_kinds.contains(&kind) {
                        return Err(Error::InvalidUnion(
                            "unions may not contain duplicate types",
                        ));
                    }
                    seen_kinds.push(kind);
                }
            }
        }
        Ok(Self { schemas })
    }

    /// Returns a slice of all the variants of this union.
    pub fn variants(&self) -> &[Schema] {
        &self.schemas
    }

    /// Returns `true` if the first variant of this union is `null`.
    pub fn is_nullable(&self) -> bool {
        matches!(self.schemas.first(), Some(Schema::Null))
    }
}

impl SchemaKind {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            SchemaKind::Null
                | SchemaKind::Boolean
                | SchemaKind::Int
                | SchemaKind::Long
                | SchemaKind::Double
                | SchemaKind::Float
                | SchemaKind::Bytes
                | SchemaKind::String,
        )
    }
}

impl Schema {
    /// Create an `array` schema with the given items schema.
    pub fn array(items: Schema) -> Schema {
        Schema::Array(Box::new(items))
    }

    /// Create a `map` schema with the given values schema.
    pub fn map(values: Schema) -> Schema {
        Schema::Map(Box::new(values))
    }

    /// Create a `union` schema from the given branches.
    pub fn union(branches: Vec<Schema>) -> AvroResult<Schema> {
        UnionSchema::new(branches).map(Schema::Union)
    }

    /// Returns whether the schema is a named type according to the Avro
    /// specification.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            Schema::Ref { .. }
                | Schema::Record(_)
                | Schema::Enum(_)
                | Schema::Fixed(_)
                | Schema::Duration(_)
        ) || matches!(self, Schema::Decimal(DecimalSchema { inner, .. }) if matches!(**inner, Schema::Fixed(_)))
    }

    /// Returns the name of the schema if it has one.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Ref { name }
            | Schema::Record(RecordSchema { name, .. })
            | Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. })
            | Schema::Duration(FixedSchema { name, .. }) => Some(name),
            Schema::Decimal(DecimalSchema { inner, .. }) => match &**inner {
                Schema::Fixed(FixedSchema { name, .. }) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the doc of the schema if it has one.
    pub fn doc(&self) -> Option<&String> {
        match self {
            Schema::Record(RecordSchema { doc, .. })
            | Schema::Enum(EnumSchema { doc, .. })
            | Schema::Fixed(FixedSchema { doc, .. })
            | Schema::Duration(FixedSchema { doc, .. }) => doc.as_ref(),
            _ => None,
        }
    }

    /// Create a `Schema` from a string representing a JSON Avro schema.
    pub fn parse_str(input: &str) -> AvroResult<Schema> {
        let value = serde_json::from_str(input).map_err(Error::ParseSchemaJson)?;
        Self::parse(&value)
    }

    /// Parses an Avro schema from a JSON value.
    pub fn parse(value: &JsonValue) -> AvroResult<Schema> {
        let mut parser = parser::Parser::default();
        parser.parse(value, None)
    }

    /// Create a `Schema` from a reader which implements [`Read`].
    pub fn parse_reader(reader: &mut (impl Read + ?Sized)) -> AvroResult<Schema> {
        let mut buf = String::new();
        match reader.read_to_string(&mut buf) {
            Ok(_) => Self::parse_str(&buf),
            Err(e) => Err(Error::ReadSchemaFile(e)),
        }
    }

    /// Create a `Schema` from a file containing a JSON Avro schema.
    pub fn parse_file(path: impl AsRef<Path>) -> AvroResult<Schema> {
        let text = std::fs::read_to_string(path).map_err(Error::ReadSchemaFile)?;
        Self::parse_str(&text)
    }

    /// Render the schema as JSON text.
    pub fn to_json_string(&self) -> AvroResult<String> {
        serde_json::to_string(self).map_err(Error::ConvertSchemaToJson)
    }

    /// Converts `self` into its [Parsing Canonical Form].
    ///
    /// [Parsing Canonical Form]:
    /// https://avro.apache.org/docs/++version++/specification/#parsing-canonical-form-for-schemas
    pub fn canonical_form(&self) -> AvroResult<String> {
        let json = serde_json::to_value(self).map_err(Error::ConvertSchemaToJson)?;
        Ok(parsing_canonical_form(&json))
    }

    /// Generate the fingerprint of the schema's [Parsing Canonical Form] with
    /// the chosen digest.
    ///
    /// [Parsing Canonical Form]:
    /// https://avro.apache.org/docs/++version++/specification/#parsing-canonical-form-for-schemas
    pub fn fingerprint<D: Digest>(&self) -> AvroResult<SchemaFingerprint> {
        let mut d = D::new();
        d.update(self.canonical_form()?);
        Ok(SchemaFingerprint {
            bytes: d.finalize().to_vec(),
        })
    }
}

/// Represents an Avro schema fingerprint: a stable hash of the schema's
/// Parsing Canonical Form, used for identity comparison across peers.
pub struct SchemaFingerprint {
    pub bytes: Vec<u8>,
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in &self.bytes {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// The resolution table of a schema: every named type the schema defines,
/// keyed by fully qualified name. Built once after parsing; `Schema::Ref`
/// nodes are looked up here by the codec.
#[derive(Default, Debug)]
pub struct ResolvedSchema<'s> {
    names_ref: NamesRef<'s>,
}

impl<'s> TryFrom<&'s Schema> for ResolvedSchema<'s> {
    type Error = Error;

    fn try_from(schema: &'s Schema) -> AvroResult<Self> {
        let mut rs = ResolvedSchema {
            names_ref: HashMap::new(),
        };
        rs.from_internal(schema)?;
        Ok(rs)
    }
}

impl<'s> ResolvedSchema<'s> {
    pub fn get_names(&self) -> &NamesRef<'s> {
        &self.names_ref
    }

    fn from_internal(&mut self, schema: &'s Schema) -> AvroResult<()> {
        match schema {
            Schema::Array(items) | Schema::Map(items) => self.from_internal(items),
            Schema::Union(UnionSchema { schemas }) => {
                for schema in schemas {
                    self.from_internal(schema)?;
                }
                Ok(())
            }
            Schema::Record(RecordSchema { name, fields, .. }) => {
                self.names_ref.insert(name.clone(), schema);
                for field in fields {
                    self.from_internal(&field.schema)?;
                }
                Ok(())
            }
            Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. })
            | Schema::Duration(FixedSchema { name, .. }) => {
                self.names_ref.insert(name.clone(), schema);
                Ok(())
            }
            // A reference to a decimal-annotated fixed names the bare fixed.
            Schema::Decimal(DecimalSchema { inner, .. }) => {
                if let Schema::Fixed(FixedSchema { name, .. }) = &**inner {
                    self.names_ref.insert(name.clone(), &**inner);
                }
                Ok(())
            }
            Schema::Ref { name } => {
                if self.names_ref.contains_key(name) {
                    Ok(())
                } else {
                    Err(Error::UnknownType(name.fullname()))
                }
            }
            _ => Ok(()),
        }
    }
}

/// Collect all named types defined in `schema` into `names` as owned clones.
///
/// This is the owned counterpart of [`ResolvedSchema`], used where the schema
/// and its lookup table must live side by side (the container reader).
pub(crate) fn resolve_names(schema: &Schema, names: &mut Names) -> AvroResult<()> {
    match schema {
        Schema::Array(items) | Schema::Map(items) => resolve_names(items, names),
        Schema::Union(UnionSchema { schemas }) => {
            for schema in schemas {
                resolve_names(schema, names)?;
            }
            Ok(())
        }
        Schema::Record(RecordSchema { name, fields, .. }) => {
            names.insert(name.clone(), schema.clone());
            for field in fields {
                resolve_names(&field.schema, names)?;
            }
            Ok(())
        }
        Schema::Enum(EnumSchema { name, .. })
        | Schema::Fixed(FixedSchema { name, .. })
        | Schema::Duration(FixedSchema { name, .. }) => {
            names.insert(name.clone(), schema.clone());
            Ok(())
        }
        // A reference to a decimal-annotated fixed names the bare fixed.
        Schema::Decimal(DecimalSchema { inner, .. }) => {
            if let Schema::Fixed(FixedSchema { name, .. }) = &**inner {
                names.insert(name.clone(), (**inner).clone());
            }
            Ok(())
        }
        Schema::Ref { name } => {
            if names.contains_key(name) {
                Ok(())
            } else {
                Err(Error::UnknownType(name.fullname()))
            }
        }
        _ => Ok(()),
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Schema::Null => serializer.serialize_str("null"),
            Schema::Boolean => serializer.serialize_str("boolean"),
            Schema::Int => serializer.serialize_str("int"),
            Schema::Long => serializer.serialize_str("long"),
            Schema::Float => serializer.serialize_str("float"),
            Schema::Double => serializer.serialize_str("double"),
            Schema::Bytes => serializer.serialize_str("bytes"),
            Schema::String => serializer.serialize_str("string"),
            Schema::Array(items) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items)?;
                map.end()
            }
            Schema::Map(values) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("values", values)?;
                map.end()
            }
            Schema::Union(UnionSchema { schemas }) => {
                let mut seq = serializer.serialize_seq(Some(schemas.len()))?;
                for schema in schemas {
                    seq.serialize_element(schema)?;
                }
                seq.end()
            }
            Schema::Record(RecordSchema {
                name,
                aliases,
                doc,
                fields,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "record")?;
                map.serialize_entry("name", &name.fullname())?;
                if let Some(doc) = doc {
                    map.serialize_entry("doc", doc)?;
                }
                if let Some(aliases) = aliases {
                    map.serialize_entry("aliases", aliases)?;
                }
                map.serialize_entry("fields", fields)?;
                map.end()
            }
            Schema::Enum(EnumSchema {
                name,
                aliases,
                doc,
                symbols,
                default,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "enum")?;
                map.serialize_entry("name", &name.fullname())?;
                if let Some(doc) = doc {
                    map.serialize_entry("doc", doc)?;
                }
                if let Some(aliases) = aliases {
                    map.serialize_entry("aliases", aliases)?;
                }
                map.serialize_entry("symbols", symbols)?;
                if let Some(default) = default {
                    map.serialize_entry("default", default)?;
                }
                map.end()
            }
            Schema::Fixed(fixed) => {
                let mut map = serializer.serialize_map(None)?;
                serialize_fixed_entries(&mut map, fixed)?;
                map.end()
            }
            Schema::Decimal(DecimalSchema {
                precision,
                scale,
                inner,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                match &**inner {
                    Schema::Fixed(fixed) => serialize_fixed_entries(&mut map, fixed)?,
                    _ => map.serialize_entry("type", "bytes")?,
                }
                map.serialize_entry("logicalType", "decimal")?;
                map.serialize_entry("precision", precision)?;
                map.serialize_entry("scale", scale)?;
                map.end()
            }
            Schema::Uuid => logical(serializer, "string", "uuid"),
            Schema::Date => logical(serializer, "int", "date"),
            Schema::TimeMillis => logical(serializer, "int", "time-millis"),
            Schema::TimeMicros => logical(serializer, "long", "time-micros"),
            Schema::TimestampMillis => logical(serializer, "long", "timestamp-millis"),
            Schema::TimestampMicros => logical(serializer, "long", "timestamp-micros"),
            Schema::LocalTimestampMillis => {
                logical(serializer, "long", "local-timestamp-millis")
            }
            Schema::LocalTimestampMicros => {
                logical(serializer, "long", "local-timestamp-micros")
            }
            Schema::Duration(fixed) => {
                let mut map = serializer.serialize_map(None)?;
                serialize_fixed_entries(&mut map, fixed)?;
                map.serialize_entry("logicalType", "duration")?;
                map.end()
            }
            Schema::Ref { name } => serializer.serialize_str(&name.fullname()),
        }
    }
}

fn serialize_fixed_entries<M: SerializeMap>(
    map: &mut M,
    fixed: &FixedSchema,
) -> Result<(), M::Error> {
    map.serialize_entry("type", "fixed")?;
    map.serialize_entry("name", &fixed.name.fullname())?;
    if let Some(doc) = &fixed.doc {
        map.serialize_entry("doc", doc)?;
    }
    if let Some(aliases) = &fixed.aliases {
        map.serialize_entry("aliases", aliases)?;
    }
    map.serialize_entry("size", &fixed.size)
}

fn logical<S: Serializer>(
    serializer: S,
    base: &str,
    logical_type: &str,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry("type", base)?;
    map.serialize_entry("logicalType", logical_type)?;
    map.end()
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.schema)?;
        if let Some(doc) = &self.doc {
            map.serialize_entry("doc", doc)?;
        }
        if let Some(default) = &self.default {
            map.serialize_entry("default", default)?;
        }
        map.end()
    }
}

/// Reduce a schema's JSON form to the Parsing Canonical Form: only the
/// normative attributes survive, in a fixed order, with whitespace stripped.
fn parsing_canonical_form(schema: &JsonValue) -> String {
    match schema {
        JsonValue::Object(map) => {
            // A `{"type": "..."}"` wrapper with logical annotations reduces
            // to its base type.
            let mut fields = Vec::new();
            for field_name in ["name", "type", "fields", "symbols", "items", "values", "size"] {
                if let Some(value) = map.get(field_name) {
                    fields.push(format!(
                        "\"{field_name}\":{}",
                        parsing_canonical_form(value)
                    ));
                }
            }
            if fields.len() == 1 {
                if let Some(type_value) = map.get("type") {
                    return parsing_canonical_form(type_value);
                }
            }
            format!("{{{}}}", fields.join(","))
        }
        JsonValue::Array(items) => {
            let items = items
                .iter()
                .map(parsing_canonical_form)
                .collect::<Vec<_>>()
                .join(",");
            format!("[{items}]")
        }
        JsonValue::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_invalid_unions() {
        assert!(matches!(
            UnionSchema::new(vec![Schema::Int, Schema::Int]),
            Err(Error::InvalidUnion(_))
        ));
        assert!(matches!(
            UnionSchema::new(vec![
                Schema::Null,
                Schema::Union(UnionSchema::new(vec![Schema::Int]).unwrap()),
            ]),
            Err(Error::InvalidUnion(_))
        ));
    }

    #[test]
    fn test_union_allows_distinct_named_types() -> TestResult {
        let a = Schema::parse_str(
            r#"{"type": "fixed", "name": "A", "size": 4}"#,
        )?;
        let b = Schema::parse_str(
            r#"{"type": "fixed", "name": "B", "size": 4}"#,
        )?;
        assert!(UnionSchema::new(vec![a, b]).is_ok());
        Ok(())
    }

    #[test]
    fn test_schema_json_round_trip() -> TestResult {
        let raw = r#"
        {
            "type": "record",
            "name": "interop.Outer",
            "doc": "the outer record",
            "fields": [
                {"name": "id", "type": "long"},
                {"name": "label", "type": ["null", "string"], "default": null},
                {"name": "tags", "type": {"type": "array", "items": "string"}},
                {"name": "attrs", "type": {"type": "map", "values": "int"}},
                {"name": "checksum", "type": {"type": "fixed", "name": "Md5", "size": 16}},
                {"name": "again", "type": "Md5"}
            ]
        }
        "#;
        let schema = Schema::parse_str(raw)?;
        let json = schema.to_json_string()?;
        let reparsed = Schema::parse_str(&json)?;
        assert_eq!(schema, reparsed);
        Ok(())
    }

    #[test]
    fn test_canonical_form_strips_attributes() -> TestResult {
        let schema = Schema::parse_str(
            r#"
            {
                "type": "record",
                "name": "test",
                "doc": "some documentation",
                "aliases": ["prior"],
                "fields": [
                    {"name": "a", "type": "long", "default": 42, "doc": "field a"},
                    {"name": "b", "type": "string"}
                ]
            }
            "#,
        )?;
        assert_eq!(
            schema.canonical_form()?,
            r#"{"name":"test","type":"record","fields":[{"name":"a","type":"long"},{"name":"b","type":"string"}]}"#
        );
        Ok(())
    }

    #[test]
    fn test_fingerprints_are_stable() -> TestResult {
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
        assert_eq!(
            format!("{}", schema.fingerprint::<md5::Md5>()?),
            "7bce8188f28e66480a45ffbdc3615b7d"
        );
        assert_eq!(
            format!("{}", schema.fingerprint::<sha2::Sha256>()?),
            "c4d97949770866dec733ae7afa3046757e901d0cfea32eb92a8faeadcc4de153"
        );
        Ok(())
    }

    #[test]
    fn test_resolved_schema_collects_named_types() -> TestResult {
        let schema = Schema::parse_str(
            r#"
            {
                "type": "record",
                "name": "LongList",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "next", "type": ["null", "LongList"]}
                ]
            }
            "#,
        )?;
        let rs = ResolvedSchema::try_from(&schema)?;
        assert_eq!(rs.get_names().len(), 1);
        assert!(rs.get_names().contains_key(&Name::new("LongList")?));
        Ok(())
    }

    #[test]
    fn test_unresolved_ref_is_rejected() {
        let schema = Schema::Ref {
            name: Name::new("missing.Thing").unwrap(),
        };
        match ResolvedSchema::try_from(&schema) {
            Err(Error::UnknownType(name)) => assert_eq!(name, "missing.Thing"),
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }
}
