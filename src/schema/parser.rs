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
        DecimalSchema, EnumSchema, FixedSchema, Name, RecordField, RecordSchema, Schema,
        SchemaKind, UnionSchema,
    },
};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Parse state for one JSON schema document.
///
/// Named types are registered as they are defined in left-to-right traversal
/// order; a later mention of a registered name becomes a [`Schema::Ref`].
#[derive(Default)]
pub(super) struct Parser {
    defined_names: HashSet<Name>,
}

fn string_attr(complex: &Map<String, Value>, key: &str) -> Option<String> {
    complex
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

fn aliases_attr(complex: &Map<String, Value>) -> Option<Vec<String>> {
    complex
        .get("aliases")
        .and_then(|aliases| aliases.as_array())
        .and_then(|aliases| {
            aliases
                .iter()
                .map(|alias| alias.as_str().map(|a| a.to_string()))
                .collect::<Option<_>>()
        })
}

fn name_from_complex(
    complex: &Map<String, Value>,
    enclosing_namespace: Option<&str>,
) -> AvroResult<Name> {
    let name = string_attr(complex, "name").ok_or(Error::GetNameField)?;
    let namespace = string_attr(complex, "namespace");
    Name::new_with_enclosing_namespace(&name, namespace.as_deref().or(enclosing_namespace))
}

impl Parser {
    /// Create a `Schema` from a `serde_json::Value` representing a JSON Avro
    /// schema.
    pub(super) fn parse(
        &mut self,
        value: &Value,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        match value {
            Value::String(t) => self.parse_known_schema(t.as_str(), enclosing_namespace),
            Value::Object(data) => self.parse_complex(data, enclosing_namespace),
            Value::Array(data) => self.parse_union(data, enclosing_namespace),
            other => Err(Error::ParseSchemaFromValidJson(other.clone())),
        }
    }

    /// Parse a string as a primitive type or a reference to an already
    /// defined named type.
    fn parse_known_schema(
        &mut self,
        name: &str,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::Int),
            "long" => Ok(Schema::Long),
            "double" => Ok(Schema::Double),
            "float" => Ok(Schema::Float),
            "bytes" => Ok(Schema::Bytes),
            "string" => Ok(Schema::String),
            _ => self.fetch_schema_ref(name, enclosing_namespace),
        }
    }

    /// Resolve a name against the table of already defined named types.
    fn fetch_schema_ref(
        &mut self,
        name: &str,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = Name::new_with_enclosing_namespace(name, enclosing_namespace)
            .map_err(|_| Error::UnknownType(name.to_string()))?;
        if self.defined_names.contains(&fully_qualified_name) {
            Ok(Schema::Ref {
                name: fully_qualified_name,
            })
        } else {
            Err(Error::UnknownType(fully_qualified_name.fullname()))
        }
    }

    /// Parse a `serde_json::Value` representing a complex Avro type into a
    /// `Schema`, lifting a `logicalType` annotation when one is present and
    /// recognized. Unrecognized or invalid logical types degrade silently to
    /// the base schema, as the Avro specification requires.
    fn parse_complex(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        if let Some(Value::String(logical_type)) = complex.get("logicalType") {
            let logical_type = logical_type.clone();
            let base = self.parse_base_of_logical(complex, enclosing_namespace)?;
            return Ok(self.lift_logical_type(&logical_type, base, complex));
        }
        self.parse_native_complex(complex, enclosing_namespace)
    }

    /// Parse the `type` attribute of an object carrying a `logicalType`.
    fn parse_base_of_logical(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        match complex.get("type") {
            Some(Value::String(s)) if s == "fixed" => {
                self.parse_fixed(complex, enclosing_namespace)
            }
            Some(value) => self.parse(value, enclosing_namespace),
            None => Err(Error::GetComplexTypeField),
        }
    }

    fn lift_logical_type(
        &mut self,
        logical_type: &str,
        base: Schema,
        complex: &Map<String, Value>,
    ) -> Schema {
        let kind = SchemaKind::from(&base);
        match (logical_type, kind) {
            ("decimal", SchemaKind::Bytes | SchemaKind::Fixed) => {
                match parse_precision_and_scale(complex) {
                    Ok((precision, scale)) => Schema::Decimal(DecimalSchema {
                        precision,
                        scale,
                        inner: Box::new(base),
                    }),
                    Err(err) => {
                        warn!("Ignoring invalid decimal logical type: {err}");
                        base
                    }
                }
            }
            ("uuid", SchemaKind::String) => Schema::Uuid,
            ("date", SchemaKind::Int) => Schema::Date,
            ("time-millis", SchemaKind::Int) => Schema::TimeMillis,
            ("time-micros", SchemaKind::Long) => Schema::TimeMicros,
            ("timestamp-millis", SchemaKind::Long) => Schema::TimestampMillis,
            ("timestamp-micros", SchemaKind::Long) => Schema::TimestampMicros,
            ("local-timestamp-millis", SchemaKind::Long) => Schema::LocalTimestampMillis,
            ("local-timestamp-micros", SchemaKind::Long) => Schema::LocalTimestampMicros,
            ("duration", SchemaKind::Fixed) => match base {
                Schema::Fixed(fixed) if fixed.size == 12 => Schema::Duration(fixed),
                other => {
                    warn!("Ignoring duration logical type on a fixed whose size is not 12");
                    other
                }
            },
            _ => {
                warn!("Ignoring unknown logical type {logical_type:?} for schema of kind {kind:?}");
                base
            }
        }
    }

    fn parse_native_complex(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        match complex.get("type") {
            Some(Value::String(t)) => match t.as_str() {
                "record" => self.parse_record(complex, enclosing_namespace),
                "enum" => self.parse_enum(complex, enclosing_namespace),
                "array" => self.parse_array(complex, enclosing_namespace),
                "map" => self.parse_map(complex, enclosing_namespace),
                "fixed" => self.parse_fixed(complex, enclosing_namespace),
                other => self.parse_known_schema(other, enclosing_namespace),
            },
            Some(Value::Object(data)) => self.parse_complex(data, enclosing_namespace),
            Some(Value::Array(variants)) => self.parse_union(variants, enclosing_namespace),
            _ => Err(Error::GetComplexTypeField),
        }
    }

    fn parse_record(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = name_from_complex(complex, enclosing_namespace)?;
        let aliases = aliases_attr(complex);
        debug!("parsing record schema {fully_qualified_name}");

        // Register the record before its fields so it can refer to itself.
        self.defined_names.insert(fully_qualified_name.clone());

        let record_namespace = fully_qualified_name.namespace.clone();
        let fields_json = complex
            .get("fields")
            .and_then(|fields| fields.as_array())
            .ok_or(Error::GetRecordFieldsJson)?;

        let mut fields = Vec::with_capacity(fields_json.len());
        let mut seen = HashSet::with_capacity(fields_json.len());
        for (position, field) in fields_json.iter().enumerate() {
            let field = field.as_object().ok_or(Error::GetRecordFieldsJson)?;
            let name = string_attr(field, "name").ok_or(Error::GetNameField)?;
            if !seen.insert(name.clone()) {
                return Err(Error::FieldNameDuplicate(name));
            }
            let schema = field
                .get("type")
                .ok_or(Error::GetComplexTypeField)
                .and_then(|t| self.parse(t, record_namespace.as_deref()))?;
            fields.push(RecordField {
                name,
                doc: string_attr(field, "doc"),
                default: field.get("default").cloned(),
                schema,
                position,
            });
        }

        Ok(Schema::Record(RecordSchema {
            name: fully_qualified_name,
            aliases,
            doc: string_attr(complex, "doc"),
            fields,
        }))
    }

    fn parse_enum(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = name_from_complex(complex, enclosing_namespace)?;
        let aliases = aliases_attr(complex);

        let symbols: Vec<String> = complex
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or(Error::GetEnumSymbols)
            .and_then(|symbols| {
                symbols
                    .iter()
                    .map(|symbol| symbol.as_str().map(|s| s.to_string()))
                    .collect::<Option<_>>()
                    .ok_or(Error::GetEnumSymbols)
            })?;

        let mut seen = HashSet::with_capacity(symbols.len());
        for symbol in &symbols {
            if !seen.insert(symbol.as_str()) {
                return Err(Error::EnumSymbolDuplicate(symbol.clone()));
            }
        }

        let default = string_attr(complex, "default");
        if let Some(default) = &default {
            if !symbols.contains(default) {
                return Err(Error::UnknownEnumSymbol(default.clone()));
            }
        }

        self.defined_names.insert(fully_qualified_name.clone());

        Ok(Schema::Enum(EnumSchema {
            name: fully_qualified_name,
            aliases,
            doc: string_attr(complex, "doc"),
            symbols,
            default,
        }))
    }

    fn parse_array(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        complex
            .get("items")
            .ok_or(Error::GetArrayItems)
            .and_then(|items| self.parse(items, enclosing_namespace))
            .map(Schema::array)
    }

    fn parse_map(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        complex
            .get("values")
            .ok_or(Error::GetMapValues)
            .and_then(|values| self.parse(values, enclosing_namespace))
            .map(Schema::map)
    }

    fn parse_union(
        &mut self,
        variants: &[Value],
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        variants
            .iter()
            .map(|variant| self.parse(variant, enclosing_namespace))
            .collect::<AvroResult<Vec<_>>>()
            .and_then(UnionSchema::new)
            .map(Schema::Union)
    }

    fn parse_fixed(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = name_from_complex(complex, enclosing_namespace)?;
        let aliases = aliases_attr(complex);

        let size = complex
            .get("size")
            .and_then(|v| v.as_u64())
            .ok_or(Error::GetFixedSize)? as usize;

        self.defined_names.insert(fully_qualified_name.clone());

        Ok(Schema::Fixed(FixedSchema {
            name: fully_qualified_name,
            aliases,
            doc: string_attr(complex, "doc"),
            size,
        }))
    }
}

fn decimal_integer(complex: &Map<String, Value>, key: &'static str) -> AvroResult<usize> {
    match complex.get(key) {
        Some(Value::Number(value)) => value
            .as_u64()
            .map(|v| v as usize)
            .ok_or(Error::GetDecimalMetadata(key)),
        None if key == "scale" => Ok(0),
        _ => Err(Error::GetDecimalMetadata(key)),
    }
}

fn parse_precision_and_scale(complex: &Map<String, Value>) -> AvroResult<(usize, usize)> {
    let precision = decimal_integer(complex, "precision")?;
    let scale = decimal_integer(complex, "scale")?;

    if precision < 1 {
        return Err(Error::DecimalPrecisionMustBePositive { precision });
    }
    if precision < scale {
        Err(Error::DecimalScaleExceedsPrecision { precision, scale })
    } else {
        Ok((precision, scale))
    }
}
