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

//! Source-text generation: Rust structs, enums and fixed newtypes for the
//! named types of a schema, together with their bridge implementations.
//!
//! This is a pure function over the schema model; it has no dependency on
//! the codec or the container components.

use crate::{
    AvroResult,
    error::Error,
    schema::{
        DecimalSchema, EnumSchema, FixedSchema, Name, NamesRef, RecordField, RecordSchema,
        ResolvedSchema, Schema, UnionSchema,
    },
};
use std::collections::HashSet;

/// Emit Rust source for every named type `schema` defines, in dependency
/// order.
///
/// Primitive and anonymous schemas produce no items. The emitted types carry
/// sanitized identifiers; the original names stay in the bridge
/// implementations so the wire format is unchanged.
pub fn emit(schema: &Schema) -> AvroResult<String> {
    let rs = ResolvedSchema::try_from(schema)?;
    let names = rs.get_names();

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    collect_named(schema, names, &mut seen, &mut order);

    let mut out = String::new();
    out.push_str("// Generated from an Avro schema. Do not edit.\n\n");
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str("use avrolite::{\n");
    out.push_str("    AvroDatum, AvroResult, AvroSchema, Decimal, Duration, Error, Schema,\n");
    out.push_str("    schema::SchemaKind,\n");
    out.push_str("    types::{Value, ValueKind},\n");
    out.push_str("};\n");
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str("use std::collections::HashMap;\n");

    for node in order {
        match node {
            Schema::Record(record) => emit_record(node, record, names, &mut out)?,
            Schema::Enum(enum_schema) => emit_enum(node, enum_schema, names, &mut out)?,
            Schema::Fixed(fixed) => emit_fixed(node, fixed, names, &mut out)?,
            _ => {}
        }
    }

    Ok(out)
}

/// Like [`emit`], wrapping the output in a `pub mod` with the given name.
pub fn emit_module(schema: &Schema, module_name: &str) -> AvroResult<String> {
    let body = emit(schema)?;
    let module = sanitize_ident(module_name);
    let mut out = String::new();
    out.push_str(&format!("pub mod {module} {{\n"));
    for line in body.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!("    {line}\n"));
        }
    }
    out.push_str("}\n");
    Ok(out)
}

/// Replace non-identifier characters with underscores, keep identifiers from
/// starting with a digit, and suffix reserved words with an underscore.
pub(crate) fn sanitize_ident(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if is_reserved_word(&ident) {
        ident.push('_');
    }
    ident
}

fn is_reserved_word(ident: &str) -> bool {
    matches!(
        ident,
        "as" | "async" | "await" | "box" | "break" | "const" | "continue" | "crate" | "dyn"
            | "else" | "enum" | "extern" | "false" | "fn" | "for" | "gen" | "if" | "impl" | "in"
            | "let" | "loop" | "macro" | "match" | "mod" | "move" | "mut" | "pub" | "ref"
            | "return" | "self" | "Self" | "static" | "struct" | "super" | "trait" | "true"
            | "try" | "type" | "union" | "unsafe" | "use" | "where" | "while" | "yield"
    )
}

/// The short type name a named schema is emitted under.
fn type_ident(name: &Name) -> String {
    let mut ident = sanitize_ident(&name.name);
    // Rust type names are upper camel case; keep the rest of the name as the
    // schema author wrote it.
    if let Some(first) = ident.chars().next() {
        if first.is_ascii_lowercase() {
            ident.replace_range(..1, &first.to_ascii_uppercase().to_string());
        }
    }
    ident
}

fn variant_ident(symbol: &str) -> String {
    type_ident(&Name {
        name: symbol.to_string(),
        namespace: None,
    })
}

/// Whether the Rust mapping of `schema` implements `AvroDatum`, i.e. whether
/// generated code may convert it through the trait. Decimals and free-form
/// unions fall back to the dynamic `Value` type.
fn has_datum_impl(schema: &Schema, names: &NamesRef) -> bool {
    match schema {
        Schema::Decimal(_) => false,
        Schema::Union(union) => match nullable_inner(union) {
            Some(inner) => has_datum_impl(inner, names),
            None => false,
        },
        Schema::Array(inner) | Schema::Map(inner) => has_datum_impl(inner, names),
        Schema::Ref { name } => names
            .get(name)
            .map(|resolved| has_datum_impl(resolved, names))
            .unwrap_or(false),
        _ => true,
    }
}

/// The inner branch of a `[null, T]` union, if the union has that shape.
fn nullable_inner(union: &UnionSchema) -> Option<&Schema> {
    match union.variants() {
        [Schema::Null, inner] => Some(inner),
        _ => None,
    }
}

/// The Rust type a schema maps to in generated code.
fn rust_type(schema: &Schema, names: &NamesRef) -> String {
    if !has_datum_impl(schema, names) {
        return "Value".to_string();
    }
    match schema {
        Schema::Null => "()".to_string(),
        Schema::Boolean => "bool".to_string(),
        Schema::Int | Schema::Date | Schema::TimeMillis => "i32".to_string(),
        Schema::Long
        | Schema::TimeMicros
        | Schema::TimestampMillis
        | Schema::TimestampMicros
        | Schema::LocalTimestampMillis
        | Schema::LocalTimestampMicros => "i64".to_string(),
        Schema::Float => "f32".to_string(),
        Schema::Double => "f64".to_string(),
        Schema::Bytes => "avrolite::Bytes".to_string(),
        Schema::String => "String".to_string(),
        Schema::Uuid => "avrolite::Uuid".to_string(),
        Schema::Duration(_) => "Duration".to_string(),
        Schema::Decimal(_) => "Decimal".to_string(),
        Schema::Array(inner) => format!("Vec<{}>", rust_type(inner, names)),
        Schema::Map(inner) => format!("HashMap<String, {}>", rust_type(inner, names)),
        Schema::Union(union) => match nullable_inner(union) {
            Some(inner) => format!("Option<{}>", rust_type(inner, names)),
            None => "Value".to_string(),
        },
        Schema::Record(RecordSchema { name, .. })
        | Schema::Enum(EnumSchema { name, .. })
        | Schema::Fixed(FixedSchema { name, .. }) => type_ident(name),
        // A reference can close a cycle back to the record being defined, so
        // record references get an indirection.
        Schema::Ref { name } => match names.get(name) {
            Some(resolved @ Schema::Record(_)) => {
                format!("Box<{}>", rust_type(resolved, names))
            }
            Some(resolved) => rust_type(resolved, names),
            None => type_ident(name),
        },
    }
}

/// Collect named types in dependency order: definitions before uses, with
/// self-references tolerated.
fn collect_named<'s>(
    schema: &'s Schema,
    names: &NamesRef<'s>,
    seen: &mut HashSet<Name>,
    order: &mut Vec<&'s Schema>,
) {
    match schema {
        Schema::Record(RecordSchema { name, fields, .. }) => {
            if seen.insert(name.clone()) {
                for field in fields {
                    collect_named(&field.schema, names, seen, order);
                }
                order.push(schema);
            }
        }
        Schema::Enum(EnumSchema { name, .. }) | Schema::Fixed(FixedSchema { name, .. }) => {
            if seen.insert(name.clone()) {
                order.push(schema);
            }
        }
        Schema::Array(inner) | Schema::Map(inner) => collect_named(inner, names, seen, order),
        Schema::Union(UnionSchema { schemas }) => {
            for schema in schemas {
                collect_named(schema, names, seen, order);
            }
        }
        Schema::Ref { name } => {
            if !seen.contains(name) {
                if let Some(resolved) = names.get(name).copied() {
                    collect_named(resolved, names, seen, order);
                }
            }
        }
        // Durations and decimals map to crate types; no item to emit.
        _ => {}
    }
}

/// A copy of `schema` whose leading references are expanded so the emitted
/// `get_schema` text parses on its own. Named types already defined within
/// the copy collapse back into references.
fn self_contained(schema: &Schema, names: &NamesRef, defined: &mut HashSet<Name>) -> Schema {
    match schema {
        Schema::Ref { name } => {
            if defined.contains(name) {
                schema.clone()
            } else {
                match names.get(name) {
                    Some(resolved) => self_contained(resolved, names, defined),
                    None => schema.clone(),
                }
            }
        }
        Schema::Record(record) => {
            if defined.contains(&record.name) {
                return Schema::Ref {
                    name: record.name.clone(),
                };
            }
            defined.insert(record.name.clone());
            let fields = record
                .fields
                .iter()
                .map(|field| RecordField {
                    schema: self_contained(&field.schema, names, defined),
                    ..field.clone()
                })
                .collect();
            Schema::Record(RecordSchema {
                fields,
                ..record.clone()
            })
        }
        Schema::Enum(EnumSchema { name, .. })
        | Schema::Fixed(FixedSchema { name, .. })
        | Schema::Duration(FixedSchema { name, .. }) => {
            if defined.contains(name) {
                Schema::Ref { name: name.clone() }
            } else {
                defined.insert(name.clone());
                schema.clone()
            }
        }
        Schema::Array(inner) => Schema::array(self_contained(inner, names, defined)),
        Schema::Map(inner) => Schema::map(self_contained(inner, names, defined)),
        Schema::Union(UnionSchema { schemas }) => Schema::Union(UnionSchema {
            schemas: schemas
                .iter()
                .map(|branch| self_contained(branch, names, defined))
                .collect(),
        }),
        Schema::Decimal(DecimalSchema {
            precision,
            scale,
            inner,
        }) => Schema::Decimal(DecimalSchema {
            precision: *precision,
            scale: *scale,
            inner: Box::new(self_contained(inner, names, defined)),
        }),
        _ => schema.clone(),
    }
}

fn push_doc(doc: &Option<String>, indent: &str, out: &mut String) {
    if let Some(doc) = doc {
        for line in doc.lines() {
            out.push_str(&format!("{indent}/// {line}\n"));
        }
    }
}

fn emit_get_schema(
    node: &Schema,
    names: &NamesRef,
    type_name: &str,
    out: &mut String,
) -> AvroResult<()> {
    let standalone = self_contained(node, names, &mut HashSet::new());
    let json = serde_json::to_string(&standalone).map_err(Error::ConvertSchemaToJson)?;
    out.push_str(&format!("impl AvroSchema for {type_name} {{\n"));
    out.push_str("    fn get_schema() -> Schema {\n");
    out.push_str(&format!(
        "        Schema::parse_str(r##\"{json}\"##).expect(\"embedded schema is valid\")\n"
    ));
    out.push_str("    }\n");
    out.push_str("}\n");
    Ok(())
}

/// The expression converting a typed field value into a `Value`.
fn to_value_expr(schema: &Schema, names: &NamesRef, var: &str) -> String {
    if !has_datum_impl(schema, names) {
        match schema {
            Schema::Decimal(_) => format!("Value::Decimal({var})"),
            _ => var.to_string(),
        }
    } else {
        format!("{var}.into_value()")
    }
}

/// The expression converting a decoded `Value` expression back into the
/// field's type.
fn from_value_expr(schema: &Schema, names: &NamesRef, src: &str) -> String {
    if !has_datum_impl(schema, names) {
        match schema {
            Schema::Decimal(_) => format!(
                "match {src} {{ Value::Decimal(d) => d, other => return Err(Error::SchemaMismatch {{ value: ValueKind::from(&other), schema: SchemaKind::Decimal }}) }}"
            ),
            _ => src.to_string(),
        }
    } else {
        let ty = rust_type(schema, names);
        format!("<{ty} as AvroDatum>::from_value({src})?")
    }
}

fn emit_record(node: &Schema, record: &RecordSchema, names: &NamesRef, out: &mut String) -> AvroResult<()> {
    let type_name = type_ident(&record.name);

    out.push('\n');
    push_doc(&record.doc, "", out);
    out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    out.push_str(&format!("pub struct {type_name} {{\n"));
    for field in &record.fields {
        push_doc(&field.doc, "    ", out);
        let field_ident = sanitize_ident(&field.name);
        let field_type = rust_type(&field.schema, names);
        out.push_str(&format!("    pub {field_ident}: {field_type},\n"));
    }
    out.push_str("}\n\n");

    emit_get_schema(node, names, &type_name, out)?;

    out.push('\n');
    out.push_str(&format!("impl AvroDatum for {type_name} {{\n"));
    out.push_str("    fn into_value(self) -> Value {\n");
    out.push_str("        Value::Record(vec![\n");
    for field in &record.fields {
        let field_ident = sanitize_ident(&field.name);
        let expr = to_value_expr(&field.schema, names, &format!("self.{field_ident}"));
        out.push_str(&format!(
            "            ({:?}.to_string(), {expr}),\n",
            field.name
        ));
    }
    out.push_str("        ])\n");
    out.push_str("    }\n\n");
    out.push_str("    fn from_value(value: Value) -> AvroResult<Self> {\n");
    out.push_str("        match value {\n");
    out.push_str("            Value::Record(fields) => {\n");
    out.push_str(
        "                let mut fields: HashMap<String, Value> = fields.into_iter().collect();\n",
    );
    out.push_str(
        "                let mut field = |name: &str| fields.remove(name).ok_or_else(|| Error::FieldMissing(name.to_string()));\n",
    );
    out.push_str("                Ok(Self {\n");
    for field in &record.fields {
        let field_ident = sanitize_ident(&field.name);
        let src = format!("field({:?})?", field.name);
        let expr = from_value_expr(&field.schema, names, &src);
        out.push_str(&format!("                    {field_ident}: {expr},\n"));
    }
    out.push_str("                })\n");
    out.push_str("            }\n");
    out.push_str(
        "            other => Err(Error::SchemaMismatch { value: ValueKind::from(&other), schema: SchemaKind::Record }),\n",
    );
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n");

    Ok(())
}

fn emit_enum(
    node: &Schema,
    enum_schema: &EnumSchema,
    names: &NamesRef,
    out: &mut String,
) -> AvroResult<()> {
    let type_name = type_ident(&enum_schema.name);

    out.push('\n');
    push_doc(&enum_schema.doc, "", out);
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq)]\n");
    out.push_str(&format!("pub enum {type_name} {{\n"));
    for symbol in &enum_schema.symbols {
        out.push_str(&format!("    {},\n", variant_ident(symbol)));
    }
    out.push_str("}\n\n");

    emit_get_schema(node, names, &type_name, out)?;

    out.push('\n');
    out.push_str(&format!("impl AvroDatum for {type_name} {{\n"));
    out.push_str("    fn into_value(self) -> Value {\n");
    out.push_str("        match self {\n");
    for (ordinal, symbol) in enum_schema.symbols.iter().enumerate() {
        out.push_str(&format!(
            "            {type_name}::{} => Value::Enum({ordinal}, {symbol:?}.to_string()),\n",
            variant_ident(symbol)
        ));
    }
    out.push_str("        }\n");
    out.push_str("    }\n\n");
    out.push_str("    fn from_value(value: Value) -> AvroResult<Self> {\n");
    out.push_str("        let symbol = match value {\n");
    out.push_str("            Value::Enum(_, symbol) => symbol,\n");
    out.push_str("            Value::String(symbol) => symbol,\n");
    out.push_str(
        "            other => return Err(Error::SchemaMismatch { value: ValueKind::from(&other), schema: SchemaKind::Enum }),\n",
    );
    out.push_str("        };\n");
    out.push_str("        match symbol.as_str() {\n");
    for symbol in &enum_schema.symbols {
        out.push_str(&format!(
            "            {symbol:?} => Ok({type_name}::{}),\n",
            variant_ident(symbol)
        ));
    }
    out.push_str("            _ => Err(Error::UnknownEnumSymbol(symbol)),\n");
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n");

    Ok(())
}

fn emit_fixed(
    node: &Schema,
    fixed: &FixedSchema,
    names: &NamesRef,
    out: &mut String,
) -> AvroResult<()> {
    let type_name = type_ident(&fixed.name);
    let size = fixed.size;

    out.push('\n');
    push_doc(&fixed.doc, "", out);
    out.push_str("#[derive(Debug, Clone, PartialEq, Eq)]\n");
    out.push_str(&format!("pub struct {type_name}(pub [u8; {size}]);\n\n"));

    emit_get_schema(node, names, &type_name, out)?;

    out.push('\n');
    out.push_str(&format!("impl AvroDatum for {type_name} {{\n"));
    out.push_str("    fn into_value(self) -> Value {\n");
    out.push_str(&format!(
        "        Value::Fixed({size}, self.0.to_vec())\n"
    ));
    out.push_str("    }\n\n");
    out.push_str("    fn from_value(value: Value) -> AvroResult<Self> {\n");
    out.push_str("        match value {\n");
    out.push_str(&format!(
        "            Value::Fixed({size}, bytes) => bytes\n"
    ));
    out.push_str("                .try_into()\n");
    out.push_str("                .map(Self)\n");
    out.push_str(&format!(
        "                .map_err(|bytes: Vec<u8>| Error::FixedSizeMismatch {{ expected: {size}, actual: bytes.len() }}),\n"
    ));
    out.push_str(
        "            other => Err(Error::SchemaMismatch { value: ValueKind::from(&other), schema: SchemaKind::Fixed }),\n",
    );
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const SENSOR_SCHEMA: &str = r#"
    {
        "type": "record",
        "name": "sensors.SensorReading",
        "doc": "One reading from one sensor.",
        "fields": [
            {"name": "sensor_id", "type": "long"},
            {"name": "temp", "type": "double", "doc": "degrees Celsius"},
            {"name": "label", "type": ["null", "string"]},
            {"name": "type", "type": {"type": "enum", "name": "Kind", "symbols": ["indoor", "outdoor"]}},
            {"name": "checksum", "type": {"type": "fixed", "name": "Md5", "size": 16}}
        ]
    }
    "#;

    #[test]
    fn test_emit_struct_shape() -> TestResult {
        let schema = Schema::parse_str(SENSOR_SCHEMA)?;
        let source = emit(&schema)?;

        // Namespace stripped, short name kept.
        assert!(source.contains("pub struct SensorReading {"));
        assert!(source.contains("pub sensor_id: i64,"));
        assert!(source.contains("pub temp: f64,"));
        assert!(source.contains("pub label: Option<String>,"));
        // Reserved word suffixed, original name kept on the wire.
        assert!(source.contains("pub type_: Kind,"));
        assert!(source.contains("(\"type\".to_string(), self.type_.into_value()),"));
        assert!(source.contains("pub struct Md5(pub [u8; 16]);"));
        // Docs become comments.
        assert!(source.contains("/// One reading from one sensor."));
        assert!(source.contains("/// degrees Celsius"));
        Ok(())
    }

    #[test]
    fn test_emit_dependency_order() -> TestResult {
        let schema = Schema::parse_str(SENSOR_SCHEMA)?;
        let source = emit(&schema)?;
        let kind_pos = source.find("pub enum Kind").expect("Kind emitted");
        let md5_pos = source.find("pub struct Md5").expect("Md5 emitted");
        let record_pos = source
            .find("pub struct SensorReading")
            .expect("SensorReading emitted");
        assert!(kind_pos < record_pos);
        assert!(md5_pos < record_pos);
        Ok(())
    }

    #[test]
    fn test_emit_module_wraps_and_indents() -> TestResult {
        let schema = Schema::parse_str(SENSOR_SCHEMA)?;
        let source = emit_module(&schema, "sensors")?;
        assert!(source.starts_with("pub mod sensors {"));
        assert!(source.contains("    pub struct SensorReading {"));
        assert!(source.trim_end().ends_with('}'));
        Ok(())
    }

    #[test]
    fn test_embedded_schema_round_trips() -> TestResult {
        let schema = Schema::parse_str(SENSOR_SCHEMA)?;
        let source = emit(&schema)?;

        // The embedded JSON between r##" and "## must reparse to the schema.
        let start = source.find("r##\"").expect("embedded schema") + 4;
        let end = source[start..].find("\"##").expect("terminator") + start;
        // The record is emitted last, so take the last embedded schema.
        let mut json = &source[start..end];
        let mut search = end;
        while let Some(next) = source[search..].find("r##\"") {
            let s = search + next + 4;
            let e = source[s..].find("\"##").expect("terminator") + s;
            json = &source[s..e];
            search = e;
        }
        let reparsed = Schema::parse_str(json)?;
        assert_eq!(reparsed, schema);
        Ok(())
    }

    #[test]
    fn test_sanitize_ident() {
        assert_eq!(sanitize_ident("plain"), "plain");
        assert_eq!(sanitize_ident("with-dash"), "with_dash");
        assert_eq!(sanitize_ident("3rd"), "_3rd");
        assert_eq!(sanitize_ident("type"), "type_");
        assert_eq!(sanitize_ident("match"), "match_");
    }

    #[test]
    fn test_recursive_schema_emits() -> TestResult {
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
        let source = emit(&schema)?;
        assert!(source.contains("pub struct LongList {"));
        assert!(source.contains("pub next: Option<Box<LongList>>,"));
        Ok(())
    }
}
