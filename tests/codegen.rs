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

//! The code generator's output shape, and an end-to-end check that a type of
//! the emitted shape round-trips through the codec.

use avrolite::{
    AvroDatum, AvroResult, AvroSchema, Error, Schema, codegen,
    from_avro_datum_typed,
    schema::SchemaKind,
    to_avro_datum_typed,
    types::{Value, ValueKind},
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const SENSOR_SCHEMA: &str = r#"
{
    "type": "record",
    "name": "sensors.SensorReading",
    "fields": [
        {"name": "sensor_id", "type": "long"},
        {"name": "temp", "type": "double"},
        {"name": "label", "type": ["null", "string"]},
        {"name": "kind", "type": {"type": "enum", "name": "Kind", "symbols": ["indoor", "outdoor"]}}
    ]
}
"#;

#[test]
fn emitted_source_is_complete() -> TestResult {
    let schema = Schema::parse_str(SENSOR_SCHEMA)?;
    let source = codegen::emit(&schema)?;

    assert!(source.contains("pub enum Kind {"));
    assert!(source.contains("pub struct SensorReading {"));
    assert!(source.contains("impl AvroSchema for SensorReading {"));
    assert!(source.contains("impl AvroDatum for SensorReading {"));
    assert!(source.contains("impl AvroSchema for Kind {"));
    assert!(source.contains("impl AvroDatum for Kind {"));
    Ok(())
}

#[test]
fn emit_module_namespaces_the_output() -> TestResult {
    let schema = Schema::parse_str(SENSOR_SCHEMA)?;
    let source = codegen::emit_module(&schema, "sensor-types")?;
    assert!(source.starts_with("pub mod sensor_types {"));
    Ok(())
}

// The hand-expanded equivalent of the emitted code for SENSOR_SCHEMA. The
// shape below mirrors the generator's output so the bridge path the emitted
// code takes is exercised without runtime compilation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Indoor,
    Outdoor,
}

impl AvroSchema for Kind {
    fn get_schema() -> Schema {
        Schema::parse_str(r##"{"type":"enum","name":"Kind","symbols":["indoor","outdoor"]}"##)
            .expect("embedded schema is valid")
    }
}

impl AvroDatum for Kind {
    fn into_value(self) -> Value {
        match self {
            Kind::Indoor => Value::Enum(0, "indoor".to_string()),
            Kind::Outdoor => Value::Enum(1, "outdoor".to_string()),
        }
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        let symbol = match value {
            Value::Enum(_, symbol) => symbol,
            Value::String(symbol) => symbol,
            other => {
                return Err(Error::SchemaMismatch {
                    value: ValueKind::from(&other),
                    schema: SchemaKind::Enum,
                });
            }
        };
        match symbol.as_str() {
            "indoor" => Ok(Kind::Indoor),
            "outdoor" => Ok(Kind::Outdoor),
            _ => Err(Error::UnknownEnumSymbol(symbol)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub sensor_id: i64,
    pub temp: f64,
    pub label: Option<String>,
    pub kind: Kind,
}

impl AvroSchema for SensorReading {
    fn get_schema() -> Schema {
        Schema::parse_str(SENSOR_SCHEMA).expect("embedded schema is valid")
    }
}

impl AvroDatum for SensorReading {
    fn into_value(self) -> Value {
        Value::Record(vec![
            ("sensor_id".to_string(), self.sensor_id.into_value()),
            ("temp".to_string(), self.temp.into_value()),
            ("label".to_string(), self.label.into_value()),
            ("kind".to_string(), self.kind.into_value()),
        ])
    }

    fn from_value(value: Value) -> AvroResult<Self> {
        match value {
            Value::Record(fields) => {
                let mut fields: HashMap<String, Value> = fields.into_iter().collect();
                let mut field = |name: &str| {
                    fields
                        .remove(name)
                        .ok_or_else(|| Error::FieldMissing(name.to_string()))
                };
                Ok(Self {
                    sensor_id: <i64 as AvroDatum>::from_value(field("sensor_id")?)?,
                    temp: <f64 as AvroDatum>::from_value(field("temp")?)?,
                    label: <Option<String> as AvroDatum>::from_value(field("label")?)?,
                    kind: <Kind as AvroDatum>::from_value(field("kind")?)?,
                })
            }
            other => Err(Error::SchemaMismatch {
                value: ValueKind::from(&other),
                schema: SchemaKind::Record,
            }),
        }
    }
}

#[test]
fn generated_shape_round_trips() -> TestResult {
    let reading = SensorReading {
        sensor_id: 42,
        temp: 21.5,
        label: Some("normal".to_string()),
        kind: Kind::Outdoor,
    };
    let bytes = to_avro_datum_typed(reading.clone())?;
    let back: SensorReading = from_avro_datum_typed(&mut &bytes[..])?;
    assert_eq!(back, reading);
    Ok(())
}

#[test]
fn generated_shape_matches_the_dynamic_wire_format() -> TestResult {
    let reading = SensorReading {
        sensor_id: 42,
        temp: 21.5,
        label: Some("normal".to_string()),
        kind: Kind::Indoor,
    };
    let typed_bytes = to_avro_datum_typed(reading)?;

    let schema = Schema::parse_str(SENSOR_SCHEMA)?;
    let dynamic = Value::Record(vec![
        ("sensor_id".to_string(), Value::Long(42)),
        ("temp".to_string(), Value::Double(21.5)),
        ("label".to_string(), Value::from("normal")),
        ("kind".to_string(), Value::Enum(0, "indoor".to_string())),
    ]);
    let dynamic_bytes = avrolite::to_avro_datum(&schema, dynamic)?;

    assert_eq!(typed_bytes, dynamic_bytes);
    Ok(())
}
