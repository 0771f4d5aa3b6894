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

//! Round-trip, size-consistency and skip-consistency properties of the
//! binary codec.

use avrolite::{
    Days, Decimal, Duration, Millis, Months, Schema, Uuid, encoded_size, from_avro_datum,
    from_avro_datum_typed, skip, to_avro_datum, to_avro_datum_typed, types::Value,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const EVERYTHING_SCHEMA: &str = r#"
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
        {"name": "u", "type": ["null", "string"]},
        {"name": "dec", "type": {"type": "bytes", "logicalType": "decimal", "precision": 9, "scale": 2}},
        {"name": "id", "type": {"type": "string", "logicalType": "uuid"}},
        {"name": "day", "type": {"type": "int", "logicalType": "date"}},
        {"name": "ts", "type": {"type": "long", "logicalType": "timestamp-micros"}},
        {"name": "dur", "type": {"type": "fixed", "name": "span", "size": 12, "logicalType": "duration"}}
    ]
}
"#;

fn everything_value() -> Value {
    let mut map = HashMap::new();
    map.insert("k1".to_string(), Value::from("v1"));
    Value::Record(vec![
        ("b".to_string(), Value::Boolean(true)),
        ("i".to_string(), Value::Int(-34)),
        ("l".to_string(), Value::Long(1_000_000)),
        ("f".to_string(), Value::Float(1.5)),
        ("d".to_string(), Value::Double(-2.25)),
        ("s".to_string(), Value::from("hello")),
        ("by".to_string(), Value::Bytes(vec![0, 1, 2, 255])),
        ("fx".to_string(), Value::Fixed(4, vec![9, 8, 7, 6])),
        ("e".to_string(), Value::Enum(1, "blue".to_string())),
        (
            "a".to_string(),
            Value::Array(vec![Value::Long(-1), Value::Long(0), Value::Long(1)]),
        ),
        ("m".to_string(), Value::Map(map)),
        ("u".to_string(), Value::Union(1, Box::new(Value::from("x")))),
        ("dec".to_string(), Value::Decimal(Decimal::from([0x03, 0x09]))),
        (
            "id".to_string(),
            Value::Uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap()),
        ),
        ("day".to_string(), Value::Date(19_000)),
        ("ts".to_string(), Value::TimestampMicros(1_700_000_000_000_000)),
        (
            "dur".to_string(),
            Value::Duration(Duration::new(
                Months::new(1),
                Days::new(15),
                Millis::new(500),
            )),
        ),
    ])
}

#[test]
fn wire_format_goldens() -> TestResult {
    assert_eq!(to_avro_datum_typed(true)?, [0x01]);
    assert_eq!(to_avro_datum_typed(false)?, [0x00]);

    assert_eq!(to_avro_datum_typed(1i64)?, [0x02]);
    assert_eq!(to_avro_datum_typed(63i64)?, [0x7e]);
    assert_eq!(to_avro_datum_typed(64i64)?, [0x80, 0x01]);
    assert_eq!(to_avro_datum_typed(-1i64)?, [0x01]);
    assert_eq!(to_avro_datum_typed(-65i64)?, [0x81, 0x01]);

    let text = to_avro_datum_typed("hey there stranger".to_string())?;
    assert_eq!(text.len(), 19);
    assert_eq!(text[0], 0x24);
    assert_eq!(&text[1..], b"hey there stranger");

    assert_eq!(to_avro_datum_typed(())?, Vec::<u8>::new());
    Ok(())
}

#[test]
fn sensor_record_golden() -> TestResult {
    let schema = Schema::parse_str(
        r#"
        {
            "type": "record",
            "name": "reading",
            "fields": [
                {"name": "sensor_id", "type": "long"},
                {"name": "temp", "type": "double"},
                {"name": "label", "type": ["null", "string"]}
            ]
        }
        "#,
    )?;
    let value = Value::Record(vec![
        ("sensor_id".to_string(), Value::Long(42)),
        ("temp".to_string(), Value::Double(21.5)),
        ("label".to_string(), Value::from("normal")),
    ]);

    let mut expected = vec![0x54];
    expected.extend_from_slice(&21.5f64.to_le_bytes());
    expected.push(0x02);
    expected.push(0x0c);
    expected.extend_from_slice(b"normal");

    assert_eq!(to_avro_datum(&schema, value)?, expected);
    Ok(())
}

#[test]
fn universal_round_trip() -> TestResult {
    let schema = Schema::parse_str(EVERYTHING_SCHEMA)?;
    let value = everything_value();

    let bytes = to_avro_datum(&schema, value.clone())?;
    let decoded = from_avro_datum(&schema, &mut &bytes[..])?;
    assert_eq!(decoded, value);
    Ok(())
}

#[test]
fn size_equals_write_length() -> TestResult {
    let schema = Schema::parse_str(EVERYTHING_SCHEMA)?;
    let value = everything_value();
    let bytes = to_avro_datum(&schema, value.clone())?;
    assert_eq!(encoded_size(&value, &schema)?, bytes.len());

    for (value, schema) in [
        (Value::Null, Schema::Null),
        (Value::Boolean(false), Schema::Boolean),
        (Value::Long(i64::MIN), Schema::Long),
        (Value::Long(i64::MAX), Schema::Long),
        (Value::from("🦀 crab"), Schema::String),
        (Value::Array(vec![]), Schema::array(Schema::Long)),
    ] {
        let bytes = to_avro_datum(&schema, value.clone())?;
        assert_eq!(encoded_size(&value, &schema)?, bytes.len(), "{value:?}");
    }
    Ok(())
}

#[test]
fn skip_advances_exactly_one_value() -> TestResult {
    let schema = Schema::parse_str(EVERYTHING_SCHEMA)?;
    let bytes = to_avro_datum(&schema, everything_value())?;
    assert_eq!(skip(&schema, &bytes, 0)?, bytes.len());

    // With a second value appended, skip lands exactly on its start.
    let mut two = bytes.clone();
    two.extend_from_slice(&bytes);
    let mid = skip(&schema, &two, 0)?;
    assert_eq!(mid, bytes.len());
    assert_eq!(skip(&schema, &two, mid)?, two.len());
    Ok(())
}

#[test]
fn typed_round_trip() -> TestResult {
    let values = vec![1i64, -1, 1 << 40];
    let bytes = to_avro_datum_typed(values.clone())?;
    let back: Vec<i64> = from_avro_datum_typed(&mut &bytes[..])?;
    assert_eq!(back, values);

    let value: Option<String> = Some("maybe".to_string());
    let bytes = to_avro_datum_typed(value.clone())?;
    let back: Option<String> = from_avro_datum_typed(&mut &bytes[..])?;
    assert_eq!(back, value);

    let mut map = HashMap::new();
    map.insert("answer".to_string(), 42i32);
    let bytes = to_avro_datum_typed(map.clone())?;
    let back: HashMap<String, i32> = from_avro_datum_typed(&mut &bytes[..])?;
    assert_eq!(back, map);
    Ok(())
}

#[test]
fn truncation_never_panics() -> TestResult {
    let schema = Schema::parse_str(EVERYTHING_SCHEMA)?;
    let bytes = to_avro_datum(&schema, everything_value())?;

    for len in 0..bytes.len() {
        let truncated = &bytes[..len];
        assert!(
            from_avro_datum(&schema, &mut &*truncated).is_err(),
            "decoding a truncation at {len} should fail"
        );
        assert!(
            skip(&schema, truncated, 0).is_err(),
            "skipping a truncation at {len} should fail"
        );
    }
    Ok(())
}

#[test]
fn corruption_fails_cleanly_or_decodes() -> TestResult {
    let schema = Schema::parse_str(EVERYTHING_SCHEMA)?;
    let bytes = to_avro_datum(&schema, everything_value())?;

    for i in 0..bytes.len() {
        for flip in [0x01u8, 0x80] {
            let mut corrupted = bytes.clone();
            corrupted[i] ^= flip;
            // Either a clean decode of something else, or a defined error.
            // The decoder must never read past the end of the input.
            let _ = from_avro_datum(&schema, &mut &corrupted[..]);
            let _ = skip(&schema, &corrupted, 0);
        }
    }
    Ok(())
}
