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

//! Object container file properties: round-trips across every codec, the
//! random-access table view, and framing corruption handling.

use avrolite::{
    Codec, Error, Reader, Schema, Writer, encode_to_vec, read_table, types::Record,
    types::Value, write_table,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::io::Cursor;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const ABC_SCHEMA: &str = r#"
{
    "type": "record",
    "name": "abc",
    "fields": [
        {"name": "a", "type": "long"},
        {"name": "b", "type": "long"},
        {"name": "c", "type": "long"}
    ]
}
"#;

fn all_codecs() -> Vec<Codec> {
    let mut codecs = vec![Codec::Null, Codec::Deflate];
    #[cfg(feature = "bzip")]
    codecs.push(Codec::Bzip2);
    #[cfg(feature = "xz")]
    codecs.push(Codec::Xz);
    #[cfg(feature = "zstandard")]
    codecs.push(Codec::Zstandard);
    codecs
}

fn abc_row(schema: &Schema) -> Value {
    let mut record = Record::new(schema).expect("record schema");
    record.put("a", 1i64);
    record.put("b", 2i64);
    record.put("c", 3i64);
    record.into()
}

#[test]
fn round_trip_across_all_codecs() -> TestResult {
    let schema = Schema::parse_str(ABC_SCHEMA)?;
    for codec in all_codecs() {
        let rows = vec![abc_row(&schema); 3];
        let bytes = write_table(Vec::new(), &schema, rows.clone(), codec)?;

        let mut table = read_table(Cursor::new(&bytes))?;
        assert_eq!(table.len()?, 3, "codec {codec:?}");
        let read_rows = table.rows()?.collect::<Result<Vec<_>, _>>()?;
        assert_eq!(read_rows, rows, "codec {codec:?}");

        let stream_rows = Reader::new(&bytes[..])?.collect::<Result<Vec<_>, _>>()?;
        assert_eq!(stream_rows, rows, "codec {codec:?}");
    }
    Ok(())
}

#[test]
fn embedded_schema_survives_the_trip() -> TestResult {
    let schema = Schema::parse_str(ABC_SCHEMA)?;
    let bytes = write_table(Vec::new(), &schema, vec![abc_row(&schema)], Codec::Null)?;
    let reader = Reader::new(&bytes[..])?;
    assert_eq!(reader.writer_schema(), &schema);
    Ok(())
}

#[test]
fn row_at_addresses_across_blocks() -> TestResult {
    let schema = Schema::parse_str(ABC_SCHEMA)?;
    let mut writer = Writer::builder(&schema, Vec::new())
        .block_size(4) // a few rows per block
        .codec(Codec::Deflate)
        .build()?;
    for i in 0..100i64 {
        let mut record = Record::new(&schema).expect("record schema");
        record.put("a", i);
        record.put("b", i * 2);
        record.put("c", i * 3);
        writer.append(record)?;
    }
    let bytes = writer.into_inner()?;

    let mut table = read_table(Cursor::new(bytes))?;
    assert_eq!(table.len()?, 100);
    for i in [99usize, 0, 42, 43, 7] {
        let row = table.row_at(i)?;
        assert_eq!(
            row,
            Value::Record(vec![
                ("a".to_string(), Value::Long(i as i64)),
                ("b".to_string(), Value::Long(i as i64 * 2)),
                ("c".to_string(), Value::Long(i as i64 * 3)),
            ]),
            "row {i}"
        );
    }
    Ok(())
}

#[test]
fn user_metadata_round_trips() -> TestResult {
    let schema = Schema::parse_str(ABC_SCHEMA)?;
    let mut writer = Writer::new(&schema, Vec::new())?;
    writer.add_user_metadata("origin".to_string(), b"sensor-7")?;
    writer.append(abc_row(&schema))?;
    let bytes = writer.into_inner()?;

    let reader = Reader::new(&bytes[..])?;
    assert_eq!(
        reader.user_metadata().get("origin"),
        Some(&b"sensor-7".to_vec())
    );
    Ok(())
}

#[test]
fn sync_marker_can_be_supplied() -> TestResult {
    let schema = Schema::parse_str(ABC_SCHEMA)?;
    let marker = *b"0123456789abcdef";
    let mut writer = Writer::builder(&schema, Vec::new()).marker(marker).build()?;
    writer.append(abc_row(&schema))?;
    let bytes = writer.into_inner()?;
    assert_eq!(&bytes[bytes.len() - 16..], marker);
    Ok(())
}

#[test]
fn unknown_codec_is_rejected() -> TestResult {
    let mut bytes = b"Obj\x01".to_vec();
    let mut metadata = HashMap::new();
    metadata.insert(
        "avro.schema".to_string(),
        Value::Bytes(br#""long""#.to_vec()),
    );
    metadata.insert("avro.codec".to_string(), Value::Bytes(b"lzo".to_vec()));
    bytes.extend(encode_to_vec(
        &Value::Map(metadata),
        &Schema::map(Schema::Bytes),
    )?);
    bytes.extend([0u8; 16]);

    match Reader::new(&bytes[..]) {
        Err(Error::UnknownCodec(name)) => assert_eq!(name, "lzo"),
        other => panic!("expected UnknownCodec, got {other:?}"),
    }
    Ok(())
}

#[test]
fn bad_magic_is_rejected() {
    match Reader::new(&b"PAR1morebytes"[..]) {
        Err(Error::BadMagic(_)) => {}
        other => panic!("expected BadMagic, got {other:?}"),
    }
}

#[test]
fn corrupt_sync_marker_is_detected() -> TestResult {
    let schema = Schema::parse_str(ABC_SCHEMA)?;
    let mut bytes = write_table(Vec::new(), &schema, vec![abc_row(&schema)], Codec::Null)?;
    let len = bytes.len();
    bytes[len - 3] ^= 0xAA;

    let result: Result<Vec<_>, _> = Reader::new(&bytes[..])?.collect();
    match result {
        Err(Error::CorruptSync) => {}
        other => panic!("expected CorruptSync, got {other:?}"),
    }

    // The table scanner verifies the framing too.
    let mut table = read_table(Cursor::new(bytes))?;
    match table.len() {
        Err(Error::CorruptSync) => {}
        other => panic!("expected CorruptSync, got {other:?}"),
    }
    Ok(())
}

#[test]
fn truncated_block_is_detected() -> TestResult {
    let schema = Schema::parse_str(ABC_SCHEMA)?;
    let bytes = write_table(Vec::new(), &schema, vec![abc_row(&schema)], Codec::Null)?;

    // Cut into the final block's payload and marker.
    for cut in [1usize, 8, 16] {
        let truncated = &bytes[..bytes.len() - cut];
        let result: Result<Vec<_>, _> = Reader::new(truncated)?.collect();
        match result {
            Err(Error::Truncated(_)) => {}
            other => panic!("expected Truncated at cut {cut}, got {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn empty_container_has_no_rows() -> TestResult {
    let schema = Schema::parse_str(ABC_SCHEMA)?;
    let bytes = write_table(Vec::new(), &schema, Vec::<Value>::new(), Codec::Null)?;

    let rows: Vec<_> = Reader::new(&bytes[..])?.collect();
    assert!(rows.is_empty());

    let mut table = read_table(Cursor::new(bytes))?;
    assert_eq!(table.len()?, 0);
    assert!(table.is_empty()?);
    Ok(())
}
