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

//! Logic handling writing in Avro format at user level.

use crate::{
    AvroResult, Codec,
    bridge::AvroDatum,
    encode::{encode_internal, encoded_size_internal},
    error::Error,
    schema::{Names, ResolvedSchema, Schema, resolve_names},
    types::Value,
    util::zig_i64,
};
use std::{collections::HashMap, io::Write};

/// Soft cap on a block's uncompressed buffer before it is flushed.
const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;
const AVRO_OBJECT_HEADER: &[u8] = b"Obj\x01";

/// Main interface for writing Avro object container files.
///
/// Values are buffered into blocks; a block is flushed once its uncompressed
/// size passes the configured soft cap, and [`flush`](Writer::flush) or
/// [`into_inner`](Writer::into_inner) emit any partial block. A `Writer`
/// that is dropped without flushing leaves a truncated container behind.
pub struct Writer<'a, W: Write> {
    schema: &'a Schema,
    writer: W,
    names: Names,
    codec: Codec,
    block_size: usize,
    buffer: Vec<u8>,
    num_values: usize,
    marker: [u8; 16],
    has_header: bool,
    user_metadata: HashMap<String, Vec<u8>>,
}

/// Configures and builds a [`Writer`].
pub struct WriterBuilder<'a, W: Write> {
    schema: &'a Schema,
    writer: W,
    codec: Codec,
    block_size: usize,
    marker: Option<[u8; 16]>,
    has_header: bool,
}

impl<'a, W: Write> WriterBuilder<'a, W> {
    /// Set the compression codec. Defaults to `Codec::Null`.
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the soft cap, in uncompressed bytes, after which a block is
    /// flushed. Defaults to 64 KiB.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Supply the 16-byte sync marker instead of generating a random one.
    pub fn marker(mut self, marker: [u8; 16]) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Declare that the header was already written, to append blocks to an
    /// existing container. The marker must be the container's.
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn build(self) -> AvroResult<Writer<'a, W>> {
        let mut names = Names::new();
        resolve_names(self.schema, &mut names)?;
        Ok(Writer {
            schema: self.schema,
            writer: self.writer,
            names,
            codec: self.codec,
            block_size: self.block_size,
            buffer: Vec::with_capacity(self.block_size),
            num_values: 0,
            marker: self.marker.unwrap_or_else(generate_sync_marker),
            has_header: self.has_header,
            user_metadata: HashMap::new(),
        })
    }
}

impl<'a, W: Write> Writer<'a, W> {
    /// Creates a `WriterBuilder` for a `Schema` and something implementing
    /// the `io::Write` trait to write to.
    pub fn builder(schema: &'a Schema, writer: W) -> WriterBuilder<'a, W> {
        WriterBuilder {
            schema,
            writer,
            codec: Codec::Null,
            block_size: DEFAULT_BLOCK_SIZE,
            marker: None,
            has_header: false,
        }
    }

    /// Creates a `Writer` given a `Schema` and something implementing the
    /// `io::Write` trait to write to. No compression `Codec` will be used.
    pub fn new(schema: &'a Schema, writer: W) -> AvroResult<Self> {
        Writer::with_codec(schema, writer, Codec::Null)
    }

    /// Creates a `Writer` with a specific `Codec` given a `Schema` and
    /// something implementing the `io::Write` trait to write to.
    pub fn with_codec(schema: &'a Schema, writer: W, codec: Codec) -> AvroResult<Self> {
        Self::builder(schema, writer).codec(codec).build()
    }

    /// Creates a `Writer` that will append values to an already populated
    /// `std::io::Write` using the provided `marker`.
    pub fn append_to(schema: &'a Schema, writer: W, marker: [u8; 16]) -> AvroResult<Self> {
        Self::builder(schema, writer)
            .marker(marker)
            .has_header(true)
            .build()
    }

    /// Get a reference to the `Schema` associated to a `Writer`.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Get the sync marker this `Writer` frames blocks with.
    pub fn sync_marker(&self) -> &[u8; 16] {
        &self.marker
    }

    /// Append a value to the `Writer`.
    ///
    /// Returns the number of bytes actually written to the sink, which is 0
    /// until a block fills up or is flushed.
    pub fn append<T: Into<Value>>(&mut self, value: T) -> AvroResult<usize> {
        let value = value.into();
        self.append_value_ref(&value)
    }

    /// Append a typed datum to the `Writer`.
    pub fn append_datum<T: AvroDatum>(&mut self, datum: T) -> AvroResult<usize> {
        self.append_value_ref(&datum.into_value())
    }

    /// Append a value to the `Writer` by reference.
    ///
    /// Returns the number of bytes actually written to the sink, which is 0
    /// until a block fills up or is flushed.
    pub fn append_value_ref(&mut self, value: &Value) -> AvroResult<usize> {
        let n = self.maybe_write_header()?;

        // A failed encode must not leave half a row in the block buffer.
        let start = self.buffer.len();
        if let Err(e) = encode_internal(value, self.schema, &self.names, &mut self.buffer) {
            self.buffer.truncate(start);
            return Err(e);
        }
        self.num_values += 1;

        if self.buffer.len() >= self.block_size {
            return self.flush().map(|b| b + n);
        }

        Ok(n)
    }

    /// Extend a `Writer` with an `Iterator` of values.
    ///
    /// This function forces the written data to be flushed.
    pub fn extend<I, T: Into<Value>>(&mut self, values: I) -> AvroResult<usize>
    where
        I: IntoIterator<Item = T>,
    {
        let mut num_bytes = 0;
        for value in values {
            num_bytes += self.append(value)?;
        }
        num_bytes += self.flush()?;
        Ok(num_bytes)
    }

    /// Flush the buffered block, if any, to the inner writer.
    ///
    /// Returns the number of bytes written.
    pub fn flush(&mut self) -> AvroResult<usize> {
        let mut num_bytes = self.maybe_write_header()?;
        if self.num_values == 0 {
            return Ok(num_bytes);
        }

        self.codec.compress(&mut self.buffer)?;

        let mut block_header = Vec::with_capacity(20);
        zig_i64(self.num_values as i64, &mut block_header)?;
        zig_i64(self.buffer.len() as i64, &mut block_header)?;

        self.writer
            .write_all(&block_header)
            .map_err(Error::WriteBytes)?;
        self.writer.write_all(&self.buffer).map_err(Error::WriteBytes)?;
        self.writer.write_all(&self.marker).map_err(Error::WriteBytes)?;
        num_bytes += block_header.len() + self.buffer.len() + self.marker.len();

        self.buffer.clear();
        self.num_values = 0;

        self.writer.flush().map_err(Error::FlushWriter)?;

        Ok(num_bytes)
    }

    /// Return what the `Writer` is writing to, consuming the `Writer` itself
    /// after flushing any buffered data.
    pub fn into_inner(mut self) -> AvroResult<W> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Adds custom metadata to the file, before the first value is written.
    /// Keys under the `avro.` prefix are reserved for the container itself.
    pub fn add_user_metadata<T: AsRef<[u8]>>(&mut self, key: String, value: T) -> AvroResult<()> {
        if self.has_header {
            Err(Error::FileHeaderAlreadyWritten)
        } else if key.starts_with("avro.") {
            Err(Error::InvalidMetadataKey(key))
        } else {
            self.user_metadata.insert(key, value.as_ref().to_vec());
            Ok(())
        }
    }

    /// Create the container header: magic, metadata map and sync marker.
    fn header(&self) -> AvroResult<Vec<u8>> {
        let schema_json = serde_json::to_string(self.schema).map_err(Error::ConvertSchemaToJson)?;

        let mut metadata: HashMap<String, Value> = HashMap::with_capacity(2);
        metadata.insert(
            "avro.schema".to_string(),
            Value::Bytes(schema_json.into_bytes()),
        );
        metadata.insert(
            "avro.codec".to_string(),
            Value::Bytes(<&str>::from(self.codec).as_bytes().to_vec()),
        );
        for (key, value) in &self.user_metadata {
            metadata.insert(key.clone(), Value::Bytes(value.clone()));
        }

        let mut header = Vec::new();
        header.extend_from_slice(AVRO_OBJECT_HEADER);
        let meta_schema = Schema::map(Schema::Bytes);
        encode_internal(
            &Value::Map(metadata),
            &meta_schema,
            &self.names,
            &mut header,
        )?;
        header.extend_from_slice(&self.marker);

        Ok(header)
    }

    fn maybe_write_header(&mut self) -> AvroResult<usize> {
        if self.has_header {
            Ok(0)
        } else {
            let header = self.header()?;
            self.writer.write_all(&header).map_err(Error::WriteBytes)?;
            self.has_header = true;
            Ok(header.len())
        }
    }
}

/// Write a whole row sequence as an object container, returning the sink.
pub fn write_table<W: Write, I>(
    sink: W,
    schema: &Schema,
    rows: I,
    codec: Codec,
) -> AvroResult<W>
where
    I: IntoIterator<Item = Value>,
{
    let mut writer = Writer::with_codec(schema, sink, codec)?;
    writer.extend(rows)?;
    writer.into_inner()
}

/// Encode a single `Value` to standalone Avro bytes, outside any container.
///
/// The byte length is computed in a pre-pass so the buffer is allocated
/// exactly once.
pub fn to_avro_datum<T: Into<Value>>(schema: &Schema, value: T) -> AvroResult<Vec<u8>> {
    let value = value.into();
    let rs = ResolvedSchema::try_from(schema)?;
    let size = encoded_size_internal(&value, schema, rs.get_names())?;
    let mut buffer = Vec::with_capacity(size);
    encode_internal(&value, schema, rs.get_names(), &mut buffer)?;
    debug_assert_eq!(buffer.len(), size, "size pre-pass disagrees with encoder");
    Ok(buffer)
}

/// Encode a typed datum to standalone Avro bytes, deriving the schema from
/// the type.
pub fn to_avro_datum_typed<T: AvroDatum>(datum: T) -> AvroResult<Vec<u8>> {
    to_avro_datum(&T::get_schema(), datum.into_value())
}

/// Encode a dynamic value against its own derived schema.
///
/// Only shapes [`Value::derive_schema`] can name a schema for are accepted.
pub fn to_avro_datum_derived(value: Value) -> AvroResult<Vec<u8>> {
    let schema = value.derive_schema()?;
    to_avro_datum(&schema, value)
}

fn generate_sync_marker() -> [u8; 16] {
    rand::random()
}
