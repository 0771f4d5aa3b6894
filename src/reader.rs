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

//! Logic handling reading from Avro format at user level.

use crate::{
    AvroResult, Codec,
    bridge::AvroDatum,
    decode::{decode_internal, skip_internal},
    error::Error,
    schema::{Names, ResolvedSchema, Schema, resolve_names},
    types::Value,
    util::{safe_len, zag_i64},
};
use log::warn;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

const AVRO_OBJECT_HEADER: &[u8] = b"Obj\x01";

/// The parsed container header: embedded schema, codec, sync marker and any
/// user metadata.
#[derive(Debug)]
struct Header {
    schema: Schema,
    names: Names,
    codec: Codec,
    marker: [u8; 16],
    user_metadata: HashMap<String, Vec<u8>>,
}

fn read_header<R: Read>(reader: &mut R) -> AvroResult<Header> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| Error::io_read(e, "the container magic"))?;
    if magic != AVRO_OBJECT_HEADER {
        return Err(Error::BadMagic(magic));
    }

    let meta_schema = Schema::map(Schema::Bytes);
    let empty_names: Names = HashMap::new();
    let metadata = match decode_internal(&meta_schema, &empty_names, reader)? {
        Value::Map(metadata) => metadata,
        _ => return Err(Error::BadMetadata("avro.schema")),
    };

    let schema_bytes = match metadata.get("avro.schema") {
        Some(Value::Bytes(bytes)) => bytes,
        _ => return Err(Error::BadMetadata("avro.schema")),
    };
    let schema_json: serde_json::Value =
        serde_json::from_slice(schema_bytes).map_err(Error::ParseSchemaJson)?;
    let schema = Schema::parse(&schema_json)?;
    let mut names = Names::new();
    resolve_names(&schema, &mut names)?;

    let codec = match metadata.get("avro.codec") {
        Some(Value::Bytes(bytes)) => {
            let name = std::str::from_utf8(bytes)
                .map_err(|_| Error::BadMetadata("avro.codec"))?;
            Codec::from_metadata_name(name)?
        }
        Some(_) => return Err(Error::BadMetadata("avro.codec")),
        None => Codec::Null,
    };

    let mut user_metadata = HashMap::new();
    for (key, value) in metadata {
        if key == "avro.schema" || key == "avro.codec" {
            continue;
        }
        if key.starts_with("avro.") {
            warn!("Ignoring unknown metadata key: {key}");
            continue;
        }
        match value {
            Value::Bytes(bytes) => {
                user_metadata.insert(key, bytes);
            }
            wrong => {
                warn!("User metadata values must be byte strings, found {wrong:?}");
            }
        }
    }

    let mut marker = [0u8; 16];
    reader
        .read_exact(&mut marker)
        .map_err(|e| Error::io_read(e, "the sync marker"))?;

    Ok(Header {
        schema,
        names,
        codec,
        marker,
        user_metadata,
    })
}

/// Read one byte, distinguishing a clean end of input (`None`) from data.
/// The block framing uses this to tell "no more blocks" from truncation.
fn try_read_first_byte<R: Read>(reader: &mut R) -> AvroResult<Option<u8>> {
    let mut first = [0u8; 1];
    loop {
        match reader.read(&mut first) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(first[0])),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::ReadBytes(e)),
        }
    }
}

/// Main interface for reading Avro object container files as a stream.
///
/// To be used as an iterator:
///
/// ```no_run
/// # use avrolite::Reader;
/// # let input: &[u8] = &[];
/// for value in Reader::new(input).unwrap() {
///     match value {
///         Ok(v) => println!("{v:?}"),
///         Err(e) => println!("Error: {e}"),
///     };
/// }
/// ```
#[derive(Debug)]
pub struct Reader<R> {
    reader: R,
    header: Header,
    buf: Vec<u8>,
    buf_idx: usize,
    message_count: usize,
    errored: bool,
}

impl<R: Read> Reader<R> {
    /// Creates a `Reader` given something implementing the `io::Read` trait
    /// to read from.
    ///
    /// The container header is read and validated upon creation.
    pub fn new(reader: R) -> AvroResult<Reader<R>> {
        let mut reader = reader;
        let header = read_header(&mut reader)?;
        Ok(Reader {
            reader,
            header,
            buf: vec![],
            buf_idx: 0,
            message_count: 0,
            errored: false,
        })
    }

    /// Get a reference to the writer `Schema` embedded in the container.
    pub fn writer_schema(&self) -> &Schema {
        &self.header.schema
    }

    /// Get the codec the container's blocks are compressed with.
    pub fn codec(&self) -> Codec {
        self.header.codec
    }

    /// Get a reference to the user metadata of the container.
    pub fn user_metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.header.user_metadata
    }

    /// Read the next block into the internal buffer. Leaves `message_count`
    /// at zero on a clean end of input.
    fn read_block_next(&mut self) -> AvroResult<()> {
        match try_read_first_byte(&mut self.reader)? {
            None => Ok(()),
            Some(first) => {
                let row_count = zag_i64(&mut (&[first][..]).chain(&mut self.reader))?;
                let compressed_len = zag_i64(&mut self.reader)?;
                let row_count = usize::try_from(row_count)
                    .map_err(|_| Error::Truncated("a block row count"))?;
                let compressed_len = usize::try_from(compressed_len)
                    .map_err(|_| Error::Truncated("a block length"))?;

                self.buf.resize(safe_len(compressed_len)?, 0);
                self.reader
                    .read_exact(&mut self.buf)
                    .map_err(|e| Error::io_read(e, "a block payload"))?;
                self.buf_idx = 0;

                let mut marker = [0u8; 16];
                self.reader
                    .read_exact(&mut marker)
                    .map_err(|e| Error::io_read(e, "a block sync marker"))?;
                if marker != self.header.marker {
                    return Err(Error::CorruptSync);
                }

                self.header.codec.decompress(&mut self.buf)?;
                self.message_count = row_count;
                Ok(())
            }
        }
    }

    fn read_next(&mut self) -> AvroResult<Option<Value>> {
        if self.message_count == 0 {
            self.read_block_next()?;
            if self.message_count == 0 {
                return Ok(None);
            }
        }

        let mut block_bytes = &self.buf[self.buf_idx..];
        let bytes_before = block_bytes.len();
        let item = decode_internal(&self.header.schema, &self.header.names, &mut block_bytes)?;
        if bytes_before != 0 && bytes_before == block_bytes.len() {
            // A value that consumed nothing would loop forever.
            return Err(Error::ReadBlockStalled);
        }
        self.buf_idx += bytes_before - block_bytes.len();
        self.message_count -= 1;
        Ok(Some(item))
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = AvroResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        // Do not keep reading after the first error occurs.
        if self.errored {
            return None;
        }
        match self.read_next() {
            Ok(opt) => opt.map(Ok),
            Err(e) => {
                self.errored = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode a single standalone Avro datum given its `Schema`.
pub fn from_avro_datum<R: Read>(schema: &Schema, reader: &mut R) -> AvroResult<Value> {
    let rs = ResolvedSchema::try_from(schema)?;
    decode_internal(schema, rs.get_names(), reader)
}

/// Decode a single standalone Avro datum into a typed value, deriving the
/// schema from the type.
pub fn from_avro_datum_typed<T: AvroDatum, R: Read>(reader: &mut R) -> AvroResult<T> {
    T::from_value(from_avro_datum(&T::get_schema(), reader)?)
}

/// One entry of the block index: where the block starts in the file, and
/// which rows it holds.
#[derive(Debug, Clone, Copy)]
struct BlockSpan {
    offset: u64,
    start_row: usize,
    row_count: usize,
}

/// A random-addressable view over an object container.
///
/// The block index is built on the first call that needs it, by scanning the
/// block framing without decompressing payloads. `row_at` then locates the
/// target block, decompresses it once, and skips forward to the requested
/// row.
pub struct Table<R> {
    reader: R,
    header: Header,
    data_start: u64,
    index: Option<Vec<BlockSpan>>,
    cached_block: Option<(usize, Vec<u8>)>,
}

/// Open a seekable source as a [`Table`].
pub fn read_table<R: Read + Seek>(source: R) -> AvroResult<Table<R>> {
    Table::new(source)
}

impl<R: Read + Seek> Table<R> {
    /// Open a seekable source as a `Table`, reading and validating the
    /// container header.
    pub fn new(source: R) -> AvroResult<Table<R>> {
        let mut reader = source;
        let header = read_header(&mut reader)?;
        let data_start = reader.stream_position().map_err(Error::Seek)?;
        Ok(Table {
            reader,
            header,
            data_start,
            index: None,
            cached_block: None,
        })
    }

    /// Get a reference to the schema embedded in the container.
    pub fn schema(&self) -> &Schema {
        &self.header.schema
    }

    /// Get a reference to the user metadata of the container.
    pub fn user_metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.header.user_metadata
    }

    /// Total number of rows in the container.
    pub fn len(&mut self) -> AvroResult<usize> {
        let index = self.ensure_index()?;
        Ok(index
            .last()
            .map(|span| span.start_row + span.row_count)
            .unwrap_or(0))
    }

    /// Whether the container holds no rows.
    pub fn is_empty(&mut self) -> AvroResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Decode the row at index `i`.
    pub fn row_at(&mut self, i: usize) -> AvroResult<Value> {
        let len = self.len()?;
        if i >= len {
            return Err(Error::RowOutOfRange { index: i, len });
        }
        let index = self.ensure_index()?;
        let block_idx = index
            .partition_point(|span| span.start_row + span.row_count <= i)
            .min(index.len() - 1);
        let span = index[block_idx];

        self.load_block(block_idx, span)?;
        let buf = match &self.cached_block {
            Some((_, buf)) => buf,
            None => return Err(Error::ReadBlockStalled),
        };

        let mut pos = 0;
        for _ in span.start_row..i {
            pos = skip_internal(&self.header.schema, &self.header.names, buf, pos)?;
        }
        decode_internal(&self.header.schema, &self.header.names, &mut &buf[pos..])
    }

    /// Iterate all rows in order. Blocks are decompressed one at a time.
    pub fn rows(&mut self) -> AvroResult<Rows<'_, R>> {
        self.ensure_index()?;
        Ok(Rows {
            table: self,
            block_idx: 0,
            row_in_block: 0,
            pos: 0,
        })
    }

    /// Scan the block framing once and build the index. Payloads are seeked
    /// over, not read.
    fn ensure_index(&mut self) -> AvroResult<&[BlockSpan]> {
        if self.index.is_none() {
            let mut spans = Vec::new();
            let mut start_row = 0;
            self.reader
                .seek(SeekFrom::Start(self.data_start))
                .map_err(Error::Seek)?;
            loop {
                let offset = self.reader.stream_position().map_err(Error::Seek)?;
                let first = match try_read_first_byte(&mut self.reader)? {
                    None => break,
                    Some(first) => first,
                };
                let row_count = zag_i64(&mut (&[first][..]).chain(&mut self.reader))?;
                let compressed_len = zag_i64(&mut self.reader)?;
                let row_count = usize::try_from(row_count)
                    .map_err(|_| Error::Truncated("a block row count"))?;
                let compressed_len = usize::try_from(compressed_len)
                    .map_err(|_| Error::Truncated("a block length"))?;

                self.reader
                    .seek(SeekFrom::Current(compressed_len as i64))
                    .map_err(Error::Seek)?;
                let mut marker = [0u8; 16];
                self.reader
                    .read_exact(&mut marker)
                    .map_err(|e| Error::io_read(e, "a block sync marker"))?;
                if marker != self.header.marker {
                    return Err(Error::CorruptSync);
                }

                spans.push(BlockSpan {
                    offset,
                    start_row,
                    row_count,
                });
                start_row += row_count;
            }
            self.index = Some(spans);
        }
        Ok(self.index.as_deref().unwrap_or_default())
    }

    /// Read and decompress the block at `block_idx` into the cache, unless it
    /// is already there.
    fn load_block(&mut self, block_idx: usize, span: BlockSpan) -> AvroResult<()> {
        if matches!(&self.cached_block, Some((cached, _)) if *cached == block_idx) {
            return Ok(());
        }
        self.reader
            .seek(SeekFrom::Start(span.offset))
            .map_err(Error::Seek)?;
        let _row_count = zag_i64(&mut self.reader)?;
        let compressed_len = zag_i64(&mut self.reader)?;
        let compressed_len = usize::try_from(compressed_len)
            .map_err(|_| Error::Truncated("a block length"))?;
        let mut payload = vec![0u8; safe_len(compressed_len)?];
        self.reader
            .read_exact(&mut payload)
            .map_err(|e| Error::io_read(e, "a block payload"))?;
        self.header.codec.decompress(&mut payload)?;
        self.cached_block = Some((block_idx, payload));
        Ok(())
    }
}

/// Iterator over a [`Table`]'s rows.
pub struct Rows<'t, R> {
    table: &'t mut Table<R>,
    block_idx: usize,
    row_in_block: usize,
    pos: usize,
}

impl<R: Read + Seek> Iterator for Rows<'_, R> {
    type Item = AvroResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let span = match self.table.index.as_ref()?.get(self.block_idx) {
                Some(span) => *span,
                None => return None,
            };
            if self.row_in_block >= span.row_count {
                self.block_idx += 1;
                self.row_in_block = 0;
                self.pos = 0;
                continue;
            }
            if let Err(e) = self.table.load_block(self.block_idx, span) {
                return Some(Err(e));
            }
            let buf = match &self.table.cached_block {
                Some((_, buf)) => buf,
                None => return Some(Err(Error::ReadBlockStalled)),
            };
            let mut slice = &buf[self.pos..];
            let before = slice.len();
            let item = decode_internal(
                &self.table.header.schema,
                &self.table.header.names,
                &mut slice,
            );
            self.pos += before - slice.len();
            self.row_in_block += 1;
            return Some(item);
        }
    }
}
