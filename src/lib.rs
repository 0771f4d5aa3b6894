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

//! A pure Rust implementation of the [Apache Avro](https://avro.apache.org/)
//! binary serialization format and the Object Container File format.
//!
//! There are two ways of working with Avro data in this crate:
//!
//! 1. Via the generic [`Value`](types::Value) type: parse a [`Schema`] from
//!    JSON, build values dynamically, and drive the codec with
//!    [`to_avro_datum`] / [`from_avro_datum`] or the container
//!    [`Writer`] / [`Reader`].
//! 2. Via Rust types implementing [`AvroSchema`] and [`AvroDatum`]: the
//!    schema is derived from the type, and [`codegen`] emits such types from
//!    a schema.
//!
//! Object container files embed their schema, frame rows into optionally
//! compressed blocks, and are readable either as a stream ([`Reader`]) or as
//! a random-addressable table ([`Table`]).
//!
//! # Features
//!
//! - `bzip`: support for the Bzip2 codec (enabled by default)
//! - `xz`: support for the Xz codec (enabled by default)
//! - `zstandard`: support for the Zstandard codec (enabled by default)
//!
//! # MSRV
//!
//! The current MSRV is 1.88.0.

mod bridge;
mod codec;
mod decimal;
mod decode;
mod duration;
mod encode;
mod reader;
mod writer;

pub mod codegen;
pub mod error;
pub mod schema;
pub mod types;
pub mod util;

pub use bridge::{AvroDatum, AvroSchema, Bytes};
pub use codec::Codec;
pub use decimal::Decimal;
pub use decode::{decode, skip};
pub use duration::{Days, Duration, Millis, Months};
pub use encode::{encode, encode_to_vec, encoded_size};
pub use error::Error;
pub use reader::{
    Reader, Rows, Table, from_avro_datum, from_avro_datum_typed, read_table,
};
pub use schema::Schema;
pub use uuid::Uuid;
pub use writer::{
    Writer, WriterBuilder, to_avro_datum, to_avro_datum_derived, to_avro_datum_typed,
    write_table,
};

/// A convenience type alias for `Result`s with `Error`s.
pub type AvroResult<T> = Result<T, Error>;
