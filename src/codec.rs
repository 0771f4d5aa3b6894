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

//! Logic for all supported compression codecs in Avro object container files.

use crate::{AvroResult, error::Error};
use std::str::FromStr;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// The compression codec used to compress blocks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Codec {
    /// The `Null` codec simply passes through data uncompressed.
    Null,
    /// The `Deflate` codec writes the data block using the deflate algorithm
    /// as specified in RFC 1951. Note that this format (unlike the "zlib
    /// format" in RFC 1950) does not have a checksum.
    Deflate,
    #[cfg(feature = "bzip")]
    /// The `Bzip2` codec uses the [BZip2](https://sourceware.org/bzip2/)
    /// compression library.
    Bzip2,
    #[cfg(feature = "xz")]
    /// The `Xz` codec uses [Xz utils](https://tukaani.org/xz/)
    /// compression library.
    Xz,
    #[cfg(feature = "zstandard")]
    /// The `Zstandard` codec uses Facebook's
    /// [Zstandard](https://facebook.github.io/zstd/) library. The shorthand
    /// `zstd` is accepted as a metadata name.
    #[strum(to_string = "zstandard", serialize = "zstd")]
    Zstandard,
}

impl Codec {
    /// Look up a codec by the name carried in container metadata.
    pub fn from_metadata_name(name: &str) -> AvroResult<Codec> {
        Codec::from_str(name).map_err(|_| Error::UnknownCodec(name.to_string()))
    }

    /// Compress a stream of bytes in-place.
    pub fn compress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        match self {
            Codec::Null => (),
            Codec::Deflate => {
                let compressed = miniz_oxide::deflate::compress_to_vec(
                    stream,
                    miniz_oxide::deflate::CompressionLevel::DefaultCompression as u8,
                );
                *stream = compressed;
            }
            #[cfg(feature = "bzip")]
            Codec::Bzip2 => {
                use bzip2::read::BzEncoder;
                use std::io::Read;

                let mut encoder = BzEncoder::new(&stream[..], bzip2::Compression::default());
                let mut buffer = Vec::new();
                encoder.read_to_end(&mut buffer).map_err(Error::Compress)?;
                *stream = buffer;
            }
            #[cfg(feature = "xz")]
            Codec::Xz => {
                use liblzma::read::XzEncoder;
                use std::io::Read;

                let mut encoder = XzEncoder::new(&stream[..], 6);
                let mut buffer = Vec::new();
                encoder.read_to_end(&mut buffer).map_err(Error::Compress)?;
                *stream = buffer;
            }
            #[cfg(feature = "zstandard")]
            Codec::Zstandard => {
                let compressed =
                    zstd::stream::encode_all(&stream[..], 0).map_err(Error::Compress)?;
                *stream = compressed;
            }
        };

        Ok(())
    }

    /// Decompress a stream of bytes in-place.
    pub fn decompress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        *stream = match self {
            Codec::Null => return Ok(()),
            Codec::Deflate => {
                miniz_oxide::inflate::decompress_to_vec(stream).map_err(|e| {
                    use miniz_oxide::inflate::TINFLStatus;
                    use std::io::ErrorKind;
                    let kind = match e.status {
                        TINFLStatus::FailedCannotMakeProgress | TINFLStatus::NeedsMoreInput => {
                            ErrorKind::UnexpectedEof
                        }
                        _ => ErrorKind::InvalidData,
                    };
                    Error::Decompress(std::io::Error::from(kind))
                })?
            }
            #[cfg(feature = "bzip")]
            Codec::Bzip2 => {
                use bzip2::read::BzDecoder;
                use std::io::Read;

                let mut decoder = BzDecoder::new(&stream[..]);
                let mut decoded = Vec::new();
                decoder.read_to_end(&mut decoded).map_err(Error::Decompress)?;
                decoded
            }
            #[cfg(feature = "xz")]
            Codec::Xz => {
                use liblzma::read::XzDecoder;
                use std::io::Read;

                let mut decoder = XzDecoder::new(&stream[..]);
                let mut decoded = Vec::new();
                decoder.read_to_end(&mut decoded).map_err(Error::Decompress)?;
                decoded
            }
            #[cfg(feature = "zstandard")]
            Codec::Zstandard => {
                zstd::stream::decode_all(&stream[..]).map_err(Error::Decompress)?
            }
        };
        Ok(())
    }
}
