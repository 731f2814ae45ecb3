//! Payload decompression.
//!
//! Archives store compressed payloads with their decompressed size recorded next to them, so
//! every decompressor here is asked for an exact number of bytes and fails if the stream produces
//! more or fewer.

use std::{
    fmt,
    io::{self, Read},
};

use flate2::{Decompress, FlushDecompress, Status};
use tracing::{instrument, trace};

use crate::error::DecompressionError;

/// Identifies how a payload is stored inside an archive
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None,

    /// Zlib wrapped deflate, used by classic BSA archives and BA2 archives
    Zlib,

    /// LZ4 frames, used by version 105 BSA archives
    Lz4Frame,
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMethod::None => f.write_str("stored"),
            CompressionMethod::Zlib => f.write_str("zlib"),
            CompressionMethod::Lz4Frame => f.write_str("lz4 frame"),
        }
    }
}

/// Decompression state owned by an archive.
///
/// The inflate state is reused between entries and reset before each payload, so a single
/// instance must never be shared between concurrent extractions.
pub struct Decompressor {
    inflate: Decompress,
}

impl fmt::Debug for Decompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decompressor").finish_non_exhaustive()
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor {
    pub fn new() -> Self {
        Self {
            inflate: Decompress::new(true),
        }
    }

    /// Decompress `input` into exactly `expected` bytes.
    #[instrument(skip(self, input), fields(input = input.len()), err)]
    pub fn decompress(
        &mut self,
        method: CompressionMethod,
        input: &[u8],
        expected: usize,
    ) -> Result<Vec<u8>, DecompressionError> {
        match method {
            CompressionMethod::None if input.len() == expected => Ok(input.to_vec()),
            CompressionMethod::None => Err(DecompressionError::SizeMismatch {
                expected,
                actual: input.len(),
            }),
            CompressionMethod::Zlib => self.inflate(input, expected),
            CompressionMethod::Lz4Frame => lz4_frame(input, expected),
        }
    }

    fn inflate(&mut self, input: &[u8], expected: usize) -> Result<Vec<u8>, DecompressionError> {
        self.inflate.reset(true);

        let mut output = Vec::with_capacity(expected);
        let status = self
            .inflate
            .decompress_vec(input, &mut output, FlushDecompress::Finish)
            .map_err(|e| DecompressionError::Stream {
                method: CompressionMethod::Zlib,
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })?;
        trace!(?status, produced = output.len(), "inflated");

        match status {
            Status::StreamEnd if output.len() == expected => Ok(output),
            _ if output.len() < expected => Err(DecompressionError::SizeMismatch {
                expected,
                actual: output.len(),
            }),
            _ => Err(DecompressionError::Overrun { expected }),
        }
    }
}

fn lz4_frame(input: &[u8], expected: usize) -> Result<Vec<u8>, DecompressionError> {
    let mut output = Vec::with_capacity(expected);
    lz4_flex::frame::FrameDecoder::new(input)
        .take(expected as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| DecompressionError::Stream {
            method: CompressionMethod::Lz4Frame,
            source: e,
        })?;

    if output.len() > expected {
        return Err(DecompressionError::Overrun { expected });
    }
    if output.len() < expected {
        return Err(DecompressionError::SizeMismatch {
            expected,
            actual: output.len(),
        });
    }
    Ok(output)
}
