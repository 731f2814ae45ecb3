//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::compression::CompressionMethod;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// file is not an archive this library understands
    #[error("invalid archive: {0}")]
    #[diagnostic(help("supported archives are BSA v103, v104, v105 and BA2 (GNRL, DX10) v1, v7, v8"))]
    InvalidFormat(String),

    /// a read ran past the end of the archive
    #[error("unexpected end of archive while reading at offset {offset:#x}")]
    Truncated {
        /// Position of the read that could not be satisfied
        offset: u64,
    },

    /// an entry's payload could not be decompressed
    #[error("unable to decompress entry {index}")]
    Decompression {
        /// Index of the failing entry
        index: usize,
        /// What the decompressor rejected
        #[source]
        source: DecompressionError,
    },

    /// a texture entry uses a pixel format no header can be built for
    #[error("entry {index} uses unsupported texture format {format}")]
    #[diagnostic(help("the entry was skipped; the rest of the archive is still readable"))]
    UnsupportedTextureFormat {
        /// Index of the texture entry
        index: usize,
        /// The DXGI format code stored in the archive
        format: u8,
    },

    /// unable to find requested entry
    #[error("unable to find requested entry")]
    EntryNotFound(#[from] EntryNotFoundError),
}

impl From<binrw::Error> for Error {
    fn from(value: binrw::Error) -> Self {
        match value {
            binrw::Error::Io(e) => Error::IOError(e),
            binrw::Error::BadMagic { pos, .. } => {
                Error::InvalidFormat(format!("bad magic at offset {pos:#x}"))
            }
            e => Error::InvalidFormat(e.to_string()),
        }
    }
}

/// Error type to provide further information when an entry has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested entry")]
pub enum EntryNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Reasons a compressed payload was rejected
#[derive(Error, Diagnostic, Debug)]
pub enum DecompressionError {
    /// The compressed stream itself is corrupt or cut short
    #[error("corrupt {method} stream")]
    Stream {
        /// Which decompressor failed
        method: CompressionMethod,
        /// The decoder's own error
        #[source]
        source: std::io::Error,
    },

    /// The stream ended before producing the declared number of bytes
    #[error("expected {expected} bytes but the stream produced {actual}")]
    SizeMismatch {
        /// Size recorded in the archive
        expected: usize,
        /// Size the stream actually produced
        actual: usize,
    },

    /// The stream still had data after producing the declared number of bytes
    #[error("stream continues past the declared size of {expected} bytes")]
    Overrun {
        /// Size recorded in the archive
        expected: usize,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
