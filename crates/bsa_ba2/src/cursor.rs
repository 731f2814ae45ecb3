//! Sequential little-endian reader used to walk archive tables.

use binrw::{meta::ReadEndian, BinRead};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// A positioned reader over an archive.
///
/// Every read either completes in full or fails with [`Error::Truncated`] carrying the offset
/// the read started at. The cursor keeps its own notion of the current position so that the
/// offset is still meaningful after a failed read.
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: R,
    position: u64,
}

impl<R: Read + Seek> ByteCursor<R> {
    /// Wrap a reader, taking its current position as the starting point.
    pub fn new(mut inner: R) -> Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self { inner, position })
    }

    /// Current absolute position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move to an absolute byte offset.
    pub fn seek(&mut self, offset: u64) -> Result<u64> {
        self.position = self.inner.seek(SeekFrom::Start(offset))?;
        Ok(self.position)
    }

    /// Total length of the underlying stream. The position is left unchanged.
    pub fn stream_len(&mut self) -> Result<u64> {
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(self.position))?;
        Ok(len)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.guard(1, |r| r.read_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.guard(2, |r| r.read_u16::<LittleEndian>())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.guard(4, |r| r.read_u32::<LittleEndian>())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.guard(8, |r| r.read_u64::<LittleEndian>())
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.guard(len as u64, |r| r.read_exact(&mut buffer))?;
        Ok(buffer)
    }

    /// Skip `len` bytes, failing if they are not all present.
    pub fn skip(&mut self, len: u64) -> Result<()> {
        let start = self.position;
        let copied = io::copy(&mut self.inner.by_ref().take(len), &mut io::sink())?;
        if copied != len {
            self.inner.seek(SeekFrom::Start(start))?;
            return Err(Error::Truncated { offset: start });
        }
        self.position += len;
        Ok(())
    }

    /// Read a fixed-width block of characters. Trailing NULs are dropped.
    pub fn read_chars(&mut self, len: usize) -> Result<String> {
        let raw = self.read_bytes(len)?;
        Ok(decode_chars(&raw))
    }

    /// Read a string prefixed with its `u16` length.
    pub fn read_prefixed_string(&mut self) -> Result<String> {
        let len = self.read_u16()?;
        self.read_chars(len as usize)
    }

    /// Read bytes prefixed with their `u8` length.
    pub fn read_byte_prefixed(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u8()?;
        self.read_bytes(len as usize)
    }

    /// Read a NUL terminated string, consuming the terminator.
    pub fn read_zstring(&mut self) -> Result<String> {
        let mut raw = Vec::new();
        loop {
            let c = self.read_u8()?;
            if c == b'\0' {
                break;
            }
            raw.push(c);
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Read a fixed layout structure described with [`binrw`].
    pub fn read_struct<T>(&mut self) -> Result<T>
    where
        T: for<'a> BinRead<Args<'a> = ()> + ReadEndian,
    {
        let start = self.position;
        match T::read(&mut self.inner) {
            Ok(value) => {
                self.position = self.inner.stream_position()?;
                Ok(value)
            }
            Err(e) => {
                self.inner.seek(SeekFrom::Start(start))?;
                if e.is_eof() {
                    Err(Error::Truncated { offset: start })
                } else {
                    Err(Error::from(e))
                }
            }
        }
    }

    /// Unwrap and return the inner reader object
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn guard<T>(&mut self, len: u64, read: impl FnOnce(&mut R) -> io::Result<T>) -> Result<T> {
        let start = self.position;
        match read(&mut self.inner) {
            Ok(value) => {
                self.position = start + len;
                Ok(value)
            }
            Err(e) => {
                // leave the reader where the failed read started
                self.inner.seek(SeekFrom::Start(start))?;
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    Err(Error::Truncated { offset: start })
                } else {
                    Err(Error::IOError(e))
                }
            }
        }
    }
}

pub(crate) fn decode_chars(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|&c| c != b'\0').map_or(0, |p| p + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
