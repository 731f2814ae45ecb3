//! Types for reading BA2 archives
//!

use std::io::{Read, Seek};

use tracing::{debug, instrument, trace, warn};

use crate::{
    archive::EntryKind,
    ba2::types::{Ba2Header, Ba2Kind, GeneralRecord, TextureChunk, TextureRecord, CHUNK_HEADER_SIZE},
    compression::{CompressionMethod, Decompressor},
    cursor::ByteCursor,
    dds::{write_dds, DdsHeader, DxgiFormat, TextureInfo, DDS_HEADER_SIZE},
    error::{Error, Result},
};

/// Read and validate the header at the start of the archive.
pub(crate) fn read_header<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Ba2Header> {
    cursor.seek(0)?;
    let header: Ba2Header = cursor.read_struct()?;

    if !header.is_supported_version() {
        return Err(Error::InvalidFormat(format!(
            "unsupported BA2 version {}",
            header.version
        )));
    }

    debug!(?header, "read ba2 header");
    Ok(header)
}

/// Read every file record following the header, in table order.
pub(crate) fn read_records<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    header: &Ba2Header,
) -> Result<Vec<EntryKind>> {
    (0..header.file_count)
        .map(|index| {
            let kind = match header.kind {
                Ba2Kind::General => EntryKind::General(cursor.read_struct::<GeneralRecord>()?),
                Ba2Kind::Texture => {
                    let record: TextureRecord = cursor.read_struct()?;
                    if record.chunk_header_length != CHUNK_HEADER_SIZE {
                        warn!(
                            index,
                            length = record.chunk_header_length,
                            "unexpected chunk header length"
                        );
                    }
                    EntryKind::Texture(record)
                }
            };
            trace!(index, ?kind, "read record");
            Ok(kind)
        })
        .collect()
}

/// Read the full path of every entry from the name table.
///
/// Only reads the archive, so calling it again yields the same paths. Archives without a name
/// table get paths made up from the record hashes.
pub(crate) fn read_names<'a, R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    header: &Ba2Header,
    kinds: impl Iterator<Item = &'a EntryKind>,
) -> Result<Vec<Box<str>>> {
    if header.name_table_offset == 0 {
        debug!("archive has no name table");
        return Ok(kinds.map(hashed_name).collect());
    }

    cursor.seek(header.name_table_offset)?;
    kinds
        .map(|_| Ok(cursor.read_prefixed_string()?.into_boxed_str()))
        .collect()
}

fn hashed_name(kind: &EntryKind) -> Box<str> {
    let (dir_hash, name_hash, extension) = match kind {
        EntryKind::General(r) => (r.dir_hash, r.name_hash, r.extension()),
        EntryKind::Texture(r) => (r.dir_hash, r.name_hash, r.extension()),
        // not produced by this reader
        EntryKind::Legacy(f) => return format!("{:016x}", f.hash).into_boxed_str(),
    };
    format!("{dir_hash:08x}\\{name_hash:08x}.{extension}").into_boxed_str()
}

/// Read a general file's payload, inflating it when its sizes say it is compressed.
#[instrument(skip(cursor, decompressor, record), err)]
pub(crate) fn extract_general<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    decompressor: &mut Decompressor,
    index: usize,
    record: &GeneralRecord,
) -> Result<Vec<u8>> {
    cursor.seek(record.offset)?;
    let stored = cursor.read_bytes(record.stored_size() as usize)?;
    if !record.is_compressed() {
        return Ok(stored);
    }

    decompressor
        .decompress(
            CompressionMethod::Zlib,
            &stored,
            record.unpacked_size as usize,
        )
        .map_err(|source| Error::Decompression { index, source })
}

/// Rebuild a DDS file from a texture's chunks.
///
/// Nothing is read from the archive when the pixel format is unsupported.
#[instrument(skip(cursor, decompressor, record), err)]
pub(crate) fn extract_texture<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    decompressor: &mut Decompressor,
    index: usize,
    record: &TextureRecord,
    alternate_fourcc: bool,
) -> Result<Vec<u8>> {
    let format = DxgiFormat::try_from(record.format)
        .map_err(|format| Error::UnsupportedTextureFormat { index, format })?;
    let header = DdsHeader::for_texture(
        &TextureInfo {
            width: record.width,
            height: record.height,
            mip_count: record.mip_count,
            format,
        },
        alternate_fourcc,
    );

    let chunks = record
        .chunks
        .iter()
        .map(|chunk| read_chunk(cursor, decompressor, index, chunk))
        .collect::<Result<Vec<_>>>()?;

    let mut out = Vec::with_capacity(DDS_HEADER_SIZE + record.unpacked_size() as usize);
    write_dds(&mut out, &header, &chunks)?;
    Ok(out)
}

fn read_chunk<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    decompressor: &mut Decompressor,
    index: usize,
    chunk: &TextureChunk,
) -> Result<Vec<u8>> {
    cursor.seek(chunk.offset)?;
    if chunk.packed_size == 0 {
        return cursor.read_bytes(chunk.unpacked_size as usize);
    }

    let packed = cursor.read_bytes(chunk.packed_size as usize)?;
    decompressor
        .decompress(
            CompressionMethod::Zlib,
            &packed,
            chunk.unpacked_size as usize,
        )
        .map_err(|source| Error::Decompression { index, source })
}
