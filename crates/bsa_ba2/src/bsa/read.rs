//! Types for reading BSA archives
//!

use std::io::{Read, Seek};

use tracing::{debug, instrument, trace};

use crate::{
    bsa::types::{
        ArchiveFlags, BsaHeader, FileRecord, FolderRecord, LegacyFile, ModernRecord, Variant,
        HEADER_SIZE,
    },
    compression::{CompressionMethod, Decompressor},
    cursor::{decode_chars, ByteCursor},
    error::{Error, Result},
};

/// Everything about a BSA archive's layout needed after its tables were read
#[derive(Debug, Clone)]
pub struct BsaLayout {
    pub header: BsaHeader,
    pub variant: Variant,
    /// Folder names in directory order, blank when the archive stores none
    pub folders: Vec<Box<str>>,
    /// Where the file name block starts
    pub names_offset: u64,
}

/// Read and validate the header at the start of the archive.
pub(crate) fn read_header<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<BsaHeader> {
    cursor.seek(0)?;
    let header: BsaHeader = cursor.read_struct()?;

    if header.variant().is_none() {
        return Err(Error::InvalidFormat(format!(
            "unsupported BSA version {}",
            header.version
        )));
    }
    if header.offset != HEADER_SIZE {
        return Err(Error::InvalidFormat(format!(
            "unexpected BSA header size {}",
            header.offset
        )));
    }

    debug!(?header, "read bsa header");
    Ok(header)
}

/// Read the folder records and every folder's file records.
///
/// The files come back in directory order with their paths still unknown.
pub(crate) fn read_directory<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    header: BsaHeader,
) -> Result<(BsaLayout, Vec<LegacyFile>)> {
    let variant = header.variant().ok_or_else(|| {
        Error::InvalidFormat(format!("unsupported BSA version {}", header.version))
    })?;

    cursor.seek(header.offset as u64)?;
    let records = (0..header.folder_count)
        .map(|_| read_folder_record(cursor, variant))
        .collect::<Result<Vec<_>>>()?;

    let mut folders = Vec::with_capacity(records.len());
    let mut files = Vec::with_capacity(header.file_count as usize);
    for (folder, record) in records.iter().enumerate() {
        let name = if header
            .archive_flags
            .contains(ArchiveFlags::DIRECTORY_STRINGS)
        {
            decode_chars(&cursor.read_byte_prefixed()?)
        } else {
            String::new()
        };
        trace!(folder, name, files = record.file_count, "read folder");

        for _ in 0..record.file_count {
            let file: FileRecord = cursor.read_struct()?;
            files.push(LegacyFile {
                hash: file.hash,
                folder,
                offset: file.offset,
                size: file.size(),
                compressed: header.compressed_by_default() ^ file.toggles_compression(),
                uncompressed_size: 0,
                record: (variant == Variant::Modern).then_some(ModernRecord {
                    offset: file.offset as u64,
                    size_flags: file.size_flags,
                    name_prefix: header.embedded_names(),
                }),
            });
        }
        folders.push(name.into_boxed_str());
    }

    if files.len() != header.file_count as usize {
        return Err(Error::InvalidFormat(format!(
            "folders list {} files but the header declares {}",
            files.len(),
            header.file_count
        )));
    }

    let layout = BsaLayout {
        header,
        variant,
        folders,
        names_offset: cursor.position(),
    };
    debug!(
        folders = layout.folders.len(),
        files = files.len(),
        names_offset = layout.names_offset,
        "read bsa directory"
    );
    Ok((layout, files))
}

fn read_folder_record<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    variant: Variant,
) -> Result<FolderRecord> {
    let hash = cursor.read_u64()?;
    let file_count = cursor.read_u32()?;
    let offset = match variant {
        Variant::Classic => cursor.read_u32()? as u64,
        Variant::Modern => {
            let _padding = cursor.read_u32()?;
            cursor.read_u64()?
        }
    };
    Ok(FolderRecord {
        hash,
        file_count,
        offset,
    })
}

/// Build the full path of every file, in directory order.
///
/// Only reads the archive, so calling it again yields the same paths.
pub(crate) fn read_names<'a, R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    layout: &BsaLayout,
    files: impl Iterator<Item = &'a LegacyFile>,
) -> Result<Vec<Box<str>>> {
    let file_strings = layout
        .header
        .archive_flags
        .contains(ArchiveFlags::FILE_STRINGS);
    if file_strings {
        cursor.seek(layout.names_offset)?;
    }

    files
        .map(|file| {
            let name = if file_strings {
                cursor.read_zstring()?
            } else {
                format!("{:016x}", file.hash)
            };
            let folder = layout.folders.get(file.folder).map_or("", |f| f.as_ref());
            Ok(if folder.is_empty() {
                name.into_boxed_str()
            } else {
                format!("{folder}\\{name}").into_boxed_str()
            })
        })
        .collect()
}

/// Read one file's payload, decompressing it if needed.
#[instrument(skip(cursor, decompressor, layout, file), err)]
pub(crate) fn extract<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    decompressor: &mut Decompressor,
    layout: &BsaLayout,
    index: usize,
    file: &LegacyFile,
) -> Result<Vec<u8>> {
    match layout.variant {
        Variant::Classic => extract_classic(
            cursor,
            decompressor,
            layout.header.embedded_names(),
            index,
            file,
        ),
        Variant::Modern => {
            let record = file.record.ok_or_else(|| {
                Error::InvalidFormat(format!("entry {index} is missing its file record"))
            })?;
            extract_modern(cursor, decompressor, &record, index, file)
        }
    }
}

/// Versions 103 and 104: optional embedded name, then either the raw bytes or a `u32`
/// decompressed size followed by a zlib stream.
///
/// The recorded size covers the embedded name, so its length is taken off before the payload
/// is read, the same as for version 105.
fn extract_classic<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    decompressor: &mut Decompressor,
    embedded_names: bool,
    index: usize,
    file: &LegacyFile,
) -> Result<Vec<u8>> {
    cursor.seek(file.offset as u64)?;
    let mut remaining = file.size as u64;

    if embedded_names {
        let name = cursor.read_byte_prefixed()?;
        remaining = shrink(remaining, name.len() as u64 + 1, index)?;
    }

    if !file.compressed {
        return cursor.read_bytes(remaining as usize);
    }

    let declared = cursor.read_u32()?;
    remaining = shrink(remaining, 4, index)?;
    let expected = match file.uncompressed_size {
        0 => declared,
        known => known,
    };

    let compressed = cursor.read_bytes(remaining as usize)?;
    decompressor
        .decompress(CompressionMethod::Zlib, &compressed, expected as usize)
        .map_err(|source| Error::Decompression { index, source })
}

/// Version 105: like the classic layout but the payload is an LZ4 frame.
fn extract_modern<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    decompressor: &mut Decompressor,
    record: &ModernRecord,
    index: usize,
    file: &LegacyFile,
) -> Result<Vec<u8>> {
    cursor.seek(record.offset)?;
    let mut remaining = record.size() as u64;

    if record.name_prefix {
        let name = cursor.read_byte_prefixed()?;
        remaining = shrink(remaining, name.len() as u64 + 1, index)?;
    }

    let mut expected = remaining;
    if record.size_flags > 0 && file.compressed {
        expected = cursor.read_u32()? as u64;
        remaining = shrink(remaining, 4, index)?;
    }

    let payload = cursor.read_bytes(remaining as usize)?;
    if !file.compressed {
        return Ok(payload);
    }

    decompressor
        .decompress(CompressionMethod::Lz4Frame, &payload, expected as usize)
        .map_err(|source| Error::Decompression { index, source })
}

fn shrink(size: u64, by: u64, index: usize) -> Result<u64> {
    size.checked_sub(by).ok_or_else(|| {
        Error::InvalidFormat(format!(
            "entry {index} is {size} bytes, too small for its {by} byte prefix"
        ))
    })
}
