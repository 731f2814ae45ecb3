//! This library reads the **BSA** and **BA2** archives used by Bethesda games and recovers the
//! files stored inside them.
//!
//! # Archive Format Documentation
//!
//! Two container formats are supported. Both are little endian throughout and both are identified
//! by their first four bytes, so [`Archive::open`] picks the right reader on its own.
//!
//! ## BSA
//!
//! A BSA file consists of a header, the folder records, each folder's name and file records, a
//! block of file names and finally the file data.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: 0x00415342 ("BSA\0")                              |
//! | 0x0004         | Version                | 4 bytes: 103, 104 or 105                                   |
//! | 0x0008         | Offset                 | 4 bytes: Size of this header, always 36                    |
//! | 0x000C         | Archive Flags          | 4 bytes: See below                                         |
//! | 0x0010         | Folder Count           | 4 bytes: Number of folders                                 |
//! | 0x0014         | File Count             | 4 bytes: Number of files across all folders                |
//! | 0x0018         | Folder Names Length    | 4 bytes: Total length of all folder names                  |
//! | 0x001C         | File Names Length      | 4 bytes: Length of the file name block                     |
//! | 0x0020         | File Flags             | 4 bytes: Kinds of content in the archive                   |
//!
//! ### Archive Flags
//!
//! - `0x001`: folder names are stored in front of each folder's file records
//! - `0x002`: the file name block is present
//! - `0x004`: files are compressed by default
//! - `0x100`: every payload starts with its full path (version 104 and later)
//!
//! ### Folder Records
//!
//! Versions 103 and 104 use 16 byte records, version 105 widens the offset and adds padding.
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name Hash              | 8 bytes                                                 |
//! | 0x0008         | File Count             | 4 bytes: Number of file records in this folder          |
//! | 0x000C         | Offset                 | 4 bytes (103, 104) or 4 bytes padding + 8 bytes (105)   |
//!
//! ### File Records
//!
//! Each folder's block starts with its name (a `u8` length including the terminator, then the
//! characters) when names are stored, followed by one record per file.
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name Hash              | 8 bytes                                                 |
//! | 0x0008         | Size                   | 4 bytes: Low 30 bits are the size, bit 30 inverts the   |
//! |                |                        | archive's default compression for this file             |
//! | 0x000C         | Offset                 | 4 bytes: Offset of the payload from the start of file   |
//!
//! The file name block holds one NUL terminated name per file, in the same order as the records.
//!
//! ### Payloads
//!
//! - **Embedded Name**: when flag `0x100` is set, a `u8` length and the file's path come first.
//! - **Decompressed Size**: compressed payloads then carry a 4 byte decompressed size.
//! - **Data**: zlib for versions 103 and 104, an LZ4 frame for version 105, or the raw bytes.
//!
//! ## BA2
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: 0x58445442 ("BTDX")                               |
//! | 0x0004         | Version                | 4 bytes: 1, 7 or 8                                         |
//! | 0x0008         | Type                   | 4 bytes: "GNRL" for general files, "DX10" for textures     |
//! | 0x000C         | File Count             | 4 bytes: Number of records                                 |
//! | 0x0010         | Name Table Offset      | 8 bytes: Offset of the name table, 0 when absent           |
//!
//! ### General Records (36 bytes)
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name Hash              | 4 bytes                                                 |
//! | 0x0004         | Extension              | 4 bytes: Extension, padded with NULs                    |
//! | 0x0008         | Directory Hash         | 4 bytes                                                 |
//! | 0x000C         | Flags                  | 4 bytes                                                 |
//! | 0x0010         | Offset                 | 8 bytes: Offset of the payload                          |
//! | 0x0018         | Packed Size            | 4 bytes: Compressed size, 0 when stored as is           |
//! | 0x001C         | Unpacked Size          | 4 bytes                                                 |
//! | 0x0020         | Alignment              | 4 bytes: 0xBAADF00D                                     |
//!
//! ### Texture Records (24 bytes + 24 bytes per chunk)
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name Hash              | 4 bytes                                                 |
//! | 0x0004         | Extension              | 4 bytes                                                 |
//! | 0x0008         | Directory Hash         | 4 bytes                                                 |
//! | 0x000C         | Unknown                | 1 byte                                                  |
//! | 0x000D         | Chunk Count            | 1 byte                                                  |
//! | 0x000E         | Chunk Header Length    | 2 bytes: Always 24                                      |
//! | 0x0010         | Height                 | 2 bytes                                                 |
//! | 0x0012         | Width                  | 2 bytes                                                 |
//! | 0x0014         | Mip Count              | 1 byte                                                  |
//! | 0x0015         | Format                 | 1 byte: DXGI format code                                |
//! | 0x0016         | Reserved               | 2 bytes                                                 |
//!
//! Each chunk holds an 8 byte offset, the packed and unpacked sizes, the first and last mip level
//! it covers (2 bytes each) and the 0xBAADF00D marker. Chunks are zlib compressed unless their
//! packed size is 0.
//!
//! ### Name Table
//!
//! One entry per record, in record order: a `u16` length followed by the full path.
//!
//! ## DDS Output
//!
//! Texture records carry no DDS header. Extraction writes one in front of the chunks, see
//! [`dds`] for the supported pixel formats.

pub mod archive;
pub mod ba2;
pub mod bsa;
pub mod compression;
pub mod cursor;
pub mod dds;
pub mod error;

pub use archive::{Archive, ArchiveEntry, ArchiveOptions, EntryKind, Format};
pub use compression::CompressionMethod;
pub use error::{Error, Result};
