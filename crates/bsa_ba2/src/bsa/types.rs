//! Base types for the structure of BSA files.

use binrw::BinRead;

use crate::compression::CompressionMethod;

/// Size of the header, which every supported version records in its `offset` field
pub const HEADER_SIZE: u32 = 0x24;

/// Size bit that flips the archive's default compression for one file
pub const FILE_FLAG_COMPRESSION: u32 = 1 << 30;

/// Bits of a file's size word that hold the size itself
pub const FILE_SIZE_MASK: u32 = 0x3FFF_FFFF;

bitflags::bitflags! {
    /// Archive wide flags stored in the header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ArchiveFlags: u32 {
        /// Folder names are stored in front of each folder's file records
        const DIRECTORY_STRINGS = 1 << 0;
        /// File names are stored in a block after the file records
        const FILE_STRINGS = 1 << 1;
        /// Files are compressed unless their size word says otherwise
        const COMPRESSED = 1 << 2;
        const RETAIN_DIRECTORY_NAMES = 1 << 3;
        const RETAIN_FILE_NAMES = 1 << 4;
        const RETAIN_FILE_NAME_OFFSETS = 1 << 5;
        const XBOX_ARCHIVE = 1 << 6;
        const RETAIN_STRINGS_DURING_STARTUP = 1 << 7;
        /// Each payload starts with its full path (version 104 and later)
        const EMBEDDED_FILE_NAMES = 1 << 8;
        const XBOX_COMPRESSED = 1 << 9;
    }
}

/// Layout family of a BSA archive, selected by its version
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Variant {
    /// Versions 103 and 104: narrow folder records and zlib payloads
    Classic,
    /// Version 105: wide folder records and LZ4 frame payloads
    Modern,
}

impl Variant {
    pub fn from_version(version: u32) -> Option<Self> {
        match version {
            103 | 104 => Some(Variant::Classic),
            105 => Some(Variant::Modern),
            _ => None,
        }
    }

    /// Size of one folder record on disk
    pub const fn folder_record_size(self) -> u64 {
        match self {
            Variant::Classic => 16,
            Variant::Modern => 24,
        }
    }

    pub const fn compression(self) -> CompressionMethod {
        match self {
            Variant::Classic => CompressionMethod::Zlib,
            Variant::Modern => CompressionMethod::Lz4Frame,
        }
    }
}

/// BSA file header
///
/// Starts with "BSA\0" followed by the version. All data is stored in little endian format.
#[derive(BinRead, Debug, Copy, Clone, PartialEq)]
#[br(magic = b"BSA\0", little)]
pub struct BsaHeader {
    /// Format version, one of 103, 104 or 105
    pub version: u32,

    /// Offset of the folder records, always the size of this header
    pub offset: u32,

    #[br(map = |bits: u32| ArchiveFlags::from_bits_retain(bits))]
    pub archive_flags: ArchiveFlags,

    pub folder_count: u32,

    pub file_count: u32,

    /// Length of all folder names including their terminators
    pub folder_names_length: u32,

    /// Length of the file name block
    pub file_names_length: u32,

    /// Kinds of content stored in the archive
    pub file_flags: u32,
}

impl BsaHeader {
    pub fn variant(&self) -> Option<Variant> {
        Variant::from_version(self.version)
    }

    /// Whether payloads are preceded by their full path.
    ///
    /// Version 103 used this bit for something else, so it is only honoured from 104 on.
    pub fn embedded_names(&self) -> bool {
        self.version >= 104 && self.archive_flags.contains(ArchiveFlags::EMBEDDED_FILE_NAMES)
    }

    pub fn compressed_by_default(&self) -> bool {
        self.archive_flags.contains(ArchiveFlags::COMPRESSED)
    }
}

/// Folder record as found after the header
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FolderRecord {
    pub hash: u64,
    pub file_count: u32,
    pub offset: u64,
}

/// File record as found in each folder's block
#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[br(little)]
pub struct FileRecord {
    pub hash: u64,

    /// Size of the payload, with [`FILE_FLAG_COMPRESSION`] in the upper bits
    pub size_flags: u32,

    /// Offset of the payload from the start of the archive
    pub offset: u32,
}

impl FileRecord {
    pub fn size(&self) -> u32 {
        self.size_flags & FILE_SIZE_MASK
    }

    pub fn toggles_compression(&self) -> bool {
        self.size_flags & FILE_FLAG_COMPRESSION != 0
    }
}

/// Extra per-file information kept for version 105 archives
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModernRecord {
    /// Where the payload starts, including any embedded name
    pub offset: u64,

    /// The raw size word of the file record
    pub size_flags: u32,

    /// The payload is preceded by a length prefixed copy of its path
    pub name_prefix: bool,
}

impl ModernRecord {
    pub fn size(&self) -> u32 {
        self.size_flags & FILE_SIZE_MASK
    }
}

/// A file stored in a BSA archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFile {
    pub hash: u64,

    /// Index of the folder this file was listed under
    pub folder: usize,

    pub offset: u32,

    /// Size on disk, including an embedded name and the size prefix of compressed files
    pub size: u32,

    pub compressed: bool,

    /// Decompressed size when already known, `0` when it has to be read from the payload.
    ///
    /// None of the supported versions record it in the directory, so entries read from an archive
    /// always start at `0`.
    pub uncompressed_size: u32,

    /// Present for version 105 archives only
    pub record: Option<ModernRecord>,
}
