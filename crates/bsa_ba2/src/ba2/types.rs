//! Base types for the structure of BA2 files.

use binrw::BinRead;

use crate::cursor::decode_chars;

/// Expected size of each texture chunk record
pub const CHUNK_HEADER_SIZE: u16 = 24;

/// Which kind of records follow the header
#[derive(BinRead, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ba2Kind {
    /// Plain files
    #[br(magic = b"GNRL")]
    General,

    /// Textures split into chunks, stored without their DDS header
    #[br(magic = b"DX10")]
    Texture,
}

/// BA2 file header
///
/// Starts with "BTDX" followed by the version. All data is stored in little endian format.
#[derive(BinRead, Debug, Copy, Clone, PartialEq)]
#[br(magic = b"BTDX", little)]
pub struct Ba2Header {
    pub version: u32,

    pub kind: Ba2Kind,

    pub file_count: u32,

    /// Offset of the name table from the start of the file, `0` when there is none
    pub name_table_offset: u64,
}

impl Ba2Header {
    pub fn is_supported_version(&self) -> bool {
        matches!(self.version, 1 | 7 | 8)
    }
}

/// Record of a file in a general archive
#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[br(little)]
pub struct GeneralRecord {
    pub name_hash: u32,

    pub extension: [u8; 4],

    pub dir_hash: u32,

    pub flags: u32,

    pub offset: u64,

    /// Compressed size, `0` when the file is stored as is
    pub packed_size: u32,

    pub unpacked_size: u32,

    /// Always 0xBAADF00D
    pub align: u32,
}

impl GeneralRecord {
    pub fn extension(&self) -> String {
        decode_chars(&self.extension)
    }

    /// Number of bytes the payload occupies in the archive
    pub fn stored_size(&self) -> u32 {
        match self.packed_size {
            0 => self.unpacked_size,
            packed => packed,
        }
    }

    /// Whether the payload must be inflated
    pub fn is_compressed(&self) -> bool {
        self.packed_size != 0 && self.unpacked_size != 0 && self.packed_size != self.unpacked_size
    }
}

/// A piece of a texture, usually one or more mip levels
#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[br(little)]
pub struct TextureChunk {
    pub offset: u64,

    /// Compressed size, `0` when the chunk is stored as is
    pub packed_size: u32,

    pub unpacked_size: u32,

    pub start_mip: u16,

    pub end_mip: u16,

    /// Always 0xBAADF00D
    pub align: u32,
}

impl TextureChunk {
    pub fn stored_size(&self) -> u32 {
        match self.packed_size {
            0 => self.unpacked_size,
            packed => packed,
        }
    }
}

/// Record of a texture in a DX10 archive, followed by its chunks
#[derive(BinRead, Debug, Clone, Default, PartialEq, Eq)]
#[br(little)]
pub struct TextureRecord {
    pub name_hash: u32,

    pub extension: [u8; 4],

    pub dir_hash: u32,

    pub unknown: u8,

    pub chunk_count: u8,

    pub chunk_header_length: u16,

    pub height: u16,

    pub width: u16,

    pub mip_count: u8,

    /// DXGI format code
    pub format: u8,

    pub reserved: u16,

    #[br(count = chunk_count)]
    pub chunks: Vec<TextureChunk>,
}

impl TextureRecord {
    pub fn extension(&self) -> String {
        decode_chars(&self.extension)
    }

    /// Sum of every chunk's decompressed size
    pub fn unpacked_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.unpacked_size as u64).sum()
    }

    /// Sum of every chunk's size in the archive
    pub fn stored_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.stored_size() as u64).sum()
    }
}
