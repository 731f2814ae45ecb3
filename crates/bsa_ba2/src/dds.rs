//! DDS header synthesis for textures stored without one.
//!
//! Texture archives keep only the pixel data and a handful of fields (dimensions, mip count and a
//! DXGI format code). To hand the texture to other tools a legacy DDS header is rebuilt from those
//! fields. Formats that have no legacy representation are written with the closest four character
//! code rather than a DX10 extension header, so the header is always [`DDS_HEADER_SIZE`] bytes.

use std::io::{Cursor, Write};

use binrw::{BinRead, BinWrite};

use crate::error::Result;

/// Size of the magic and header written in front of the pixel data
pub const DDS_HEADER_SIZE: usize = 128;

pub const DDS_MAGIC: u32 = 0x2053_4444;

pub const DDS_HEADER_FLAGS_TEXTURE: u32 = 0x0000_1007;
pub const DDS_HEADER_FLAGS_MIPMAP: u32 = 0x0002_0000;
pub const DDS_HEADER_FLAGS_LINEARSIZE: u32 = 0x0008_0000;

pub const DDS_SURFACE_FLAGS_TEXTURE: u32 = 0x0000_1000;
pub const DDS_SURFACE_FLAGS_MIPMAP: u32 = 0x0040_0008;

pub const DDS_FOURCC: u32 = 0x0000_0004;
pub const DDS_RGB: u32 = 0x0000_0040;
pub const DDS_RGBA: u32 = 0x0000_0041;

/// Pack four characters into a little endian code
pub const fn make_fourcc(code: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*code)
}

/// DXGI formats a header can be built for
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DxgiFormat {
    R8Unorm = 61,
    Bc1Unorm = 71,
    Bc2Unorm = 74,
    Bc3Unorm = 77,
    Bc5Unorm = 83,
    B8G8R8A8Unorm = 87,
    Bc7Unorm = 98,
}

impl TryFrom<u8> for DxgiFormat {
    type Error = u8;

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        Ok(match value {
            61 => DxgiFormat::R8Unorm,
            71 => DxgiFormat::Bc1Unorm,
            74 => DxgiFormat::Bc2Unorm,
            77 => DxgiFormat::Bc3Unorm,
            83 => DxgiFormat::Bc5Unorm,
            87 => DxgiFormat::B8G8R8A8Unorm,
            98 => DxgiFormat::Bc7Unorm,
            other => return Err(other),
        })
    }
}

/// DDS pixel format block
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub four_cc: u32,
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

/// DDS file header, including the leading "DDS " magic
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"DDS ", little)]
pub struct DdsHeader {
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mip_map_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: DdsPixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
}

/// What a texture entry records about its pixel data
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u16,
    pub height: u16,
    pub mip_count: u8,
    pub format: DxgiFormat,
}

impl DdsHeader {
    /// Build the header for a texture.
    ///
    /// `alternate_fourcc` tags BC5 data as `ATI2` instead of `DXT5`. `ATI2` is the more accurate
    /// code but fewer tools accept it.
    pub fn for_texture(info: &TextureInfo, alternate_fourcc: bool) -> Self {
        let area = info.width as u32 * info.height as u32;
        let compressed = |four_cc: &[u8; 4]| DdsPixelFormat {
            flags: DDS_FOURCC,
            four_cc: make_fourcc(four_cc),
            ..Default::default()
        };

        let (pixel_format, pitch_or_linear_size) = match info.format {
            // 4bpp
            DxgiFormat::Bc1Unorm => (compressed(b"DXT1"), area / 2),
            DxgiFormat::Bc2Unorm => (compressed(b"DXT3"), area),
            DxgiFormat::Bc3Unorm => (compressed(b"DXT5"), area),
            DxgiFormat::Bc5Unorm if alternate_fourcc => (compressed(b"ATI2"), area),
            DxgiFormat::Bc5Unorm => (compressed(b"DXT5"), area),
            DxgiFormat::Bc7Unorm => (compressed(b"BC7\0"), area),
            DxgiFormat::B8G8R8A8Unorm => (
                DdsPixelFormat {
                    flags: DDS_RGBA,
                    rgb_bit_count: 32,
                    r_bit_mask: 0x00FF_0000,
                    g_bit_mask: 0x0000_FF00,
                    b_bit_mask: 0x0000_00FF,
                    a_bit_mask: 0xFF00_0000,
                    ..Default::default()
                },
                area.wrapping_mul(4),
            ),
            DxgiFormat::R8Unorm => (
                DdsPixelFormat {
                    flags: DDS_RGB,
                    rgb_bit_count: 8,
                    r_bit_mask: 0xFF,
                    ..Default::default()
                },
                area,
            ),
        };

        DdsHeader {
            size: (DDS_HEADER_SIZE - 4) as u32,
            flags: DDS_HEADER_FLAGS_TEXTURE | DDS_HEADER_FLAGS_LINEARSIZE | DDS_HEADER_FLAGS_MIPMAP,
            height: info.height as u32,
            width: info.width as u32,
            pitch_or_linear_size,
            mip_map_count: info.mip_count as u32,
            pixel_format: DdsPixelFormat {
                size: 32,
                ..pixel_format
            },
            caps: DDS_SURFACE_FLAGS_TEXTURE | DDS_SURFACE_FLAGS_MIPMAP,
            ..Default::default()
        }
    }

    /// Serialize the magic and header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::with_capacity(DDS_HEADER_SIZE));
        self.write(&mut out)?;
        Ok(out.into_inner())
    }
}

/// Write a complete DDS file: header followed by the pixel data of every chunk, back to back.
pub fn write_dds<W: Write + ?Sized>(
    out: &mut W,
    header: &DdsHeader,
    chunks: &[Vec<u8>],
) -> Result<u64> {
    let bytes = header.to_bytes()?;
    out.write_all(&bytes)?;

    let mut written = bytes.len() as u64;
    for chunk in chunks {
        out.write_all(chunk)?;
        written += chunk.len() as u64;
    }
    Ok(written)
}
