//! Builders for small archives used by the integration tests.
#![allow(dead_code)]

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn lz4_frame(data: &[u8]) -> Vec<u8> {
    let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Payload of a compressed BSA file: the decompressed size followed by the stream
pub fn sized(data: &[u8], stream: Vec<u8>) -> Vec<u8> {
    let mut payload = (data.len() as u32).to_le_bytes().to_vec();
    payload.extend(stream);
    payload
}

/// Prefix a payload with an embedded path
pub fn with_name(path: &str, payload: Vec<u8>) -> Vec<u8> {
    let mut out = vec![path.len() as u8];
    out.extend(path.as_bytes());
    out.extend(payload);
    out
}

pub struct BsaFile {
    pub name: String,
    /// Exactly what is stored at the file's offset
    pub payload: Vec<u8>,
    /// Sets bit 30 of the size word
    pub toggle: bool,
}

impl BsaFile {
    pub fn new(name: &str, payload: Vec<u8>) -> Self {
        Self {
            name: name.to_owned(),
            payload,
            toggle: false,
        }
    }

    pub fn toggled(mut self) -> Self {
        self.toggle = true;
        self
    }
}

pub struct BsaBuilder {
    pub version: u32,
    pub flags: u32,
    pub folders: Vec<(String, Vec<BsaFile>)>,
}

impl BsaBuilder {
    pub fn new(version: u32, flags: u32) -> Self {
        Self {
            version,
            flags,
            folders: Vec::new(),
        }
    }

    pub fn folder(mut self, name: &str, files: Vec<BsaFile>) -> Self {
        self.folders.push((name.to_owned(), files));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let modern = self.version == 105;
        let directory_strings = self.flags & 0x1 != 0;
        let file_strings = self.flags & 0x2 != 0;
        let files = || self.folders.iter().flat_map(|(_, files)| files);

        let folder_names_length: usize = self.folders.iter().map(|(n, _)| n.len() + 1).sum();
        let file_names_length: usize = files().map(|f| f.name.len() + 1).sum();
        let file_count = files().count();

        let mut data_offset = 36
            + self.folders.len() * if modern { 24 } else { 16 }
            + if directory_strings {
                folder_names_length + self.folders.len()
            } else {
                0
            }
            + file_count * 16
            + if file_strings { file_names_length } else { 0 };

        let mut out = Vec::new();
        out.extend(b"BSA\0");
        for value in [
            self.version,
            36,
            self.flags,
            self.folders.len() as u32,
            file_count as u32,
            folder_names_length as u32,
            file_names_length as u32,
            0,
        ] {
            out.extend(value.to_le_bytes());
        }

        for (i, (_, files)) in self.folders.iter().enumerate() {
            out.extend((0x1000 + i as u64).to_le_bytes());
            out.extend((files.len() as u32).to_le_bytes());
            if modern {
                out.extend(0u32.to_le_bytes());
                out.extend(0u64.to_le_bytes());
            } else {
                out.extend(0u32.to_le_bytes());
            }
        }

        for (i, (name, files)) in self.folders.iter().enumerate() {
            if directory_strings {
                out.push(name.len() as u8 + 1);
                out.extend(name.as_bytes());
                out.push(0);
            }
            for (j, file) in files.iter().enumerate() {
                let size_flags = file.payload.len() as u32 | if file.toggle { 1 << 30 } else { 0 };
                out.extend((((i as u64) << 32) | j as u64).to_le_bytes());
                out.extend(size_flags.to_le_bytes());
                out.extend((data_offset as u32).to_le_bytes());
                data_offset += file.payload.len();
            }
        }

        if file_strings {
            for file in files() {
                out.extend(file.name.as_bytes());
                out.push(0);
            }
        }

        for file in files() {
            out.extend(&file.payload);
        }
        out
    }
}

pub struct GeneralFile {
    pub path: String,
    pub stored: Vec<u8>,
    pub packed_size: u32,
    pub unpacked_size: u32,
}

impl GeneralFile {
    pub fn stored(path: &str, data: &[u8]) -> Self {
        Self {
            path: path.to_owned(),
            stored: data.to_vec(),
            packed_size: 0,
            unpacked_size: data.len() as u32,
        }
    }

    pub fn zlib(path: &str, data: &[u8]) -> Self {
        let stored = zlib(data);
        Self {
            path: path.to_owned(),
            packed_size: stored.len() as u32,
            stored,
            unpacked_size: data.len() as u32,
        }
    }
}

pub struct Chunk {
    pub stored: Vec<u8>,
    pub packed_size: u32,
    pub unpacked_size: u32,
}

impl Chunk {
    pub fn stored(data: &[u8]) -> Self {
        Self {
            stored: data.to_vec(),
            packed_size: 0,
            unpacked_size: data.len() as u32,
        }
    }

    pub fn zlib(data: &[u8]) -> Self {
        let stored = zlib(data);
        Self {
            packed_size: stored.len() as u32,
            stored,
            unpacked_size: data.len() as u32,
        }
    }
}

pub struct TextureFile {
    pub path: String,
    pub width: u16,
    pub height: u16,
    pub mip_count: u8,
    pub format: u8,
    pub chunks: Vec<Chunk>,
}

impl TextureFile {
    pub fn new(path: &str, format: u8, chunks: Vec<Chunk>) -> Self {
        Self {
            path: path.to_owned(),
            width: 256,
            height: 256,
            mip_count: chunks.len() as u8,
            format,
            chunks,
        }
    }
}

fn ba2_header(out: &mut Vec<u8>, version: u32, kind: &[u8; 4], count: usize, names: u64) {
    out.extend(b"BTDX");
    out.extend(version.to_le_bytes());
    out.extend(kind);
    out.extend((count as u32).to_le_bytes());
    out.extend(names.to_le_bytes());
}

fn name_table<'a>(out: &mut Vec<u8>, paths: impl Iterator<Item = &'a str>) {
    for path in paths {
        out.extend((path.len() as u16).to_le_bytes());
        out.extend(path.as_bytes());
    }
}

/// A general archive, with a name table when `names` is set
pub fn general_ba2(version: u32, files: &[GeneralFile], names: bool) -> Vec<u8> {
    let mut offset = 24 + files.len() * 36;
    let names_offset = offset + files.iter().map(|f| f.stored.len()).sum::<usize>();

    let mut out = Vec::new();
    ba2_header(
        &mut out,
        version,
        b"GNRL",
        files.len(),
        if names { names_offset as u64 } else { 0 },
    );

    for (i, file) in files.iter().enumerate() {
        out.extend((0x100 + i as u32).to_le_bytes());
        out.extend(extension(&file.path));
        out.extend(0x200u32.to_le_bytes());
        out.extend(0u32.to_le_bytes());
        out.extend((offset as u64).to_le_bytes());
        out.extend(file.packed_size.to_le_bytes());
        out.extend(file.unpacked_size.to_le_bytes());
        out.extend(0xBAADF00Du32.to_le_bytes());
        offset += file.stored.len();
    }
    for file in files {
        out.extend(&file.stored);
    }
    if names {
        name_table(&mut out, files.iter().map(|f| f.path.as_str()));
    }
    out
}

/// A texture archive with a name table
pub fn texture_ba2(version: u32, textures: &[TextureFile]) -> Vec<u8> {
    let mut offset = 24
        + textures
            .iter()
            .map(|t| 24 + t.chunks.len() * 24)
            .sum::<usize>();
    let names_offset = offset
        + textures
            .iter()
            .flat_map(|t| &t.chunks)
            .map(|c| c.stored.len())
            .sum::<usize>();

    let mut out = Vec::new();
    ba2_header(&mut out, version, b"DX10", textures.len(), names_offset as u64);

    for (i, texture) in textures.iter().enumerate() {
        out.extend((0x100 + i as u32).to_le_bytes());
        out.extend(extension(&texture.path));
        out.extend(0x200u32.to_le_bytes());
        out.push(0);
        out.push(texture.chunks.len() as u8);
        out.extend(24u16.to_le_bytes());
        out.extend(texture.height.to_le_bytes());
        out.extend(texture.width.to_le_bytes());
        out.push(texture.mip_count);
        out.push(texture.format);
        out.extend(0u16.to_le_bytes());

        for (mip, chunk) in texture.chunks.iter().enumerate() {
            out.extend((offset as u64).to_le_bytes());
            out.extend(chunk.packed_size.to_le_bytes());
            out.extend(chunk.unpacked_size.to_le_bytes());
            out.extend((mip as u16).to_le_bytes());
            out.extend((mip as u16).to_le_bytes());
            out.extend(0xBAADF00Du32.to_le_bytes());
            offset += chunk.stored.len();
        }
    }
    for chunk in textures.iter().flat_map(|t| &t.chunks) {
        out.extend(&chunk.stored);
    }
    name_table(&mut out, textures.iter().map(|t| t.path.as_str()));
    out
}

fn extension(path: &str) -> [u8; 4] {
    let mut out = [0u8; 4];
    let ext = path.rsplit_once('.').map_or("", |(_, ext)| ext).as_bytes();
    let len = ext.len().min(4);
    out[..len].copy_from_slice(&ext[..len]);
    out
}
