//! Archive and entry types shared by both formats

use std::{
    fmt::{self, Debug},
    fs::File,
    io::{BufReader, Read, Seek, Write},
    path::Path,
    sync::{Arc, OnceLock},
};

use bon::Builder;
use indexmap::IndexMap;
use tracing::{debug, instrument, warn};

use crate::{
    ba2::{self, Ba2Header, GeneralRecord, TextureRecord},
    bsa::{self, BsaLayout, LegacyFile},
    compression::Decompressor,
    cursor::ByteCursor,
    dds::DDS_HEADER_SIZE,
    error::{EntryNotFoundError, Error, Result},
};

const BSA_MAGIC: u32 = u32::from_le_bytes(*b"BSA\0");
const BA2_MAGIC: u32 = u32::from_le_bytes(*b"BTDX");

/// Container format of an archive, picked from its signature
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Format {
    /// Legacy indexed archive, `BSA\0`
    Bsa,
    /// Chunked archive, `BTDX`
    Ba2,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Bsa => write!(f, "BSA"),
            Format::Ba2 => write!(f, "BA2"),
        }
    }
}

/// Options for how entries are extracted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Builder)]
pub struct ArchiveOptions {
    /// Tag BC5 textures as `ATI2` instead of `DXT5`
    #[builder(default)]
    pub use_alternate_fourcc: bool,
}

/// The format specific record behind an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A file in a BSA archive
    Legacy(LegacyFile),
    /// A file in a general BA2 archive
    General(GeneralRecord),
    /// A texture in a DX10 BA2 archive
    Texture(TextureRecord),
}

/// One file stored in an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    index: usize,
    full_path: OnceLock<Box<str>>,
    kind: EntryKind,
}

impl ArchiveEntry {
    pub(crate) fn new(index: usize, kind: EntryKind) -> Self {
        Self {
            index,
            full_path: OnceLock::new(),
            kind,
        }
    }

    /// Position of the entry in the archive's directory
    pub fn index(&self) -> usize {
        self.index
    }

    /// Full path of the entry, with `\` separators. Blank until names are resolved.
    ///
    /// # Warnings
    ///
    /// The path comes straight from the archive. It may be absolute or contain `..`
    /// components, so check it before using it to build a path on disk.
    pub fn full_path(&self) -> &str {
        self.full_path.get().map_or("", |p| p.as_ref())
    }

    /// Set the path once. Returns `false` if it was already set.
    pub(crate) fn assign_path(&self, path: Box<str>) -> bool {
        self.full_path.set(path).is_ok()
    }

    /// Size shown to users.
    ///
    /// BSA files report their size in the archive since the decompressed size is often only
    /// known after extraction. Textures report the sum of their decompressed chunks.
    pub fn display_size(&self) -> u64 {
        match &self.kind {
            EntryKind::Legacy(file) => file.size as u64,
            EntryKind::General(record) => record.unpacked_size as u64,
            EntryKind::Texture(record) => record.unpacked_size(),
        }
    }

    /// Number of bytes the entry occupies in the archive
    pub fn size(&self) -> u64 {
        match &self.kind {
            EntryKind::Legacy(file) => file.size as u64,
            EntryKind::General(record) => record.stored_size() as u64,
            EntryKind::Texture(record) => record.stored_size(),
        }
    }

    /// Whether the payload is compressed.
    ///
    /// Textures are judged by their first chunk only.
    pub fn compressed(&self) -> bool {
        match &self.kind {
            EntryKind::Legacy(file) => file.compressed,
            EntryKind::General(record) => record.is_compressed(),
            EntryKind::Texture(record) => record
                .chunks
                .first()
                .is_some_and(|chunk| chunk.packed_size != 0),
        }
    }

    /// Where the payload starts.
    ///
    /// For textures this is the first chunk's offset. Chunks are not always contiguous, so it
    /// is only an approximation of where the texture lives.
    pub fn offset(&self) -> u64 {
        match &self.kind {
            EntryKind::Legacy(file) => file
                .record
                .map_or(file.offset as u64, |record| record.offset),
            EntryKind::General(record) => record.offset,
            EntryKind::Texture(record) => record.chunks.first().map_or(0, |chunk| chunk.offset),
        }
    }

    /// Decompressed size as recorded in the archive, `0` when it is not recorded
    pub fn uncompressed_size(&self) -> u64 {
        match &self.kind {
            EntryKind::Legacy(file) => file.uncompressed_size as u64,
            EntryKind::General(record) => record.unpacked_size as u64,
            EntryKind::Texture(record) => record.unpacked_size(),
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> String {
        match &self.kind {
            EntryKind::General(record) => record.extension(),
            EntryKind::Texture(record) => record.extension(),
            EntryKind::Legacy(_) => self
                .full_path()
                .rsplit(['\\', '/'])
                .next()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext.to_owned())
                .unwrap_or_default(),
        }
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }
}

#[derive(Debug)]
pub(crate) enum Layout {
    Bsa(BsaLayout),
    Ba2(Ba2Header),
}

#[derive(Debug)]
pub(crate) struct Shared {
    layout: Layout,
    entries: Vec<ArchiveEntry>,
    names: IndexMap<Box<str>, usize>,
}

/// Archive reader for BSA and BA2 files
///
/// The tables are read once when the archive is opened and shared between every [`Archive`]
/// made with [`Archive::with_reader`]. Extraction moves the reader and reuses the
/// decompressor, so it needs `&mut self`; give each thread its own archive through
/// [`Archive::with_reader`] or put a single one behind a lock.
///
/// ```no_run
/// fn list_archive_contents(path: &str) -> bsa_ba2::error::Result<()> {
///     let mut archive = bsa_ba2::Archive::open(path)?;
///
///     for i in 0..archive.len() {
///         println!("Filename: {}", archive.entry(i)?.full_path());
///         archive.extract(i, &mut std::io::stdout())?;
///     }
///
///     Ok(())
/// }
/// ```
pub struct Archive<R> {
    reader: ByteCursor<R>,
    decompressor: Decompressor,
    options: ArchiveOptions,
    shared: Arc<Shared>,
}

impl<R> Debug for Archive<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Archive")
            .field("format", &self.format())
            .field("version", &self.version())
            .field("entries", &self.len())
            .field("options", &self.options)
            .finish()
    }
}

impl Archive<BufReader<File>> {
    /// Open the archive at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ArchiveOptions::default())
    }

    /// Open the archive at `path` with the given options.
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ArchiveOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Archive::with_options(BufReader::new(file), options)
    }
}

impl<R> Archive<R> {
    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    /// Whether the archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, in directory order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.shared.entries
    }

    /// Get an entry by index
    pub fn entry(&self, index: usize) -> Result<&ArchiveEntry> {
        self.shared
            .entries
            .get(index)
            .ok_or(Error::EntryNotFound(EntryNotFoundError::Index(index)))
    }

    /// Get the index of an entry by its full path, if it's present.
    ///
    /// Paths are matched exactly. When an archive lists a path twice the first entry wins.
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.shared.names.get(name).copied()
    }

    /// Search for an entry by its full path
    pub fn by_name(&self, name: &str) -> Result<&ArchiveEntry> {
        let Some(index) = self.index_for_name(name) else {
            return Err(Error::EntryNotFound(EntryNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.entry(index)
    }

    /// Returns an iterator over the full path of every entry, in directory order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.shared.entries.iter().map(|e| e.full_path())
    }

    pub fn format(&self) -> Format {
        match self.shared.layout {
            Layout::Bsa(_) => Format::Bsa,
            Layout::Ba2(_) => Format::Ba2,
        }
    }

    pub fn version(&self) -> u32 {
        match &self.shared.layout {
            Layout::Bsa(layout) => layout.header.version,
            Layout::Ba2(header) => header.version,
        }
    }

    pub fn options(&self) -> ArchiveOptions {
        self.options
    }

    /// Replace the options used by later extractions.
    pub fn set_options(&mut self, options: ArchiveOptions) {
        self.options = options;
    }

    /// Total size of the extracted files, if it can be known without reading them.
    ///
    /// Compressed BSA files and files with an embedded name only reveal their size when read.
    pub fn decompressed_size(&self) -> Option<u128> {
        let embedded_names = match &self.shared.layout {
            Layout::Bsa(layout) => layout.header.embedded_names(),
            Layout::Ba2(_) => false,
        };

        let mut total = 0u128;
        for entry in &self.shared.entries {
            let size = match &entry.kind {
                EntryKind::Legacy(file) if file.uncompressed_size != 0 => file.uncompressed_size as u64,
                EntryKind::Legacy(file) if file.compressed || embedded_names => return None,
                EntryKind::Legacy(file) => file.size as u64,
                EntryKind::General(record) => record.unpacked_size as u64,
                EntryKind::Texture(record) => DDS_HEADER_SIZE as u64 + record.unpacked_size(),
            };
            total = total.checked_add(size as u128)?;
        }
        Some(total)
    }

    /// Make an archive over another reader of the same file, sharing the tables read from this
    /// one. The new archive gets its own decompressor and starts with the same options.
    pub fn with_reader<R2: Read + Seek>(&self, reader: R2) -> Result<Archive<R2>> {
        Ok(Archive {
            reader: ByteCursor::new(reader)?,
            decompressor: Decompressor::new(),
            options: self.options,
            shared: Arc::clone(&self.shared),
        })
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Read an archive with the default options.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, ArchiveOptions::default())
    }

    /// Read an archive's tables and resolve every entry's path.
    #[instrument(skip(reader), err)]
    pub fn with_options(reader: R, options: ArchiveOptions) -> Result<Self> {
        let mut reader = ByteCursor::new(reader)?;
        let (layout, kinds) = Self::read_tables(&mut reader)?;
        check_bounds(&kinds, reader.stream_len()?)?;

        let entries = kinds
            .into_iter()
            .enumerate()
            .map(|(index, kind)| ArchiveEntry::new(index, kind))
            .collect::<Vec<_>>();

        let paths = read_names(&mut reader, &layout, &entries)?;
        let mut names = IndexMap::with_capacity(entries.len());
        for (entry, path) in entries.iter().zip(paths) {
            names.entry(path.clone()).or_insert(entry.index);
            entry.assign_path(path);
        }

        let archive = Archive {
            reader,
            decompressor: Decompressor::new(),
            options,
            shared: Arc::new(Shared {
                layout,
                entries,
                names,
            }),
        };
        debug!(
            format = %archive.format(),
            version = archive.version(),
            entries = archive.len(),
            "opened archive"
        );
        Ok(archive)
    }

    fn read_tables(reader: &mut ByteCursor<R>) -> Result<(Layout, Vec<EntryKind>)> {
        reader.seek(0)?;
        let magic = reader.read_u32().map_err(|e| match e {
            Error::Truncated { .. } => Error::InvalidFormat("file is too short".to_owned()),
            e => e,
        })?;

        match magic {
            BSA_MAGIC => {
                let header = bsa::read::read_header(reader)?;
                let (layout, files) = bsa::read::read_directory(reader, header)?;
                let kinds = files.into_iter().map(EntryKind::Legacy).collect();
                Ok((Layout::Bsa(layout), kinds))
            }
            BA2_MAGIC => {
                let header = ba2::read::read_header(reader)?;
                let kinds = ba2::read::read_records(reader, &header)?;
                Ok((Layout::Ba2(header), kinds))
            }
            other => Err(Error::InvalidFormat(format!(
                "unrecognised signature {other:#010x}"
            ))),
        }
    }

    /// Read every entry's path from the archive again.
    ///
    /// Paths are fixed when the archive is opened; this returns what the archive records now,
    /// in directory order, and leaves the entries untouched.
    pub fn resolve_names(&mut self) -> Result<Vec<Box<str>>> {
        let paths = read_names(&mut self.reader, &self.shared.layout, &self.shared.entries)?;
        for (entry, path) in self.shared.entries.iter().zip(&paths) {
            if entry.full_path() != &**path {
                warn!(index = entry.index, old = entry.full_path(), new = %path, "path changed");
            }
        }
        Ok(paths)
    }

    /// Extract an entry into `out`, returning the number of bytes written.
    ///
    /// Texture entries are written as a complete DDS file. A failure only concerns this entry;
    /// the archive stays usable.
    pub fn extract<W: Write + ?Sized>(&mut self, index: usize, out: &mut W) -> Result<u64> {
        let data = self.extract_to_vec(index)?;
        out.write_all(&data)?;
        Ok(data.len() as u64)
    }

    /// Extract an entry into memory.
    #[instrument(skip(self), err)]
    pub fn extract_to_vec(&mut self, index: usize) -> Result<Vec<u8>> {
        let entry = self
            .shared
            .entries
            .get(index)
            .ok_or(EntryNotFoundError::Index(index))?;

        match (&self.shared.layout, &entry.kind) {
            (Layout::Bsa(layout), EntryKind::Legacy(file)) => bsa::read::extract(
                &mut self.reader,
                &mut self.decompressor,
                layout,
                index,
                file,
            ),
            (Layout::Ba2(_), EntryKind::General(record)) => ba2::read::extract_general(
                &mut self.reader,
                &mut self.decompressor,
                index,
                record,
            ),
            (Layout::Ba2(_), EntryKind::Texture(record)) => ba2::read::extract_texture(
                &mut self.reader,
                &mut self.decompressor,
                index,
                record,
                self.options.use_alternate_fourcc,
            ),
            _ => Err(Error::InvalidFormat(format!(
                "entry {index} does not match the archive layout"
            ))),
        }
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

fn read_names<R: Read + Seek>(
    reader: &mut ByteCursor<R>,
    layout: &Layout,
    entries: &[ArchiveEntry],
) -> Result<Vec<Box<str>>> {
    match layout {
        Layout::Bsa(layout) => {
            let files = entries.iter().filter_map(|e| match &e.kind {
                EntryKind::Legacy(file) => Some(file),
                _ => None,
            });
            bsa::read::read_names(reader, layout, files)
        }
        Layout::Ba2(header) => ba2::read::read_names(reader, header, entries.iter().map(|e| &e.kind)),
    }
}

/// Make sure every payload lies inside the archive.
fn check_bounds(kinds: &[EntryKind], len: u64) -> Result<()> {
    let check = |index: usize, offset: u64, size: u64| {
        match offset.checked_add(size) {
            Some(end) if end <= len => Ok(()),
            _ => Err(Error::InvalidFormat(format!(
                "entry {index} spans {offset:#x}+{size:#x}, past the end of the archive ({len:#x} bytes)"
            ))),
        }
    };

    for (index, kind) in kinds.iter().enumerate() {
        match kind {
            EntryKind::Legacy(file) => {
                let offset = file.record.map_or(file.offset as u64, |r| r.offset);
                check(index, offset, file.size as u64)?
            }
            EntryKind::General(record) => {
                check(index, record.offset, record.stored_size() as u64)?
            }
            EntryKind::Texture(record) => {
                for chunk in &record.chunks {
                    check(index, chunk.offset, chunk.stored_size() as u64)?
                }
            }
        }
    }
    Ok(())
}
