mod common;

use std::io::{Cursor, Write};

use bsa_ba2::{
    error::{DecompressionError, EntryNotFoundError, Error},
    Archive, Format,
};
use common::{lz4_frame, sized, with_name, zlib, BsaBuilder, BsaFile};
use pretty_assertions::assert_eq;
use tracing::info;
use tracing_test::traced_test;

const HELLO: &[u8] = b"Hello World";
const LOREM: &[u8] = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, lorem ipsum";

fn two_folders(version: u32) -> Vec<u8> {
    BsaBuilder::new(version, 0x3)
        .folder(
            "meshes\\armor",
            vec![
                BsaFile::new("helmet.nif", HELLO.to_vec()),
                BsaFile::new("boots.nif", LOREM.to_vec()),
            ],
        )
        .folder("textures", vec![BsaFile::new("sky.dds", b"0123456789".to_vec())])
        .build()
}

#[traced_test]
#[test]
fn read_classic_uncompressed() -> Result<(), Error> {
    let mut archive = Archive::new(Cursor::new(two_folders(103)))?;

    assert_eq!(archive.format(), Format::Bsa);
    assert_eq!(archive.version(), 103);
    assert_eq!(archive.len(), 3);
    assert_eq!(
        archive.file_names().collect::<Vec<_>>(),
        vec![
            "meshes\\armor\\helmet.nif",
            "meshes\\armor\\boots.nif",
            "textures\\sky.dds"
        ]
    );

    for entry in archive.entries() {
        info!(path = entry.full_path(), size = entry.display_size(), "entry");
        assert!(!entry.compressed());
        assert_eq!(entry.uncompressed_size(), 0);
    }
    assert_eq!(archive.entry(2)?.extension(), "dds");

    // stored entries come back exactly as archived
    assert_eq!(archive.extract_to_vec(0)?, HELLO);
    assert_eq!(archive.extract_to_vec(1)?, LOREM);
    assert_eq!(archive.extract_to_vec(2)?, b"0123456789");
    assert_eq!(archive.decompressed_size(), Some((HELLO.len() + LOREM.len() + 10) as u128));

    Ok(())
}

#[traced_test]
#[test]
fn lookup_by_name() -> Result<(), Error> {
    let mut archive = Archive::new(Cursor::new(two_folders(104)))?;

    assert_eq!(archive.index_for_name("textures\\sky.dds"), Some(2));
    assert_eq!(archive.index_for_name("textures/sky.dds"), None);
    assert_eq!(archive.by_name("meshes\\armor\\boots.nif")?.index(), 1);

    assert!(matches!(
        archive.by_name("missing.txt"),
        Err(Error::EntryNotFound(EntryNotFoundError::Name(_)))
    ));
    assert!(matches!(
        archive.entry(3),
        Err(Error::EntryNotFound(EntryNotFoundError::Index(3)))
    ));
    assert!(matches!(
        archive.extract_to_vec(3),
        Err(Error::EntryNotFound(EntryNotFoundError::Index(3)))
    ));

    let mut out = Vec::new();
    let written = archive.extract(1, &mut out)?;
    assert_eq!(written, LOREM.len() as u64);
    assert_eq!(out, LOREM);

    Ok(())
}

#[traced_test]
#[test]
fn read_classic_compressed() -> Result<(), Error> {
    let input = BsaBuilder::new(104, 0x7)
        .folder(
            "scripts",
            vec![
                BsaFile::new("a.pex", sized(LOREM, zlib(LOREM))),
                BsaFile::new("b.pex", HELLO.to_vec()).toggled(),
            ],
        )
        .build();
    let mut archive = Archive::new(Cursor::new(input))?;

    let first = archive.entry(0)?;
    assert!(first.compressed());
    assert_eq!(first.size() as usize, 4 + zlib(LOREM).len());
    assert!(!archive.entry(1)?.compressed());

    // the leading size decides how much is inflated
    assert_eq!(archive.extract_to_vec(0)?, LOREM);
    assert_eq!(archive.extract_to_vec(1)?, HELLO);
    assert_eq!(archive.decompressed_size(), None);

    Ok(())
}

#[traced_test]
#[test]
fn toggle_compresses_single_file() -> Result<(), Error> {
    let input = BsaBuilder::new(103, 0x3)
        .folder(
            "sound",
            vec![
                BsaFile::new("a.wav", sized(LOREM, zlib(LOREM))).toggled(),
                BsaFile::new("b.wav", HELLO.to_vec()),
            ],
        )
        .build();
    let mut archive = Archive::new(Cursor::new(input))?;

    assert!(archive.entry(0)?.compressed());
    assert!(!archive.entry(1)?.compressed());
    assert_eq!(archive.extract_to_vec(0)?, LOREM);
    assert_eq!(archive.extract_to_vec(1)?, HELLO);

    Ok(())
}

#[traced_test]
#[test]
fn read_embedded_names() -> Result<(), Error> {
    let input = BsaBuilder::new(104, 0x107)
        .folder(
            "interface",
            vec![
                BsaFile::new(
                    "a.swf",
                    with_name("interface\\a.swf", sized(LOREM, zlib(LOREM))),
                ),
                BsaFile::new("b.txt", with_name("interface\\b.txt", HELLO.to_vec())).toggled(),
            ],
        )
        .build();
    let mut archive = Archive::new(Cursor::new(input))?;

    assert_eq!(archive.extract_to_vec(0)?, LOREM);
    assert_eq!(archive.extract_to_vec(1)?, HELLO);
    assert_eq!(archive.decompressed_size(), None);

    Ok(())
}

#[traced_test]
#[test]
fn embedded_name_flag_ignored_before_104() -> Result<(), Error> {
    let input = BsaBuilder::new(103, 0x103)
        .folder("misc", vec![BsaFile::new("a.txt", HELLO.to_vec())])
        .build();
    let mut archive = Archive::new(Cursor::new(input))?;

    assert_eq!(archive.extract_to_vec(0)?, HELLO);

    Ok(())
}

#[traced_test]
#[test]
fn read_modern_lz4() -> Result<(), Error> {
    let input = BsaBuilder::new(105, 0x107)
        .folder(
            "meshes",
            vec![
                BsaFile::new("a.nif", with_name("meshes\\a.nif", sized(LOREM, lz4_frame(LOREM)))),
                BsaFile::new("b.nif", with_name("meshes\\b.nif", HELLO.to_vec())).toggled(),
            ],
        )
        .folder(
            "textures",
            vec![BsaFile::new("c.dds", with_name("textures\\c.dds", sized(HELLO, lz4_frame(HELLO))))],
        )
        .build();
    let mut archive = Archive::new(Cursor::new(input))?;

    assert_eq!(archive.version(), 105);
    assert_eq!(
        archive.file_names().collect::<Vec<_>>(),
        vec!["meshes\\a.nif", "meshes\\b.nif", "textures\\c.dds"]
    );
    assert_eq!(archive.extract_to_vec(0)?, LOREM);
    assert_eq!(archive.extract_to_vec(1)?, HELLO);
    assert_eq!(archive.extract_to_vec(2)?, HELLO);

    Ok(())
}

#[traced_test]
#[test]
fn names_fall_back_to_hashes() -> Result<(), Error> {
    let input = BsaBuilder::new(104, 0x0)
        .folder("ignored", vec![BsaFile::new("a.txt", HELLO.to_vec())])
        .build();
    let mut archive = Archive::new(Cursor::new(input))?;

    assert_eq!(archive.entry(0)?.full_path(), "0000000000000000");
    assert_eq!(archive.extract_to_vec(0)?, HELLO);

    let input = BsaBuilder::new(104, 0x1)
        .folder("misc", vec![BsaFile::new("a.txt", HELLO.to_vec())])
        .build();
    let archive = Archive::new(Cursor::new(input))?;
    assert_eq!(archive.entry(0)?.full_path(), "misc\\0000000000000000");

    Ok(())
}

#[traced_test]
#[test]
fn name_resolution_is_idempotent() -> Result<(), Error> {
    let mut archive = Archive::new(Cursor::new(two_folders(104)))?;

    let first = archive.resolve_names()?;
    let second = archive.resolve_names()?;
    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(|p| &**p).collect::<Vec<&str>>(),
        archive.file_names().collect::<Vec<_>>()
    );

    Ok(())
}

#[traced_test]
#[test]
fn corrupt_payload_is_isolated() -> Result<(), Error> {
    let mut stream = zlib(LOREM);
    let len = stream.len();
    stream[2..len - 4].fill(0xFF);

    let input = BsaBuilder::new(104, 0x7)
        .folder(
            "scripts",
            vec![
                BsaFile::new("bad.pex", sized(LOREM, stream)),
                BsaFile::new("good.pex", sized(HELLO, zlib(HELLO))),
            ],
        )
        .build();
    let mut archive = Archive::new(Cursor::new(input))?;

    assert!(matches!(
        archive.extract_to_vec(0),
        Err(Error::Decompression { index: 0, .. })
    ));
    // the archive stays usable after a failed entry
    assert_eq!(archive.extract_to_vec(1)?, HELLO);

    Ok(())
}

#[traced_test]
#[test]
fn declared_size_too_large() -> Result<(), Error> {
    let mut payload = sized(HELLO, zlib(HELLO));
    payload[0] = 0x40;

    let input = BsaBuilder::new(104, 0x7)
        .folder("misc", vec![BsaFile::new("a.txt", payload)])
        .build();
    let mut archive = Archive::new(Cursor::new(input))?;

    assert!(matches!(
        archive.extract_to_vec(0),
        Err(Error::Decompression {
            index: 0,
            source: DecompressionError::SizeMismatch {
                expected: 0x40,
                actual: 11
            }
        })
    ));

    Ok(())
}

#[traced_test]
#[test]
fn payloads_fit_in_file() -> Result<(), Error> {
    let input = two_folders(104);
    let archive = Archive::new(Cursor::new(input.clone()))?;

    // stored payloads plus the tables never exceed the file
    let stored: u64 = archive
        .entries()
        .iter()
        .filter(|e| !e.compressed())
        .map(|e| e.size())
        .sum();
    let tables = archive.entries().iter().map(|e| e.offset()).min().unwrap_or(0);
    assert!(stored + tables <= input.len() as u64);

    // cutting off the last payload byte is caught when opening
    let short = input[..input.len() - 1].to_vec();
    assert!(matches!(
        Archive::new(Cursor::new(short)),
        Err(Error::InvalidFormat(_))
    ));

    Ok(())
}

#[traced_test]
#[test]
fn reject_invalid_archives() {
    let mut input = two_folders(104);
    input[4] = 0x6A;
    assert!(matches!(
        Archive::new(Cursor::new(input)),
        Err(Error::InvalidFormat(_))
    ));

    let mut input = two_folders(104);
    input[8] = 0x20;
    assert!(matches!(
        Archive::new(Cursor::new(input)),
        Err(Error::InvalidFormat(_))
    ));

    let input = two_folders(104)[..40].to_vec();
    assert!(matches!(
        Archive::new(Cursor::new(input)),
        Err(Error::Truncated { offset: 36 })
    ));
}

#[traced_test]
#[test]
fn open_from_path() -> Result<(), Error> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(&two_folders(104))?;
    file.flush()?;

    let mut archive = Archive::open(file.path())?;
    assert_eq!(archive.len(), 3);
    assert_eq!(archive.extract_to_vec(0)?, HELLO);

    assert!(matches!(
        Archive::open(file.path().with_extension("missing")),
        Err(Error::IOError(_))
    ));

    Ok(())
}

#[traced_test]
#[test]
fn parallel_readers_share_tables() -> Result<(), Error> {
    let input = two_folders(104);
    let archive = Archive::new(Cursor::new(input.clone()))?;

    let results = std::thread::scope(|scope| -> Result<Vec<Vec<u8>>, Error> {
        let handles = (0..archive.len())
            .map(|index| -> Result<_, Error> {
                let mut worker = archive.with_reader(Cursor::new(input.clone()))?;
                Ok(scope.spawn(move || worker.extract_to_vec(index)))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker panicked"))
            .collect::<Result<Vec<_>, Error>>()
    })?;

    assert_eq!(results, vec![HELLO.to_vec(), LOREM.to_vec(), b"0123456789".to_vec()]);

    Ok(())
}
