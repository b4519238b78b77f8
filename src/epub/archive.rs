//! Read-only random access to the entries of an EPUB zip container.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use zip::{CompressionMethod, ZipArchive};

use crate::error::{Error, Result};
use crate::io::{ByteSource, ByteSourceCursor, FileSource, MemorySource};
use crate::util::decode_text;

/// Location of an entry's compressed payload within the source.
#[derive(Debug, Clone, Copy)]
struct EntryLoc {
    data_offset: u64,
    compressed_size: u64,
    compression: CompressionMethod,
}

/// A scanned zip container.
///
/// The central directory is read once on construction; afterwards every
/// lookup goes straight to the byte source, so reads only need `&self`.
pub struct Archive {
    source: Arc<dyn ByteSource>,
    index: HashMap<String, EntryLoc>,
    /// Entry names in central-directory order.
    names: Vec<String>,
}

impl Archive {
    /// Scan an archive held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_source(Arc::new(MemorySource::new(bytes)))
    }

    /// Scan an archive on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_source(Arc::new(FileSource::new(file)?))
    }

    pub fn from_source(source: Arc<dyn ByteSource>) -> Result<Self> {
        let cursor = ByteSourceCursor::new(source.clone());
        let mut zip = ZipArchive::new(cursor).map_err(Error::ArchiveCorrupt)?;

        let mut index = HashMap::with_capacity(zip.len());
        let mut names = Vec::with_capacity(zip.len());

        for i in 0..zip.len() {
            let entry = zip.by_index_raw(i).map_err(Error::ArchiveCorrupt)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            index.insert(
                name.clone(),
                EntryLoc {
                    data_offset: entry.data_start(),
                    compressed_size: entry.compressed_size(),
                    compression: entry.compression(),
                },
            );
            names.push(name);
        }

        tracing::debug!(entries = names.len(), "scanned zip directory");
        Ok(Self {
            source,
            index,
            names,
        })
    }

    /// Whether an entry exists at exactly this path.
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Entry paths in archive order.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Read and decompress an entry.
    pub fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let loc = self
            .index
            .get(path)
            .ok_or_else(|| Error::ResourceNotFound(path.to_string()))?;

        let compressed = self
            .source
            .read_at(loc.data_offset, loc.compressed_size as usize)?;

        match loc.compression {
            CompressionMethod::Stored => Ok(compressed),
            CompressionMethod::Deflated => {
                let mut decoder = flate2::read::DeflateDecoder::new(&compressed[..]);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                Ok(out)
            }
            method => Err(Error::Io(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported compression method {method:?} for {path}"),
            ))),
        }
    }

    /// Read an entry as text, detecting its encoding.
    pub fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        Ok(decode_text(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_zip() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        zip.add_directory("OEBPS/", stored).unwrap();
        zip.start_file("OEBPS/ch1.xhtml", deflated).unwrap();
        zip.write_all("<p>caf\u{e9} au lait</p>".repeat(20).as_bytes())
            .unwrap();
        zip.start_file("OEBPS/img.bin", deflated).unwrap();
        zip.write_all(&[0u8, 159, 146, 150]).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_stored_and_deflated_entries() {
        let archive = Archive::from_bytes(build_zip()).unwrap();

        assert_eq!(archive.read_text("mimetype").unwrap(), "application/epub+zip");
        assert!(archive.read_text("OEBPS/ch1.xhtml").unwrap().starts_with("<p>caf\u{e9}"));
        assert_eq!(archive.read_bytes("OEBPS/img.bin").unwrap(), vec![0u8, 159, 146, 150]);
    }

    #[test]
    fn test_directories_are_not_entries() {
        let archive = Archive::from_bytes(build_zip()).unwrap();
        let entries: Vec<_> = archive.entries().collect();
        assert_eq!(entries, vec!["mimetype", "OEBPS/ch1.xhtml", "OEBPS/img.bin"]);
        assert!(!archive.contains("OEBPS/"));
    }

    #[test]
    fn test_missing_entry_is_resource_not_found() {
        let archive = Archive::from_bytes(build_zip()).unwrap();
        match archive.read_bytes("OEBPS/missing.xhtml") {
            Err(Error::ResourceNotFound(path)) => assert_eq!(path, "OEBPS/missing.xhtml"),
            other => panic!("expected ResourceNotFound, got {other:?}"),
        }
        assert!(matches!(
            archive.read_text("nope"),
            Err(Error::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_garbage_is_archive_corrupt() {
        let result = Archive::from_bytes(b"definitely not a zip file".to_vec());
        assert!(matches!(result, Err(Error::ArchiveCorrupt(_))));
    }

    #[test]
    fn test_open_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&build_zip()).unwrap();

        let archive = Archive::open(file.path()).unwrap();
        assert!(archive.contains("OEBPS/ch1.xhtml"));
    }
}
