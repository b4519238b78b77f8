//! EPUB reading: archive → container → package → document model.
//!
//! Each stage is a function from the previous stage's value to a new one.
//! Structural failures (not a zip, no container, no package) abort with an
//! [`Error`](crate::Error); everything else degrades with a `warn` log.

pub mod archive;
pub mod container;
pub mod content;
pub mod cover;
pub mod ncx;
pub mod package;
mod xml;

use std::path::Path;

pub use archive::Archive;
pub use container::{PackageLocation, resolve_container};
pub use content::{chapter_title, extract_chapters, extract_images};
pub use cover::{CoverSource, resolve_cover, select_cover};
pub use ncx::{parse_ncx, read_outline};
pub use package::{ManifestItem, Package, read_package};

use crate::book::Document;
use crate::error::Result;

/// Read an EPUB held in memory.
pub fn read_document(bytes: Vec<u8>) -> Result<Document> {
    let archive = Archive::from_bytes(bytes)?;
    read_document_from_archive(&archive)
}

/// Read an EPUB from disk without loading it whole.
pub fn open_document(path: impl AsRef<Path>) -> Result<Document> {
    let archive = Archive::open(path)?;
    read_document_from_archive(&archive)
}

/// Build the document model from a scanned archive.
pub fn read_document_from_archive(archive: &Archive) -> Result<Document> {
    let location = resolve_container(archive)?;
    let package = read_package(archive, &location)?;

    let chapters = extract_chapters(archive, &package);
    let images = extract_images(archive, &package);
    let outline = read_outline(archive, &package);

    let mut metadata = package.metadata.clone();
    metadata.cover_image = resolve_cover(archive, &package);

    tracing::debug!(
        title = %metadata.title,
        chapters = chapters.len(),
        images = images.len(),
        outline = outline.len(),
        "read document"
    );

    Ok(Document {
        metadata,
        chapters,
        images,
        outline,
    })
}
