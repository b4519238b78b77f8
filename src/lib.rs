//! # epubmd
//!
//! Convert EPUB ebooks into a tree of Markdown files.
//!
//! ## Pipeline
//!
//! ```text
//! bytes ─► Archive ─► container.xml ─► OPF package ─► Document ─► ConversionOutput ─► dir / zip
//!                                         │   ▲
//!                                         └───┘ NCX outline, cover, images
//! ```
//!
//! - [`epub`]: reads the archive into a [`Document`]
//! - [`markdown`]: renders chapter HTML to Markdown
//! - [`export`]: assembles README, SUMMARY and chapter files, and writes them
//!
//! ## Quick Start
//!
//! ```no_run
//! use epubmd::{ConversionOptions, Format, OutputStructure};
//!
//! let options = ConversionOptions::default()
//!     .with_format(Format::Gfm)
//!     .with_output_structure(OutputStructure::Single);
//!
//! let output = epubmd::convert_file("book.epub", &options)?;
//! epubmd::write_to_dir(&output, options.output_structure, "book-md")?;
//! # Ok::<(), epubmd::Error>(())
//! ```
//!
//! Rendering a document already in memory is pure:
//!
//! ```
//! use epubmd::{Chapter, ConversionOptions, Document, Metadata};
//!
//! let document = Document {
//!     metadata: Metadata::new("Notes"),
//!     chapters: vec![Chapter {
//!         id: "c1".into(),
//!         title: "One".into(),
//!         path: "OEBPS/c1.xhtml".into(),
//!         html: "<h1>One</h1><p>Hello <em>world</em></p>".into(),
//!         order: 0,
//!     }],
//!     ..Default::default()
//! };
//!
//! let output = epubmd::assemble(&document, &ConversionOptions::default());
//! assert_eq!(output.chapters[0].content, "# One\n\nHello *world*\n");
//! ```

pub mod batch;
pub mod book;
pub mod dom;
pub mod epub;
pub mod error;
pub mod export;
pub mod io;
pub mod markdown;
pub mod options;
pub(crate) mod util;

use std::path::Path;

pub use batch::{CancelToken, convert_all};
pub use book::{Chapter, Document, Image, Metadata, OutlineNode};
pub use epub::{open_document, read_document};
pub use error::{Error, Result};
pub use export::{ConversionOutput, MarkdownChapter, assemble, write_to_dir, write_zip};
pub use markdown::render_chapter;
pub use options::{ConversionOptions, Format, ImageHandling, OutputStructure};

/// Convert an EPUB held in memory.
pub fn convert(bytes: Vec<u8>, options: &ConversionOptions) -> Result<ConversionOutput> {
    let document = read_document(bytes)?;
    Ok(assemble(&document, options))
}

/// Convert an EPUB on disk.
pub fn convert_file(path: impl AsRef<Path>, options: &ConversionOptions) -> Result<ConversionOutput> {
    let document = open_document(path)?;
    Ok(assemble(&document, options))
}
