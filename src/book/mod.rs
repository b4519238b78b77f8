//! In-memory document model recovered from an EPUB archive.
//!
//! Every value here is built once per conversion and treated as immutable
//! afterwards; later stages borrow it and produce new values.

use crate::markdown::chapter_filename;

/// Title used when the package declares none.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Book metadata (Dublin Core subset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub creator: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
    pub description: Option<String>,
    /// Cover image as a `data:<mime>;base64,<payload>` URL.
    pub cover_image: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            creator: None,
            publisher: None,
            language: None,
            identifier: None,
            description: None,
            cover_image: None,
        }
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A content document from the spine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Manifest id of the content document.
    pub id: String,
    pub title: String,
    /// Full path of the document inside the archive.
    pub path: String,
    /// Raw (X)HTML source.
    pub html: String,
    /// Position in the filtered spine, starting at 0.
    pub order: usize,
}

impl Chapter {
    /// Generated Markdown filename for this chapter.
    pub fn filename(&self) -> String {
        chapter_filename(&self.id)
    }
}

/// A binary image resource from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    /// Full path of the image inside the archive.
    pub path: String,
    /// Basename of the manifest href. Not unique across a book.
    pub filename: String,
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Entry of the hierarchical outline (table of contents).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub id: String,
    pub title: String,
    /// Nesting depth, 1 for top-level entries.
    pub level: usize,
    /// Archive path the entry points at, without fragment. Empty when the
    /// navigation point declared no content.
    pub href: String,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>, level: usize) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            level,
            href: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = href.into();
        self
    }

    pub fn with_child(mut self, child: OutlineNode) -> Self {
        self.children.push(child);
        self
    }
}

/// The aggregate produced by reading one archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub metadata: Metadata,
    /// Chapters in spine order.
    pub chapters: Vec<Chapter>,
    /// Images in manifest order.
    pub images: Vec<Image>,
    pub outline: Vec<OutlineNode>,
}

impl Document {
    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn chapter_by_path(&self, path: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.path == path)
    }

    pub fn image(&self, id: &str) -> Option<&Image> {
        self.images.iter().find(|i| i.id == id)
    }

    /// Filename an outline entry links to.
    ///
    /// A chapter with the same id wins, then a chapter at the entry's href.
    /// Otherwise the filename is derived from the entry id alone and may not
    /// exist in the output.
    pub fn outline_filename(&self, node: &OutlineNode) -> String {
        if let Some(chapter) = self.chapter(&node.id) {
            return chapter.filename();
        }
        if !node.href.is_empty()
            && let Some(chapter) = self.chapter_by_path(&node.href)
        {
            return chapter.filename();
        }
        chapter_filename(&node.id)
    }
}
