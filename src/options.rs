//! Conversion settings.

#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

/// Markdown dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "cli",
    derive(Serialize, Deserialize, clap::ValueEnum),
    serde(rename_all = "lowercase")
)]
pub enum Format {
    /// CommonMark-style baseline.
    #[default]
    Standard,
    /// GitHub Flavored Markdown: pipe tables, strikethrough, task lists.
    Gfm,
}

/// How image references are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "cli",
    derive(Serialize, Deserialize, clap::ValueEnum),
    serde(rename_all = "lowercase")
)]
pub enum ImageHandling {
    /// Embed the payload as a base64 data URL.
    Inline,
    /// Reference `./images/<filename>`.
    #[default]
    Separate,
}

/// How chapters are laid out on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "cli",
    derive(Serialize, Deserialize, clap::ValueEnum),
    serde(rename_all = "lowercase")
)]
pub enum OutputStructure {
    /// All chapters in one `book.md`.
    Single,
    /// One file per chapter.
    #[default]
    Chapter,
}

/// Options for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(Serialize, Deserialize), serde(default))]
pub struct ConversionOptions {
    pub format: Format,
    pub image_handling: ImageHandling,
    pub output_structure: OutputStructure,
    /// Fixed date for the README's "Converted" line. The current local
    /// date is used when absent.
    pub timestamp: Option<String>,
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_image_handling(mut self, image_handling: ImageHandling) -> Self {
        self.image_handling = image_handling;
        self
    }

    pub fn with_output_structure(mut self, output_structure: OutputStructure) -> Self {
        self.output_structure = output_structure;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// The date string stamped into the README.
    pub fn conversion_date(&self) -> String {
        match &self.timestamp {
            Some(ts) => ts.clone(),
            None => chrono::Local::now().format("%Y-%m-%d").to_string(),
        }
    }
}
