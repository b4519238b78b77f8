//! Assembling the Markdown file set for a document.
//!
//! [`assemble`] is pure: it renders every chapter and builds the README and
//! SUMMARY texts. The [`package`] submodule writes the result to a
//! directory or a zip archive.

pub mod package;

use crate::book::{Document, Image, OutlineNode};
use crate::markdown::render_chapter;
use crate::options::ConversionOptions;

pub use package::{BOOK_FILE, README_FILE, SUMMARY_FILE, write_to_dir, write_zip};

/// One rendered chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownChapter {
    pub id: String,
    pub title: String,
    pub content: String,
    pub filename: String,
    pub order: usize,
}

/// Everything a conversion produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub readme: String,
    pub summary: String,
    pub chapters: Vec<MarkdownChapter>,
    /// Image payloads, unmodified.
    pub images: Vec<Image>,
}

/// Render a document into its Markdown file set.
pub fn assemble(document: &Document, options: &ConversionOptions) -> ConversionOutput {
    let date = options.conversion_date();

    let chapters: Vec<MarkdownChapter> = document
        .chapters
        .iter()
        .map(|chapter| MarkdownChapter {
            id: chapter.id.clone(),
            title: chapter.title.clone(),
            content: render_chapter(chapter, &document.images, options),
            filename: chapter.filename(),
            order: chapter.order,
        })
        .collect();

    tracing::debug!(chapters = chapters.len(), "rendered chapters");

    ConversionOutput {
        readme: generate_readme(document, &date),
        summary: generate_summary(document),
        chapters,
        images: document.images.clone(),
    }
}

/// README: title, metadata block, description and contents.
pub fn generate_readme(document: &Document, date: &str) -> String {
    let meta = &document.metadata;
    let mut readme = format!("# {}\n\n", meta.title);

    if let Some(creator) = &meta.creator {
        readme.push_str(&format!("> Author: {creator}\n>\n"));
    }
    if let Some(publisher) = &meta.publisher {
        readme.push_str(&format!("> Publisher: {publisher}\n>\n"));
    }
    readme.push_str(&format!("> Converted: {date}\n\n"));

    if let Some(description) = &meta.description {
        readme.push_str(&format!("## Description\n\n{description}\n\n"));
    }

    readme.push_str("## Contents\n\n");
    render_outline(document, &mut readme);
    readme
}

/// SUMMARY: the outline alone.
pub fn generate_summary(document: &Document) -> String {
    let mut summary = String::from("# Summary\n\n");
    render_outline(document, &mut summary);
    summary
}

/// Append the outline as a nested bullet list, depth-first in document
/// order.
fn render_outline(document: &Document, out: &mut String) {
    let mut stack: Vec<&OutlineNode> = document.outline.iter().rev().collect();
    while let Some(node) = stack.pop() {
        let indent = "  ".repeat(node.level.saturating_sub(1));
        let title = node.title.replace('[', "\\[").replace(']', "\\]");
        let filename = document.outline_filename(node);
        out.push_str(&format!("{indent}- [{title}]({filename})\n"));
        stack.extend(node.children.iter().rev());
    }
}
