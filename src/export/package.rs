//! Writing a [`ConversionOutput`] to disk or into a zip archive.

use std::collections::HashSet;
use std::fs;
use std::io::{Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ConversionOutput;
use crate::error::Result;
use crate::options::OutputStructure;

pub const README_FILE: &str = "README.md";
pub const SUMMARY_FILE: &str = "SUMMARY.md";
/// Chapter file for [`OutputStructure::Single`].
pub const BOOK_FILE: &str = "book.md";
const IMAGES_DIR: &str = "images";

/// A file to emit, relative to the output root.
struct OutputFile {
    path: String,
    data: Vec<u8>,
    /// Already-compressed payloads are stored as-is in zips.
    binary: bool,
}

impl OutputFile {
    fn text(path: impl Into<String>, text: &str) -> Self {
        Self {
            path: path.into(),
            data: text.as_bytes().to_vec(),
            binary: false,
        }
    }

    fn binary(path: impl Into<String>, data: &[u8]) -> Self {
        Self {
            path: path.into(),
            data: data.to_vec(),
            binary: true,
        }
    }
}

/// The file layout for a structure, in write order.
fn layout(output: &ConversionOutput, structure: OutputStructure) -> Vec<OutputFile> {
    let mut files = vec![
        OutputFile::text(README_FILE, &output.readme),
        OutputFile::text(SUMMARY_FILE, &output.summary),
    ];

    match structure {
        OutputStructure::Chapter => {
            let mut seen = HashSet::new();
            for chapter in &output.chapters {
                if !seen.insert(chapter.filename.as_str()) {
                    tracing::warn!(filename = %chapter.filename, id = %chapter.id, "duplicate chapter filename, skipping");
                    continue;
                }
                files.push(OutputFile::text(chapter.filename.clone(), &chapter.content));
            }
        }
        OutputStructure::Single => {
            let mut book = output
                .chapters
                .iter()
                .map(|c| c.content.trim_end())
                .collect::<Vec<_>>()
                .join("\n\n---\n\n");
            if !book.is_empty() {
                book.push('\n');
            }
            files.push(OutputFile::text(BOOK_FILE, &book));
        }
    }

    let mut seen = HashSet::new();
    for image in &output.images {
        if !is_plain_file_name(&image.filename) {
            tracing::warn!(filename = %image.filename, id = %image.id, "unsafe image filename, skipping");
            continue;
        }
        if !seen.insert(image.filename.as_str()) {
            tracing::warn!(filename = %image.filename, id = %image.id, "duplicate image filename, skipping");
            continue;
        }
        files.push(OutputFile::binary(
            format!("{IMAGES_DIR}/{}", image.filename),
            &image.data,
        ));
    }

    files
}

/// A single path component that cannot leave `images/`.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', ':'])
}

/// Write the file set under `dir`, creating it as needed.
pub fn write_to_dir(
    output: &ConversionOutput,
    structure: OutputStructure,
    dir: impl AsRef<Path>,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let files = layout(output, structure);
    if files.iter().any(|f| f.binary) {
        fs::create_dir_all(dir.join(IMAGES_DIR))?;
    }
    for file in &files {
        fs::write(dir.join(&file.path), &file.data)?;
    }

    tracing::info!(dir = %dir.display(), files = files.len(), "wrote markdown");
    Ok(())
}

/// Write the file set as a zip archive, returning the writer.
pub fn write_zip<W: Write + Seek>(
    output: &ConversionOutput,
    structure: OutputStructure,
    writer: W,
) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let files = layout(output, structure);
    for file in &files {
        let options = if file.binary { stored } else { deflated };
        zip.start_file(file.path.as_str(), options)?;
        zip.write_all(&file.data)?;
    }

    let writer = zip.finish()?;
    tracing::info!(files = files.len(), "wrote markdown archive");
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use zip::ZipArchive;

    use super::*;
    use crate::book::Image;
    use crate::export::MarkdownChapter;

    fn output() -> ConversionOutput {
        let chapter = |id: &str, content: &str, order| MarkdownChapter {
            id: id.to_string(),
            title: id.to_string(),
            content: content.to_string(),
            filename: format!("{id}.md"),
            order,
        };
        ConversionOutput {
            readme: "# Book\n".to_string(),
            summary: "# Summary\n".to_string(),
            chapters: vec![chapter("c1", "One\n", 0), chapter("c2", "Two\n", 1)],
            images: vec![Image {
                id: "img".to_string(),
                path: "OEBPS/fig.png".to_string(),
                filename: "fig.png".to_string(),
                data: vec![0x89, b'P', b'N', b'G'],
                mime_type: "image/png".to_string(),
            }],
        }
    }

    fn zip_names(bytes: Vec<u8>) -> Vec<String> {
        let zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        zip.file_names().map(String::from).collect()
    }

    #[test]
    fn test_chapter_layout() {
        let paths: Vec<_> = layout(&output(), OutputStructure::Chapter)
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(
            paths,
            vec!["README.md", "SUMMARY.md", "c1.md", "c2.md", "images/fig.png"]
        );
    }

    #[test]
    fn test_single_layout_joins_chapters() {
        let files = layout(&output(), OutputStructure::Single);
        let book = files.iter().find(|f| f.path == BOOK_FILE).unwrap();
        assert_eq!(String::from_utf8(book.data.clone()).unwrap(), "One\n\n---\n\nTwo\n");
        assert_eq!(files.len(), 4);
    }

    #[test]
    fn test_write_zip() {
        let cursor = write_zip(&output(), OutputStructure::Chapter, Cursor::new(Vec::new())).unwrap();
        let bytes = cursor.into_inner();

        let mut names = zip_names(bytes.clone());
        names.sort();
        assert_eq!(
            names,
            vec!["README.md", "SUMMARY.md", "c1.md", "c2.md", "images/fig.png"]
        );

        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        zip.by_name("c2.md").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "Two\n");
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_to_dir(&output(), OutputStructure::Single, dir.path()).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("README.md")).unwrap(), "# Book\n");
        assert!(dir.path().join("book.md").exists());
        assert!(!dir.path().join("c1.md").exists());
        assert_eq!(
            fs::read(dir.path().join("images/fig.png")).unwrap(),
            vec![0x89, b'P', b'N', b'G']
        );
    }

    #[test]
    fn test_image_names_with_separators_are_skipped() {
        let mut out = output();
        for name in ["..\\..\\evil.png", "../evil.png", "..", "C:evil.png"] {
            let mut image = out.images[0].clone();
            image.filename = name.to_string();
            out.images.push(image);
        }

        let paths: Vec<_> = layout(&out, OutputStructure::Chapter)
            .into_iter()
            .map(|f| f.path)
            .filter(|p| p.starts_with("images/"))
            .collect();
        assert_eq!(paths, vec!["images/fig.png"]);
    }

    #[test]
    fn test_duplicate_image_names_written_once() {
        let mut out = output();
        let mut dup = out.images[0].clone();
        dup.path = "OEBPS/other/fig.png".to_string();
        out.images.push(dup);

        let cursor = write_zip(&out, OutputStructure::Chapter, Cursor::new(Vec::new())).unwrap();
        let names = zip_names(cursor.into_inner());
        assert_eq!(names.iter().filter(|n| n.as_str() == "images/fig.png").count(), 1);
    }
}
