//! Writing converted books to directories and zip archives.

mod common;

use std::fs;
use std::io::{Cursor, Read};

use tempfile::TempDir;
use zip::ZipArchive;

use common::{JPEG, PNG, sample_book};
use epubmd::{
    CancelToken, ConversionOptions, OutputStructure, convert, convert_all, write_to_dir, write_zip,
};

fn options() -> ConversionOptions {
    ConversionOptions::default().with_timestamp("2024-01-01")
}

#[test]
fn test_chapter_structure_on_disk() {
    let output = convert(sample_book().build(), &options()).unwrap();
    let dir = TempDir::new().unwrap();
    write_to_dir(&output, OutputStructure::Chapter, dir.path()).unwrap();

    for name in ["README.md", "SUMMARY.md", "ch1.md", "ch2.md", "ch3.md"] {
        assert!(dir.path().join(name).is_file(), "{name} missing");
    }
    assert!(!dir.path().join("book.md").exists());
    assert_eq!(fs::read(dir.path().join("images/map.png")).unwrap(), PNG);
    assert_eq!(fs::read(dir.path().join("images/cover.jpg")).unwrap(), JPEG);
    assert_eq!(
        fs::read_to_string(dir.path().join("ch3.md")).unwrap(),
        "The end.\n"
    );
}

#[test]
fn test_single_structure_on_disk() {
    let options = options().with_output_structure(OutputStructure::Single);
    let output = convert(sample_book().build(), &options).unwrap();
    let dir = TempDir::new().unwrap();
    write_to_dir(&output, options.output_structure, dir.path()).unwrap();

    let book = fs::read_to_string(dir.path().join("book.md")).unwrap();
    assert!(book.starts_with("# Opening\n"));
    assert_eq!(book.matches("\n---\n").count(), 2);
    assert!(book.ends_with("The end.\n"));
    assert!(!dir.path().join("ch1.md").exists());
    assert!(dir.path().join("images/map.png").is_file());
}

#[test]
fn test_zip_matches_directory() {
    let output = convert(sample_book().build(), &options()).unwrap();

    let dir = TempDir::new().unwrap();
    write_to_dir(&output, OutputStructure::Chapter, dir.path()).unwrap();
    let cursor = write_zip(&output, OutputStructure::Chapter, Cursor::new(Vec::new())).unwrap();
    let mut zip = ZipArchive::new(cursor).unwrap();

    assert_eq!(zip.len(), 7);
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        let on_disk = fs::read(dir.path().join(entry.name())).unwrap();
        assert_eq!(data, on_disk, "{} differs", entry.name());
    }
}

#[test]
fn test_batch_of_files() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.epub");
    let bad = dir.path().join("bad.epub");
    fs::write(&good, sample_book().build()).unwrap();
    fs::write(&bad, b"not an epub").unwrap();

    let results = convert_all(&[&good, &bad, &good], &options(), &CancelToken::new());
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(epubmd::Error::ArchiveCorrupt(_))));
    assert_eq!(
        results[0].as_ref().unwrap(),
        results[2].as_ref().unwrap()
    );
}
