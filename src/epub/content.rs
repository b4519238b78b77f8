//! Chapters from the spine and images from the manifest.

use std::collections::HashSet;

use super::archive::Archive;
use super::package::{ManifestItem, Package};
use crate::book::{Chapter, Image};
use crate::dom::{first_text, parse_html};
use crate::util::file_name;

/// Archive path holding a manifest item, if any.
///
/// The percent-decoded, normalized path is tried first, then the href
/// exactly as written under the package folder.
pub(crate) fn locate(archive: &Archive, package: &Package, item: &ManifestItem) -> Option<String> {
    if archive.contains(&item.path) {
        return Some(item.path.clone());
    }
    let literal = format!("{}{}", package.location.base, item.href);
    archive.contains(&literal).then_some(literal)
}

/// Read every resolvable spine entry, in reading order.
///
/// Entries missing from the manifest, with an empty href, whose file is
/// absent, or that repeat an earlier idref are skipped; `order` counts only
/// the chapters kept.
pub fn extract_chapters(archive: &Archive, package: &Package) -> Vec<Chapter> {
    let mut chapters = Vec::with_capacity(package.spine.len());
    let mut seen = HashSet::new();

    for idref in &package.spine {
        if !seen.insert(idref.as_str()) {
            tracing::warn!(%idref, "spine entry repeated, skipping");
            continue;
        }
        let Some(item) = package.item(idref) else {
            tracing::warn!(%idref, "spine entry not in manifest, skipping");
            continue;
        };
        if item.href.trim().is_empty() {
            tracing::warn!(%idref, "spine entry has no href, skipping");
            continue;
        }
        let Some(path) = locate(archive, package, item) else {
            tracing::warn!(%idref, href = %item.href, "chapter file missing, skipping");
            continue;
        };
        let html = match archive.read_text(&path) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(%idref, %path, "chapter unreadable, skipping: {e}");
                continue;
            }
        };

        let order = chapters.len();
        chapters.push(Chapter {
            id: item.id.clone(),
            title: chapter_title(&html, order),
            path,
            html,
            order,
        });
    }

    tracing::debug!(chapters = chapters.len(), "extracted chapters");
    chapters
}

/// `<title>`, else the first `<h1>`, else a positional name.
pub fn chapter_title(html: &str, order: usize) -> String {
    let dom = parse_html(html);
    first_text(&dom, "title")
        .or_else(|| first_text(&dom, "h1"))
        .unwrap_or_else(|| format!("Chapter {}", order + 1))
}

/// Read every image in the manifest, in manifest order.
pub fn extract_images(archive: &Archive, package: &Package) -> Vec<Image> {
    let mut images = Vec::new();

    for item in package.manifest.iter().filter(|i| i.is_image()) {
        let Some(path) = locate(archive, package, item) else {
            tracing::warn!(id = %item.id, href = %item.href, "image file missing, skipping");
            continue;
        };
        match archive.read_bytes(&path) {
            Ok(data) => images.push(Image {
                id: item.id.clone(),
                filename: file_name(&path),
                path,
                data,
                mime_type: item.media_type.clone(),
            }),
            Err(e) => tracing::warn!(id = %item.id, %path, "image unreadable, skipping: {e}"),
        }
    }

    tracing::debug!(images = images.len(), "extracted images");
    images
}
