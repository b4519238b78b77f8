//! Cover image selection.

use super::archive::Archive;
use super::content::locate;
use super::package::{ManifestItem, Package};
use crate::markdown::data_url;
use crate::util::mime_from_extension;

/// Which rule picked the cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSource {
    /// `<meta name="cover" content="…">`.
    MetaMarker,
    /// `properties="cover-image"`.
    Property,
    /// An image whose id mentions "cover".
    IdMatch,
    /// An image whose href mentions "cover".
    HrefMatch,
}

/// The manifest item chosen as cover, by the first rule that matches.
pub fn select_cover(package: &Package) -> Option<(&ManifestItem, CoverSource)> {
    if let Some(item) = package.cover_id.as_deref().and_then(|id| package.item(id)) {
        return Some((item, CoverSource::MetaMarker));
    }
    let images = || package.manifest.iter().filter(|i| i.is_image());
    if let Some(item) = package.manifest.iter().find(|i| i.has_property("cover-image")) {
        return Some((item, CoverSource::Property));
    }
    if let Some(item) = images().find(|i| i.id.contains("cover")) {
        return Some((item, CoverSource::IdMatch));
    }
    images()
        .find(|i| i.href.contains("cover"))
        .map(|item| (item, CoverSource::HrefMatch))
}

/// Cover image as a data URL.
///
/// When the selected file is missing the cover is absent; later rules are
/// not consulted.
pub fn resolve_cover(archive: &Archive, package: &Package) -> Option<String> {
    let Some((item, source)) = select_cover(package) else {
        tracing::debug!("no cover image declared");
        return None;
    };

    let data = locate(archive, package, item).and_then(|path| archive.read_bytes(&path).ok());
    let Some(data) = data else {
        tracing::warn!(id = %item.id, href = %item.href, ?source, "cover image unreadable");
        return None;
    };

    tracing::debug!(id = %item.id, ?source, "resolved cover image");
    Some(data_url(mime_from_extension(&item.href), &data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::container::PackageLocation;
    use crate::epub::package::parse_package;

    fn package(manifest: &str, metadata: &str) -> Package {
        let opf = format!(
            "<package><metadata>{metadata}</metadata><manifest>{manifest}</manifest><spine/></package>"
        );
        parse_package(&opf, &PackageLocation::new("OEBPS/content.opf")).unwrap()
    }

    #[test]
    fn test_meta_marker_wins() {
        let pkg = package(
            r#"<item id="cover-img" href="cover.jpg" media-type="image/jpeg"/>
               <item id="art" href="art.png" media-type="image/png" properties="cover-image"/>
               <item id="front" href="front.gif" media-type="image/gif"/>"#,
            r#"<meta name="cover" content="front"/>"#,
        );
        let (item, source) = select_cover(&pkg).unwrap();
        assert_eq!(item.id, "front");
        assert_eq!(source, CoverSource::MetaMarker);
    }

    #[test]
    fn test_rule_order() {
        let pkg = package(
            r#"<item id="a-cover" href="a.png" media-type="image/png"/>
               <item id="art" href="art.png" media-type="image/png" properties="cover-image"/>"#,
            "",
        );
        assert_eq!(select_cover(&pkg).unwrap().1, CoverSource::Property);

        let pkg = package(
            r#"<item id="x" href="images/cover.png" media-type="image/png"/>
               <item id="my-cover" href="y.png" media-type="image/png"/>"#,
            "",
        );
        let (item, source) = select_cover(&pkg).unwrap();
        assert_eq!(item.id, "my-cover");
        assert_eq!(source, CoverSource::IdMatch);

        let pkg = package(
            r#"<item id="cover-page" href="cover.xhtml" media-type="application/xhtml+xml"/>
               <item id="x" href="images/cover.png" media-type="image/png"/>"#,
            "",
        );
        let (item, source) = select_cover(&pkg).unwrap();
        assert_eq!(item.id, "x");
        assert_eq!(source, CoverSource::HrefMatch);
    }

    #[test]
    fn test_dangling_marker_falls_through() {
        let pkg = package(
            r#"<item id="c" href="cover.jpg" media-type="image/jpeg"/>"#,
            r#"<meta name="cover" content="missing"/>"#,
        );
        assert_eq!(select_cover(&pkg).unwrap().1, CoverSource::HrefMatch);
    }

    #[test]
    fn test_no_cover() {
        let pkg = package(r#"<item id="ch" href="ch.xhtml" media-type="application/xhtml+xml"/>"#, "");
        assert!(select_cover(&pkg).is_none());
    }
}
