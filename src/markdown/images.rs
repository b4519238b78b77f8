//! Mapping `<img src>` references onto extracted images.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::book::Image;
use crate::options::ImageHandling;
use crate::util::{file_name, parent_dir, resolve_href};

/// Find the image a reference in `chapter_path` points at.
///
/// The reference is resolved against the chapter's folder and matched by
/// full archive path; failing that, the first image with the same basename
/// wins.
pub fn resolve_image<'a>(src: &str, chapter_path: &str, images: &'a [Image]) -> Option<&'a Image> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") || src.contains("://") {
        return None;
    }

    let path = resolve_href(parent_dir(chapter_path), src);
    images.iter().find(|img| img.path == path).or_else(|| {
        let name = file_name(&path);
        images.iter().find(|img| !name.is_empty() && img.filename == name)
    })
}

/// `data:<mime>;base64,<payload>` for raw bytes.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(data))
}

/// Link target for an image under the given handling mode.
pub fn image_target(image: &Image, handling: ImageHandling) -> String {
    match handling {
        ImageHandling::Inline => data_url(&image.mime_type, &image.data),
        ImageHandling::Separate => format!("./images/{}", image.filename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(path: &str) -> Image {
        Image {
            id: path.to_string(),
            path: path.to_string(),
            filename: file_name(path),
            data: vec![1, 2, 3],
            mime_type: "image/png".to_string(),
        }
    }

    #[test]
    fn test_exact_path_beats_basename() {
        let images = vec![image("OEBPS/a/fig.png"), image("OEBPS/b/fig.png")];

        let hit = resolve_image("../b/fig.png", "OEBPS/text/ch1.xhtml", &images).unwrap();
        assert_eq!(hit.path, "OEBPS/b/fig.png");

        let fallback = resolve_image("elsewhere/fig.png", "OEBPS/ch1.xhtml", &images).unwrap();
        assert_eq!(fallback.path, "OEBPS/a/fig.png");
    }

    #[test]
    fn test_percent_encoded_reference() {
        let images = vec![image("OEBPS/my image.png")];
        assert!(resolve_image("my%20image.png", "OEBPS/ch.xhtml", &images).is_some());
    }

    #[test]
    fn test_unresolvable_references() {
        let images = vec![image("OEBPS/fig.png")];
        assert!(resolve_image("", "OEBPS/ch.xhtml", &images).is_none());
        assert!(resolve_image("other.png", "OEBPS/ch.xhtml", &images).is_none());
        assert!(resolve_image("https://example.com/fig.png", "OEBPS/ch.xhtml", &images).is_none());
        assert!(resolve_image("data:image/png;base64,AAAA", "OEBPS/ch.xhtml", &images).is_none());
    }

    #[test]
    fn test_targets() {
        let img = image("OEBPS/fig.png");
        assert_eq!(image_target(&img, ImageHandling::Separate), "./images/fig.png");
        assert_eq!(
            image_target(&img, ImageHandling::Inline),
            "data:image/png;base64,AQID"
        );
    }
}
