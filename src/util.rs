//! Text decoding, path and media-type helpers shared by the pipeline stages.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Decode bytes to a string, handling legacy encodings.
///
/// Tries UTF-8 first (a BOM is consumed by encoding_rs), then the encoding
/// named by the XML declaration, and finally Windows-1252, which is what most
/// mis-labelled older ebooks actually contain.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (result, _, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(encoding) =
        extract_xml_encoding(bytes).and_then(|name| encoding_rs::Encoding::for_label(name.as_bytes()))
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Encoding name from an `<?xml ... encoding="..."?>` declaration.
///
/// Only the first hundred bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];

    let decl = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_decl = &prefix[decl..];
    let enc = after_decl
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let value = &after_decl[enc + 9..];

    let quote = *value.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = value[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&value[1..end]).ok()
}

/// Remove characters that only matter for ebook typesetting (soft hyphens,
/// zero-width spaces and joiners, BOMs).
pub fn strip_ebook_chars(text: &str) -> Cow<'_, str> {
    fn is_invisible(c: char) -> bool {
        matches!(c, '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}')
    }

    if text.chars().any(is_invisible) {
        Cow::Owned(text.chars().filter(|&c| !is_invisible(c)).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Resolve an href found in a document at `base_dir` into an archive path.
///
/// `base_dir` is either empty or ends with `/`. The href is percent-decoded,
/// stripped of any fragment or query, and `.`/`..` segments are collapsed.
/// Absolute URLs are returned unchanged.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    if href.contains("://") || href.starts_with("data:") {
        return href.to_string();
    }

    let href = href.split(['#', '?']).next().unwrap_or_default();
    let decoded = percent_decode_str(href).decode_utf8_lossy();

    let joined = match decoded.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{base_dir}{decoded}"),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Directory part of an archive path, including the trailing `/`.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

/// Final path segment.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Final path segment, made safe to use as a single file name on any
/// platform: backslashes become `_`, and `.`/`..` become `_`.
pub fn file_name(path: &str) -> String {
    match basename(path) {
        "." | ".." => "_".to_string(),
        name => name.replace('\\', "_"),
    }
}

/// MIME type guessed from a file extension, defaulting to JPEG.
pub fn mime_from_extension(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}
