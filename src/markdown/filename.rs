//! Output filenames for chapters.

/// Markdown filename for a chapter id.
///
/// Every character that is not an ASCII letter or digit becomes `-`, the
/// result is lowercased and `.md` appended. Distinct ids can collide.
///
/// # Examples
///
/// ```
/// use epubmd::markdown::chapter_filename;
///
/// assert_eq!(chapter_filename("Chapter_01"), "chapter-01.md");
/// assert_eq!(chapter_filename("c1"), "c1.md");
/// ```
pub fn chapter_filename(id: &str) -> String {
    let mut name: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    name.push_str(".md");
    name
}
