//! HTML → Markdown rewriting.
//!
//! - [`escape`]: escaping and code-span sizing
//! - [`filename`]: chapter output filenames
//! - [`images`]: mapping image references onto extracted images
//! - [`render`]: the chapter walker
//!
//! Rendering is a pure function of the chapter, the image set and the
//! options; it performs no I/O. Block layout follows Pandoc's Markdown
//! writer: tight lists stay compact, nested content is indented under its
//! bullet, footnote bodies are collected and emitted after the chapter, and
//! code fences grow past any backtick run in their content.

mod escape;
mod filename;
mod images;
mod render;

pub use escape::{calculate_fence_length, calculate_inline_code_ticks, code_span, escape_markdown};
pub use filename::chapter_filename;
pub use images::{data_url, image_target, resolve_image};
pub use render::render_chapter;
