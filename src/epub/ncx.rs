//! NCX navigation document: the hierarchical outline.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::archive::Archive;
use super::package::Package;
use super::xml::{attr, local_name, normalize_space, resolve_entity};
use crate::book::OutlineNode;
use crate::util::{parent_dir, resolve_href};

/// Read the outline named by `spine/@toc`.
///
/// Every failure degrades to an empty outline.
pub fn read_outline(archive: &Archive, package: &Package) -> Vec<OutlineNode> {
    let Some(toc_id) = package.toc_id.as_deref() else {
        tracing::warn!("spine declares no navigation document");
        return Vec::new();
    };
    let Some(item) = package.item(toc_id) else {
        tracing::warn!(%toc_id, "navigation document is not in the manifest");
        return Vec::new();
    };

    let content = match archive.read_text(&item.path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %item.path, "navigation document unreadable: {e}");
            return Vec::new();
        }
    };

    match parse_ncx(&content, parent_dir(&item.path)) {
        Ok(outline) => {
            tracing::debug!(entries = outline.len(), "parsed navigation document");
            outline
        }
        Err(e) => {
            tracing::warn!(path = %item.path, "malformed navigation document: {e}");
            Vec::new()
        }
    }
}

struct NavPointState {
    id: String,
    label: Option<String>,
    href: String,
    children: Vec<OutlineNode>,
}

impl NavPointState {
    fn open(e: &BytesStart<'_>) -> Self {
        Self {
            id: attr(e, b"id").unwrap_or_default(),
            label: None,
            href: String::new(),
            children: Vec::new(),
        }
    }
}

/// Parse NCX content. Content hrefs resolve against `ncx_dir`.
pub fn parse_ncx(content: &str, ncx_dir: &str) -> Result<Vec<OutlineNode>, quick_xml::Error> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut roots: Vec<OutlineNode> = Vec::new();
    let mut stack: Vec<NavPointState> = Vec::new();
    // Label text being collected, if inside the first navLabel/text of the
    // innermost navPoint.
    let mut label: Option<String> = None;
    let mut in_label = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"navPoint" => stack.push(NavPointState::open(&e)),
                b"navLabel" => in_label = true,
                b"text" => {
                    if in_label && stack.last().is_some_and(|s| s.label.is_none()) {
                        label = Some(String::new());
                    }
                }
                b"content" => set_content(&mut stack, &e, ncx_dir),
                _ => {}
            },
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"content" => set_content(&mut stack, &e, ncx_dir),
                b"navPoint" => {
                    let state = NavPointState::open(&e);
                    attach(&mut stack, &mut roots, state);
                }
                _ => {}
            },
            Event::Text(e) => {
                if let Some(text) = label.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if let Some(text) = label.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if let Some(text) = label.as_mut()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    text.push_str(&resolved);
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"text" => {
                    if let Some(text) = label.take()
                        && let Some(state) = stack.last_mut()
                    {
                        state.label = Some(normalize_space(&text));
                    }
                }
                b"navLabel" => in_label = false,
                b"navPoint" => {
                    if let Some(state) = stack.pop() {
                        attach(&mut stack, &mut roots, state);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    // Unclosed navPoints at end of input still count.
    while let Some(state) = stack.pop() {
        attach(&mut stack, &mut roots, state);
    }

    Ok(roots)
}

fn set_content(stack: &mut [NavPointState], e: &BytesStart<'_>, ncx_dir: &str) {
    if let Some(state) = stack.last_mut()
        && state.href.is_empty()
        && let Some(src) = attr(e, b"src").filter(|s| !s.is_empty())
    {
        state.href = resolve_href(ncx_dir, &src);
    }
}

/// Close a navPoint and hang it under its parent, or at the root.
fn attach(stack: &mut [NavPointState], roots: &mut Vec<OutlineNode>, state: NavPointState) {
    // The node's depth is the number of still-open ancestors plus one.
    let level = stack.len() + 1;
    let mut node = OutlineNode::new(state.id, state.label.unwrap_or_default(), level)
        .with_href(state.href);
    node.children = state.children;

    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}
