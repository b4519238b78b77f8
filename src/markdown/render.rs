//! Chapter HTML → Markdown.
//!
//! The chapter's markup is parsed into a [`Dom`] and walked depth-first.
//! Output is accumulated in one string; block separation is deferred with
//! `pending_newline` so that nested containers never stack blank lines.

use crate::book::{Chapter, Image};
use crate::dom::{Dom, NodeData, NodeId, parse_html};
use crate::options::{ConversionOptions, Format};
use crate::util::strip_ebook_chars;

use super::escape::{calculate_fence_length, code_span, escape_markdown};
use super::images::{image_target, resolve_image};

/// Render one chapter to Markdown.
///
/// Never fails: malformed markup is repaired by the HTML parser and
/// unresolvable image references keep their original `src`.
pub fn render_chapter(chapter: &Chapter, images: &[Image], options: &ConversionOptions) -> String {
    let dom = parse_html(&chapter.html);
    RenderContext::new(&dom, chapter, images, options).render()
}

/// A footnote body lifted out of the flow.
#[derive(Debug, Clone)]
struct Footnote {
    id: String,
    content: String,
}

#[derive(Debug, Clone)]
struct ListContext {
    ordered: bool,
    /// Number of the first item.
    start: usize,
    /// Items emitted so far.
    items: usize,
    tight: bool,
}

const NOTE_TYPES: [&str; 3] = ["footnote", "endnote", "rearnote"];

/// Element nesting past which content is flattened to plain text.
const MAX_DEPTH: usize = 128;

struct RenderContext<'a> {
    dom: &'a Dom,
    chapter: &'a Chapter,
    images: &'a [Image],
    options: &'a ConversionOptions,
    output: String,
    footnotes: Vec<Footnote>,
    line_prefix: String,
    list_stack: Vec<ListContext>,
    at_line_start: bool,
    /// Text has been written on the current line (bullets and prefixes
    /// don't count).
    has_line_content: bool,
    pending_newline: bool,
    pending_space: bool,
    /// Offset of an opening emphasis/link marker nothing has followed yet.
    open_marker: Option<usize>,
    in_heading: bool,
    depth: usize,
}

impl<'a> RenderContext<'a> {
    fn new(
        dom: &'a Dom,
        chapter: &'a Chapter,
        images: &'a [Image],
        options: &'a ConversionOptions,
    ) -> Self {
        Self {
            dom,
            chapter,
            images,
            options,
            output: String::new(),
            footnotes: Vec::new(),
            line_prefix: String::new(),
            list_stack: Vec::new(),
            at_line_start: true,
            has_line_content: false,
            pending_newline: false,
            pending_space: false,
            open_marker: None,
            in_heading: false,
            depth: 0,
        }
    }

    fn render(mut self) -> String {
        let dom = self.dom;
        self.walk_children(dom.document());

        let mut out = tidy(&self.output);
        if !self.footnotes.is_empty() {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            let definitions: Vec<String> = self
                .footnotes
                .iter()
                .map(|note| format!("[^{}]: {}", note.id, escape_markdown(&note.content)))
                .collect();
            out.push_str(&definitions.join("\n"));
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    // ------------------------------------------------------------------
    // Line state
    // ------------------------------------------------------------------

    fn ensure_line_started(&mut self) {
        if self.at_line_start {
            self.output.push_str(&self.line_prefix);
            self.at_line_start = false;
        }
    }

    fn write_newline(&mut self) {
        self.output.push('\n');
        self.at_line_start = true;
        self.has_line_content = false;
        self.pending_space = false;
        self.open_marker = None;
    }

    fn write_blank_line(&mut self) {
        if !self.at_line_start {
            self.write_newline();
        }
        self.output.push_str(self.line_prefix.trim_end());
        self.write_newline();
    }

    fn flush_pending_newline(&mut self) {
        if self.pending_newline {
            self.pending_newline = false;
            if !self.output.is_empty() {
                self.write_blank_line();
            }
        }
    }

    fn start_block(&mut self) {
        if self.pending_newline {
            self.flush_pending_newline();
        } else if self.has_line_content {
            self.write_blank_line();
        }
    }

    fn end_block(&mut self) {
        self.pending_newline = true;
        self.pending_space = false;
    }

    /// Prepare to write inline content on the current line.
    fn begin_inline(&mut self) {
        self.flush_pending_newline();
        self.ensure_line_started();
        if self.pending_space {
            if self.has_line_content {
                self.output.push(' ');
            }
            self.pending_space = false;
        }
    }

    fn push_inline(&mut self, content: &str) {
        self.begin_inline();
        self.output.push_str(content);
        self.has_line_content = true;
        self.open_marker = None;
    }

    // ------------------------------------------------------------------
    // Walk
    // ------------------------------------------------------------------

    fn walk_children(&mut self, id: NodeId) {
        let dom = self.dom;
        for child in dom.children(id) {
            self.walk_node(child);
        }
    }

    fn walk_node(&mut self, id: NodeId) {
        let dom = self.dom;
        let Some(node) = dom.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => self.write_text(text),
            NodeData::Element { .. } => self.walk_element(id),
            NodeData::Document | NodeData::Comment(_) => {}
        }
    }

    fn walk_element(&mut self, id: NodeId) {
        if self.depth >= MAX_DEPTH {
            let text = normalize_text(&self.dom.text_content(id));
            if !text.is_empty() {
                self.push_inline(&escape_markdown(&text));
            }
            return;
        }

        self.depth += 1;
        self.render_element(id);
        self.depth -= 1;
    }

    fn render_element(&mut self, id: NodeId) {
        let dom = self.dom;
        let Some(tag) = dom.tag(id) else {
            return;
        };

        match tag {
            "head" | "script" | "style" | "template" => {}

            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                self.write_heading(id, level);
            }

            "p" | "div" | "section" | "article" | "header" | "footer" | "nav" | "main"
            | "figure" | "figcaption" | "address" | "center" | "hgroup" | "details"
            | "summary" => {
                self.start_block();
                self.walk_children(id);
                self.end_block();
            }

            "aside" if self.is_note_definition(id) => {
                let content = normalize_text(&dom.text_content(id));
                let note_id = dom.attr(id, "id").unwrap_or_default().to_string();
                self.footnotes.push(Footnote {
                    id: note_id,
                    content,
                });
            }
            "aside" => {
                self.start_block();
                self.walk_children(id);
                self.end_block();
            }

            "ul" | "ol" => self.write_list(id, tag == "ol"),
            "li" => self.write_list_item(id),

            "blockquote" => {
                self.start_block();
                if !self.at_line_start {
                    self.output.push_str("> ");
                }
                let saved = self.line_prefix.clone();
                self.line_prefix.push_str("> ");
                self.walk_children(id);
                self.line_prefix = saved;
                self.end_block();
            }

            "hr" => {
                self.start_block();
                self.push_inline("---");
                self.end_block();
            }

            "pre" => self.write_code_block(id),

            "dl" => {
                self.start_block();
                self.walk_children(id);
                self.end_block();
            }
            "dt" => {
                self.start_block();
                self.write_wrapped(id, "**");
                self.pending_newline = false;
            }
            "dd" => {
                self.pending_newline = false;
                if !self.at_line_start {
                    self.write_newline();
                }
                self.ensure_line_started();
                self.output.push_str(": ");
                self.has_line_content = false;
                self.walk_children(id);
                self.end_block();
            }

            "table" => self.write_table(id),

            "em" | "i" | "cite" => self.write_wrapped(id, "*"),
            "strong" | "b" => self.write_wrapped(id, "**"),
            "del" | "s" | "strike" if self.options.format == Format::Gfm => {
                self.write_wrapped(id, "~~")
            }

            "code" | "kbd" | "samp" | "tt" => {
                let content = normalize_text(&dom.text_content(id));
                if !content.is_empty() {
                    self.push_inline(&code_span(&content));
                }
            }

            "br" => {
                if self.in_heading {
                    self.pending_space = true;
                } else if self.has_line_content {
                    self.output.push('\\');
                    self.write_newline();
                }
            }

            "a" => self.write_anchor(id),

            "span" if dom.has_class(id, "footnote") => {
                let note_id = dom.attr(id, "id").unwrap_or_default();
                self.push_inline(&format!("[^{note_id}]"));
            }

            "img" => {
                let src = dom.attr(id, "src").unwrap_or_default();
                self.write_image(id, src);
            }
            "image" => {
                let src = dom.attr(id, "href").unwrap_or_default();
                self.write_image(id, src);
            }

            "input" => {
                if self.options.format == Format::Gfm
                    && dom
                        .attr(id, "type")
                        .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"))
                {
                    let mark = if dom.attr(id, "checked").is_some() {
                        "[x]"
                    } else {
                        "[ ]"
                    };
                    self.push_inline(mark);
                    self.pending_space = true;
                }
            }

            _ => self.walk_children(id),
        }
    }

    fn is_note_definition(&self, id: NodeId) -> bool {
        self.dom.epub_types(id).any(|t| NOTE_TYPES.contains(&t))
            && self.dom.attr(id, "id").is_some_and(|v| !v.is_empty())
    }

    // ------------------------------------------------------------------
    // Inline content
    // ------------------------------------------------------------------

    fn write_text(&mut self, text: &str) {
        let text = strip_ebook_chars(text);
        let leading = text.starts_with(char::is_whitespace);
        let trailing = text.ends_with(char::is_whitespace);

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            if !text.is_empty() {
                self.pending_space = true;
            }
            return;
        }

        if leading {
            // Keep the space outside an emphasis marker that was just opened.
            match self.open_marker {
                Some(pos) => {
                    if self.has_line_content {
                        self.output.insert(pos, ' ');
                    }
                }
                None => self.pending_space = true,
            }
        }

        self.push_inline(&escape_markdown(&words.join(" ")));
        self.pending_space = trailing;
    }

    /// Wrap an element's content in a symmetric marker, dropping the marker
    /// when the content turns out empty.
    fn write_wrapped(&mut self, id: NodeId, marker: &str) {
        self.begin_inline();
        let start = self.output.len();
        self.output.push_str(marker);
        if self.open_marker.is_none() {
            self.open_marker = Some(start);
        }

        self.walk_children(id);

        if self.output.len() == start + marker.len() {
            self.output.truncate(start);
            if self.open_marker.is_some_and(|pos| pos >= start) {
                self.open_marker = None;
            }
        } else {
            self.output.push_str(marker);
            self.open_marker = None;
        }
    }

    fn write_heading(&mut self, id: NodeId, level: usize) {
        self.start_block();
        self.begin_inline();
        let start = self.output.len();
        let marker = format!("{} ", "#".repeat(level));
        self.output.push_str(&marker);

        self.in_heading = true;
        self.walk_children(id);
        self.in_heading = false;

        if self.output.len() == start + marker.len() {
            self.output.truncate(start);
        }
        self.end_block();
    }

    fn write_anchor(&mut self, id: NodeId) {
        let dom = self.dom;
        let href = dom.attr(id, "href").unwrap_or_default().trim();

        if dom.epub_types(id).any(|t| t == "noteref")
            && let Some((_, fragment)) = href.split_once('#')
            && !fragment.is_empty()
        {
            self.push_inline(&format!("[^{fragment}]"));
            return;
        }

        if href.is_empty() {
            self.walk_children(id);
            return;
        }

        self.begin_inline();
        let start = self.output.len();
        self.output.push('[');
        if self.open_marker.is_none() {
            self.open_marker = Some(start);
        }

        self.walk_children(id);

        if self.output.len() == start + 1 {
            self.output.truncate(start);
            if self.open_marker.is_some_and(|pos| pos >= start) {
                self.open_marker = None;
            }
            return;
        }
        self.output.push_str("](");
        self.output.push_str(&link_destination(href));
        self.output.push(')');
        self.open_marker = None;
    }

    fn write_image(&mut self, id: NodeId, src: &str) {
        let alt = normalize_text(self.dom.attr(id, "alt").unwrap_or_default());
        let (alt, target) = match resolve_image(src, &self.chapter.path, self.images) {
            Some(image) => {
                let alt = if alt.is_empty() {
                    image.filename.clone()
                } else {
                    alt
                };
                (alt, image_target(image, self.options.image_handling))
            }
            None => (alt, src.trim().to_string()),
        };

        if target.is_empty() {
            return;
        }
        self.push_inline(&format!(
            "![{}]({})",
            escape_markdown(&alt),
            link_destination(&target)
        ));
    }

    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    fn write_list(&mut self, id: NodeId, ordered: bool) {
        if self.list_stack.is_empty() {
            self.start_block();
        }
        let start = if ordered {
            self.dom
                .attr(id, "start")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(1)
        } else {
            1
        };
        let tight = self.is_tight_list(id);
        self.list_stack.push(ListContext {
            ordered,
            start,
            items: 0,
            tight,
        });
        self.walk_children(id);
        self.list_stack.pop();
        self.end_block();
    }

    fn write_list_item(&mut self, id: NodeId) {
        let (bullet, loose_gap) = match self.list_stack.last_mut() {
            Some(list) => {
                let bullet = if list.ordered {
                    format!("{}. ", list.start + list.items)
                } else {
                    "- ".to_string()
                };
                let gap = !list.tight && list.items > 0;
                list.items += 1;
                (bullet, gap)
            }
            None => ("- ".to_string(), false),
        };

        self.pending_newline = false;
        if !self.at_line_start {
            self.write_newline();
        }
        if loose_gap {
            self.write_blank_line();
        }
        self.ensure_line_started();
        self.output.push_str(&bullet);
        self.has_line_content = false;
        self.pending_space = false;

        let saved = self.line_prefix.clone();
        self.line_prefix.push_str(&" ".repeat(bullet.len()));
        self.walk_children(id);
        self.line_prefix = saved;
        self.pending_newline = false;
    }

    /// A list is tight when no item holds more than one paragraph or any
    /// other block besides nested lists.
    fn is_tight_list(&self, list: NodeId) -> bool {
        let dom = self.dom;
        dom.children(list)
            .filter(|&item| dom.is_element(item, "li"))
            .all(|item| {
                let mut paragraphs = 0;
                for child in dom.children(item) {
                    match dom.tag(child) {
                        Some("p") => paragraphs += 1,
                        Some("blockquote" | "pre" | "table" | "dl" | "figure" | "div") => {
                            return false;
                        }
                        _ => {}
                    }
                }
                paragraphs <= 1
            })
    }

    // ------------------------------------------------------------------
    // Code and tables
    // ------------------------------------------------------------------

    fn write_code_block(&mut self, id: NodeId) {
        self.start_block();

        let language = self.code_language(id).unwrap_or_default();
        let raw = self.dom.text_content(id);
        let raw = strip_ebook_chars(&raw);
        let code = raw.trim_start_matches(['\n', '\r']).trim_end();
        let fence = "`".repeat(calculate_fence_length(code, '`'));

        self.ensure_line_started();
        self.output.push_str(&fence);
        self.output.push_str(&language);
        self.write_newline();
        for line in code.lines() {
            if line.is_empty() {
                self.output.push_str(self.line_prefix.trim_end());
            } else {
                self.ensure_line_started();
                self.output.push_str(line);
            }
            self.write_newline();
        }
        self.ensure_line_started();
        self.output.push_str(&fence);
        self.has_line_content = true;
        self.end_block();
    }

    /// `data-language` on `pre` or its `code`, else a `language-*` class.
    fn code_language(&self, pre: NodeId) -> Option<String> {
        let dom = self.dom;
        let code = dom.children(pre).find(|&c| dom.is_element(c, "code"));
        let candidates = std::iter::once(pre).chain(code);

        for node in candidates.clone() {
            if let Some(lang) = dom.attr(node, "data-language").map(str::trim)
                && !lang.is_empty()
            {
                return Some(lang.to_string());
            }
        }
        for node in candidates {
            let class = dom.attr(node, "class").unwrap_or_default();
            if let Some(lang) = class
                .split_ascii_whitespace()
                .find_map(|c| c.strip_prefix("language-"))
                .filter(|l| !l.is_empty())
            {
                return Some(lang.to_string());
            }
        }
        None
    }

    fn write_table(&mut self, table: NodeId) {
        let dom = self.dom;

        if let Some(caption) = dom.children(table).find(|&c| dom.is_element(c, "caption")) {
            let text = normalize_text(&dom.text_content(caption));
            if !text.is_empty() {
                self.start_block();
                self.push_inline(&format!("*{}*", escape_markdown(&text)));
                self.end_block();
            }
        }

        let rows = self.table_rows(table);
        if rows.is_empty() {
            return;
        }

        self.start_block();
        match self.options.format {
            Format::Standard => {
                for row in &rows {
                    self.ensure_line_started();
                    self.output.push_str(&row.join(" | "));
                    self.write_newline();
                }
            }
            Format::Gfm => {
                let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
                let mut lines = Vec::with_capacity(rows.len() + 1);
                for (i, row) in rows.iter().enumerate() {
                    let mut cells = row.clone();
                    cells.resize(columns, String::new());
                    lines.push(format!("| {} |", cells.join(" | ")));
                    if i == 0 {
                        lines.push(format!("|{}", " --- |".repeat(columns)));
                    }
                }
                for line in lines {
                    self.ensure_line_started();
                    self.output.push_str(&line);
                    self.write_newline();
                }
            }
        }
        self.end_block();
    }

    /// Escaped cell text of every row, header rows first as they appear.
    fn table_rows(&self, table: NodeId) -> Vec<Vec<String>> {
        let dom = self.dom;
        let mut rows = Vec::new();
        let mut push_row = |row: NodeId| {
            let cells: Vec<String> = dom
                .children(row)
                .filter(|&c| dom.is_element(c, "td") || dom.is_element(c, "th"))
                .map(|c| escape_markdown(&normalize_text(&dom.text_content(c))))
                .collect();
            if !cells.is_empty() {
                rows.push(cells);
            }
        };

        for child in dom.children(table) {
            match dom.tag(child) {
                Some("tr") => push_row(child),
                Some("thead" | "tbody" | "tfoot") => {
                    for row in dom.children(child).filter(|&r| dom.is_element(r, "tr")) {
                        push_row(row);
                    }
                }
                _ => {}
            }
        }
        rows
    }
}

fn normalize_text(text: &str) -> String {
    strip_ebook_chars(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Angle-bracket destinations that would otherwise end the link early.
fn link_destination(href: &str) -> String {
    if href.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{}>", href.replace('<', "%3C").replace('>', "%3E"))
    } else {
        href.to_string()
    }
}

/// Drop whitespace-only lines beyond one in a row, and leading/trailing
/// blank lines. Lines inside a code fence are kept verbatim.
fn tidy(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank = false;
    let mut fence: Option<usize> = None;

    for line in raw.lines() {
        let content = line.trim_start_matches(['>', ' ']);

        if let Some(open) = fence {
            if closes_fence(content, open) {
                fence = None;
                lines.push(line.trim_end());
            } else {
                lines.push(line);
            }
            continue;
        }

        if line.trim().is_empty() {
            blank = !lines.is_empty();
            continue;
        }
        if blank {
            lines.push("");
            blank = false;
        }
        fence = opens_fence(content);
        lines.push(line.trim_end());
    }
    lines.join("\n")
}

fn backtick_run(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b'`').count()
}

/// Length of the fence a line opens. An info string may not hold backticks,
/// which keeps inline code spans at line start from matching.
fn opens_fence(line: &str) -> Option<usize> {
    let run = backtick_run(line);
    (run >= 3 && !line[run..].contains('`')).then_some(run)
}

fn closes_fence(line: &str, open: usize) -> bool {
    let run = backtick_run(line);
    run >= open && line[run..].trim().is_empty()
}
