//! Typed HTML tree built by html5ever.
//!
//! Content documents are parsed leniently: malformed markup is repaired the
//! way a browser would and parsing never fails.

mod arena;
mod tree_sink;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

pub use arena::{Attribute, Children, Descendants, Dom, Node, NodeData, NodeId};
pub use tree_sink::DomSink;

/// Parse an (X)HTML document.
pub fn parse_html(html: &str) -> Dom {
    parse_document(DomSink::default(), ParseOpts::default())
        .one(html)
        .into_dom()
}

/// Whitespace-normalized text of the first element with this tag, if any
/// and non-empty.
pub fn first_text(dom: &Dom, tag: &str) -> Option<String> {
    let node = dom.find_by_tag(tag)?;
    let text = dom
        .text_content(node)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parse() {
        let dom = parse_html("<html><body><p>Hello</p></body></html>");
        let p = dom.find_by_tag("p").unwrap();
        let text = dom.children(p).next().unwrap();
        assert_eq!(dom.text(text), Some("Hello"));
    }

    #[test]
    fn test_xhtml_with_declaration() {
        let dom = parse_html(
            r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title> Intro </title></head>
<body><section epub:type="chapter"><h1>Heading</h1></section></body>
</html>"#,
        );
        assert_eq!(first_text(&dom, "title").as_deref(), Some("Intro"));
        assert_eq!(first_text(&dom, "h1").as_deref(), Some("Heading"));

        let section = dom.find_by_tag("section").unwrap();
        assert_eq!(dom.epub_types(section).collect::<Vec<_>>(), vec!["chapter"]);
    }

    #[test]
    fn test_empty_title_is_none() {
        let dom = parse_html("<title>  </title><p>x</p>");
        assert_eq!(first_text(&dom, "title"), None);
        assert_eq!(first_text(&dom, "h1"), None);
    }

    #[test]
    fn test_malformed_markup_is_repaired() {
        let dom = parse_html("<p>one<p>two</b></i><ul><li>a<li>b");
        let items: Vec<_> = dom
            .descendants(dom.document())
            .filter(|&n| dom.is_element(n, "li"))
            .collect();
        assert_eq!(items.len(), 2);
        assert_eq!(dom.text_content(items[1]), "b");
    }

    #[test]
    fn test_svg_image_href() {
        let dom = parse_html(
            r#"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><image xlink:href="../img/a.png"/></svg>"#,
        );
        let image = dom.find_by_tag("image").unwrap();
        assert_eq!(dom.attr(image, "href"), Some("../img/a.png"));
    }
}
