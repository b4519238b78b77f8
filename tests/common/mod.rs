//! In-memory EPUB fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const OPF_PATH: &str = "OEBPS/content.opf";

struct Entry {
    id: String,
    href: String,
    media_type: String,
    properties: Option<String>,
    /// `None` declares the item without writing its file.
    data: Option<Vec<u8>>,
    in_spine: bool,
}

/// Builds a minimal EPUB 2 archive with its package under `OEBPS/`.
#[derive(Default)]
pub struct EpubBuilder {
    title: Option<String>,
    creator: Option<String>,
    publisher: Option<String>,
    description: Option<String>,
    cover_meta: Option<String>,
    entries: Vec<Entry>,
    nav_points: Option<String>,
    container: Option<String>,
    /// Extra `<itemref>`s appended after the declared entries.
    extra_spine: Vec<String>,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn creator(mut self, creator: &str) -> Self {
        self.creator = Some(creator.to_string());
        self
    }

    pub fn publisher(mut self, publisher: &str) -> Self {
        self.publisher = Some(publisher.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// `<meta name="cover" content="{id}">`.
    pub fn cover_meta(mut self, id: &str) -> Self {
        self.cover_meta = Some(id.to_string());
        self
    }

    /// A spine chapter whose `<body>` is `body`.
    pub fn chapter(mut self, id: &str, href: &str, title: &str, body: &str) -> Self {
        self.entries.push(Entry {
            id: id.to_string(),
            href: href.to_string(),
            media_type: "application/xhtml+xml".to_string(),
            properties: None,
            data: Some(xhtml(title, body).into_bytes()),
            in_spine: true,
        });
        self
    }

    /// A spine chapter declared in the manifest whose file is absent.
    pub fn missing_chapter(mut self, id: &str, href: &str) -> Self {
        self.entries.push(Entry {
            id: id.to_string(),
            href: href.to_string(),
            media_type: "application/xhtml+xml".to_string(),
            properties: None,
            data: None,
            in_spine: true,
        });
        self
    }

    pub fn image(mut self, id: &str, href: &str, media_type: &str, data: &[u8]) -> Self {
        self.entries.push(Entry {
            id: id.to_string(),
            href: href.to_string(),
            media_type: media_type.to_string(),
            properties: None,
            data: Some(data.to_vec()),
            in_spine: false,
        });
        self
    }

    /// Add `properties` to the most recently added item.
    pub fn properties(mut self, properties: &str) -> Self {
        if let Some(entry) = self.entries.last_mut() {
            entry.properties = Some(properties.to_string());
        }
        self
    }

    /// Reference an already declared item from the spine again.
    pub fn spine_again(mut self, id: &str) -> Self {
        self.extra_spine.push(id.to_string());
        self
    }

    /// Include `toc.ncx` with the given `<navPoint>` markup.
    pub fn ncx(mut self, nav_points: &str) -> Self {
        self.nav_points = Some(nav_points.to_string());
        self
    }

    /// Replace `META-INF/container.xml`.
    pub fn container(mut self, xml: &str) -> Self {
        self.container = Some(xml.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        let container = self.container.clone().unwrap_or_else(|| {
            format!(
                r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{OPF_PATH}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
            )
        });
        zip.start_file("META-INF/container.xml", deflated).unwrap();
        zip.write_all(container.as_bytes()).unwrap();

        zip.start_file(OPF_PATH, deflated).unwrap();
        zip.write_all(self.opf().as_bytes()).unwrap();

        if let Some(nav_points) = &self.nav_points {
            zip.start_file("OEBPS/toc.ncx", deflated).unwrap();
            zip.write_all(ncx(nav_points).as_bytes()).unwrap();
        }

        for entry in &self.entries {
            if let Some(data) = &entry.data {
                zip.start_file(format!("OEBPS/{}", entry.href), deflated).unwrap();
                zip.write_all(data).unwrap();
            }
        }

        zip.finish().unwrap().into_inner()
    }

    fn opf(&self) -> String {
        let mut metadata = String::new();
        let fields = [
            ("title", &self.title),
            ("creator", &self.creator),
            ("publisher", &self.publisher),
            ("description", &self.description),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                metadata.push_str(&format!("    <dc:{name}>{value}</dc:{name}>\n"));
            }
        }
        if let Some(id) = &self.cover_meta {
            metadata.push_str(&format!("    <meta name=\"cover\" content=\"{id}\"/>\n"));
        }

        let mut manifest = String::new();
        if self.nav_points.is_some() {
            manifest.push_str(
                "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
            );
        }
        let mut spine = String::new();
        for entry in &self.entries {
            let properties = entry
                .properties
                .as_ref()
                .map(|p| format!(" properties=\"{p}\""))
                .unwrap_or_default();
            manifest.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{properties}/>\n",
                entry.id, entry.href, entry.media_type
            ));
            if entry.in_spine {
                spine.push_str(&format!("    <itemref idref=\"{}\"/>\n", entry.id));
            }
        }
        for id in &self.extra_spine {
            spine.push_str(&format!("    <itemref idref=\"{id}\"/>\n"));
        }
        let toc = if self.nav_points.is_some() { r#" toc="ncx""# } else { "" };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
{metadata}  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine{toc}>
{spine}  </spine>
</package>"#
        )
    }
}

pub fn xhtml(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title></head>
<body>
{body}
</body>
</html>"#
    )
}

fn ncx(nav_points: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head/>
  <docTitle><text>Book</text></docTitle>
  <navMap>
{nav_points}
  </navMap>
</ncx>"#
    )
}

/// A `<navPoint>` with optional nested markup.
pub fn nav_point(id: &str, label: &str, src: &str, children: &str) -> String {
    format!(
        r#"<navPoint id="{id}"><navLabel><text>{label}</text></navLabel><content src="{src}"/>{children}</navPoint>"#
    )
}

/// Three chapters, two images and a two-level outline.
pub fn sample_book() -> EpubBuilder {
    EpubBuilder::new()
        .title("Sample Book")
        .creator("Jane Writer")
        .publisher("Small Press")
        .description("A short book for tests.")
        .chapter(
            "ch1",
            "text/ch1.xhtml",
            "Opening",
            r#"<h1>Opening</h1><p>It began <em>quietly</em>.</p><p><img src="../images/map.png" alt="Map"/></p>"#,
        )
        .chapter(
            "ch2",
            "text/ch2.xhtml",
            "Middle",
            "<h2>Middle</h2><ul><li>one</li><li>two</li></ul>",
        )
        .chapter("ch3", "text/ch3.xhtml", "End", "<p>The end.</p>")
        .image("map", "images/map.png", "image/png", PNG)
        .image("cover", "images/cover.jpg", "image/jpeg", JPEG)
        .properties("cover-image")
        .ncx(&format!(
            "{}{}",
            nav_point(
                "np1",
                "Opening",
                "text/ch1.xhtml",
                &nav_point("np2", "Middle", "text/ch2.xhtml#start", ""),
            ),
            nav_point("np3", "End", "text/ch3.xhtml", ""),
        ))
}

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];
pub const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 4, 5, 6];
