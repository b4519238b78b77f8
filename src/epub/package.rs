//! OPF package document: metadata, manifest and spine.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::archive::Archive;
use super::container::PackageLocation;
use super::xml::{attr, local_name, normalize_space, resolve_entity};
use crate::book::{Metadata, UNKNOWN_TITLE};
use crate::error::{Error, Result};
use crate::util::resolve_href;

/// A resource declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// The href as written in the package document.
    pub href: String,
    /// Full archive path the href resolves to.
    pub path: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestItem {
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }
}

/// Parsed package document.
#[derive(Debug, Clone)]
pub struct Package {
    pub location: PackageLocation,
    pub metadata: Metadata,
    /// Manifest items in document order.
    pub manifest: Vec<ManifestItem>,
    manifest_index: HashMap<String, usize>,
    /// Manifest ids in reading order.
    pub spine: Vec<String>,
    /// Manifest id of the NCX, from `spine/@toc`.
    pub toc_id: Option<String>,
    /// Manifest id named by `<meta name="cover" content="…">`.
    pub cover_id: Option<String>,
}

impl Package {
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest_index.get(id).map(|&i| &self.manifest[i])
    }

    /// Manifest item of the legacy navigation document, if declared.
    pub fn ncx_item(&self) -> Option<&ManifestItem> {
        self.toc_id.as_deref().and_then(|id| self.item(id))
    }
}

/// Read and parse the package document.
pub fn read_package(archive: &Archive, location: &PackageLocation) -> Result<Package> {
    let content = archive.read_text(&location.opf_path).map_err(|e| match e {
        Error::ResourceNotFound(path) => Error::PackageNotFound(path),
        other => other,
    })?;
    parse_package(&content, location)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MetaField {
    Title,
    Creator,
    Publisher,
    Language,
    Identifier,
    Description,
}

impl MetaField {
    fn from_local(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"creator" => Some(Self::Creator),
            b"publisher" => Some(Self::Publisher),
            b"language" => Some(Self::Language),
            b"identifier" => Some(Self::Identifier),
            b"description" => Some(Self::Description),
            _ => None,
        }
    }
}

#[derive(Default)]
struct PackageBuilder {
    title: Option<String>,
    creator: Option<String>,
    publisher: Option<String>,
    language: Option<String>,
    identifier: Option<String>,
    description: Option<String>,
    manifest: Vec<ManifestItem>,
    manifest_index: HashMap<String, usize>,
    spine: Vec<String>,
    toc_id: Option<String>,
    cover_id: Option<String>,
    /// Fields whose first element has been read, even if it was blank.
    claimed: Vec<MetaField>,
    saw_manifest: bool,
    saw_spine: bool,
}

impl PackageBuilder {
    fn element(&mut self, e: &BytesStart<'_>, in_metadata: bool, base: &str) {
        match local_name(e.name().as_ref()) {
            b"manifest" => self.saw_manifest = true,
            b"spine" => {
                self.saw_spine = true;
                self.toc_id = attr(e, b"toc").filter(|id| !id.is_empty());
            }
            b"item" => {
                let Some(id) = attr(e, b"id").filter(|id| !id.is_empty()) else {
                    return;
                };
                let href = attr(e, b"href").unwrap_or_default();
                let item = ManifestItem {
                    path: resolve_href(base, &href),
                    href,
                    media_type: attr(e, b"media-type").unwrap_or_default(),
                    properties: attr(e, b"properties")
                        .map(|p| p.split_ascii_whitespace().map(String::from).collect())
                        .unwrap_or_default(),
                    id: id.clone(),
                };
                if !self.manifest_index.contains_key(&id) {
                    self.manifest_index.insert(id, self.manifest.len());
                    self.manifest.push(item);
                }
            }
            b"itemref" => {
                if let Some(idref) = attr(e, b"idref") {
                    self.spine.push(idref);
                }
            }
            b"meta" if in_metadata && self.cover_id.is_none() => {
                if attr(e, b"name").as_deref() == Some("cover")
                    && let Some(content) = attr(e, b"content").filter(|c| !c.is_empty())
                {
                    self.cover_id = Some(content);
                }
            }
            _ => {}
        }
    }

    /// Only the first element per field counts; a blank one leaves the
    /// field absent.
    fn set_field(&mut self, field: MetaField, text: &str) {
        if self.claimed.contains(&field) {
            return;
        }
        self.claimed.push(field);

        let value = match field {
            MetaField::Description => trim_lines(text),
            _ => normalize_space(text),
        };
        if value.is_empty() {
            return;
        }
        let slot = match field {
            MetaField::Title => &mut self.title,
            MetaField::Creator => &mut self.creator,
            MetaField::Publisher => &mut self.publisher,
            MetaField::Language => &mut self.language,
            MetaField::Identifier => &mut self.identifier,
            MetaField::Description => &mut self.description,
        };
        *slot = Some(value);
    }

    fn finish(self, location: &PackageLocation) -> Result<Package> {
        if !self.saw_manifest {
            return Err(Error::invalid_package(
                &location.opf_path,
                "missing <manifest> element",
            ));
        }
        if !self.saw_spine {
            return Err(Error::invalid_package(
                &location.opf_path,
                "missing <spine> element",
            ));
        }

        let metadata = Metadata {
            title: self.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            creator: self.creator,
            publisher: self.publisher,
            language: self.language,
            identifier: self.identifier,
            description: self.description,
            cover_image: None,
        };

        Ok(Package {
            location: location.clone(),
            metadata,
            manifest: self.manifest,
            manifest_index: self.manifest_index,
            spine: self.spine,
            toc_id: self.toc_id,
            cover_id: self.cover_id,
        })
    }
}

/// Trim each line, keeping line breaks so paragraphs survive.
fn trim_lines(text: &str) -> String {
    text.trim().lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

/// Parse OPF package document content.
pub fn parse_package(content: &str, location: &PackageLocation) -> Result<Package> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut builder = PackageBuilder::default();
    let mut in_metadata = false;
    let mut current: Option<MetaField> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = true;
                } else if in_metadata && let Some(field) = MetaField::from_local(local) {
                    current = Some(field);
                    buf_text.clear();
                } else {
                    builder.element(&e, in_metadata, &location.base);
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                match MetaField::from_local(local_name(name.as_ref())) {
                    Some(field) if in_metadata => builder.set_field(field, ""),
                    _ => builder.element(&e, in_metadata, &location.base),
                }
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    buf_text.push_str(&resolved);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = false;
                }
                if let Some(field) = current
                    && MetaField::from_local(local) == Some(field)
                {
                    builder.set_field(field, &buf_text);
                    current = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::invalid_package(
                    &location.opf_path,
                    format!("malformed XML at byte {}: {e}", reader.buffer_position()),
                ));
            }
            _ => {}
        }
    }

    let package = builder.finish(location)?;
    tracing::debug!(
        manifest = package.manifest.len(),
        spine = package.spine.len(),
        title = %package.metadata.title,
        "parsed package document"
    );
    Ok(package)
}
