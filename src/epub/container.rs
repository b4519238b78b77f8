//! `META-INF/container.xml`: locating the package document.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::archive::Archive;
use super::xml::{attr, local_name};
use crate::error::{Error, Result};
use crate::util::parent_dir;

/// Fixed path of the container descriptor.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Where the package document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocation {
    /// Full archive path of the OPF file.
    pub opf_path: String,
    /// Folder prefix for manifest hrefs, empty or ending in `/`.
    pub base: String,
}

impl PackageLocation {
    pub fn new(opf_path: impl Into<String>) -> Self {
        let opf_path = opf_path.into();
        let base = parent_dir(&opf_path).to_string();
        Self { opf_path, base }
    }
}

/// Find the package document declared by the container descriptor.
pub fn resolve_container(archive: &Archive) -> Result<PackageLocation> {
    let content = archive.read_text(CONTAINER_PATH).map_err(|e| match e {
        Error::ResourceNotFound(_) => Error::invalid_container(format!("{CONTAINER_PATH} not found")),
        other => other,
    })?;

    let opf_path = parse_container_xml(&content)?;
    tracing::debug!(%opf_path, "found package document");
    Ok(PackageLocation::new(opf_path))
}

/// Extract the first `rootfile/@full-path` from a container descriptor.
pub fn parse_container_xml(content: &str) -> Result<String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                return match attr(&e, b"full-path") {
                    Some(path) if !path.trim().is_empty() => Ok(path.trim().to_string()),
                    _ => Err(Error::invalid_container(
                        "rootfile element has no full-path attribute",
                    )),
                };
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::invalid_container(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    Err(Error::invalid_container("no rootfile element"))
}
