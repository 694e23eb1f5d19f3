//! Series metadata extraction from EPUB packages
//!
//! Only the two calibre series fields are read: `container.xml` points at the
//! OPF package document, whose `<meta name="calibre:series">` and
//! `<meta name="calibre:series_index">` elements carry the values.

use crate::error::MetadataError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Well-known location of the OCF container document
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

const SERIES_NAME: &str = "calibre:series";
const SERIES_INDEX: &str = "calibre:series_index";

/// Series information found in a package
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageMetadata {
    /// Series name; `Some("")` when the element exists with empty content
    pub series_name: Option<String>,

    /// Position in the series (can be fractional)
    pub series_index: Option<f64>,
}

impl PackageMetadata {
    /// Non-empty series name
    pub fn series_name(&self) -> Option<&str> {
        self.series_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Series index as stored in the catalog, absent unless positive
    pub fn series_number(&self) -> Option<String> {
        self.series_index
            .filter(|index| *index > 0.0)
            .map(|index| index.to_string())
    }

    /// Whether there is nothing worth writing to the catalog.
    ///
    /// Only an absent or zero index counts as unset; a negative index is
    /// still written (as NULL) so the catalog row is cleared.
    pub fn is_empty(&self) -> bool {
        self.series_name().is_none() && self.series_index.map_or(true, |index| index == 0.0)
    }
}

/// Read series metadata from the EPUB at `path`
pub fn read_metadata(path: &Path) -> Result<PackageMetadata, MetadataError> {
    let file = File::open(path)?;
    read_metadata_from(BufReader::new(file))
}

/// Read series metadata from any seekable EPUB archive
pub fn read_metadata_from<R: Read + Seek>(reader: R) -> Result<PackageMetadata, MetadataError> {
    let mut archive = ZipArchive::new(reader)?;

    let container = read_entry(&mut archive, CONTAINER_PATH)?;
    let rootfile = find_rootfile(&container)?.ok_or_else(|| {
        MetadataError::MalformedContainer("no rootfile with a full-path".to_string())
    })?;
    tracing::debug!("rootfile: {}", rootfile);

    let opf = read_entry(&mut archive, rootfile.trim_start_matches('/'))?;
    parse_series(&opf, &rootfile)
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, MetadataError> {
    let mut file = archive.by_name(name)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// `full-path` of the last `rootfile` element carrying one in container.xml.
///
/// An empty value on that last element counts as no rootfile.
fn find_rootfile(xml: &str) -> Result<Option<String>, MetadataError> {
    let mut reader = Reader::from_str(xml);
    let mut found = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path", CONTAINER_PATH)? {
                    found = Some(path);
                }
            }
            Ok(Event::Eof) => return Ok(found.filter(|path| !path.is_empty())),
            Err(e) => return Err(xml_error(CONTAINER_PATH, e)),
            _ => {}
        }
    }
}

/// Scan the OPF for the calibre series elements; the first match of each wins
fn parse_series(xml: &str, entry: &str) -> Result<PackageMetadata, MetadataError> {
    let mut reader = Reader::from_str(xml);
    let mut metadata = PackageMetadata::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"meta" => {
                match attribute(&e, b"name", entry)?.as_deref() {
                    Some(SERIES_NAME) if metadata.series_name.is_none() => {
                        metadata.series_name =
                            Some(attribute(&e, b"content", entry)?.unwrap_or_default());
                    }
                    Some(SERIES_INDEX) if metadata.series_index.is_none() => {
                        // Unparseable values are skipped, a later element may still match
                        metadata.series_index = attribute(&e, b"content", entry)?
                            .and_then(|content| content.trim().parse::<f64>().ok())
                            .filter(|index| index.is_finite());
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(entry, e)),
            _ => {}
        }
    }

    Ok(metadata)
}

/// Unescaped value of the attribute with the given local name
fn attribute(
    element: &BytesStart<'_>,
    name: &[u8],
    entry: &str,
) -> Result<Option<String>, MetadataError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| xml_error(entry, e))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value().map_err(|e| xml_error(entry, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn xml_error(entry: &str, err: impl Display) -> MetadataError {
    MetadataError::MalformedXml {
        entry: entry.to_string(),
        message: err.to_string(),
    }
}
