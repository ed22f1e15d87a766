//! Typed Android value resources and the `res/values` loader
//!
//! A resource tree is flattened into a [`ResourceMap`] keyed by
//! `type:name`. Files are visited in lexicographic path order and later
//! definitions replace earlier ones.

use droidtools_core::error::{Error, Result};
use droidtools_core::file_scanner::FileScanner;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Encodings tried, in order, when a values file is read
pub const ENCODINGS: [&Encoding; 4] = [UTF_8, UTF_16LE, UTF_16BE, WINDOWS_1252];

/// Value resource element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    String,
    StringArray,
    Bool,
    Integer,
    Dimen,
}

impl ResourceKind {
    /// Every supported kind
    pub const ALL: [ResourceKind; 5] = [
        Self::String,
        Self::StringArray,
        Self::Bool,
        Self::Integer,
        Self::Dimen,
    ];

    /// XML element name
    pub fn tag(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::StringArray => "string-array",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Dimen => "dimen",
        }
    }

    /// Kind for an XML element name
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Composite `type:name` resource identifier
///
/// Names are trimmed and lower-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, name: &str) -> Self {
        Self {
            kind,
            name: name.trim().to_lowercase(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl FromStr for ResourceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        let (tag, name) = normalized
            .split_once(':')
            .ok_or_else(|| Error::invalid_format(format!("Resource key without type: {}", s)))?;
        let kind = ResourceKind::from_tag(tag)
            .ok_or_else(|| Error::invalid_format(format!("Unknown resource type: {}", tag)))?;
        Ok(Self::new(kind, name))
    }
}

/// Text content of a resource element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceValue {
    /// Scalar text (string, bool, integer, dimen)
    Text(String),
    /// `<item>` texts of a string-array, in order
    Items(Vec<String>),
}

impl ResourceValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl fmt::Display for ResourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Items(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Flattened resources of a tree
pub type ResourceMap = BTreeMap<ResourceKey, ResourceValue>;

/// One parsed resource definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub key: ResourceKey,
    pub value: ResourceValue,
}

struct PendingEntry {
    key: ResourceKey,
    text: String,
    items: Vec<String>,
    item_depth: Option<usize>,
}

impl PendingEntry {
    fn from_start(start: &BytesStart<'_>) -> Result<Option<Self>> {
        let local = start.local_name();
        let Some(kind) = std::str::from_utf8(local.as_ref())
            .ok()
            .and_then(ResourceKind::from_tag)
        else {
            return Ok(None);
        };

        let Some(attr) = start.try_get_attribute("name").map_err(xml_error)? else {
            return Ok(None);
        };
        let name = attr.unescape_value().map_err(xml_error)?;

        Ok(Some(Self {
            key: ResourceKey::new(kind, &name),
            text: String::new(),
            items: Vec::new(),
            item_depth: None,
        }))
    }

    fn is_array(&self) -> bool {
        self.key.kind == ResourceKind::StringArray
    }

    fn push_text(&mut self, text: &str) {
        if !self.is_array() {
            self.text.push_str(text);
        } else if self.item_depth.is_some() {
            if let Some(item) = self.items.last_mut() {
                item.push_str(text);
            }
        }
    }

    fn finish(self) -> ResourceEntry {
        let value = if self.is_array() {
            ResourceValue::Items(self.items)
        } else {
            ResourceValue::Text(self.text)
        };
        ResourceEntry {
            key: self.key,
            value,
        }
    }
}

fn is_item(start: &BytesStart<'_>) -> bool {
    start.local_name().as_ref() == b"item"
}

fn xml_error(err: impl fmt::Display) -> Error {
    Error::resource(format!("Malformed resource XML: {}", err))
}

/// Parse the resource definitions of one values document
///
/// Only direct children of the root element are considered. The returned
/// entries keep document order, duplicates included.
pub fn parse_resources(xml: &str) -> Result<Vec<ResourceEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current: Option<PendingEntry> = None;
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => {
                depth += 1;
                match depth {
                    1 => saw_root = true,
                    2 => current = PendingEntry::from_start(&start)?,
                    _ => {
                        if let Some(entry) = current.as_mut() {
                            if depth == 3 && entry.is_array() && is_item(&start) {
                                entry.items.push(String::new());
                                entry.item_depth = Some(depth);
                            }
                        }
                    }
                }
            }
            Event::Empty(start) => match depth {
                0 => saw_root = true,
                1 => {
                    if let Some(entry) = PendingEntry::from_start(&start)? {
                        entries.push(entry.finish());
                    }
                }
                2 => {
                    if let Some(entry) = current.as_mut() {
                        if entry.is_array() && is_item(&start) {
                            entry.items.push(String::new());
                        }
                    }
                }
                _ => {}
            },
            Event::End(_) => {
                if depth == 0 {
                    return Err(Error::resource("Unbalanced end tag"));
                }
                if let Some(entry) = current.as_mut() {
                    if entry.item_depth == Some(depth) {
                        entry.item_depth = None;
                    }
                }
                if depth == 2 {
                    if let Some(entry) = current.take() {
                        entries.push(entry.finish());
                    }
                }
                depth -= 1;
            }
            Event::Text(text) => {
                if let Some(entry) = current.as_mut() {
                    entry.push_text(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(entry) = current.as_mut() {
                    entry.push_text(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(Error::resource("Unclosed element at end of document"));
    }
    if !saw_root {
        return Err(Error::resource("Document has no root element"));
    }

    Ok(entries)
}

/// Decode raw bytes with the first encoding under which they parse
///
/// Returns the entries and the name of the encoding that worked.
pub fn decode_resources(bytes: &[u8]) -> Result<(Vec<ResourceEntry>, &'static str)> {
    let mut last_error = None;

    for encoding in ENCODINGS {
        let body = match Encoding::for_bom(bytes) {
            Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
            _ => bytes,
        };

        let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(body) else {
            continue;
        };

        match parse_resources(&text) {
            Ok(entries) => return Ok((entries, encoding.name())),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or_else(|| Error::resource("No encoding could decode the file")))
}

/// Parse one values file from disk
pub fn load_file(path: &Path) -> Result<Vec<ResourceEntry>> {
    let bytes = std::fs::read(path)?;
    let (entries, encoding) = decode_resources(&bytes)
        .map_err(|e| e.with_context(format!("While parsing {}", path.display())))?;
    debug!(
        path = %path.display(),
        encoding,
        entries = entries.len(),
        "Parsed values file"
    );
    Ok(entries)
}

/// Whether a path has the shape `.../res/values/<file>.xml`
pub fn is_values_file(path: &Path) -> bool {
    let is_xml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    let mut ancestors = path.ancestors().skip(1);
    let parent = ancestors.next().and_then(Path::file_name);
    let grandparent = ancestors.next().and_then(Path::file_name);
    is_xml && parent.is_some_and(|n| n == "values") && grandparent.is_some_and(|n| n == "res")
}

/// Every `res/values/*.xml` file below `root`, sorted by path
pub fn find_resource_files(root: &Path) -> Result<Vec<PathBuf>> {
    Ok(FileScanner::new(root)
        .with_extensions(&["xml"])
        .scan()?
        .into_iter()
        .filter(|path| is_values_file(path))
        .collect())
}

/// Load and flatten every values file below `root`
///
/// Files that cannot be parsed under any encoding are skipped with a
/// warning.
pub fn load_tree(root: &Path) -> Result<ResourceMap> {
    let files = find_resource_files(root)?;
    let mut map = ResourceMap::new();
    let mut skipped = 0usize;

    for path in &files {
        match load_file(path) {
            Ok(entries) => {
                for entry in entries {
                    if let Some(previous) = map.insert(entry.key.clone(), entry.value) {
                        debug!(key = %entry.key, replaced = %previous, "Resource redefined");
                    }
                }
            }
            Err(e) => {
                skipped += 1;
                warn!(path = %path.display(), error = %e.message, "Skipping unparseable values file");
            }
        }
    }

    info!(
        root = %root.display(),
        files = files.len(),
        skipped,
        entries = map.len(),
        "Loaded resource tree"
    );
    Ok(map)
}
