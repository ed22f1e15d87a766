//! Rendering resource maps back to `res/values` XML
//!
//! Output layout:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <!-- Apache 2.0 header with the current year -->
//! <resources xmlns:xliff="urn:oasis:names:tc:xliff:document:1.2">
//!     <bool name="config_foo">true</bool>
//! </resources>
//! ```

use crate::resources::{ResourceKey, ResourceValue};
use chrono::Datelike;
use droidtools_core::error::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::path::Path;

/// Namespace declared on the root element for translation tooling
pub const XLIFF_NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:1.2";

/// The one XML declaration every generated file starts with
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

const INDENT: usize = 4;

/// Header parameters
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub year: i32,
    pub copyright_holder: String,
}

impl RenderOptions {
    /// Options stamped with the current local year
    pub fn current(copyright_holder: impl Into<String>) -> Self {
        Self {
            year: chrono::Local::now().year(),
            copyright_holder: copyright_holder.into(),
        }
    }
}

/// Apache 2.0 license comment
pub fn license_header(year: i32, holder: &str) -> String {
    format!(
        r#"<!--
     Copyright (C) {year} {holder}

     Licensed under the Apache License, Version 2.0 (the "License");
     you may not use this file except in compliance with the License.
     You may obtain a copy of the License at

          http://www.apache.org/licenses/LICENSE-2.0

     Unless required by applicable law or agreed to in writing, software
     distributed under the License is distributed on an "AS IS" BASIS,
     WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
     See the License for the specific language governing permissions and
     limitations under the License.
-->"#
    )
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::io(format!("Failed to render XML: {}", err))
}

/// Drop a leading XML declaration, if any
pub fn strip_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return trimmed[end + 2..].trim_start();
        }
    }
    trimmed
}

/// Render entries as a values document, ordered by key
pub fn render_resources<'a, I>(entries: I, options: &RenderOptions) -> Result<String>
where
    I: IntoIterator<Item = (&'a ResourceKey, &'a ResourceValue)>,
{
    let mut sorted: Vec<_> = entries.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);

    let mut root = BytesStart::new("resources");
    root.push_attribute(("xmlns:xliff", XLIFF_NAMESPACE));
    writer.write_event(Event::Start(root)).map_err(xml_error)?;

    for (key, value) in sorted {
        write_entry(&mut writer, key, value)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("resources")))
        .map_err(xml_error)?;

    let body = String::from_utf8(writer.into_inner()).map_err(xml_error)?;

    Ok(format!(
        "{}\n{}\n{}\n",
        XML_DECLARATION,
        license_header(options.year, &options.copyright_holder),
        strip_declaration(&body)
    ))
}

fn write_entry(writer: &mut Writer<Vec<u8>>, key: &ResourceKey, value: &ResourceValue) -> Result<()> {
    let tag = key.kind.tag();
    let mut start = BytesStart::new(tag);
    start.push_attribute(("name", key.name.as_str()));

    match value {
        ResourceValue::Text(text) if text.is_empty() => {
            writer.write_event(Event::Empty(start)).map_err(xml_error)?;
        }
        ResourceValue::Text(text) => {
            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_error)?;
            writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)?;
        }
        ResourceValue::Items(items) if items.is_empty() => {
            writer.write_event(Event::Empty(start)).map_err(xml_error)?;
        }
        ResourceValue::Items(items) => {
            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            for item in items {
                if item.is_empty() {
                    writer
                        .write_event(Event::Empty(BytesStart::new("item")))
                        .map_err(xml_error)?;
                } else {
                    writer
                        .write_event(Event::Start(BytesStart::new("item")))
                        .map_err(xml_error)?;
                    writer
                        .write_event(Event::Text(BytesText::new(item)))
                        .map_err(xml_error)?;
                    writer
                        .write_event(Event::End(BytesEnd::new("item")))
                        .map_err(xml_error)?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)?;
        }
    }

    Ok(())
}

/// Render and write entries to `path`, creating parent directories
pub fn write_resources<'a, I>(path: &Path, entries: I, options: &RenderOptions) -> Result<()>
where
    I: IntoIterator<Item = (&'a ResourceKey, &'a ResourceValue)>,
{
    let document = render_resources(entries, options)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, document)
        .map_err(Error::from)
        .map_err(|e| e.with_context(format!("Writing {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{parse_resources, ResourceKind, ResourceMap};

    fn options() -> RenderOptions {
        RenderOptions {
            year: 2024,
            copyright_holder: "The Android Open Source Project".to_string(),
        }
    }

    fn sample() -> ResourceMap {
        [
            (ResourceKey::new(ResourceKind::String, "title"), ResourceValue::text("Fish & chips")),
            (ResourceKey::new(ResourceKind::Bool, "config_enabled"), ResourceValue::text("true")),
            (ResourceKey::new(ResourceKind::Dimen, "margin"), ResourceValue::text("")),
            (
                ResourceKey::new(ResourceKind::StringArray, "modes"),
                ResourceValue::Items(vec!["auto".into(), "".into(), "off".into()]),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_document_layout() {
        let xml = render_resources(&sample(), &options()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!--"));
        assert_eq!(xml.matches("<?xml").count(), 1);
        assert!(xml.contains("Copyright (C) 2024 The Android Open Source Project"));
        assert!(xml.contains(r#"<resources xmlns:xliff="urn:oasis:names:tc:xliff:document:1.2">"#));
        assert!(xml.contains("\n    <bool name=\"config_enabled\">true</bool>\n"));
        assert!(xml.contains("\n    <dimen name=\"margin\"/>\n"));
        assert!(xml.contains("\n        <item>auto</item>\n"));
        assert!(xml.trim_end().ends_with("</resources>"));
    }

    #[test]
    fn test_entries_are_sorted_by_key() {
        let xml = render_resources(&sample(), &options()).unwrap();
        let string_pos = xml.find("<string name=\"title\"").unwrap();
        let bool_pos = xml.find("<bool name=\"config_enabled\"").unwrap();
        let array_pos = xml.find("<string-array name=\"modes\"").unwrap();
        assert!(string_pos < array_pos);
        assert!(array_pos < bool_pos);
    }

    #[test]
    fn test_round_trip_through_loader() {
        let original = sample();
        let xml = render_resources(&original, &options()).unwrap();

        let reparsed: ResourceMap = parse_resources(&xml)
            .unwrap()
            .into_iter()
            .map(|e| (e.key, e.value))
            .collect();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_empty_map_renders_empty_root() {
        let xml = render_resources(&ResourceMap::new(), &options()).unwrap();
        assert!(parse_resources(&xml).unwrap().is_empty());
    }

    #[test]
    fn test_strip_declaration() {
        assert_eq!(strip_declaration("<?xml version=\"1.0\"?>\n<a/>"), "<a/>");
        assert_eq!(strip_declaration("<a/>"), "<a/>");
    }

    #[test]
    fn test_current_year_is_used() {
        let opts = RenderOptions::current("Someone");
        assert!(opts.year >= 2024);
        assert_eq!(opts.copyright_holder, "Someone");
    }
}
