//! Runtime resource overlay (RRO) package scaffolding
//!
//! Produces:
//!
//! ```text
//! <output_dir>/<name>/
//!     AndroidManifest.xml
//!     Android.bp
//!     res/values/config.xml
//! ```

use droidtools_core::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::path::{Path, PathBuf};
use tracing::info;

/// Manifest file name at the root of a decoded archive
pub const MANIFEST_FILE: &str = "AndroidManifest.xml";

/// Build descriptor file name
pub const BLUEPRINT_FILE: &str = "Android.bp";

const ANDROID_NAMESPACE: &str = "http://schemas.android.com/apk/res/android";

/// Read the `package` attribute of the manifest root element
pub fn manifest_package(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader
            .read_event()
            .map_err(|e| Error::manifest(format!("Malformed manifest: {}", e)))?
        {
            Event::Start(root) | Event::Empty(root) => {
                let package = root
                    .try_get_attribute("package")
                    .map_err(|e| Error::manifest(format!("Malformed manifest attribute: {}", e)))?
                    .ok_or_else(|| Error::manifest("Manifest root has no package attribute"))?;
                let package = package
                    .unescape_value()
                    .map_err(|e| Error::manifest(format!("Malformed package attribute: {}", e)))?;
                let package = package.trim();
                if package.is_empty() {
                    return Err(Error::manifest("Manifest package attribute is empty"));
                }
                return Ok(package.to_string());
            }
            Event::Eof => return Err(Error::manifest("Manifest has no root element")),
            _ => {}
        }
    }
}

/// Read the package name declared by a decoded archive
pub fn read_manifest_package(decoded_root: &Path) -> Result<String> {
    let path = decoded_root.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(Error::manifest(format!("Manifest not found: {}", path.display()))
            .with_suggestion("Check that the archive decoded into a full application tree"));
    }
    let xml = std::fs::read_to_string(&path)?;
    manifest_package(&xml).map_err(|e| e.with_context(format!("Reading {}", path.display())))
}

/// Overlay package identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    /// Module name and directory name
    pub name: String,
    /// Package name of the overlay itself
    pub package: String,
    /// Package whose resources are overlaid
    pub target_package: String,
}

impl OverlaySpec {
    /// Describe an overlay; the package defaults to `<target>.overlay`
    pub fn new(name: &str, target_package: &str, package: Option<&str>) -> Result<Self> {
        validate_name(name)?;
        let package = package
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.overlay", target_package));
        validate_package(&package)?;
        validate_package(target_package)?;

        Ok(Self {
            name: name.to_string(),
            package,
            target_package: target_package.to_string(),
        })
    }
}

/// Reject overlay names that are not a single safe path component
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && name != "."
        && name != "..";
    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!("Invalid overlay name: {:?}", name))
            .with_suggestion("Use letters, digits, '_', '-' or '.'"))
    }
}

fn validate_package(package: &str) -> Result<()> {
    let valid = package.split('.').all(|segment| {
        segment
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    });
    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!("Invalid package name: {:?}", package)))
    }
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::io(format!("Failed to render manifest: {}", err))
}

/// Overlay `AndroidManifest.xml`
pub fn render_manifest(spec: &OverlaySpec) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_error)?;

    let mut manifest = BytesStart::new("manifest");
    manifest.push_attribute(("xmlns:android", ANDROID_NAMESPACE));
    manifest.push_attribute(("package", spec.package.as_str()));
    writer.write_event(Event::Start(manifest)).map_err(xml_error)?;

    let mut overlay = BytesStart::new("overlay");
    overlay.push_attribute(("android:targetPackage", spec.target_package.as_str()));
    overlay.push_attribute(("android:priority", "1"));
    overlay.push_attribute(("android:isStatic", "true"));
    writer.write_event(Event::Empty(overlay)).map_err(xml_error)?;

    writer
        .write_event(Event::End(BytesEnd::new("manifest")))
        .map_err(xml_error)?;

    let mut xml = String::from_utf8(writer.into_inner()).map_err(xml_error)?;
    xml.push('\n');
    Ok(xml)
}

/// Overlay `Android.bp`
pub fn render_blueprint(spec: &OverlaySpec) -> String {
    format!(
        r#"runtime_resource_overlay {{
    name: "{name}",
    certificate: "platform",
    visibility: ["//visibility:public"],
    resource_dirs: ["res"],
    package_name: "{package}",
}}
"#,
        name = spec.name,
        package = spec.package,
    )
}

/// Create the overlay package directory from an already rendered values file
///
/// Returns the overlay directory.
pub fn scaffold(spec: &OverlaySpec, output_dir: &Path, values_file: &Path) -> Result<PathBuf> {
    if !values_file.is_file() {
        return Err(Error::file_not_found(values_file));
    }

    let overlay_dir = output_dir.join(&spec.name);
    let values_dir = overlay_dir.join("res").join("values");
    std::fs::create_dir_all(&values_dir)?;

    std::fs::copy(values_file, values_dir.join("config.xml"))?;
    std::fs::write(overlay_dir.join(MANIFEST_FILE), render_manifest(spec)?)?;
    std::fs::write(overlay_dir.join(BLUEPRINT_FILE), render_blueprint(spec))?;

    info!(
        overlay = %spec.name,
        package = %spec.package,
        target = %spec.target_package,
        dir = %overlay_dir.display(),
        "Scaffolded overlay package"
    );
    Ok(overlay_dir)
}
