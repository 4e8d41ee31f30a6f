//! Sync folder format versioning.

use crate::element::XElement;
use std::cmp::Ordering;

/// Format version written by this release.
pub const FORMAT_VERSION: &str = "10.7.0";

/// Name of the marker file written at the root of a sync folder.
pub const VERSION_FILE: &str = "usync.config";

/// Result of comparing a folder's format version against [`FORMAT_VERSION`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCheck {
    /// Same major and minor version.
    Current,
    /// Folder was written by an older format.
    Older(String),
    /// Folder was written by a newer format.
    Newer(String),
    /// No version information could be found or parsed.
    Unknown,
}

impl FormatCheck {
    /// Returns true when no warning should be raised.
    pub fn is_current(&self) -> bool {
        matches!(self, FormatCheck::Current)
    }
}

fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.trim().split('.').map(|p| p.parse::<u32>().ok());
    let major = parts.next()??;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some((major, minor, patch))
}

/// Compares a version string with the current format.
///
/// Patch level differences are ignored.
pub fn check_format(version: &str) -> FormatCheck {
    let (Some(found), Some(current)) = (parse_version(version), parse_version(FORMAT_VERSION))
    else {
        return FormatCheck::Unknown;
    };

    match (found.0, found.1).cmp(&(current.0, current.1)) {
        Ordering::Equal => FormatCheck::Current,
        Ordering::Less => FormatCheck::Older(version.to_string()),
        Ordering::Greater => FormatCheck::Newer(version.to_string()),
    }
}

/// Builds the contents of the folder version file.
pub fn version_element(product_version: &str) -> XElement {
    XElement::new("uSync")
        .with_child(XElement::text("Version", product_version))
        .with_child(XElement::text("Format", FORMAT_VERSION))
}

/// Reads the format from a version file element.
pub fn format_of(element: &XElement) -> FormatCheck {
    match element.child_value("Format") {
        Some(format) if !format.is_empty() => check_format(format),
        _ => FormatCheck::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_format() {
        assert_eq!(check_format(FORMAT_VERSION), FormatCheck::Current);
        assert_eq!(check_format("10.7.3"), FormatCheck::Current);
    }

    #[test]
    fn older_and_newer() {
        assert_eq!(check_format("9.0.0"), FormatCheck::Older("9.0.0".into()));
        assert_eq!(check_format("10.6"), FormatCheck::Older("10.6".into()));
        assert_eq!(check_format("11.0.0"), FormatCheck::Newer("11.0.0".into()));
    }

    #[test]
    fn unknown_format() {
        assert_eq!(check_format("banana"), FormatCheck::Unknown);
        assert_eq!(format_of(&XElement::new("uSync")), FormatCheck::Unknown);
    }

    #[test]
    fn version_file_roundtrip() {
        let element = version_element("13.1.0");
        assert!(format_of(&element).is_current());
    }
}
