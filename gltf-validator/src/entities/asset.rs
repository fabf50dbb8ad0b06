//! Asset metadata and version gating

use crate::issue::{IssueCode, IssueSink};
use crate::reader::ObjectReader;

/// Version pattern as written in messages
const VERSION_PATTERN: &str = r"^([0-9]+)\.([0-9]+)$";

/// Parse `MAJOR.MINOR`; anything else is a pattern mismatch
pub fn parse_version(text: &str) -> Option<(u32, u32)> {
    let (major, minor) = text.split_once('.')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(major) || !digits(minor) {
        return None;
    }
    Some((major.parse().ok()?, minor.parse().ok()?))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Asset {
    pub version: Option<(u32, u32)>,
    pub version_text: Option<String>,
    pub min_version: Option<(u32, u32)>,
    pub min_version_text: Option<String>,
    pub generator: Option<String>,
    pub copyright: Option<String>,
}

impl Asset {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        let copyright = r.string("copyright").map(str::to_string);
        let generator = r.string("generator").map(str::to_string);
        let version_text = r.required_string("version").map(str::to_string);
        let min_version_text = r.string("minVersion").map(str::to_string);

        let mut parse = |key: &str, text: Option<&String>| {
            let text = text?;
            let parsed = parse_version(text);
            if parsed.is_none() {
                r.issue(
                    IssueCode::PatternMismatch,
                    key,
                    format!("Value '{text}' does not match regexp pattern '{VERSION_PATTERN}'."),
                );
            }
            parsed
        };
        let version = parse("version", version_text.as_ref());
        let min_version = parse("minVersion", min_version_text.as_ref());

        Self {
            version,
            version_text,
            min_version,
            min_version_text,
            generator,
            copyright,
        }
    }

    /// Whether the declared major version is one this validator understands
    ///
    /// A document with an unparseable version is still validated.
    pub fn is_supported(&self) -> bool {
        self.version.is_none_or(|(major, _)| major == 2)
    }

    pub fn validate(&self, sink: &mut IssueSink<'_>) {
        let Some((major, minor)) = self.version else {
            return;
        };
        if major != 2 {
            sink.add(
                IssueCode::UnknownAssetMajorVersion,
                "/asset/version",
                format!("Unknown glTF major asset version: {major}."),
            );
            return;
        }
        if minor > 0 {
            sink.add(
                IssueCode::UnknownAssetMinorVersion,
                "/asset/version",
                format!("Unknown glTF minor asset version: {minor}."),
            );
        }
        if let (Some(min), Some(text), Some(version_text)) =
            (self.min_version, &self.min_version_text, &self.version_text)
        {
            if min > (major, minor) {
                sink.add(
                    IssueCode::AssetMinVersionGreaterThanVersion,
                    "/asset/minVersion",
                    format!("Asset minVersion '{text}' is greater than version '{version_text}'."),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("2.0"), Some((2, 0)));
        assert_eq!(parse_version("10.25"), Some((10, 25)));
        assert_eq!(parse_version("2"), None);
        assert_eq!(parse_version("2.0.1"), None);
        assert_eq!(parse_version("v2.0"), None);
        assert_eq!(parse_version(".0"), None);
    }

    #[test]
    fn test_unknown_major_version() {
        let overrides = Default::default();
        let mut sink = IssueSink::new(&overrides);
        let asset = Asset {
            version: Some((3, 0)),
            version_text: Some("3.0".into()),
            ..Default::default()
        };
        assert!(!asset.is_supported());
        asset.validate(&mut sink);
        assert_eq!(sink.issues().len(), 1);
        assert_eq!(sink.issues()[0].code, IssueCode::UnknownAssetMajorVersion);
    }

    #[test]
    fn test_min_version_greater() {
        let overrides = Default::default();
        let mut sink = IssueSink::new(&overrides);
        let asset = Asset {
            version: Some((2, 0)),
            version_text: Some("2.0".into()),
            min_version: Some((2, 1)),
            min_version_text: Some("2.1".into()),
            ..Default::default()
        };
        asset.validate(&mut sink);
        let codes: Vec<_> = sink.issues().iter().map(|i| i.code).collect();
        assert_eq!(codes, vec![IssueCode::AssetMinVersionGreaterThanVersion]);
    }
}
