//! External resource capability and in-document URI handling

use crate::error::ResourceError;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use percent_encoding::percent_decode_str;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Future returned by [`ResourceLoader::load`]
pub type ResourceFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, ResourceError>> + Send + 'a>>;

/// Fetches bytes for relative URIs found in the document
///
/// Calls may run concurrently and in any order. A failed fetch degrades to an
/// `IO_ERROR` issue; the engine never retries.
pub trait ResourceLoader: Send + Sync {
    /// `uri` is exactly as written in the document (percent-encoded, relative)
    fn load<'a>(&'a self, uri: &'a str) -> ResourceFuture<'a>;
}

/// Resolves URIs against a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FileLoader {
    base: PathBuf,
}

impl FileLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl ResourceLoader for FileLoader {
    fn load<'a>(&'a self, uri: &'a str) -> ResourceFuture<'a> {
        Box::pin(async move {
            if has_scheme(uri) {
                return Err(ResourceError::Unsupported(uri.to_string()));
            }
            let path = self.base.join(percent_decode(uri));
            tracing::trace!("Loading resource {}", path.display());
            std::fs::read(&path).map_err(|err| ResourceError::from_io(uri, &err))
        })
    }
}

// =============================================================================
// URIs
// =============================================================================

/// `scheme:` prefix per RFC 3986
pub(crate) fn has_scheme(uri: &str) -> bool {
    let Some(colon) = uri.find(':') else {
        return false;
    };
    let scheme = &uri[..colon];
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Whether the URI can be resolved against the document's location
pub(crate) fn is_relative_reference(uri: &str) -> bool {
    !has_scheme(uri) && !uri.starts_with('/') && !uri.starts_with('\\')
}

/// Syntax check: no whitespace or control characters, well-formed escapes
pub(crate) fn is_valid_uri(uri: &str) -> bool {
    let bytes = uri.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3);
                if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                    return false;
                }
                i += 3;
            }
            b if b.is_ascii_control() || b == b' ' || b == b'\\' => return false,
            _ => i += 1,
        }
    }
    true
}

pub(crate) fn percent_decode(uri: &str) -> String {
    percent_decode_str(uri).decode_utf8_lossy().into_owned()
}

// =============================================================================
// Data URIs
// =============================================================================

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Decoded `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

pub(crate) fn is_data_uri(uri: &str) -> bool {
    uri.get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
}

/// Decode a base64 `data:` URI; `None` if malformed
pub(crate) fn decode_data_uri(uri: &str) -> Option<DataUri> {
    if !is_data_uri(uri) {
        return None;
    }
    let (header, payload) = uri[5..].split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    let data = decode_base64(payload)?;
    Some(DataUri {
        mime_type: mime_type.to_string(),
        data,
    })
}

/// Standard or URL-safe base64, padding optional
pub(crate) fn decode_base64(input: &str) -> Option<Vec<u8>> {
    STANDARD_LENIENT
        .decode(input)
        .or_else(|_| URL_SAFE_LENIENT.decode(input))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64() {
        assert_eq!(decode_base64("Zm9v").unwrap(), b"foo");
        assert_eq!(decode_base64("Zm8=").unwrap(), b"fo");
        assert_eq!(decode_base64("Zg==").unwrap(), b"f");
        assert_eq!(decode_base64("Zg").unwrap(), b"f");
        assert_eq!(decode_base64("").unwrap(), b"");
        assert!(decode_base64("Z").is_none());
        assert!(decode_base64("Zm9v!").is_none());
        assert!(decode_base64("Zg===").is_none());
        assert_eq!(decode_base64("-_8").unwrap(), vec![0xFB, 0xFF]);
        assert_eq!(decode_base64("+/8=").unwrap(), vec![0xFB, 0xFF]);
    }

    #[test]
    fn test_decode_data_uri() {
        let uri = decode_data_uri("data:application/octet-stream;base64,AQID").unwrap();
        assert_eq!(uri.mime_type, "application/octet-stream");
        assert_eq!(uri.data, vec![1, 2, 3]);

        assert!(decode_data_uri("data:text/plain,hello").is_none());
        assert!(decode_data_uri("data:;base64").is_none());
        assert!(decode_data_uri("model.bin").is_none());
    }

    #[test]
    fn test_uri_classification() {
        assert!(is_relative_reference("textures/a.png"));
        assert!(!is_relative_reference("https://example.com/a.png"));
        assert!(!is_relative_reference("/abs/a.png"));
        assert!(has_scheme("file:///a.bin"));
        assert!(!has_scheme("1abc:def"));
        assert!(is_valid_uri("my%20model.bin"));
        assert!(!is_valid_uri("my model.bin"));
        assert!(!is_valid_uri("bad%2"));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("my%20model.bin"), "my model.bin");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("caf%C3%A9/%2e%2e"), "café/..");
    }

    #[test]
    fn test_file_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data one.bin"), [7u8, 8, 9]).unwrap();
        let loader = FileLoader::new(dir.path());

        let bytes = pollster::block_on(loader.load("data%20one.bin")).unwrap();
        assert_eq!(bytes, vec![7, 8, 9]);

        let err = pollster::block_on(loader.load("missing.bin")).unwrap_err();
        assert_eq!(err, ResourceError::NotFound("missing.bin".to_string()));

        let err = pollster::block_on(loader.load("http://example.com/a.bin")).unwrap_err();
        assert!(matches!(err, ResourceError::Unsupported(_)));
    }
}
