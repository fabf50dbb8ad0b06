//! Buffers

use crate::issue::IssueCode;
use crate::reader::ObjectReader;
use crate::resource::{is_data_uri, is_valid_uri};

/// Read a `uri` property, reporting malformed URIs
///
/// Returns the URI and whether it is well-formed. Malformed URIs are kept so
/// that later stages know a location was given, but they are never fetched.
pub(crate) fn read_uri(r: &mut ObjectReader<'_, '_, '_>) -> (Option<String>, bool) {
    let Some(uri) = r.string("uri") else {
        return (None, true);
    };
    let valid = is_data_uri(uri) || is_valid_uri(uri);
    if !valid {
        r.issue(IssueCode::InvalidUri, "uri", format!("Invalid URI '{uri}'."));
    }
    (Some(uri.to_string()), valid)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffer {
    pub uri: Option<String>,
    pub uri_valid: bool,
    pub byte_length: Option<u64>,
}

impl Buffer {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        let (uri, uri_valid) = read_uri(r);
        let byte_length = r.required_uint_in("byteLength", 1..);
        Self {
            uri,
            uri_valid,
            byte_length,
        }
    }
}
