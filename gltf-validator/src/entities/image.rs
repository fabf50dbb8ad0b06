//! Images

use super::buffer::read_uri;
use super::{Context, resolve};
use crate::fetch::ImageStatus;
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{Index, ObjectReader};

/// Image types that may be declared; core textures accept only the first two
pub const IMAGE_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/ktx2"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub uri: Option<String>,
    pub uri_valid: bool,
    pub mime_type: Option<String>,
    pub buffer_view: Option<Index>,
}

/// Mime type implied by a file extension in a URI
fn mime_from_uri(uri: &str) -> Option<&'static str> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "ktx2" => Some("image/ktx2"),
        _ => None,
    }
}

impl Image {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        let (uri, uri_valid) = read_uri(r);
        let mime_type = r.enum_string("mimeType", &IMAGE_MIME_TYPES).map(str::to_string);
        let buffer_view = r.index("bufferView");

        if r.has("uri") == r.has("bufferView") {
            r.issue_here(
                IssueCode::OneOfMismatch,
                "Exactly one of ('bufferView', 'uri') properties must be defined.",
            );
        }
        if buffer_view.is_some() && !r.has("mimeType") {
            r.issue(
                IssueCode::UnsatisfiedDependency,
                "bufferView",
                "Dependency failed. 'mimeType' must be defined.",
            );
        }

        Self {
            uri,
            uri_valid,
            mime_type,
            buffer_view,
        }
    }

    /// Best-known mime type: sniffed content, then declared, then file extension
    pub fn effective_mime_type<'s>(&'s self, status: Option<&ImageStatus>) -> Option<&'s str> {
        if let Some(ImageStatus::Decoded(info)) = status {
            return Some(info.mime_type);
        }
        self.mime_type
            .as_deref()
            .or_else(|| self.uri.as_deref().and_then(mime_from_uri))
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let pointer = format!("/images/{index}");

        if let Some(view_index) = self.buffer_view {
            let view_pointer = format!("{pointer}/bufferView");
            if let Some(v) = resolve(sink, view_index, cx.doc.buffer_views.len(), view_pointer.clone()) {
                if cx.doc.buffer_views[v].byte_stride.is_some() {
                    sink.add(
                        IssueCode::ImageBufferViewWithByteStride,
                        view_pointer,
                        "Buffer view with byteStride cannot be used for images.",
                    );
                }
            }
        }

        match cx.resources.images.get(index) {
            Some(ImageStatus::Decoded(info)) => {
                if let Some(declared) = &self.mime_type {
                    if declared != info.mime_type {
                        sink.add(
                            IssueCode::ImageMimeTypeInvalid,
                            format!("{pointer}/mimeType"),
                            format!(
                                "Recognized image format '{}' does not match declared image format '{declared}'.",
                                info.mime_type
                            ),
                        );
                    }
                }
                if !info.width.is_power_of_two() || !info.height.is_power_of_two() {
                    sink.add(
                        IssueCode::ImageNpotDimensions,
                        pointer,
                        format!(
                            "Image has non-power-of-two dimensions: {}x{}.",
                            info.width, info.height
                        ),
                    );
                }
            }
            Some(ImageStatus::Unrecognized) => sink.add(
                IssueCode::ImageUnrecognizedFormat,
                pointer,
                "Image format not recognized.",
            ),
            Some(ImageStatus::Truncated) => sink.add(
                IssueCode::ImageUnexpectedEos,
                pointer,
                "Unexpected end of image stream.",
            ),
            Some(ImageStatus::Unavailable) | None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_uri() {
        assert_eq!(mime_from_uri("textures/albedo.PNG"), Some("image/png"));
        assert_eq!(mime_from_uri("a.jpeg?v=2"), Some("image/jpeg"));
        assert_eq!(mime_from_uri("noext"), None);
    }

    #[test]
    fn test_effective_mime_type_prefers_content() {
        let image = Image {
            uri: Some("a.png".into()),
            uri_valid: true,
            mime_type: Some("image/png".into()),
            buffer_view: None,
        };
        let decoded = ImageStatus::Decoded(crate::image_info::ImageInfo {
            mime_type: "image/jpeg",
            width: 4,
            height: 4,
        });
        assert_eq!(image.effective_mime_type(Some(&decoded)), Some("image/jpeg"));
        assert_eq!(image.effective_mime_type(None), Some("image/png"));
    }
}
