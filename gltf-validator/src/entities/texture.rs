//! Textures and samplers

use super::{Context, resolve};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{Index, ObjectReader};

/// Image types a core texture may sample
pub const CORE_TEXTURE_MIME_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Texture {
    pub sampler: Option<Index>,
    pub source: Option<Index>,
}

impl Texture {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        Self {
            sampler: r.index("sampler"),
            source: r.index("source"),
        }
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let pointer = format!("/textures/{index}");
        if let Some(sampler) = self.sampler {
            resolve(sink, sampler, cx.doc.samplers.len(), format!("{pointer}/sampler"));
        }
        if let Some(source) = self.source {
            let source_pointer = format!("{pointer}/source");
            if let Some(i) = resolve(sink, source, cx.doc.images.len(), source_pointer.clone()) {
                check_image_mime_type(cx, i, &CORE_TEXTURE_MIME_TYPES, source_pointer, sink);
            }
        }
    }
}

/// Report a texture source whose image type is known and not in `allowed`
pub(crate) fn check_image_mime_type(
    cx: &Context<'_>,
    image: usize,
    allowed: &[&str],
    pointer: String,
    sink: &mut IssueSink<'_>,
) {
    let status = cx.resources.images.get(image);
    if let Some(mime) = cx.doc.images[image].effective_mime_type(status) {
        if !allowed.contains(&mime) {
            sink.add(
                IssueCode::TextureInvalidImageMimeType,
                pointer,
                format!(
                    "Invalid Image mimeType '{mime}'. Valid values are ('{}').",
                    allowed.join("', '")
                ),
            );
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sampler {
    pub mag_filter: Option<u64>,
    pub min_filter: Option<u64>,
    pub wrap_s: Option<u64>,
    pub wrap_t: Option<u64>,
}

impl Sampler {
    const WRAP_MODES: [u64; 3] = [33071, 33648, 10497];

    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        Self {
            mag_filter: r.enum_uint("magFilter", &[9728, 9729]),
            min_filter: r.enum_uint("minFilter", &[9728, 9729, 9984, 9985, 9986, 9987]),
            wrap_s: r.enum_uint("wrapS", &Self::WRAP_MODES),
            wrap_t: r.enum_uint("wrapT", &Self::WRAP_MODES),
        }
    }
}
