//! Alternate texture sources: KHR_texture_basisu and EXT_texture_webp

use super::{ExtensionHandler, ExtensionObject, ExtensionPayload, ReadOutput, RefTarget};
use crate::document::Collection;
use crate::entities::Context;
use crate::entities::texture::check_image_mime_type;
use crate::issue::IssueSink;
use crate::reader::{ObjectKind, ObjectReader};

/// A texture extension that points at an image of one specific type
pub struct TextureSource {
    name: &'static str,
    mime_type: &'static str,
    incomplete: bool,
}

impl TextureSource {
    pub const BASISU: TextureSource = TextureSource {
        name: "KHR_texture_basisu",
        mime_type: "image/ktx2",
        incomplete: true,
    };

    pub const WEBP: TextureSource = TextureSource {
        name: "EXT_texture_webp",
        mime_type: "image/webp",
        incomplete: false,
    };
}

impl ExtensionHandler for TextureSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contexts(&self) -> &'static [ObjectKind] {
        &[ObjectKind::Texture]
    }

    fn read(&self, r: &mut ObjectReader<'_, '_, '_>, out: &mut ReadOutput) -> ExtensionPayload {
        let source = r.required_index("source");
        if let Some(index) = source {
            out.reference(r.property_pointer("source"), RefTarget::Core(Collection::Images), index);
        }
        ExtensionPayload::TextureSource(source)
    }

    fn validate(&self, object: &ExtensionObject, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let ExtensionPayload::TextureSource(Some(source)) = object.payload else {
            return;
        };
        if let Some(image) = source.get(cx.doc.images.len()) {
            check_image_mime_type(
                cx,
                image,
                &[self.mime_type],
                format!("{}/source", object.pointer),
                sink,
            );
        }
    }

    fn incomplete(&self) -> bool {
        self.incomplete
    }
}
