//! KHR_texture_transform

use super::{ExtensionHandler, ExtensionPayload, ReadOutput, TEXTURE_INFO_KINDS};
use crate::reader::{ObjectKind, ObjectReader};

pub struct TextureTransform;

impl ExtensionHandler for TextureTransform {
    fn name(&self) -> &'static str {
        "KHR_texture_transform"
    }

    fn contexts(&self) -> &'static [ObjectKind] {
        TEXTURE_INFO_KINDS
    }

    fn read(&self, r: &mut ObjectReader<'_, '_, '_>, _out: &mut ReadOutput) -> ExtensionPayload {
        r.float_array("offset", &[2], ..);
        r.float("rotation");
        r.float_array("scale", &[2], ..);
        r.uint("texCoord");
        ExtensionPayload::Checked
    }
}
