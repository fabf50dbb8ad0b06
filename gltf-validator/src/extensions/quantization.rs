//! KHR_mesh_quantization
//!
//! Has no extension objects. Declaring it widens the accessor formats
//! allowed for vertex attributes and animation outputs.

use super::{ExtensionHandler, ExtensionPayload, ReadOutput};
use crate::reader::{ObjectKind, ObjectReader};

pub const NAME: &str = "KHR_mesh_quantization";

pub struct MeshQuantization;

impl ExtensionHandler for MeshQuantization {
    fn name(&self) -> &'static str {
        NAME
    }

    fn contexts(&self) -> &'static [ObjectKind] {
        &[]
    }

    fn read(&self, _r: &mut ObjectReader<'_, '_, '_>, _out: &mut ReadOutput) -> ExtensionPayload {
        ExtensionPayload::Checked
    }

    fn declaration_only(&self) -> bool {
        true
    }

    fn must_be_required(&self) -> bool {
        true
    }
}
