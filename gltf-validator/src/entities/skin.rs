//! Skins

use super::accessor::{AccessorType, ComponentType, Format};
use super::{Context, resolve};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{Index, ObjectReader};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skin {
    pub inverse_bind_matrices: Option<Index>,
    pub skeleton: Option<Index>,
    pub joints: Vec<Index>,
}

impl Skin {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        let inverse_bind_matrices = r.index("inverseBindMatrices");
        let skeleton = r.index("skeleton");
        let joints = if r.has("joints") {
            r.index_array("joints", true).unwrap_or_default()
        } else {
            r.required_array("joints", true);
            Vec::new()
        };
        Self {
            inverse_bind_matrices,
            skeleton,
            joints,
        }
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let doc = cx.doc;
        let pointer = format!("/skins/{index}");

        if let Some(skeleton) = self.skeleton {
            resolve(sink, skeleton, doc.nodes.len(), format!("{pointer}/skeleton"));
        }
        for (k, &joint) in self.joints.iter().enumerate() {
            resolve(sink, joint, doc.nodes.len(), format!("{pointer}/joints/{k}"));
        }

        let Some(ibm) = self.inverse_bind_matrices else {
            return;
        };
        let ibm_pointer = format!("{pointer}/inverseBindMatrices");
        let Some(a) = resolve(sink, ibm, doc.accessors.len(), ibm_pointer.clone()) else {
            return;
        };
        let accessor = &doc.accessors[a];
        let expected = Format::new(AccessorType::Mat4, ComponentType::Float, false);
        if let Some(format) = accessor.format() {
            if format != expected {
                sink.add(
                    IssueCode::SkinIbmInvalidFormat,
                    ibm_pointer.clone(),
                    format!("Invalid IBM accessor format '{format}'. Must be one of ('{expected}')."),
                );
            }
        }
        if let Some(count) = accessor.count {
            if count < self.joints.len() as u64 {
                sink.add(
                    IssueCode::SkinIbmInvalidCount,
                    ibm_pointer.clone(),
                    format!(
                        "IBM accessor must have at least {} elements, got {count}.",
                        self.joints.len()
                    ),
                );
            }
        }
        let strided = accessor
            .buffer_view
            .and_then(|v| v.get(doc.buffer_views.len()))
            .is_some_and(|v| doc.buffer_views[v].byte_stride.is_some());
        if strided {
            sink.add(
                IssueCode::SkinIbmAccessorWithByteStride,
                ibm_pointer,
                "bufferView.byteStride must not be defined for IBM accessors.",
            );
        }
    }
}
