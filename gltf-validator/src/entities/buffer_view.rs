//! Buffer views

use super::{Context, resolve};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{Index, ObjectReader};

/// `ARRAY_BUFFER`
pub const TARGET_VERTEX: u64 = 34962;
/// `ELEMENT_ARRAY_BUFFER`
pub const TARGET_INDEX: u64 = 34963;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferView {
    pub buffer: Option<Index>,
    pub byte_offset: u64,
    pub byte_length: Option<u64>,
    pub byte_stride: Option<u64>,
    pub target: Option<u64>,
}

fn target_name(target: u64) -> &'static str {
    if target == TARGET_INDEX {
        "ElementArrayBuffer"
    } else {
        "ArrayBuffer"
    }
}

impl BufferView {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        let buffer = r.required_index("buffer");
        let byte_offset = r.uint("byteOffset").unwrap_or(0);
        let byte_length = r.required_uint_in("byteLength", 1..);
        let byte_stride = r.uint_in("byteStride", 4..=252).filter(|&stride| {
            let aligned = stride % 4 == 0;
            if !aligned {
                r.issue(
                    IssueCode::ValueMultipleOf,
                    "byteStride",
                    format!("Value {stride} is not a multiple of 4."),
                );
            }
            aligned
        });
        let target = r.enum_uint("target", &[TARGET_VERTEX, TARGET_INDEX]);

        Self {
            buffer,
            byte_offset,
            byte_length,
            byte_stride,
            target,
        }
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let pointer = format!("/bufferViews/{index}");

        if let Some(buffer_index) = self.buffer {
            if let Some(b) = resolve(sink, buffer_index, cx.doc.buffers.len(), format!("{pointer}/buffer")) {
                if let (Some(buffer_length), Some(length)) = (cx.doc.buffers[b].byte_length, self.byte_length) {
                    if self.byte_offset.saturating_add(length) > buffer_length {
                        sink.add(
                            IssueCode::BufferViewTooLong,
                            format!("{pointer}/byteLength"),
                            format!(
                                "BufferView does not fit buffer ({b}) byteLength ({buffer_length})."
                            ),
                        );
                    }
                }
            }
        }

        if let (Some(stride), Some(length)) = (self.byte_stride, self.byte_length) {
            if stride > length {
                sink.add(
                    IssueCode::BufferViewTooBigByteStride,
                    format!("{pointer}/byteStride"),
                    format!("Buffer view's byteStride ({stride}) is greater than byteLength ({length})."),
                );
            }
        }

        let usage = cx.graph.view_usage(index);
        if self.byte_stride.is_some() && usage.index {
            sink.add(
                IssueCode::BufferViewInvalidByteStride,
                format!("{pointer}/byteStride"),
                "Only buffer views with raw vertex data can have byteStride.",
            );
        }

        let used_as = match (usage.vertex, usage.index) {
            (true, true) => {
                sink.add(
                    IssueCode::BufferViewTargetOverride,
                    pointer.clone(),
                    "Override of previously set bufferView target or usage. Initial: 'ArrayBuffer', new: 'ElementArrayBuffer'.",
                );
                return;
            }
            (true, false) => TARGET_VERTEX,
            (false, true) => TARGET_INDEX,
            (false, false) => return,
        };
        match self.target {
            Some(target) if target != used_as => sink.add(
                IssueCode::BufferViewTargetOverride,
                format!("{pointer}/target"),
                format!(
                    "Override of previously set bufferView target or usage. Initial: '{}', new: '{}'.",
                    target_name(target),
                    target_name(used_as)
                ),
            ),
            Some(_) => {}
            None => sink.add(
                IssueCode::BufferViewTargetMissing,
                pointer,
                "bufferView.target should be set for vertex or index data.",
            ),
        }
    }
}
