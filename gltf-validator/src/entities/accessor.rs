//! Accessors: typed views over buffer data

use super::{Context, resolve};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{Index, ObjectKind, ObjectReader};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl ComponentType {
    pub const CODES: [u64; 6] = [5120, 5121, 5122, 5123, 5125, 5126];

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            5120 => Some(ComponentType::Byte),
            5121 => Some(ComponentType::UnsignedByte),
            5122 => Some(ComponentType::Short),
            5123 => Some(ComponentType::UnsignedShort),
            5125 => Some(ComponentType::UnsignedInt),
            5126 => Some(ComponentType::Float),
            _ => None,
        }
    }

    /// Size of one component in bytes
    pub fn size(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ComponentType::Byte => "BYTE",
            ComponentType::UnsignedByte => "UNSIGNED_BYTE",
            ComponentType::Short => "SHORT",
            ComponentType::UnsignedShort => "UNSIGNED_SHORT",
            ComponentType::UnsignedInt => "UNSIGNED_INT",
            ComponentType::Float => "FLOAT",
        }
    }

    /// Map a raw integer to [-1, 1] or [0, 1] the way GPUs normalize it
    pub fn normalize(self, raw: f64) -> f64 {
        match self {
            ComponentType::Byte => (raw / 127.0).max(-1.0),
            ComponentType::UnsignedByte => raw / 255.0,
            ComponentType::Short => (raw / 32767.0).max(-1.0),
            ComponentType::UnsignedShort => raw / 65535.0,
            ComponentType::UnsignedInt => raw / 4_294_967_295.0,
            ComponentType::Float => raw,
        }
    }

    /// Largest value of an unsigned type, used as the primitive restart index
    pub fn unsigned_max(self) -> Option<u64> {
        match self {
            ComponentType::UnsignedByte => Some(u64::from(u8::MAX)),
            ComponentType::UnsignedShort => Some(u64::from(u16::MAX)),
            ComponentType::UnsignedInt => Some(u64::from(u32::MAX)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AccessorType {
    pub const NAMES: [&'static str; 7] = ["SCALAR", "VEC2", "VEC3", "VEC4", "MAT2", "MAT3", "MAT4"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(AccessorType::Scalar),
            "VEC2" => Some(AccessorType::Vec2),
            "VEC3" => Some(AccessorType::Vec3),
            "VEC4" => Some(AccessorType::Vec4),
            "MAT2" => Some(AccessorType::Mat2),
            "MAT3" => Some(AccessorType::Mat3),
            "MAT4" => Some(AccessorType::Mat4),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AccessorType::Scalar => "SCALAR",
            AccessorType::Vec2 => "VEC2",
            AccessorType::Vec3 => "VEC3",
            AccessorType::Vec4 => "VEC4",
            AccessorType::Mat2 => "MAT2",
            AccessorType::Mat3 => "MAT3",
            AccessorType::Mat4 => "MAT4",
        }
    }

    pub fn components(self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 | AccessorType::Mat2 => 4,
            AccessorType::Mat3 => 9,
            AccessorType::Mat4 => 16,
        }
    }

    /// Rows per column for matrix types
    pub fn matrix_rows(self) -> Option<usize> {
        match self {
            AccessorType::Mat2 => Some(2),
            AccessorType::Mat3 => Some(3),
            AccessorType::Mat4 => Some(4),
            _ => None,
        }
    }
}

/// Byte geometry of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementLayout {
    pub component_type: ComponentType,
    pub accessor_type: AccessorType,
}

impl ElementLayout {
    /// Bytes between the start of consecutive matrix columns
    pub fn column_stride(self) -> Option<usize> {
        let rows = self.accessor_type.matrix_rows()?;
        Some((rows * self.component_type.size()).next_multiple_of(4))
    }

    /// Element footprint, including 4-byte column padding for matrices
    pub fn size(self) -> usize {
        match (self.accessor_type.matrix_rows(), self.column_stride()) {
            (Some(columns), Some(column_stride)) => columns * column_stride,
            _ => self.accessor_type.components() * self.component_type.size(),
        }
    }

    /// Byte offset of component `c` within one element
    pub fn component_offset(self, c: usize) -> usize {
        match (self.accessor_type.matrix_rows(), self.column_stride()) {
            (Some(rows), Some(column_stride)) => {
                (c / rows) * column_stride + (c % rows) * self.component_type.size()
            }
            _ => c * self.component_type.size(),
        }
    }
}

/// Accessor type, component type and normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub accessor_type: AccessorType,
    pub component_type: ComponentType,
    pub normalized: bool,
}

impl Format {
    pub const fn new(accessor_type: AccessorType, component_type: ComponentType, normalized: bool) -> Self {
        Self {
            accessor_type,
            component_type,
            normalized,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}", self.accessor_type.name(), self.component_type.name())?;
        if self.normalized {
            f.write_str(" normalized")?;
        }
        f.write_str("}")
    }
}

/// Human-readable list of formats for messages
pub fn format_list(formats: &[Format]) -> String {
    formats
        .iter()
        .map(|format| format!("'{format}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseIndices {
    pub buffer_view: Option<Index>,
    pub byte_offset: u64,
    pub component_type: Option<ComponentType>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseValues {
    pub buffer_view: Option<Index>,
    pub byte_offset: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sparse {
    pub count: Option<u64>,
    pub indices: Option<SparseIndices>,
    pub values: Option<SparseValues>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accessor {
    pub buffer_view: Option<Index>,
    pub byte_offset: u64,
    pub component_type: Option<ComponentType>,
    pub normalized: bool,
    pub count: Option<u64>,
    pub accessor_type: Option<AccessorType>,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
    pub sparse: Option<Sparse>,
}

impl Accessor {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        let buffer_view = r.index("bufferView");
        let byte_offset = r.uint("byteOffset");
        if byte_offset.is_some() && buffer_view.is_none() {
            r.issue(
                IssueCode::UnsatisfiedDependency,
                "byteOffset",
                "Dependency failed. 'bufferView' must be defined.",
            );
        }
        let component_type = r
            .required_enum_uint("componentType", &ComponentType::CODES)
            .and_then(ComponentType::from_code);
        let normalized = r.bool("normalized").unwrap_or(false);
        let count = r.required_uint_in("count", 1..);
        let accessor_type = r
            .required_enum_string("type", &AccessorType::NAMES)
            .and_then(AccessorType::from_name);
        let min = r.float_array("min", &[1, 2, 3, 4, 9, 16], ..);
        let max = r.float_array("max", &[1, 2, 3, 4, 9, 16], ..);
        let sparse = r.child("sparse", ObjectKind::AccessorSparse, |s| Sparse {
            count: s.required_uint_in("count", 1..),
            indices: s.required_child("indices", ObjectKind::AccessorSparseIndices, |i| SparseIndices {
                buffer_view: i.required_index("bufferView"),
                byte_offset: i.uint("byteOffset").unwrap_or(0),
                component_type: i
                    .required_enum_uint("componentType", &[5121, 5123, 5125])
                    .and_then(ComponentType::from_code),
            }),
            values: s.required_child("values", ObjectKind::AccessorSparseValues, |v| SparseValues {
                buffer_view: v.required_index("bufferView"),
                byte_offset: v.uint("byteOffset").unwrap_or(0),
            }),
        });

        Self {
            buffer_view,
            byte_offset: byte_offset.unwrap_or(0),
            component_type,
            normalized,
            count,
            accessor_type,
            min,
            max,
            sparse,
        }
    }

    pub fn layout(&self) -> Option<ElementLayout> {
        Some(ElementLayout {
            component_type: self.component_type?,
            accessor_type: self.accessor_type?,
        })
    }

    pub fn format(&self) -> Option<Format> {
        Some(Format::new(self.accessor_type?, self.component_type?, self.normalized))
    }

    pub fn has_bounds(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let pointer = format!("/accessors/{index}");

        if self.normalized
            && matches!(
                self.component_type,
                Some(ComponentType::Float | ComponentType::UnsignedInt)
            )
        {
            sink.add(
                IssueCode::AccessorNormalizedInvalid,
                format!("{pointer}/normalized"),
                "Only (u)byte and (u)short accessors can be normalized.",
            );
        }

        if let Some(accessor_type) = self.accessor_type {
            let components = accessor_type.components();
            for (key, bound) in [("min", &self.min), ("max", &self.max)] {
                if let Some(values) = bound {
                    if values.len() != components {
                        sink.add(
                            IssueCode::ArrayLengthNotInList,
                            format!("{pointer}/{key}"),
                            format!(
                                "Invalid array length {}. Valid lengths are: ({components}).",
                                values.len()
                            ),
                        );
                    }
                }
            }
        }

        if let Some(view_index) = self.buffer_view {
            if let Some(v) = resolve(
                sink,
                view_index,
                cx.doc.buffer_views.len(),
                format!("{pointer}/bufferView"),
            ) {
                self.validate_placement(&pointer, v, cx, sink);
            }
        }

        if let Some(sparse) = &self.sparse {
            self.validate_sparse(&pointer, sparse, cx, sink);
        }
    }

    /// Alignment, stride and length checks against the referenced view
    fn validate_placement(&self, pointer: &str, v: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let (Some(layout), Some(count)) = (self.layout(), self.count) else {
            return;
        };
        let view = &cx.doc.buffer_views[v];
        let component_size = layout.component_type.size() as u64;
        let total_offset = view.byte_offset + self.byte_offset;

        if total_offset % component_size != 0 {
            sink.add(
                IssueCode::AccessorTotalOffsetAlignment,
                format!("{pointer}/byteOffset"),
                format!(
                    "Accessor's total byteOffset {total_offset} isn't a multiple of componentType length {component_size}."
                ),
            );
        } else if layout.accessor_type.matrix_rows().is_some() && total_offset % 4 != 0 {
            sink.add(
                IssueCode::AccessorMatrixAlignment,
                format!("{pointer}/byteOffset"),
                format!("Matrix accessors must be aligned to 4-byte boundaries, total byteOffset is {total_offset}."),
            );
        }

        let element_size = layout.size() as u64;
        let stride = match view.byte_stride {
            Some(stride) if stride < element_size => {
                sink.add(
                    IssueCode::AccessorSmallByteStride,
                    pointer.to_string(),
                    format!(
                        "Referenced bufferView's byteStride value {stride} is less than accessor element's length {element_size}."
                    ),
                );
                return;
            }
            Some(stride) => stride,
            None => element_size,
        };

        if let Some(view_length) = view.byte_length {
            let span = (count - 1)
                .saturating_mul(stride)
                .saturating_add(self.byte_offset + element_size);
            if span > view_length {
                sink.add(
                    IssueCode::AccessorTooLong,
                    format!("{pointer}/count"),
                    format!(
                        "Accessor (offset: {}, length: {}) does not fit referenced bufferView [{v}] length {view_length}.",
                        self.byte_offset,
                        span - self.byte_offset
                    ),
                );
            }
        }
    }

    fn validate_sparse(&self, pointer: &str, sparse: &Sparse, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let sparse_pointer = format!("{pointer}/sparse");
        if let (Some(sparse_count), Some(count)) = (sparse.count, self.count) {
            if sparse_count > count {
                sink.add(
                    IssueCode::AccessorSparseCountOutOfRange,
                    format!("{sparse_pointer}/count"),
                    format!(
                        "Sparse accessor overrides more elements ({sparse_count}) than the base accessor contains ({count})."
                    ),
                );
            }
        }
        let Some(sparse_count) = sparse.count else {
            return;
        };

        let indices = sparse.indices.as_ref().and_then(|indices| {
            Some((
                indices.buffer_view?,
                indices.byte_offset,
                indices.component_type?.size() as u64,
                "indices",
            ))
        });
        let values = sparse.values.as_ref().and_then(|values| {
            Some((
                values.buffer_view?,
                values.byte_offset,
                self.layout()?.size() as u64,
                "values",
            ))
        });

        for (view_index, byte_offset, element_size, key) in indices.into_iter().chain(values) {
            let view_pointer = format!("{sparse_pointer}/{key}/bufferView");
            let Some(v) = resolve(sink, view_index, cx.doc.buffer_views.len(), view_pointer.clone()) else {
                continue;
            };
            let view = &cx.doc.buffer_views[v];
            if view.byte_stride.is_some() {
                sink.add(
                    IssueCode::AccessorSparseBufferViewWithByteStride,
                    view_pointer,
                    "bufferView with byteStride is not allowed for sparse accessors.",
                );
            }
            if let Some(view_length) = view.byte_length {
                let length = sparse_count.saturating_mul(element_size);
                if byte_offset + length > view_length {
                    sink.add(
                        IssueCode::AccessorTooLong,
                        format!("{sparse_pointer}/{key}"),
                        format!(
                            "Accessor (offset: {byte_offset}, length: {length}) does not fit referenced bufferView [{v}] length {view_length}."
                        ),
                    );
                }
            }
        }
    }
}
