//! Low-level buffer packing with automatic alignment and accessor creation

use crate::component;
use crate::target;
use crate::utils::{align_buffer, compute_bounds};
use serde_json::{Map, Value, json};

/// Accessor index returned by buffer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorIndex(pub u32);

impl AccessorIndex {
    pub fn as_json_index(&self) -> Value {
        Value::from(self.0)
    }
}

/// Builder for binary buffer with automatic alignment
///
/// Every view refers to buffer 0. Views and accessors are plain JSON
/// objects so tests can corrupt them before building the document.
pub struct BufferBuilder {
    buffer: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BufferBuilder {
    /// Create a new empty buffer builder
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            views: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Get the current accessor count
    pub fn accessor_count(&self) -> u32 {
        self.accessors.len() as u32
    }

    /// Get next accessor index (without creating it)
    pub fn next_accessor_index(&self) -> AccessorIndex {
        AccessorIndex(self.accessor_count())
    }

    /// Get the binary buffer data
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Mutable access to the binary data, for corrupting packed values
    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }

    /// Get the buffer views
    pub fn views(&self) -> &[Value] {
        &self.views
    }

    /// Get the accessors
    pub fn accessors(&self) -> &[Value] {
        &self.accessors
    }

    /// Mutable access to one accessor object
    pub fn accessor_mut(&mut self, index: AccessorIndex) -> &mut Value {
        &mut self.accessors[index.0 as usize]
    }

    /// Mutable access to one buffer view object
    pub fn view_mut(&mut self, index: u32) -> &mut Value {
        &mut self.views[index as usize]
    }

    /// Append raw bytes as a new buffer view, returning the view index
    pub fn push_view(&mut self, bytes: &[u8], target: Option<u32>, byte_stride: Option<u32>) -> u32 {
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        align_buffer(&mut self.buffer);

        let mut view = Map::new();
        view.insert("buffer".into(), json!(0));
        view.insert("byteOffset".into(), json!(offset));
        view.insert("byteLength".into(), json!(bytes.len()));
        if let Some(stride) = byte_stride {
            view.insert("byteStride".into(), json!(stride));
        }
        if let Some(target) = target {
            view.insert("target".into(), json!(target));
        }
        self.views.push(Value::Object(view));
        self.views.len() as u32 - 1
    }

    /// Append an accessor object verbatim
    pub fn push_accessor(&mut self, accessor: Value) -> AccessorIndex {
        self.accessors.push(accessor);
        AccessorIndex(self.accessors.len() as u32 - 1)
    }

    /// Pack float elements into their own view and describe them with an accessor
    pub fn pack_floats<const N: usize>(
        &mut self,
        data: &[[f32; N]],
        type_: &str,
        target: Option<u32>,
        with_bounds: bool,
    ) -> AccessorIndex {
        let view = self.push_view(bytemuck::cast_slice(data.as_flattened()), target, None);

        let mut accessor = json!({
            "bufferView": view,
            "componentType": component::FLOAT,
            "count": data.len(),
            "type": type_,
        });
        if with_bounds {
            let mut min = [f32::INFINITY; N];
            let mut max = [f32::NEG_INFINITY; N];
            for element in data {
                for i in 0..N {
                    min[i] = min[i].min(element[i]);
                    max[i] = max[i].max(element[i]);
                }
            }
            accessor["min"] = json!(min.to_vec());
            accessor["max"] = json!(max.to_vec());
        }
        self.push_accessor(accessor)
    }

    /// Pack Vec3 positions with bounds calculation
    pub fn pack_positions(&mut self, positions: &[[f32; 3]]) -> AccessorIndex {
        let view = self.push_view(
            bytemuck::cast_slice(positions),
            Some(target::ARRAY_BUFFER),
            None,
        );
        let (min, max) = compute_bounds(positions);
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": component::FLOAT,
            "count": positions.len(),
            "type": "VEC3",
            "min": min,
            "max": max,
        }))
    }

    /// Pack Vec3 vertex data (normals, etc.)
    pub fn pack_vec3(&mut self, data: &[[f32; 3]]) -> AccessorIndex {
        self.pack_floats(data, "VEC3", Some(target::ARRAY_BUFFER), false)
    }

    /// Pack Vec2 vertex data (UVs)
    pub fn pack_vec2(&mut self, data: &[[f32; 2]]) -> AccessorIndex {
        self.pack_floats(data, "VEC2", Some(target::ARRAY_BUFFER), false)
    }

    /// Pack Vec4 vertex data (colors, weights, tangents)
    pub fn pack_vec4(&mut self, data: &[[f32; 4]]) -> AccessorIndex {
        self.pack_floats(data, "VEC4", Some(target::ARRAY_BUFFER), false)
    }

    /// Pack joint indices as UNSIGNED_BYTE VEC4
    pub fn pack_joints(&mut self, joints: &[[u8; 4]]) -> AccessorIndex {
        let view = self.push_view(
            bytemuck::cast_slice(joints),
            Some(target::ARRAY_BUFFER),
            None,
        );
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": component::UNSIGNED_BYTE,
            "count": joints.len(),
            "type": "VEC4",
        }))
    }

    /// Pack u16 indices
    pub fn pack_indices_u16(&mut self, indices: &[u16]) -> AccessorIndex {
        let view = self.push_view(
            bytemuck::cast_slice(indices),
            Some(target::ELEMENT_ARRAY_BUFFER),
            None,
        );
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": component::UNSIGNED_SHORT,
            "count": indices.len(),
            "type": "SCALAR",
        }))
    }

    /// Pack Mat4 inverse bind matrices (column-major)
    pub fn pack_mat4(&mut self, matrices: &[[f32; 16]]) -> AccessorIndex {
        self.pack_floats(matrices, "MAT4", None, false)
    }

    /// Pack untargeted Vec3 animation output
    pub fn pack_vec3_output(&mut self, data: &[[f32; 3]]) -> AccessorIndex {
        self.pack_floats(data, "VEC3", None, false)
    }

    /// Pack untargeted Vec4 animation output
    pub fn pack_vec4_output(&mut self, data: &[[f32; 4]]) -> AccessorIndex {
        self.pack_floats(data, "VEC4", None, false)
    }

    /// Pack scalar f32 values with min/max bounds (keyframe times)
    pub fn pack_scalars_with_bounds(&mut self, scalars: &[f32]) -> AccessorIndex {
        let wrapped: Vec<[f32; 1]> = scalars.iter().map(|&s| [s]).collect();
        self.pack_floats(&wrapped, "SCALAR", None, true)
    }
}

impl Default for BufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}
