//! glTF/GLB fixture generation for validator tests
//!
//! This library provides builder-pattern APIs for constructing glTF JSON
//! trees and GLB containers, valid or deliberately broken:
//! - BufferBuilder: Pack binary data with automatic alignment
//! - MeshBuilder: High-level mesh construction
//! - SkeletonBuilder: Skeleton and inverse bind matrices
//! - AnimationBuilder: Keyframe animation tracks
//! - GltfBuilder: Top-level glTF document construction
//!
//! Documents are plain `serde_json::Value` trees so tests can corrupt any
//! property after building.
//!
//! # Example
//!
//! ```no_run
//! use glb_builder::*;
//!
//! let mut buffer = BufferBuilder::new();
//! let mesh = MeshBuilder::new()
//!     .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]])
//!     .normals(&[[0.0, 0.0, 1.0]; 3])
//!     .indices(&[0, 1, 2])
//!     .build(&mut buffer);
//!
//! let root = GltfBuilder::new()
//!     .add_mesh_from_accessors("Triangle", &mesh)
//!     .add_node(serde_json::json!({ "mesh": 0 }))
//!     .add_scene("Scene", &[0])
//!     .build(&buffer, BufferSource::Glb, "glb-builder");
//! let glb_bytes = assemble_glb(&root, buffer.data()).unwrap();
//! ```

pub mod animation;
pub mod buffer;
pub mod document;
pub mod mesh;
pub mod skeleton;
pub mod utils;

pub use animation::{AnimationAccessors, AnimationBuilder};
pub use buffer::{AccessorIndex, BufferBuilder};
pub use document::{BufferSource, GltfBuilder};
pub use mesh::{MeshAccessors, MeshBuilder};
pub use skeleton::{SkeletonAccessors, SkeletonBuilder};
pub use utils::{
    align_buffer, assemble_glb, assemble_glb_chunks, compute_bounds, data_uri, encode_base64,
};

pub use serde_json::{Value, json};

/// Component type codes
pub mod component {
    pub const BYTE: u32 = 5120;
    pub const UNSIGNED_BYTE: u32 = 5121;
    pub const SHORT: u32 = 5122;
    pub const UNSIGNED_SHORT: u32 = 5123;
    pub const UNSIGNED_INT: u32 = 5125;
    pub const FLOAT: u32 = 5126;
}

/// Buffer view target codes
pub mod target {
    pub const ARRAY_BUFFER: u32 = 34962;
    pub const ELEMENT_ARRAY_BUFFER: u32 = 34963;
}
