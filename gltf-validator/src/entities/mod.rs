//! Typed glTF entities
//!
//! Each entity has a `read` function that runs against an [`ObjectReader`]
//! during normalization, and a `validate` function that runs after
//! resources are resolved and the usage graph is built. Validators only
//! read shared state; every finding goes into the caller's sink.
//!
//! [`ObjectReader`]: crate::reader::ObjectReader

pub mod accessor;
pub mod animation;
pub mod asset;
pub mod buffer;
pub mod buffer_view;
pub mod camera;
pub mod image;
pub mod material;
pub mod mesh;
pub mod node;
pub mod scene;
pub mod skin;
pub mod texture;

pub use accessor::{Accessor, AccessorType, ComponentType, ElementLayout, Format};
pub use animation::{Animation, AnimationChannel, AnimationSampler, Interpolation, TargetPath};
pub use asset::Asset;
pub use buffer::Buffer;
pub use buffer_view::BufferView;
pub use camera::Camera;
pub use image::Image;
pub use material::{AlphaMode, Material, TextureInfo};
pub use mesh::{Mesh, Primitive, PrimitiveMode, Semantic};
pub use node::Node;
pub use scene::Scene;
pub use skin::Skin;
pub use texture::{Sampler, Texture};

use crate::document::Document;
use crate::fetch::Resources;
use crate::graph::UsageGraph;
use crate::issue::{IssueCode, IssueSink};
use crate::reader::Index;

/// Shared, read-only state for the semantic validation stage
pub struct Context<'d> {
    pub doc: &'d Document,
    pub graph: &'d UsageGraph,
    pub resources: &'d Resources,
    /// `KHR_mesh_quantization` is declared, widening attribute formats
    pub quantized: bool,
}

/// Resolve a reference, reporting `UNRESOLVED_REFERENCE` at `pointer` if it dangles
pub fn resolve(sink: &mut IssueSink<'_>, index: Index, len: usize, pointer: impl Into<String>) -> Option<usize> {
    let resolved = index.get(len);
    if resolved.is_none() {
        sink.add(
            IssueCode::UnresolvedReference,
            pointer,
            format!("Unresolved reference: {index}."),
        );
    }
    resolved
}

/// Run every entity validator in document order
pub fn validate_all(cx: &Context<'_>, sink: &mut IssueSink<'_>) {
    let doc = cx.doc;
    if let Some(asset) = &doc.asset {
        asset.validate(sink);
    }
    if let Some(scene) = doc.scene {
        resolve(sink, scene, doc.scenes.len(), "/scene");
    }

    for (i, view) in doc.buffer_views.iter().enumerate() {
        view.validate(i, cx, sink);
    }
    for (i, accessor) in doc.accessors.iter().enumerate() {
        accessor.validate(i, cx, sink);
    }
    for (i, image) in doc.images.iter().enumerate() {
        image.validate(i, cx, sink);
    }
    for (i, texture) in doc.textures.iter().enumerate() {
        texture.validate(i, cx, sink);
    }
    for (i, material) in doc.materials.iter().enumerate() {
        material.validate(i, cx, sink);
    }
    for (i, mesh) in doc.meshes.iter().enumerate() {
        mesh.validate(i, cx, sink);
    }
    for (i, camera) in doc.cameras.iter().enumerate() {
        camera.validate(i, sink);
    }
    for (i, node) in doc.nodes.iter().enumerate() {
        node.validate(i, cx, sink);
    }
    for (i, skin) in doc.skins.iter().enumerate() {
        skin.validate(i, cx, sink);
    }
    for (i, animation) in doc.animations.iter().enumerate() {
        animation.validate(i, cx, sink);
    }
    for (i, scene) in doc.scenes.iter().enumerate() {
        scene.validate(i, cx, sink);
    }
}
