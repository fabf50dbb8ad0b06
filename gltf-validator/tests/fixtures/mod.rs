//! Shared assets for the validation integration tests

#![allow(dead_code)]

use glb_builder::{
    AnimationBuilder, BufferBuilder, BufferSource, GltfBuilder, MeshBuilder, SkeletonBuilder, Value,
    assemble_glb, json,
};
use gltf_validator::{Report, ValidationOptions, validate_bytes_blocking};

pub const GENERATOR: &str = "gltf-validator tests";

pub const IDENTITY_MAT4: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

/// Validate a JSON document with default options
pub fn validate_json(root: &Value) -> Report {
    validate_json_with(root, &ValidationOptions::default())
}

pub fn validate_json_with(root: &Value, options: &ValidationOptions) -> Report {
    let bytes = serde_json::to_vec(root).expect("serialize document");
    validate_bytes_blocking(&bytes, options)
}

/// Number of issues with the given code
pub fn count(report: &Report, code: &str) -> usize {
    report.codes().iter().filter(|c| **c == code).count()
}

/// Pointers of every issue with the given code
pub fn pointers(report: &Report, code: &str) -> Vec<String> {
    report
        .issues
        .messages
        .iter()
        .filter(|issue| issue.code.as_str() == code)
        .filter_map(|issue| issue.pointer.clone())
        .collect()
}

/// One indexed triangle in a scene, stored in `buffer`
pub fn triangle(buffer: &mut BufferBuilder) -> GltfBuilder {
    let mesh = MeshBuilder::new()
        .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
        .normals(&[[0.0, 0.0, 1.0]; 3])
        .indices(&[0, 1, 2])
        .build(buffer);

    GltfBuilder::new()
        .add_mesh_from_accessors("Triangle", &mesh)
        .add_node(json!({ "mesh": 0 }))
        .add_scene("Scene", &[0])
}

/// Three-bone skinned quad with a looping animation, as a GLB
///
/// Nodes: 0 is the skinned mesh, 1..=3 form the bone chain.
pub fn skinned_glb() -> Vec<u8> {
    let mut buffer = BufferBuilder::new();

    let mesh = MeshBuilder::new()
        .positions(&[[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 2.0, 0.0], [-1.0, 2.0, 0.0]])
        .normals(&[[0.0, 0.0, 1.0]; 4])
        .uvs(&[[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]])
        .joints(&[[0, 0, 0, 0], [0, 0, 0, 0], [2, 0, 0, 0], [1, 0, 0, 0]])
        .weights(&[[1.0, 0.0, 0.0, 0.0]; 4])
        .indices(&[0, 1, 2, 0, 2, 3])
        .build(&mut buffer);

    let skeleton = SkeletonBuilder::new()
        .inverse_bind_matrices(&[IDENTITY_MAT4; 3])
        .build(&mut buffer);

    let rest = [0.0, 0.0, 0.0, 1.0];
    let bent = [0.0, 0.0, 0.382_683_43, 0.923_879_5];
    let mut animation = AnimationBuilder::new(3).times(&[0.0, 0.5, 1.0]);
    for bone in 0..3 {
        animation = animation
            .bone_translations(bone, &[[0.0, 1.0, 0.0]; 3])
            .bone_rotations(bone, &[rest, bent, rest])
            .bone_scales(bone, &[[1.0, 1.0, 1.0]; 3]);
    }
    let animation = animation.build(&mut buffer);

    let root = GltfBuilder::new()
        .add_mesh_from_accessors("Quad", &mesh)
        .add_nodes(vec![
            json!({ "name": "Body", "mesh": 0, "skin": 0 }),
            json!({ "name": "Root", "children": [2] }),
            json!({ "name": "Spine", "children": [3], "translation": [0.0, 1.0, 0.0] }),
            json!({ "name": "Head", "translation": [0.0, 1.0, 0.0] }),
        ])
        .add_skin("Rig", Some(1), &[1, 2, 3], &skeleton)
        .add_animation("Wave", &[1, 2, 3], &animation)
        .add_scene("Scene", &[0, 1])
        .build(&buffer, BufferSource::Glb, GENERATOR);

    assemble_glb(&root, buffer.data()).expect("assemble GLB")
}
