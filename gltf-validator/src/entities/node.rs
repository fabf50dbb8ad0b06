//! Nodes and local transforms

use super::{Context, resolve};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{Index, ObjectReader};
use glam::{DMat3, DMat4, DVec4};

/// Tolerance for unit quaternions
const UNIT_EPSILON: f64 = 1e-6;

/// Tolerance when recomposing a matrix from its TRS decomposition
const DECOMPOSE_EPSILON: f64 = 1e-5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub camera: Option<Index>,
    pub children: Vec<Index>,
    pub skin: Option<Index>,
    pub matrix: Option<Vec<f64>>,
    pub mesh: Option<Index>,
    pub rotation: Option<Vec<f64>>,
    pub scale: Option<Vec<f64>>,
    pub translation: Option<Vec<f64>>,
    pub weights: Option<Vec<f64>>,
    pub has_extensions: bool,
}

impl Node {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        Self {
            camera: r.index("camera"),
            children: r.index_array("children", true).unwrap_or_default(),
            skin: r.index("skin"),
            matrix: r.float_array("matrix", &[16], ..),
            mesh: r.index("mesh"),
            rotation: r.float_array("rotation", &[4], -1.0..=1.0),
            scale: r.float_array("scale", &[3], ..),
            translation: r.float_array("translation", &[3], ..),
            weights: r.float_array("weights", &[], ..),
            has_extensions: r.has("extensions"),
        }
    }

    fn has_trs(&self) -> bool {
        self.rotation.is_some() || self.scale.is_some() || self.translation.is_some()
    }

    /// No transform and nothing attached
    fn is_bare(&self) -> bool {
        let identity_matrix = self
            .matrix
            .as_deref()
            .is_none_or(|m| DMat4::from_cols_slice(m) == DMat4::IDENTITY);
        let default_trs = self.translation.as_deref().is_none_or(|t| t == [0.0; 3])
            && self.rotation.as_deref().is_none_or(|q| q == [0.0, 0.0, 0.0, 1.0])
            && self.scale.as_deref().is_none_or(|s| s == [1.0; 3]);
        self.camera.is_none()
            && self.children.is_empty()
            && self.mesh.is_none()
            && self.skin.is_none()
            && self.weights.is_none()
            && !self.has_extensions
            && identity_matrix
            && default_trs
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let doc = cx.doc;
        let pointer = format!("/nodes/{index}");

        if let Some(camera) = self.camera {
            resolve(sink, camera, doc.cameras.len(), format!("{pointer}/camera"));
        }
        let skin = self
            .skin
            .and_then(|skin| resolve(sink, skin, doc.skins.len(), format!("{pointer}/skin")));
        let mesh = self
            .mesh
            .and_then(|mesh| resolve(sink, mesh, doc.meshes.len(), format!("{pointer}/mesh")));

        for (k, &child) in self.children.iter().enumerate() {
            let child_pointer = format!("{pointer}/children/{k}");
            if let Some(c) = resolve(sink, child, doc.nodes.len(), child_pointer.clone()) {
                if cx.graph.parent(c) != Some(index) {
                    sink.add(
                        IssueCode::NodeParentOverride,
                        child_pointer,
                        format!("Value overrides parent of node {c}."),
                    );
                }
            }
        }

        self.check_transform(&pointer, sink);

        if self.skin.is_some() && self.mesh.is_none() {
            sink.add(
                IssueCode::UnsatisfiedDependency,
                format!("{pointer}/skin"),
                "Dependency failed. 'mesh' must be defined.",
            );
        }
        if let Some(m) = mesh {
            let skinned = doc.meshes[m].primitives.iter().any(|p| p.is_skinned());
            if skin.is_some() && !doc.meshes[m].primitives.iter().all(|p| p.is_skinned()) {
                sink.add(
                    IssueCode::NodeSkinWithNonSkinnedMesh,
                    pointer.clone(),
                    "Node has skin defined, but mesh has no joints data.",
                );
            } else if skinned && self.skin.is_none() {
                sink.add(
                    IssueCode::NodeSkinnedMeshWithoutSkin,
                    format!("{pointer}/mesh"),
                    "Node uses skinned mesh, but has no skin defined.",
                );
            }
        }

        if let Some(weights) = &self.weights {
            match mesh {
                Some(m) if weights.len() != doc.meshes[m].target_count() => sink.add(
                    IssueCode::NodeWeightsInvalid,
                    format!("{pointer}/weights"),
                    format!(
                        "The length of weights array ({}) does not match the number of morph targets ({}).",
                        weights.len(),
                        doc.meshes[m].target_count()
                    ),
                ),
                Some(_) => {}
                None if self.mesh.is_none() => sink.add(
                    IssueCode::UnsatisfiedDependency,
                    format!("{pointer}/weights"),
                    "Dependency failed. 'mesh' must be defined.",
                ),
                None => {}
            }
        }

        if self.is_bare() && !cx.graph.is_joint(index) && !cx.graph.is_animated(index) {
            sink.add(IssueCode::NodeEmpty, pointer, "Empty node encountered.");
        }
    }

    fn check_transform(&self, pointer: &str, sink: &mut IssueSink<'_>) {
        if let Some(matrix) = &self.matrix {
            if self.has_trs() {
                sink.add(
                    IssueCode::NodeMatrixTrs,
                    pointer.to_string(),
                    "A node can have either a matrix or any combination of translation/rotation/scale (TRS) properties.",
                );
            }
            let m = DMat4::from_cols_slice(matrix);
            if m == DMat4::IDENTITY {
                sink.add(
                    IssueCode::NodeMatrixDefault,
                    format!("{pointer}/matrix"),
                    "Do not specify default transform matrix.",
                );
            } else if !is_trs(&m) {
                sink.add(
                    IssueCode::NodeMatrixNonTrs,
                    format!("{pointer}/matrix"),
                    "Matrix must be decomposable to TRS.",
                );
            }
        }

        if let Some(rotation) = &self.rotation {
            let length = rotation.iter().map(|c| c * c).sum::<f64>().sqrt();
            if (length - 1.0).abs() > UNIT_EPSILON {
                sink.add(
                    IssueCode::RotationNonUnit,
                    format!("{pointer}/rotation"),
                    format!("Rotation quaternion must be normalized, length is {length}."),
                );
            }
        }
    }
}

/// Whether the matrix survives a decompose-recompose round trip
///
/// Mirroring folds into a negative scale on decomposition, so the upper-left
/// block must have a positive determinant first.
fn is_trs(m: &DMat4) -> bool {
    if m.row(3) != DVec4::new(0.0, 0.0, 0.0, 1.0) {
        return false;
    }
    if DMat3::from_mat4(*m).determinant() <= 0.0 {
        return false;
    }
    let (scale, rotation, translation) = m.to_scale_rotation_translation();
    let recomposed = DMat4::from_scale_rotation_translation(scale, rotation, translation);
    recomposed.abs_diff_eq(*m, DECOMPOSE_EPSILON)
}
