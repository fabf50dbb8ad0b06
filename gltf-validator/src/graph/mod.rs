//! Reference and usage graph
//!
//! Built once per run, before any semantic validator. Records how every
//! accessor and buffer view is used, the node hierarchy, and which entities
//! are reachable from scenes and animations. Read-only afterwards.

mod reach;
mod structure;

use crate::document::{Collection, Document, entity_of};
use crate::entities::{Interpolation, Semantic, TargetPath};
use crate::extensions::RefTarget;
use crate::issue::IssueSink;
use hashbrown::HashMap;

pub use structure::strongly_connected;

/// How a buffer view's bytes are consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewUsage {
    /// Vertex attributes and morph targets
    pub vertex: bool,
    /// Primitive indices
    pub index: bool,
    /// Animation keyframes, inverse bind matrices and sparse storage
    pub other: bool,
    pub image: bool,
}

/// One place an accessor is referenced from
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorUse {
    Attribute {
        mesh: usize,
        primitive: usize,
        semantic: Semantic,
    },
    MorphTarget {
        mesh: usize,
        primitive: usize,
        semantic: Semantic,
    },
    Indices {
        mesh: usize,
        primitive: usize,
    },
    InverseBindMatrices {
        skin: usize,
    },
    AnimationInput {
        animation: usize,
        sampler: usize,
    },
    AnimationOutput {
        animation: usize,
        sampler: usize,
        path: TargetPath,
        interpolation: Interpolation,
    },
}

#[derive(Debug, Clone, Default)]
pub struct UsageGraph {
    /// Every parent of each node, in document order
    parents: Vec<Vec<usize>>,
    /// Resolved children of each node
    children: Vec<Vec<usize>>,
    joint: Vec<bool>,
    animated: Vec<bool>,
    views: Vec<ViewUsage>,
    /// Indexed like `doc.accessors`
    pub accessor_uses: Vec<Vec<AccessorUse>>,
    /// Skins applied to each mesh by the nodes instancing it
    pub mesh_skins: Vec<Vec<usize>>,
    /// Indexed by `Collection as usize`, then entity
    used: Vec<Vec<bool>>,
    extension_used: HashMap<&'static str, Vec<bool>>,
    /// Per animation, per sampler
    samplers_used: Vec<Vec<bool>>,
}

impl UsageGraph {
    pub fn build(doc: &Document) -> Self {
        let node_count = doc.nodes.len();
        let mut graph = Self {
            parents: vec![Vec::new(); node_count],
            children: vec![Vec::new(); node_count],
            joint: vec![false; node_count],
            animated: vec![false; node_count],
            views: vec![ViewUsage::default(); doc.buffer_views.len()],
            accessor_uses: vec![Vec::new(); doc.accessors.len()],
            mesh_skins: vec![Vec::new(); doc.meshes.len()],
            ..Default::default()
        };

        for (i, node) in doc.nodes.iter().enumerate() {
            for child in node.children.iter().filter_map(|c| c.get(node_count)) {
                graph.children[i].push(child);
                graph.parents[child].push(i);
            }
            let mesh = node.mesh.and_then(|m| m.get(doc.meshes.len()));
            let skin = node.skin.and_then(|s| s.get(doc.skins.len()));
            if let (Some(mesh), Some(skin)) = (mesh, skin) {
                if !graph.mesh_skins[mesh].contains(&skin) {
                    graph.mesh_skins[mesh].push(skin);
                }
            }
        }

        for skin in &doc.skins {
            for joint in skin.joints.iter().filter_map(|j| j.get(node_count)) {
                graph.joint[joint] = true;
            }
        }

        graph.collect_accessor_uses(doc);
        graph.collect_view_usage(doc);
        graph.mark_reachable(doc);

        tracing::debug!(
            "Usage graph: {} nodes, {} accessors with uses",
            node_count,
            graph.accessor_uses.iter().filter(|uses| !uses.is_empty()).count()
        );
        graph
    }

    fn collect_accessor_uses(&mut self, doc: &Document) {
        let len = doc.accessors.len();
        let mut add = |index: crate::reader::Index, usage: AccessorUse| {
            if let Some(a) = index.get(len) {
                self.accessor_uses[a].push(usage);
            }
        };

        for (m, mesh) in doc.meshes.iter().enumerate() {
            for (p, primitive) in mesh.primitives.iter().enumerate() {
                for (name, index) in &primitive.attributes {
                    if let Some(semantic) = Semantic::parse(name) {
                        add(*index, AccessorUse::Attribute {
                            mesh: m,
                            primitive: p,
                            semantic,
                        });
                    }
                }
                if let Some(indices) = primitive.indices {
                    add(indices, AccessorUse::Indices { mesh: m, primitive: p });
                }
                for target in &primitive.targets {
                    for (name, index) in target {
                        if let Some(semantic) = Semantic::parse(name) {
                            add(*index, AccessorUse::MorphTarget {
                                mesh: m,
                                primitive: p,
                                semantic,
                            });
                        }
                    }
                }
            }
        }

        for (s, skin) in doc.skins.iter().enumerate() {
            if let Some(ibm) = skin.inverse_bind_matrices {
                add(ibm, AccessorUse::InverseBindMatrices { skin: s });
            }
        }

        for (a, animation) in doc.animations.iter().enumerate() {
            for (s, sampler) in animation.samplers.iter().enumerate() {
                if let Some(input) = sampler.input {
                    add(input, AccessorUse::AnimationInput {
                        animation: a,
                        sampler: s,
                    });
                }
            }
            // Output semantics depend on the channel path, so outputs are
            // recorded once per distinct path targeting the sampler
            let mut seen = Vec::new();
            for channel in &animation.channels {
                let (Some(sampler), Some(path)) = (channel.sampler, channel.path) else {
                    continue;
                };
                let Some(s) = sampler.get(animation.samplers.len()) else {
                    continue;
                };
                if seen.contains(&(s, path)) {
                    continue;
                }
                seen.push((s, path));
                let sampler = &animation.samplers[s];
                if let Some(output) = sampler.output {
                    add(output, AccessorUse::AnimationOutput {
                        animation: a,
                        sampler: s,
                        path,
                        interpolation: sampler.interpolation,
                    });
                }
            }
            for channel in &animation.channels {
                if let Some(node) = channel.node.and_then(|n| n.get(doc.nodes.len())) {
                    self.animated[node] = true;
                }
            }
        }
    }

    fn collect_view_usage(&mut self, doc: &Document) {
        let len = doc.buffer_views.len();
        for (a, accessor) in doc.accessors.iter().enumerate() {
            let Some(view) = accessor.buffer_view.and_then(|v| v.get(len)) else {
                continue;
            };
            for usage in &self.accessor_uses[a] {
                let slot = &mut self.views[view];
                match usage {
                    AccessorUse::Attribute { .. } | AccessorUse::MorphTarget { .. } => slot.vertex = true,
                    AccessorUse::Indices { .. } => slot.index = true,
                    _ => slot.other = true,
                }
            }
        }
        for accessor in &doc.accessors {
            let Some(sparse) = &accessor.sparse else {
                continue;
            };
            let views = [
                sparse.indices.as_ref().and_then(|i| i.buffer_view),
                sparse.values.as_ref().and_then(|v| v.buffer_view),
            ];
            for view in views.into_iter().flatten().filter_map(|v| v.get(len)) {
                self.views[view].other = true;
            }
        }
        for image in &doc.images {
            if let Some(view) = image.buffer_view.and_then(|v| v.get(len)) {
                self.views[view].image = true;
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// First parent recorded for a node
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node)?.first().copied()
    }

    pub fn parents(&self, node: usize) -> &[usize] {
        self.parents.get(node).map_or(&[], Vec::as_slice)
    }

    pub fn children(&self, node: usize) -> &[usize] {
        self.children.get(node).map_or(&[], Vec::as_slice)
    }

    pub fn is_joint(&self, node: usize) -> bool {
        self.joint.get(node).copied().unwrap_or(false)
    }

    /// Targeted by an animation channel
    pub fn is_animated(&self, node: usize) -> bool {
        self.animated.get(node).copied().unwrap_or(false)
    }

    pub fn view_usage(&self, view: usize) -> ViewUsage {
        self.views.get(view).copied().unwrap_or_default()
    }

    pub fn is_entity_used(&self, collection: Collection, index: usize) -> bool {
        self.used
            .get(collection as usize)
            .and_then(|flags| flags.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Whether the entity containing `pointer` is reachable
    ///
    /// Pointers outside any top-level collection count as used.
    pub fn is_used(&self, pointer: &str) -> bool {
        match entity_of(pointer) {
            Some((Collection::Scenes | Collection::Animations, _)) | None => true,
            Some((collection, index)) => self.is_entity_used(collection, index),
        }
    }

    pub fn is_target_used(&self, target: RefTarget, index: usize) -> bool {
        match target {
            RefTarget::Core(collection) => self.is_entity_used(collection, index),
            RefTarget::Extension(name) => self
                .extension_used
                .get(name)
                .and_then(|flags| flags.get(index))
                .copied()
                .unwrap_or(false),
        }
    }

    /// Node-loop and skin-hierarchy checks
    pub fn check_structure(&self, doc: &Document, sink: &mut IssueSink<'_>) {
        structure::check_loops(self, sink);
        structure::check_skins(self, doc, sink);
    }

    /// `UNUSED_OBJECT` for everything not reached
    pub fn report_unused(&self, doc: &Document, sink: &mut IssueSink<'_>) {
        reach::report_unused(self, doc, sink);
    }
}
