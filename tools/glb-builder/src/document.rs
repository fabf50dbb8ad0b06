//! GLTF document construction

use crate::utils::data_uri;
use crate::{AnimationAccessors, BufferBuilder, MeshAccessors, SkeletonAccessors};
use serde_json::{Map, Value, json};

/// Where buffer 0 gets its bytes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferSource {
    /// No `uri`; bytes come from the GLB BIN chunk
    Glb,
    /// Bytes embedded as a base64 `data:` URI
    DataUri,
    /// External file relative to the document
    Uri(String),
}

/// Builder for complete GLTF documents
pub struct GltfBuilder {
    nodes: Vec<Value>,
    meshes: Vec<Value>,
    materials: Vec<Value>,
    cameras: Vec<Value>,
    skins: Vec<Value>,
    animations: Vec<Value>,
    scenes: Vec<Value>,
    extensions_used: Vec<String>,
    extensions_required: Vec<String>,
    extra_properties: Map<String, Value>,
    default_scene: bool,
}

impl GltfBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            cameras: Vec::new(),
            skins: Vec::new(),
            animations: Vec::new(),
            scenes: Vec::new(),
            extensions_used: Vec::new(),
            extensions_required: Vec::new(),
            extra_properties: Map::new(),
            default_scene: true,
        }
    }

    /// Add a node
    pub fn add_node(mut self, node: Value) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add multiple nodes
    pub fn add_nodes(mut self, nodes: Vec<Value>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Get the current node count
    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Add a mesh object verbatim
    pub fn add_mesh(mut self, mesh: Value) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// Add a mesh with one triangle-list primitive
    pub fn add_mesh_from_accessors(mut self, name: &str, accessors: &MeshAccessors) -> Self {
        let mut attributes = Map::new();
        attributes.insert("POSITION".into(), accessors.positions.as_json_index());

        if let Some(normals) = accessors.normals {
            attributes.insert("NORMAL".into(), normals.as_json_index());
        }

        if let Some(uvs) = accessors.uvs {
            attributes.insert("TEXCOORD_0".into(), uvs.as_json_index());
        }

        if let Some(colors) = accessors.colors {
            attributes.insert("COLOR_0".into(), colors.as_json_index());
        }

        if let Some(joints) = accessors.joints {
            attributes.insert("JOINTS_0".into(), joints.as_json_index());
        }

        if let Some(weights) = accessors.weights {
            attributes.insert("WEIGHTS_0".into(), weights.as_json_index());
        }

        let mut primitive = json!({ "attributes": attributes });
        if let Some(indices) = accessors.indices {
            primitive["indices"] = indices.as_json_index();
        }

        self.meshes.push(json!({
            "name": name,
            "primitives": [primitive],
        }));

        self
    }

    /// Get the index of the last added mesh
    pub fn last_mesh_index(&self) -> Option<u32> {
        if self.meshes.is_empty() {
            None
        } else {
            Some(self.meshes.len() as u32 - 1)
        }
    }

    /// Add a material
    pub fn add_material(mut self, material: Value) -> Self {
        self.materials.push(material);
        self
    }

    /// Add a camera
    pub fn add_camera(mut self, camera: Value) -> Self {
        self.cameras.push(camera);
        self
    }

    /// Add a skin
    pub fn add_skin(
        mut self,
        name: &str,
        skeleton_root: Option<u32>,
        joints: &[u32],
        accessors: &SkeletonAccessors,
    ) -> Self {
        let mut skin = json!({
            "name": name,
            "inverseBindMatrices": accessors.inverse_bind_matrices.as_json_index(),
            "joints": joints,
        });
        if let Some(root) = skeleton_root {
            skin["skeleton"] = json!(root);
        }
        self.skins.push(skin);
        self
    }

    /// Get the index of the last added skin
    pub fn last_skin_index(&self) -> Option<u32> {
        if self.skins.is_empty() {
            None
        } else {
            Some(self.skins.len() as u32 - 1)
        }
    }

    /// Add an animation with one T/R/S channel triple per bone
    pub fn add_animation(
        mut self,
        name: &str,
        bone_node_indices: &[u32],
        accessors: &AnimationAccessors,
    ) -> Self {
        let mut samplers = Vec::new();
        let mut channels = Vec::new();

        for (bone_idx, node_idx) in bone_node_indices.iter().enumerate() {
            let tracks = [
                ("translation", accessors.translations[bone_idx]),
                ("rotation", accessors.rotations[bone_idx]),
                ("scale", accessors.scales[bone_idx]),
            ];
            for (path, output) in tracks {
                samplers.push(json!({
                    "input": accessors.times.as_json_index(),
                    "interpolation": "LINEAR",
                    "output": output.as_json_index(),
                }));
                channels.push(json!({
                    "sampler": samplers.len() - 1,
                    "target": { "node": node_idx, "path": path },
                }));
            }
        }

        self.animations.push(json!({
            "name": name,
            "channels": channels,
            "samplers": samplers,
        }));
        self
    }

    /// Add a scene
    pub fn add_scene(mut self, name: &str, root_nodes: &[u32]) -> Self {
        self.scenes.push(json!({
            "name": name,
            "nodes": root_nodes,
        }));
        self
    }

    /// Skip the top-level `scene` property
    pub fn without_default_scene(mut self) -> Self {
        self.default_scene = false;
        self
    }

    /// Declare an extension as used (and optionally required)
    pub fn use_extension(mut self, name: &str, required: bool) -> Self {
        self.extensions_used.push(name.to_string());
        if required {
            self.extensions_required.push(name.to_string());
        }
        self
    }

    /// Set an arbitrary top-level property, overriding anything generated
    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.extra_properties.insert(key.to_string(), value);
        self
    }

    /// Build final glTF root; empty collections are omitted
    pub fn build(self, buffer: &BufferBuilder, source: BufferSource, generator: &str) -> Value {
        let mut root = Map::new();
        root.insert(
            "asset".into(),
            json!({ "version": "2.0", "generator": generator }),
        );

        if !buffer.data().is_empty() {
            let mut entry = json!({ "byteLength": buffer.data().len() });
            match source {
                BufferSource::Glb => {}
                BufferSource::DataUri => {
                    entry["uri"] = json!(data_uri("application/octet-stream", buffer.data()));
                }
                BufferSource::Uri(uri) => entry["uri"] = json!(uri),
            }
            root.insert("buffers".into(), json!([entry]));
        }

        let collections = [
            ("bufferViews", buffer.views().to_vec()),
            ("accessors", buffer.accessors().to_vec()),
            ("meshes", self.meshes),
            ("materials", self.materials),
            ("cameras", self.cameras),
            ("nodes", self.nodes),
            ("skins", self.skins),
            ("animations", self.animations),
        ];
        for (key, items) in collections {
            if !items.is_empty() {
                root.insert(key.into(), Value::Array(items));
            }
        }

        if !self.scenes.is_empty() {
            if self.default_scene {
                root.insert("scene".into(), json!(0));
            }
            root.insert("scenes".into(), Value::Array(self.scenes));
        }
        if !self.extensions_used.is_empty() {
            root.insert("extensionsUsed".into(), json!(self.extensions_used));
        }
        if !self.extensions_required.is_empty() {
            root.insert("extensionsRequired".into(), json!(self.extensions_required));
        }

        root.extend(self.extra_properties);
        Value::Object(root)
    }
}

impl Default for GltfBuilder {
    fn default() -> Self {
        Self::new()
    }
}
