//! Document normalization
//!
//! Turns the parsed JSON root into a [`Document`] of typed entities. Shape
//! problems are reported while reading; entities keep their document
//! positions even when malformed so later stages can address them by index.

use crate::entities::{
    Accessor, Animation, Asset, Buffer, BufferView, Camera, Image, Material, Mesh, Node, Sampler, Scene, Skin,
    Texture,
};
use crate::extensions::{ExtensionCollection, ExtensionObject, ExtensionRef, RefTarget};
use crate::issue::IssueCode;
use crate::reader::{Index, ObjectKind, ObjectReader, ReadContext, read_object};
use serde_json::Value;

/// Top-level entity arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Accessors,
    Animations,
    Buffers,
    BufferViews,
    Cameras,
    Images,
    Materials,
    Meshes,
    Nodes,
    Samplers,
    Scenes,
    Skins,
    Textures,
}

impl Collection {
    pub const ALL: [Collection; 13] = [
        Collection::Accessors,
        Collection::Animations,
        Collection::Buffers,
        Collection::BufferViews,
        Collection::Cameras,
        Collection::Images,
        Collection::Materials,
        Collection::Meshes,
        Collection::Nodes,
        Collection::Samplers,
        Collection::Scenes,
        Collection::Skins,
        Collection::Textures,
    ];

    /// Property name in the root object
    pub fn key(self) -> &'static str {
        match self {
            Collection::Accessors => "accessors",
            Collection::Animations => "animations",
            Collection::Buffers => "buffers",
            Collection::BufferViews => "bufferViews",
            Collection::Cameras => "cameras",
            Collection::Images => "images",
            Collection::Materials => "materials",
            Collection::Meshes => "meshes",
            Collection::Nodes => "nodes",
            Collection::Samplers => "samplers",
            Collection::Scenes => "scenes",
            Collection::Skins => "skins",
            Collection::Textures => "textures",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

/// Top-level entity a pointer lies within, e.g. `/materials/3/...`
pub fn entity_of(pointer: &str) -> Option<(Collection, usize)> {
    let mut tokens = pointer.strip_prefix('/')?.split('/');
    let collection = Collection::from_key(tokens.next()?)?;
    let index = tokens.next()?.parse().ok()?;
    Some((collection, index))
}

/// A texture bound to a material, from the core schema or an extension
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    /// Pointer of the textureInfo object
    pub pointer: String,
    pub tex_coord: u64,
    /// Sampled as a tangent-space normal map
    pub normal_map: bool,
}

/// Normalized glTF document
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub asset: Option<Asset>,
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
    pub scene: Option<Index>,

    pub accessors: Vec<Accessor>,
    pub animations: Vec<Animation>,
    pub buffers: Vec<Buffer>,
    pub buffer_views: Vec<BufferView>,
    pub cameras: Vec<Camera>,
    pub images: Vec<Image>,
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<Node>,
    pub samplers: Vec<Sampler>,
    pub scenes: Vec<Scene>,
    pub skins: Vec<Skin>,
    pub textures: Vec<Texture>,

    /// Every extension object, in discovery order
    pub extensions: Vec<ExtensionObject>,
    /// References found inside extension objects
    pub extension_refs: Vec<ExtensionRef>,
    /// Entity arrays defined by extensions, e.g. punctual lights
    pub extension_collections: Vec<ExtensionCollection>,
}

fn collection<T: Default>(
    r: &mut ObjectReader<'_, '_, '_>,
    key: &'static str,
    kind: ObjectKind,
    read: fn(&mut ObjectReader<'_, '_, '_>) -> T,
) -> Vec<T> {
    r.child_array(key, kind, true, |_, element| read(element))
        .unwrap_or_default()
}

impl Document {
    /// Read the root object
    ///
    /// A missing `asset` is reported at `/`; the caller decides whether to
    /// continue.
    pub fn read(root: &Value, cx: &mut ReadContext<'_>) -> Self {
        if root.get("asset").is_none() {
            cx.issues
                .add(IssueCode::UndefinedProperty, "/", "Property 'asset' must be defined.");
        }
        read_object(root, String::new(), ObjectKind::Root, cx, |r| {
            let extensions_used = r.string_array("extensionsUsed").unwrap_or_default();
            let extensions_required = r.string_array("extensionsRequired").unwrap_or_default();
            let asset = r.child("asset", ObjectKind::Asset, Asset::read);
            let scene = r.index("scene");

            Document {
                asset,
                extensions_used,
                extensions_required,
                scene,
                buffers: collection(r, "buffers", ObjectKind::Buffer, Buffer::read),
                buffer_views: collection(r, "bufferViews", ObjectKind::BufferView, BufferView::read),
                accessors: collection(r, "accessors", ObjectKind::Accessor, Accessor::read),
                images: collection(r, "images", ObjectKind::Image, Image::read),
                samplers: collection(r, "samplers", ObjectKind::Sampler, Sampler::read),
                textures: collection(r, "textures", ObjectKind::Texture, Texture::read),
                materials: collection(r, "materials", ObjectKind::Material, Material::read),
                meshes: collection(r, "meshes", ObjectKind::Mesh, Mesh::read),
                cameras: collection(r, "cameras", ObjectKind::Camera, Camera::read),
                nodes: collection(r, "nodes", ObjectKind::Node, Node::read),
                skins: collection(r, "skins", ObjectKind::Skin, Skin::read),
                animations: collection(r, "animations", ObjectKind::Animation, Animation::read),
                scenes: collection(r, "scenes", ObjectKind::Scene, Scene::read),
                ..Default::default()
            }
        })
        .unwrap_or_default()
    }

    pub fn len(&self, collection: Collection) -> usize {
        match collection {
            Collection::Accessors => self.accessors.len(),
            Collection::Animations => self.animations.len(),
            Collection::Buffers => self.buffers.len(),
            Collection::BufferViews => self.buffer_views.len(),
            Collection::Cameras => self.cameras.len(),
            Collection::Images => self.images.len(),
            Collection::Materials => self.materials.len(),
            Collection::Meshes => self.meshes.len(),
            Collection::Nodes => self.nodes.len(),
            Collection::Samplers => self.samplers.len(),
            Collection::Scenes => self.scenes.len(),
            Collection::Skins => self.skins.len(),
            Collection::Textures => self.textures.len(),
        }
    }

    /// Length of the collection a reference points into
    pub fn target_len(&self, target: RefTarget) -> usize {
        match target {
            RefTarget::Core(collection) => self.len(collection),
            RefTarget::Extension(name) => self.extension_collection(name).map_or(0, |c| c.len),
        }
    }

    pub fn extension_collection(&self, name: &str) -> Option<&ExtensionCollection> {
        self.extension_collections.iter().find(|c| c.extension == name)
    }

    pub fn is_extension_used(&self, name: &str) -> bool {
        self.extensions_used.iter().any(|used| used == name)
    }

    /// All textures a material samples, core bindings first
    pub fn material_textures(&self, material: usize) -> Vec<TextureBinding> {
        let Some(m) = self.materials.get(material) else {
            return Vec::new();
        };
        let normal_pointer = m.normal_texture.as_ref().map(|info| info.pointer.as_str());
        let core = m.textures().map(|info| TextureBinding {
            pointer: info.pointer.clone(),
            tex_coord: info.tex_coord,
            normal_map: Some(info.pointer.as_str()) == normal_pointer,
        });
        let extension = self
            .extension_refs
            .iter()
            .filter(|r| r.owner == Some((Collection::Materials, material)))
            .filter_map(|r| r.texture.clone());
        core.chain(extension).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{IssueSink, SeverityOverrides};
    use serde_json::json;

    fn read(value: Value) -> (Document, Vec<(&'static str, String)>) {
        let overrides = SeverityOverrides::new();
        let mut cx = ReadContext::new(IssueSink::new(&overrides));
        let doc = Document::read(&value, &mut cx);
        let issues = cx
            .issues
            .issues()
            .iter()
            .map(|i| (i.code.as_str(), i.pointer.clone().unwrap_or_default()))
            .collect();
        (doc, issues)
    }

    #[test]
    fn test_entity_of() {
        assert_eq!(entity_of("/materials/3/pbrMetallicRoughness"), Some((Collection::Materials, 3)));
        assert_eq!(entity_of("/meshes/0/primitives/1"), Some((Collection::Meshes, 0)));
        assert_eq!(entity_of(""), None);
        assert_eq!(entity_of("/asset"), None);
    }

    #[test]
    fn test_missing_asset() {
        let (doc, issues) = read(json!({}));
        assert!(doc.asset.is_none());
        assert_eq!(issues, vec![("UNDEFINED_PROPERTY", "/".to_string())]);
    }

    #[test]
    fn test_positions_are_kept() {
        let (doc, issues) = read(json!({
            "asset": { "version": "2.0" },
            "nodes": [{ "name": "a" }, 5, { "mesh": 0 }]
        }));
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.nodes[2].mesh, Some(Index(0)));
        assert_eq!(issues, vec![("TYPE_MISMATCH", "/nodes/1".to_string())]);
    }

    #[test]
    fn test_empty_collection() {
        let (doc, issues) = read(json!({ "asset": { "version": "2.0" }, "meshes": [] }));
        assert!(doc.meshes.is_empty());
        assert_eq!(issues, vec![("EMPTY_ENTITY", "/meshes".to_string())]);
    }

    #[test]
    fn test_unknown_root_property() {
        let (_, issues) = read(json!({ "asset": { "version": "2.0" }, "lights": [] }));
        assert_eq!(issues, vec![("UNEXPECTED_PROPERTY", "/lights".to_string())]);
    }
}
