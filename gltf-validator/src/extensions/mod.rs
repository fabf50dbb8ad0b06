//! Extension framework
//!
//! Every `extensions` entry found while reading the core schema becomes an
//! [`ExtensionSite`]. Sites whose name has a registered handler are read
//! by that handler; all others are carried through as opaque payloads.
//! Handlers may read nested textureInfo objects, which can carry
//! extensions of their own, so the site queue grows while it is drained.
//!
//! Declaration rules (`extensionsUsed`, `extensionsRequired`, reserved
//! prefixes) are checked here for every extension, known or not.

mod lights;
mod materials;
mod quantization;
mod texture_sources;
mod texture_transform;
mod variants;

use crate::document::{Collection, Document, TextureBinding, entity_of};
use crate::entities::{Context, TextureInfo, resolve};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{ExtensionSite, Index, ObjectKind, ObjectReader, ReadContext, read_object};
use serde_json::Value;
use std::sync::LazyLock;

pub(crate) use quantization::NAME as MESH_QUANTIZATION;

// =============================================================================
// Constants
// =============================================================================

/// Vendor prefixes registered with Khronos
pub const RESERVED_PREFIXES: &[&str] = &[
    "KHR", "EXT", "ADOBE", "AGI", "AGT", "ALCM", "ALI", "AMZN", "ANIMECH", "ASOBO", "AVR", "BLENDER", "CAPCOM",
    "CESIUM", "CITYGML", "CLO", "CVTOOLS", "EPIC", "FB", "FOXIT", "GOOGLE", "GRIFFEL", "HWP", "KDAB", "LLQ", "MAXAR",
    "MESHOPT", "MOZ", "MPEG", "MSFT", "NV", "OMI", "OWLII", "PANDA3D", "POLUTROPON", "S8S", "SEIN", "SI3D", "SKFB",
    "SKYLINE", "SPECTRUM", "TRYON", "UX3D", "VRMC", "WEB3D",
];

/// Kinds that accept a textureInfo-level extension
pub(crate) const TEXTURE_INFO_KINDS: &[ObjectKind] = &[
    ObjectKind::TextureInfo,
    ObjectKind::NormalTextureInfo,
    ObjectKind::OcclusionTextureInfo,
];

// =============================================================================
// Types
// =============================================================================

/// Collection a reference points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefTarget {
    Core(Collection),
    /// Array defined by the named extension's root object
    Extension(&'static str),
}

/// A reference found inside an extension object
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionRef {
    /// Pointer of the index property
    pub pointer: String,
    /// Top-level entity owning the extension object, `None` at the root
    pub owner: Option<(Collection, usize)>,
    pub target: RefTarget,
    pub index: Index,
    /// Set when the reference is a material texture binding
    pub texture: Option<TextureBinding>,
}

/// An entity array defined by an extension
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionCollection {
    pub extension: &'static str,
    /// Pointer of the array, e.g. `/extensions/KHR_lights_punctual/lights`
    pub pointer: String,
    pub len: usize,
}

/// Data a handler keeps for its validation pass
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionPayload {
    /// No handler; carried through unexamined
    Opaque(Value),
    /// Fully checked while reading
    Checked,
    EmissiveStrength(f64),
    TextureSource(Option<Index>),
}

/// One extension object after reading
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionObject {
    pub name: String,
    pub pointer: String,
    pub owner_kind: ObjectKind,
    pub entity: Option<(Collection, usize)>,
    pub payload: ExtensionPayload,
}

/// Collects what a handler finds while reading one extension object
pub struct ReadOutput {
    owner_kind: ObjectKind,
    entity: Option<(Collection, usize)>,
    refs: Vec<ExtensionRef>,
    collections: Vec<ExtensionCollection>,
}

impl ReadOutput {
    fn new(owner_kind: ObjectKind, entity: Option<(Collection, usize)>) -> Self {
        Self {
            owner_kind,
            entity,
            refs: Vec::new(),
            collections: Vec::new(),
        }
    }

    pub fn owner_kind(&self) -> ObjectKind {
        self.owner_kind
    }

    /// Record a plain reference
    pub fn reference(&mut self, pointer: String, target: RefTarget, index: Index) {
        self.refs.push(ExtensionRef {
            pointer,
            owner: self.entity,
            target,
            index,
            texture: None,
        });
    }

    /// Record a material texture binding
    pub fn texture(&mut self, info: TextureInfo, normal_map: bool) {
        let Some(index) = info.index else {
            return;
        };
        self.refs.push(ExtensionRef {
            pointer: format!("{}/index", info.pointer),
            owner: self.entity,
            target: RefTarget::Core(Collection::Textures),
            index,
            texture: Some(TextureBinding {
                pointer: info.pointer,
                tex_coord: info.tex_coord,
                normal_map,
            }),
        });
    }

    pub fn collection(&mut self, extension: &'static str, pointer: String, len: usize) {
        self.collections.push(ExtensionCollection { extension, pointer, len });
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Schema and semantics for one extension
pub trait ExtensionHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Object kinds this extension may be attached to
    fn contexts(&self) -> &'static [ObjectKind];

    /// Read the extension object, recording references in `out`
    fn read(&self, r: &mut ObjectReader<'_, '_, '_>, out: &mut ReadOutput) -> ExtensionPayload;

    /// Checks that need the whole document
    fn validate(&self, _object: &ExtensionObject, _cx: &Context<'_>, _sink: &mut IssueSink<'_>) {}

    /// Support is partial; reported as information
    fn incomplete(&self) -> bool {
        false
    }

    /// The extension changes core semantics without any extension objects
    fn declaration_only(&self) -> bool {
        false
    }

    /// Loaders cannot ignore this extension
    fn must_be_required(&self) -> bool {
        false
    }
}

/// Built-in extension handlers, keyed by name
pub struct ExtensionRegistry {
    handlers: Vec<Box<dyn ExtensionHandler>>,
}

static BUILTIN: LazyLock<ExtensionRegistry> = LazyLock::new(ExtensionRegistry::builtin);

impl ExtensionRegistry {
    pub fn builtin() -> Self {
        let mut handlers: Vec<Box<dyn ExtensionHandler>> = vec![
            Box::new(lights::LightsPunctual),
            Box::new(quantization::MeshQuantization),
            Box::new(texture_transform::TextureTransform),
            Box::new(variants::MaterialsVariants),
            Box::new(texture_sources::TextureSource::BASISU),
            Box::new(texture_sources::TextureSource::WEBP),
        ];
        handlers.extend(
            materials::MATERIAL_EXTENSIONS
                .iter()
                .map(|table| Box::new(table.clone()) as Box<dyn ExtensionHandler>),
        );
        Self { handlers }
    }

    pub fn shared() -> &'static ExtensionRegistry {
        &BUILTIN
    }

    pub fn get(&self, name: &str) -> Option<&dyn ExtensionHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.name() == name)
            .map(|handler| handler.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|handler| handler.name())
    }
}

// =============================================================================
// Stages
// =============================================================================

/// Drain the site queue into `doc.extensions`
pub fn read_extensions(doc: &mut Document, cx: &mut ReadContext<'_>, registry: &ExtensionRegistry) {
    let mut next = 0;
    while next < cx.extension_sites.len() {
        let ExtensionSite {
            pointer,
            parent,
            owner,
            name,
            value,
        } = cx.extension_sites[next].clone();
        next += 1;

        let entity = entity_of(&parent);
        let payload = match registry.get(&name) {
            Some(handler) if handler.contexts().contains(&owner) => {
                let mut out = ReadOutput::new(owner, entity);
                let payload = read_object(&value, pointer.clone(), ObjectKind::ExtensionObject, cx, |r| {
                    handler.read(r, &mut out)
                });
                doc.extension_refs.append(&mut out.refs);
                doc.extension_collections.append(&mut out.collections);
                payload.unwrap_or(ExtensionPayload::Checked)
            }
            _ => ExtensionPayload::Opaque(value),
        };
        tracing::trace!("Read extension object {} at {}", name, pointer);
        doc.extensions.push(ExtensionObject {
            name,
            pointer,
            owner_kind: owner,
            entity,
            payload,
        });
    }
}

/// Declaration, placement and reference checks, then per-object handler checks
pub fn validate_extensions(cx: &Context<'_>, registry: &ExtensionRegistry, sink: &mut IssueSink<'_>) {
    let doc = cx.doc;
    check_declarations(doc, registry, sink);

    for reference in &doc.extension_refs {
        resolve(sink, reference.index, doc.target_len(reference.target), reference.pointer.clone());
    }

    for object in &doc.extensions {
        if let Some(handler) = registry.get(&object.name) {
            if handler.contexts().contains(&object.owner_kind) {
                handler.validate(object, cx, sink);
            }
        }
    }
}

fn check_declarations(doc: &Document, registry: &ExtensionRegistry, sink: &mut IssueSink<'_>) {
    for (i, name) in doc.extensions_used.iter().enumerate() {
        let pointer = format!("/extensionsUsed/{i}");
        let prefix = name.split('_').next().unwrap_or_default();
        if !RESERVED_PREFIXES.contains(&prefix) {
            sink.add(
                IssueCode::UnreservedExtensionPrefix,
                pointer.clone(),
                format!("Extension uses unreserved extension prefix '{prefix}'."),
            );
        }

        let Some(handler) = registry.get(name) else {
            sink.add(
                IssueCode::UnsupportedExtension,
                pointer,
                format!("Cannot validate an extension as it is not supported by the validator: '{name}'."),
            );
            continue;
        };
        if handler.incomplete() {
            sink.add(
                IssueCode::IncompleteExtensionSupport,
                pointer.clone(),
                format!(
                    "Validation support for this extension is incomplete; the asset may have errors or warnings not reported by the validator: '{name}'."
                ),
            );
        }
        if !handler.declaration_only() && !doc.extensions.iter().any(|object| &object.name == name) {
            sink.add(
                IssueCode::UnusedExtension,
                pointer.clone(),
                format!("Extension '{name}' is declared in extensionsUsed but not used."),
            );
        }
        if handler.must_be_required() && !doc.extensions_required.contains(name) {
            sink.add(
                IssueCode::NonRequiredExtension,
                pointer,
                format!("Extension '{name}' cannot be optional."),
            );
        }
    }

    for (i, name) in doc.extensions_required.iter().enumerate() {
        if !doc.is_extension_used(name) {
            sink.add(
                IssueCode::UnusedExtensionRequired,
                format!("/extensionsRequired/{i}"),
                format!("Unused extension '{name}' cannot be required."),
            );
        }
    }

    for object in &doc.extensions {
        if !doc.is_extension_used(&object.name) {
            sink.add(
                IssueCode::UndeclaredExtension,
                object.pointer.clone(),
                "Extension is not declared in extensionsUsed.",
            );
        }
        if let Some(handler) = registry.get(&object.name) {
            if !handler.contexts().contains(&object.owner_kind) {
                sink.add(
                    IssueCode::UnexpectedExtensionObject,
                    object.pointer.clone(),
                    "Unexpected location for this extension.",
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::SeverityOverrides;
    use serde_json::json;

    fn read(value: Value) -> (Document, Vec<(&'static str, String)>) {
        let overrides = SeverityOverrides::new();
        let mut cx = ReadContext::new(IssueSink::new(&overrides));
        let mut doc = Document::read(&value, &mut cx);
        read_extensions(&mut doc, &mut cx, ExtensionRegistry::shared());
        check_declarations(&doc, ExtensionRegistry::shared(), &mut cx.issues);
        let issues = cx
            .issues
            .issues()
            .iter()
            .map(|i| (i.code.as_str(), i.pointer.clone().unwrap_or_default()))
            .collect();
        (doc, issues)
    }

    #[test]
    fn test_registry_names_are_unique() {
        let registry = ExtensionRegistry::builtin();
        let mut names: Vec<_> = registry.names().collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(registry.get("KHR_materials_unlit").is_some());
        assert!(registry.get("KHR_bogus").is_none());
    }

    #[test]
    fn test_declaration_rules() {
        let (_, issues) = read(json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_materials_unlit", "ACME_thing"],
            "extensionsRequired": ["KHR_texture_transform"],
            "materials": [{ "extensions": { "KHR_materials_unlit": {}, "KHR_materials_ior": { "ior": 1.5 } } }]
        }));
        assert_eq!(
            issues,
            vec![
                ("UNRESERVED_EXTENSION_PREFIX", "/extensionsUsed/1".to_string()),
                ("UNSUPPORTED_EXTENSION", "/extensionsUsed/1".to_string()),
                ("UNUSED_EXTENSION_REQUIRED", "/extensionsRequired/0".to_string()),
                (
                    "UNDECLARED_EXTENSION",
                    "/materials/0/extensions/KHR_materials_ior".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_misplaced_extension_object() {
        let (doc, issues) = read(json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_materials_unlit"],
            "nodes": [{ "extensions": { "KHR_materials_unlit": {} } }]
        }));
        assert!(matches!(doc.extensions[0].payload, ExtensionPayload::Opaque(_)));
        assert_eq!(
            issues,
            vec![(
                "UNEXPECTED_EXTENSION_OBJECT",
                "/nodes/0/extensions/KHR_materials_unlit".to_string()
            )]
        );
    }

    #[test]
    fn test_nested_sites_are_read() {
        let (doc, issues) = read(json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_materials_clearcoat", "KHR_texture_transform"],
            "materials": [{
                "extensions": {
                    "KHR_materials_clearcoat": {
                        "clearcoatFactor": 1.0,
                        "clearcoatTexture": {
                            "index": 0,
                            "extensions": { "KHR_texture_transform": { "scale": [2.0, 2.0] } }
                        }
                    }
                }
            }]
        }));
        assert!(issues.is_empty(), "{issues:?}");
        assert_eq!(doc.extensions.len(), 2);
        assert_eq!(doc.extensions[1].name, "KHR_texture_transform");
        assert_eq!(doc.extension_refs.len(), 1);
        assert_eq!(doc.extension_refs[0].owner, Some((Collection::Materials, 0)));
    }

    #[test]
    fn test_unused_extension() {
        let (_, issues) = read(json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_materials_unlit", "KHR_mesh_quantization"],
            "extensionsRequired": ["KHR_mesh_quantization"]
        }));
        assert_eq!(issues, vec![("UNUSED_EXTENSION", "/extensionsUsed/0".to_string())]);
    }
}
