//! Reachability from scenes and animations

use super::UsageGraph;
use crate::document::{Collection, Document};
use crate::extensions::{ExtensionRef, RefTarget};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::Index;
use hashbrown::HashMap;

struct Marker<'d> {
    doc: &'d Document,
    used: Vec<Vec<bool>>,
    extension_used: HashMap<&'static str, Vec<bool>>,
    owned_refs: HashMap<(Collection, usize), Vec<&'d ExtensionRef>>,
    queue: Vec<(Collection, usize)>,
}

impl<'d> Marker<'d> {
    fn new(doc: &'d Document) -> Self {
        let used = Collection::ALL.iter().map(|&c| vec![false; doc.len(c)]).collect();
        let extension_used = doc
            .extension_collections
            .iter()
            .map(|c| (c.extension, vec![false; c.len]))
            .collect();
        let mut owned_refs: HashMap<(Collection, usize), Vec<&ExtensionRef>> = HashMap::new();
        for reference in &doc.extension_refs {
            if let Some(owner) = reference.owner {
                owned_refs.entry(owner).or_default().push(reference);
            }
        }
        Self {
            doc,
            used,
            extension_used,
            owned_refs,
            queue: Vec::new(),
        }
    }

    fn mark(&mut self, collection: Collection, index: Option<Index>) {
        let Some(i) = index.and_then(|index| index.get(self.doc.len(collection))) else {
            return;
        };
        let flag = &mut self.used[collection as usize][i];
        if !*flag {
            *flag = true;
            self.queue.push((collection, i));
        }
    }

    fn mark_extension(&mut self, name: &'static str, index: Index) {
        if let Some(flags) = self.extension_used.get_mut(name) {
            if let Some(i) = index.get(flags.len()) {
                flags[i] = true;
            }
        }
    }

    fn drain(&mut self) {
        while let Some((collection, i)) = self.queue.pop() {
            self.visit(collection, i);
            let refs = self.owned_refs.get(&(collection, i)).cloned().unwrap_or_default();
            for reference in refs {
                match reference.target {
                    RefTarget::Core(target) => self.mark(target, Some(reference.index)),
                    RefTarget::Extension(name) => self.mark_extension(name, reference.index),
                }
            }
        }
    }

    fn visit(&mut self, collection: Collection, i: usize) {
        let doc = self.doc;
        match collection {
            Collection::Scenes => {
                for &node in &doc.scenes[i].nodes {
                    self.mark(Collection::Nodes, Some(node));
                }
            }
            Collection::Nodes => {
                let node = &doc.nodes[i];
                for &child in &node.children {
                    self.mark(Collection::Nodes, Some(child));
                }
                self.mark(Collection::Meshes, node.mesh);
                self.mark(Collection::Skins, node.skin);
                self.mark(Collection::Cameras, node.camera);
            }
            Collection::Meshes => {
                for primitive in &doc.meshes[i].primitives {
                    let targets = primitive.targets.iter().flatten();
                    for (_, accessor) in primitive.attributes.iter().chain(targets) {
                        self.mark(Collection::Accessors, Some(*accessor));
                    }
                    self.mark(Collection::Accessors, primitive.indices);
                    self.mark(Collection::Materials, primitive.material);
                }
            }
            Collection::Materials => {
                for info in doc.materials[i].textures() {
                    self.mark(Collection::Textures, info.index);
                }
            }
            Collection::Textures => {
                let texture = &doc.textures[i];
                self.mark(Collection::Samplers, texture.sampler);
                self.mark(Collection::Images, texture.source);
            }
            Collection::Images => self.mark(Collection::BufferViews, doc.images[i].buffer_view),
            Collection::Accessors => {
                let accessor = &doc.accessors[i];
                self.mark(Collection::BufferViews, accessor.buffer_view);
                if let Some(sparse) = &accessor.sparse {
                    self.mark(
                        Collection::BufferViews,
                        sparse.indices.as_ref().and_then(|indices| indices.buffer_view),
                    );
                    self.mark(
                        Collection::BufferViews,
                        sparse.values.as_ref().and_then(|values| values.buffer_view),
                    );
                }
            }
            Collection::BufferViews => self.mark(Collection::Buffers, doc.buffer_views[i].buffer),
            Collection::Skins => {
                let skin = &doc.skins[i];
                self.mark(Collection::Accessors, skin.inverse_bind_matrices);
                self.mark(Collection::Nodes, skin.skeleton);
                for &joint in &skin.joints {
                    self.mark(Collection::Nodes, Some(joint));
                }
            }
            Collection::Animations => {
                let animation = &doc.animations[i];
                for channel in &animation.channels {
                    self.mark(Collection::Nodes, channel.node);
                    let Some(s) = channel.sampler.and_then(|s| s.get(animation.samplers.len())) else {
                        continue;
                    };
                    let sampler = &animation.samplers[s];
                    self.mark(Collection::Accessors, sampler.input);
                    self.mark(Collection::Accessors, sampler.output);
                }
            }
            Collection::Buffers | Collection::Cameras | Collection::Samplers => {}
        }
    }
}

impl UsageGraph {
    pub(super) fn mark_reachable(&mut self, doc: &Document) {
        let mut marker = Marker::new(doc);

        // Root-level extension objects may reference entities directly
        for reference in doc.extension_refs.iter().filter(|r| r.owner.is_none()) {
            match reference.target {
                RefTarget::Core(target) => marker.mark(target, Some(reference.index)),
                RefTarget::Extension(name) => marker.mark_extension(name, reference.index),
            }
        }
        for i in 0..doc.scenes.len() {
            marker.mark(Collection::Scenes, Some(Index(i as i64)));
        }
        for i in 0..doc.animations.len() {
            marker.mark(Collection::Animations, Some(Index(i as i64)));
        }
        marker.drain();

        self.samplers_used = doc
            .animations
            .iter()
            .map(|animation| {
                let mut used = vec![false; animation.samplers.len()];
                for channel in &animation.channels {
                    if let Some(s) = channel.sampler.and_then(|s| s.get(used.len())) {
                        used[s] = true;
                    }
                }
                used
            })
            .collect();
        self.used = marker.used;
        self.extension_used = marker.extension_used;
    }
}

pub(super) fn report_unused(graph: &UsageGraph, doc: &Document, sink: &mut IssueSink<'_>) {
    let mut count = 0;
    for collection in Collection::ALL {
        if matches!(collection, Collection::Scenes | Collection::Animations) {
            continue;
        }
        for i in 0..doc.len(collection) {
            if !graph.is_entity_used(collection, i) {
                sink.add(
                    IssueCode::UnusedObject,
                    format!("/{}/{i}", collection.key()),
                    "This object may be unused.",
                );
                count += 1;
            }
        }
    }

    for (a, samplers) in graph.samplers_used.iter().enumerate() {
        for (s, &used) in samplers.iter().enumerate() {
            if !used {
                sink.add(
                    IssueCode::UnusedObject,
                    format!("/animations/{a}/samplers/{s}"),
                    "This object may be unused.",
                );
                count += 1;
            }
        }
    }

    for collection in &doc.extension_collections {
        for i in 0..collection.len {
            if !graph.is_target_used(RefTarget::Extension(collection.extension), i) {
                sink.add(
                    IssueCode::UnusedObject,
                    format!("{}/{i}", collection.pointer),
                    "This object may be unused.",
                );
                count += 1;
            }
        }
    }
    tracing::debug!("{} unused objects", count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::{ExtensionRegistry, read_extensions};
    use crate::issue::SeverityOverrides;
    use crate::reader::ReadContext;
    use serde_json::{Value, json};

    fn unused(value: Value) -> Vec<String> {
        let overrides = SeverityOverrides::new();
        let mut cx = ReadContext::new(IssueSink::new(&overrides));
        let mut doc = Document::read(&value, &mut cx);
        read_extensions(&mut doc, &mut cx, ExtensionRegistry::shared());
        let graph = UsageGraph::build(&doc);
        let mut sink = IssueSink::new(&overrides);
        graph.report_unused(&doc, &mut sink);
        sink.issues()
            .iter()
            .map(|i| i.pointer.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_scene_reaches_everything() {
        let pointers = unused(json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "children": [1] }, { "mesh": 0 }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }] }],
            "materials": [{ "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }],
            "textures": [{ "source": 0, "sampler": 0 }],
            "samplers": [{}],
            "images": [{ "uri": "a.png" }],
            "accessors": [{ "bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC3" }],
            "bufferViews": [{ "buffer": 0, "byteLength": 12 }],
            "buffers": [{ "byteLength": 12 }]
        }));
        assert!(pointers.is_empty(), "{pointers:?}");
    }

    #[test]
    fn test_orphans_are_reported() {
        let pointers = unused(json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": [{}, { "camera": 0 }],
            "cameras": [{ "type": "perspective", "perspective": { "yfov": 1.0, "znear": 0.1 } }],
            "materials": [{}]
        }));
        assert_eq!(pointers, vec!["/cameras/0", "/materials/0", "/nodes/1"]);
    }

    #[test]
    fn test_animation_marks_target_and_samplers() {
        let pointers = unused(json!({
            "asset": { "version": "2.0" },
            "nodes": [{}],
            "animations": [{
                "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
                "samplers": [{ "input": 0, "output": 1 }, { "input": 0, "output": 1 }]
            }],
            "accessors": [
                { "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0], "max": [1] },
                { "componentType": 5126, "count": 2, "type": "VEC3" }
            ]
        }));
        assert_eq!(pointers, vec!["/animations/0/samplers/1"]);
    }

    #[test]
    fn test_extension_collections() {
        let pointers = unused(json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_lights_punctual"],
            "extensions": {
                "KHR_lights_punctual": { "lights": [{ "type": "point" }, { "type": "directional" }] }
            },
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "extensions": { "KHR_lights_punctual": { "light": 1 } } }]
        }));
        assert_eq!(pointers, vec!["/extensions/KHR_lights_punctual/lights/0"]);
    }
}
