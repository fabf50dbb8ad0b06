//! Validation report and asset statistics

use crate::document::Document;
use crate::fetch::{ResourceRecord, Resources};
use crate::issue::{Issue, Severity};
use crate::options::{InputFormat, ValidationOptions};
use serde::Serialize;
use std::cmp::Ordering;

/// Result of one validation run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub mime_type: &'static str,
    pub validator_version: &'static str,
    pub issues: IssueSummary,
    /// Absent when validation stopped before the document could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<AssetInfo>,
}

impl Report {
    pub(crate) fn new(
        format: InputFormat,
        issues: Vec<Issue>,
        info: Option<AssetInfo>,
        options: &ValidationOptions,
    ) -> Self {
        let mime_type = match format {
            InputFormat::Gltf => "model/gltf+json",
            InputFormat::Glb => "model/gltf-binary",
        };
        Self {
            uri: options.uri.clone(),
            mime_type,
            validator_version: env!("CARGO_PKG_VERSION"),
            issues: IssueSummary::collect(issues, options),
            info,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.issues.num_errors > 0
    }

    /// Codes of the reported issues, in report order
    pub fn codes(&self) -> Vec<&'static str> {
        self.issues.messages.iter().map(|issue| issue.code.as_str()).collect()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// =============================================================================
// Issues
// =============================================================================

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub num_errors: usize,
    pub num_warnings: usize,
    pub num_infos: usize,
    pub num_hints: usize,
    pub messages: Vec<Issue>,
    /// Some issues were dropped by `maxIssues`
    pub truncated: bool,
}

impl IssueSummary {
    /// Filter, order, count and truncate
    fn collect(mut issues: Vec<Issue>, options: &ValidationOptions) -> Self {
        issues.retain(|issue| options.admits(issue.code.as_str()));
        issues.sort_by(compare_issues);

        let count = |severity: Severity| issues.iter().filter(|issue| issue.severity == severity).count();
        let mut summary = Self {
            num_errors: count(Severity::Error),
            num_warnings: count(Severity::Warning),
            num_infos: count(Severity::Information),
            num_hints: count(Severity::Hint),
            ..Default::default()
        };

        if options.max_issues > 0 && issues.len() > options.max_issues {
            tracing::debug!("Truncating {} issues to {}", issues.len(), options.max_issues);
            issues.truncate(options.max_issues);
            summary.truncated = true;
        }
        summary.messages = issues;
        summary
    }
}

/// Severity, then location: offset-only issues first, pointers token by token
fn compare_issues(a: &Issue, b: &Issue) -> Ordering {
    a.severity.cmp(&b.severity).then_with(|| match (&a.pointer, &b.pointer) {
        (None, None) => a.offset.cmp(&b.offset),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_pointers(x, y),
    })
}

/// Array indices compare numerically so `/nodes/2` sorts before `/nodes/10`
fn compare_pointers(a: &str, b: &str) -> Ordering {
    let mut left = a.split('/');
    let mut right = b.split('/');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let order = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(m), Ok(n)) => m.cmp(&n),
                    _ => x.cmp(y),
                };
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
    pub resources: Vec<ResourceRecord>,
    pub animation_count: usize,
    pub material_count: usize,
    pub has_morph_targets: bool,
    pub has_skins: bool,
    pub has_textures: bool,
    pub has_default_scene: bool,
    pub draw_call_count: usize,
    pub total_vertex_count: u64,
    pub total_triangle_count: u64,
    #[serde(rename = "maxUVs")]
    pub max_uvs: usize,
    pub max_influences: usize,
    pub max_attributes: usize,
}

impl AssetInfo {
    pub fn collect(doc: &Document, resources: &Resources) -> Self {
        let asset = doc.asset.as_ref();
        let primitives = || doc.meshes.iter().flat_map(|mesh| &mesh.primitives);

        let mut info = Self {
            version: asset.and_then(|a| a.version_text.clone()),
            min_version: asset.and_then(|a| a.min_version_text.clone()),
            generator: asset.and_then(|a| a.generator.clone()),
            extensions_used: doc.extensions_used.clone(),
            extensions_required: doc.extensions_required.clone(),
            resources: resources.records.clone(),
            animation_count: doc.animations.len(),
            material_count: doc.materials.len(),
            has_morph_targets: primitives().any(|p| !p.targets.is_empty()),
            has_skins: !doc.skins.is_empty(),
            has_textures: !doc.textures.is_empty(),
            has_default_scene: doc.scene.is_some(),
            max_uvs: primitives().map(|p| p.set_count("TEXCOORD")).max().unwrap_or(0),
            max_influences: primitives().map(|p| 4 * p.set_count("JOINTS")).max().unwrap_or(0),
            max_attributes: primitives().map(|p| p.attributes.len()).max().unwrap_or(0),
            ..Default::default()
        };
        info.count_draws(doc);
        info
    }

    /// Walk every scene's node instances, guarding against cycles
    fn count_draws(&mut self, doc: &Document) {
        let node_count = doc.nodes.len();
        for scene in &doc.scenes {
            let mut visited = vec![false; node_count];
            let mut pending: Vec<usize> = scene.nodes.iter().filter_map(|n| n.get(node_count)).collect();
            while let Some(n) = pending.pop() {
                if std::mem::replace(&mut visited[n], true) {
                    continue;
                }
                let node = &doc.nodes[n];
                pending.extend(node.children.iter().filter_map(|c| c.get(node_count)));

                let Some(mesh) = node.mesh.and_then(|m| doc.meshes.get(m.get(doc.meshes.len())?)) else {
                    continue;
                };
                for primitive in &mesh.primitives {
                    self.draw_call_count += 1;
                    let vertices = accessor_count(doc, primitive.attribute("POSITION"));
                    self.total_vertex_count += vertices.unwrap_or(0);
                    let rendered = match primitive.indices {
                        Some(indices) => accessor_count(doc, Some(indices)),
                        None => vertices,
                    };
                    self.total_triangle_count += primitive.mode.triangle_count(rendered.unwrap_or(0));
                }
            }
        }
    }
}

fn accessor_count(doc: &Document, index: Option<crate::reader::Index>) -> Option<u64> {
    let accessor = doc.accessors.get(index?.get(doc.accessors.len())?)?;
    accessor.count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{IssueCode, IssueSink, SeverityOverrides};
    use crate::reader::ReadContext;
    use serde_json::json;

    fn issue(code: IssueCode, pointer: Option<&str>, offset: Option<usize>) -> Issue {
        Issue {
            code,
            message: String::new(),
            severity: code.default_severity(),
            pointer: pointer.map(str::to_string),
            offset,
        }
    }

    #[test]
    fn test_pointer_order_is_numeric() {
        assert_eq!(compare_pointers("/nodes/2", "/nodes/10"), Ordering::Less);
        assert_eq!(compare_pointers("/nodes/2", "/nodes/2/children"), Ordering::Less);
        assert_eq!(compare_pointers("/meshes/0", "/accessors/5"), Ordering::Greater);
    }

    #[test]
    fn test_ordering_and_truncation() {
        let issues = vec![
            issue(IssueCode::UnusedObject, Some("/nodes/1"), None),
            issue(IssueCode::NodeLoop, Some("/nodes/10"), None),
            issue(IssueCode::NodeLoop, Some("/nodes/2"), None),
            issue(IssueCode::GlbExtraData, None, Some(40)),
            issue(IssueCode::InvalidJson, None, Some(20)),
        ];
        let options = ValidationOptions {
            max_issues: 3,
            ..Default::default()
        };
        let summary = IssueSummary::collect(issues, &options);
        assert_eq!(summary.num_errors, 3);
        assert_eq!(summary.num_warnings, 1);
        assert_eq!(summary.num_infos, 1);
        assert!(summary.truncated);
        let order: Vec<_> = summary
            .messages
            .iter()
            .map(|i| (i.code.as_str(), i.pointer.clone(), i.offset))
            .collect();
        assert_eq!(
            order,
            vec![
                ("INVALID_JSON", None, Some(20)),
                ("NODE_LOOP", Some("/nodes/2".to_string()), None),
                ("NODE_LOOP", Some("/nodes/10".to_string()), None),
            ]
        );
    }

    #[test]
    fn test_filters_apply_before_counting() {
        let issues = vec![
            issue(IssueCode::UnusedObject, Some("/nodes/1"), None),
            issue(IssueCode::NodeLoop, Some("/nodes/2"), None),
        ];
        let options = ValidationOptions {
            ignored_issues: vec!["UNUSED_OBJECT".to_string()],
            ..Default::default()
        };
        let summary = IssueSummary::collect(issues, &options);
        assert_eq!(summary.num_infos, 0);
        assert_eq!(summary.messages.len(), 1);
        assert!(!summary.truncated);
    }

    #[test]
    fn test_draw_statistics() {
        let value = json!({
            "asset": { "version": "2.0", "generator": "test" },
            "scene": 0,
            "scenes": [{ "nodes": [0, 2] }],
            "nodes": [{ "mesh": 0, "children": [1] }, { "mesh": 0 }, { "mesh": 1 }],
            "meshes": [
                { "primitives": [{ "attributes": { "POSITION": 0, "TEXCOORD_0": 0, "TEXCOORD_1": 0 }, "indices": 1 }] },
                { "primitives": [{ "attributes": { "POSITION": 0 }, "mode": 5 }] }
            ],
            "accessors": [
                { "componentType": 5126, "count": 4, "type": "VEC3" },
                { "componentType": 5123, "count": 6, "type": "SCALAR" }
            ]
        });
        let overrides = SeverityOverrides::new();
        let mut cx = ReadContext::new(IssueSink::new(&overrides));
        let doc = Document::read(&value, &mut cx);
        let info = AssetInfo::collect(&doc, &Resources::unresolved(&doc));

        assert_eq!(info.generator.as_deref(), Some("test"));
        assert!(info.has_default_scene);
        assert_eq!(info.draw_call_count, 3);
        assert_eq!(info.total_vertex_count, 12);
        // Two indexed triangle lists of 6 indices, one strip of 4 vertices
        assert_eq!(info.total_triangle_count, 2 + 2 + 2);
        assert_eq!(info.max_uvs, 2);
        assert_eq!(info.max_attributes, 3);
        assert_eq!(info.max_influences, 0);
    }

    #[test]
    fn test_cyclic_scene_terminates() {
        let value = json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "children": [1], "mesh": 0 }, { "children": [0] }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
            "accessors": [{ "componentType": 5126, "count": 3, "type": "VEC3" }]
        });
        let overrides = SeverityOverrides::new();
        let mut cx = ReadContext::new(IssueSink::new(&overrides));
        let doc = Document::read(&value, &mut cx);
        let info = AssetInfo::collect(&doc, &Resources::unresolved(&doc));
        assert_eq!(info.draw_call_count, 1);
        assert_eq!(info.total_triangle_count, 1);
    }
}
