//! Scenes

use super::{Context, resolve};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{Index, ObjectReader};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<Index>,
}

impl Scene {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        Self {
            nodes: r.index_array("nodes", true).unwrap_or_default(),
        }
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        for (k, &node) in self.nodes.iter().enumerate() {
            let pointer = format!("/scenes/{index}/nodes/{k}");
            if let Some(n) = resolve(sink, node, cx.doc.nodes.len(), pointer.clone()) {
                if cx.graph.parent(n).is_some() {
                    sink.add(
                        IssueCode::SceneNonRootNode,
                        pointer,
                        format!("Node {n} is not a root node."),
                    );
                }
            }
        }
    }
}
