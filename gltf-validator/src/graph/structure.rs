//! Node hierarchy checks: loops and skin roots

use super::UsageGraph;
use crate::document::Document;
use crate::issue::{IssueCode, IssueSink};
use hashbrown::HashSet;

const UNVISITED: usize = usize::MAX;

/// Strongly connected components of a directed graph (Tarjan, iterative)
///
/// Components come out in reverse topological order. Single vertices without
/// a self-edge form their own trivial component.
pub fn strongly_connected(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = edges.len();
    let mut index = vec![UNVISITED; n];
    let mut low = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut components = Vec::new();
    let mut counter = 0;

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = counter;
        low[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;

        // (vertex, next edge to explore)
        let mut work = vec![(root, 0usize)];
        while let Some(&(v, next)) = work.last() {
            if let Some(&w) = edges[v].get(next) {
                if let Some(frame) = work.last_mut() {
                    frame.1 += 1;
                }
                if index[w] == UNVISITED {
                    index[w] = counter;
                    low[w] = counter;
                    counter += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    work.push((w, 0));
                } else if on_stack[w] {
                    low[v] = low[v].min(index[w]);
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                low[parent] = low[parent].min(low[v]);
            }
            if low[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }
    components
}

pub(super) fn check_loops(graph: &UsageGraph, sink: &mut IssueSink<'_>) {
    let mut in_loop = vec![false; graph.children.len()];
    for component in strongly_connected(&graph.children) {
        let cyclic = component.len() > 1 || component.first().is_some_and(|&v| graph.children[v].contains(&v));
        if cyclic {
            for v in component {
                in_loop[v] = true;
            }
        }
    }
    for (i, _) in in_loop.iter().enumerate().filter(|(_, looped)| **looped) {
        sink.add(IssueCode::NodeLoop, format!("/nodes/{i}"), "Node is a part of a node loop.");
    }
}

/// The node itself and every node above it, following all parent edges
fn ancestors_or_self(graph: &UsageGraph, node: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut pending = vec![node];
    while let Some(n) = pending.pop() {
        if seen.insert(n) {
            pending.extend_from_slice(graph.parents(n));
        }
    }
    seen
}

pub(super) fn check_skins(graph: &UsageGraph, doc: &Document, sink: &mut IssueSink<'_>) {
    let node_count = doc.nodes.len();
    for (s, skin) in doc.skins.iter().enumerate() {
        let mut joints: Vec<usize> = skin.joints.iter().filter_map(|j| j.get(node_count)).collect();
        joints.sort_unstable();
        joints.dedup();
        if joints.is_empty() {
            continue;
        }

        let ancestry: Vec<HashSet<usize>> = joints.iter().map(|&j| ancestors_or_self(graph, j)).collect();
        let mut common = ancestry[0].clone();
        for set in &ancestry[1..] {
            common.retain(|n| set.contains(n));
        }
        if common.is_empty() {
            sink.add(
                IssueCode::SkinNoCommonRoot,
                format!("/skins/{s}/joints"),
                "Joints do not have a common root.",
            );
            continue;
        }

        let Some(skeleton) = skin.skeleton.and_then(|n| n.get(node_count)) else {
            continue;
        };
        let is_root = ancestry.iter().all(|set| set.contains(&skeleton));
        if !is_root && !joints.contains(&skeleton) {
            sink.add(
                IssueCode::SkinSkeletonInvalid,
                format!("/skins/{s}/skeleton"),
                "Skeleton node is not a common root.",
            );
        }
    }
}
