//! Little-endian element decoding with sparse overlays

use super::Tally;
use crate::document::Document;
use crate::entities::{Accessor, ComponentType, ElementLayout};
use crate::fetch::Resources;
use crate::issue::IssueCode;
use std::collections::BTreeMap;

/// Every component of an accessor, after any sparse substitution
///
/// Integer components keep their raw values; floats are widened from f32.
/// Sparse accessors without a buffer view store only the replaced elements
/// plus one implicit zero element; `positions` maps them back.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub layout: ElementLayout,
    pub count: usize,
    pub values: Vec<f64>,
    /// Accessor element index of each stored element, `None` when all are stored
    pub positions: Option<Vec<usize>>,
}

impl Decoded {
    pub fn components(&self) -> usize {
        self.layout.accessor_type.components()
    }

    /// Whether every one of the `count` elements is stored in order
    pub fn is_complete(&self) -> bool {
        self.positions.is_none()
    }

    pub fn element(&self, e: usize) -> &[f64] {
        let n = self.components();
        &self.values[e * n..(e + 1) * n]
    }

    pub fn elements(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.components())
    }

    /// Accessor element index of the `k`-th stored element
    pub fn position(&self, k: usize) -> usize {
        self.positions.as_ref().and_then(|p| p.get(k).copied()).unwrap_or(k)
    }

    /// Stored elements paired with their accessor element index
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &[f64])> {
        self.elements().enumerate().map(|(k, element)| (self.position(k), element))
    }

    /// Component value as the shader sees it
    pub fn normalized(&self, value: f64, normalized: bool) -> f64 {
        if normalized {
            self.layout.component_type.normalize(value)
        } else {
            value
        }
    }
}

pub fn read_component(bytes: &[u8], component_type: ComponentType) -> Option<f64> {
    let value = match component_type {
        ComponentType::Byte => f64::from(i8::from_le_bytes([*bytes.first()?])),
        ComponentType::UnsignedByte => f64::from(*bytes.first()?),
        ComponentType::Short => f64::from(i16::from_le_bytes(bytes.get(..2)?.try_into().ok()?)),
        ComponentType::UnsignedShort => f64::from(u16::from_le_bytes(bytes.get(..2)?.try_into().ok()?)),
        ComponentType::UnsignedInt => f64::from(u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?)),
        ComponentType::Float => f64::from(f32::from_le_bytes(bytes.get(..4)?.try_into().ok()?)),
    };
    Some(value)
}

/// Read `count` elements starting at `offset`, `stride` bytes apart
///
/// Nothing is allocated unless `bytes` holds every element.
fn read_elements(bytes: &[u8], offset: usize, stride: usize, count: usize, layout: ElementLayout) -> Option<Vec<f64>> {
    let components = layout.accessor_type.components();
    let size = layout.component_type.size();
    if stride < layout.size() {
        return None;
    }
    if let Some(last) = count.checked_sub(1) {
        let end = offset.checked_add(last.checked_mul(stride)?)?.checked_add(layout.size())?;
        if end > bytes.len() {
            return None;
        }
    }

    let mut values = Vec::with_capacity(count.checked_mul(components)?);
    for e in 0..count {
        let base = offset + e * stride;
        for c in 0..components {
            let at = base + layout.component_offset(c);
            values.push(read_component(bytes.get(at..at + size)?, layout.component_type)?);
        }
    }
    Some(values)
}

/// Decode an accessor, or `None` when its bytes are not all available
///
/// Accessors without a buffer view are only decoded when a sparse overlay
/// replaces some of their zeros. Sparse index problems are tallied into
/// `tallies`.
pub fn decode(
    doc: &Document,
    resources: &Resources,
    index: usize,
    accessor: &Accessor,
    tallies: &mut Vec<Tally>,
) -> Option<Decoded> {
    let layout = accessor.layout()?;
    let count = usize::try_from(accessor.count?).ok()?;
    let components = layout.accessor_type.components();

    let base = match accessor.buffer_view {
        Some(view) => {
            let v = view.get(doc.buffer_views.len())?;
            let bytes = resources.view_bytes(doc, v)?;
            let stride = doc.buffer_views[v]
                .byte_stride
                .and_then(|s| usize::try_from(s).ok())
                .unwrap_or_else(|| layout.size());
            let offset = usize::try_from(accessor.byte_offset).ok()?;
            Some(read_elements(bytes, offset, stride, count, layout)?)
        }
        None => None,
    };

    let Some(sparse) = &accessor.sparse else {
        return base.map(|values| Decoded {
            layout,
            count,
            values,
            positions: None,
        });
    };

    let pointer = format!("/accessors/{index}/sparse");
    let sparse_count = usize::try_from(sparse.count?).ok()?;
    let indices = sparse.indices.as_ref()?;
    let index_type = indices.component_type?;
    let index_layout = ElementLayout {
        component_type: index_type,
        accessor_type: crate::entities::AccessorType::Scalar,
    };
    let index_bytes = resources.view_bytes(doc, indices.buffer_view?.get(doc.buffer_views.len())?)?;
    let targets = read_elements(
        index_bytes,
        usize::try_from(indices.byte_offset).ok()?,
        index_type.size(),
        sparse_count,
        index_layout,
    )?;

    let sparse_values = sparse.values.as_ref()?;
    let value_bytes = resources.view_bytes(doc, sparse_values.buffer_view?.get(doc.buffer_views.len())?)?;
    let replacements = read_elements(
        value_bytes,
        usize::try_from(sparse_values.byte_offset).ok()?,
        layout.size(),
        sparse_count,
        layout,
    )?;
    let replacement = |k: usize| &replacements[k * components..(k + 1) * components];

    // (element, sparse entry) for every in-range target
    let mut overlay = Vec::with_capacity(targets.len());
    let mut previous: Option<f64> = None;
    for (k, &target) in targets.iter().enumerate() {
        if previous.is_some_and(|p| target <= p) {
            Tally::record(
                tallies,
                IssueCode::AccessorSparseIndicesNonIncreasing,
                &pointer,
                || format!("Accessor sparse indices element at index {k} is less than or equal to previous: {target} <= {}.", previous.unwrap_or_default()),
            );
        }
        previous = Some(target);
        if target >= count as f64 {
            Tally::record(tallies, IssueCode::AccessorSparseIndexOob, &pointer, || {
                format!("Accessor sparse indices element at index {k} is greater than or equal to the number of accessor elements: {target} >= {count}.")
            });
            continue;
        }
        overlay.push((target as usize, k));
    }

    if let Some(mut values) = base {
        for (e, k) in overlay {
            values[e * components..(e + 1) * components].copy_from_slice(replacement(k));
        }
        return Some(Decoded {
            layout,
            count,
            values,
            positions: None,
        });
    }

    // Later entries win, as they would when overlaying in place
    let replaced: BTreeMap<usize, usize> = overlay.into_iter().collect();
    let zero = (0..count).find(|e| !replaced.contains_key(e));
    let mut stored: Vec<(usize, Option<usize>)> = replaced.into_iter().map(|(e, k)| (e, Some(k))).collect();
    if let Some(zero) = zero {
        let at = stored.partition_point(|(e, _)| *e < zero);
        stored.insert(at, (zero, None));
    }

    let mut values = Vec::with_capacity(stored.len() * components);
    for (_, k) in &stored {
        match k {
            Some(k) => values.extend_from_slice(replacement(*k)),
            None => values.extend(std::iter::repeat_n(0.0, components)),
        }
    }
    Some(Decoded {
        layout,
        count,
        values,
        positions: Some(stored.into_iter().map(|(e, _)| e).collect()),
    })
}
