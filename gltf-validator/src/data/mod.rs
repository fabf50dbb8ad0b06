//! Accessor data validation
//!
//! Decodes every accessor whose bytes are available and checks the values
//! against declared bounds and against the rules implied by how the
//! accessor is used. Accessors are decoded and checked in parallel; skin
//! checks that span several accessors of a primitive run afterwards.
//!
//! Each problem is reported once per accessor and code, with the first
//! offending element in the message and the total number appended.

mod decode;

pub use decode::{Decoded, read_component};

use crate::entities::{ComponentType, Context, Interpolation, Primitive, PrimitiveMode, Semantic, TargetPath};
use crate::graph::AccessorUse;
use crate::issue::{IssueCode, IssueSink};
use rayon::prelude::*;

/// Quaternion length tolerance for float rotations
const ROTATION_TOLERANCE: f64 = 0.01;
/// Vector length tolerance for float normals and tangents
const UNIT_TOLERANCE: f64 = 1e-4;
const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;
/// Weights below this are treated as zero
const ZERO_WEIGHT: f64 = 1e-6;

// =============================================================================
// Tally
// =============================================================================

/// One pending issue: the first occurrence's message and how many followed
#[derive(Debug, Clone)]
pub struct Tally {
    code: IssueCode,
    pointer: String,
    message: String,
    count: usize,
}

impl Tally {
    pub fn record(tallies: &mut Vec<Tally>, code: IssueCode, pointer: &str, message: impl FnOnce() -> String) {
        match tallies.iter_mut().find(|t| t.code == code && t.pointer == pointer) {
            Some(tally) => tally.count += 1,
            None => tallies.push(Tally {
                code,
                pointer: pointer.to_string(),
                message: message(),
                count: 1,
            }),
        }
    }

    fn flush(tallies: Vec<Tally>, sink: &mut IssueSink<'_>) {
        for tally in tallies {
            let message = if tally.count > 1 {
                format!("{} ({} occurrences in total.)", tally.message, tally.count)
            } else {
                tally.message
            };
            sink.add(tally.code, tally.pointer, message);
        }
    }
}

// =============================================================================
// Entry point
// =============================================================================

pub fn validate(cx: &Context<'_>, sink: &mut IssueSink<'_>) {
    let doc = cx.doc;
    let results: Vec<(Option<Decoded>, Vec<Tally>)> = doc
        .accessors
        .par_iter()
        .enumerate()
        .map(|(i, accessor)| {
            let mut tallies = Vec::new();
            let decoded = decode::decode(doc, cx.resources, i, accessor, &mut tallies);
            if let Some(data) = &decoded {
                check_accessor(cx, i, data, &mut tallies);
            }
            (decoded, tallies)
        })
        .collect();

    let mut decoded = Vec::with_capacity(results.len());
    for (data, tallies) in results {
        Tally::flush(tallies, sink);
        decoded.push(data);
    }
    tracing::debug!(
        "Decoded {} of {} accessors",
        decoded.iter().filter(|d| d.is_some()).count(),
        decoded.len()
    );

    let mut tallies = Vec::new();
    for mesh in &doc.meshes {
        for primitive in &mesh.primitives {
            check_skinning(cx, primitive, &decoded, &mut tallies);
        }
    }
    Tally::flush(tallies, sink);
}

// =============================================================================
// Per-accessor checks
// =============================================================================

/// Use-dependent checks collected over every reference to one accessor
#[derive(Debug, Default)]
struct Checks {
    /// Smallest vertex count among primitives indexing with this accessor
    vertex_count: Option<usize>,
    triangles: Option<PrimitiveMode>,
    normal: bool,
    tangent: bool,
    /// Smallest joint count among skins applied to meshes using these joints
    joint_limit: Option<usize>,
    weights: bool,
    inverse_bind_matrices: bool,
    animation_input: bool,
    /// Rotation output; `true` for cubic spline layout
    rotation: Option<bool>,
}

fn vertex_count(cx: &Context<'_>, primitive: &Primitive) -> Option<usize> {
    let (_, index) = primitive
        .attributes
        .iter()
        .find(|(name, _)| name == "POSITION")
        .or_else(|| primitive.attributes.first())?;
    let accessor = cx.doc.accessors.get(index.get(cx.doc.accessors.len())?)?;
    usize::try_from(accessor.count?).ok()
}

fn min_some(current: Option<usize>, value: usize) -> Option<usize> {
    Some(current.map_or(value, |c| c.min(value)))
}

fn gather_checks(cx: &Context<'_>, uses: &[AccessorUse]) -> Checks {
    let doc = cx.doc;
    let mut checks = Checks::default();
    for usage in uses {
        match usage {
            AccessorUse::Indices { mesh, primitive } => {
                let primitive = &doc.meshes[*mesh].primitives[*primitive];
                if let Some(count) = vertex_count(cx, primitive) {
                    checks.vertex_count = min_some(checks.vertex_count, count);
                }
                if primitive.mode.is_triangles() {
                    checks.triangles.get_or_insert(primitive.mode);
                }
            }
            AccessorUse::Attribute { mesh, semantic, .. } => match semantic {
                Semantic::Normal => checks.normal = true,
                Semantic::Tangent => checks.tangent = true,
                Semantic::Weights(_) => checks.weights = true,
                Semantic::Joints(_) => {
                    for &skin in &cx.graph.mesh_skins[*mesh] {
                        checks.joint_limit = min_some(checks.joint_limit, doc.skins[skin].joints.len());
                    }
                }
                _ => {}
            },
            AccessorUse::InverseBindMatrices { .. } => checks.inverse_bind_matrices = true,
            AccessorUse::AnimationInput { .. } => checks.animation_input = true,
            AccessorUse::AnimationOutput {
                path: TargetPath::Rotation,
                interpolation,
                ..
            } => {
                checks.rotation = Some(*interpolation == Interpolation::CubicSpline);
            }
            AccessorUse::AnimationOutput { .. } | AccessorUse::MorphTarget { .. } => {}
        }
    }
    checks
}

fn check_accessor(cx: &Context<'_>, i: usize, data: &Decoded, tallies: &mut Vec<Tally>) {
    let accessor = &cx.doc.accessors[i];
    let pointer = format!("/accessors/{i}");
    let float = data.layout.component_type == ComponentType::Float;

    if float {
        let components = data.components();
        for (k, value) in data.values.iter().enumerate().filter(|(_, v)| !v.is_finite()) {
            Tally::record(tallies, IssueCode::AccessorInvalidFloat, &pointer, || {
                format!("Invalid float value {value} at index {}.", data.position(k / components))
            });
        }
    }
    check_bounds(i, accessor.min.as_deref(), accessor.max.as_deref(), data, tallies);

    let checks = gather_checks(cx, &cx.graph.accessor_uses[i]);
    let normalized = accessor.normalized;

    if let Some(vertex_count) = checks.vertex_count {
        check_indices(&pointer, data, vertex_count, checks.triangles, tallies);
    }

    let unit_tolerance = if float { UNIT_TOLERANCE } else { quantized_tolerance(data.layout.component_type) };
    if (checks.normal || checks.tangent) && (float || normalized) {
        for (e, element) in data.indexed() {
            let xyz: Vec<f64> = element.iter().take(3).map(|&v| data.normalized(v, normalized)).collect();
            let length = xyz.iter().map(|v| v * v).sum::<f64>().sqrt();
            if (length - 1.0).abs() > unit_tolerance {
                Tally::record(tallies, IssueCode::AccessorNonUnit, &pointer, || {
                    format!("Accessor element at index {e} is not of unit length: {length}.")
                });
            }
            if checks.tangent {
                if let Some(&w) = element.get(3) {
                    let w = data.normalized(w, normalized);
                    if (w.abs() - 1.0).abs() > unit_tolerance {
                        Tally::record(tallies, IssueCode::AccessorInvalidSign, &pointer, || {
                            format!("Accessor element at index {e} has invalid w component: {w}. Must be 1.0 or -1.0.")
                        });
                    }
                }
            }
        }
    }

    if let Some(limit) = checks.joint_limit {
        for (e, element) in data.indexed() {
            for &joint in element.iter().filter(|&&j| j >= limit as f64) {
                Tally::record(tallies, IssueCode::AccessorJointsIndexOob, &pointer, || {
                    format!("Joints accessor element at index {e} references non-existing joint: {joint} (skin has {limit} joints).")
                });
            }
        }
    }

    if checks.weights {
        for (e, element) in data.indexed() {
            if let Some(&weight) = element.iter().find(|&&w| w < 0.0) {
                Tally::record(tallies, IssueCode::AccessorWeightsNegative, &pointer, || {
                    format!("Weights accessor element at index {e} has negative value: {weight}.")
                });
            }
        }
    }

    if checks.inverse_bind_matrices && data.components() == 16 {
        for (e, m) in data.indexed() {
            if m[3] != 0.0 || m[7] != 0.0 || m[11] != 0.0 || m[15] != 1.0 {
                Tally::record(tallies, IssueCode::AccessorInvalidIbm, &pointer, || {
                    format!("Matrix element at index {e} is not decomposable to TRS.")
                });
            }
        }
    }

    if checks.animation_input {
        let mut previous: Option<f64> = None;
        for (e, &t) in data.indexed().flat_map(|(e, element)| element.iter().map(move |t| (e, t))) {
            if t < 0.0 {
                Tally::record(tallies, IssueCode::AccessorAnimationInputNegative, &pointer, || {
                    format!("Animation input accessor element at index {e} is negative: {t}.")
                });
            }
            if let Some(p) = previous.filter(|&p| t <= p) {
                Tally::record(tallies, IssueCode::AccessorAnimationInputNonIncreasing, &pointer, || {
                    format!("Animation input accessor element at index {e} is less than or equal to previous: {t} <= {p}.")
                });
            }
            previous = Some(t);
        }
    }

    if let Some(cubic) = checks.rotation {
        let tolerance = if float {
            ROTATION_TOLERANCE
        } else {
            ROTATION_TOLERANCE.max(quantized_tolerance(data.layout.component_type))
        };
        // Cubic spline outputs store (in-tangent, value, out-tangent) triples
        let values = data.indexed().filter(|(e, _)| !cubic || e % 3 == 1);
        for (e, q) in values {
            let length = q
                .iter()
                .map(|&v| data.normalized(v, normalized).powi(2))
                .sum::<f64>()
                .sqrt();
            if (length - 1.0).abs() > tolerance {
                Tally::record(tallies, IssueCode::AccessorNonUnit, &pointer, || {
                    format!("Accessor element at index {e} is not of unit length: {length}.")
                });
            }
        }
    }
}

/// Length tolerance for unit vectors stored as normalized integers
fn quantized_tolerance(component_type: ComponentType) -> f64 {
    let step = component_type.normalize(1.0);
    (4.0 * step).max(UNIT_TOLERANCE)
}

fn check_bounds(i: usize, min: Option<&[f64]>, max: Option<&[f64]>, data: &Decoded, tallies: &mut Vec<Tally>) {
    let components = data.components();
    let float = data.layout.component_type == ComponentType::Float;
    // Declared float bounds are single precision
    let declared = |d: f64| if float { f64::from(d as f32) } else { d };

    let mut actual_min = vec![f64::INFINITY; components];
    let mut actual_max = vec![f64::NEG_INFINITY; components];
    for element in data.elements() {
        for (c, &v) in element.iter().enumerate().filter(|(_, v)| v.is_finite()) {
            actual_min[c] = actual_min[c].min(v);
            actual_max[c] = actual_max[c].max(v);
        }
    }

    if let Some(min) = min.filter(|m| m.len() == components) {
        for (c, &d) in min.iter().enumerate() {
            let actual = actual_min[c];
            if !actual.is_finite() {
                continue;
            }
            let d = declared(d);
            let pointer = format!("/accessors/{i}/min/{c}");
            if d != actual {
                Tally::record(tallies, IssueCode::AccessorMinMismatch, &pointer, || {
                    format!("Declared minimum value for this component ({d}) does not match actual minimum ({actual}).")
                });
            }
            for (e, element) in data.indexed().filter(|(_, el)| el[c] < d) {
                Tally::record(tallies, IssueCode::AccessorElementOutOfMinBound, &pointer, || {
                    format!("Accessor element at index {e} is less than declared minimum value {d}: {}.", element[c])
                });
            }
        }
    }

    if let Some(max) = max.filter(|m| m.len() == components) {
        for (c, &d) in max.iter().enumerate() {
            let actual = actual_max[c];
            if !actual.is_finite() {
                continue;
            }
            let d = declared(d);
            let pointer = format!("/accessors/{i}/max/{c}");
            if d != actual {
                Tally::record(tallies, IssueCode::AccessorMaxMismatch, &pointer, || {
                    format!("Declared maximum value for this component ({d}) does not match actual maximum ({actual}).")
                });
            }
            for (e, element) in data.indexed().filter(|(_, el)| el[c] > d) {
                Tally::record(tallies, IssueCode::AccessorElementOutOfMaxBound, &pointer, || {
                    format!("Accessor element at index {e} is greater than declared maximum value {d}: {}.", element[c])
                });
            }
        }
    }
}

fn check_indices(
    pointer: &str,
    data: &Decoded,
    vertex_count: usize,
    triangles: Option<PrimitiveMode>,
    tallies: &mut Vec<Tally>,
) {
    let restart = data.layout.component_type.unsigned_max().map(|m| m as f64);
    for (e, &v) in data.indexed().flat_map(|(e, element)| element.iter().map(move |v| (e, v))) {
        if Some(v) == restart {
            Tally::record(tallies, IssueCode::AccessorIndexPrimitiveRestart, pointer, || {
                format!("Indices accessor contains primitive restart value ({v}) at index {e}.")
            });
        } else if v >= vertex_count as f64 {
            Tally::record(tallies, IssueCode::AccessorIndexOob, pointer, || {
                format!(
                    "Indices accessor element at index {e} has value {v} that is greater than the maximum vertex index available ({}).",
                    vertex_count.saturating_sub(1)
                )
            });
        }
    }

    // Triangles need every index in order
    let Some(mode) = triangles.filter(|_| data.is_complete()) else {
        return;
    };
    let values = &data.values;
    let total = mode.triangle_count(values.len() as u64) as usize;
    let degenerate = (0..total)
        .filter(|&t| {
            let [a, b, c] = match mode {
                PrimitiveMode::TriangleStrip => [values[t], values[t + 1], values[t + 2]],
                PrimitiveMode::TriangleFan => [values[0], values[t + 1], values[t + 2]],
                _ => [values[3 * t], values[3 * t + 1], values[3 * t + 2]],
            };
            a == b || b == c || a == c
        })
        .count();
    if degenerate > 0 {
        Tally::record(tallies, IssueCode::AccessorIndexTriangleDegenerate, pointer, || {
            format!("Indices accessor contains {degenerate} degenerate triangles (out of {total}).")
        });
    }
}

// =============================================================================
// Skinning checks across attribute sets
// =============================================================================

/// Decoded accessors for each set of an indexed semantic, ordered by set
fn attribute_sets<'a>(
    cx: &Context<'_>,
    primitive: &Primitive,
    decoded: &'a [Option<Decoded>],
    want: fn(&Semantic) -> Option<u32>,
) -> Vec<(usize, &'a Decoded)> {
    let mut sets: Vec<(u32, usize, &Decoded)> = primitive
        .attributes
        .iter()
        .filter_map(|(name, index)| {
            let set = want(&Semantic::parse(name)?)?;
            let a = index.get(cx.doc.accessors.len())?;
            Some((set, a, decoded[a].as_ref().filter(|d| d.is_complete())?))
        })
        .collect();
    sets.sort_by_key(|(set, _, _)| *set);
    sets.into_iter().map(|(_, a, data)| (a, data)).collect()
}

fn check_skinning(cx: &Context<'_>, primitive: &Primitive, decoded: &[Option<Decoded>], tallies: &mut Vec<Tally>) {
    let joints = attribute_sets(cx, primitive, decoded, |s| match s {
        Semantic::Joints(n) => Some(*n),
        _ => None,
    });
    let weights = attribute_sets(cx, primitive, decoded, |s| match s {
        Semantic::Weights(n) => Some(*n),
        _ => None,
    });
    if joints.is_empty() || joints.len() != weights.len() {
        return;
    }
    let count = joints.iter().chain(&weights).map(|(_, d)| d.count).min().unwrap_or(0);
    if joints.iter().chain(&weights).any(|(_, d)| d.components() != 4) {
        return;
    }

    let weight_pointer = format!("/accessors/{}", weights[0].0);
    let float = weights.iter().all(|(_, d)| d.layout.component_type == ComponentType::Float);
    let sum_tolerance = if float {
        WEIGHT_SUM_TOLERANCE
    } else {
        // Each normalized weight may be off by half a step
        weights
            .iter()
            .map(|(_, d)| 4.0 * d.layout.component_type.normalize(1.0))
            .sum::<f64>()
            .max(WEIGHT_SUM_TOLERANCE)
    };

    let mut seen = Vec::with_capacity(4 * joints.len());
    for v in 0..count {
        seen.clear();
        let mut sum = 0.0;
        for (set, ((ja, jdata), (wa, wdata))) in joints.iter().zip(&weights).enumerate() {
            let normalized = cx.doc.accessors[*wa].normalized;
            let pointer = format!("/accessors/{ja}");
            for (c, (&joint, &raw)) in jdata.element(v).iter().zip(wdata.element(v)).enumerate() {
                let weight = wdata.normalized(raw, normalized);
                sum += weight;
                if joint == 0.0 {
                    continue;
                }
                if weight < ZERO_WEIGHT {
                    Tally::record(tallies, IssueCode::AccessorJointsUsedZeroWeight, &pointer, || {
                        format!("Joints accessor element at index {v} (component index {c}) is used with zero weight but has non-zero value ({joint}).")
                    });
                }
                // The first set only seeds the joints later sets must avoid
                if !seen.contains(&joint) {
                    seen.push(joint);
                } else if set > 0 {
                    Tally::record(tallies, IssueCode::AccessorJointsIndexDuplicate, &pointer, || {
                        format!("Joints accessor element at index {v} (component index {c}) has already been used: {joint}.")
                    });
                }
            }
        }
        if (sum - 1.0).abs() > sum_tolerance {
            Tally::record(tallies, IssueCode::AccessorWeightsNonNormalized, &weight_pointer, || {
                format!("Weights accessor elements (at index {v}) have non-normalized sum: {sum}.")
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::fetch::Resources;
    use crate::graph::UsageGraph;
    use crate::issue::SeverityOverrides;
    use crate::reader::ReadContext;
    use serde_json::{Value, json};

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn run(value: Value, bin: Vec<u8>) -> Vec<(&'static str, String)> {
        let overrides = SeverityOverrides::new();
        let mut cx = ReadContext::new(IssueSink::new(&overrides));
        let doc = Document::read(&value, &mut cx);
        let graph = UsageGraph::build(&doc);
        let mut resources = Resources::unresolved(&doc);
        resources.buffers[0] = Some(bin);
        let context = Context {
            doc: &doc,
            graph: &graph,
            resources: &resources,
            quantized: false,
        };
        let mut sink = IssueSink::new(&overrides);
        validate(&context, &mut sink);
        sink.issues()
            .iter()
            .map(|i| (i.code.as_str(), i.pointer.clone().unwrap_or_default()))
            .collect()
    }

    fn scalar_doc(len: usize, min: f64, max: f64) -> Value {
        json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": len * 4 }],
            "bufferViews": [{ "buffer": 0, "byteLength": len * 4 }],
            "accessors": [{
                "bufferView": 0, "componentType": 5126, "count": len, "type": "SCALAR",
                "min": [min], "max": [max]
            }]
        })
    }

    #[test]
    fn test_exact_bounds() {
        let issues = run(scalar_doc(3, 0.1, 2.5), floats(&[0.1, 2.5, 1.0]));
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_loose_bounds() {
        let issues = run(scalar_doc(3, -1.0, 3.0), floats(&[0.0, 2.0, 1.0]));
        assert_eq!(
            issues,
            vec![
                ("ACCESSOR_MIN_MISMATCH", "/accessors/0/min/0".to_string()),
                ("ACCESSOR_MAX_MISMATCH", "/accessors/0/max/0".to_string()),
            ]
        );
    }

    #[test]
    fn test_elements_outside_bounds() {
        let issues = run(scalar_doc(3, 0.5, 1.0), floats(&[0.0, 2.0, 0.75]));
        let codes: Vec<&str> = issues.iter().map(|(c, _)| *c).collect();
        assert!(codes.contains(&"ACCESSOR_ELEMENT_OUT_OF_MIN_BOUND"));
        assert!(codes.contains(&"ACCESSOR_ELEMENT_OUT_OF_MAX_BOUND"));
    }

    fn zero_based_sparse(count: u64, max: f64) -> (Value, Vec<u8>) {
        let mut bin = vec![1u8, 5, 0, 0];
        bin.extend_from_slice(&floats(&[2.0, 3.0]));
        let value = json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": bin.len() }],
            "bufferViews": [
                { "buffer": 0, "byteLength": 2 },
                { "buffer": 0, "byteOffset": 4, "byteLength": 8 }
            ],
            "accessors": [{
                "componentType": 5126, "count": count, "type": "SCALAR",
                "min": [0.0], "max": [max],
                "sparse": {
                    "count": 2,
                    "indices": { "bufferView": 0, "componentType": 5121 },
                    "values": { "bufferView": 1 }
                }
            }]
        });
        (value, bin)
    }

    #[test]
    fn test_sparse_without_view_keeps_implicit_zero() {
        let (value, bin) = zero_based_sparse(1_000_000_000_000, 3.0);
        let issues = run(value, bin);
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_sparse_without_view_reports_bounds() {
        let (value, bin) = zero_based_sparse(4_000_000_000_000_000_000, 2.0);
        assert_eq!(
            run(value, bin),
            vec![
                ("ACCESSOR_MAX_MISMATCH", "/accessors/0/max/0".to_string()),
                ("ACCESSOR_ELEMENT_OUT_OF_MAX_BOUND", "/accessors/0/max/0".to_string()),
            ]
        );
    }

    #[test]
    fn test_huge_count_on_small_view_is_skipped() {
        let mut value = scalar_doc(1, 0.0, 0.0);
        value["accessors"][0]["count"] = json!(4_000_000_000_000_000_000u64);
        let issues = run(value, floats(&[0.0]));
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_invalid_float_reported_once() {
        let issues = run(scalar_doc(3, 0.0, 0.0), floats(&[f32::NAN, 0.0, f32::INFINITY]));
        assert_eq!(issues, vec![("ACCESSOR_INVALID_FLOAT", "/accessors/0".to_string())]);
    }

    #[test]
    fn test_animation_input_order() {
        let mut value = scalar_doc(3, -1.0, 1.0);
        value["animations"] = json!([{
            "channels": [],
            "samplers": [{ "input": 0, "output": 0 }]
        }]);
        let issues = run(value, floats(&[-1.0, 1.0, 1.0]));
        assert!(issues.contains(&("ACCESSOR_ANIMATION_INPUT_NEGATIVE", "/accessors/0".to_string())));
        assert!(issues.contains(&("ACCESSOR_ANIMATION_INPUT_NON_INCREASING", "/accessors/0".to_string())));
    }

    #[test]
    fn test_indices() {
        let mut bin = floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        for index in [0u16, 1, 1, 0, 7, 0xFFFF] {
            bin.extend_from_slice(&index.to_le_bytes());
        }
        let value = json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": bin.len() }],
            "bufferViews": [
                { "buffer": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 12 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0, 0, 0], "max": [1, 1, 0] },
                { "bufferView": 1, "componentType": 5123, "count": 6, "type": "SCALAR" }
            ],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }]
        });
        assert_eq!(
            run(value, bin),
            vec![
                ("ACCESSOR_INDEX_OOB", "/accessors/1".to_string()),
                ("ACCESSOR_INDEX_PRIMITIVE_RESTART", "/accessors/1".to_string()),
                ("ACCESSOR_INDEX_TRIANGLE_DEGENERATE", "/accessors/1".to_string()),
            ]
        );
    }

    #[test]
    fn test_inverse_bind_matrices() {
        let mut identity = [0.0f32; 16];
        for d in [0, 5, 10, 15] {
            identity[d] = 1.0;
        }
        let mut projective = identity;
        projective[3] = 0.5;
        let bin: Vec<u8> = floats(&identity).into_iter().chain(floats(&projective)).collect();
        let value = json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 128 }],
            "bufferViews": [{ "buffer": 0, "byteLength": 128 }],
            "accessors": [{ "bufferView": 0, "componentType": 5126, "count": 2, "type": "MAT4" }],
            "nodes": [{}],
            "skins": [{ "inverseBindMatrices": 0, "joints": [0] }]
        });
        assert_eq!(run(value, bin), vec![("ACCESSOR_INVALID_IBM", "/accessors/0".to_string())]);
    }

    #[test]
    fn test_cubic_rotation_checks_values_only() {
        // In/out tangents are not unit; only the middle element is checked
        let bin = floats(&[
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, //
            0.0, 0.0, 0.0, 0.0, //
            2.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 0.9, //
            2.0, 0.0, 0.0, 0.0,
        ]);
        let value = json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": bin.len() }],
            "bufferViews": [{ "buffer": 0, "byteLength": bin.len() }],
            "accessors": [{ "bufferView": 0, "componentType": 5126, "count": 6, "type": "VEC4" }],
            "nodes": [{}],
            "animations": [{
                "channels": [{ "sampler": 0, "target": { "node": 0, "path": "rotation" } }],
                "samplers": [{ "input": 0, "output": 0, "interpolation": "CUBICSPLINE" }]
            }]
        });
        let issues = run(value, bin);
        let non_unit: Vec<_> = issues.iter().filter(|(c, _)| *c == "ACCESSOR_NON_UNIT").collect();
        assert_eq!(non_unit.len(), 1);
    }

    #[test]
    fn test_skinning_sets() {
        let mut bin = Vec::new();
        // JOINTS_0: vertex 0 fine, vertex 1 repeats joint 1 and uses joint 2 with zero weight
        bin.extend_from_slice(&[1u8, 0, 0, 0, 1, 1, 2, 0]);
        bin.extend_from_slice(&floats(&[1.0, 0.0, 0.0, 0.0, 0.5, 0.25, 0.0, 0.0]));
        let value = json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": bin.len() }],
            "bufferViews": [
                { "buffer": 0, "byteLength": 8 },
                { "buffer": 0, "byteOffset": 8, "byteLength": 32 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5121, "count": 2, "type": "VEC4" },
                { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC4" }
            ],
            "meshes": [{ "primitives": [{ "attributes": { "JOINTS_0": 0, "WEIGHTS_0": 1 } }] }],
            "nodes": [{ "mesh": 0, "skin": 0 }, {}, {}],
            "skins": [{ "joints": [0, 1] }]
        });
        let issues = run(value, bin);
        for expected in [
            ("ACCESSOR_JOINTS_INDEX_OOB", "/accessors/0"),
            ("ACCESSOR_JOINTS_USED_ZERO_WEIGHT", "/accessors/0"),
            ("ACCESSOR_WEIGHTS_NON_NORMALIZED", "/accessors/1"),
        ] {
            assert!(
                issues.contains(&(expected.0, expected.1.to_string())),
                "missing {expected:?} in {issues:?}"
            );
        }
        // Repeats within the first set are not duplicates
        assert!(!issues.iter().any(|(code, _)| *code == "ACCESSOR_JOINTS_INDEX_DUPLICATE"));
    }

    #[test]
    fn test_joint_duplicates_across_sets() {
        let mut bin = Vec::new();
        // JOINTS_0 = [1, 2, 0, 0], JOINTS_1 = [2, 3, 0, 0]
        bin.extend_from_slice(&[1u8, 2, 0, 0]);
        bin.extend_from_slice(&[2u8, 3, 0, 0]);
        bin.extend_from_slice(&floats(&[0.25, 0.25, 0.0, 0.0]));
        bin.extend_from_slice(&floats(&[0.25, 0.25, 0.0, 0.0]));
        let value = json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": bin.len() }],
            "bufferViews": [
                { "buffer": 0, "byteLength": 4 },
                { "buffer": 0, "byteOffset": 4, "byteLength": 4 },
                { "buffer": 0, "byteOffset": 8, "byteLength": 16 },
                { "buffer": 0, "byteOffset": 24, "byteLength": 16 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5121, "count": 1, "type": "VEC4" },
                { "bufferView": 1, "componentType": 5121, "count": 1, "type": "VEC4" },
                { "bufferView": 2, "componentType": 5126, "count": 1, "type": "VEC4" },
                { "bufferView": 3, "componentType": 5126, "count": 1, "type": "VEC4" }
            ],
            "meshes": [{ "primitives": [{ "attributes": {
                "JOINTS_0": 0, "JOINTS_1": 1, "WEIGHTS_0": 2, "WEIGHTS_1": 3
            } }] }],
            "nodes": [{ "mesh": 0, "skin": 0 }, {}, {}, {}],
            "skins": [{ "joints": [0, 1, 2, 3] }]
        });
        assert_eq!(run(value, bin), vec![("ACCESSOR_JOINTS_INDEX_DUPLICATE", "/accessors/1".to_string())]);
    }
}
