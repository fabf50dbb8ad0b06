//! Animations: channels, samplers and keyframe accessors

use super::accessor::{AccessorType::*, ComponentType::*, Format, format_list};
use super::{Context, resolve};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{Index, ObjectKind, ObjectReader};
use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
    Weights,
}

impl TargetPath {
    pub const NAMES: [&'static str; 4] = ["translation", "rotation", "scale", "weights"];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "translation" => Some(TargetPath::Translation),
            "rotation" => Some(TargetPath::Rotation),
            "scale" => Some(TargetPath::Scale),
            "weights" => Some(TargetPath::Weights),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TargetPath::Translation => "translation",
            TargetPath::Rotation => "rotation",
            TargetPath::Scale => "scale",
            TargetPath::Weights => "weights",
        }
    }

    /// Output accessor formats allowed for this path
    pub fn output_formats(self, quantized: bool) -> Vec<Format> {
        let f = Format::new;
        match self {
            TargetPath::Translation | TargetPath::Scale => {
                let mut formats = vec![f(Vec3, Float, false)];
                if quantized {
                    for component in [Byte, UnsignedByte, Short, UnsignedShort] {
                        formats.push(f(Vec3, component, false));
                        formats.push(f(Vec3, component, true));
                    }
                }
                formats
            }
            TargetPath::Rotation => vec![
                f(Vec4, Float, false),
                f(Vec4, Byte, true),
                f(Vec4, UnsignedByte, true),
                f(Vec4, Short, true),
                f(Vec4, UnsignedShort, true),
            ],
            TargetPath::Weights => vec![
                f(Scalar, Float, false),
                f(Scalar, Byte, true),
                f(Scalar, UnsignedByte, true),
                f(Scalar, Short, true),
                f(Scalar, UnsignedShort, true),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    CubicSpline,
}

impl Interpolation {
    pub fn name(self) -> &'static str {
        match self {
            Interpolation::Linear => "LINEAR",
            Interpolation::Step => "STEP",
            Interpolation::CubicSpline => "CUBICSPLINE",
        }
    }

    /// Output elements stored per keyframe
    pub fn elements_per_keyframe(self) -> u64 {
        if self == Interpolation::CubicSpline { 3 } else { 1 }
    }

    fn min_keyframes(self) -> u64 {
        if self == Interpolation::Step { 1 } else { 2 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationChannel {
    pub sampler: Option<Index>,
    pub node: Option<Index>,
    pub path: Option<TargetPath>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationSampler {
    pub input: Option<Index>,
    pub interpolation: Interpolation,
    pub output: Option<Index>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    pub channels: Vec<AnimationChannel>,
    pub samplers: Vec<AnimationSampler>,
}

impl Animation {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        if !r.has("channels") {
            r.required_array("channels", true);
        }
        let channels = r
            .child_array("channels", ObjectKind::AnimationChannel, true, |_, c| {
                let sampler = c.required_index("sampler");
                let target = c.required_child("target", ObjectKind::AnimationChannelTarget, |t| {
                    let node = t.index("node");
                    let path = t
                        .required_enum_string("path", &TargetPath::NAMES)
                        .and_then(TargetPath::from_name);
                    (node, path)
                });
                let (node, path) = target.unwrap_or_default();
                AnimationChannel { sampler, node, path }
            })
            .unwrap_or_default();

        if !r.has("samplers") {
            r.required_array("samplers", true);
        }
        let samplers = r
            .child_array("samplers", ObjectKind::AnimationSampler, true, |_, s| AnimationSampler {
                input: s.required_index("input"),
                interpolation: match s.enum_string("interpolation", &["LINEAR", "STEP", "CUBICSPLINE"]) {
                    Some("STEP") => Interpolation::Step,
                    Some("CUBICSPLINE") => Interpolation::CubicSpline,
                    _ => Interpolation::Linear,
                },
                output: s.required_index("output"),
            })
            .unwrap_or_default();

        Self { channels, samplers }
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let doc = cx.doc;
        let pointer = format!("/animations/{index}");

        for (s, sampler) in self.samplers.iter().enumerate() {
            self.validate_sampler(&format!("{pointer}/samplers/{s}"), sampler, cx, sink);
        }

        let mut targets = HashMap::new();
        for (c, channel) in self.channels.iter().enumerate() {
            let channel_pointer = format!("{pointer}/channels/{c}");
            let sampler = channel.sampler.and_then(|sampler| {
                resolve(sink, sampler, self.samplers.len(), format!("{channel_pointer}/sampler"))
            });
            let node = channel.node.and_then(|node| {
                resolve(sink, node, doc.nodes.len(), format!("{channel_pointer}/target/node"))
            });
            let (Some(n), Some(path)) = (node, channel.path) else {
                continue;
            };
            let path_pointer = format!("{channel_pointer}/target/path");

            if let Some(first) = targets.insert((n, path), c) {
                sink.add(
                    IssueCode::AnimationDuplicateTargets,
                    channel_pointer.clone(),
                    format!("Animation channel has the same target as channel {first}."),
                );
            }

            let target_node = &doc.nodes[n];
            let morph_targets = target_node
                .mesh
                .and_then(|m| m.get(doc.meshes.len()))
                .map_or(0, |m| doc.meshes[m].target_count());
            if path == TargetPath::Weights {
                if morph_targets == 0 {
                    sink.add(
                        IssueCode::AnimationChannelTargetNodeWeightsNoMorphs,
                        path_pointer.clone(),
                        "Animation channel cannot target WEIGHTS when mesh does not have morph targets.",
                    );
                }
            } else if target_node.matrix.is_some() {
                sink.add(
                    IssueCode::AnimationChannelTargetNodeMatrix,
                    path_pointer.clone(),
                    "Animation channel cannot target TRS properties of a node with defined matrix.",
                );
            }

            let Some(s) = sampler else {
                continue;
            };
            self.validate_output(
                &format!("{pointer}/samplers/{s}"),
                &self.samplers[s],
                path,
                morph_targets as u64,
                cx,
                sink,
            );
        }
    }

    fn validate_sampler(
        &self,
        pointer: &str,
        sampler: &AnimationSampler,
        cx: &Context<'_>,
        sink: &mut IssueSink<'_>,
    ) {
        let doc = cx.doc;
        let input_pointer = format!("{pointer}/input");
        if let Some(a) = sampler
            .input
            .and_then(|input| resolve(sink, input, doc.accessors.len(), input_pointer.clone()))
        {
            let accessor = &doc.accessors[a];
            let expected = Format::new(Scalar, Float, false);
            if let Some(format) = accessor.format() {
                if format != expected {
                    sink.add(
                        IssueCode::AnimationSamplerInputAccessorInvalidFormat,
                        input_pointer.clone(),
                        format!("Invalid Animation sampler input accessor format '{format}'. Must be one of ('{expected}')."),
                    );
                }
            }
            if !accessor.has_bounds() {
                sink.add(
                    IssueCode::AnimationSamplerInputAccessorWithoutBounds,
                    input_pointer.clone(),
                    "accessor.min and accessor.max must be defined for animation input accessor.",
                );
            }
            let min_keyframes = sampler.interpolation.min_keyframes();
            if let Some(count) = accessor.count.filter(|&count| count < min_keyframes) {
                sink.add(
                    IssueCode::AnimationSamplerInputAccessorTooFewElements,
                    input_pointer.clone(),
                    format!(
                        "Animation sampler input accessor with '{}' interpolation must have at least {min_keyframes} elements. Got {count}.",
                        sampler.interpolation.name()
                    ),
                );
            }
            check_stride(cx, a, input_pointer, sink);
        }

        let output_pointer = format!("{pointer}/output");
        if let Some(a) = sampler
            .output
            .and_then(|output| resolve(sink, output, doc.accessors.len(), output_pointer.clone()))
        {
            check_stride(cx, a, output_pointer, sink);
        }
    }

    /// Output format and count, which depend on the channel using the sampler
    fn validate_output(
        &self,
        pointer: &str,
        sampler: &AnimationSampler,
        path: TargetPath,
        morph_targets: u64,
        cx: &Context<'_>,
        sink: &mut IssueSink<'_>,
    ) {
        let doc = cx.doc;
        let Some(output) = sampler.output.and_then(|o| o.get(doc.accessors.len())) else {
            return;
        };
        let output_pointer = format!("{pointer}/output");
        let accessor = &doc.accessors[output];

        let allowed = path.output_formats(cx.quantized);
        if let Some(format) = accessor.format() {
            if !allowed.contains(&format) {
                sink.add(
                    IssueCode::AnimationSamplerOutputAccessorInvalidFormat,
                    output_pointer.clone(),
                    format!(
                        "Invalid animation sampler output accessor format '{format}' for path '{}'. Must be one of ({}).",
                        path.name(),
                        format_list(&allowed)
                    ),
                );
            }
        }

        let input_count = sampler
            .input
            .and_then(|i| i.get(doc.accessors.len()))
            .and_then(|i| doc.accessors[i].count);
        if let (Some(input_count), Some(output_count)) = (input_count, accessor.count) {
            let per_keyframe = if path == TargetPath::Weights { morph_targets.max(1) } else { 1 };
            let expected = input_count * sampler.interpolation.elements_per_keyframe() * per_keyframe;
            if output_count != expected {
                sink.add(
                    IssueCode::AnimationSamplerOutputAccessorInvalidCount,
                    output_pointer,
                    format!("Animation sampler output accessor of count {expected} expected. Found {output_count}."),
                );
            }
        }
    }
}

fn check_stride(cx: &Context<'_>, accessor: usize, pointer: String, sink: &mut IssueSink<'_>) {
    let doc = cx.doc;
    let strided = doc.accessors[accessor]
        .buffer_view
        .and_then(|v| v.get(doc.buffer_views.len()))
        .is_some_and(|v| doc.buffer_views[v].byte_stride.is_some());
    if strided {
        sink.add(
            IssueCode::AnimationSamplerAccessorWithByteStride,
            pointer,
            "bufferView.byteStride must not be defined for buffer views used by animation sampler accessors.",
        );
    }
}
