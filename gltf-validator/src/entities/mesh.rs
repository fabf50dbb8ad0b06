//! Meshes, primitives and attribute semantics

use super::accessor::{AccessorType::*, ComponentType::*, Format, format_list};
use super::{Context, resolve};
use crate::issue::{IssueCode, IssueSink, join_pointer};
use crate::reader::{Index, ObjectKind, ObjectReader};
use hashbrown::HashMap;

// =============================================================================
// Semantics
// =============================================================================

/// Parsed attribute name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    TexCoord(u32),
    Color(u32),
    Joints(u32),
    Weights(u32),
    /// Application-specific, starts with `_`
    Custom(String),
}

/// Set number of an indexed semantic; leading zeros are not allowed
fn set_index(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

impl Semantic {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "POSITION" => return Some(Semantic::Position),
            "NORMAL" => return Some(Semantic::Normal),
            "TANGENT" => return Some(Semantic::Tangent),
            _ if name.starts_with('_') => return Some(Semantic::Custom(name.to_string())),
            _ => {}
        }
        if let Some(n) = set_index(name, "TEXCOORD_") {
            Some(Semantic::TexCoord(n))
        } else if let Some(n) = set_index(name, "COLOR_") {
            Some(Semantic::Color(n))
        } else if let Some(n) = set_index(name, "JOINTS_") {
            Some(Semantic::Joints(n))
        } else {
            set_index(name, "WEIGHTS_").map(Semantic::Weights)
        }
    }

    /// Family name and set number for indexed semantics
    fn family(&self) -> Option<(&'static str, u32)> {
        match self {
            Semantic::TexCoord(n) => Some(("TEXCOORD", *n)),
            Semantic::Color(n) => Some(("COLOR", *n)),
            Semantic::Joints(n) => Some(("JOINTS", *n)),
            Semantic::Weights(n) => Some(("WEIGHTS", *n)),
            _ => None,
        }
    }

    /// Accessor formats allowed for this semantic
    pub fn formats(&self, morph_target: bool, quantized: bool) -> Vec<Format> {
        let f = Format::new;
        let mut formats = match (self, morph_target) {
            (Semantic::Position | Semantic::Normal, _) | (Semantic::Tangent, true) => vec![f(Vec3, Float, false)],
            (Semantic::Tangent, false) => vec![f(Vec4, Float, false)],
            (Semantic::TexCoord(_), _) => vec![
                f(Vec2, Float, false),
                f(Vec2, UnsignedByte, true),
                f(Vec2, UnsignedShort, true),
            ],
            (Semantic::Color(_), _) => vec![
                f(Vec3, Float, false),
                f(Vec3, UnsignedByte, true),
                f(Vec3, UnsignedShort, true),
                f(Vec4, Float, false),
                f(Vec4, UnsignedByte, true),
                f(Vec4, UnsignedShort, true),
            ],
            (Semantic::Joints(_), _) => vec![f(Vec4, UnsignedByte, false), f(Vec4, UnsignedShort, false)],
            (Semantic::Weights(_), _) => vec![
                f(Vec4, Float, false),
                f(Vec4, UnsignedByte, true),
                f(Vec4, UnsignedShort, true),
            ],
            (Semantic::Custom(_), _) => Vec::new(),
        };
        if quantized {
            match (self, morph_target) {
                (Semantic::Position, false) => {
                    for component in [Byte, UnsignedByte, Short, UnsignedShort] {
                        formats.push(f(Vec3, component, false));
                        formats.push(f(Vec3, component, true));
                    }
                }
                (Semantic::Position, true) => {
                    for component in [Byte, Short] {
                        formats.push(f(Vec3, component, false));
                        formats.push(f(Vec3, component, true));
                    }
                }
                (Semantic::Normal, _) | (Semantic::Tangent, true) => {
                    formats.push(f(Vec3, Byte, true));
                    formats.push(f(Vec3, Short, true));
                }
                (Semantic::Tangent, false) => {
                    formats.push(f(Vec4, Byte, true));
                    formats.push(f(Vec4, Short, true));
                }
                (Semantic::TexCoord(_), _) => {
                    formats.push(f(Vec2, Byte, false));
                    formats.push(f(Vec2, Byte, true));
                    formats.push(f(Vec2, UnsignedByte, false));
                    formats.push(f(Vec2, Short, false));
                    formats.push(f(Vec2, Short, true));
                    formats.push(f(Vec2, UnsignedShort, false));
                }
                _ => {}
            }
        }
        formats
    }
}

// =============================================================================
// Primitives
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(PrimitiveMode::Points),
            1 => Some(PrimitiveMode::Lines),
            2 => Some(PrimitiveMode::LineLoop),
            3 => Some(PrimitiveMode::LineStrip),
            4 => Some(PrimitiveMode::Triangles),
            5 => Some(PrimitiveMode::TriangleStrip),
            6 => Some(PrimitiveMode::TriangleFan),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveMode::Points => "POINTS",
            PrimitiveMode::Lines => "LINES",
            PrimitiveMode::LineLoop => "LINE_LOOP",
            PrimitiveMode::LineStrip => "LINE_STRIP",
            PrimitiveMode::Triangles => "TRIANGLES",
            PrimitiveMode::TriangleStrip => "TRIANGLE_STRIP",
            PrimitiveMode::TriangleFan => "TRIANGLE_FAN",
        }
    }

    /// Whether `count` vertices form whole primitives in this mode
    pub fn accepts_count(self, count: u64) -> bool {
        match self {
            PrimitiveMode::Points => count >= 1,
            PrimitiveMode::Lines => count >= 2 && count % 2 == 0,
            PrimitiveMode::LineLoop | PrimitiveMode::LineStrip => count >= 2,
            PrimitiveMode::Triangles => count >= 3 && count % 3 == 0,
            PrimitiveMode::TriangleStrip | PrimitiveMode::TriangleFan => count >= 3,
        }
    }

    pub fn is_triangles(self) -> bool {
        matches!(
            self,
            PrimitiveMode::Triangles | PrimitiveMode::TriangleStrip | PrimitiveMode::TriangleFan
        )
    }

    /// Triangles rendered from `count` vertices
    pub fn triangle_count(self, count: u64) -> u64 {
        match self {
            PrimitiveMode::Triangles => count / 3,
            PrimitiveMode::TriangleStrip | PrimitiveMode::TriangleFan => count.saturating_sub(2),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Primitive {
    pub attributes: Vec<(String, Index)>,
    pub indices: Option<Index>,
    pub material: Option<Index>,
    pub mode: PrimitiveMode,
    pub targets: Vec<Vec<(String, Index)>>,
}

impl Primitive {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        let attributes = r.required_index_map("attributes").unwrap_or_default();
        let indices = r.index("indices");
        let material = r.index("material");
        let mode = r
            .enum_uint("mode", &[0, 1, 2, 3, 4, 5, 6])
            .and_then(PrimitiveMode::from_code)
            .unwrap_or_default();
        let targets = r.index_map_array("targets").unwrap_or_default();
        Self {
            attributes,
            indices,
            material,
            mode,
            targets,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<Index> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|&(_, index)| index)
    }

    /// Number of sets of an indexed semantic family, e.g. `"JOINTS"`
    pub fn set_count(&self, family: &str) -> usize {
        self.attributes
            .iter()
            .filter_map(|(name, _)| Semantic::parse(name)?.family())
            .filter(|(f, _)| *f == family)
            .count()
    }

    pub fn is_skinned(&self) -> bool {
        self.attribute("JOINTS_0").is_some() && self.attribute("WEIGHTS_0").is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
    pub weights: Option<Vec<f64>>,
}

impl Mesh {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        let primitives = r
            .child_array("primitives", ObjectKind::MeshPrimitive, true, |_, p| Primitive::read(p))
            .unwrap_or_default();
        if !r.has("primitives") {
            r.issue_here(IssueCode::UndefinedProperty, "Property 'primitives' must be defined.");
        }
        let weights = r.float_array("weights", &[], ..);
        Self { primitives, weights }
    }

    /// Morph target count, taken from the first primitive
    pub fn target_count(&self) -> usize {
        self.primitives.first().map_or(0, |p| p.targets.len())
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let pointer = format!("/meshes/{index}");

        let target_count = self.target_count();
        let joints_count = self.primitives.first().map_or(0, |p| p.set_count("JOINTS"));
        for (p, primitive) in self.primitives.iter().enumerate() {
            let primitive_pointer = format!("{pointer}/primitives/{p}");
            if primitive.targets.len() != target_count {
                sink.add(
                    IssueCode::MeshPrimitivesUnequalTargetsCount,
                    format!("{primitive_pointer}/targets"),
                    "All primitives must have the same number of morph targets.",
                );
            }
            if primitive.set_count("JOINTS") != joints_count {
                sink.add(
                    IssueCode::MeshPrimitivesUnequalJointsCount,
                    format!("{primitive_pointer}/attributes"),
                    format!(
                        "All primitives should contain the same number of 'JOINTS' and 'WEIGHTS' attribute sets, expected {joints_count}."
                    ),
                );
            }
            PrimitiveCheck {
                primitive,
                pointer: primitive_pointer,
                cx,
            }
            .run(sink);
        }

        if let Some(weights) = &self.weights {
            if weights.len() != target_count {
                sink.add(
                    IssueCode::MeshInvalidWeightsCount,
                    format!("{pointer}/weights"),
                    format!(
                        "The length of weights array ({}) does not match the number of morph targets ({target_count}).",
                        weights.len()
                    ),
                );
            }
        }
    }
}

/// Semantic checks for one primitive
struct PrimitiveCheck<'p, 'd> {
    primitive: &'p Primitive,
    pointer: String,
    cx: &'p Context<'d>,
}

impl PrimitiveCheck<'_, '_> {
    fn run(&self, sink: &mut IssueSink<'_>) {
        let vertex_count = self.check_attributes(sink);
        self.check_indices(vertex_count, sink);
        self.check_material(sink);
        self.check_targets(sink);
    }

    /// Attribute names, formats and counts; returns the vertex count
    fn check_attributes(&self, sink: &mut IssueSink<'_>) -> Option<u64> {
        let doc = self.cx.doc;
        let attributes_pointer = format!("{}/attributes", self.pointer);
        let mut families: HashMap<&'static str, Vec<u32>> = HashMap::new();
        let mut vertex_count: Option<u64> = None;
        let mut views_without_stride: HashMap<usize, &str> = HashMap::new();

        // POSITION defines the vertex count when present
        let ordered = self
            .primitive
            .attributes
            .iter()
            .filter(|(name, _)| name == "POSITION")
            .chain(self.primitive.attributes.iter().filter(|(name, _)| name != "POSITION"));

        for (name, index) in ordered {
            let attribute_pointer = join_pointer(&attributes_pointer, name);
            let Some(semantic) = Semantic::parse(name) else {
                sink.add(
                    IssueCode::MeshPrimitiveInvalidAttribute,
                    attribute_pointer,
                    format!("Invalid attribute name '{name}'."),
                );
                continue;
            };
            if let Some((family, set)) = semantic.family() {
                families.entry(family).or_default().push(set);
            }

            let Some(a) = resolve(sink, *index, doc.accessors.len(), attribute_pointer.clone()) else {
                continue;
            };
            let accessor = &doc.accessors[a];

            let allowed = semantic.formats(false, self.cx.quantized);
            if let Some(format) = accessor.format() {
                if !allowed.is_empty() && !allowed.contains(&format) {
                    sink.add(
                        IssueCode::MeshPrimitiveAttributesAccessorInvalidFormat,
                        attribute_pointer.clone(),
                        format!(
                            "Invalid accessor format '{format}' for this attribute semantic. Must be one of ({}).",
                            format_list(&allowed)
                        ),
                    );
                }
            }

            if semantic == Semantic::Position && !accessor.has_bounds() {
                sink.add(
                    IssueCode::MeshPrimitivePositionAccessorWithoutBounds,
                    attribute_pointer.clone(),
                    "accessor.min and accessor.max must be defined for POSITION attribute.",
                );
            }

            if let Some(view) = accessor.buffer_view.and_then(|v| v.get(doc.buffer_views.len())) {
                let buffer_view = &doc.buffer_views[view];
                let element_size = accessor.layout().map_or(0, |layout| layout.size() as u64);
                let offset = buffer_view.byte_offset + accessor.byte_offset;
                let stride_unaligned = buffer_view.byte_stride.is_none() && element_size % 4 != 0;
                if offset % 4 != 0 || stride_unaligned {
                    sink.add(
                        IssueCode::MeshPrimitiveAccessorUnaligned,
                        attribute_pointer.clone(),
                        "Vertex attribute data must be aligned to 4-byte boundaries.",
                    );
                }
                if buffer_view.byte_stride.is_none() {
                    if let Some(previous) = views_without_stride.insert(view, name) {
                        sink.add(
                            IssueCode::MeshPrimitiveAccessorWithoutByteStride,
                            attribute_pointer.clone(),
                            format!(
                                "bufferView.byteStride must be defined when two or more accessors use the same bufferView (shared with '{previous}')."
                            ),
                        );
                    }
                }
            }

            if let Some(count) = accessor.count {
                match vertex_count {
                    None => vertex_count = Some(count),
                    Some(expected) if expected != count => sink.add(
                        IssueCode::MeshPrimitiveUnequalAccessorCount,
                        attribute_pointer,
                        format!("All accessors of the same primitive must have the same count, expected {expected}."),
                    ),
                    Some(_) => {}
                }
            }
        }

        if self.primitive.attribute("POSITION").is_none() {
            sink.add(
                IssueCode::MeshPrimitiveNoPosition,
                attributes_pointer.clone(),
                "No POSITION attribute found.",
            );
        }
        if self.primitive.attribute("TANGENT").is_some() && self.primitive.attribute("NORMAL").is_none() {
            sink.add(
                IssueCode::MeshPrimitiveTangentWithoutNormal,
                attributes_pointer.clone(),
                "TANGENT attribute without NORMAL found.",
            );
        }

        let mut families: Vec<_> = families.into_iter().collect();
        families.sort_unstable();
        for (family, mut sets) in families {
            sets.sort_unstable();
            if sets.iter().enumerate().any(|(i, &set)| set as usize != i) {
                sink.add(
                    IssueCode::MeshPrimitiveIndexedSemanticContinuity,
                    attributes_pointer.clone(),
                    format!("Indices for indexed attribute semantic '{family}' must start with 0 and be continuous."),
                );
            }
        }

        let joints = self.primitive.set_count("JOINTS");
        let weights = self.primitive.set_count("WEIGHTS");
        if joints != weights {
            sink.add(
                IssueCode::MeshPrimitiveJointsWeightsMismatch,
                attributes_pointer,
                format!("Number of JOINTS attribute semantics ({joints}) does not match the number of WEIGHTS ({weights})."),
            );
        }

        vertex_count
    }

    fn check_indices(&self, vertex_count: Option<u64>, sink: &mut IssueSink<'_>) {
        let doc = self.cx.doc;
        let mode = self.primitive.mode;
        let mut element_count = vertex_count;

        if let Some(index) = self.primitive.indices {
            let indices_pointer = format!("{}/indices", self.pointer);
            element_count = None;
            if let Some(a) = resolve(sink, index, doc.accessors.len(), indices_pointer.clone()) {
                let accessor = &doc.accessors[a];
                let allowed = [
                    Format::new(Scalar, UnsignedByte, false),
                    Format::new(Scalar, UnsignedShort, false),
                    Format::new(Scalar, UnsignedInt, false),
                ];
                if let Some(format) = accessor.format() {
                    if !allowed.contains(&format) {
                        sink.add(
                            IssueCode::MeshPrimitiveIndicesAccessorInvalidFormat,
                            indices_pointer,
                            format!(
                                "Invalid indices accessor format '{format}'. Must be one of ({}).",
                                format_list(&allowed)
                            ),
                        );
                    }
                }
                element_count = accessor.count;
            }
        }

        if let Some(count) = element_count {
            if !mode.accepts_count(count) {
                sink.add(
                    IssueCode::MeshPrimitiveIncompatibleMode,
                    self.pointer.clone(),
                    format!("Invalid number of vertices or indices ({count}) for '{}' mode.", mode.name()),
                );
            }
        }
    }

    /// Texture coordinate sets and tangent space against the bound material
    fn check_material(&self, sink: &mut IssueSink<'_>) {
        let doc = self.cx.doc;
        let Some(index) = self.primitive.material else {
            return;
        };
        let material_pointer = format!("{}/material", self.pointer);
        let Some(m) = resolve(sink, index, doc.materials.len(), material_pointer.clone()) else {
            return;
        };

        let texcoord_sets = self.primitive.set_count("TEXCOORD") as u64;
        let bindings = doc.material_textures(m);
        let mut used = vec![false; texcoord_sets as usize];
        for binding in &bindings {
            if binding.tex_coord >= texcoord_sets {
                sink.add(
                    IssueCode::MeshPrimitiveTooFewTexcoords,
                    material_pointer.clone(),
                    format!(
                        "Material is incompatible with mesh primitive: Texture binding '{}' needs 'TEXCOORD_{}' attribute.",
                        binding.pointer, binding.tex_coord
                    ),
                );
            } else {
                used[binding.tex_coord as usize] = true;
            }
        }
        let unused: Vec<String> = used
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(set, _)| set.to_string())
            .collect();
        if !unused.is_empty() {
            sink.add(
                IssueCode::MeshPrimitiveUnusedTexcoord,
                material_pointer.clone(),
                format!(
                    "Material does not use texture coordinates sets with indices ({}).",
                    unused.join(", ")
                ),
            );
        }

        let has_tangent_space =
            self.primitive.attribute("NORMAL").is_some() && self.primitive.attribute("TANGENT").is_some();
        if has_tangent_space || !self.primitive.mode.is_triangles() {
            return;
        }
        if doc.materials[m].normal_texture.is_some() {
            sink.add(
                IssueCode::MeshPrimitiveGeneratedTangentSpace,
                material_pointer,
                "Material requires tangents but they are not provided; the runtime will have to generate them.",
            );
        } else if bindings.iter().any(|binding| binding.normal_map) {
            sink.add(
                IssueCode::MeshPrimitiveNoTangentSpace,
                material_pointer,
                "Material requires a tangent space but the mesh primitive does not provide it.",
            );
        }
    }

    fn check_targets(&self, sink: &mut IssueSink<'_>) {
        let doc = self.cx.doc;
        for (t, target) in self.primitive.targets.iter().enumerate() {
            let target_pointer = format!("{}/targets/{t}", self.pointer);
            for (name, index) in target {
                let attribute_pointer = join_pointer(&target_pointer, name);
                let semantic = Semantic::parse(name);
                let morphable = matches!(
                    semantic,
                    Some(
                        Semantic::Position
                            | Semantic::Normal
                            | Semantic::Tangent
                            | Semantic::TexCoord(_)
                            | Semantic::Color(_)
                            | Semantic::Custom(_)
                    )
                );
                let Some(semantic) = semantic.filter(|_| morphable) else {
                    sink.add(
                        IssueCode::MeshPrimitiveInvalidAttribute,
                        attribute_pointer,
                        format!("Invalid attribute name '{name}'."),
                    );
                    continue;
                };

                let Some(a) = resolve(sink, *index, doc.accessors.len(), attribute_pointer.clone()) else {
                    continue;
                };
                let accessor = &doc.accessors[a];

                let allowed = semantic.formats(true, self.cx.quantized);
                if let Some(format) = accessor.format() {
                    if !allowed.is_empty() && !allowed.contains(&format) {
                        sink.add(
                            IssueCode::MeshPrimitiveAttributesAccessorInvalidFormat,
                            attribute_pointer.clone(),
                            format!(
                                "Invalid accessor format '{format}' for this attribute semantic. Must be one of ({}).",
                                format_list(&allowed)
                            ),
                        );
                    }
                }
                if semantic == Semantic::Position && !accessor.has_bounds() {
                    sink.add(
                        IssueCode::MeshPrimitivePositionAccessorWithoutBounds,
                        attribute_pointer.clone(),
                        "accessor.min and accessor.max must be defined for POSITION attribute.",
                    );
                }

                let Some(base) = self.primitive.attribute(name) else {
                    sink.add(
                        IssueCode::MeshPrimitiveMorphTargetNoBaseAccessor,
                        attribute_pointer,
                        "No base accessor for this attribute semantic.",
                    );
                    continue;
                };
                let base_count = base.get(doc.accessors.len()).and_then(|b| doc.accessors[b].count);
                if let (Some(base_count), Some(count)) = (base_count, accessor.count) {
                    if base_count != count {
                        sink.add(
                            IssueCode::MeshPrimitiveMorphTargetInvalidAttributeCount,
                            attribute_pointer,
                            "Base accessor has different count.",
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_parse() {
        assert_eq!(Semantic::parse("POSITION"), Some(Semantic::Position));
        assert_eq!(Semantic::parse("TEXCOORD_1"), Some(Semantic::TexCoord(1)));
        assert_eq!(Semantic::parse("JOINTS_12"), Some(Semantic::Joints(12)));
        assert_eq!(Semantic::parse("_FOO"), Some(Semantic::Custom("_FOO".into())));
        assert_eq!(Semantic::parse("TEXCOORD_01"), None);
        assert_eq!(Semantic::parse("TEXCOORD_"), None);
        assert_eq!(Semantic::parse("position"), None);
    }

    #[test]
    fn test_mode_counts() {
        assert!(PrimitiveMode::Triangles.accepts_count(6));
        assert!(!PrimitiveMode::Triangles.accepts_count(4));
        assert!(!PrimitiveMode::Lines.accepts_count(3));
        assert!(PrimitiveMode::TriangleFan.accepts_count(5));
        assert_eq!(PrimitiveMode::TriangleStrip.triangle_count(5), 3);
        assert_eq!(PrimitiveMode::TriangleStrip.triangle_count(1), 0);
        assert_eq!(PrimitiveMode::Lines.triangle_count(6), 0);
    }

    #[test]
    fn test_quantized_formats_widen() {
        let plain = Semantic::Position.formats(false, false);
        let quantized = Semantic::Position.formats(false, true);
        assert_eq!(plain, vec![Format::new(Vec3, Float, false)]);
        assert!(quantized.contains(&Format::new(Vec3, UnsignedShort, true)));
        assert!(Semantic::Joints(0).formats(false, true).contains(&Format::new(Vec4, UnsignedByte, false)));
    }
}
