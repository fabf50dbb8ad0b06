//! Issue catalog, severities and the per-run issue sink

use hashbrown::HashMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Issue severity, ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    #[serde(alias = "info")]
    Information,
    Hint,
}

impl Severity {
    /// Numeric form used in reports (0 = error ... 3 = hint)
    pub fn as_index(self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Information => 2,
            Severity::Hint => 3,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_index())
    }
}

macro_rules! issue_codes {
    ($($variant:ident => $code:literal, $severity:ident;)*) => {
        /// Every issue the validator can emit
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum IssueCode {
            $($variant,)*
        }

        impl IssueCode {
            /// All codes in catalog order
            pub const ALL: &'static [IssueCode] = &[$(IssueCode::$variant,)*];

            /// Stable string form, e.g. `NODE_LOOP`
            pub fn as_str(self) -> &'static str {
                match self {
                    $(IssueCode::$variant => $code,)*
                }
            }

            pub fn default_severity(self) -> Severity {
                match self {
                    $(IssueCode::$variant => Severity::$severity,)*
                }
            }
        }
    };
}

issue_codes! {
    // Container
    GlbUnexpectedEndOfHeader => "GLB_UNEXPECTED_END_OF_HEADER", Error;
    GlbInvalidMagic => "GLB_INVALID_MAGIC", Error;
    GlbInvalidVersion => "GLB_INVALID_VERSION", Error;
    GlbLengthTooSmall => "GLB_LENGTH_TOO_SMALL", Error;
    GlbLengthMismatch => "GLB_LENGTH_MISMATCH", Error;
    GlbExtraData => "GLB_EXTRA_DATA", Warning;
    GlbChunkLengthUnaligned => "GLB_CHUNK_LENGTH_UNALIGNED", Error;
    GlbUnexpectedEndOfChunkHeader => "GLB_UNEXPECTED_END_OF_CHUNK_HEADER", Error;
    GlbChunkTooBig => "GLB_CHUNK_TOO_BIG", Error;
    GlbEmptyChunk => "GLB_EMPTY_CHUNK", Error;
    GlbEmptyBinChunk => "GLB_EMPTY_BIN_CHUNK", Warning;
    GlbDuplicateChunk => "GLB_DUPLICATE_CHUNK", Error;
    GlbUnexpectedFirstChunk => "GLB_UNEXPECTED_FIRST_CHUNK", Error;
    GlbUnexpectedBinChunk => "GLB_UNEXPECTED_BIN_CHUNK", Error;
    GlbUnknownChunkType => "GLB_UNKNOWN_CHUNK_TYPE", Warning;
    GlbMissingJsonChunk => "GLB_MISSING_JSON_CHUNK", Error;
    GlbBinChunkUnused => "GLB_BIN_CHUNK_UNUSED", Warning;

    // JSON
    BomFound => "BOM_FOUND", Error;
    InvalidJson => "INVALID_JSON", Error;
    InvalidJsonRootObject => "INVALID_JSON_ROOT_OBJECT", Error;
    NonObjectExtras => "NON_OBJECT_EXTRAS", Information;

    // Schema
    TypeMismatch => "TYPE_MISMATCH", Error;
    ArrayTypeMismatch => "ARRAY_TYPE_MISMATCH", Error;
    UndefinedProperty => "UNDEFINED_PROPERTY", Error;
    UnexpectedProperty => "UNEXPECTED_PROPERTY", Warning;
    ValueNotInList => "VALUE_NOT_IN_LIST", Error;
    ValueNotInRange => "VALUE_NOT_IN_RANGE", Error;
    ValueMultipleOf => "VALUE_MULTIPLE_OF", Error;
    ArrayLengthNotInList => "ARRAY_LENGTH_NOT_IN_LIST", Error;
    ArrayLengthOutOfRange => "ARRAY_LENGTH_OUT_OF_RANGE", Error;
    DuplicateElements => "DUPLICATE_ELEMENTS", Error;
    EmptyEntity => "EMPTY_ENTITY", Error;
    OneOfMismatch => "ONE_OF_MISMATCH", Error;
    UnsatisfiedDependency => "UNSATISFIED_DEPENDENCY", Error;
    PatternMismatch => "PATTERN_MISMATCH", Error;
    InvalidUri => "INVALID_URI", Error;

    // Semantic, shared
    UnresolvedReference => "UNRESOLVED_REFERENCE", Error;
    UnusedObject => "UNUSED_OBJECT", Information;

    // Asset
    UnknownAssetMajorVersion => "UNKNOWN_ASSET_MAJOR_VERSION", Error;
    UnknownAssetMinorVersion => "UNKNOWN_ASSET_MINOR_VERSION", Warning;
    AssetMinVersionGreaterThanVersion => "ASSET_MIN_VERSION_GREATER_THAN_VERSION", Warning;

    // Resources
    IoError => "IO_ERROR", Error;
    BufferMissingGlbData => "BUFFER_MISSING_GLB_DATA", Error;
    BufferNonFirstGlb => "BUFFER_NON_FIRST_GLB", Error;
    BufferByteLengthMismatch => "BUFFER_BYTE_LENGTH_MISMATCH", Error;
    BufferGlbChunkTooBig => "BUFFER_GLB_CHUNK_TOO_BIG", Warning;
    NonRelativeUri => "NON_RELATIVE_URI", Warning;
    DataUriGlb => "DATA_URI_GLB", Information;
    InvalidDataUri => "INVALID_DATA_URI", Error;

    // Buffer views
    BufferViewTooLong => "BUFFER_VIEW_TOO_LONG", Error;
    BufferViewTooBigByteStride => "BUFFER_VIEW_TOO_BIG_BYTE_STRIDE", Error;
    BufferViewInvalidByteStride => "BUFFER_VIEW_INVALID_BYTE_STRIDE", Error;
    BufferViewTargetOverride => "BUFFER_VIEW_TARGET_OVERRIDE", Error;
    BufferViewTargetMissing => "BUFFER_VIEW_TARGET_MISSING", Hint;

    // Accessors
    AccessorTotalOffsetAlignment => "ACCESSOR_TOTAL_OFFSET_ALIGNMENT", Error;
    AccessorMatrixAlignment => "ACCESSOR_MATRIX_ALIGNMENT", Error;
    AccessorTooLong => "ACCESSOR_TOO_LONG", Error;
    AccessorSmallByteStride => "ACCESSOR_SMALL_BYTESTRIDE", Error;
    AccessorNormalizedInvalid => "ACCESSOR_NORMALIZED_INVALID", Error;
    AccessorSparseCountOutOfRange => "ACCESSOR_SPARSE_COUNT_OUT_OF_RANGE", Error;
    AccessorSparseBufferViewWithByteStride => "ACCESSOR_SPARSE_BUFFER_VIEW_WITH_BYTESTRIDE", Error;
    AccessorMinMismatch => "ACCESSOR_MIN_MISMATCH", Error;
    AccessorMaxMismatch => "ACCESSOR_MAX_MISMATCH", Error;
    AccessorElementOutOfMinBound => "ACCESSOR_ELEMENT_OUT_OF_MIN_BOUND", Error;
    AccessorElementOutOfMaxBound => "ACCESSOR_ELEMENT_OUT_OF_MAX_BOUND", Error;
    AccessorInvalidFloat => "ACCESSOR_INVALID_FLOAT", Error;
    AccessorIndexOob => "ACCESSOR_INDEX_OOB", Error;
    AccessorIndexPrimitiveRestart => "ACCESSOR_INDEX_PRIMITIVE_RESTART", Error;
    AccessorIndexTriangleDegenerate => "ACCESSOR_INDEX_TRIANGLE_DEGENERATE", Information;
    AccessorSparseIndicesNonIncreasing => "ACCESSOR_SPARSE_INDICES_NON_INCREASING", Error;
    AccessorSparseIndexOob => "ACCESSOR_SPARSE_INDEX_OOB", Error;
    AccessorAnimationInputNegative => "ACCESSOR_ANIMATION_INPUT_NEGATIVE", Error;
    AccessorAnimationInputNonIncreasing => "ACCESSOR_ANIMATION_INPUT_NON_INCREASING", Error;
    AccessorInvalidIbm => "ACCESSOR_INVALID_IBM", Error;
    AccessorJointsIndexOob => "ACCESSOR_JOINTS_INDEX_OOB", Error;
    AccessorJointsIndexDuplicate => "ACCESSOR_JOINTS_INDEX_DUPLICATE", Error;
    AccessorJointsUsedZeroWeight => "ACCESSOR_JOINTS_USED_ZERO_WEIGHT", Warning;
    AccessorWeightsNegative => "ACCESSOR_WEIGHTS_NEGATIVE", Error;
    AccessorWeightsNonNormalized => "ACCESSOR_WEIGHTS_NON_NORMALIZED", Error;
    AccessorNonUnit => "ACCESSOR_NON_UNIT", Error;
    AccessorInvalidSign => "ACCESSOR_INVALID_SIGN", Error;

    // Meshes
    MeshInvalidWeightsCount => "MESH_INVALID_WEIGHTS_COUNT", Error;
    MeshPrimitivesUnequalTargetsCount => "MESH_PRIMITIVES_UNEQUAL_TARGETS_COUNT", Error;
    MeshPrimitivesUnequalJointsCount => "MESH_PRIMITIVES_UNEQUAL_JOINTS_COUNT", Warning;
    MeshPrimitiveInvalidAttribute => "MESH_PRIMITIVE_INVALID_ATTRIBUTE", Error;
    MeshPrimitiveNoPosition => "MESH_PRIMITIVE_NO_POSITION", Warning;
    MeshPrimitiveIndexedSemanticContinuity => "MESH_PRIMITIVE_INDEXED_SEMANTIC_CONTINUITY", Error;
    MeshPrimitiveJointsWeightsMismatch => "MESH_PRIMITIVE_JOINTS_WEIGHTS_MISMATCH", Error;
    MeshPrimitiveTangentWithoutNormal => "MESH_PRIMITIVE_TANGENT_WITHOUT_NORMAL", Warning;
    MeshPrimitiveNoTangentSpace => "MESH_PRIMITIVE_NO_TANGENT_SPACE", Error;
    MeshPrimitiveGeneratedTangentSpace => "MESH_PRIMITIVE_GENERATED_TANGENT_SPACE", Warning;
    MeshPrimitiveUnequalAccessorCount => "MESH_PRIMITIVE_UNEQUAL_ACCESSOR_COUNT", Error;
    MeshPrimitiveIncompatibleMode => "MESH_PRIMITIVE_INCOMPATIBLE_MODE", Warning;
    MeshPrimitiveAttributesAccessorInvalidFormat => "MESH_PRIMITIVE_ATTRIBUTES_ACCESSOR_INVALID_FORMAT", Error;
    MeshPrimitiveIndicesAccessorInvalidFormat => "MESH_PRIMITIVE_INDICES_ACCESSOR_INVALID_FORMAT", Error;
    MeshPrimitivePositionAccessorWithoutBounds => "MESH_PRIMITIVE_POSITION_ACCESSOR_WITHOUT_BOUNDS", Error;
    MeshPrimitiveAccessorUnaligned => "MESH_PRIMITIVE_ACCESSOR_UNALIGNED", Error;
    MeshPrimitiveAccessorWithoutByteStride => "MESH_PRIMITIVE_ACCESSOR_WITHOUT_BYTESTRIDE", Error;
    MeshPrimitiveTooFewTexcoords => "MESH_PRIMITIVE_TOO_FEW_TEXCOORDS", Error;
    MeshPrimitiveUnusedTexcoord => "MESH_PRIMITIVE_UNUSED_TEXCOORD", Information;
    MeshPrimitiveMorphTargetNoBaseAccessor => "MESH_PRIMITIVE_MORPH_TARGET_NO_BASE_ACCESSOR", Error;
    MeshPrimitiveMorphTargetInvalidAttributeCount => "MESH_PRIMITIVE_MORPH_TARGET_INVALID_ATTRIBUTE_COUNT", Error;

    // Nodes and scenes
    NodeMatrixTrs => "NODE_MATRIX_TRS", Error;
    NodeMatrixNonTrs => "NODE_MATRIX_NON_TRS", Error;
    NodeMatrixDefault => "NODE_MATRIX_DEFAULT", Information;
    RotationNonUnit => "ROTATION_NON_UNIT", Error;
    NodeLoop => "NODE_LOOP", Error;
    NodeParentOverride => "NODE_PARENT_OVERRIDE", Error;
    NodeEmpty => "NODE_EMPTY", Information;
    NodeSkinWithNonSkinnedMesh => "NODE_SKIN_WITH_NON_SKINNED_MESH", Error;
    NodeSkinnedMeshWithoutSkin => "NODE_SKINNED_MESH_WITHOUT_SKIN", Warning;
    NodeWeightsInvalid => "NODE_WEIGHTS_INVALID", Error;
    SceneNonRootNode => "SCENE_NON_ROOT_NODE", Error;

    // Skins
    SkinNoCommonRoot => "SKIN_NO_COMMON_ROOT", Error;
    SkinSkeletonInvalid => "SKIN_SKELETON_INVALID", Error;
    SkinIbmInvalidFormat => "SKIN_IBM_INVALID_FORMAT", Error;
    SkinIbmInvalidCount => "SKIN_IBM_INVALID_COUNT", Error;
    SkinIbmAccessorWithByteStride => "SKIN_IBM_ACCESSOR_WITH_BYTESTRIDE", Error;

    // Cameras
    CameraXmagYmagZero => "CAMERA_XMAG_YMAG_ZERO", Error;
    CameraXmagYmagNegative => "CAMERA_XMAG_YMAG_NEGATIVE", Warning;
    CameraZfarLequalZnear => "CAMERA_ZFAR_LEQUAL_ZNEAR", Error;
    CameraYfovGequalPi => "CAMERA_YFOV_GEQUAL_PI", Warning;

    // Animations
    AnimationChannelTargetNodeMatrix => "ANIMATION_CHANNEL_TARGET_NODE_MATRIX", Error;
    AnimationChannelTargetNodeWeightsNoMorphs => "ANIMATION_CHANNEL_TARGET_NODE_WEIGHTS_NO_MORPHS", Error;
    AnimationDuplicateTargets => "ANIMATION_DUPLICATE_TARGETS", Error;
    AnimationSamplerInputAccessorInvalidFormat => "ANIMATION_SAMPLER_INPUT_ACCESSOR_INVALID_FORMAT", Error;
    AnimationSamplerInputAccessorWithoutBounds => "ANIMATION_SAMPLER_INPUT_ACCESSOR_WITHOUT_BOUNDS", Error;
    AnimationSamplerInputAccessorTooFewElements => "ANIMATION_SAMPLER_INPUT_ACCESSOR_TOO_FEW_ELEMENTS", Error;
    AnimationSamplerOutputAccessorInvalidFormat => "ANIMATION_SAMPLER_OUTPUT_ACCESSOR_INVALID_FORMAT", Error;
    AnimationSamplerOutputAccessorInvalidCount => "ANIMATION_SAMPLER_OUTPUT_ACCESSOR_INVALID_COUNT", Error;
    AnimationSamplerAccessorWithByteStride => "ANIMATION_SAMPLER_ACCESSOR_WITH_BYTESTRIDE", Error;

    // Materials, textures, images
    MaterialAlphaCutoffInvalidMode => "MATERIAL_ALPHA_CUTOFF_INVALID_MODE", Warning;
    TextureInvalidImageMimeType => "TEXTURE_INVALID_IMAGE_MIME_TYPE", Error;
    ImageUnrecognizedFormat => "IMAGE_UNRECOGNIZED_FORMAT", Warning;
    ImageMimeTypeInvalid => "IMAGE_MIME_TYPE_INVALID", Error;
    ImageUnexpectedEos => "IMAGE_UNEXPECTED_EOS", Error;
    ImageNpotDimensions => "IMAGE_NPOT_DIMENSIONS", Information;
    ImageBufferViewWithByteStride => "IMAGE_BUFFER_VIEW_WITH_BYTESTRIDE", Error;

    // Extensions, global
    UndeclaredExtension => "UNDECLARED_EXTENSION", Error;
    UnexpectedExtensionObject => "UNEXPECTED_EXTENSION_OBJECT", Error;
    UnusedExtension => "UNUSED_EXTENSION", Error;
    UnusedExtensionRequired => "UNUSED_EXTENSION_REQUIRED", Error;
    NonRequiredExtension => "NON_REQUIRED_EXTENSION", Error;
    UnsupportedExtension => "UNSUPPORTED_EXTENSION", Information;
    IncompleteExtensionSupport => "INCOMPLETE_EXTENSION_SUPPORT", Information;
    UnreservedExtensionPrefix => "UNRESERVED_EXTENSION_PREFIX", Warning;

    // Extensions, specific
    KhrLightsPunctualLightSpotAngles => "KHR_LIGHTS_PUNCTUAL_LIGHT_SPOT_ANGLES", Error;
    KhrMaterialsEmissiveStrengthZeroFactor => "KHR_MATERIALS_EMISSIVE_STRENGTH_ZERO_FACTOR", Warning;
    KhrMaterialsVariantsNonUniqueVariant => "KHR_MATERIALS_VARIANTS_NON_UNIQUE_VARIANT", Error;
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IssueCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One validation finding
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub code: IssueCode,
    pub message: String,
    pub severity: Severity,
    /// JSON pointer into the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// Byte offset into the input, for container and JSON findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// Code-to-severity replacements applied when issues are created
pub type SeverityOverrides = HashMap<String, Severity>;

/// Accumulates issues for one validation stage
///
/// Stages that run in parallel each get their own sink; the orchestrator
/// merges them in a fixed order.
pub struct IssueSink<'o> {
    overrides: &'o SeverityOverrides,
    issues: Vec<Issue>,
}

impl<'o> IssueSink<'o> {
    pub fn new(overrides: &'o SeverityOverrides) -> Self {
        Self {
            overrides,
            issues: Vec::new(),
        }
    }

    /// A fresh, empty sink sharing the same overrides
    pub fn fork(&self) -> IssueSink<'o> {
        IssueSink::new(self.overrides)
    }

    fn severity_of(&self, code: IssueCode) -> Severity {
        self.overrides
            .get(code.as_str())
            .copied()
            .unwrap_or_else(|| code.default_severity())
    }

    /// Report an issue located by JSON pointer
    pub fn add(&mut self, code: IssueCode, pointer: impl Into<String>, message: impl Into<String>) {
        let severity = self.severity_of(code);
        self.issues.push(Issue {
            code,
            message: message.into(),
            severity,
            pointer: Some(pointer.into()),
            offset: None,
        });
    }

    /// Report an issue located by byte offset
    pub fn add_at_offset(&mut self, code: IssueCode, offset: usize, message: impl Into<String>) {
        let severity = self.severity_of(code);
        self.issues.push(Issue {
            code,
            message: message.into(),
            severity,
            pointer: None,
            offset: Some(offset),
        });
    }

    pub fn append(&mut self, other: IssueSink<'_>) {
        self.issues.extend(other.issues);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|issue| issue.severity == Severity::Error)
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}

/// Escape one JSON pointer reference token (RFC 6901)
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Append an escaped token to a pointer
pub fn join_pointer(base: &str, token: &str) -> String {
    format!("{base}/{}", escape_token(token))
}
