//! Material extensions, described as property tables

use super::{ExtensionHandler, ExtensionObject, ExtensionPayload, ReadOutput};
use crate::document::Collection;
use crate::entities::{Context, TextureInfo};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{ObjectKind, ObjectReader};
use std::ops::Bound::{self, Excluded, Included, Unbounded};

/// One property of a material extension
#[derive(Debug, Clone, Copy)]
pub enum Field {
    Number {
        key: &'static str,
        min: Bound<f64>,
        max: Bound<f64>,
    },
    /// Color array with components in [0, max]
    Color {
        key: &'static str,
        len: usize,
        max: Bound<f64>,
    },
    Texture {
        key: &'static str,
        normal_map: bool,
    },
    /// Index of refraction: 0 or at least 1
    Ior { key: &'static str },
    /// Emissive multiplier, kept for the zero-emission check
    Strength { key: &'static str },
}

const fn factor(key: &'static str) -> Field {
    Field::Number {
        key,
        min: Included(0.0),
        max: Included(1.0),
    }
}

const fn non_negative(key: &'static str) -> Field {
    Field::Number {
        key,
        min: Included(0.0),
        max: Unbounded,
    }
}

const fn texture(key: &'static str) -> Field {
    Field::Texture { key, normal_map: false }
}

const fn color(key: &'static str, len: usize) -> Field {
    Field::Color {
        key,
        len,
        max: Included(1.0),
    }
}

/// A material extension with a flat property list
#[derive(Debug, Clone)]
pub struct MaterialExtension {
    pub name: &'static str,
    pub fields: &'static [Field],
}

pub const MATERIAL_EXTENSIONS: &[MaterialExtension] = &[
    MaterialExtension {
        name: "KHR_materials_anisotropy",
        fields: &[
            factor("anisotropyStrength"),
            Field::Number {
                key: "anisotropyRotation",
                min: Unbounded,
                max: Unbounded,
            },
            texture("anisotropyTexture"),
        ],
    },
    MaterialExtension {
        name: "KHR_materials_clearcoat",
        fields: &[
            factor("clearcoatFactor"),
            texture("clearcoatTexture"),
            factor("clearcoatRoughnessFactor"),
            texture("clearcoatRoughnessTexture"),
            Field::Texture {
                key: "clearcoatNormalTexture",
                normal_map: true,
            },
        ],
    },
    MaterialExtension {
        name: "KHR_materials_dispersion",
        fields: &[non_negative("dispersion")],
    },
    MaterialExtension {
        name: "KHR_materials_emissive_strength",
        fields: &[Field::Strength { key: "emissiveStrength" }],
    },
    MaterialExtension {
        name: "KHR_materials_ior",
        fields: &[Field::Ior { key: "ior" }],
    },
    MaterialExtension {
        name: "KHR_materials_iridescence",
        fields: &[
            factor("iridescenceFactor"),
            texture("iridescenceTexture"),
            Field::Number {
                key: "iridescenceIor",
                min: Included(1.0),
                max: Unbounded,
            },
            non_negative("iridescenceThicknessMinimum"),
            non_negative("iridescenceThicknessMaximum"),
            texture("iridescenceThicknessTexture"),
        ],
    },
    MaterialExtension {
        name: "KHR_materials_pbrSpecularGlossiness",
        fields: &[
            color("diffuseFactor", 4),
            texture("diffuseTexture"),
            color("specularFactor", 3),
            factor("glossinessFactor"),
            texture("specularGlossinessTexture"),
        ],
    },
    MaterialExtension {
        name: "KHR_materials_sheen",
        fields: &[
            color("sheenColorFactor", 3),
            texture("sheenColorTexture"),
            factor("sheenRoughnessFactor"),
            texture("sheenRoughnessTexture"),
        ],
    },
    MaterialExtension {
        name: "KHR_materials_specular",
        fields: &[
            factor("specularFactor"),
            texture("specularTexture"),
            Field::Color {
                key: "specularColorFactor",
                len: 3,
                max: Unbounded,
            },
            texture("specularColorTexture"),
        ],
    },
    MaterialExtension {
        name: "KHR_materials_transmission",
        fields: &[factor("transmissionFactor"), texture("transmissionTexture")],
    },
    MaterialExtension {
        name: "KHR_materials_unlit",
        fields: &[],
    },
    MaterialExtension {
        name: "KHR_materials_volume",
        fields: &[
            non_negative("thicknessFactor"),
            texture("thicknessTexture"),
            Field::Number {
                key: "attenuationDistance",
                min: Excluded(0.0),
                max: Unbounded,
            },
            color("attenuationColor", 3),
        ],
    },
];

impl ExtensionHandler for MaterialExtension {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contexts(&self) -> &'static [ObjectKind] {
        &[ObjectKind::Material]
    }

    fn read(&self, r: &mut ObjectReader<'_, '_, '_>, out: &mut ReadOutput) -> ExtensionPayload {
        let mut payload = ExtensionPayload::Checked;
        for field in self.fields {
            match *field {
                Field::Number { key, min, max } => {
                    r.float_in(key, (min, max));
                }
                Field::Color { key, len, max } => {
                    r.float_array(key, &[len], (Included(0.0), max));
                }
                Field::Texture { key, normal_map } => {
                    let kind = if normal_map {
                        ObjectKind::NormalTextureInfo
                    } else {
                        ObjectKind::TextureInfo
                    };
                    if let Some(info) = TextureInfo::read(r, key, kind) {
                        out.texture(info, normal_map);
                    }
                }
                Field::Ior { key } => {
                    if let Some(ior) = r.float(key) {
                        if ior != 0.0 && ior < 1.0 {
                            r.issue(
                                IssueCode::ValueNotInRange,
                                key,
                                format!("Value {ior} is out of range [1, inf) and is not 0."),
                            );
                        }
                    }
                }
                Field::Strength { key } => {
                    if let Some(strength) = r.float_in(key, 0.0..) {
                        payload = ExtensionPayload::EmissiveStrength(strength);
                    }
                }
            }
        }
        payload
    }

    fn validate(&self, object: &ExtensionObject, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        let ExtensionPayload::EmissiveStrength(_) = object.payload else {
            return;
        };
        let Some((Collection::Materials, m)) = object.entity else {
            return;
        };
        let black = cx.doc.materials.get(m).is_some_and(|material| material.emissive_is_black());
        if black {
            sink.add(
                IssueCode::KhrMaterialsEmissiveStrengthZeroFactor,
                object.pointer.clone(),
                "Emissive strength has no effect when the emissive factor is zero or undefined.",
            );
        }
    }
}
