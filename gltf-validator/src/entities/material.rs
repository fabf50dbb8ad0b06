//! Materials and texture bindings

use super::{Context, resolve};
use crate::issue::{IssueCode, IssueSink};
use crate::reader::{Index, ObjectKind, ObjectReader};

/// A `textureInfo` object: texture reference plus UV set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureInfo {
    pub index: Option<Index>,
    pub tex_coord: u64,
    /// Pointer of the textureInfo object
    pub pointer: String,
}

impl TextureInfo {
    /// Read a textureInfo property of the given kind
    ///
    /// Normal and occlusion textures carry one extra scalar each.
    pub fn read(r: &mut ObjectReader<'_, '_, '_>, key: &'static str, kind: ObjectKind) -> Option<Self> {
        r.child(key, kind, |t| {
            let index = t.required_index("index");
            let tex_coord = t.uint("texCoord").unwrap_or(0);
            match kind {
                ObjectKind::NormalTextureInfo => {
                    t.float("scale");
                }
                ObjectKind::OcclusionTextureInfo => {
                    t.float_in("strength", 0.0..=1.0);
                }
                _ => {}
            }
            TextureInfo {
                index,
                tex_coord,
                pointer: t.pointer().to_string(),
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PbrMetallicRoughness {
    pub base_color_factor: Option<Vec<f64>>,
    pub base_color_texture: Option<TextureInfo>,
    pub metallic_factor: Option<f64>,
    pub roughness_factor: Option<f64>,
    pub metallic_roughness_texture: Option<TextureInfo>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    pub normal_texture: Option<TextureInfo>,
    pub occlusion_texture: Option<TextureInfo>,
    pub emissive_texture: Option<TextureInfo>,
    pub emissive_factor: Option<Vec<f64>>,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: Option<f64>,
    pub double_sided: bool,
}

impl Material {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        let pbr_metallic_roughness = r.child(
            "pbrMetallicRoughness",
            ObjectKind::MaterialPbrMetallicRoughness,
            |p| PbrMetallicRoughness {
                base_color_factor: p.float_array("baseColorFactor", &[4], 0.0..=1.0),
                base_color_texture: TextureInfo::read(p, "baseColorTexture", ObjectKind::TextureInfo),
                metallic_factor: p.float_in("metallicFactor", 0.0..=1.0),
                roughness_factor: p.float_in("roughnessFactor", 0.0..=1.0),
                metallic_roughness_texture: TextureInfo::read(
                    p,
                    "metallicRoughnessTexture",
                    ObjectKind::TextureInfo,
                ),
            },
        );
        let normal_texture = TextureInfo::read(r, "normalTexture", ObjectKind::NormalTextureInfo);
        let occlusion_texture = TextureInfo::read(r, "occlusionTexture", ObjectKind::OcclusionTextureInfo);
        let emissive_texture = TextureInfo::read(r, "emissiveTexture", ObjectKind::TextureInfo);
        let emissive_factor = r.float_array("emissiveFactor", &[3], 0.0..=1.0);
        let alpha_mode = match r.enum_string("alphaMode", &["OPAQUE", "MASK", "BLEND"]) {
            Some("MASK") => AlphaMode::Mask,
            Some("BLEND") => AlphaMode::Blend,
            _ => AlphaMode::Opaque,
        };
        let alpha_cutoff = r.float_in("alphaCutoff", 0.0..);
        let double_sided = r.bool("doubleSided").unwrap_or(false);

        Self {
            pbr_metallic_roughness,
            normal_texture,
            occlusion_texture,
            emissive_texture,
            emissive_factor,
            alpha_mode,
            alpha_cutoff,
            double_sided,
        }
    }

    /// Core texture bindings in declaration order
    pub fn textures(&self) -> impl Iterator<Item = &TextureInfo> {
        let pbr = self.pbr_metallic_roughness.as_ref();
        [
            pbr.and_then(|p| p.base_color_texture.as_ref()),
            pbr.and_then(|p| p.metallic_roughness_texture.as_ref()),
            self.normal_texture.as_ref(),
            self.occlusion_texture.as_ref(),
            self.emissive_texture.as_ref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Emissive factor is absent or all zeros
    pub fn emissive_is_black(&self) -> bool {
        self.emissive_factor
            .as_ref()
            .is_none_or(|factor| factor.iter().all(|&c| c == 0.0))
    }

    pub fn validate(&self, index: usize, cx: &Context<'_>, sink: &mut IssueSink<'_>) {
        if self.alpha_cutoff.is_some() && self.alpha_mode != AlphaMode::Mask {
            sink.add(
                IssueCode::MaterialAlphaCutoffInvalidMode,
                format!("/materials/{index}/alphaCutoff"),
                "Alpha cutoff is supported only for 'MASK' alpha mode.",
            );
        }
        for info in self.textures() {
            if let Some(texture) = info.index {
                resolve(sink, texture, cx.doc.textures.len(), format!("{}/index", info.pointer));
            }
        }
    }
}
