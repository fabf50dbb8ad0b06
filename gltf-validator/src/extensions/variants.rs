//! KHR_materials_variants

use super::{ExtensionHandler, ExtensionPayload, ReadOutput, RefTarget};
use crate::document::Collection;
use crate::issue::IssueCode;
use crate::reader::{ObjectKind, ObjectReader};
use hashbrown::HashSet;

const NAME: &str = "KHR_materials_variants";

pub struct MaterialsVariants;

impl MaterialsVariants {
    fn read_root(r: &mut ObjectReader<'_, '_, '_>, out: &mut ReadOutput) {
        if !r.has("variants") {
            r.required_array("variants", true);
        }
        let variants = r
            .child_array("variants", ObjectKind::ExtensionObject, true, |_, v| {
                v.required_string("name");
            })
            .unwrap_or_default();
        let pointer = r.property_pointer("variants");
        out.collection(NAME, pointer, variants.len());
    }

    fn read_primitive(r: &mut ObjectReader<'_, '_, '_>, out: &mut ReadOutput) {
        if !r.has("mappings") {
            r.required_array("mappings", true);
        }
        let mut seen = HashSet::new();
        r.child_array("mappings", ObjectKind::ExtensionObject, true, |_, mapping| {
            if let Some(material) = mapping.required_index("material") {
                out.reference(
                    mapping.property_pointer("material"),
                    RefTarget::Core(Collection::Materials),
                    material,
                );
            }
            let variants = if mapping.has("variants") {
                mapping.index_array("variants", false).unwrap_or_default()
            } else {
                mapping.required_array("variants", true);
                Vec::new()
            };
            let base = mapping.property_pointer("variants");
            for (k, variant) in variants.into_iter().enumerate() {
                let pointer = format!("{base}/{k}");
                if !seen.insert(variant) {
                    mapping.context().issues.add(
                        IssueCode::KhrMaterialsVariantsNonUniqueVariant,
                        pointer.clone(),
                        "This variant is used more than once for this mesh primitive.",
                    );
                }
                out.reference(pointer, RefTarget::Extension(NAME), variant);
            }
        });
    }
}

impl ExtensionHandler for MaterialsVariants {
    fn name(&self) -> &'static str {
        NAME
    }

    fn contexts(&self) -> &'static [ObjectKind] {
        &[ObjectKind::Root, ObjectKind::MeshPrimitive]
    }

    fn read(&self, r: &mut ObjectReader<'_, '_, '_>, out: &mut ReadOutput) -> ExtensionPayload {
        if out.owner_kind() == ObjectKind::Root {
            Self::read_root(r, out);
        } else {
            Self::read_primitive(r, out);
        }
        ExtensionPayload::Checked
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;
    use crate::extensions::{ExtensionRegistry, read_extensions};
    use crate::issue::{IssueSink, SeverityOverrides};
    use crate::reader::ReadContext;
    use serde_json::json;

    #[test]
    fn test_variant_used_twice_in_primitive() {
        let overrides = SeverityOverrides::new();
        let mut cx = ReadContext::new(IssueSink::new(&overrides));
        let value = json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_materials_variants"],
            "extensions": { "KHR_materials_variants": { "variants": [{ "name": "a" }, { "name": "b" }] } },
            "meshes": [{
                "primitives": [{
                    "attributes": { "POSITION": 0 },
                    "extensions": {
                        "KHR_materials_variants": {
                            "mappings": [
                                { "material": 0, "variants": [0] },
                                { "material": 1, "variants": [1, 0] }
                            ]
                        }
                    }
                }]
            }]
        });
        let mut doc = Document::read(&value, &mut cx);
        read_extensions(&mut doc, &mut cx, ExtensionRegistry::shared());

        let codes: Vec<_> = cx
            .issues
            .issues()
            .iter()
            .map(|i| (i.code.as_str(), i.pointer.clone().unwrap_or_default()))
            .collect();
        assert_eq!(
            codes,
            vec![(
                "KHR_MATERIALS_VARIANTS_NON_UNIQUE_VARIANT",
                "/meshes/0/primitives/0/extensions/KHR_materials_variants/mappings/1/variants/1".to_string()
            )]
        );
        // Two materials plus three variant references
        assert_eq!(doc.extension_refs.len(), 5);
        assert_eq!(doc.extension_collection("KHR_materials_variants").map(|c| c.len), Some(2));
    }
}
