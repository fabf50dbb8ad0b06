//! KHR_lights_punctual

use super::{ExtensionHandler, ExtensionPayload, ReadOutput, RefTarget};
use crate::issue::IssueCode;
use crate::reader::{ObjectKind, ObjectReader};
use std::f64::consts::FRAC_PI_2;
use std::f64::consts::FRAC_PI_4;
use std::ops::Bound;

const NAME: &str = "KHR_lights_punctual";

pub struct LightsPunctual;

fn read_light(r: &mut ObjectReader<'_, '_, '_>) {
    r.name();
    let kind = r.required_enum_string("type", &["directional", "point", "spot"]);
    r.float_array("color", &[3], 0.0..=1.0);
    r.float_in("intensity", 0.0..);
    r.float_in("range", (Bound::Excluded(0.0), Bound::Unbounded));

    let spot = r.child("spot", ObjectKind::ExtensionObject, |s| {
        let inner = s.float_in("innerConeAngle", 0.0..FRAC_PI_2).unwrap_or(0.0);
        let outer = s
            .float_in("outerConeAngle", (Bound::Excluded(0.0), Bound::Included(FRAC_PI_2)))
            .unwrap_or(FRAC_PI_4);
        if outer <= inner {
            s.issue_here(
                IssueCode::KhrLightsPunctualLightSpotAngles,
                format!("outerConeAngle ({outer}) is less than or equal to innerConeAngle ({inner})."),
            );
        }
    });

    match (kind, spot.is_some()) {
        (Some("spot"), false) => r.issue_here(IssueCode::UndefinedProperty, "Property 'spot' must be defined."),
        (Some("directional" | "point"), true) => {
            r.issue(IssueCode::UnexpectedProperty, "spot", "Unexpected property.")
        }
        _ => {}
    }
}

impl ExtensionHandler for LightsPunctual {
    fn name(&self) -> &'static str {
        NAME
    }

    fn contexts(&self) -> &'static [ObjectKind] {
        &[ObjectKind::Root, ObjectKind::Node]
    }

    fn read(&self, r: &mut ObjectReader<'_, '_, '_>, out: &mut ReadOutput) -> ExtensionPayload {
        if out.owner_kind() == ObjectKind::Root {
            if !r.has("lights") {
                r.required_array("lights", true);
            }
            let lights = r
                .child_array("lights", ObjectKind::ExtensionObject, true, |_, light| read_light(light))
                .unwrap_or_default();
            let pointer = r.property_pointer("lights");
            out.collection(NAME, pointer, lights.len());
        } else if let Some(light) = r.required_index("light") {
            out.reference(r.property_pointer("light"), RefTarget::Extension(NAME), light);
        }
        ExtensionPayload::Checked
    }
}
