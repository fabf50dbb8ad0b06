//! Cameras

use crate::issue::{IssueCode, IssueSink};
use crate::reader::{ObjectKind, ObjectReader};
use std::f64::consts::PI;
use std::ops::Bound;

/// (0, inf)
const POSITIVE: (Bound<f64>, Bound<f64>) = (Bound::Excluded(0.0), Bound::Unbounded);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Perspective {
    pub aspect_ratio: Option<f64>,
    pub yfov: Option<f64>,
    pub zfar: Option<f64>,
    pub znear: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orthographic {
    pub xmag: Option<f64>,
    pub ymag: Option<f64>,
    pub zfar: Option<f64>,
    pub znear: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    Orthographic,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Camera {
    pub projection: Option<Projection>,
    pub perspective: Option<Perspective>,
    pub orthographic: Option<Orthographic>,
}

impl Camera {
    pub fn read(r: &mut ObjectReader<'_, '_, '_>) -> Self {
        r.name();
        let projection = r
            .required_enum_string("type", &["perspective", "orthographic"])
            .map(|kind| match kind {
                "perspective" => Projection::Perspective,
                _ => Projection::Orthographic,
            });
        let perspective = r.child("perspective", ObjectKind::CameraPerspective, |p| Perspective {
            aspect_ratio: p.float_in("aspectRatio", POSITIVE),
            yfov: p.required_float_in("yfov", POSITIVE),
            zfar: p.float_in("zfar", POSITIVE),
            znear: p.required_float_in("znear", POSITIVE),
        });
        let orthographic = r.child("orthographic", ObjectKind::CameraOrthographic, |o| Orthographic {
            xmag: o.required_float_in("xmag", ..),
            ymag: o.required_float_in("ymag", ..),
            zfar: o.required_float_in("zfar", POSITIVE),
            znear: o.required_float_in("znear", 0.0..),
        });

        if perspective.is_some() && orthographic.is_some() {
            r.issue_here(
                IssueCode::OneOfMismatch,
                "Exactly one of ('orthographic', 'perspective') properties must be defined.",
            );
        } else if let Some(projection) = projection {
            let (expected, found, other, stray) = match projection {
                Projection::Perspective => ("perspective", perspective.is_some(), "orthographic", orthographic.is_some()),
                Projection::Orthographic => ("orthographic", orthographic.is_some(), "perspective", perspective.is_some()),
            };
            if !found {
                r.issue_here(
                    IssueCode::UndefinedProperty,
                    format!("Property '{expected}' must be defined."),
                );
            }
            if stray {
                r.issue(
                    IssueCode::UnexpectedProperty,
                    other,
                    format!("Property '{other}' does not match camera type '{expected}'."),
                );
            }
        }

        Self {
            projection,
            perspective,
            orthographic,
        }
    }

    pub fn validate(&self, index: usize, sink: &mut IssueSink<'_>) {
        let pointer = format!("/cameras/{index}");

        if let Some(p) = &self.perspective {
            if let Some(yfov) = p.yfov {
                if yfov >= PI {
                    sink.add(
                        IssueCode::CameraYfovGequalPi,
                        format!("{pointer}/perspective/yfov"),
                        "yfov should be less than Pi.",
                    );
                }
            }
            if let (Some(zfar), Some(znear)) = (p.zfar, p.znear) {
                if zfar <= znear {
                    sink.add(
                        IssueCode::CameraZfarLequalZnear,
                        format!("{pointer}/perspective/zfar"),
                        "zfar must be greater than znear.",
                    );
                }
            }
        }

        if let Some(o) = &self.orthographic {
            if let (Some(zfar), Some(znear)) = (o.zfar, o.znear) {
                if zfar <= znear {
                    sink.add(
                        IssueCode::CameraZfarLequalZnear,
                        format!("{pointer}/orthographic/zfar"),
                        "zfar must be greater than znear.",
                    );
                }
            }
            let (xmag, ymag) = (o.xmag.unwrap_or(1.0), o.ymag.unwrap_or(1.0));
            if xmag == 0.0 || ymag == 0.0 {
                sink.add(
                    IssueCode::CameraXmagYmagZero,
                    format!("{pointer}/orthographic"),
                    "xmag and ymag must not be zero.",
                );
            } else if xmag < 0.0 || ymag < 0.0 {
                sink.add(
                    IssueCode::CameraXmagYmagNegative,
                    format!("{pointer}/orthographic"),
                    "xmag and ymag should not be negative.",
                );
            }
        }
    }
}
