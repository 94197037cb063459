#![forbid(unsafe_code)]

//! Delta math shared by the transform recognizers.
//!
//! Screen-space motion is accumulated in a [`DeltaAccumulator`] until it
//! passes a pixel threshold; from then on every frame yields an
//! instantaneous delta. Rotation is the signed angle between the old and new
//! pointer-pair vectors, scale is the ratio of their lengths, and two-point
//! translation is the motion of the first point that rotation and scale
//! about the old center do not explain.
//!
//! # Invariants
//!
//! 1. Before the threshold is passed every delta is the identity (zero
//!    translation, zero rotation, unit scale).
//! 2. The first non-identity delta carries everything accumulated so far.

use bitflags::bitflags;
use fingertip_core::{Plane, Vec2, Vec3};

bitflags! {
    /// Which components a transform gesture computes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TransformTypes: u8 {
        const TRANSLATION = 1 << 0;
        const ROTATION    = 1 << 1;
        const SCALING     = 1 << 2;
    }
}

impl Default for TransformTypes {
    fn default() -> Self {
        Self::all()
    }
}

/// One frame's transform increment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformDelta {
    /// In projected space (pixels for screen projection).
    pub translation: Vec3,
    /// Degrees, counter-clockwise around `normal`.
    pub rotation: f32,
    /// Multiplicative.
    pub scale: f32,
    /// Axis of rotation.
    pub normal: Vec3,
}

impl TransformDelta {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: 0.0,
        scale: 1.0,
        normal: Vec3::FORWARD,
    };

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.translation == Vec3::ZERO && self.rotation == 0.0 && self.scale == 1.0
    }
}

impl Default for TransformDelta {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Plane the deltas are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProjectionMode {
    /// Raw screen pixels, rotation around +Z.
    #[default]
    Screen,
    /// Plane through the origin perpendicular to the projector's view.
    Layer,
    /// Host-supplied plane through the transformed object.
    Object(Plane),
    /// Plane through the world origin with a host-supplied normal.
    Global(Vec3),
}

/// Maps screen positions onto projection planes.
pub trait Projector: std::fmt::Debug {
    /// Intersection of the ray under `screen` with `plane`.
    fn project(&self, screen: Vec2, plane: &Plane) -> Option<Vec3>;

    /// Direction the view looks along.
    fn view_direction(&self) -> Vec3 {
        Vec3::FORWARD
    }
}

/// Parallel projection along +Z with a uniform pixel scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicProjector {
    /// World units per screen pixel.
    pub units_per_pixel: f32,
}

impl Default for OrthographicProjector {
    fn default() -> Self {
        Self {
            units_per_pixel: 1.0,
        }
    }
}

impl Projector for OrthographicProjector {
    fn project(&self, screen: Vec2, plane: &Plane) -> Option<Vec3> {
        let origin = (screen * self.units_per_pixel).extend(0.0);
        plane.raycast(origin, self.view_direction())
    }
}

impl ProjectionMode {
    /// The plane this mode projects onto, or `None` for raw screen space.
    #[must_use]
    pub fn plane(&self, projector: &dyn Projector) -> Option<Plane> {
        match *self {
            Self::Screen => None,
            Self::Layer => Some(Plane::through_origin(projector.view_direction())),
            Self::Object(plane) => Some(plane),
            Self::Global(normal) => Some(Plane::through_origin(normal)),
        }
    }

    /// Rotation axis for this mode.
    #[must_use]
    pub fn normal(&self, projector: &dyn Projector) -> Vec3 {
        self.plane(projector).map_or(Vec3::FORWARD, |p| p.normal)
    }
}

/// Project a screen point, falling back to the raw screen position for
/// planes parallel to the view.
#[must_use]
pub fn project_point(screen: Vec2, plane: Option<&Plane>, projector: &dyn Projector) -> Vec3 {
    plane
        .and_then(|plane| projector.project(screen, plane))
        .unwrap_or_else(|| screen.extend(0.0))
}

// ---------------------------------------------------------------------------
// Primitive deltas
// ---------------------------------------------------------------------------

/// Signed distance from `point` to the line through `a` and `b`.
#[must_use]
pub fn signed_line_distance(a: Vec2, b: Vec2, point: Vec2) -> f32 {
    let dir = b - a;
    let len = dir.length();
    if len <= f32::EPSILON {
        return (point - a).length();
    }
    dir.cross(point - a) / len
}

/// Pixels of motion perpendicular to the old pointer-pair line.
#[must_use]
pub fn rotation_pixels(old1: Vec2, old2: Vec2, new1: Vec2, new2: Vec2) -> f32 {
    signed_line_distance(old1, old2, new2) - signed_line_distance(old1, old2, new1)
}

/// Signed angle in degrees from `old2 - old1` to `new2 - new1` around `normal`.
#[must_use]
pub fn rotation_delta(old1: Vec3, old2: Vec3, new1: Vec3, new2: Vec3, normal: Vec3) -> f32 {
    (old2 - old1).signed_angle(new2 - new1, normal)
}

/// Ratio of new to old pair distance; 1 when the old pair coincides.
#[must_use]
pub fn scale_delta(old1: Vec3, old2: Vec3, new1: Vec3, new2: Vec3) -> f32 {
    let old = (old2 - old1).length();
    if old <= f32::EPSILON {
        1.0
    } else {
        (new2 - new1).length() / old
    }
}

/// Rotate `point` by `degrees` and scale it by `scale` about `center`.
#[must_use]
pub fn scale_and_rotate(point: Vec2, center: Vec2, degrees: f32, scale: f32) -> Vec2 {
    center + (point - center).rotated(degrees) * scale
}

/// Motion of the first point not explained by rotating and scaling about
/// the old pair center.
#[must_use]
pub fn two_point_translation(old1: Vec2, old2: Vec2, new1: Vec2, degrees: f32, scale: f32) -> Vec2 {
    let center = (old1 + old2) * 0.5;
    new1 - scale_and_rotate(old1, center, degrees, scale)
}

// ---------------------------------------------------------------------------
// Threshold accumulation
// ---------------------------------------------------------------------------

/// Jitter filter: buffers screen motion until it passes a pixel threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaAccumulator {
    translation: Vec2,
    rotation_pixels: f32,
    angle: f32,
    scaling_pixels: f32,
    scale: f32,
    transforming: bool,
}

impl Default for DeltaAccumulator {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            rotation_pixels: 0.0,
            angle: 0.0,
            scaling_pixels: 0.0,
            scale: 1.0,
            transforming: false,
        }
    }
}

impl DeltaAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a threshold has been passed since the last reset.
    #[must_use]
    pub fn is_transforming(&self) -> bool {
        self.transforming
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Screen translation for this frame.
    pub fn translation(&mut self, delta: Vec2, threshold: f32) -> Vec2 {
        if self.transforming {
            return delta;
        }
        self.translation += delta;
        if self.translation.length_squared() > threshold * threshold {
            self.transforming = true;
            std::mem::replace(&mut self.translation, Vec2::ZERO)
        } else {
            Vec2::ZERO
        }
    }

    /// Rotation in degrees for this frame.
    pub fn rotation(&mut self, pixels: f32, degrees: f32, threshold: f32) -> f32 {
        if self.transforming {
            return degrees;
        }
        self.rotation_pixels += pixels;
        self.angle += degrees;
        if self.rotation_pixels * self.rotation_pixels > threshold * threshold {
            self.transforming = true;
            self.rotation_pixels = 0.0;
            std::mem::replace(&mut self.angle, 0.0)
        } else {
            0.0
        }
    }

    /// Scale ratio for this frame.
    pub fn scaling(&mut self, pixels: f32, ratio: f32, threshold: f32) -> f32 {
        if self.transforming {
            return ratio;
        }
        self.scaling_pixels += pixels;
        self.scale *= ratio;
        if self.scaling_pixels * self.scaling_pixels > threshold * threshold {
            self.transforming = true;
            self.scaling_pixels = 0.0;
            std::mem::replace(&mut self.scale, 1.0)
        } else {
            1.0
        }
    }
}
