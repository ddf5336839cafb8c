// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cameras: map a view box's logical viewing volume to clip space.
//!
//! A camera supplies the frame of its view box's subtree root. [`Camera::project`]
//! returns the combined projection·view matrix for a given viewport aspect ratio;
//! the result is cached until a parameter changes.
//!
//! Input handling is a pure function of the current parameters and the event
//! delta: replaying the same [`CameraInput`] from the same state always lands on
//! the same parameters.
//!
//! ```
//! use understory_viewbox::camera::{Camera, TurntableCamera, UpAxis};
//!
//! let mut camera: Camera = TurntableCamera::new()
//!     .with_elevation(30.0)
//!     .with_azimuth(30.0)
//!     .with_distance(5.0)
//!     .with_up(UpAxis::PosY)
//!     .into();
//! let before = camera.project(1.5);
//! if let Camera::Turntable(t) = &mut camera {
//!     t.set_azimuth(t.azimuth() + 360.0);
//! }
//! assert!(camera.project(1.5).abs_diff_eq(before, 1e-9));
//! ```

use core::cell::Cell;
use core::f64::consts::FRAC_PI_2;
use core::fmt;
use core::str::FromStr;

use glam::{DMat4, DQuat, DVec2, DVec3};
use kurbo::{Point, Size, Vec2};

/// Multiplicative zoom per unit of scroll delta.
pub const ZOOM_STEP: f64 = 1.1;

/// Degrees of turntable rotation per dragged pixel.
pub const ROTATE_DEGREES_PER_PIXEL: f64 = 0.5;

/// Input already routed to a single view box, in that view box's pixel space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CameraInput {
    /// Pointer drag by `delta` pixels (y down).
    Drag {
        /// Movement since the previous drag event.
        delta: Vec2,
    },
    /// Scroll by `delta` notches around `anchor` (view box local pixels).
    Zoom {
        /// Positive zooms in.
        delta: f64,
        /// Pointer position relative to the view box's top-left corner.
        anchor: Point,
    },
}

#[derive(Clone, Debug, Default)]
struct ProjectionCache(Cell<Option<(f64, DMat4)>>);

impl ProjectionCache {
    fn get_or(&self, aspect: f64, compute: impl FnOnce() -> DMat4) -> DMat4 {
        if let Some((cached_aspect, m)) = self.0.get() {
            if cached_aspect == aspect {
                return m;
            }
        }
        let m = compute();
        self.0.set(Some((aspect, m)));
        m
    }

    fn invalidate(&self) {
        self.0.set(None);
    }

    fn is_valid(&self) -> bool {
        self.0.get().is_some()
    }
}

/// A camera variant.
#[derive(Clone, Debug)]
pub enum Camera {
    /// 2D orthographic pan and zoom.
    PanZoom(PanZoomCamera),
    /// 3D orbit around a fixed origin.
    Turntable(TurntableCamera),
}

impl Default for Camera {
    fn default() -> Self {
        Self::PanZoom(PanZoomCamera::default())
    }
}

impl From<PanZoomCamera> for Camera {
    fn from(camera: PanZoomCamera) -> Self {
        Self::PanZoom(camera)
    }
}

impl From<TurntableCamera> for Camera {
    fn from(camera: TurntableCamera) -> Self {
        Self::Turntable(camera)
    }
}

impl Camera {
    /// Projection·view matrix for a viewport of the given width/height ratio.
    pub fn project(&self, viewport_aspect: f64) -> DMat4 {
        match self {
            Self::PanZoom(c) => c.project(viewport_aspect),
            Self::Turntable(c) => c.project(viewport_aspect),
        }
    }

    /// Apply routed input. `viewport` is the view box size in pixels.
    pub fn handle_input(&mut self, input: &CameraInput, viewport: Size) {
        match self {
            Self::PanZoom(c) => c.handle_input(input, viewport),
            Self::Turntable(c) => c.handle_input(input, viewport),
        }
    }

    /// Short name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PanZoom(_) => "panzoom",
            Self::Turntable(_) => "turntable",
        }
    }
}

/// Error returned for unknown camera, axis or clip method names.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseNameError {
    /// What was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseNameError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl FromStr for Camera {
    type Err = ParseNameError;

    /// `"panzoom"` or `"turntable"` with default parameters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "panzoom" => Ok(PanZoomCamera::default().into()),
            "turntable" => Ok(TurntableCamera::default().into()),
            _ => Err(ParseNameError::new("camera", s)),
        }
    }
}

/// Orthographic 2D camera.
///
/// With zoom `1` and center at the origin, the square `[-1, 1]²` fills the
/// viewport. Zoom changes only the scale and the center only the translation.
/// With the aspect lock on, one scene unit covers the same number of pixels on
/// both axes regardless of viewport shape.
#[derive(Clone, Debug)]
pub struct PanZoomCamera {
    center: DVec2,
    zoom: f64,
    aspect_locked: bool,
    cache: ProjectionCache,
}

impl Default for PanZoomCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl PanZoomCamera {
    /// Centered at the origin with zoom `1` and no aspect lock.
    pub fn new() -> Self {
        Self {
            center: DVec2::ZERO,
            zoom: 1.0,
            aspect_locked: false,
            cache: ProjectionCache::default(),
        }
    }

    /// Builder-style [`PanZoomCamera::set_center`].
    #[must_use]
    pub fn with_center(mut self, center: DVec2) -> Self {
        self.set_center(center);
        self
    }

    /// Builder-style [`PanZoomCamera::set_zoom`].
    #[must_use]
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.set_zoom(zoom);
        self
    }

    /// Builder-style [`PanZoomCamera::set_aspect_locked`].
    #[must_use]
    pub fn with_aspect_locked(mut self, locked: bool) -> Self {
        self.set_aspect_locked(locked);
        self
    }

    /// Scene point shown at the viewport center.
    pub fn center(&self) -> DVec2 {
        self.center
    }

    /// Zoom factor.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Whether the X:Y ratio is preserved.
    pub fn aspect_locked(&self) -> bool {
        self.aspect_locked
    }

    /// Move the view center.
    pub fn set_center(&mut self, center: DVec2) {
        self.center = center;
        self.cache.invalidate();
    }

    /// Set the zoom; non-positive or non-finite values are ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom;
            self.cache.invalidate();
        }
    }

    /// Toggle the aspect lock.
    pub fn set_aspect_locked(&mut self, locked: bool) {
        self.aspect_locked = locked;
        self.cache.invalidate();
    }

    /// Scene units to NDC scale factors per axis.
    pub fn scale_factors(&self, aspect: f64) -> DVec2 {
        if !self.aspect_locked {
            return DVec2::splat(self.zoom);
        }
        if aspect >= 1.0 {
            DVec2::new(self.zoom / aspect, self.zoom)
        } else {
            DVec2::new(self.zoom, self.zoom * aspect)
        }
    }

    /// Orthographic projection for the given viewport aspect.
    pub fn project(&self, aspect: f64) -> DMat4 {
        self.cache.get_or(aspect, || {
            let s = self.scale_factors(aspect);
            DMat4::from_scale(DVec3::new(s.x, s.y, 1.0))
                * DMat4::from_translation(DVec3::new(-self.center.x, -self.center.y, 0.0))
        })
    }

    /// Drag pans so the content follows the pointer; scroll zooms around the pointer.
    pub fn handle_input(&mut self, input: &CameraInput, viewport: Size) {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return;
        }
        let scale = self.scale_factors(viewport.width / viewport.height);
        match *input {
            CameraInput::Drag { delta } => {
                let ndc = DVec2::new(
                    2.0 * delta.x / viewport.width,
                    -2.0 * delta.y / viewport.height,
                );
                self.set_center(self.center - ndc / scale);
            }
            CameraInput::Zoom { delta, anchor } => {
                let factor = ZOOM_STEP.powf(delta);
                let ndc = DVec2::new(
                    2.0 * anchor.x / viewport.width - 1.0,
                    1.0 - 2.0 * anchor.y / viewport.height,
                );
                let world = self.center + ndc / scale;
                let before = self.zoom;
                self.set_zoom(self.zoom * factor);
                let applied = self.zoom / before;
                self.set_center(world - (world - self.center) / applied);
            }
        }
    }
}

/// One of the six principal axis directions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpAxis {
    /// `+x`
    PosX,
    /// `-x`
    NegX,
    /// `+y`
    PosY,
    /// `-y`
    NegY,
    /// `+z`
    #[default]
    PosZ,
    /// `-z`
    NegZ,
}

impl UpAxis {
    /// Unit vector of the axis.
    pub fn vector(self) -> DVec3 {
        match self {
            Self::PosX => DVec3::X,
            Self::NegX => DVec3::NEG_X,
            Self::PosY => DVec3::Y,
            Self::NegY => DVec3::NEG_Y,
            Self::PosZ => DVec3::Z,
            Self::NegZ => DVec3::NEG_Z,
        }
    }

    /// Rotation taking the canonical `+z`-up frame to this axis.
    pub fn frame(self) -> DQuat {
        DQuat::from_rotation_arc(DVec3::Z, self.vector())
    }
}

impl FromStr for UpAxis {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "+x" | "x" => Ok(Self::PosX),
            "-x" => Ok(Self::NegX),
            "+y" | "y" => Ok(Self::PosY),
            "-y" => Ok(Self::NegY),
            "+z" | "z" => Ok(Self::PosZ),
            "-z" => Ok(Self::NegZ),
            _ => Err(ParseNameError::new("up axis", s)),
        }
    }
}

impl fmt::Display for UpAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PosX => "+x",
            Self::NegX => "-x",
            Self::PosY => "+y",
            Self::NegY => "-y",
            Self::PosZ => "+z",
            Self::NegZ => "-z",
        })
    }
}

/// Unit direction for `elevation` / `azimuth` (degrees) with the given up axis.
///
/// In the canonical `+z`-up frame, azimuth `0` looks from `-y` towards the origin
/// and increases counter-clockwise seen from above; elevation `90` is straight
/// above along the up axis.
pub fn spherical_to_cartesian(elevation: f64, azimuth: f64, up: UpAxis) -> DVec3 {
    let (se, ce) = elevation.to_radians().sin_cos();
    let (sa, ca) = azimuth.to_radians().sin_cos();
    up.frame() * DVec3::new(sa * ce, -ca * ce, se)
}

/// Orbit camera looking at the origin from spherical coordinates.
///
/// Elevation is clamped to `[-90, 90]` degrees, azimuth wraps modulo 360 and
/// the distance stays positive. A field of view of `0` selects an orthographic
/// projection whose height spans `distance` scene units.
#[derive(Clone, Debug)]
pub struct TurntableCamera {
    elevation: f64,
    azimuth: f64,
    distance: f64,
    fov: f64,
    up: UpAxis,
    cache: ProjectionCache,
}

const MIN_DISTANCE: f64 = 1e-6;
const MAX_FOV: f64 = 179.0;

impl Default for TurntableCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl TurntableCamera {
    /// Elevation 30°, azimuth 30°, distance 10, fov 45°, up `+z`.
    pub fn new() -> Self {
        Self {
            elevation: 30.0,
            azimuth: 30.0,
            distance: 10.0,
            fov: 45.0,
            up: UpAxis::PosZ,
            cache: ProjectionCache::default(),
        }
    }

    /// Builder-style [`TurntableCamera::set_elevation`].
    #[must_use]
    pub fn with_elevation(mut self, degrees: f64) -> Self {
        self.set_elevation(degrees);
        self
    }

    /// Builder-style [`TurntableCamera::set_azimuth`].
    #[must_use]
    pub fn with_azimuth(mut self, degrees: f64) -> Self {
        self.set_azimuth(degrees);
        self
    }

    /// Builder-style [`TurntableCamera::set_distance`].
    #[must_use]
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.set_distance(distance);
        self
    }

    /// Builder-style [`TurntableCamera::set_fov`].
    #[must_use]
    pub fn with_fov(mut self, degrees: f64) -> Self {
        self.set_fov(degrees);
        self
    }

    /// Builder-style [`TurntableCamera::set_up`].
    #[must_use]
    pub fn with_up(mut self, up: UpAxis) -> Self {
        self.set_up(up);
        self
    }

    /// Elevation in degrees.
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Azimuth in degrees, in `[0, 360)`.
    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    /// Distance from the look-at origin.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Vertical field of view in degrees; `0` is orthographic.
    pub fn fov(&self) -> f64 {
        self.fov
    }

    /// Up axis.
    pub fn up(&self) -> UpAxis {
        self.up
    }

    /// Set elevation, clamped to `[-90, 90]`.
    pub fn set_elevation(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.elevation = degrees.clamp(-90.0, 90.0);
            self.cache.invalidate();
        }
    }

    /// Set azimuth, wrapped into `[0, 360)`.
    pub fn set_azimuth(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.azimuth = degrees.rem_euclid(360.0);
            self.cache.invalidate();
        }
    }

    /// Set distance; clamped to a small positive minimum.
    pub fn set_distance(&mut self, distance: f64) {
        if distance.is_finite() {
            self.distance = distance.max(MIN_DISTANCE);
            self.cache.invalidate();
        }
    }

    /// Set the field of view, clamped to `[0, 179]`.
    pub fn set_fov(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.fov = degrees.clamp(0.0, MAX_FOV);
            self.cache.invalidate();
        }
    }

    /// Set the up axis.
    pub fn set_up(&mut self, up: UpAxis) {
        self.up = up;
        self.cache.invalidate();
    }

    /// Camera-to-world rotation.
    fn rotation(&self) -> DQuat {
        self.up.frame()
            * DQuat::from_rotation_z(self.azimuth.to_radians())
            * DQuat::from_rotation_x(FRAC_PI_2 - self.elevation.to_radians())
    }

    /// Eye position: `distance * spherical_to_cartesian(elevation, azimuth)`.
    pub fn eye(&self) -> DVec3 {
        self.rotation() * DVec3::new(0.0, 0.0, self.distance)
    }

    /// World-to-camera transform.
    pub fn view(&self) -> DMat4 {
        DMat4::from_translation(DVec3::new(0.0, 0.0, -self.distance))
            * DMat4::from_quat(self.rotation().inverse())
    }

    /// Projection·view for the given viewport aspect.
    pub fn project(&self, aspect: f64) -> DMat4 {
        self.cache.get_or(aspect, || {
            let near = self.distance * 0.01;
            let far = self.distance * 100.0;
            let projection = if self.fov > 0.0 {
                DMat4::perspective_rh_gl(self.fov.to_radians(), aspect, near, far)
            } else {
                let half_h = self.distance * 0.5;
                let half_w = half_h * aspect;
                DMat4::orthographic_rh_gl(-half_w, half_w, -half_h, half_h, near, far)
            };
            projection * self.view()
        })
    }

    /// Drag orbits (horizontal → azimuth, vertical → elevation); scroll dollies.
    pub fn handle_input(&mut self, input: &CameraInput, _viewport: Size) {
        match *input {
            CameraInput::Drag { delta } => {
                self.set_azimuth(self.azimuth - delta.x * ROTATE_DEGREES_PER_PIXEL);
                self.set_elevation(self.elevation + delta.y * ROTATE_DEGREES_PER_PIXEL);
            }
            CameraInput::Zoom { delta, .. } => {
                self.set_distance(self.distance * ZOOM_STEP.powf(-delta));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn panzoom_default_is_identity() {
        let cam = PanZoomCamera::new();
        assert_eq!(cam.project(1.0), DMat4::IDENTITY);
        assert_eq!(cam.project(4.0 / 3.0), DMat4::IDENTITY);
    }

    #[test]
    fn panzoom_zoom_scales_and_center_translates() {
        let cam = PanZoomCamera::new()
            .with_zoom(2.0)
            .with_center(DVec2::new(1.0, -1.0));
        let m = cam.project(1.0);
        // The center maps to the NDC origin.
        assert!(
            m.transform_point3(DVec3::new(1.0, -1.0, 0.0))
                .abs_diff_eq(DVec3::ZERO, EPS)
        );
        assert!(
            m.transform_point3(DVec3::new(1.5, -1.0, 0.0))
                .abs_diff_eq(DVec3::new(1.0, 0.0, 0.0), EPS)
        );
    }

    #[test]
    fn panzoom_aspect_lock_preserves_ratio() {
        let cam = PanZoomCamera::new().with_aspect_locked(true);
        let wide = cam.scale_factors(2.0);
        let tall = cam.scale_factors(0.5);
        // Pixels per unit: sx * w / 2 equals sy * h / 2.
        assert!((wide.x * 2.0 - wide.y).abs() < EPS);
        assert!((tall.x - tall.y * 2.0).abs() < EPS);
        let free = PanZoomCamera::new().scale_factors(2.0);
        assert_eq!(free, DVec2::ONE);
    }

    #[test]
    fn panzoom_drag_follows_pointer() {
        let mut cam = PanZoomCamera::new();
        let viewport = Size::new(400.0, 200.0);
        cam.handle_input(
            &CameraInput::Drag {
                delta: Vec2::new(100.0, 50.0),
            },
            viewport,
        );
        // 100px of 400 is half the NDC width; content moves right, center moves left.
        assert!(cam.center().abs_diff_eq(DVec2::new(-0.5, 0.5), EPS));
    }

    #[test]
    fn panzoom_zoom_keeps_anchor_fixed() {
        let mut cam = PanZoomCamera::new();
        let viewport = Size::new(200.0, 200.0);
        let anchor = Point::new(150.0, 50.0);
        let world_under = |c: &PanZoomCamera| {
            let inv = c.project(1.0).inverse();
            inv.transform_point3(DVec3::new(0.5, 0.5, 0.0)).truncate()
        };
        let before = world_under(&cam);
        cam.handle_input(&CameraInput::Zoom { delta: 3.0, anchor }, viewport);
        assert!((cam.zoom() - ZOOM_STEP.powi(3)).abs() < EPS);
        assert!(world_under(&cam).abs_diff_eq(before, EPS));
    }

    #[test]
    fn input_replay_is_idempotent() {
        let base = TurntableCamera::new();
        let input = CameraInput::Drag {
            delta: Vec2::new(33.0, -12.0),
        };
        let mut a = base.clone();
        let mut b = base.clone();
        a.handle_input(&input, Size::new(100.0, 100.0));
        b.handle_input(&input, Size::new(100.0, 100.0));
        assert_eq!(a.azimuth(), b.azimuth());
        assert_eq!(a.elevation(), b.elevation());
        assert!(a.project(1.0).abs_diff_eq(b.project(1.0), 0.0));
    }

    #[test]
    fn turntable_parameters_are_constrained() {
        let mut cam = TurntableCamera::new();
        cam.set_elevation(120.0);
        assert_eq!(cam.elevation(), 90.0);
        cam.set_elevation(-100.0);
        assert_eq!(cam.elevation(), -90.0);
        cam.set_azimuth(-30.0);
        assert_eq!(cam.azimuth(), 330.0);
        cam.set_distance(-5.0);
        assert!(cam.distance() > 0.0);
        cam.set_fov(500.0);
        assert_eq!(cam.fov(), MAX_FOV);
    }

    #[test]
    fn turntable_eye_matches_spherical_coordinates() {
        for up in [
            UpAxis::PosX,
            UpAxis::NegX,
            UpAxis::PosY,
            UpAxis::NegY,
            UpAxis::PosZ,
            UpAxis::NegZ,
        ] {
            let cam = TurntableCamera::new()
                .with_elevation(30.0)
                .with_azimuth(30.0)
                .with_distance(5.0)
                .with_up(up);
            let expected = 5.0 * spherical_to_cartesian(30.0, 30.0, up);
            assert!(cam.eye().abs_diff_eq(expected, EPS), "up = {up}");
            // The eye is at the camera-space origin and the look-at point straight ahead.
            let view = cam.view();
            assert!(view.transform_point3(cam.eye()).abs_diff_eq(DVec3::ZERO, EPS));
            assert!(
                view.transform_point3(DVec3::ZERO)
                    .abs_diff_eq(DVec3::new(0.0, 0.0, -5.0), EPS)
            );
        }
    }

    #[test]
    fn turntable_up_axis_points_up_on_screen() {
        let cam = TurntableCamera::new()
            .with_elevation(0.0)
            .with_azimuth(0.0)
            .with_up(UpAxis::PosY);
        let view = cam.view();
        let up_in_camera = view.transform_vector3(DVec3::Y);
        assert!(up_in_camera.abs_diff_eq(DVec3::Y, EPS));
    }

    #[test]
    fn turntable_poles_are_well_defined() {
        let cam = TurntableCamera::new().with_elevation(90.0);
        let m = cam.project(1.0);
        assert!(m.is_finite());
        assert!(cam.eye().abs_diff_eq(DVec3::new(0.0, 0.0, 10.0), 1e-6));
    }

    #[test]
    fn turntable_azimuth_is_periodic() {
        let mut cam = TurntableCamera::new()
            .with_elevation(30.0)
            .with_azimuth(30.0)
            .with_distance(5.0)
            .with_up(UpAxis::PosY);
        let before = cam.project(4.0 / 3.0);
        cam.set_azimuth(cam.azimuth() + 360.0);
        assert!(cam.project(4.0 / 3.0).abs_diff_eq(before, EPS));
    }

    #[test]
    fn orthographic_turntable_has_affine_projection() {
        let cam = TurntableCamera::new().with_fov(0.0).with_distance(4.0);
        let m = cam.project(1.0);
        assert!(m.row(3).abs_diff_eq(glam::DVec4::W, EPS));
        // The look-at origin lands at the center of the screen.
        let c = m.project_point3(DVec3::ZERO);
        assert!(c.x.abs() < EPS && c.y.abs() < EPS);
    }

    #[test]
    fn mutation_invalidates_cached_projection() {
        let mut cam = PanZoomCamera::new();
        let _ = cam.project(1.0);
        assert!(cam.cache.is_valid());
        cam.set_zoom(3.0);
        assert!(!cam.cache.is_valid());
        assert!(
            cam.project(1.0)
                .abs_diff_eq(DMat4::from_scale(DVec3::new(3.0, 3.0, 1.0)), EPS)
        );
    }

    #[test]
    fn parse_names() {
        assert_eq!("+y".parse::<UpAxis>(), Ok(UpAxis::PosY));
        assert_eq!("-Z".parse::<UpAxis>(), Ok(UpAxis::NegZ));
        assert!("up".parse::<UpAxis>().is_err());
        assert_eq!("turntable".parse::<Camera>().unwrap().name(), "turntable");
        assert_eq!("PanZoom".parse::<Camera>().unwrap().name(), "panzoom");
        assert!("fly".parse::<Camera>().is_err());
    }
}
