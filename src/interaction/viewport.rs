use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 4.0;
/// Multiplier applied by the zoom buttons.
pub const ZOOM_STEP: f32 = 1.5;

/// World-to-screen affine transform: `screen = world * scale + translate`.
/// Independent of node physics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewTransform {
    pub const fn identity() -> Self {
        Self { scale: 1.0, tx: 0.0, ty: 0.0 }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Bring a view from outside (e.g. a state file) back into range: the scale is clamped
    /// to [`MIN_SCALE`, `MAX_SCALE`] and a non-finite component resets the whole view.
    pub fn sanitized(self) -> Self {
        if !(self.scale.is_finite() && self.tx.is_finite() && self.ty.is_finite()) {
            return Self::identity();
        }
        Self { scale: self.scale.clamp(MIN_SCALE, MAX_SCALE), ..self }
    }

    pub fn to_screen(&self, p: Pos2) -> Pos2 {
        Pos2::new(p.x * self.scale + self.tx, p.y * self.scale + self.ty)
    }

    pub fn to_world(&self, p: Pos2) -> Pos2 {
        Pos2::new((p.x - self.tx) / self.scale, (p.y - self.ty) / self.scale)
    }

    /// Scale by `factor` keeping the screen point `anchor` fixed. The result is clamped to
    /// [`MIN_SCALE`, `MAX_SCALE`].
    pub fn zoom_by(&mut self, factor: f32, anchor: Pos2) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let next = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let k = next / self.scale;
        self.tx = anchor.x - (anchor.x - self.tx) * k;
        self.ty = anchor.y - (anchor.y - self.ty) * k;
        self.scale = next;
    }

    pub fn zoom_in(&mut self, anchor: Pos2) {
        self.zoom_by(ZOOM_STEP, anchor);
    }

    pub fn zoom_out(&mut self, anchor: Pos2) {
        self.zoom_by(1.0 / ZOOM_STEP, anchor);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.tx += delta.x;
        self.ty += delta.y;
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }
}

/// Zoom factor for a vertical wheel delta in points.
pub fn wheel_factor(delta_y: f32) -> f32 {
    2f32.powf(-delta_y * 0.002)
}
