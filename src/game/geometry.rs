//! 2D geometry primitives shared by the simulation

pub use glam::Vec2;

/// Unit vector in the direction of `v`, or zero when `v` has no length
#[inline]
pub fn direction(v: Vec2) -> Vec2 {
    v.normalize_or_zero()
}

/// Axis-aligned rectangle anchored at its top-left corner (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            width,
            height,
        }
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn center(&self) -> Vec2 {
        self.origin + self.half_extents()
    }

    pub fn top_left(&self) -> Vec2 {
        self.origin
    }

    pub fn bottom_right(&self) -> Vec2 {
        self.origin + Vec2::new(self.width, self.height)
    }

    /// Closest point on (or inside) the rectangle to `p`
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.top_left(), self.bottom_right())
    }

    pub fn top_mid(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.width / 2.0, self.origin.y)
    }

    pub fn bottom_mid(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.width / 2.0, self.origin.y + self.height)
    }

    pub fn left_mid(&self) -> Vec2 {
        Vec2::new(self.origin.x, self.origin.y + self.height / 2.0)
    }

    pub fn right_mid(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.width, self.origin.y + self.height / 2.0)
    }
}
