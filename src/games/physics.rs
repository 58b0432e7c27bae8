//! Collision and integration helpers shared by every game.

/// Largest step a single `update` may simulate, in seconds.
pub const MAX_DT: f32 = 0.05;

/// Clamp a frame delta into `[0, MAX_DT]`. NaN and negative values become 0.
pub fn clamp_dt(dt: f32) -> f32 {
    if dt.is_nan() || dt <= 0.0 {
        0.0
    } else {
        dt.min(MAX_DT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Box of half-extent `r` around a centre point.
    pub fn centered(cx: f32, cy: f32, r: f32) -> Self {
        Self { x: cx - r, y: cy - r, w: r * 2.0, h: r * 2.0 }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        aabb_overlap(self, other)
    }
}

/// Two boxes overlap iff each near edge is strictly before the other's far edge.
pub fn aabb_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y
}

pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    (dx * dx + dy * dy).sqrt()
}

pub fn manhattan(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    (x1 - x2).abs() + (y1 - y2).abs()
}

pub fn circles_overlap(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
    distance(x1, y1, x2, y2) < r1 + r2
}

/// Teleport `v` to the opposite side once it is more than `margin` outside `[0, max]`.
pub fn wrap_coord(v: f32, max: f32, margin: f32) -> f32 {
    if v < -margin {
        max + margin
    } else if v > max + margin {
        -margin
    } else {
        v
    }
}
