//! Stateless 2D geometry used by movement and hit resolution
//!
//! Everything here works on plain values: no entity ids, no room state.
//! Rays take a unit-length direction, so returned distances are in world units.

/// A point or direction on the arena floor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[cfg(test)]
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians)
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle, `x`/`y` is the minimum corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }
}

/// Point-in-rectangle test (edges count as inside)
pub fn point_in_rect(point: Vec2, rect: &Rect) -> bool {
    point.x >= rect.x && point.x <= rect.max_x() && point.y >= rect.y && point.y <= rect.max_y()
}

/// Rectangle-circle overlap via the closest point on the rectangle
pub fn rect_circle_overlap(rect: &Rect, center: Vec2, radius: f32) -> bool {
    let closest_x = center.x.clamp(rect.x, rect.max_x());
    let closest_y = center.y.clamp(rect.y, rect.max_y());
    let dx = center.x - closest_x;
    let dy = center.y - closest_y;
    dx * dx + dy * dy < radius * radius
}

/// Ray-rectangle intersection (slab method).
///
/// Returns the smallest positive distance at which the ray crosses the
/// rectangle boundary, or `None` when the rectangle is missed or behind.
pub fn ray_rect(origin: Vec2, dir: Vec2, rect: &Rect) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for (o, d, lo, hi) in [
        (origin.x, dir.x, rect.x, rect.max_x()),
        (origin.y, dir.y, rect.y, rect.max_y()),
    ] {
        if d.abs() < f32::EPSILON {
            // Parallel to this slab: must already be between its planes
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t1 = (lo - o) * inv;
        let mut t2 = (hi - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    if t_min > 0.0 {
        Some(t_min)
    } else if t_max > 0.0 {
        Some(t_max)
    } else {
        None
    }
}

/// Ray-circle intersection (quadratic).
///
/// Returns the smallest positive root, or `None` when the circle is missed
/// or entirely behind the origin.
pub fn ray_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let offset = origin - center;
    let b = offset.dot(dir);
    let c = offset.dot(offset) - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let near = -b - root;
    let far = -b + root;
    if near > 0.0 {
        Some(near)
    } else if far > 0.0 {
        Some(far)
    } else {
        None
    }
}

/// Push a circle out of a rectangle along the center-to-center vector.
///
/// The new center sits where that vector leaves the rectangle grown by
/// `radius + margin` on every side. A circle exactly at the rectangle center
/// is pushed along +x.
pub fn push_out_of_rect(center: Vec2, radius: f32, rect: &Rect, margin: f32) -> Vec2 {
    let rect_center = rect.center();
    let mut dir = center - rect_center;
    if dir.x.abs() < f32::EPSILON && dir.y.abs() < f32::EPSILON {
        dir = Vec2::new(1.0, 0.0);
    }

    let clear_x = rect.width / 2.0 + radius + margin;
    let clear_y = rect.height / 2.0 + radius + margin;

    let scale_x = if dir.x.abs() > f32::EPSILON {
        clear_x / dir.x.abs()
    } else {
        f32::INFINITY
    };
    let scale_y = if dir.y.abs() > f32::EPSILON {
        clear_y / dir.y.abs()
    } else {
        f32::INFINITY
    };

    rect_center + dir * scale_x.min(scale_y)
}
