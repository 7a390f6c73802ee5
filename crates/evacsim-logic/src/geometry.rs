//! Geometric primitives shared by the force model and the planner.
//!
//! Pure functions over `DVec2`. Walls are finite segments; the planner also
//! needs intersections of infinite lines, which may not exist.

use glam::DVec2;

/// Relative tolerance for [`is_between`].
pub const BETWEEN_TOLERANCE: f64 = 1e-9;

/// Relative tolerance below which two lines are treated as parallel.
pub const PARALLEL_TOLERANCE: f64 = 1e-12;

/// A wall segment between two endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub p0: DVec2,
    pub p1: DVec2,
}

impl Segment {
    pub const fn new(p0: DVec2, p1: DVec2) -> Self {
        Self { p0, p1 }
    }

    /// Convenience constructor from raw coordinates.
    pub fn from_coords(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(DVec2::new(x0, y0), DVec2::new(x1, y1))
    }

    pub fn length(&self) -> f64 {
        self.p0.distance(self.p1)
    }

    /// Zero-length segments have no defined normal.
    pub fn is_degenerate(&self) -> bool {
        self.length() <= 0.0 || !self.length().is_finite()
    }

    /// Unit vector pointing from `p1` to `p0`.
    pub fn direction(&self) -> DVec2 {
        (self.p0 - self.p1) / self.length()
    }

    pub fn endpoints(&self) -> [DVec2; 2] {
        [self.p0, self.p1]
    }
}

/// Result of a point-to-segment query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallContact {
    /// Euclidean distance from the point to the nearest point of the segment.
    pub distance: f64,
    /// Unit vector from the nearest point towards the query point.
    pub normal: DVec2,
    /// `normal` rotated by +90°.
    pub tangent: DVec2,
    /// Closest point on the segment.
    pub nearest: DVec2,
}

// ── Primitives ──────────────────────────────────────────────────────────

/// Gate for contact forces: `max(x, 0)`.
#[inline]
pub fn ramp(x: f64) -> f64 {
    x.max(0.0)
}

/// Unit vector from `from` to `to`, or zero if the points coincide.
#[inline]
pub fn heading(from: DVec2, to: DVec2) -> DVec2 {
    (to - from).normalize_or_zero()
}

/// Distance from `point` to the closed segment `seg`.
///
/// The projection parameter is clamped to `[0, 1]`, so points beyond an
/// endpoint measure to that endpoint. If `point` lies exactly on the
/// segment the normal is undefined (NaN); wall forces never see this case
/// as long as agents stay at least a radius away from walls.
pub fn point_segment_distance(point: DVec2, seg: &Segment) -> WallContact {
    let line = seg.p1 - seg.p0;
    let rel = point - seg.p0;
    let len_sq = line.length_squared();
    let t = if len_sq > 0.0 {
        (line.dot(rel) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let nearest = seg.p0 + line * t;
    let offset = point - nearest;
    let distance = offset.length();
    let normal = offset / distance;
    WallContact {
        distance,
        normal,
        tangent: normal.perp(),
        nearest,
    }
}

/// Intersection of the infinite lines through `(a1, a2)` and `(b1, b2)`.
///
/// Returns `None` for parallel (or degenerate) lines.
pub fn segment_intersection(a1: DVec2, a2: DVec2, b1: DVec2, b2: DVec2) -> Option<DVec2> {
    let da = a2 - a1;
    let db = b2 - b1;
    let dp = a1 - b1;
    let dap = da.perp();
    let denom = dap.dot(db);
    let scale = da.length() * db.length();
    if scale == 0.0 || denom.abs() <= PARALLEL_TOLERANCE * scale {
        return None;
    }
    let num = dap.dot(dp);
    Some(db * (num / denom) + b1)
}

/// True if `c` lies on the closed segment `[a, b]`.
///
/// Uses `|a−c| + |c−b| ≈ |a−b|` with a tolerance relative to the segment
/// length; exact equality misses intersection points computed in floating
/// point.
pub fn is_between(a: DVec2, b: DVec2, c: DVec2) -> bool {
    let span = a.distance(b);
    let detour = a.distance(c) + c.distance(b);
    (detour - span).abs() <= BETWEEN_TOLERANCE * span.max(1.0)
}
