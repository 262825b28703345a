use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        if points.is_empty() || points.iter().any(|point| !point.x.is_finite() || !point.y.is_finite())
        {
            return None;
        }
        let (min, max) = points.iter().fold(
            (vec2(f32::INFINITY, f32::INFINITY), vec2(f32::NEG_INFINITY, f32::NEG_INFINITY)),
            |(min, max), point| (min.min(*point), max.max(*point)),
        );

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: (span * 0.5) + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        let offset = (point - self.center).abs();
        offset.x <= self.half_extent && offset.y <= self.half_extent
    }

    fn quadrant(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign_x = if quadrant & 1 == 0 { -1.0 } else { 1.0 };
        let sign_y = if quadrant & 2 == 0 { -1.0 } else { 1.0 };
        Self {
            center: self.center + vec2(sign_x * quarter, sign_y * quarter),
            half_extent: quarter,
        }
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Squared gap between two boxes, zero when they touch or overlap.
    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap = ((self.center - other.center).abs() - vec2(reach, reach)).max(Vec2::ZERO);
        gap.length_sq()
    }
}

/// Region quadtree over body positions, carrying the centroid and body count of each cell.
pub(super) struct Quad {
    pub(super) bounds: QuadBounds,
    pub(super) centroid: Vec2,
    pub(super) count: usize,
    pub(super) members: Vec<usize>,
    pub(super) children: Vec<Quad>,
}

impl Quad {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = QuadBounds::enclosing(positions)?;
        Some(Self::subdivide(bounds, (0..positions.len()).collect(), positions, 0))
    }

    fn subdivide(bounds: QuadBounds, members: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let count = members.len();
        let centroid = if count == 0 {
            bounds.center
        } else {
            members
                .iter()
                .fold(Vec2::ZERO, |sum, &index| sum + positions[index])
                / count as f32
        };

        let mut quad = Self {
            bounds,
            centroid,
            count,
            members,
            children: Vec::new(),
        };
        if depth >= MAX_DEPTH || count <= LEAF_CAPACITY {
            return quad;
        }

        let mut buckets: [Vec<usize>; 4] = Default::default();
        for &index in &quad.members {
            buckets[bounds.quadrant(positions[index])].push(index);
        }
        quad.children = buckets
            .into_iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(quadrant, bucket)| {
                Self::subdivide(bounds.child(quadrant), bucket, positions, depth + 1)
            })
            .collect();
        quad.members.clear();
        quad
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
