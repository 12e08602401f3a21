use crate::math::Vec3;

/// Axis-aligned bounding box
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb3 { min, max }
    }

    /// Returns `None` for an empty point set.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Aabb3::new(first, first);
        for p in iter {
            out.expand(p);
        }
        Some(out)
    }

    pub fn expand(&mut self, p: Vec3) {
        self.min = Vec3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vec3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max).scale(0.5)
    }
}

/// Enclosing sphere used by renderers for culling.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f64,
}

impl BoundingSphere {
    /// Degenerate sphere reported for buffers without vertices.
    pub const EMPTY: Self = Self {
        center: Vec3::ZERO,
        radius: 0.0,
    };

    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Centers the sphere on the box of `points` and grows it to the farthest
    /// point. The point set is walked twice.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
        I::IntoIter: Clone,
    {
        let iter = points.into_iter();
        let Some(aabb) = Aabb3::from_points(iter.clone()) else {
            return Self::EMPTY;
        };
        Self::enclosing(aabb, iter)
    }

    /// Same as [`BoundingSphere::from_points`] with a precomputed box.
    pub fn enclosing(aabb: Aabb3, points: impl IntoIterator<Item = Vec3>) -> Self {
        let center = aabb.center();
        let max_sq = points
            .into_iter()
            .map(|p| {
                let d = p - center;
                d.dot(d)
            })
            .fold(0.0_f64, f64::max);
        Self::new(center, max_sq.sqrt())
    }

    pub fn is_empty(&self) -> bool {
        self.radius <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Aabb3, BoundingSphere};
    use crate::math::Vec3;

    #[test]
    fn aabb_of_empty_set_is_none() {
        assert_eq!(Aabb3::from_points(std::iter::empty::<Vec3>()), None);
    }

    #[test]
    fn aabb_spans_all_points() {
        let bounds = Aabb3::from_points([
            Vec3::new(-1.0, 0.5, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, -1.0, 0.0),
        ])
        .expect("bounds");
        assert_eq!(bounds.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(bounds.center(), Vec3::ZERO);
    }

    #[test]
    fn sphere_is_centered_on_box() {
        let pts = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        let s = BoundingSphere::from_points(pts);
        assert_eq!(s.center, Vec3::new(1.0, 1.0, 0.0));
        assert!((s.radius - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_point_set_gives_empty_sphere() {
        let s = BoundingSphere::from_points(Vec::<Vec3>::new());
        assert_eq!(s, BoundingSphere::EMPTY);
        assert!(s.is_empty());
    }
}
