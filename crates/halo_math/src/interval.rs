/// Closed scalar range `[min, max]`: ray parameter bounds or one axis of an
/// [`Aabb`](crate::Aabb).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Contains nothing; the identity for [`Interval::surrounding`].
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Width of the range; negative when empty.
    #[inline]
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    #[inline]
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Grow by `delta` in total, half on each side.
    pub fn expand(&self, delta: f32) -> Interval {
        let half = delta * 0.5;
        Interval::new(self.min - half, self.max + half)
    }

    /// Smallest range covering both `a` and `b`.
    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_bounds_are_inclusive() {
        let t = Interval::new(1.0, 3.0);
        assert!(t.contains(1.0) && t.contains(3.0) && t.contains(2.5));
        assert!(!t.contains(0.999) && !t.contains(3.001));
        assert_eq!(t.size(), 2.0);
    }

    #[test]
    fn test_expand_splits_padding() {
        let t = Interval::new(-1.0, 1.0).expand(1.0);
        assert_eq!(t, Interval::new(-1.5, 1.5));
    }

    #[test]
    fn test_empty_is_surrounding_identity() {
        assert!(Interval::EMPTY.is_empty());
        assert!(!Interval::EMPTY.contains(0.0));
        let t = Interval::new(4.0, 7.0);
        assert_eq!(Interval::surrounding(&Interval::EMPTY, &t), t);
        assert_eq!(
            Interval::surrounding(&t, &Interval::new(-2.0, 5.0)),
            Interval::new(-2.0, 7.0)
        );
    }
}
