//! Generic k-d tree for nearest-neighbour and range queries.
//!
//! Nodes are stored in an arena. Each node owns one point and splits its
//! subtree on `depth % dim`, using the median of the subtree's points so the
//! tree stays balanced.

use halo_math::{Vec2, Vec3};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// A point that can be indexed by a [`KdTree`].
pub trait KdPoint {
    /// Number of coordinates; `get` accepts axes below this.
    const DIMENSIONS: usize;

    /// Coordinate along `axis`.
    fn get(&self, axis: usize) -> f32;

    /// Squared Euclidean distance over the first `dim` axes.
    fn distance_squared_to<Q: KdPoint + ?Sized>(&self, other: &Q, dim: usize) -> f32 {
        (0..dim)
            .map(|axis| {
                let d = self.get(axis) - other.get(axis);
                d * d
            })
            .sum()
    }

    fn distance_to<Q: KdPoint + ?Sized>(&self, other: &Q, dim: usize) -> f32 {
        self.distance_squared_to(other, dim).sqrt()
    }
}

impl KdPoint for Vec3 {
    const DIMENSIONS: usize = 3;

    #[inline]
    fn get(&self, axis: usize) -> f32 {
        self[axis]
    }
}

impl KdPoint for Vec2 {
    const DIMENSIONS: usize = 2;

    #[inline]
    fn get(&self, axis: usize) -> f32 {
        self[axis]
    }
}

#[derive(Debug, Clone, Copy)]
struct KdNode {
    /// Index into [`KdTree::points`].
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Heap entry ordered by distance, largest on top.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_squared: f32,
    point: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_squared
            .total_cmp(&other.distance_squared)
            .then(self.point.cmp(&other.point))
    }
}

/// A balanced k-d tree over points of type `P`.
pub struct KdTree<P> {
    points: Vec<P>,
    nodes: Vec<KdNode>,
    root: Option<usize>,
    dim: usize,
}

impl<P: KdPoint> KdTree<P> {
    /// Build a tree over the first `dim` coordinates of `points`.
    ///
    /// `dim` is clamped to `1..=P::DIMENSIONS`. Query targets must have at
    /// least [`KdTree::dim`] coordinates.
    pub fn build(points: Vec<P>, dim: usize) -> Self {
        let requested = dim;
        let dim = dim.clamp(1, P::DIMENSIONS.max(1));
        if dim != requested {
            log::warn!(
                "k-d tree: {} split dimensions requested, points have {}; using {}",
                requested,
                P::DIMENSIONS,
                dim
            );
        }
        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        let mut depth = 0;
        let root = build_recursive(&points, &mut order, 0, dim, &mut nodes, &mut depth);

        log::debug!(
            "k-d tree built: {} points, {} dims, depth {}",
            points.len(),
            dim,
            depth
        );

        Self {
            points,
            nodes,
            root,
            dim,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// All indexed points, in arena order.
    pub fn points(&self) -> &[P] {
        &self.points
    }

    /// The `k` points closest to `target`, nearest first, together with the
    /// distance to the farthest of them (0 when nothing was found).
    pub fn k_nearest<Q: KdPoint + ?Sized>(&self, target: &Q, k: usize) -> (Vec<&P>, f32) {
        if k == 0 {
            return (Vec::new(), 0.0);
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = self.root {
            self.nearest_recursive(root, target, k, &mut heap);
        }

        let max_distance = heap
            .peek()
            .map_or(0.0, |c: &Candidate| c.distance_squared.sqrt());
        let found = heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| &self.points[c.point])
            .collect();
        (found, max_distance)
    }

    fn nearest_recursive<Q: KdPoint + ?Sized>(
        &self,
        index: usize,
        target: &Q,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = self.nodes[index];
        let point = &self.points[node.point];

        let candidate = Candidate {
            distance_squared: point.distance_squared_to(target, self.dim),
            point: node.point,
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }

        let diff = target.get(node.axis) - point.get(node.axis);
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.nearest_recursive(near, target, k, heap);
        }
        if let Some(far) = far {
            let worth_visiting = heap.len() < k
                || heap
                    .peek()
                    .is_some_and(|worst| diff * diff < worst.distance_squared);
            if worth_visiting {
                self.nearest_recursive(far, target, k, heap);
            }
        }
    }

    /// Every point within `radius` of `target` (boundary included), in
    /// breadth-first order.
    pub fn range_search<Q: KdPoint + ?Sized>(&self, target: &Q, radius: f32) -> Vec<&P> {
        let mut found = Vec::new();
        if radius < 0.0 {
            return found;
        }
        let radius_squared = radius * radius;

        let mut queue: VecDeque<usize> = self.root.into_iter().collect();
        while let Some(index) = queue.pop_front() {
            let node = self.nodes[index];
            let point = &self.points[node.point];
            if point.distance_squared_to(target, self.dim) <= radius_squared {
                found.push(point);
            }

            let diff = target.get(node.axis) - point.get(node.axis);
            if diff.abs() <= radius {
                queue.extend(node.left);
                queue.extend(node.right);
            } else if diff < 0.0 {
                queue.extend(node.left);
            } else {
                queue.extend(node.right);
            }
        }
        found
    }
}

fn build_recursive<P: KdPoint>(
    points: &[P],
    order: &mut [usize],
    depth: usize,
    dim: usize,
    nodes: &mut Vec<KdNode>,
    max_depth: &mut usize,
) -> Option<usize> {
    if order.is_empty() {
        return None;
    }
    *max_depth = (*max_depth).max(depth + 1);

    let axis = depth % dim;
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        points[a].get(axis).total_cmp(&points[b].get(axis))
    });

    let index = nodes.len();
    nodes.push(KdNode {
        point: order[mid],
        axis,
        left: None,
        right: None,
    });

    let (lower, rest) = order.split_at_mut(mid);
    let upper = &mut rest[1..];
    let left = build_recursive(points, lower, depth + 1, dim, nodes, max_depth);
    let right = build_recursive(points, upper, depth + 1, dim, nodes, max_depth);
    nodes[index].left = left;
    nodes[index].right = right;
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(count: usize, seed: u64) -> Vec<Vec3> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                )
            })
            .collect()
    }

    fn sorted_by_distance(points: &[Vec3], target: Vec3) -> Vec<f32> {
        let mut d: Vec<f32> = points
            .iter()
            .map(|p| p.distance_squared_to(&target, 3))
            .collect();
        d.sort_by(f32::total_cmp);
        d
    }

    #[test]
    fn test_empty_tree() {
        let tree: KdTree<Vec3> = KdTree::build(Vec::new(), 3);
        assert!(tree.is_empty());
        let (found, max) = tree.k_nearest(&Vec3::ZERO, 5);
        assert!(found.is_empty());
        assert_eq!(max, 0.0);
        assert!(tree.range_search(&Vec3::ZERO, 100.0).is_empty());
    }

    #[test]
    fn test_k_nearest_matches_brute_force() {
        let points = random_points(300, 3);
        let tree = KdTree::build(points.clone(), 3);
        let mut rng = StdRng::seed_from_u64(4);

        for _ in 0..50 {
            let target = Vec3::new(
                rng.gen_range(-6.0..6.0),
                rng.gen_range(-6.0..6.0),
                rng.gen_range(-6.0..6.0),
            );
            let expected = sorted_by_distance(&points, target);

            for k in [1, 2, 7, 50, 299, 300, 400] {
                let (found, max) = tree.k_nearest(&target, k);
                let count = k.min(points.len());
                assert_eq!(found.len(), count);

                // Same distance multiset as the first k of a full sort.
                for (p, want) in found.iter().zip(&expected[..count]) {
                    assert!((p.distance_squared_to(&target, 3) - want).abs() < 1e-4);
                }
                assert!((max - expected[count - 1].sqrt()).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_k_nearest_every_k_small_set() {
        let points = random_points(25, 8);
        let tree = KdTree::build(points.clone(), 3);
        let target = Vec3::new(0.3, -0.2, 1.1);
        let expected = sorted_by_distance(&points, target);

        for k in 1..=points.len() {
            let (found, max) = tree.k_nearest(&target, k);
            assert_eq!(found.len(), k);
            assert!((max * max - expected[k - 1]).abs() < 1e-4);
        }
        assert!(tree.k_nearest(&target, 0).0.is_empty());
    }

    #[test]
    fn test_range_search_matches_brute_force() {
        let points = random_points(400, 5);
        let tree = KdTree::build(points.clone(), 3);
        let mut rng = StdRng::seed_from_u64(6);

        for _ in 0..50 {
            let target = points[rng.gen_range(0..points.len())]
                + Vec3::new(rng.gen_range(-0.5..0.5), 0.0, rng.gen_range(-0.5..0.5));
            for radius in [0.0, 0.3, 1.0, 2.5, 1000.0] {
                let mut found: Vec<f32> = tree
                    .range_search(&target, radius)
                    .iter()
                    .map(|p| p.distance_squared_to(&target, 3))
                    .collect();
                found.sort_by(f32::total_cmp);

                let expected: Vec<f32> = sorted_by_distance(&points, target)
                    .into_iter()
                    .filter(|&d| d <= radius * radius)
                    .collect();
                assert_eq!(found, expected, "radius {}", radius);
            }
        }
    }

    #[test]
    fn test_range_search_zero_radius_hits_duplicates() {
        // Duplicates land on both sides of a split plane.
        let mut points = random_points(40, 7);
        let dup = Vec3::new(1.0, 1.0, 1.0);
        points.extend([dup; 5]);
        let tree = KdTree::build(points, 3);

        assert_eq!(tree.range_search(&dup, 0.0).len(), 5);
        assert_eq!(tree.range_search(&dup, 1e6).len(), 45);
        assert!(tree.range_search(&dup, -1.0).is_empty());
    }

    #[test]
    fn test_two_dimensional_tree() {
        let points: Vec<Vec2> = (0..10)
            .flat_map(|x| (0..10).map(move |y| Vec2::new(x as f32, y as f32)))
            .collect();
        let tree = KdTree::build(points, 2);
        assert_eq!(tree.dim(), 2);

        let (found, max) = tree.k_nearest(&Vec2::new(4.1, 4.1), 1);
        assert_eq!(*found[0], Vec2::new(4.0, 4.0));
        assert!((max - 0.1 * 2f32.sqrt()).abs() < 1e-5);
        assert_eq!(tree.range_search(&Vec2::new(5.0, 5.0), 1.0).len(), 5);
    }

    #[test]
    fn test_build_clamps_dimension_to_point_type() {
        let points: Vec<Vec2> = (0..20)
            .map(|i| Vec2::new(i as f32, (i * 7 % 20) as f32))
            .collect();
        let tree = KdTree::build(points, 3);
        assert_eq!(tree.dim(), 2);
        let (found, _) = tree.k_nearest(&Vec2::new(3.0, 1.0), 1);
        assert_eq!(*found[0], Vec2::new(3.0, 1.0));

        let tree = KdTree::build(random_points(30, 2), 0);
        assert_eq!(tree.dim(), 1);
        assert_eq!(tree.range_search(&Vec3::ZERO, 1e6).len(), 30);
    }
}
