//! Bounding Volume Hierarchy (BVH) over triangles.
//!
//! Nodes live in a flat arena and reference their children by index, so a
//! built tree is plain data that worker threads can share read-only.
//!
//! Construction splits a node only when it holds more than the leaf threshold,
//! along a randomly chosen axis at the median of each triangle's first vertex.
//! Triangles that straddle the median go to both children.

use crate::hittable::{Hit, Hittable};
use crate::{Material, Triangle};
use halo_math::{Aabb, Interval, Ray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Maximum primitives per leaf node before splitting.
pub const LEAF_THRESHOLD: usize = 2000;

/// Seed for the split-axis choice, so builds are reproducible.
const BUILD_SEED: u64 = 0x5EED_B7B7;

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    /// Range into [`Bvh::indices`].
    Leaf { start: usize, len: usize },
    Branch { left: usize, right: usize },
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bbox: Aabb,
    kind: NodeKind,
}

/// Shape statistics of a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_leaf_size: usize,
    /// Triangle references stored across all leaves (duplicates included).
    pub references: usize,
}

/// A BVH owning its triangles.
pub struct Bvh {
    triangles: Vec<Triangle>,
    /// Leaf contents, as indices into `triangles`.
    indices: Vec<u32>,
    nodes: Vec<BvhNode>,
    root: Option<usize>,
}

impl Bvh {
    /// Build a BVH with the default leaf threshold.
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self::with_leaf_size(triangles, LEAF_THRESHOLD, BUILD_SEED)
    }

    /// Build a BVH that splits nodes holding more than `leaf_size` triangles.
    pub fn with_leaf_size(triangles: Vec<Triangle>, leaf_size: usize, seed: u64) -> Self {
        let mut bvh = Self {
            triangles,
            indices: Vec::new(),
            nodes: Vec::new(),
            root: None,
        };

        if !bvh.triangles.is_empty() {
            let mut rng = StdRng::seed_from_u64(seed);
            let all: Vec<u32> = (0..bvh.triangles.len() as u32).collect();
            let root = bvh.build(all, leaf_size.max(1), &mut rng);
            bvh.root = Some(root);
        }

        let stats = bvh.stats();
        log::debug!(
            "BVH built: {} triangles, {} nodes, {} leaves, {} references (max leaf {})",
            bvh.triangles.len(),
            stats.nodes,
            stats.leaves,
            stats.references,
            stats.max_leaf_size
        );
        bvh
    }

    /// Recursive construction. Returns the arena index of the new node.
    fn build(&mut self, items: Vec<u32>, leaf_size: usize, rng: &mut StdRng) -> usize {
        let bbox = items.iter().fold(Aabb::EMPTY, |acc, &i| {
            Aabb::surrounding(&acc, &self.triangles[i as usize].bounding_box())
        });

        if items.len() <= leaf_size {
            return self.push_leaf(bbox, items);
        }

        let axis = rng.gen_range(0..3);
        let mut keys: Vec<f32> = items
            .iter()
            .map(|&i| self.triangles[i as usize].vertices()[0][axis])
            .collect();
        let mid_index = keys.len() / 2;
        let (_, &mut mid, _) = keys.select_nth_unstable_by(mid_index, f32::total_cmp);

        let mut left = Vec::new();
        let mut right = Vec::new();
        for &i in &items {
            let v = self.triangles[i as usize].vertices();
            let below = v.iter().all(|p| p[axis] < mid);
            let above = v.iter().all(|p| p[axis] > mid);
            if below {
                left.push(i);
            } else if above {
                right.push(i);
            } else {
                left.push(i);
                right.push(i);
            }
        }

        // A partition that is empty, or that failed to shrink because every
        // triangle straddles the median, would recurse forever.
        let n = items.len();
        if left.is_empty() || right.is_empty() || left.len() == n || right.len() == n {
            return self.push_leaf(bbox, items);
        }

        let left = self.build(left, leaf_size, rng);
        let right = self.build(right, leaf_size, rng);
        self.nodes.push(BvhNode {
            bbox,
            kind: NodeKind::Branch { left, right },
        });
        self.nodes.len() - 1
    }

    fn push_leaf(&mut self, bbox: Aabb, items: Vec<u32>) -> usize {
        let start = self.indices.len();
        let len = items.len();
        self.indices.extend(items);
        self.nodes.push(BvhNode {
            bbox,
            kind: NodeKind::Leaf { start, len },
        });
        self.nodes.len() - 1
    }

    /// Number of distinct triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Bounds of the whole tree.
    pub fn bounding_box(&self) -> Aabb {
        self.root.map_or(Aabb::EMPTY, |r| self.nodes[r].bbox)
    }

    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats {
            nodes: self.nodes.len(),
            ..BvhStats::default()
        };
        for node in &self.nodes {
            if let NodeKind::Leaf { len, .. } = node.kind {
                stats.leaves += 1;
                stats.references += len;
                stats.max_leaf_size = stats.max_leaf_size.max(len);
            }
        }
        stats
    }
}

impl Hittable for Bvh {
    fn intersect<'a>(&'a self, ray: &Ray, hit: &mut Hit<'a>, t_min: f32) -> bool {
        let Some(root) = self.root else {
            return false;
        };

        let mut hit_anything = false;
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bbox.hit(ray, Interval::new(t_min, hit.t)) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { start, len } => {
                    for &i in &self.indices[start..start + len] {
                        hit_anything |= self.triangles[i as usize].intersect(ray, hit, t_min);
                    }
                }
                NodeKind::Branch { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        hit_anything
    }

    fn visit_materials(&self, visit: &mut dyn FnMut(&Material)) {
        for tri in &self.triangles {
            visit(&**tri.material());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo_math::{Color, Vec3};
    use std::sync::Arc;

    fn random_triangles(count: usize, seed: u64) -> Vec<Triangle> {
        let mut rng = StdRng::seed_from_u64(seed);
        let material = Arc::new(Material::diffuse(Color::splat(0.5)));
        (0..count)
            .map(|_| {
                let c = Vec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                let mut jitter = || {
                    Vec3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    )
                };
                let (a, b, d) = (jitter(), jitter(), jitter());
                Triangle::new(c + a, c + b, c + d, material.clone())
            })
            .collect()
    }

    fn brute_force<'a>(tris: &'a [Triangle], ray: &Ray, t_min: f32) -> Hit<'a> {
        let mut hit = Hit::new();
        for tri in tris {
            tri.intersect(ray, &mut hit, t_min);
        }
        hit
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::new(vec![]);
        assert!(bvh.is_empty());
        assert_eq!(bvh.stats().nodes, 0);

        let mut hit = Hit::new();
        assert!(!bvh.intersect(&Ray::new(Vec3::ZERO, Vec3::Z), &mut hit, 1e-4));
    }

    #[test]
    fn test_small_set_is_single_leaf() {
        let bvh = Bvh::new(random_triangles(100, 1));
        let stats = bvh.stats();
        assert_eq!(stats.nodes, 1);
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.references, 100);
    }

    #[test]
    fn test_split_keeps_every_triangle() {
        let tris = random_triangles(500, 2);
        let bvh = Bvh::with_leaf_size(tris, 8, 3);
        let stats = bvh.stats();
        assert!(stats.leaves > 1);
        // Straddlers are duplicated, never dropped.
        assert!(stats.references >= 500);

        let mut seen = vec![false; 500];
        for &i in &bvh.indices {
            seen[i as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_coincident_triangles_degrade_to_leaf() {
        // Every triangle straddles every median: no partition can shrink.
        let material = Arc::new(Material::diffuse(Color::ONE));
        let tris: Vec<Triangle> = (0..50)
            .map(|_| {
                Triangle::new(
                    Vec3::new(-1.0, -1.0, -1.0),
                    Vec3::new(1.0, 1.0, 1.0),
                    Vec3::new(1.0, -1.0, 0.0),
                    material.clone(),
                )
            })
            .collect();
        let bvh = Bvh::with_leaf_size(tris, 4, 0);
        assert_eq!(bvh.stats().nodes, 1);
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let tris = random_triangles(800, 11);
        let reference = tris.clone();
        let bvh = Bvh::with_leaf_size(tris, 6, 5);
        let mut rng = StdRng::seed_from_u64(99);
        let mut hits = 0;

        for _ in 0..2_000 {
            let origin = Vec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let target = Vec3::new(
                rng.gen_range(-8.0..8.0),
                rng.gen_range(-8.0..8.0),
                rng.gen_range(-8.0..8.0),
            );
            let ray = Ray::new(origin, target - origin);

            let expected = brute_force(&reference, &ray, 1e-4);
            let mut hit = Hit::new();
            let found = bvh.intersect(&ray, &mut hit, 1e-4);

            assert_eq!(found, expected.t.is_finite());
            if found {
                hits += 1;
                assert!(
                    (hit.t - expected.t).abs() < 1e-4,
                    "bvh t = {}, brute force t = {}",
                    hit.t,
                    expected.t
                );
                assert!((hit.normal - expected.normal).length() < 1e-4);
            }
        }

        assert!(hits > 100, "too few hits to be meaningful: {}", hits);
    }
}
