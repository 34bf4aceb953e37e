//! Triangle meshes backed by a BVH.

use crate::bvh::Bvh;
use crate::error::{RenderError, RenderResult};
use crate::hittable::{Hit, Hittable};
use crate::{Material, Triangle};
use halo_math::{Aabb, Ray, Vec2, Vec3};
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;

/// Triangles intersected through a BVH.
pub struct Mesh {
    bvh: Bvh,
}

impl Mesh {
    /// Build a mesh from triangles that already carry their materials.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        Self {
            bvh: Bvh::new(triangles),
        }
    }

    /// Build a mesh from an indexed vertex list.
    ///
    /// Index triples that reference missing vertices are skipped.
    pub fn from_indexed(
        positions: &[Vec3],
        texcoords: Option<&[Vec2]>,
        indices: &[[u32; 3]],
        material: Arc<Material>,
    ) -> Self {
        let mut triangles = Vec::with_capacity(indices.len());
        push_indexed(&mut triangles, positions, texcoords, indices, &material);
        Self::from_triangles(triangles)
    }

    /// Load every model of a Wavefront OBJ file, triangulating polygons.
    ///
    /// OBJ materials are ignored; all triangles share `material`.
    pub fn load_obj(path: impl AsRef<Path>, material: Arc<Material>) -> RenderResult<Self> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )?;

        let mut triangles = Vec::new();
        for model in &models {
            let mesh = &model.mesh;
            let positions: Vec<Vec3> = mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect();
            let texcoords: Vec<Vec2> = mesh
                .texcoords
                .chunks_exact(2)
                .map(|t| Vec2::new(t[0], t[1]))
                .collect();
            let indices: Vec<[u32; 3]> = mesh
                .indices
                .chunks_exact(3)
                .map(|i| [i[0], i[1], i[2]])
                .collect();
            let texcoords = (!texcoords.is_empty()).then_some(texcoords.as_slice());
            push_indexed(&mut triangles, &positions, texcoords, &indices, &material);
        }

        if triangles.is_empty() {
            return Err(RenderError::EmptyMesh(path.to_path_buf()));
        }
        log::info!(
            "Loaded {} triangles from {} model(s) in {}",
            triangles.len(),
            models.len(),
            path.display()
        );
        Ok(Self::from_triangles(triangles))
    }

    /// Axis-aligned box with outward-facing triangles.
    pub fn cuboid(min: Vec3, max: Vec3, material: Arc<Material>) -> Self {
        let corner = |x: bool, y: bool, z: bool| {
            Vec3::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };
        let positions: Vec<Vec3> = (0..8)
            .map(|i| corner(i & 1 != 0, i & 2 != 0, i & 4 != 0))
            .collect();
        #[rustfmt::skip]
        let indices = [
            [0, 4, 6], [0, 6, 2], // -x
            [1, 3, 7], [1, 7, 5], // +x
            [0, 1, 5], [0, 5, 4], // -y
            [2, 6, 7], [2, 7, 3], // +y
            [0, 2, 3], [0, 3, 1], // -z
            [4, 5, 7], [4, 7, 6], // +z
        ];
        Self::from_indexed(&positions, None, &indices, material)
    }

    /// Tessellated sphere with `stacks` latitude bands and `slices` longitude
    /// segments.
    pub fn uv_sphere(
        center: Vec3,
        radius: f32,
        stacks: u32,
        slices: u32,
        material: Arc<Material>,
    ) -> Self {
        let stacks = stacks.max(2);
        let slices = slices.max(3);

        let mut positions = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize);
        let mut texcoords = Vec::with_capacity(positions.capacity());
        for i in 0..=stacks {
            let v = i as f32 / stacks as f32;
            let theta = v * PI;
            for j in 0..=slices {
                let u = j as f32 / slices as f32;
                let phi = u * 2.0 * PI;
                let dir = Vec3::new(theta.sin() * phi.cos(), theta.cos(), -theta.sin() * phi.sin());
                positions.push(center + radius * dir);
                texcoords.push(Vec2::new(u, 1.0 - v));
            }
        }

        let row = slices + 1;
        let mut indices = Vec::with_capacity((stacks * slices * 2) as usize);
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = a + row;
                // Pole rows would produce zero-area triangles.
                if i != 0 {
                    indices.push([a, b, a + 1]);
                }
                if i != stacks - 1 {
                    indices.push([a + 1, b, b + 1]);
                }
            }
        }

        Self::from_indexed(&positions, Some(&texcoords), &indices, material)
    }

    pub fn len(&self) -> usize {
        self.bvh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bvh.is_empty()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bvh.bounding_box()
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }
}

/// Append the triangles named by `indices`, skipping out-of-range triples.
fn push_indexed(
    triangles: &mut Vec<Triangle>,
    positions: &[Vec3],
    texcoords: Option<&[Vec2]>,
    indices: &[[u32; 3]],
    material: &Arc<Material>,
) {
    let mut skipped = 0;
    for &[a, b, c] in indices {
        let fetch = |i: u32| positions.get(i as usize).copied();
        let (Some(v0), Some(v1), Some(v2)) = (fetch(a), fetch(b), fetch(c)) else {
            skipped += 1;
            continue;
        };
        let tri = Triangle::new(v0, v1, v2, material.clone());
        triangles.push(match texcoords {
            Some(uv) if [a, b, c].iter().all(|&i| (i as usize) < uv.len()) => {
                tri.with_texcoords([uv[a as usize], uv[b as usize], uv[c as usize]])
            }
            _ => tri,
        });
    }

    if skipped > 0 {
        log::warn!("Mesh: skipped {} triangles with out-of-range indices", skipped);
    }
}

impl Hittable for Mesh {
    fn intersect<'a>(&'a self, ray: &Ray, hit: &mut Hit<'a>, t_min: f32) -> bool {
        self.bvh.intersect(ray, hit, t_min)
    }

    fn visit_materials(&self, visit: &mut dyn FnMut(&Material)) {
        self.bvh.visit_materials(visit);
    }
}
