use glam::Vec3;

/// Rays start this far along their direction to avoid re-hitting the
/// surface they leave from.
pub const RAY_T_MIN: f32 = 1e-4;

/// Leaves hold at most this many boxes.
const BVH_LEAF_SIZE: usize = 2;

/// Closest surface found along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub distance: f32,
    pub position: Vec3,
    /// Outward geometric normal of the surface.
    pub normal: Vec3,
    pub albedo: Vec3,
    pub emission: Vec3,
    /// False when the ray hit the surface from inside the geometry.
    pub front_face: bool,
}

/// Ray queries against scene geometry.
///
/// Implementations track whether their acceleration data reflects the
/// current geometry; tracing refuses to run against a stale structure.
pub trait AccelerationStructure: Send + Sync {
    /// Rebuild acceleration data after geometry edits.
    fn build(&mut self);

    /// Whether `build` has run since the last edit.
    fn is_built(&self) -> bool;

    /// Closest hit with `RAY_T_MIN < t <= t_max`. `direction` is unit length.
    fn intersect(&self, origin: Vec3, direction: Vec3, t_max: f32) -> Option<SurfaceHit>;

    /// Whether anything blocks the segment `origin + t * direction`, `t <= t_max`.
    fn occluded(&self, origin: Vec3, direction: Vec3, t_max: f32) -> bool {
        self.intersect(origin, direction, t_max).is_some()
    }
}

/// Axis-aligned box with a diffuse material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneBox {
    pub min: Vec3,
    pub max: Vec3,
    pub albedo: Vec3,
    pub emission: Vec3,
}

impl SceneBox {
    pub fn new(min: Vec3, max: Vec3, albedo: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            albedo,
            emission: Vec3::ZERO,
        }
    }

    pub fn with_emission(mut self, emission: Vec3) -> Self {
        self.emission = emission;
        self
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Ray/box slab test. Rays starting inside the box hit its far side as
    /// a back face.
    pub fn intersect(&self, origin: Vec3, direction: Vec3, t_max: f32) -> Option<SurfaceHit> {
        let inv = direction.recip();
        let t0 = (self.min - origin) * inv;
        let t1 = (self.max - origin) * inv;
        let t_near = t0.min(t1);
        let t_far = t0.max(t1);
        let enter = t_near.max_element();
        let exit = t_far.min_element();
        if exit < enter || exit <= RAY_T_MIN {
            return None;
        }

        let (distance, front_face, axis) = if enter > RAY_T_MIN {
            (enter, true, argmax(t_near))
        } else {
            (exit, false, argmin(t_far))
        };
        if distance > t_max {
            return None;
        }

        // Outward normal: against the ray on entry, along it on exit.
        let mut normal = Vec3::ZERO;
        let sign = if direction[axis] >= 0.0 { 1.0 } else { -1.0 };
        normal[axis] = if front_face { -sign } else { sign };

        Some(SurfaceHit {
            distance,
            position: origin + direction * distance,
            normal,
            albedo: self.albedo,
            emission: self.emission,
            front_face,
        })
    }
}

fn argmax(v: Vec3) -> usize {
    if v.x >= v.y && v.x >= v.z {
        0
    } else if v.y >= v.z {
        1
    } else {
        2
    }
}

fn argmin(v: Vec3) -> usize {
    if v.x <= v.y && v.x <= v.z {
        0
    } else if v.y <= v.z {
        1
    } else {
        2
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    fn grow(&mut self, min: Vec3, max: Vec3) {
        self.min = self.min.min(min);
        self.max = self.max.max(max);
    }

    /// Entry distance if the ray overlaps the box within `[0, t_max]`.
    fn hit(&self, origin: Vec3, inv_dir: Vec3, t_max: f32) -> Option<f32> {
        let t0 = (self.min - origin) * inv_dir;
        let t1 = (self.max - origin) * inv_dir;
        let enter = t0.min(t1).max_element().max(0.0);
        let exit = t0.max(t1).min_element().min(t_max);
        (enter <= exit).then_some(enter)
    }
}

/// Node in the flat BVH array. Index 0 = root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub min: Vec3,
    pub max: Vec3,
    /// Leaf: first entry in the box order. Interior: index of the left child.
    pub first: u32,
    /// Leaf: number of boxes. Interior: 0.
    pub count: u32,
    /// Interior only: index of the right child.
    pub right: u32,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// A scene of axis-aligned boxes behind a median-split BVH.
///
/// Any edit marks the BVH stale; call [`AccelerationStructure::build`]
/// before tracing again.
#[derive(Debug, Clone, Default)]
pub struct BoxScene {
    boxes: Vec<SceneBox>,
    nodes: Vec<BvhNode>,
    order: Vec<u32>,
    built: bool,
}

impl BoxScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_boxes(boxes: Vec<SceneBox>) -> Self {
        let mut scene = Self {
            boxes,
            ..Self::default()
        };
        scene.build();
        scene
    }

    pub fn add_box(&mut self, scene_box: SceneBox) {
        self.boxes.push(scene_box);
        self.built = false;
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
        self.nodes.clear();
        self.order.clear();
        self.built = false;
    }

    pub fn boxes(&self) -> &[SceneBox] {
        &self.boxes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Flat BVH, root first. Empty until built.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Box indices in leaf order; leaves reference ranges of this.
    pub fn box_order(&self) -> &[u32] {
        &self.order
    }

    fn build_node(&mut self, start: usize, end: usize) -> u32 {
        let mut bounds = Aabb::EMPTY;
        let mut centroids = Aabb::EMPTY;
        for &i in &self.order[start..end] {
            let b = &self.boxes[i as usize];
            bounds.grow(b.min, b.max);
            let c = b.centroid();
            centroids.grow(c, c);
        }

        let index = self.nodes.len() as u32;
        self.nodes.push(BvhNode {
            min: bounds.min,
            max: bounds.max,
            first: start as u32,
            count: (end - start) as u32,
            right: 0,
        });
        if end - start <= BVH_LEAF_SIZE {
            return index;
        }

        let axis = argmax(centroids.max - centroids.min);
        let boxes = &self.boxes;
        let mid = start + (end - start) / 2;
        self.order[start..end].select_nth_unstable_by(mid - start, |a, b| {
            let ca = boxes[*a as usize].centroid()[axis];
            let cb = boxes[*b as usize].centroid()[axis];
            ca.total_cmp(&cb)
        });

        let left = self.build_node(start, mid);
        let right = self.build_node(mid, end);
        let node = &mut self.nodes[index as usize];
        node.first = left;
        node.count = 0;
        node.right = right;
        index
    }
}

impl AccelerationStructure for BoxScene {
    fn build(&mut self) {
        self.nodes.clear();
        self.order = (0..self.boxes.len() as u32).collect();
        if !self.boxes.is_empty() {
            self.build_node(0, self.boxes.len());
        }
        self.built = true;
        log::debug!(
            "Built scene BVH: {} boxes, {} nodes",
            self.boxes.len(),
            self.nodes.len()
        );
    }

    fn is_built(&self) -> bool {
        self.built
    }

    fn intersect(&self, origin: Vec3, direction: Vec3, t_max: f32) -> Option<SurfaceHit> {
        if self.nodes.is_empty() {
            return None;
        }
        let inv_dir = direction.recip();
        let mut closest: Option<SurfaceHit> = None;
        let mut limit = t_max;
        let mut stack = vec![0u32];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            let bounds = Aabb {
                min: node.min,
                max: node.max,
            };
            if bounds.hit(origin, inv_dir, limit).is_none() {
                continue;
            }
            if !node.is_leaf() {
                stack.push(node.right);
                stack.push(node.first);
                continue;
            }
            let start = node.first as usize;
            for &i in &self.order[start..start + node.count as usize] {
                if let Some(hit) = self.boxes[i as usize].intersect(origin, direction, limit) {
                    limit = hit.distance;
                    closest = Some(hit);
                }
            }
        }
        closest
    }
}
