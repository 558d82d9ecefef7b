use macroquad::prelude::{vec3, Vec3};
use noise::{Fbm, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{self, Bounds};
use crate::math::normalize_or_zero;

/// Bit set of collision layers a probe may hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const OBSTACLE: LayerMask = LayerMask(1);
    pub const TERRAIN: LayerMask = LayerMask(1 << 1);

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

/// Where a probe struck geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeHit {
    pub point: Vec3,
    /// Unit surface normal facing back toward the probe origin.
    pub normal: Vec3,
    pub distance: f32,
}

/// Static-geometry queries used for obstacle avoidance.
///
/// Implementations must terminate and must not mutate shared state; a probe
/// either reports the nearest hit within `max_distance` or `None`.
pub trait EnvironmentQuery {
    fn probe_obstacle(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<ProbeHit>;
}

impl<T: EnvironmentQuery + ?Sized> EnvironmentQuery for Box<T> {
    fn probe_obstacle(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<ProbeHit> {
        (**self).probe_obstacle(origin, direction, max_distance, layers)
    }
}

/// Empty environment: nothing to hit.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenSky;

impl EnvironmentQuery for OpenSky {
    fn probe_obstacle(&self, _: Vec3, _: Vec3, _: f32, _: LayerMask) -> Option<ProbeHit> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ObstacleShape {
    Sphere { center: Vec3, radius: f32 },
    Box(Bounds),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub shape: ObstacleShape,
    pub layer: LayerMask,
}

impl Obstacle {
    /// Ray test against this obstacle. `direction` must be unit length.
    /// A ray starting inside the shape does not hit it.
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ProbeHit> {
        match self.shape {
            ObstacleShape::Sphere { center, radius } => {
                raycast_sphere(origin, direction, max_distance, center, radius)
            }
            ObstacleShape::Box(bounds) => raycast_box(origin, direction, max_distance, &bounds),
        }
    }
}

/// Analytic spheres and boxes.
#[derive(Clone, Debug, Default)]
pub struct ObstacleField {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        self.obstacles.push(Obstacle {
            shape: ObstacleShape::Sphere { center, radius },
            layer: LayerMask::OBSTACLE,
        });
    }

    pub fn add_box(&mut self, bounds: Bounds) {
        if bounds.half_extents.min_element() <= 0.0 {
            return;
        }
        self.obstacles.push(Obstacle {
            shape: ObstacleShape::Box(bounds),
            layer: LayerMask::OBSTACLE,
        });
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl EnvironmentQuery for ObstacleField {
    fn probe_obstacle(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<ProbeHit> {
        let dir = normalize_or_zero(direction);
        if dir == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }
        self.obstacles
            .iter()
            .filter(|o| o.layer.intersects(layers))
            .filter_map(|o| o.raycast(origin, dir, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

fn raycast_sphere(
    origin: Vec3,
    dir: Vec3,
    max_distance: f32,
    center: Vec3,
    radius: f32,
) -> Option<ProbeHit> {
    let oc = origin - center;
    let c = oc.length_squared() - radius * radius;
    if c <= 0.0 {
        return None;
    }
    let b = oc.dot(dir);
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    if t < 0.0 || t > max_distance {
        return None;
    }
    let point = origin + dir * t;
    Some(ProbeHit {
        point,
        normal: normalize_or_zero(point - center),
        distance: t,
    })
}

/// Slab test. The hit normal is the face of the entry axis.
fn raycast_box(origin: Vec3, dir: Vec3, max_distance: f32, bounds: &Bounds) -> Option<ProbeHit> {
    if bounds.contains(origin) {
        return None;
    }
    let min = bounds.min().to_array();
    let max = bounds.max().to_array();
    let o = origin.to_array();
    let d = dir.to_array();

    let mut t_enter = 0.0f32;
    let mut t_exit = max_distance;
    let mut entry_axis = None;

    for axis in 0..3 {
        if d[axis].abs() < config::MIN_SEPARATION_DISTANCE {
            if o[axis] < min[axis] || o[axis] > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d[axis];
        let t1 = (min[axis] - o[axis]) * inv;
        let t2 = (max[axis] - o[axis]) * inv;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        if near > t_enter {
            t_enter = near;
            entry_axis = Some(axis);
        }
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return None;
        }
    }

    let axis = entry_axis?;
    let mut normal = [0.0f32; 3];
    normal[axis] = -d[axis].signum();
    Some(ProbeHit {
        point: origin + dir * t_enter,
        normal: Vec3::from_array(normal),
        distance: t_enter,
    })
}

/// Heightfield floor over the XZ extent of a volume, generated from fractal noise.
pub struct TerrainField {
    pub heights: Vec<f32>,
    pub cols: usize,
    pub rows: usize,
    pub origin_x: f32,
    pub origin_z: f32,
    pub cell_size: f32,
    inv_cell_size: f32,
    min_height: f32,
    max_height: f32,
}

impl TerrainField {
    pub fn generate(bounds: &Bounds, cell_size: f32, amplitude: f32, seed: u32) -> Self {
        let cell_size = cell_size.max(config::MIN_SEPARATION_DISTANCE);
        let min = bounds.min();
        let size = bounds.half_extents * 2.0;
        let cols = ((size.x / cell_size).ceil() as usize).max(1) + 1;
        let rows = ((size.z / cell_size).ceil() as usize).max(1) + 1;

        let fbm: Fbm<Perlin> = Fbm::new(seed);
        let mut heights = Vec::with_capacity(cols * rows);
        for z in 0..rows {
            for x in 0..cols {
                let nx = x as f64 / cols as f64 * config::TERRAIN_NOISE_SCALE;
                let nz = z as f64 / rows as f64 * config::TERRAIN_NOISE_SCALE;
                let val = (fbm.get([nx, nz]) as f32).clamp(-1.0, 1.0);
                heights.push(min.y + (val * 0.5 + 0.5) * amplitude);
            }
        }

        debug!(cols, rows, seed, "generated terrain heightfield");
        let mut terrain = Self {
            heights,
            cols,
            rows,
            origin_x: min.x,
            origin_z: min.z,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            min_height: 0.0,
            max_height: 0.0,
        };
        terrain.refresh_height_range();
        terrain
    }

    /// Flat floor at height `y`, used by tests.
    pub fn flat(bounds: &Bounds, cell_size: f32, y: f32) -> Self {
        let mut terrain = Self::generate(bounds, cell_size, 0.0, 0);
        terrain.heights.fill(y);
        terrain.refresh_height_range();
        terrain
    }

    /// Recompute the cached height extremes. Call after editing `heights`.
    pub fn refresh_height_range(&mut self) {
        let (lo, hi) = self
            .heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        self.min_height = lo;
        self.max_height = hi;
    }

    /// Interval of `t` along the ray where it can cross the surface: between the
    /// highest and lowest sample heights.
    fn march_window(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<(f32, f32)> {
        let (mut t0, mut t1) = (0.0f32, max_distance.min(f32::MAX));
        if dir.y > 0.0 {
            t1 = t1.min((self.max_height - origin.y) / dir.y);
        } else if dir.y < 0.0 {
            let descent = -dir.y;
            t0 = ((origin.y - self.max_height) / descent).max(0.0);
            // Past this point the ray is below every sample, so the last sample hits.
            t1 = t1.min((origin.y - self.min_height) / descent + config::TERRAIN_MARCH_STEP);
        } else if origin.y > self.max_height {
            return None;
        }
        (t0 <= t1).then_some((t0, t1))
    }

    fn height_at_cell(&self, x: usize, z: usize) -> f32 {
        self.heights[z.min(self.rows - 1) * self.cols + x.min(self.cols - 1)]
    }

    /// Bilinear height at a world XZ position, clamped to the grid edge.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let gx = ((x - self.origin_x) * self.inv_cell_size).clamp(0.0, (self.cols - 1) as f32);
        let gz = ((z - self.origin_z) * self.inv_cell_size).clamp(0.0, (self.rows - 1) as f32);
        let x0 = gx.floor() as usize;
        let z0 = gz.floor() as usize;
        let fx = gx - x0 as f32;
        let fz = gz - z0 as f32;

        let h00 = self.height_at_cell(x0, z0);
        let h10 = self.height_at_cell(x0 + 1, z0);
        let h01 = self.height_at_cell(x0, z0 + 1);
        let h11 = self.height_at_cell(x0 + 1, z0 + 1);
        let top = h00 + (h10 - h00) * fx;
        let bottom = h01 + (h11 - h01) * fx;
        top + (bottom - top) * fz
    }

    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let e = self.cell_size * 0.5;
        let dx = (self.height_at(x + e, z) - self.height_at(x - e, z)) / (2.0 * e);
        let dz = (self.height_at(x, z + e) - self.height_at(x, z - e)) / (2.0 * e);
        normalize_or_zero(vec3(-dx, 1.0, -dz))
    }

    fn below_surface(&self, p: Vec3) -> bool {
        p.y <= self.height_at(p.x, p.z)
    }
}

impl EnvironmentQuery for TerrainField {
    fn probe_obstacle(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<ProbeHit> {
        if !layers.intersects(LayerMask::TERRAIN) {
            return None;
        }
        let dir = normalize_or_zero(direction);
        if dir == Vec3::ZERO || max_distance <= 0.0 || self.below_surface(origin) {
            return None;
        }

        let (t0, t1) = self.march_window(origin, dir, max_distance)?;
        let span = t1 - t0;
        let step = config::TERRAIN_MARCH_STEP.max(span / config::TERRAIN_MAX_MARCH_STEPS as f32);
        let num_steps = ((span / step).ceil() as usize).clamp(1, config::TERRAIN_MAX_MARCH_STEPS);
        let mut prev_t = t0;
        for i in 1..=num_steps {
            let t = if i == num_steps {
                t1
            } else {
                (t0 + i as f32 * step).min(t1)
            };
            if self.below_surface(origin + dir * t) {
                // Refine the crossing between the last sample above and this one.
                let (mut lo, mut hi) = (prev_t, t);
                for _ in 0..16 {
                    let mid = 0.5 * (lo + hi);
                    if self.below_surface(origin + dir * mid) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }
                let point = origin + dir * hi;
                return Some(ProbeHit {
                    point,
                    normal: self.normal_at(point.x, point.z),
                    distance: hi,
                });
            }
            prev_t = t;
        }
        None
    }
}

/// Obstacles plus an optional terrain floor; probes report the nearest hit of either.
#[derive(Default)]
pub struct Scene {
    pub obstacles: ObstacleField,
    pub terrain: Option<TerrainField>,
}

impl Scene {
    /// Terrain floor and a handful of spherical rocks and box columns inside `bounds`.
    pub fn generate(bounds: &Bounds, seed: u64, rng: &mut impl ::rand::Rng) -> Self {
        let terrain = TerrainField::generate(
            bounds,
            config::TERRAIN_CELL_SIZE,
            config::TERRAIN_AMPLITUDE,
            seed as u32,
        );

        let mut obstacles = ObstacleField::new();
        let inner = bounds.shrunk(config::DEFAULT_BOUNDARY_MARGIN * 2.0);
        let (min, max) = (inner.min(), inner.max());
        if min.x < max.x && min.y < max.y && min.z < max.z {
            for _ in 0..6 {
                let center = vec3(
                    rng.gen_range(min.x..max.x),
                    rng.gen_range(min.y..max.y),
                    rng.gen_range(min.z..max.z),
                );
                obstacles.add_sphere(center, rng.gen_range(2.0..5.0));
            }
            for _ in 0..3 {
                let base = vec3(rng.gen_range(min.x..max.x), 0.0, rng.gen_range(min.z..max.z));
                let half = vec3(
                    rng.gen_range(1.0..3.0),
                    bounds.half_extents.y,
                    rng.gen_range(1.0..3.0),
                );
                obstacles.add_box(Bounds::new(
                    vec3(base.x, bounds.center.y, base.z),
                    half,
                ));
            }
        }

        debug!(obstacles = obstacles.len(), seed, "generated scene");
        Self {
            obstacles,
            terrain: Some(terrain),
        }
    }
}

impl EnvironmentQuery for Scene {
    fn probe_obstacle(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<ProbeHit> {
        let obstacle_hit = self
            .obstacles
            .probe_obstacle(origin, direction, max_distance, layers);
        let terrain_hit = self
            .terrain
            .as_ref()
            .and_then(|t| t.probe_obstacle(origin, direction, max_distance, layers));
        match (obstacle_hit, terrain_hit) {
            (Some(a), Some(b)) => Some(if a.distance <= b.distance { a } else { b }),
            (a, b) => a.or(b),
        }
    }
}
