use std::collections::HashMap;

use macroquad::prelude::Vec3;

/// Neighbor candidate search over the agents of one tick.
///
/// Agents are addressed by their rank in registry order (`0..n`). `rebuild` is
/// called once per step with every agent's position at the start of the step.
/// A query may return false positives but never misses an agent whose indexed
/// position lies within `radius`; callers apply the exact distance test.
pub trait NeighborQuery {
    fn rebuild(&mut self, positions: &[Vec3]);

    fn for_each_candidate(&self, position: Vec3, radius: f32, visitor: &mut dyn FnMut(usize));
}

/// Baseline O(N²) scan: every agent is a candidate.
#[derive(Clone, Debug, Default)]
pub struct BruteForce {
    count: usize,
}

impl BruteForce {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NeighborQuery for BruteForce {
    fn rebuild(&mut self, positions: &[Vec3]) {
        self.count = positions.len();
    }

    fn for_each_candidate(&self, _position: Vec3, _radius: f32, visitor: &mut dyn FnMut(usize)) {
        for rank in 0..self.count {
            visitor(rank);
        }
    }
}

/// Beyond this many cells per axis a query scans linearly instead.
const MAX_CELL_REACH: f32 = 32.0;

/// Uniform 3D grid keyed by integer cell coordinates. Unbounded, so agents
/// that leave the boundary volume stay indexed.
pub struct SpatialHash {
    inv_cell_size: f32,
    cell_size: f32,
    cells: HashMap<(i32, i32, i32), Vec<usize>>,
    positions: Vec<Vec3>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = cell_size.max(1.0e-3);
        Self {
            inv_cell_size: 1.0 / cell_size,
            cell_size,
            cells: HashMap::new(),
            positions: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    fn for_each_within(&self, position: Vec3, radius_sq: f32, visitor: &mut dyn FnMut(usize)) {
        for (rank, p) in self.positions.iter().enumerate() {
            if p.distance_squared(position) <= radius_sq {
                visitor(rank);
            }
        }
    }

    fn cell_of(&self, p: Vec3) -> (i32, i32, i32) {
        (
            (p.x * self.inv_cell_size).floor() as i32,
            (p.y * self.inv_cell_size).floor() as i32,
            (p.z * self.inv_cell_size).floor() as i32,
        )
    }
}

impl NeighborQuery for SpatialHash {
    /// Clear all cells and re-insert every agent.
    fn rebuild(&mut self, positions: &[Vec3]) {
        self.cells.clear();
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        for (rank, &p) in positions.iter().enumerate() {
            let key = self.cell_of(p);
            self.cells.entry(key).or_insert_with(|| Vec::with_capacity(8)).push(rank);
        }
    }

    fn for_each_candidate(&self, position: Vec3, radius: f32, visitor: &mut dyn FnMut(usize)) {
        let radius = radius.max(0.0);
        let radius_sq = radius * radius;
        let reach = (radius * self.inv_cell_size).ceil();
        if !reach.is_finite() || reach > MAX_CELL_REACH {
            self.for_each_within(position, radius_sq, visitor);
            return;
        }
        let reach = reach as i32;

        // A wide radius would scan more cells than there are agents.
        let side = 2 * reach as usize + 1;
        if side * side * side > self.positions.len().max(1) * 8 {
            self.for_each_within(position, radius_sq, visitor);
            return;
        }

        let (cx, cy, cz) = self.cell_of(position);
        for dz in -reach..=reach {
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let key = (
                        cx.wrapping_add(dx),
                        cy.wrapping_add(dy),
                        cz.wrapping_add(dz),
                    );
                    let Some(bucket) = self.cells.get(&key) else {
                        continue;
                    };
                    for &rank in bucket {
                        if self.positions[rank].distance_squared(position) <= radius_sq {
                            visitor(rank);
                        }
                    }
                }
            }
        }
    }
}
