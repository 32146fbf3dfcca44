//! Uniform spatial hash grid over the bounded simulation box.
//!
//! Grounded in `other_examples`'s `openrustswarm-core-src-swarm-grid.rs`
//! (two-pass count-then-scatter bucketing, no per-cell heap allocation) and
//! `DeepTank`'s `boids.rs` `SpatialGrid` (row/col cell indexing, radius
//! queries). Uses direct axis indexing rather than a tree or a hashed table:
//! the box is bounded so cell coordinates are already dense, and agents must
//! be able to read back the exact cell their current position hashes to.

use crate::agent::Agent;
use crate::params::BoundaryMode;

/// Per-axis delta under the configured boundary mode.
#[inline]
pub fn pbc_delta(d: [f32; 3], mode: BoundaryMode, box_size: f32) -> [f32; 3] {
    match mode {
        BoundaryMode::Periodic => [
            d[0] - box_size * (d[0] / box_size).round(),
            d[1] - box_size * (d[1] / box_size).round(),
            d[2] - box_size * (d[2] / box_size).round(),
        ],
        BoundaryMode::Reflective | BoundaryMode::Absorbing => d,
    }
}

/// Sentinel cell id for dead/out-of-range agents: never matches a real cell.
pub const NO_CELL: i32 = -1;

#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    box_size: f32,
    mode: BoundaryMode,
    /// Number of cells along each axis.
    dims: [i32; 3],
    /// Flattened bucket bounds: `offsets[c]..offsets[c]+counts[c]` indexes
    /// into `packed`.
    offsets: Vec<u32>,
    counts: Vec<u32>,
    packed: Vec<u32>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32, box_size: f32, mode: BoundaryMode, two_d: bool) -> Self {
        let n = (box_size / cell_size).ceil().max(1.0) as i32;
        let dims = if two_d { [n, n, 1] } else { [n, n, n] };
        let total_cells = (dims[0] * dims[1] * dims[2]).max(1) as usize;
        Self {
            cell_size,
            box_size,
            mode,
            dims,
            offsets: vec![0; total_cells],
            counts: vec![0; total_cells],
            packed: Vec::new(),
        }
    }

    #[inline]
    fn axis_index(&self, axis: usize, coord: f32) -> Option<i32> {
        let half = self.box_size * 0.5;
        let shifted = match self.mode {
            BoundaryMode::Periodic => (coord + half).rem_euclid(self.box_size),
            BoundaryMode::Reflective | BoundaryMode::Absorbing => {
                if !(-half..=half).contains(&coord) {
                    return None;
                }
                coord + half
            }
        };
        let idx = (shifted / self.cell_size).floor() as i32;
        Some(idx.clamp(0, self.dims[axis] - 1))
    }

    /// Cell coordinates for a live position, or `None` if out of bounds
    /// under a non-periodic mode.
    fn cell_coords(&self, position: [f32; 3]) -> Option<[i32; 3]> {
        let cx = self.axis_index(0, position[0])?;
        let cy = self.axis_index(1, position[1])?;
        let cz = if self.dims[2] > 1 {
            self.axis_index(2, position[2])?
        } else {
            0
        };
        Some([cx, cy, cz])
    }

    #[inline]
    fn flatten(&self, c: [i32; 3]) -> usize {
        (c[0] + self.dims[0] * (c[1] + self.dims[1] * c[2])) as usize
    }

    /// Rebuild the grid from the current agent positions. Sets
    /// `agent.cell_id` for every live agent and `NO_CELL` for dead ones.
    pub fn rebuild(&mut self, agents: &mut [Agent]) {
        let total_cells = self.counts.len();
        self.counts.clear();
        self.counts.resize(total_cells, 0);

        let mut flat_ids = vec![NO_CELL; agents.len()];
        for (i, agent) in agents.iter().enumerate() {
            if !agent.alive {
                continue;
            }
            if let Some(c) = self.cell_coords(agent.position) {
                let flat = self.flatten(c) as i32;
                flat_ids[i] = flat;
                self.counts[flat as usize] += 1;
            }
        }

        let mut running = 0u32;
        self.offsets.clear();
        self.offsets.resize(total_cells, 0);
        for c in 0..total_cells {
            self.offsets[c] = running;
            running += self.counts[c];
        }

        self.packed.clear();
        self.packed.resize(running as usize, 0);
        let mut cursor = vec![0u32; total_cells];
        for (i, &flat) in flat_ids.iter().enumerate() {
            agents[i].cell_id = flat;
            if flat == NO_CELL {
                continue;
            }
            let c = flat as usize;
            let slot = self.offsets[c] + cursor[c];
            self.packed[slot as usize] = i as u32;
            cursor[c] += 1;
        }
    }

    /// Visit every agent index sharing a cell with `origin` or one of its 26
    /// (3D) / 8 (2D) neighbors, calling `f(candidate_index)`. Does not
    /// filter by distance, liveness, or exclude `origin` itself — callers do
    /// that — this grid is a pure index structure.
    pub fn for_each_in_neighboring_cells(&self, origin_cell: i32, mut f: impl FnMut(u32)) {
        if origin_cell == NO_CELL {
            return;
        }
        let oc = origin_cell as i32;
        let ox = oc % self.dims[0];
        let oy = (oc / self.dims[0]) % self.dims[1];
        let oz = oc / (self.dims[0] * self.dims[1]);

        let z_range = if self.dims[2] > 1 { -1..=1 } else { 0..=0 };
        for dz in z_range {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let nx = self.wrap_axis(0, ox + dx);
                    let ny = self.wrap_axis(1, oy + dy);
                    let nz = self.wrap_axis(2, oz + dz);
                    let (Some(nx), Some(ny), Some(nz)) = (nx, ny, nz) else {
                        continue;
                    };
                    let flat = self.flatten([nx, ny, nz]) as usize;
                    let start = self.offsets[flat] as usize;
                    let end = start + self.counts[flat] as usize;
                    for &idx in &self.packed[start..end] {
                        f(idx);
                    }
                }
            }
        }
    }

    #[inline]
    fn wrap_axis(&self, axis: usize, v: i32) -> Option<i32> {
        let n = self.dims[axis];
        match self.mode {
            BoundaryMode::Periodic => Some(v.rem_euclid(n)),
            BoundaryMode::Reflective | BoundaryMode::Absorbing => {
                if (0..n).contains(&v) {
                    Some(v)
                } else {
                    None
                }
            }
        }
    }

    pub fn cell_of(&self, position: [f32; 3]) -> i32 {
        self.cell_coords(position)
            .map(|c| self.flatten(c) as i32)
            .unwrap_or(NO_CELL)
    }
}
