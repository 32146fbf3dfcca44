//! Obstacle arena: sphere/box/cylinder signed-distance variants.
//!
//! Follows the standard analytic SDF formulas, kept as plain tagged-variant
//! data with inherent-impl accessors rather than a trait object per shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Obstacle {
    Sphere {
        center: [f32; 3],
        radius: f32,
    },
    BoxShape {
        center: [f32; 3],
        half_extents: [f32; 3],
    },
    Cylinder {
        center: [f32; 3],
        radius: f32,
        height: f32,
        /// Index of the cylinder's axis: 0=x, 1=y, 2=z.
        axis: u8,
    },
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn norm(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn scale(v: [f32; 3], s: f32) -> [f32; 3] {
    [v[0] * s, v[1] * s, v[2] * s]
}

impl Obstacle {
    /// Signed distance from `point` to the obstacle surface (negative
    /// inside).
    pub fn sdf(&self, point: [f32; 3]) -> f32 {
        match *self {
            Obstacle::Sphere { center, radius } => norm(sub(point, center)) - radius,
            Obstacle::BoxShape {
                center,
                half_extents,
            } => {
                let d = sub(point, center);
                let q = [
                    d[0].abs() - half_extents[0],
                    d[1].abs() - half_extents[1],
                    d[2].abs() - half_extents[2],
                ];
                let outside = [q[0].max(0.0), q[1].max(0.0), q[2].max(0.0)];
                let outside_len = norm(outside);
                let inside = q[0].max(q[1]).max(q[2]).min(0.0);
                outside_len + inside
            }
            Obstacle::Cylinder {
                center,
                radius,
                height,
                axis,
            } => {
                let d = sub(point, center);
                let axis = (axis % 3) as usize;
                let radial_axes: [usize; 2] = match axis {
                    0 => [1, 2],
                    1 => [0, 2],
                    _ => [0, 1],
                };
                let radial = (d[radial_axes[0]] * d[radial_axes[0]]
                    + d[radial_axes[1]] * d[radial_axes[1]])
                    .sqrt();
                let axial = d[axis].abs();
                let q = [radial - radius, axial - height * 0.5];
                let outside = [q[0].max(0.0), q[1].max(0.0)];
                let outside_len = (outside[0] * outside[0] + outside[1] * outside[1]).sqrt();
                let inside = q[0].max(q[1]).min(0.0);
                outside_len + inside
            }
        }
    }

    /// Numerically-stable analytic-ish gradient: unit vector pointing away
    /// from the surface, via central finite differences. Returns `[0;3]`
    /// exactly at a degenerate (zero-gradient) point.
    pub fn gradient(&self, point: [f32; 3]) -> [f32; 3] {
        const EPS: f32 = 1e-3;
        let mut g = [0.0f32; 3];
        for axis in 0..3 {
            let mut plus = point;
            let mut minus = point;
            plus[axis] += EPS;
            minus[axis] -= EPS;
            g[axis] = (self.sdf(plus) - self.sdf(minus)) / (2.0 * EPS);
        }
        let len = norm(g);
        if len < 1e-8 {
            [0.0; 3]
        } else {
            scale(g, 1.0 / len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_sdf_is_zero_on_surface() {
        let s = Obstacle::Sphere {
            center: [0.0; 3],
            radius: 2.0,
        };
        assert!((s.sdf([2.0, 0.0, 0.0]) - 0.0).abs() < 1e-5);
        assert!(s.sdf([0.0, 0.0, 0.0]) < 0.0);
        assert!(s.sdf([5.0, 0.0, 0.0]) > 0.0);
    }

    #[test]
    fn sphere_gradient_points_outward() {
        let s = Obstacle::Sphere {
            center: [0.0; 3],
            radius: 2.0,
        };
        let g = s.gradient([3.0, 0.0, 0.0]);
        assert!(g[0] > 0.9);
    }

    #[test]
    fn box_sdf_matches_known_points() {
        let b = Obstacle::BoxShape {
            center: [0.0; 3],
            half_extents: [1.0, 1.0, 1.0],
        };
        assert!(b.sdf([0.0; 3]) < 0.0);
        assert!((b.sdf([2.0, 0.0, 0.0]) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cylinder_sdf_radial_and_axial() {
        let c = Obstacle::Cylinder {
            center: [0.0; 3],
            radius: 1.0,
            height: 4.0,
            axis: 2,
        };
        assert!(c.sdf([0.0, 0.0, 0.0]) < 0.0);
        assert!(c.sdf([5.0, 0.0, 0.0]) > 0.0);
        assert!(c.sdf([0.0, 0.0, 10.0]) > 0.0);
    }
}
