use crate::config::{GridGeometry, PhysicalParams};
use crate::driver::SimKernel;
use crate::state::FieldSet;
use tracing::warn;

pub const GRAVITY: f32 = 9.81;

// Fraction of the gravity-wave CFL limit used for dt
const CFL_FRACTION: f32 = 0.25;

/// Forward-backward linear shallow-water kernel on an Arakawa C-grid.
///
/// eta lives at cell centres (ny x nx), U on x-faces (ny x (nx + 1)) and
/// V on y-faces ((ny + 1) x nx). The domain is closed: normal discharge is
/// zero on all four walls.
pub struct FblKernel {
    grid: GridGeometry,
    params: PhysicalParams,
    duration: f64,
    h: Vec<f32>,
    eta0: Vec<f32>,
    fields: FieldSet,
    dt: f32,
    step: u64,
}

impl FblKernel {
    pub fn new(
        grid: GridGeometry,
        params: PhysicalParams,
        duration: f64,
        h: Vec<f32>,
        eta0: Vec<f32>,
    ) -> Self {
        FblKernel {
            fields: FieldSet::zeros(&grid),
            grid,
            params,
            duration,
            h,
            eta0,
            dt: 0.0,
            step: 0,
        }
    }

    /// Stable timestep for the given depth, zero if none exists.
    pub fn cfl_timestep(grid: &GridGeometry, h: &[f32]) -> f32 {
        let max_h = h.iter().copied().fold(0.0f32, f32::max);
        if !(max_h > 0.0) || !max_h.is_finite() {
            return 0.0;
        }
        CFL_FRACTION * grid.dx.min(grid.dy) / (GRAVITY * max_h).sqrt()
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn depth(&self) -> &[f32] {
        &self.h
    }

    // Depth interpolated to the x-face between cells (i - 1, j) and (i, j)
    fn depth_at_u(&self, j: usize, i: usize) -> f32 {
        let nx = self.grid.nx;
        0.5 * (self.h[j * nx + i - 1] + self.h[j * nx + i])
    }

    // Depth interpolated to the y-face between cells (i, j - 1) and (i, j)
    fn depth_at_v(&self, j: usize, i: usize) -> f32 {
        let nx = self.grid.nx;
        0.5 * (self.h[(j - 1) * nx + i] + self.h[j * nx + i])
    }

    fn update_eta(&mut self) {
        let GridGeometry { nx, ny, dx, dy } = self.grid;
        let FieldSet { eta, u, v } = &mut self.fields;

        for j in 0..ny {
            for i in 0..nx {
                let du = u[j * (nx + 1) + i + 1] - u[j * (nx + 1) + i];
                let dv = v[(j + 1) * nx + i] - v[j * nx + i];
                eta[j * nx + i] -= self.dt * (du / dx + dv / dy);
            }
        }
    }

    fn update_u(&mut self) {
        let GridGeometry { nx, ny, dx, .. } = self.grid;
        let friction = 1.0 + self.params.r * self.dt;
        let mut next = self.fields.u.clone();

        for j in 0..ny {
            for i in 1..nx {
                let eta = &self.fields.eta;
                let v = &self.fields.v;
                let grad = (eta[j * nx + i] - eta[j * nx + i - 1]) / dx;
                let v_avg = 0.25
                    * (v[j * nx + i - 1]
                        + v[j * nx + i]
                        + v[(j + 1) * nx + i - 1]
                        + v[(j + 1) * nx + i]);
                let idx = j * (nx + 1) + i;
                next[idx] = (self.fields.u[idx]
                    + self.dt * (-GRAVITY * self.depth_at_u(j, i) * grad + self.params.f * v_avg))
                    / friction;
            }
        }

        self.fields.u = next;
    }

    fn update_v(&mut self) {
        let GridGeometry { nx, ny, dy, .. } = self.grid;
        let friction = 1.0 + self.params.r * self.dt;
        let mut next = self.fields.v.clone();

        for j in 1..ny {
            for i in 0..nx {
                let eta = &self.fields.eta;
                let u = &self.fields.u;
                let grad = (eta[j * nx + i] - eta[(j - 1) * nx + i]) / dy;
                let u_avg = 0.25
                    * (u[(j - 1) * (nx + 1) + i]
                        + u[(j - 1) * (nx + 1) + i + 1]
                        + u[j * (nx + 1) + i]
                        + u[j * (nx + 1) + i + 1]);
                let idx = j * nx + i;
                next[idx] = (self.fields.v[idx]
                    + self.dt * (-GRAVITY * self.depth_at_v(j, i) * grad - self.params.f * u_avg))
                    / friction;
            }
        }

        self.fields.v = next;
    }
}

impl SimKernel for FblKernel {
    fn init(&mut self) -> bool {
        let n = self.grid.center_len();
        if !self.grid.is_valid() || self.h.len() != n || self.eta0.len() != n {
            warn!(
                "Initial conditions do not match a {}x{} grid",
                self.grid.nx, self.grid.ny
            );
            return false;
        }
        if self.h.iter().any(|&h| !(h > 0.0) || !h.is_finite()) {
            warn!("Mean water depth must be positive and finite everywhere");
            return false;
        }

        self.dt = Self::cfl_timestep(&self.grid, &self.h);
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return false;
        }

        self.fields = FieldSet::zeros(&self.grid);
        self.fields.eta.copy_from_slice(&self.eta0);
        self.step = 0;
        true
    }

    fn current_time(&self) -> f64 {
        self.step as f64 * self.dt as f64
    }

    fn max_time(&self) -> f64 {
        if self.duration < 0.0 {
            f64::INFINITY
        } else {
            self.duration
        }
    }

    fn advance_one_step(&mut self) {
        // Forward in continuity, backward in momentum. The order of the two
        // momentum updates alternates every step.
        self.update_eta();
        if self.step % 2 == 0 {
            self.update_u();
            self.update_v();
        } else {
            self.update_v();
            self.update_u();
        }
        self.step += 1;
    }

    fn snapshot_fields(&self) -> FieldSet {
        self.fields.clone()
    }

    fn describe_status(&self) -> String {
        format!(
            "step {} | t = {:.3} s / {} | max|eta| = {:.4e} m | volume anomaly = {:.6e} m3",
            self.step,
            self.current_time(),
            if self.duration < 0.0 {
                "unbounded".to_string()
            } else {
                format!("{:.3} s", self.duration)
            },
            self.fields.max_abs_eta(),
            self.fields.eta_volume(&self.grid)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel(nx: usize, ny: usize, eta0: Vec<f32>) -> FblKernel {
        let grid = GridGeometry::new(nx, ny, 100.0, 100.0);
        let h = vec![10.0; nx * ny];
        FblKernel::new(grid, PhysicalParams { f: 1e-4, r: 0.0 }, 60.0, h, eta0)
    }

    fn bump(nx: usize, ny: usize) -> Vec<f32> {
        let mut eta = vec![0.0; nx * ny];
        eta[(ny / 2) * nx + nx / 2] = 1.0;
        eta
    }

    #[test]
    fn test_init_sets_cfl_timestep() {
        let mut k = kernel(8, 8, vec![0.0; 64]);
        assert!(k.init());
        let expected = 0.25 * 100.0 / (9.81f32 * 10.0).sqrt();
        assert!((k.dt() - expected).abs() < 1e-6);
        assert_eq!(k.current_time(), 0.0);
        assert_eq!(k.max_time(), 60.0);
    }

    #[test]
    fn test_init_rejects_bad_depth() {
        let grid = GridGeometry::new(2, 2, 1.0, 1.0);
        let params = PhysicalParams { f: 0.0, r: 0.0 };
        let dry_depth = vec![1.0, 0.0, 1.0, 1.0];
        let mut dry = FblKernel::new(grid, params, 1.0, dry_depth, vec![0.0; 4]);
        assert!(!dry.init());

        let mut short = FblKernel::new(grid, params, 1.0, vec![1.0; 3], vec![0.0; 4]);
        assert!(!short.init());
    }

    #[test]
    fn test_rest_state_stays_at_rest() {
        let mut k = kernel(4, 3, vec![0.0; 12]);
        assert!(k.init());
        for _ in 0..10 {
            k.advance_one_step();
        }
        let fields = k.snapshot_fields();
        assert!(fields.eta.iter().all(|&e| e == 0.0));
        assert!(fields.u.iter().all(|&u| u == 0.0));
        assert!(fields.v.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_walls_stay_closed_and_volume_is_conserved() {
        let (nx, ny) = (9, 7);
        let mut k = kernel(nx, ny, bump(nx, ny));
        assert!(k.init());
        let grid = k.grid;
        let initial_volume = k.snapshot_fields().eta_volume(&grid);

        for _ in 0..50 {
            k.advance_one_step();
        }

        let fields = k.snapshot_fields();
        assert!(fields.shape_mismatch(&grid).is_none());
        for j in 0..ny {
            assert_eq!(fields.u[j * (nx + 1)], 0.0);
            assert_eq!(fields.u[j * (nx + 1) + nx], 0.0);
        }
        for i in 0..nx {
            assert_eq!(fields.v[i], 0.0);
            assert_eq!(fields.v[ny * nx + i], 0.0);
        }

        let volume = fields.eta_volume(&grid);
        assert!((volume - initial_volume).abs() < 1e-2 * initial_volume.abs());
        assert!(fields.eta.iter().filter(|&&e| e != 0.0).count() > 1);
        assert_eq!(k.current_time(), 50.0 * k.dt() as f64);
    }

    #[test]
    fn test_unbounded_max_time() {
        let grid = GridGeometry::new(2, 2, 1.0, 1.0);
        let k = FblKernel::new(
            grid,
            PhysicalParams { f: 0.0, r: 0.0 },
            -1.0,
            vec![1.0; 4],
            vec![0.0; 4],
        );
        assert!(k.max_time().is_infinite());
    }
}
