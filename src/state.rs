use crate::config::GridGeometry;

// Snapshot of the prognostic fields at one simulated instant.
// eta is ny x nx, U is ny x (nx + 1), V is (ny + 1) x nx, all row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    pub eta: Vec<f32>,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
}

impl FieldSet {
    pub fn zeros(grid: &GridGeometry) -> Self {
        FieldSet {
            eta: vec![0.0; grid.center_len()],
            u: vec![0.0; grid.u_len()],
            v: vec![0.0; grid.v_len()],
        }
    }

    /// Returns the first field whose length does not fit `grid`, as
    /// `(name, expected, actual)`.
    pub fn shape_mismatch(&self, grid: &GridGeometry) -> Option<(&'static str, usize, usize)> {
        [
            ("eta", grid.center_len(), self.eta.len()),
            ("U", grid.u_len(), self.u.len()),
            ("V", grid.v_len(), self.v.len()),
        ]
        .into_iter()
        .find(|(_, expected, actual)| expected != actual)
    }

    pub fn max_abs_eta(&self) -> f32 {
        self.eta.iter().fold(0.0, |acc, e| acc.max(e.abs()))
    }

    /// Volume displaced relative to the mean surface (m^3).
    pub fn eta_volume(&self, grid: &GridGeometry) -> f64 {
        let cell_area = grid.dx as f64 * grid.dy as f64;
        self.eta.iter().map(|&e| e as f64).sum::<f64>() * cell_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_match_grid() {
        let grid = GridGeometry::new(3, 2, 1.0, 1.0);
        let fields = FieldSet::zeros(&grid);
        assert_eq!(fields.eta.len(), 6);
        assert_eq!(fields.u.len(), 8);
        assert_eq!(fields.v.len(), 9);
        assert!(fields.shape_mismatch(&grid).is_none());
    }

    #[test]
    fn test_shape_mismatch_reports_field() {
        let grid = GridGeometry::new(2, 2, 1.0, 1.0);
        let mut fields = FieldSet::zeros(&grid);
        fields.u.pop();
        assert_eq!(fields.shape_mismatch(&grid), Some(("U", 6, 5)));
    }

    #[test]
    fn test_diagnostics() {
        let grid = GridGeometry::new(2, 1, 2.0, 3.0);
        let fields = FieldSet {
            eta: vec![0.5, -1.5],
            u: vec![0.0; 3],
            v: vec![0.0; 4],
        };
        assert_eq!(fields.max_abs_eta(), 1.5);
        assert!((fields.eta_volume(&grid) - (-6.0)).abs() < 1e-12);
    }
}
