use std::fmt;
use std::path::PathBuf;

// Horizontal extent and spacing of the staggered grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub nx: usize,
    pub ny: usize,
    pub dx: f32,
    pub dy: f32,
}

impl GridGeometry {
    pub fn new(nx: usize, ny: usize, dx: f32, dy: f32) -> Self {
        GridGeometry { nx, ny, dx, dy }
    }

    /// Node coordinates along x (`nx + 1` values, `i * dx`).
    pub fn x_nodes(&self) -> Vec<f32> {
        (0..=self.nx).map(|i| i as f32 * self.dx).collect()
    }

    /// Node coordinates along y (`ny + 1` values, `j * dy`).
    pub fn y_nodes(&self) -> Vec<f32> {
        (0..=self.ny).map(|j| j as f32 * self.dy).collect()
    }

    /// Cell-centre coordinates along x (`nx` values, `(i + 0.5) * dx`).
    pub fn x_centers(&self) -> Vec<f32> {
        (0..self.nx).map(|i| (i as f32 + 0.5) * self.dx).collect()
    }

    /// Cell-centre coordinates along y (`ny` values, `(j + 0.5) * dy`).
    pub fn y_centers(&self) -> Vec<f32> {
        (0..self.ny).map(|j| (j as f32 + 0.5) * self.dy).collect()
    }

    // Number of values in an eta / H slice
    pub fn center_len(&self) -> usize {
        self.ny * self.nx
    }

    // Number of values in a U slice
    pub fn u_len(&self) -> usize {
        self.ny * (self.nx + 1)
    }

    // Number of values in a V slice
    pub fn v_len(&self) -> usize {
        (self.ny + 1) * self.nx
    }

    pub fn is_valid(&self) -> bool {
        self.nx > 0
            && self.ny > 0
            && self.dx.is_finite()
            && self.dy.is_finite()
            && self.dx > 0.0
            && self.dy > 0.0
    }
}

// Physical constants written alongside the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalParams {
    /// Coriolis parameter (1/s)
    pub f: f32,
    /// Linear bottom friction coefficient (1/s)
    pub r: f32,
}

// Validated run configuration
#[derive(Debug, Clone)]
pub struct Options {
    pub nx: usize,
    pub ny: usize,
    pub width: f32,
    pub height: f32,
    /// Simulated duration in seconds, negative means unbounded
    pub duration: f64,
    /// Wall-clock duration in seconds, negative means unbounded
    pub wall_duration: f64,
    pub water_elevation_no: u8,
    pub bathymetry_no: u8,
    pub physical: PhysicalParams,
    pub output: Option<PathBuf>,
    pub save_every: usize,
    pub status_every: usize,
    pub diagnostics: Option<PathBuf>,
}

impl Options {
    pub fn grid(&self) -> GridGeometry {
        GridGeometry::new(
            self.nx,
            self.ny,
            self.width / self.nx as f32,
            self.height / self.ny as f32,
        )
    }

    pub fn is_time_bounded(&self) -> bool {
        self.duration >= 0.0
    }
}

fn bound_label(seconds: f64) -> String {
    if seconds < 0.0 {
        "unbounded".to_string()
    } else {
        format!("{} s", seconds)
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Grid: {} x {} cells", self.nx, self.ny)?;
        writeln!(f, "  Domain: {} m x {} m", self.width, self.height)?;
        writeln!(f, "  Duration: {}", bound_label(self.duration))?;
        writeln!(f, "  Wall duration: {}", bound_label(self.wall_duration))?;
        writeln!(f, "  Water elevation preset: {}", self.water_elevation_no)?;
        writeln!(f, "  Bathymetry preset: {}", self.bathymetry_no)?;
        writeln!(f, "  Coriolis f: {}", self.physical.f)?;
        writeln!(f, "  Friction r: {}", self.physical.r)?;
        match &self.output {
            Some(path) => writeln!(f, "  Output: {}", path.display())?,
            None => writeln!(f, "  Output: <timestamped>")?,
        }
        writeln!(f, "  Save every: {} step(s)", self.save_every)?;
        writeln!(f, "  Status every: {} step(s)", self.status_every)?;
        match &self.diagnostics {
            Some(path) => write!(f, "  Diagnostics: {}", path.display()),
            None => write!(f, "  Diagnostics: none"),
        }
    }
}
