use crate::config::GridGeometry;
use anyhow::{Result, bail};

pub const BATHYMETRY_PRESETS: u8 = 3;
pub const WATER_ELEVATION_PRESETS: u8 = 3;

// Mean depth and initial elevation at cell centres, row-major ny x nx
#[derive(Debug, Clone)]
pub struct InitConditions {
    pub h: Vec<f32>,
    pub eta: Vec<f32>,
}

impl InitConditions {
    pub fn new(grid: &GridGeometry, bathymetry_no: u8, water_elevation_no: u8) -> Result<Self> {
        Ok(InitConditions {
            h: bathymetry(grid, bathymetry_no)?,
            eta: water_elevation(grid, water_elevation_no)?,
        })
    }
}

// Evaluate `f(x, y)` at every cell centre, with x and y scaled to [0, 1)
fn sample<F: Fn(f32, f32) -> f32>(grid: &GridGeometry, f: F) -> Vec<f32> {
    let width = grid.nx as f32 * grid.dx;
    let height = grid.ny as f32 * grid.dy;
    let xs = grid.x_centers();
    let ys = grid.y_centers();

    ys.iter()
        .flat_map(|&y| xs.iter().map(move |&x| (x / width, y / height)))
        .map(|(x, y)| f(x, y))
        .collect()
}

fn gaussian(x: f32, y: f32, x0: f32, y0: f32, sigma: f32) -> f32 {
    let r2 = (x - x0).powi(2) + (y - y0).powi(2);
    (-r2 / (2.0 * sigma * sigma)).exp()
}

/// Mean water depth (m) for the numbered preset.
///
/// * 0: flat, 10 m
/// * 1: linear slope from 5 m (west) to 50 m (east)
/// * 2: 50 m basin with a Gaussian seamount rising to 10 m
pub fn bathymetry(grid: &GridGeometry, preset: u8) -> Result<Vec<f32>> {
    let h = match preset {
        0 => sample(grid, |_, _| 10.0),
        1 => sample(grid, |x, _| 5.0 + 45.0 * x),
        2 => sample(grid, |x, y| 50.0 - 40.0 * gaussian(x, y, 0.5, 0.5, 0.1)),
        n => bail!(
            "unknown bathymetry preset {} (expected 0..{})",
            n,
            BATHYMETRY_PRESETS
        ),
    };
    Ok(h)
}

/// Initial water elevation disturbance (m) for the numbered preset.
///
/// * 0: at rest
/// * 1: centred Gaussian hump, 1 m
/// * 2: 0.5 m step over the western half
pub fn water_elevation(grid: &GridGeometry, preset: u8) -> Result<Vec<f32>> {
    let eta = match preset {
        0 => sample(grid, |_, _| 0.0),
        1 => sample(grid, |x, y| gaussian(x, y, 0.5, 0.5, 0.1)),
        2 => sample(grid, |x, _| if x < 0.5 { 0.5 } else { 0.0 }),
        n => bail!(
            "unknown water elevation preset {} (expected 0..{})",
            n,
            WATER_ELEVATION_PRESETS
        ),
    };
    Ok(eta)
}
