use crate::config::{Options, PhysicalParams};
use crate::init_conditions::{BATHYMETRY_PRESETS, WATER_ELEVATION_PRESETS};
use anyhow::{Result, ensure};
use clap::{Parser, command};
use std::path::PathBuf;

/// Linear shallow-water simulator writing a staggered-grid NetCDF dataset
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of grid cells along x
    #[arg(long, default_value_t = 100)]
    nx: usize,

    /// Number of grid cells along y
    #[arg(long, default_value_t = 100)]
    ny: usize,

    /// Domain width in metres
    #[arg(long, default_value_t = 10000.0)]
    width: f32,

    /// Domain height in metres
    #[arg(long, default_value_t = 10000.0)]
    height: f32,

    /// Simulated duration in seconds (negative runs until the wall-clock budget or interrupt)
    #[arg(short, long, default_value_t = 10.0, allow_negative_numbers = true)]
    duration: f64,

    /// Wall-clock duration in seconds (negative means unbounded)
    #[arg(short, long, default_value_t = -1.0, allow_negative_numbers = true)]
    wall_duration: f64,

    /// Initial water elevation preset
    #[arg(short = 'e', long, default_value_t = 1)]
    water_elevation_no: u8,

    /// Bathymetry preset
    #[arg(short, long, default_value_t = 0)]
    bathymetry_no: u8,

    /// Coriolis parameter f (1/s)
    #[arg(long, default_value_t = 1e-4, allow_negative_numbers = true)]
    coriolis: f32,

    /// Linear bottom friction r (1/s)
    #[arg(long, default_value_t = 0.0)]
    friction: f32,

    /// Output NetCDF file (default: fbl_<local time>.nc)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append a time slice every N steps
    #[arg(long, default_value_t = 1)]
    save_every: usize,

    /// Log kernel status every N steps (0 logs only at the end)
    #[arg(long, default_value_t = 0)]
    status_every: usize,

    /// Optional CSV file receiving per-slice diagnostics
    #[arg(long)]
    diagnostics: Option<PathBuf>,
}

fn validate(args: Args) -> Result<Options> {
    ensure!(args.nx > 0 && args.ny > 0, "nx and ny must be at least 1");
    ensure!(
        args.width.is_finite() && args.width > 0.0 && args.height.is_finite() && args.height > 0.0,
        "width and height must be positive"
    );
    ensure!(
        args.duration.is_finite() && args.wall_duration.is_finite(),
        "durations must be finite"
    );
    ensure!(
        args.water_elevation_no < WATER_ELEVATION_PRESETS,
        "water elevation preset must be in 0..{}",
        WATER_ELEVATION_PRESETS
    );
    ensure!(
        args.bathymetry_no < BATHYMETRY_PRESETS,
        "bathymetry preset must be in 0..{}",
        BATHYMETRY_PRESETS
    );
    ensure!(
        args.coriolis.is_finite() && args.friction.is_finite() && args.friction >= 0.0,
        "coriolis must be finite and friction non-negative"
    );
    ensure!(args.save_every > 0, "save-every must be at least 1");

    Ok(Options {
        nx: args.nx,
        ny: args.ny,
        width: args.width,
        height: args.height,
        duration: args.duration,
        wall_duration: args.wall_duration,
        water_elevation_no: args.water_elevation_no,
        bathymetry_no: args.bathymetry_no,
        physical: PhysicalParams {
            f: args.coriolis,
            r: args.friction,
        },
        output: args.output,
        save_every: args.save_every,
        status_every: args.status_every,
        diagnostics: args.diagnostics,
    })
}

pub fn get_args() -> Result<Options> {
    validate(Args::parse())
}
