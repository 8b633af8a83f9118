use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod driver;
mod fbl_kernel;
mod init_conditions;
mod io;
mod run;
mod state;

use cli::get_args;
use driver::SimulationDriver;
use fbl_kernel::FblKernel;
use init_conditions::InitConditions;
use io::netcdf::NetCdfWriter;
use run::{RunSettings, make_progress_bar, run_simulation};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    // Configuration
    let options = get_args()?;
    let grid = options.grid();
    info!("Simulation configuration:\n{}", options);
    if !options.is_time_bounded() && options.wall_duration < 0.0 {
        warn!("Neither the simulated nor the wall-clock duration is bounded");
    }

    // Initial conditions and kernel
    let init = InitConditions::new(&grid, options.bathymetry_no, options.water_elevation_no)
        .context("Failed to build initial conditions")?;
    let kernel = FblKernel::new(
        grid,
        options.physical,
        options.duration,
        init.h,
        init.eta,
    );

    let mut driver = SimulationDriver::new(kernel, options.duration);
    if !driver.initialize()? {
        bail!("Simulator initialization failed");
    }

    // Output sink
    let mut writer = match &options.output {
        Some(path) => NetCdfWriter::create(path)?,
        None => NetCdfWriter::create_default()?,
    };
    let (dt, depth) = {
        let kernel = driver.kernel();
        (kernel.dt(), kernel.depth().to_vec())
    };
    writer
        .define_geometry(&grid, dt, &options.physical, &depth)
        .context("Failed to define output layout")?;

    let diagnostics = options
        .diagnostics
        .as_deref()
        .map(io::csv::create_diagnostics_writer)
        .transpose()?;

    info!("  Timestep: {} s", dt);
    info!("  Output: {}", writer.path().display());

    let settings = RunSettings {
        wall_duration: options.wall_duration,
        save_every: options.save_every,
        status_every: options.status_every,
    };
    let pb = make_progress_bar(&driver)?;

    info!("Starting simulation...");
    let summary = run_simulation(
        &mut driver,
        &mut writer,
        diagnostics,
        &grid,
        &settings,
        Some(pb),
    )?;

    let output = writer.path().to_path_buf();
    writer.close()?;

    info!(
        "Simulation complete: {} step(s), {} slice(s), t = {:.3} s{}",
        summary.steps,
        summary.slices,
        summary.final_time,
        if summary.wall_clock_exhausted {
            " (wall-clock budget exhausted)"
        } else {
            ""
        }
    );
    println!("Output saved to {}", output.display());
    Ok(())
}
