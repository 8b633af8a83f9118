use crate::config::GridGeometry;
use crate::driver::{SimKernel, SimulationDriver};
use crate::io::csv::DiagnosticsRecord;
use crate::io::netcdf::NetCdfWriter;
use anyhow::{Context, Result};
use csv::Writer;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::time::{Duration, Instant};
use tracing::info;

// Resolution of the progress bar for time-bounded runs
const PROGRESS_TICKS: u64 = 1000;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {msg}";

// Wall-clock limit on the step loop; a negative limit, or one too large
// for a `Duration`, never expires
#[derive(Debug, Clone, Copy)]
pub struct WallClockBudget {
    start: Instant,
    limit: Option<Duration>,
}

impl WallClockBudget {
    pub fn start(seconds: f64) -> Self {
        WallClockBudget {
            start: Instant::now(),
            limit: if seconds >= 0.0 {
                Duration::try_from_secs_f64(seconds).ok()
            } else {
                None
            },
        }
    }

    pub fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.start.elapsed() >= limit)
    }
}

// Per-run knobs of the step loop
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub wall_duration: f64,
    pub save_every: usize,
    pub status_every: usize,
}

// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub slices: usize,
    pub final_time: f64,
    pub wall_clock_exhausted: bool,
}

fn progress_bar(driver_max_time: f64) -> Result<ProgressBar> {
    if driver_max_time.is_finite() && driver_max_time > 0.0 {
        let pb = ProgressBar::new(PROGRESS_TICKS);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)?
                .progress_chars("#>-"),
        );
        Ok(pb)
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template(SPINNER_TEMPLATE)?);
        Ok(pb)
    }
}

fn append_snapshot<K: SimKernel>(
    driver: &SimulationDriver<K>,
    writer: &mut NetCdfWriter,
    diagnostics: &mut Option<Writer<File>>,
    grid: &GridGeometry,
    step: u64,
) -> Result<()> {
    let time = driver.current_time()?;
    let fields = driver.snapshot()?;

    writer
        .append_timestep(&fields, time as f32)
        .with_context(|| format!("Failed to append timestep at t={}", time))?;

    if let Some(wtr) = diagnostics {
        wtr.serialize(DiagnosticsRecord::from_fields(step, time, &fields, grid))
            .context("Failed to write diagnostics row")?;
    }
    Ok(())
}

/// Alternates step, snapshot and append until the simulated-time or the
/// wall-clock budget runs out. The initial state is appended first, and the
/// final state is appended on exit when `save_every` skipped it.
pub fn run_simulation<K: SimKernel>(
    driver: &mut SimulationDriver<K>,
    writer: &mut NetCdfWriter,
    mut diagnostics: Option<Writer<File>>,
    grid: &GridGeometry,
    settings: &RunSettings,
    progress: Option<ProgressBar>,
) -> Result<RunSummary> {
    let max_time = driver.max_time()?;
    let pb = progress.unwrap_or_else(ProgressBar::hidden);
    let budget = WallClockBudget::start(settings.wall_duration);

    append_snapshot(driver, writer, &mut diagnostics, grid, 0)?;

    let mut steps: u64 = 0;
    let mut last_saved: u64 = 0;
    let mut wall_clock_exhausted = false;

    loop {
        if budget.exhausted() {
            info!("Wall-clock budget of {} s exhausted", settings.wall_duration);
            wall_clock_exhausted = true;
            break;
        }

        if !driver.step_if_budget_remains()? {
            break;
        }
        steps += 1;

        if steps % settings.save_every as u64 == 0 {
            append_snapshot(driver, writer, &mut diagnostics, grid, steps)?;
            last_saved = steps;
        }

        if settings.status_every > 0 && steps % settings.status_every as u64 == 0 {
            pb.suspend(|| driver.report_status())?;
        }

        let time = driver.current_time()?;
        if max_time.is_finite() && max_time > 0.0 {
            pb.set_position(((time / max_time).min(1.0) * PROGRESS_TICKS as f64) as u64);
        } else {
            pb.tick();
        }
        pb.set_message(format!("t = {:.2} s, step {}", time, steps));
    }

    pb.finish_and_clear();

    if last_saved != steps {
        append_snapshot(driver, writer, &mut diagnostics, grid, steps)?;
    }
    driver.report_status()?;

    if let Some(mut wtr) = diagnostics {
        wtr.flush().context("Failed to flush diagnostics writer")?;
    }

    Ok(RunSummary {
        steps,
        slices: writer.timesteps_written(),
        final_time: driver.current_time()?,
        wall_clock_exhausted,
    })
}

/// Progress indicator matching the run's time bound.
pub fn make_progress_bar<K: SimKernel>(driver: &SimulationDriver<K>) -> Result<ProgressBar> {
    progress_bar(driver.max_time()?)
}
