use crate::config::{GridGeometry, PhysicalParams};
use crate::state::FieldSet;
use chrono::{DateTime, Local};
use netcdf::{FileMut, Options};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

// Shuffle + deflate level for every non-coordinate array
const DEFLATE_LEVEL: i32 = 2;
const SHUFFLE: bool = true;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error(
        "could not create '{}': check that it does not exist, that the directory is writable and the disk is not full",
        .path.display()
    )]
    CannotCreate {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("grid geometry has already been defined")]
    GeometryAlreadyDefined,

    #[error("grid geometry must be defined before appending timesteps")]
    GeometryNotDefined,

    #[error("invalid grid geometry: {0:?}")]
    InvalidGeometry(GridGeometry),

    #[error("{field} has {actual} values, expected {expected}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("missing variable '{0}'")]
    MissingVariable(&'static str),

    #[error("could not finalize '{}'; output must be considered lost", .path.display())]
    CloseFailed {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),
}

/// Default container name derived from the given local time,
/// e.g. `fbl_2024_03_07_09_05_01.nc`.
pub fn default_file_name(now: &DateTime<Local>) -> String {
    now.format("fbl_%Y_%m_%d_%H_%M_%S.nc").to_string()
}

/// Append-only writer for the staggered-grid dataset.
///
/// Dimensions, coordinates, global attributes and the depth field are
/// written once by [`NetCdfWriter::define_geometry`]; every subsequent
/// [`NetCdfWriter::append_timestep`] adds one slice along the unlimited
/// `T` axis and syncs the file before returning.
pub struct NetCdfWriter {
    file: FileMut,
    path: PathBuf,
    grid: Option<GridGeometry>,
    timestep_counter: usize,
}

impl NetCdfWriter {
    /// Creates a new container at `path`. Never overwrites an existing file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, WriterError> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::create_with(&path, Options::NETCDF4 | Options::NOCLOBBER).map_err(
            |source| WriterError::CannotCreate {
                path: path.clone(),
                source,
            },
        )?;

        info!("Created output container {}", path.display());
        Ok(NetCdfWriter {
            file,
            path,
            grid: None,
            timestep_counter: 0,
        })
    }

    /// Creates a container with a name derived from the current local time.
    pub fn create_default() -> Result<Self, WriterError> {
        Self::create(default_file_name(&Local::now()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of slices appended so far.
    pub fn timesteps_written(&self) -> usize {
        self.timestep_counter
    }

    /// Declares dimensions, coordinates and attributes and writes the mean
    /// depth `h` (row-major `ny x nx`). Callable exactly once.
    pub fn define_geometry(
        &mut self,
        grid: &GridGeometry,
        dt: f32,
        params: &PhysicalParams,
        h: &[f32],
    ) -> Result<(), WriterError> {
        if self.grid.is_some() {
            return Err(WriterError::GeometryAlreadyDefined);
        }
        if !grid.is_valid() {
            return Err(WriterError::InvalidGeometry(*grid));
        }
        if h.len() != grid.center_len() {
            return Err(WriterError::ShapeMismatch {
                field: "H",
                expected: grid.center_len(),
                actual: h.len(),
            });
        }

        let (nx, ny) = (grid.nx, grid.ny);

        // Dimensions
        self.file.add_dimension("X", nx + 1)?;
        self.file.add_dimension("Y", ny + 1)?;
        self.file.add_dimension("X_half", nx)?;
        self.file.add_dimension("Y_half", ny)?;
        self.file.add_unlimited_dimension("T")?;

        // Coordinate variables
        let coordinates = [
            (
                "X",
                grid.x_nodes(),
                "Longitudal coordinate for values given at grid cell intersections",
            ),
            (
                "Y",
                grid.y_nodes(),
                "Latitudal coordinate for values given at grid cell intersections",
            ),
            (
                "X_half",
                grid.x_centers(),
                "Longitudal coordinate for values given at grid cell centers",
            ),
            (
                "Y_half",
                grid.y_centers(),
                "Latitudal coordinate for values given at grid cell centers",
            ),
        ];
        for (name, values, description) in coordinates {
            let mut var = self.file.add_variable::<f32>(name, &[name])?;
            var.put_attribute("description", description)?;
            var.put_values(&values, ..)?;
        }

        {
            let mut t_var = self.file.add_variable::<f32>("T", &["T"])?;
            t_var.put_attribute("description", "Time")?;
        }

        // Global parameters
        self.file.add_attribute("nx", nx as i32)?;
        self.file.add_attribute("ny", ny as i32)?;
        self.file.add_attribute("dt", dt)?;
        self.file.add_attribute("dx", grid.dx)?;
        self.file.add_attribute("dy", grid.dy)?;
        self.file.add_attribute("f", params.f)?;
        self.file.add_attribute("r", params.r)?;

        self.file.sync()?;

        // Mean depth, written once
        {
            let mut h_var = self.file.add_variable::<f32>("H", &["Y_half", "X_half"])?;
            h_var.put_attribute("description", "Mean water depth")?;
            h_var.set_compression(DEFLATE_LEVEL, SHUFFLE)?;
            h_var.put_values(h, ..)?;
        }

        // Time series, chunked one slice at a time along T
        let series = [
            ("eta", ["T", "Y_half", "X_half"], [1, ny, nx], "Water elevation disturbances"),
            ("U", ["T", "Y_half", "X"], [1, ny, nx + 1], "Longitudal water discharge"),
            ("V", ["T", "Y", "X_half"], [1, ny + 1, nx], "Latitudal water discharge"),
        ];
        for (name, dims, chunk, description) in series {
            let mut var = self.file.add_variable::<f32>(name, &dims)?;
            var.put_attribute("description", description)?;
            var.set_compression(DEFLATE_LEVEL, SHUFFLE)?;
            var.set_chunking(&chunk)?;
        }

        self.file.sync()?;
        self.grid = Some(*grid);

        debug!(
            "Defined {}x{} staggered grid (dx={}, dy={}, dt={})",
            nx, ny, grid.dx, grid.dy, dt
        );
        Ok(())
    }

    /// Appends one time slice at the next index along `T` and syncs.
    ///
    /// All three fields are checked against the grid before anything is
    /// written, so a rejected call leaves the container untouched.
    pub fn append_timestep(&mut self, fields: &FieldSet, t: f32) -> Result<(), WriterError> {
        let grid = self.grid.ok_or(WriterError::GeometryNotDefined)?;

        if let Some((field, expected, actual)) = fields.shape_mismatch(&grid) {
            return Err(WriterError::ShapeMismatch {
                field,
                expected,
                actual,
            });
        }

        let idx = self.timestep_counter;

        for (name, values) in [("eta", &fields.eta), ("U", &fields.u), ("V", &fields.v)] {
            let mut var = self
                .file
                .variable_mut(name)
                .ok_or(WriterError::MissingVariable(name))?;
            var.put_values(values.as_slice(), (idx, .., ..))?;
        }

        {
            let mut t_var = self
                .file
                .variable_mut("T")
                .ok_or(WriterError::MissingVariable("T"))?;
            t_var.put_value(t, [idx])?;
        }

        self.file.sync()?;
        self.timestep_counter += 1;
        Ok(())
    }

    /// Flushes and closes the container.
    pub fn close(self) -> Result<(), WriterError> {
        let NetCdfWriter {
            file,
            path,
            timestep_counter,
            ..
        } = self;

        file.sync().map_err(|source| WriterError::CloseFailed {
            path: path.clone(),
            source,
        })?;
        file.close().map_err(|source| WriterError::CloseFailed {
            path: path.clone(),
            source,
        })?;

        info!(
            "Closed {} after {} timestep(s)",
            path.display(),
            timestep_counter
        );
        Ok(())
    }
}
