use crate::config::GridGeometry;
use crate::state::FieldSet;
use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

// One row per appended time slice
#[derive(Debug, Serialize)]
pub struct DiagnosticsRecord {
    pub step: u64,
    pub time: f64,
    pub max_abs_eta: f32,
    pub eta_volume: f64,
    pub max_abs_u: f32,
    pub max_abs_v: f32,
}

impl DiagnosticsRecord {
    pub fn from_fields(step: u64, time: f64, fields: &FieldSet, grid: &GridGeometry) -> Self {
        let max_abs = |values: &[f32]| values.iter().fold(0.0f32, |acc, x| acc.max(x.abs()));
        DiagnosticsRecord {
            step,
            time,
            max_abs_eta: fields.max_abs_eta(),
            eta_volume: fields.eta_volume(grid),
            max_abs_u: max_abs(&fields.u),
            max_abs_v: max_abs(&fields.v),
        }
    }
}

// Create CSV writer; the header row comes from the record fields
pub fn create_diagnostics_writer(path: &Path) -> Result<Writer<File>> {
    WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create diagnostics file: {:?}", path))
}
