//! Result export: a pretty JSON array, JSON lines, or CSV with one row per run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::metrics::SimulationResult;

fn create_output_file(path: impl AsRef<Path>) -> Result<BufWriter<File>, Box<dyn std::error::Error>> {
    Ok(BufWriter::new(File::create(path)?))
}

fn ensure_not_empty(results: &[SimulationResult]) -> Result<(), Box<dyn std::error::Error>> {
    if results.is_empty() {
        return Err("No results to export".into());
    }
    Ok(())
}

/// Export simulation results as a JSON array.
pub fn export_to_json(results: &[SimulationResult], path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = create_output_file(path)?;
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.flush()?;
    Ok(())
}

/// Export simulation results as JSON lines, one object per run.
pub fn export_to_jsonl(results: &[SimulationResult], path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = create_output_file(path)?;
    for result in results {
        serde_json::to_writer(&mut writer, result)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Export simulation results to CSV. The header comes from the field names of
/// [SimulationResult]; missing ratios are written as empty cells.
///
/// # Errors
///
/// Fails on an empty slice, since there would be nothing to derive the
/// header from.
pub fn export_to_csv(results: &[SimulationResult], path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
    ensure_not_empty(results)?;
    let mut wtr = csv::Writer::from_writer(create_output_file(path)?);
    for result in results {
        wtr.serialize(result)?;
    }
    wtr.flush()?;
    Ok(())
}
