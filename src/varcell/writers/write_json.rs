use crate::utils::Result;
use crate::varcell::SampleResult;
use std::{fs::File, io::BufWriter, path::Path};

/// Writes one sample's result map as JSON, overwriting any previous run.
pub fn write_sample_result(path: &Path, result: &SampleResult) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| format!("Failed to create output file {}: {}", path.display(), e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, result)
        .map_err(|e| format!("Failed to write results to {}: {}", path.display(), e))
}
