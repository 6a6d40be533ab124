use crate::utils::{open_registry_reader, GenomicRegion, Result};
use std::{io::BufRead, path::Path};

/// The list of targeted variation regions. Loaded once per process; used to
/// restrict the external caller's search and to filter confirmed calls.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    regions: Vec<GenomicRegion>,
}

impl TargetRegistry {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_registry_reader(path)?;
        Self::from_reader(reader)
            .map_err(|e| format!("Variation file {}: {}", path.display(), e))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut regions = Vec::new();

        for (line_number, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| format!("Error reading line {}: {}", line_number + 1, e))?;
            if line.is_empty() {
                continue;
            }

            // First three tab-separated columns; extra columns are ignored.
            let mut parts = line.split('\t');
            let contig = parts
                .next()
                .filter(|s| !s.is_empty())
                .ok_or(format!("Missing chromosome at line {}", line_number + 1))?;
            let start = parse_coordinate(parts.next(), "start", line_number)?;
            let end = parse_coordinate(parts.next(), "end", line_number)?;

            let region = GenomicRegion::new(contig, start, end)
                .map_err(|e| format!("Line {}: {}", line_number + 1, e))?;
            regions.push(region);
        }

        Ok(Self { regions })
    }

    /// True when [start, end) intersects any targeted region on the contig.
    pub fn overlaps(&self, contig: &str, start: i64, end: i64) -> bool {
        self.regions
            .iter()
            .any(|region| region.overlaps(contig, start, end))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn parse_coordinate(field: Option<&str>, name: &str, line_number: usize) -> Result<i64> {
    let field = field.ok_or(format!("Missing {} at line {}", name, line_number + 1))?;
    field
        .parse()
        .map_err(|_| format!("Invalid {} '{}' at line {}", name, field, line_number + 1))
}
