use crate::utils::Result;
use rust_htslib::bam::{self, Read};
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

/// Suffixes appended by the upstream count pipeline; stripped during
/// sample-name derivation.
const COUNT_SUFFIXES: [&str; 2] = ["_GEX_count", "_count"];

pub fn get_bam_header(bam_path: &Path) -> Result<bam::Header> {
    let bam = bam::IndexedReader::from_path(bam_path)
        .map_err(|e| format!("Failed to create bam reader: {}", e))?;
    Ok(bam::Header::from_template(bam.header()))
}

pub fn is_bam_mapped(bam_header: &bam::Header) -> bool {
    // input is already sorted because it has an index.
    // If it is mapped, the index needs the SQ tags to fetch data.
    for line in String::from_utf8(bam_header.to_bytes()).unwrap().lines() {
        if line.starts_with("@SQ") {
            return true;
        }
    }
    false
}

/// Derives the sample name for one BAM: the unique RG SM value when present,
/// otherwise the file stem; count-pipeline suffixes are stripped and the
/// optional rename map is applied last.
pub fn derive_sample_name(
    reads_path: &Path,
    bam_header: &bam::Header,
    renames: &HashMap<String, String>,
) -> Result<String> {
    let header_hashmap = bam_header.to_hashmap();
    let mut sample_names = HashSet::new();

    if let Some(rg_fields) = header_hashmap.get("RG") {
        for rg_field in rg_fields {
            if let Some(sample_name) = rg_field.get("SM") {
                sample_names.insert(sample_name.to_owned());
            }
        }
    }

    let sample = match sample_names.len() {
        1 => sample_names.into_iter().next().unwrap(),
        n => {
            if n == 0 {
                log::debug!("No sample names in BAM header");
            } else {
                log::warn!("Multiple sample names in BAM header");
            }
            reads_path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or("Invalid reads file name")?
                .to_string()
        }
    };

    let sample = strip_count_suffix(&sample);
    Ok(renames.get(sample).cloned().unwrap_or_else(|| sample.to_string()))
}

fn strip_count_suffix(name: &str) -> &str {
    for suffix in COUNT_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped;
        }
    }
    name
}
