mod bam_utils;
mod readers;
mod region;
mod util;

pub use bam_utils::{derive_sample_name, get_bam_header, is_bam_mapped};
pub use readers::open_registry_reader;
pub use region::GenomicRegion;
pub use util::{handle_error_and_exit, Result};
