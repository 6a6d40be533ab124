mod invoke;
mod vcf;

pub use invoke::{call_variants, compress_and_index};
pub use vcf::confirmed_variations;
