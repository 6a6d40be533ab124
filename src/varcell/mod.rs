pub mod evidence;
pub mod registry;
pub mod variation;
pub mod workflows;
pub mod writers;

pub use evidence::{BarcodeEvidence, ResolvedEvidence, SampleResult};
pub use registry::TargetRegistry;
pub use variation::{Variation, VariationKind};
