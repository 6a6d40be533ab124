//! Per-barcode evidence accumulation and conflict resolution.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Raw evidence gathered during one (sample, variation) region scan. The two
/// sets may overlap until resolved.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BarcodeEvidence {
    wild_type: HashSet<String>,
    mutant: HashSet<String>,
}

impl BarcodeEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wild_type(&mut self, barcode: String) {
        self.wild_type.insert(barcode);
    }

    pub fn add_mutant(&mut self, barcode: String) {
        self.mutant.insert(barcode);
    }

    pub fn is_empty(&self) -> bool {
        self.wild_type.is_empty() && self.mutant.is_empty()
    }

    /// Finalizes the evidence. Mutant evidence strictly dominates: a barcode
    /// seen as mutant anywhere in the region is removed from the wild-type
    /// set, never the reverse.
    pub fn resolve(self) -> ResolvedEvidence {
        let wild_type = self
            .wild_type
            .difference(&self.mutant)
            .cloned()
            .collect();
        ResolvedEvidence {
            wild_type,
            mutant: self.mutant.into_iter().collect(),
        }
    }
}

/// Final disjoint barcode sets for one variation, exported as lists whose
/// order carries no meaning.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEvidence {
    #[serde(rename = "wt")]
    pub wild_type: Vec<String>,
    #[serde(rename = "mut")]
    pub mutant: Vec<String>,
}

/// Mapping from variation identity key to resolved evidence, one per sample.
pub type SampleResult = HashMap<String, ResolvedEvidence>;
