//! Confirmed variations extracted from a sample's VCF.

/// A confirmed variation with concrete alleles. Coordinates are 0-based,
/// start inclusive, end exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Variation {
    pub contig: String,
    pub start: i64,
    pub end: i64,
    pub ref_allele: String,
    pub alt_allele: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariationKind {
    Snp,
    Indel,
}

impl Variation {
    /// Classification driving the classifier dispatch: a strict length
    /// equality test on the allele strings, never the VCF type annotation.
    pub fn kind(&self) -> VariationKind {
        if self.ref_allele.len() == self.alt_allele.len() {
            VariationKind::Snp
        } else {
            VariationKind::Indel
        }
    }

    /// Identity key used in the per-sample output map.
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.contig, self.start, self.end, self.ref_allele, self.alt_allele
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variation(ref_allele: &str, alt_allele: &str) -> Variation {
        Variation {
            contig: "chr1".to_string(),
            start: 100,
            end: 101,
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
        }
    }

    #[test]
    fn equal_allele_lengths_dispatch_to_snp() {
        assert_eq!(variation("A", "G").kind(), VariationKind::Snp);
        // Multi-base substitutions of equal length take the point path too
        assert_eq!(variation("AT", "GC").kind(), VariationKind::Snp);
    }

    #[test]
    fn unequal_allele_lengths_dispatch_to_indel() {
        assert_eq!(variation("AT", "A").kind(), VariationKind::Indel);
        assert_eq!(variation("A", "ATT").kind(), VariationKind::Indel);
    }

    #[test]
    fn key_encodes_all_identity_fields() {
        assert_eq!(variation("A", "G").key(), "chr1_100_101_A_G");
    }

    #[test]
    fn distinct_tuples_produce_distinct_keys() {
        let base = variation("A", "G");
        let mut other = base.clone();
        other.alt_allele = "T".to_string();
        assert_ne!(base.key(), other.key());

        let mut other = base.clone();
        other.start = 101;
        other.end = 102;
        assert_ne!(base.key(), other.key());

        let mut other = base.clone();
        other.contig = "chr2".to_string();
        assert_ne!(base.key(), other.key());

        assert_eq!(base.key(), variation("A", "G").key());
    }
}
