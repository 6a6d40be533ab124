//! Read classification for one (sample, variation) pair.
//!
//! Point classification scans aligned query/reference position pairs of every
//! read overlapping the variation; column classification walks pileup columns
//! and their per-read indel annotations. Both paths collect raw per-barcode
//! evidence that is made disjoint later by `BarcodeEvidence::resolve`.

use crate::utils::Result;
use crate::varcell::{BarcodeEvidence, Variation, VariationKind};
use rust_htslib::bam::{self, ext::BamRecordExtensions, pileup::Indel, record::Aux, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vote {
    WildType,
    Mutant,
}

/// Scans the alignment data in the variation's region and returns the raw
/// (possibly overlapping) wild-type/mutant barcode sets.
///
/// Dispatch is a strict length-equality test on the allele strings: equal
/// lengths take the point path, unequal lengths the column path.
pub fn classify_variation(
    variation: &Variation,
    bam: &mut bam::IndexedReader,
) -> Result<BarcodeEvidence> {
    match variation.kind() {
        VariationKind::Snp => classify_point(variation, bam),
        VariationKind::Indel => classify_columns(variation, bam),
    }
}

fn classify_point(variation: &Variation, bam: &mut bam::IndexedReader) -> Result<BarcodeEvidence> {
    fetch_region(bam, variation)?;

    let mut evidence = BarcodeEvidence::new();
    let mut record = bam::Record::new();
    while let Some(result) = bam.read(&mut record) {
        result.map_err(|e| {
            format!(
                "Error reading alignments for {}: {}",
                variation.key(),
                e
            )
        })?;

        let bases = record.seq().as_bytes();
        let vote = point_vote(
            record.aligned_pairs(),
            &bases,
            variation.start,
            &variation.alt_allele,
        );
        let Some(vote) = vote else {
            continue;
        };
        // Reads without a cell barcode contribute no evidence
        let Some(barcode) = get_cb_tag(&record) else {
            continue;
        };
        match vote {
            Vote::Mutant => evidence.add_mutant(barcode),
            Vote::WildType => evidence.add_wild_type(barcode),
        }
    }

    Ok(evidence)
}

fn classify_columns(
    variation: &Variation,
    bam: &mut bam::IndexedReader,
) -> Result<BarcodeEvidence> {
    fetch_region(bam, variation)?;

    let mut evidence = BarcodeEvidence::new();
    for result in bam.pileup() {
        let pileup =
            result.map_err(|e| format!("Pileup failed for {}: {}", variation.key(), e))?;
        if !column_in_region(pileup.pos() as i64, variation.start, variation.end) {
            continue;
        }

        for alignment in pileup.alignments() {
            let vote = column_vote(alignment.indel());
            let Some(barcode) = get_cb_tag(&alignment.record()) else {
                continue;
            };
            match vote {
                Vote::Mutant => evidence.add_mutant(barcode),
                Vote::WildType => evidence.add_wild_type(barcode),
            }
        }
    }

    Ok(evidence)
}

fn fetch_region(bam: &mut bam::IndexedReader, variation: &Variation) -> Result<()> {
    bam.fetch((variation.contig.as_str(), variation.start, variation.end))
        .map_err(|e| format!("Failed to fetch region for {}: {}", variation.key(), e))
}

/// Decides one read's vote at the target position, or `None` when the read
/// has no aligned pair there. Pairs at insertions, deletions, and soft-clip
/// boundaries do not appear in the pair list, so reads overlapping the region
/// only through such events contribute nothing.
fn point_vote(
    pairs: impl IntoIterator<Item = [i64; 2]>,
    bases: &[u8],
    target_pos: i64,
    alt_allele: &str,
) -> Option<Vote> {
    for [qpos, rpos] in pairs {
        if rpos != target_pos {
            continue;
        }
        let base = *bases.get(qpos as usize)?;
        // A one-base alternate must match the read base exactly; an
        // equal-length multi-base alternate can never match a single base
        // and therefore always votes wild-type.
        let is_alt = alt_allele.len() == 1 && alt_allele.as_bytes()[0] == base;
        return Some(if is_alt { Vote::Mutant } else { Vote::WildType });
    }
    None
}

/// Column filter for the indel path: inclusive at BOTH ends, unlike the
/// half-open fetch of the point path.
fn column_in_region(pos: i64, start: i64, end: i64) -> bool {
    pos >= start && pos <= end
}

fn column_vote(indel: Indel) -> Vote {
    match indel {
        Indel::None => Vote::WildType,
        Indel::Ins(_) | Indel::Del(_) => Vote::Mutant,
    }
}

fn get_cb_tag(rec: &bam::Record) -> Option<String> {
    match rec.aux(b"CB") {
        Ok(Aux::String(value)) => Some(value.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_vote_matching_alt_base_is_mutant() {
        // Read base G at reference position 100 against alternate "G"
        let pairs = vec![[0, 98], [1, 99], [2, 100], [3, 101]];
        let vote = point_vote(pairs, b"ACGT", 100, "G");
        assert_eq!(vote, Some(Vote::Mutant));
    }

    #[test]
    fn point_vote_mismatching_base_is_wild_type() {
        let pairs = vec![[0, 99], [1, 100]];
        let vote = point_vote(pairs, b"AA", 100, "G");
        assert_eq!(vote, Some(Vote::WildType));
    }

    #[test]
    fn point_vote_without_pair_at_target_is_no_vote() {
        // The read overlaps the region but a deletion removed the pair at the
        // target position
        let pairs = vec![[0, 98], [1, 99], [2, 102]];
        let vote = point_vote(pairs, b"ACG", 100, "G");
        assert_eq!(vote, None);
    }

    #[test]
    fn point_vote_ignores_pairs_beyond_target() {
        // A pair exactly at the region end is not the target position
        let pairs = vec![[0, 101]];
        let vote = point_vote(pairs, b"G", 100, "G");
        assert_eq!(vote, None);
    }

    #[test]
    fn point_vote_multi_base_alternate_is_wild_type() {
        // Equal-length multi-base alternates never match a single read base
        let pairs = vec![[0, 100]];
        let vote = point_vote(pairs, b"G", 100, "GC");
        assert_eq!(vote, Some(Vote::WildType));
    }

    #[test]
    fn column_region_is_inclusive_at_both_ends() {
        assert!(column_in_region(50, 50, 52));
        assert!(column_in_region(51, 50, 52));
        assert!(column_in_region(52, 50, 52));
        assert!(!column_in_region(49, 50, 52));
        assert!(!column_in_region(53, 50, 52));
    }

    #[test]
    fn column_vote_nonzero_indel_is_mutant() {
        assert_eq!(column_vote(Indel::Ins(2)), Vote::Mutant);
        assert_eq!(column_vote(Indel::Del(1)), Vote::Mutant);
        assert_eq!(column_vote(Indel::None), Vote::WildType);
    }
}
