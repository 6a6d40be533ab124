use crate::utils::Result;
use crate::varcell::{TargetRegistry, Variation};
use rust_htslib::bcf::{self, Read};
use std::path::Path;

/// Iterates the confirmed records of a sample's compressed VCF and returns
/// the variations falling inside targeted regions. Records without an
/// alternate allele are malformed and skipped with a diagnostic, as are
/// records that cannot be read or whose contig is unknown.
pub fn confirmed_variations(vcf_path: &Path, registry: &TargetRegistry) -> Result<Vec<Variation>> {
    let mut reader = bcf::Reader::from_path(vcf_path)
        .map_err(|e| format!("Failed to open VCF file {}: {}", vcf_path.display(), e))?;
    let header = reader.header().clone();

    let mut variations = Vec::new();
    let mut num_off_target = 0;
    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!(
                    "Skipping unreadable record {} in {}: {}",
                    index + 1,
                    vcf_path.display(),
                    e
                );
                continue;
            }
        };

        let contig = match record.rid().and_then(|rid| header.rid2name(rid).ok()) {
            Some(name) => String::from_utf8_lossy(name).into_owned(),
            None => {
                log::warn!(
                    "Skipping record {} with unknown contig in {}",
                    index + 1,
                    vcf_path.display()
                );
                continue;
            }
        };

        let alleles = record.alleles();
        if alleles.len() < 2 {
            log::warn!(
                "Skipping record without alternate allele at {}:{}",
                contig,
                record.pos()
            );
            continue;
        }
        let ref_allele = String::from_utf8_lossy(alleles[0]).into_owned();
        let alt_allele = String::from_utf8_lossy(alleles[1]).into_owned();

        let start = record.pos();
        let end = record.end();
        if !registry.overlaps(&contig, start, end) {
            num_off_target += 1;
            continue;
        }

        variations.push(Variation {
            contig,
            start,
            end,
            ref_allele,
            alt_allele,
        });
    }

    if num_off_target > 0 {
        log::debug!(
            "{}: dropped {} confirmed records outside targeted regions",
            vcf_path.display(),
            num_off_target
        );
    }
    Ok(variations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VCF_HEADER: &str = "##fileformat=VCFv4.2\n\
        ##contig=<ID=chr1,length=1000>\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

    fn write_vcf(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("sample.vcf");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}{}", VCF_HEADER, body).unwrap();
        path
    }

    fn registry(rows: &str) -> TargetRegistry {
        TargetRegistry::from_reader(std::io::Cursor::new(rows)).unwrap()
    }

    #[test]
    fn extracts_confirmed_variations_inside_targeted_regions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_vcf(
            &dir,
            "chr1\t101\t.\tA\tG\t50\t.\t.\nchr1\t501\t.\tAT\tA\t50\t.\t.\n",
        );

        let variations =
            confirmed_variations(&path, &registry("chr1\t100\t110\n")).unwrap();
        assert_eq!(variations.len(), 1);
        let variation = &variations[0];
        assert_eq!(variation.contig, "chr1");
        assert_eq!(variation.start, 100);
        assert_eq!(variation.end, 101);
        assert_eq!(variation.ref_allele, "A");
        assert_eq!(variation.alt_allele, "G");
        assert_eq!(variation.key(), "chr1_100_101_A_G");
    }

    #[test]
    fn record_without_alternate_allele_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_vcf(
            &dir,
            "chr1\t101\t.\tA\t.\t50\t.\t.\nchr1\t105\t.\tC\tT\t50\t.\t.\n",
        );

        // The malformed record is dropped; the rest of the sample proceeds
        let variations =
            confirmed_variations(&path, &registry("chr1\t100\t110\n")).unwrap();
        assert_eq!(variations.len(), 1);
        assert_eq!(variations[0].start, 104);
        assert_eq!(variations[0].alt_allele, "T");
    }

    #[test]
    fn missing_vcf_is_err() {
        let registry = registry("chr1\t100\t110\n");
        assert!(confirmed_variations(Path::new("/no/such.vcf.gz"), &registry).is_err());
    }
}
