use crate::utils::Result;

#[derive(Debug, PartialEq, Clone)]
pub struct GenomicRegion {
    pub contig: String,
    pub start: i64,
    pub end: i64,
}

impl GenomicRegion {
    pub fn new(contig: impl Into<String>, start: i64, end: i64) -> Result<Self> {
        if start < 0 {
            return Err(format!("Invalid region: negative start {}", start));
        }
        if start >= end {
            return Err(format!("Invalid region: start {} >= end {}", start, end));
        }

        Ok(Self {
            contig: contig.into(),
            start,
            end,
        })
    }

    /// Half-open interval overlap on the same contig.
    pub fn overlaps(&self, contig: &str, start: i64, end: i64) -> bool {
        self.contig == contig && start < self.end && self.start < end
    }
}
