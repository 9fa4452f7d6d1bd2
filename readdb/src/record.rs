use std::fmt::{Display, Formatter};

use log::trace;
use serde::Serialize;

use crate::fastq::consts::NUCLEOTIDE_COMPLEMENT;
use crate::fastq::writer::{format_fasta, format_fastq, format_qual};
use crate::header::ReadId;
use crate::progress::ByteNum;
use crate::quality::{canonical_scores, legacy_to_canonical, QualityEncoding};

/// Why a record is excluded from the output.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    TooShort,
    #[serde(rename = "too_many_N")]
    TooManyN,
    LowComplexity,
    TooManyLowQual,
    LowMeanQual,
    PoorQuality,
    /// Barcode not found in a reference barcode list.
    InvalidBarcode,
    /// Barcode not found in a learned barcode catalog.
    BadBarcode,
    /// Internal invariant violation.
    Error,
}

impl FilterReason {
    pub const VALUES: [FilterReason; 9] = [
        FilterReason::TooShort,
        FilterReason::TooManyN,
        FilterReason::LowComplexity,
        FilterReason::TooManyLowQual,
        FilterReason::LowMeanQual,
        FilterReason::PoorQuality,
        FilterReason::InvalidBarcode,
        FilterReason::BadBarcode,
        FilterReason::Error,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            FilterReason::TooShort => "too_short",
            FilterReason::TooManyN => "too_many_N",
            FilterReason::LowComplexity => "low_complexity",
            FilterReason::TooManyLowQual => "too_many_low_qual",
            FilterReason::LowMeanQual => "low_mean_qual",
            FilterReason::PoorQuality => "poor_quality",
            FilterReason::InvalidBarcode => "invalid_barcode",
            FilterReason::BadBarcode => "bad_barcode",
            FilterReason::Error => "error",
        }
    }
}

impl Display for FilterReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single read: identity, sequence, quality and filter status.
///
/// Once a filter reason is set the record is excluded from the output, but
/// its sequence and quality are still visible to (and mutated by) later
/// pipeline stages. A later stage may overwrite the reason; nothing clears
/// it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReadRecord {
    id: ReadId,
    sequence: String,
    quality: String,
    filter: Option<FilterReason>,
    quality_normalized: bool,
    size: ByteNum,
}

impl ReadRecord {
    /// Creates a new record with a canonical quality string.
    ///
    /// # Examples
    /// ```
    /// use readdb::header::ReadId;
    /// use readdb::record::ReadRecord;
    ///
    /// let record = ReadRecord::new(ReadId::new("r1", Some(1), None), "ACGT", "IIII");
    /// assert_eq!(record.identity(), "r1/1");
    /// assert_eq!(record.quality_scores(), vec![40, 40, 40, 40]);
    /// ```
    ///
    /// # Panics
    /// This function panics if the sequence and the quality differ in length.
    #[must_use]
    pub fn new<T: Into<String>, U: Into<String>>(id: ReadId, sequence: T, quality: U) -> Self {
        let record = Self::with_size(id, sequence.into(), quality.into(), ByteNum::ZERO);
        Self {
            quality_normalized: true,
            ..record
        }
    }

    /// Creates a record whose quality encoding has not been normalized yet.
    pub(crate) fn with_size(id: ReadId, sequence: String, quality: String, size: ByteNum) -> Self {
        assert_eq!(sequence.len(), quality.len());

        Self {
            id,
            sequence,
            quality,
            filter: None,
            quality_normalized: false,
            size,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ReadId {
        &self.id
    }

    #[must_use]
    pub fn base(&self) -> &str {
        self.id.base()
    }

    #[must_use]
    pub fn pair(&self) -> Option<u8> {
        self.id.pair()
    }

    #[must_use]
    pub fn barcode(&self) -> Option<&str> {
        self.id.barcode()
    }

    /// Returns the canonical output key, `base[#barcode][/pair]`.
    #[must_use]
    pub fn identity(&self) -> String {
        self.id.to_string()
    }

    #[must_use]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[must_use]
    pub fn quality(&self) -> &str {
        &self.quality
    }

    #[must_use]
    pub fn quality_scores(&self) -> Vec<i32> {
        canonical_scores(&self.quality)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Number of input bytes this record was read from.
    #[must_use]
    pub fn size(&self) -> ByteNum {
        self.size
    }

    #[must_use]
    pub fn filter_reason(&self) -> Option<FilterReason> {
        self.filter
    }

    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// Marks the record as excluded, replacing any previous reason.
    pub fn set_filter(&mut self, reason: FilterReason) {
        if let Some(previous) = self.filter {
            trace!(
                "{}: filter reason {} replaced by {}",
                self.id,
                previous,
                reason
            );
        }
        self.filter = Some(reason);
    }

    pub(crate) fn set_barcode(&mut self, barcode: Option<String>) {
        self.id.set_barcode(barcode);
    }

    /// Converts the quality string from `source` to the canonical encoding.
    /// Only the first call has an effect.
    pub fn normalize_quality(&mut self, source: QualityEncoding) {
        if self.quality_normalized {
            return;
        }

        if source == QualityEncoding::Legacy {
            self.quality = legacy_to_canonical(&self.quality);
        }
        self.quality_normalized = true;
    }

    #[must_use]
    pub fn is_quality_normalized(&self) -> bool {
        self.quality_normalized
    }

    /// Keeps only `start..end` of both the sequence and the quality.
    pub(crate) fn trim_to(&mut self, start: usize, end: usize) {
        if start == 0 && end == self.sequence.len() {
            return;
        }

        self.sequence = self.sequence[start..end].to_owned();
        self.quality = self.quality[start..end].to_owned();
    }

    /// Moves the first `len` bases into the barcode (Roche/454 multiplex
    /// identifier). Records shorter than `len` are filtered as too short.
    pub(crate) fn strip_leading_mid(&mut self, len: usize) {
        if self.sequence.len() < len {
            self.set_filter(FilterReason::TooShort);
            return;
        }

        let mid = self.sequence[..len].to_ascii_uppercase();
        self.trim_to(len, self.sequence.len());
        self.set_barcode(Some(mid));
    }

    /// Reverse-complements the sequence and reverses the quality.
    pub fn reverse_complement(&mut self) {
        self.sequence = self
            .sequence
            .bytes()
            .rev()
            .map(|byte| NUCLEOTIDE_COMPLEMENT[byte as usize] as char)
            .collect();
        self.quality = self.quality.chars().rev().collect();
    }

    /// Formats the record as FASTQ. Filtered records keep only their header
    /// (paired reads, so that mates stay in sync) or produce nothing.
    #[must_use]
    pub fn to_fastq(&self) -> String {
        format_fastq(self)
    }

    /// Formats the record as FASTA, see [`Self::to_fastq`] for filtered
    /// records.
    #[must_use]
    pub fn to_fasta(&self) -> String {
        format_fasta(self)
    }

    /// Formats the quality as space-separated scores, see [`Self::to_fastq`]
    /// for filtered records.
    #[must_use]
    pub fn to_qual(&self) -> String {
        format_qual(self)
    }
}
