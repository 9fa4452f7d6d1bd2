//! Barcode catalog: canonical barcodes, their single-substitution variants
//! and correction of record barcodes against them.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{debug, info, warn};

use crate::fastq::FASTA_TITLE_PREFIX;
use crate::record::{FilterReason, ReadRecord};

/// Bases substituted when generating barcode variants.
pub const VARIANT_ALPHABET: [u8; 5] = *b"ATCGN";

/// Error occurring when loading a barcode reference file.
#[derive(Debug)]
pub enum BarcodeFileError {
    /// I/O error occurred when reading the file.
    IoError(std::io::Error),
    /// The tabular file could not be parsed.
    CsvError(csv::Error),
    /// A row does not have the configured (1-based) column.
    MissingColumn { line: usize, column: usize },
    /// A barcode contains characters other than `ACGTN`.
    InvalidBarcode { line: usize, barcode: String },
    /// A sequence line precedes the first label line of a FASTA-like file.
    UnexpectedLine(usize),
    /// The file contains no barcodes.
    Empty,
}

impl From<std::io::Error> for BarcodeFileError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e)
    }
}

impl From<csv::Error> for BarcodeFileError {
    fn from(e: csv::Error) -> Self {
        Self::CsvError(e)
    }
}

impl Display for BarcodeFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BarcodeFileError::IoError(e) => write!(f, "IO error: {}", e),
            BarcodeFileError::CsvError(e) => write!(f, "Tabular format error: {}", e),
            BarcodeFileError::MissingColumn { line, column } => {
                write!(f, "Line {}: missing column {}", line, column)
            }
            BarcodeFileError::InvalidBarcode { line, barcode } => {
                write!(f, "Line {}: invalid barcode: {}", line, barcode)
            }
            BarcodeFileError::UnexpectedLine(line) => {
                write!(f, "Line {}: sequence without a label line", line)
            }
            BarcodeFileError::Empty => write!(f, "No barcodes found"),
        }
    }
}

impl Error for BarcodeFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BarcodeFileError::IoError(e) => Some(e),
            BarcodeFileError::CsvError(e) => Some(e),
            _ => None,
        }
    }
}

pub type BarcodeFileResult<T> = Result<T, BarcodeFileError>;

/// Returns every string at Hamming distance 1 from `barcode` over
/// [`VARIANT_ALPHABET`].
///
/// # Examples
/// ```
/// use readdb::barcode::single_substitutions;
///
/// let variants = single_substitutions("AC");
/// assert_eq!(variants.len(), 8);
/// assert!(variants.contains(&"NC".to_owned()));
/// assert!(!variants.contains(&"AC".to_owned()));
/// ```
#[must_use]
pub fn single_substitutions(barcode: &str) -> Vec<String> {
    let bytes = barcode.as_bytes();
    let mut variants = Vec::with_capacity(bytes.len() * (VARIANT_ALPHABET.len() - 1));

    for pos in 0..bytes.len() {
        for base in VARIANT_ALPHABET {
            if bytes[pos] == base {
                continue;
            }

            let mut variant = bytes.to_vec();
            variant[pos] = base;
            variants.push(String::from_utf8_lossy(&variant).into_owned());
        }
    }

    variants
}

fn is_valid_barcode(barcode: &str) -> bool {
    !barcode.is_empty() && barcode.bytes().all(|byte| VARIANT_ALPHABET.contains(&byte))
}

/// How a [`BarcodeCatalog`] was built.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CatalogOrigin {
    /// Loaded from a reference list.
    Reference,
    /// Learned from the observed barcodes.
    Learned,
}

/// Set of canonical barcodes with their variant index.
///
/// The variant index only grows: a variant one substitution away from two
/// canonical barcodes keeps correcting to the one registered first. A
/// variant leaves the index only when it becomes canonical itself.
#[derive(Debug, Clone)]
pub struct BarcodeCatalog {
    origin: CatalogOrigin,
    counts: HashMap<String, u64>,
    labels: HashMap<String, String>,
    variants: HashMap<String, String>,
}

impl BarcodeCatalog {
    #[must_use]
    pub fn new(origin: CatalogOrigin) -> Self {
        Self {
            origin,
            counts: HashMap::new(),
            labels: HashMap::new(),
            variants: HashMap::new(),
        }
    }

    /// Loads a reference list from a file, see [`Self::from_reader`].
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        seq_col: usize,
        label_col: Option<usize>,
    ) -> BarcodeFileResult<Self> {
        let file = File::open(path.as_ref())?;
        let catalog = Self::from_reader(BufReader::new(file), seq_col, label_col)?;
        info!(
            "Loaded {} barcodes from {}",
            catalog.len(),
            path.as_ref().display()
        );

        Ok(catalog)
    }

    /// Loads a reference list.
    ///
    /// Input starting with `>` is read as FASTA-like label/sequence records
    /// (sequence lines are concatenated); anything else as a tab-separated
    /// table with the barcode in the 1-based column `seq_col` and an optional
    /// label in `label_col`. Lines starting with `#` are comments.
    pub fn from_reader<R: Read>(
        mut reader: R,
        seq_col: usize,
        label_col: Option<usize>,
    ) -> BarcodeFileResult<Self> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;

        let is_fasta_like = contents.trim_start().starts_with(FASTA_TITLE_PREFIX);
        let entries = if is_fasta_like {
            parse_fasta_like(&contents)?
        } else {
            parse_tabular(&contents, seq_col, label_col)?
        };

        let mut catalog = Self::new(CatalogOrigin::Reference);
        for entry in entries {
            if !is_valid_barcode(&entry.barcode) {
                return Err(BarcodeFileError::InvalidBarcode {
                    line: entry.line,
                    barcode: entry.barcode,
                });
            }
            if !catalog.add_canonical(&entry.barcode, entry.label.as_deref()) {
                warn!(
                    "Line {}: duplicate barcode {}, ignoring",
                    entry.line, entry.barcode
                );
            }
        }

        if catalog.is_empty() {
            return Err(BarcodeFileError::Empty);
        }
        Ok(catalog)
    }

    /// Registers a canonical barcode with count 0 and indexes its variants.
    /// Returns `false` if the barcode is already canonical.
    pub fn add_canonical(&mut self, barcode: &str, label: Option<&str>) -> bool {
        let barcode = barcode.to_ascii_uppercase();
        if self.counts.contains_key(&barcode) {
            return false;
        }

        if let Some(previous) = self.variants.remove(&barcode) {
            debug!("Barcode {} was a variant of {}", barcode, previous);
        }

        for variant in single_substitutions(&barcode) {
            if self.counts.contains_key(&variant) {
                continue;
            }
            self.variants
                .entry(variant)
                .or_insert_with(|| barcode.clone());
        }

        let label = label.map_or_else(|| barcode.clone(), str::to_owned);
        self.labels.insert(barcode.clone(), label);
        self.counts.insert(barcode, 0);
        true
    }

    #[must_use]
    pub fn origin(&self) -> CatalogOrigin {
        self.origin
    }

    /// Number of canonical barcodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    #[must_use]
    pub fn is_canonical(&self, barcode: &str) -> bool {
        self.counts.contains_key(barcode)
    }

    /// Returns the canonical barcode a variant corrects to.
    #[must_use]
    pub fn variant_of(&self, variant: &str) -> Option<&str> {
        self.variants.get(variant).map(String::as_str)
    }

    #[must_use]
    pub fn label(&self, barcode: &str) -> Option<&str> {
        self.labels.get(barcode).map(String::as_str)
    }

    #[must_use]
    pub fn counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    #[must_use]
    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }

    /// Filter reason of records whose barcode is not recognized.
    #[must_use]
    pub fn unrecognized_reason(&self) -> FilterReason {
        match self.origin {
            CatalogOrigin::Reference => FilterReason::InvalidBarcode,
            CatalogOrigin::Learned => FilterReason::BadBarcode,
        }
    }

    /// Resolves a barcode to its canonical form and tallies it. Returns
    /// `None` if the barcode is neither canonical nor a known variant.
    pub fn correct(&mut self, barcode: &str) -> Option<String> {
        let canonical = if self.counts.contains_key(barcode) {
            barcode.to_owned()
        } else {
            self.variants.get(barcode)?.clone()
        };

        if let Some(count) = self.counts.get_mut(&canonical) {
            *count += 1;
        }
        Some(canonical)
    }

    /// Rewrites the barcode of `record` to its canonical form, or filters the
    /// record if the barcode is missing or unrecognized.
    pub fn correct_record(&mut self, record: &mut ReadRecord) {
        let corrected = record.barcode().map(|barcode| (barcode.to_owned(), self.correct(barcode)));

        match corrected {
            Some((barcode, Some(canonical))) => {
                if barcode != canonical {
                    record.set_barcode(Some(canonical));
                }
            }
            _ => record.set_filter(self.unrecognized_reason()),
        }
    }
}

#[derive(Debug)]
struct BarcodeEntry {
    line: usize,
    barcode: String,
    label: Option<String>,
}

fn parse_tabular(
    contents: &str,
    seq_col: usize,
    label_col: Option<usize>,
) -> BarcodeFileResult<Vec<BarcodeEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(contents.as_bytes());

    let mut entries = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map_or(0, |pos| pos.line() as usize);
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let field = |column: usize| {
            column
                .checked_sub(1)
                .and_then(|index| row.get(index))
                .map(str::trim)
                .ok_or(BarcodeFileError::MissingColumn { line, column })
        };
        let barcode = field(seq_col)?.to_ascii_uppercase();
        let label = match label_col {
            Some(column) => Some(field(column)?.to_owned()),
            None => None,
        };

        entries.push(BarcodeEntry {
            line,
            barcode,
            label,
        });
    }

    Ok(entries)
}

fn parse_fasta_like(contents: &str) -> BarcodeFileResult<Vec<BarcodeEntry>> {
    let mut entries: Vec<BarcodeEntry> = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let line_num = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(title) = line.strip_prefix(FASTA_TITLE_PREFIX) {
            let label = title.split_whitespace().next().unwrap_or_default();
            entries.push(BarcodeEntry {
                line: line_num,
                barcode: String::new(),
                label: Some(label.to_owned()),
            });
        } else {
            let entry = entries
                .last_mut()
                .ok_or(BarcodeFileError::UnexpectedLine(line_num))?;
            entry.barcode.push_str(&line.to_ascii_uppercase());
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::barcode::{
        single_substitutions, BarcodeCatalog, BarcodeFileError, CatalogOrigin,
    };
    use crate::header::ReadId;
    use crate::record::{FilterReason, ReadRecord};

    fn barcoded_record(barcode: Option<&str>) -> ReadRecord {
        ReadRecord::new(ReadId::new("r", Some(1), barcode), "ACGT", "IIII")
    }

    #[test]
    fn test_single_substitutions() {
        let variants = single_substitutions("ACGT");

        assert_eq!(variants.len(), 16);
        assert!(variants.contains(&"NCGT".to_owned()));
        assert!(variants.contains(&"ACGA".to_owned()));
        assert!(variants.iter().all(|variant| variant != "ACGT"));
    }

    #[test]
    fn should_correct_variants() {
        let mut catalog = BarcodeCatalog::new(CatalogOrigin::Reference);
        catalog.add_canonical("ACGTAC", Some("sample1"));

        assert_eq!(catalog.correct("ACGTAC"), Some("ACGTAC".to_owned()));
        assert_eq!(catalog.correct("ACGTAN"), Some("ACGTAC".to_owned()));
        assert_eq!(catalog.correct("TTTTTT"), None);
        assert_eq!(catalog.counts()["ACGTAC"], 2);
        assert_eq!(catalog.label("ACGTAC"), Some("sample1"));
    }

    #[test]
    fn should_keep_first_registration_of_shared_variant() {
        let mut catalog = BarcodeCatalog::new(CatalogOrigin::Learned);
        catalog.add_canonical("AAAA", None);
        assert_eq!(catalog.variant_of("AAAT"), Some("AAAA"));

        // AAAT is one substitution away from both.
        catalog.add_canonical("AATT", None);
        assert_eq!(catalog.variant_of("AAAT"), Some("AAAA"));
        assert_eq!(catalog.correct("AAAT"), Some("AAAA".to_owned()));
        assert_eq!(catalog.variant_of("ATTT"), Some("AATT"));
        assert_eq!(catalog.label("AATT"), Some("AATT"));
    }

    #[test]
    fn should_promote_variant_to_canonical() {
        let mut catalog = BarcodeCatalog::new(CatalogOrigin::Reference);
        catalog.add_canonical("AAAA", None);
        assert_eq!(catalog.variant_of("AAAT"), Some("AAAA"));

        catalog.add_canonical("AAAT", None);
        assert_eq!(catalog.variant_of("AAAT"), None);
        assert_eq!(catalog.correct("AAAT"), Some("AAAT".to_owned()));
        assert!(!catalog.add_canonical("aaat", None));
    }

    #[test]
    fn should_correct_record() {
        let mut catalog = BarcodeCatalog::new(CatalogOrigin::Reference);
        catalog.add_canonical("ACGT", None);

        let mut record = barcoded_record(Some("ACGN"));
        catalog.correct_record(&mut record);
        assert_eq!(record.barcode(), Some("ACGT"));
        assert!(!record.is_filtered());

        let mut record = barcoded_record(Some("TTTT"));
        catalog.correct_record(&mut record);
        assert_eq!(record.filter_reason(), Some(FilterReason::InvalidBarcode));

        let mut record = barcoded_record(None);
        catalog.correct_record(&mut record);
        assert_eq!(record.filter_reason(), Some(FilterReason::InvalidBarcode));
    }

    #[test]
    fn should_use_bad_barcode_for_learned_catalog() {
        let mut catalog = BarcodeCatalog::new(CatalogOrigin::Learned);
        catalog.add_canonical("ACGT", None);

        let mut record = barcoded_record(Some("GGGG"));
        catalog.correct_record(&mut record);
        assert_eq!(record.filter_reason(), Some(FilterReason::BadBarcode));
    }

    #[test]
    fn should_load_tabular() {
        let file = "# barcode\tsample\nacgtac\tsample1\n\nTTGGCC\tsample2\n";
        let catalog = BarcodeCatalog::from_reader(file.as_bytes(), 1, Some(2)).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.origin(), CatalogOrigin::Reference);
        assert_eq!(catalog.label("ACGTAC"), Some("sample1"));
        assert_eq!(catalog.label("TTGGCC"), Some("sample2"));
    }

    #[test]
    fn should_load_tabular_with_custom_columns() {
        let file = "sample1\tACGTAC\nsample2\tTTGGCC\textra\n";
        let catalog = BarcodeCatalog::from_reader(file.as_bytes(), 2, None).unwrap();

        assert!(catalog.is_canonical("ACGTAC"));
        assert_eq!(catalog.label("TTGGCC"), Some("TTGGCC"));
    }

    #[test]
    fn should_fail_on_missing_column() {
        let file = "ACGTAC\tsample1\nTTGGCC\n";
        let result = BarcodeCatalog::from_reader(file.as_bytes(), 1, Some(2));

        assert!(matches!(
            result,
            Err(BarcodeFileError::MissingColumn { line: 2, column: 2 })
        ));
    }

    #[test]
    fn should_fail_on_invalid_barcode() {
        let result = BarcodeCatalog::from_reader("ACXT\n".as_bytes(), 1, None);

        assert!(matches!(
            result,
            Err(BarcodeFileError::InvalidBarcode { line: 1, .. })
        ));
    }

    #[test]
    fn should_load_fasta_like() {
        let file = ">sample1 first sample\nACGT\nac\n>sample2\nTTGGCC\n";
        let catalog = BarcodeCatalog::from_reader(file.as_bytes(), 1, None).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label("ACGTAC"), Some("sample1"));
        assert_eq!(catalog.label("TTGGCC"), Some("sample2"));
    }

    #[test]
    fn should_ignore_duplicates() {
        let catalog = BarcodeCatalog::from_reader("ACGT\tx\nACGT\ty\n".as_bytes(), 1, Some(2))
            .unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.label("ACGT"), Some("x"));
    }

    #[test]
    fn should_fail_on_empty_file() {
        let result = BarcodeCatalog::from_reader("# nothing\n".as_bytes(), 1, None);

        assert!(matches!(result, Err(BarcodeFileError::Empty)));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", BarcodeFileError::MissingColumn { line: 3, column: 2 }),
            "Line 3: missing column 2"
        );
        assert_eq!(format!("{}", BarcodeFileError::Empty), "No barcodes found");
    }

    #[test]
    fn test_error_source() {
        let io_error = std::io::Error::from(std::io::ErrorKind::NotFound);

        assert!(BarcodeFileError::from(io_error).source().is_some());
        assert!(BarcodeFileError::Empty.source().is_none());
    }
}
