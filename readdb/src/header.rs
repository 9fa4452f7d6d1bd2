//! Read identity parsing for the FASTQ header dialects produced by
//! Illumina (pre-Casava and Casava 1.8+), SRA dumps and Roche/454.
//!
//! Dialects overlap, so they are tried in the fixed order of
//! [`HeaderDialect::VALUES`] and the first match wins.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::fastq::FASTQ_TITLE_PREFIX;

/// Error occurring during parsing a record header.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum HeaderParseError {
    /// The line does not start with `@`.
    MissingPrefix(String),
    /// No header dialect accepts the line.
    Unparseable(String),
}

impl Display for HeaderParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderParseError::MissingPrefix(header) => {
                write!(f, "Header does not start with `@`: `{}`", header)
            }
            HeaderParseError::Unparseable(header) => {
                write!(f, "Unparseable header: `{}`", header)
            }
        }
    }
}

impl Error for HeaderParseError {}

/// The result of parsing a header.
pub type HeaderParseResult<T> = Result<T, HeaderParseError>;

/// Identity of a read: base id shared by mates, pair index and barcode.
///
/// The [`Display`] form (`base[#barcode][/pair]`) is the canonical output
/// key and parses back to the same identity.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct ReadId {
    base: String,
    pair: Option<u8>,
    barcode: Option<String>,
}

impl ReadId {
    /// Creates a new read identity. The barcode is upper-cased.
    ///
    /// # Examples
    /// ```
    /// use readdb::header::ReadId;
    ///
    /// let id = ReadId::new("INST:1:2:3:4", Some(1), Some("acgt"));
    /// assert_eq!(id.to_string(), "INST:1:2:3:4#ACGT/1");
    /// ```
    #[must_use]
    pub fn new<T: Into<String>>(base: T, pair: Option<u8>, barcode: Option<&str>) -> Self {
        Self {
            base: base.into(),
            pair,
            barcode: barcode.map(str::to_ascii_uppercase),
        }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn pair(&self) -> Option<u8> {
        self.pair
    }

    #[must_use]
    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    pub(crate) fn set_barcode(&mut self, barcode: Option<String>) {
        self.barcode = barcode;
    }
}

impl Display for ReadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)?;
        if let Some(barcode) = &self.barcode {
            write!(f, "#{}", barcode)?;
        }
        if let Some(pair) = self.pair {
            write!(f, "/{}", pair)?;
        }

        Ok(())
    }
}

/// A header dialect, i.e. one rule of the header grammar.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HeaderDialect {
    /// `@BASE#BARCODE/PAIR`
    IlluminaBarcodePair,
    /// `@BASE/PAIR#BARCODE`
    IlluminaPairBarcode,
    /// `@BASE PAIR:FILTERED:CONTROL:I7+I5`
    Casava18DualIndex,
    /// `@BASE PAIR:FILTERED:CONTROL:BARCODE`
    Casava18Barcode,
    /// `@BASE PAIR:FILTERED:CONTROL:SAMPLE_NUMBER`
    Casava18,
    /// `@BASE#SAMPLE_NUMBER/PAIR`
    IlluminaIndexPair,
    /// `@BASE/PAIR`
    IlluminaPair,
    /// `@BASE#BARCODE`
    IlluminaBarcode,
    /// `@BASE#SAMPLE_NUMBER`
    IlluminaIndex,
    /// `@SRR000001.1.PAIR ...`
    SraPair,
    /// `@ACCESSION ... barcode=BARCODE ...`
    Roche454Barcode,
    /// `@ACCESSION.f` or `@ACCESSION.r`
    Roche454Pair,
    /// `@ACCESSION ...`
    Roche454,
    /// Everything up to the first whitespace.
    Generic,
}

impl HeaderDialect {
    /// All dialects, in the order they are tried.
    pub const VALUES: [HeaderDialect; 14] = [
        HeaderDialect::IlluminaBarcodePair,
        HeaderDialect::IlluminaPairBarcode,
        HeaderDialect::Casava18DualIndex,
        HeaderDialect::Casava18Barcode,
        HeaderDialect::Casava18,
        HeaderDialect::IlluminaIndexPair,
        HeaderDialect::IlluminaPair,
        HeaderDialect::IlluminaBarcode,
        HeaderDialect::IlluminaIndex,
        HeaderDialect::SraPair,
        HeaderDialect::Roche454Barcode,
        HeaderDialect::Roche454Pair,
        HeaderDialect::Roche454,
        HeaderDialect::Generic,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            HeaderDialect::IlluminaBarcodePair => "illumina-barcode-pair",
            HeaderDialect::IlluminaPairBarcode => "illumina-pair-barcode",
            HeaderDialect::Casava18DualIndex => "casava18-dual-index",
            HeaderDialect::Casava18Barcode => "casava18-barcode",
            HeaderDialect::Casava18 => "casava18",
            HeaderDialect::IlluminaIndexPair => "illumina-index-pair",
            HeaderDialect::IlluminaPair => "illumina-pair",
            HeaderDialect::IlluminaBarcode => "illumina-barcode",
            HeaderDialect::IlluminaIndex => "illumina-index",
            HeaderDialect::SraPair => "sra-pair",
            HeaderDialect::Roche454Barcode => "roche454-barcode",
            HeaderDialect::Roche454Pair => "roche454-pair",
            HeaderDialect::Roche454 => "roche454",
            HeaderDialect::Generic => "generic",
        }
    }

    /// Tries to parse a header title (the header line without the leading
    /// `@`) using this dialect only.
    #[must_use]
    pub fn parse(&self, title: &str) -> Option<ReadId> {
        let (token, comment) = split_title(title);
        if token.is_empty() {
            return None;
        }

        match self {
            HeaderDialect::IlluminaBarcodePair => {
                let (rest, pair) = token.rsplit_once('/')?;
                let (base, barcode) = rest.rsplit_once('#')?;
                id(base, Some(parse_pair(pair)?), Some(parse_barcode(barcode)?))
            }
            HeaderDialect::IlluminaPairBarcode => {
                let (rest, barcode) = token.rsplit_once('#')?;
                let (base, pair) = rest.rsplit_once('/')?;
                id(base, Some(parse_pair(pair)?), Some(parse_barcode(barcode)?))
            }
            HeaderDialect::Casava18DualIndex => {
                let (pair, index) = casava_fields(comment)?;
                let (i7, i5) = index.split_once('+')?;
                let barcode = parse_barcode(i7)? + &parse_barcode(i5)?;
                id(token, Some(pair), Some(barcode))
            }
            HeaderDialect::Casava18Barcode => {
                let (pair, index) = casava_fields(comment)?;
                id(token, Some(pair), Some(parse_barcode(index)?))
            }
            HeaderDialect::Casava18 => {
                let (pair, index) = casava_fields(comment)?;
                if !index.is_empty() && !is_sample_number(index) {
                    return None;
                }
                // `base/pair` would be re-split at the `#` when parsed back.
                if has_index_suffix(token) {
                    return None;
                }
                id(token, Some(pair), None)
            }
            HeaderDialect::IlluminaIndexPair => {
                let (rest, pair) = token.rsplit_once('/')?;
                let (base, index) = rest.rsplit_once('#')?;
                if !is_sample_number(index) {
                    return None;
                }
                id(base, Some(parse_pair(pair)?), None)
            }
            HeaderDialect::IlluminaPair => {
                let (base, pair) = token.rsplit_once('/')?;
                id(base, Some(parse_pair(pair)?), None)
            }
            HeaderDialect::IlluminaBarcode => {
                let (base, barcode) = token.rsplit_once('#')?;
                id(base, None, Some(parse_barcode(barcode)?))
            }
            HeaderDialect::IlluminaIndex => {
                let (base, index) = token.rsplit_once('#')?;
                if !is_sample_number(index) {
                    return None;
                }
                id(base, None, None)
            }
            HeaderDialect::SraPair => {
                let (base, pair) = token.rsplit_once('.')?;
                let (accession, spot) = base.split_once('.')?;
                if !is_sra_accession(accession) || !is_sample_number(spot) {
                    return None;
                }
                id(base, Some(parse_pair(pair)?), None)
            }
            HeaderDialect::Roche454Barcode => {
                if !is_454_accession(token) {
                    return None;
                }
                let barcode = comment
                    .split_whitespace()
                    .find_map(|attribute| attribute.strip_prefix("barcode="))?;
                id(token, None, Some(parse_barcode(barcode)?))
            }
            HeaderDialect::Roche454Pair => {
                let (base, direction) = token.rsplit_once('.')?;
                if !is_454_accession(base) {
                    return None;
                }
                let pair = match direction {
                    "f" => 1,
                    "r" => 2,
                    _ => return None,
                };
                id(base, Some(pair), None)
            }
            HeaderDialect::Roche454 => {
                if !is_454_accession(token) {
                    return None;
                }
                id(token, None, None)
            }
            HeaderDialect::Generic => id(token, None, None),
        }
    }
}

impl Display for HeaderDialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Read identity together with the dialect that produced it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsedHeader {
    pub id: ReadId,
    pub dialect: HeaderDialect,
}

/// Parses a raw header line (including the leading `@`).
///
/// # Examples
/// ```
/// use readdb::header::{parse_header, HeaderDialect};
///
/// let parsed = parse_header("@INST:1:2:3:4#ACGT/1").unwrap();
/// assert_eq!(parsed.id.base(), "INST:1:2:3:4");
/// assert_eq!(parsed.id.barcode(), Some("ACGT"));
/// assert_eq!(parsed.id.pair(), Some(1));
/// assert_eq!(parsed.dialect, HeaderDialect::IlluminaBarcodePair);
/// ```
pub fn parse_header(line: &str) -> HeaderParseResult<ParsedHeader> {
    let title = line
        .strip_prefix(FASTQ_TITLE_PREFIX)
        .ok_or_else(|| HeaderParseError::MissingPrefix(line.to_owned()))?;

    HeaderDialect::VALUES
        .iter()
        .find_map(|&dialect| dialect.parse(title).map(|id| ParsedHeader { id, dialect }))
        .ok_or_else(|| HeaderParseError::Unparseable(line.to_owned()))
}

fn id(base: &str, pair: Option<u8>, barcode: Option<String>) -> Option<ReadId> {
    if base.is_empty() {
        return None;
    }

    Some(ReadId {
        base: base.to_owned(),
        pair,
        barcode,
    })
}

fn split_title(title: &str) -> (&str, &str) {
    match title.find(char::is_whitespace) {
        Some(pos) => (&title[..pos], title[pos..].trim_start()),
        None => (title, ""),
    }
}

fn parse_pair(value: &str) -> Option<u8> {
    match value {
        "1" => Some(1),
        "2" => Some(2),
        _ => None,
    }
}

fn parse_barcode(value: &str) -> Option<String> {
    let valid = !value.is_empty()
        && value
            .bytes()
            .all(|byte| matches!(byte.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N'));

    valid.then(|| value.to_ascii_uppercase())
}

fn is_sample_number(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}

/// Whether `token` ends with a `#` field that an Illumina token rule splits
/// off as a barcode or a sample number.
fn has_index_suffix(token: &str) -> bool {
    token
        .rsplit_once('#')
        .map_or(false, |(_, index)| {
            parse_barcode(index).is_some() || is_sample_number(index)
        })
}

/// Parses the first comment field of a Casava 1.8+ header, returning the
/// pair index and the (unvalidated) index sequence.
fn casava_fields(comment: &str) -> Option<(u8, &str)> {
    let field = comment.split_whitespace().next()?;
    let mut parts = field.splitn(4, ':');

    let pair = parse_pair(parts.next()?)?;
    if !matches!(parts.next()?, "Y" | "N") {
        return None;
    }
    if !is_sample_number(parts.next()?) {
        return None;
    }

    Some((pair, parts.next()?))
}

fn is_sra_accession(value: &str) -> bool {
    let digits = ["SRR", "ERR", "DRR"]
        .iter()
        .find_map(|&prefix| value.strip_prefix(prefix));

    matches!(digits, Some(digits) if is_sample_number(digits))
}

const ROCHE_454_ACCESSION_LEN: usize = 14;

fn is_454_accession(value: &str) -> bool {
    value.len() == ROCHE_454_ACCESSION_LEN
        && value
            .bytes()
            .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use crate::header::{parse_header, HeaderDialect, HeaderParseError, ReadId};

    fn assert_parses(header: &str, dialect: HeaderDialect, expected: ReadId) {
        let parsed = parse_header(header).unwrap();

        assert_eq!(parsed.dialect, dialect, "header: {}", header);
        assert_eq!(parsed.id, expected, "header: {}", header);
    }

    #[test]
    fn test_illumina_barcode_pair() {
        assert_parses(
            "@INST:1:2:3:4#ACGT/1",
            HeaderDialect::IlluminaBarcodePair,
            ReadId::new("INST:1:2:3:4", Some(1), Some("ACGT")),
        );
        assert_parses(
            "@INST:1:2:3:4#acgn/2 extra",
            HeaderDialect::IlluminaBarcodePair,
            ReadId::new("INST:1:2:3:4", Some(2), Some("ACGN")),
        );
    }

    #[test]
    fn test_illumina_pair_barcode() {
        assert_parses(
            "@INST:1:2:3:4/2#TTGA",
            HeaderDialect::IlluminaPairBarcode,
            ReadId::new("INST:1:2:3:4", Some(2), Some("TTGA")),
        );
    }

    #[test]
    fn test_casava18_dual_index() {
        assert_parses(
            "@M00123:45:000000000-ABCDE:1:1101:15589:1332 1:N:0:ACGTAC+GGTTAA",
            HeaderDialect::Casava18DualIndex,
            ReadId::new(
                "M00123:45:000000000-ABCDE:1:1101:15589:1332",
                Some(1),
                Some("ACGTACGGTTAA"),
            ),
        );
    }

    #[test]
    fn test_casava18_barcode() {
        assert_parses(
            "@M00123:45:FC:1:1101:15589:1332 2:Y:0:acgtac",
            HeaderDialect::Casava18Barcode,
            ReadId::new("M00123:45:FC:1:1101:15589:1332", Some(2), Some("ACGTAC")),
        );
    }

    #[test]
    fn test_casava18() {
        assert_parses(
            "@M00123:45:FC:1:1101:15589:1332 1:N:0:2",
            HeaderDialect::Casava18,
            ReadId::new("M00123:45:FC:1:1101:15589:1332", Some(1), None),
        );
        assert_parses(
            "@M00123:45:FC:1:1101:15589:1332 2:N:0:",
            HeaderDialect::Casava18,
            ReadId::new("M00123:45:FC:1:1101:15589:1332", Some(2), None),
        );
    }

    #[test]
    fn should_not_read_casava18_base_with_index_suffix() {
        assert_parses(
            "@abc#ACGT 1:N:0:1",
            HeaderDialect::IlluminaBarcode,
            ReadId::new("abc", None, Some("ACGT")),
        );
        assert_parses(
            "@abc#x 1:N:0:1",
            HeaderDialect::Casava18,
            ReadId::new("abc#x", Some(1), None),
        );

        for header in ["@abc#ACGT 1:N:0:1", "@abc#7 2:N:0:", "@abc#x 1:N:0:1"] {
            let id = parse_header(header).unwrap().id;
            assert_eq!(parse_header(&format!("@{}", id)).unwrap().id, id);
        }
    }

    #[test]
    fn test_illumina_index_pair() {
        assert_parses(
            "@HWI-ST1234:8:1101:1234:2000#0/1",
            HeaderDialect::IlluminaIndexPair,
            ReadId::new("HWI-ST1234:8:1101:1234:2000", Some(1), None),
        );
    }

    #[test]
    fn test_illumina_pair() {
        assert_parses(
            "@HWI-ST1234:8:1101:1234:2000/2",
            HeaderDialect::IlluminaPair,
            ReadId::new("HWI-ST1234:8:1101:1234:2000", Some(2), None),
        );
    }

    #[test]
    fn test_illumina_barcode() {
        assert_parses(
            "@HWI-ST1234:8:1101:1234:2000#GATTACA",
            HeaderDialect::IlluminaBarcode,
            ReadId::new("HWI-ST1234:8:1101:1234:2000", None, Some("GATTACA")),
        );
    }

    #[test]
    fn test_illumina_index() {
        assert_parses(
            "@HWI-ST1234:8:1101:1234:2000#0",
            HeaderDialect::IlluminaIndex,
            ReadId::new("HWI-ST1234:8:1101:1234:2000", None, None),
        );
    }

    #[test]
    fn test_sra_pair() {
        assert_parses(
            "@SRR001666.1.2 071112_SLXA-EAS1_s_7:5:1:817:345 length=36",
            HeaderDialect::SraPair,
            ReadId::new("SRR001666.1", Some(2), None),
        );
    }

    #[test]
    fn test_roche454_barcode() {
        assert_parses(
            "@GCJ2ZLE01BPFQH rank=0000048 barcode=acgagtgcgt length=250",
            HeaderDialect::Roche454Barcode,
            ReadId::new("GCJ2ZLE01BPFQH", None, Some("ACGAGTGCGT")),
        );
    }

    #[test]
    fn test_roche454_pair() {
        assert_parses(
            "@GCJ2ZLE01BPFQH.r",
            HeaderDialect::Roche454Pair,
            ReadId::new("GCJ2ZLE01BPFQH", Some(2), None),
        );
    }

    #[test]
    fn test_roche454() {
        assert_parses(
            "@GCJ2ZLE01BPFQH rank=0000048 x=1336.0 y=1229.0 length=250",
            HeaderDialect::Roche454,
            ReadId::new("GCJ2ZLE01BPFQH", None, None),
        );
    }

    #[test]
    fn test_generic() {
        assert_parses(
            "@read_42 some description",
            HeaderDialect::Generic,
            ReadId::new("read_42", None, None),
        );
        assert_parses(
            "@SRR001666.1 071112_SLXA-EAS1_s_7:5:1:817:345",
            HeaderDialect::Generic,
            ReadId::new("SRR001666.1", None, None),
        );
    }

    #[test]
    fn test_priority_order() {
        // The comment would match Casava 1.8, but the token rule comes first.
        assert_parses(
            "@BASE#ACGT/1 2:N:0:GGGG",
            HeaderDialect::IlluminaBarcodePair,
            ReadId::new("BASE", Some(1), Some("ACGT")),
        );
        // Not a barcode, falls back to the sample-number rule.
        assert_parses(
            "@BASE#0/2",
            HeaderDialect::IlluminaIndexPair,
            ReadId::new("BASE", Some(2), None),
        );
        // Invalid pair index, so only the catch-all accepts it.
        assert_parses(
            "@BASE/3",
            HeaderDialect::Generic,
            ReadId::new("BASE/3", None, None),
        );
    }

    #[test]
    fn test_identity_round_trip() {
        let ids = [
            ReadId::new("INST:1:2:3:4", Some(1), Some("ACGT")),
            ReadId::new("INST:1:2:3:4", Some(2), None),
            ReadId::new("INST:1:2:3:4", None, Some("NNAC")),
            ReadId::new("INST:1:2:3:4", None, None),
            ReadId::new("GCJ2ZLE01BPFQH", None, None),
        ];

        for id in ids {
            let parsed = parse_header(&format!("@{}", id)).unwrap();
            assert_eq!(parsed.id, id);
        }
    }

    #[test]
    fn test_every_dialect_rejects_empty_title() {
        for dialect in HeaderDialect::VALUES {
            assert!(dialect.parse("").is_none(), "dialect: {}", dialect);
            assert!(dialect.parse(" comment").is_none(), "dialect: {}", dialect);
        }
    }

    #[test]
    fn should_fail_on_unparseable_header() {
        assert_eq!(
            parse_header("@").unwrap_err(),
            HeaderParseError::Unparseable("@".to_owned())
        );
        assert_eq!(
            parse_header("@ description only").unwrap_err(),
            HeaderParseError::Unparseable("@ description only".to_owned())
        );
        assert_eq!(
            parse_header("read").unwrap_err(),
            HeaderParseError::MissingPrefix("read".to_owned())
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", HeaderParseError::Unparseable("@".to_owned())),
            "Unparseable header: `@`"
        );
        assert_eq!(
            format!("{}", HeaderParseError::MissingPrefix("x".to_owned())),
            "Header does not start with `@`: `x`"
        );
    }
}
