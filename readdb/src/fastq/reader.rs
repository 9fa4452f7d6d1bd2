use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use log::warn;

use crate::fastq::consts::{FASTQ_VALID_NUCLEOTIDE_BYTES, FASTQ_VALID_Q_SCORE_BYTES};
use crate::fastq::{FASTQ_QUALITY_SCORE_SEPARATOR, FASTQ_TITLE_PREFIX};
use crate::progress::ByteNum;

/// Error occurring during reading a FASTQ file.
///
/// Structural problems inside a single record are not errors: they are
/// logged, counted and the reader resynchronizes at the next header.
#[derive(Debug)]
pub enum FastqReaderError {
    /// I/O error occurred when reading the FASTQ file.
    IoError(std::io::Error),
}

impl From<std::io::Error> for FastqReaderError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e)
    }
}

impl Display for FastqReaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FastqReaderError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl Error for FastqReaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FastqReaderError::IoError(e) => Some(e),
        }
    }
}

/// The result of a FASTQ reading operation.
pub type FastqResult<T> = Result<T, FastqReaderError>;

/// Reason a partially read record was discarded.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MalformedRecord {
    /// A header line appeared where the sequence or separator was expected.
    UnexpectedHeader,
    /// The sequence line contains a non-IUPAC character.
    InvalidNucleotide(char),
    /// The third line of the record does not start with `+`.
    MissingSeparator,
    /// The quality line contains a character outside of `!`..=`~`.
    InvalidQualityScore(char),
    /// Sequence and quality lines differ in length.
    LengthMismatch { sequence: usize, quality: usize },
    /// The input ended in the middle of the record.
    Truncated,
}

impl Display for MalformedRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedRecord::UnexpectedHeader => write!(f, "unexpected header line"),
            MalformedRecord::InvalidNucleotide(ch) => write!(f, "invalid nucleotide: `{}`", ch),
            MalformedRecord::MissingSeparator => write!(f, "missing `+` separator line"),
            MalformedRecord::InvalidQualityScore(ch) => {
                write!(f, "invalid quality score: `{}`", ch)
            }
            MalformedRecord::LengthMismatch { sequence, quality } => write!(
                f,
                "sequence and quality length mismatch ({} vs {})",
                sequence, quality
            ),
            MalformedRecord::Truncated => write!(f, "record truncated by end of file"),
        }
    }
}

/// A single structurally valid FASTQ record, before header parsing.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawRecord {
    /// Full header line, including the leading `@`.
    pub header: String,
    pub sequence: String,
    pub quality: String,
    /// 1-based line number of the header line.
    pub line: usize,
    /// Number of input bytes this record (and any skipped garbage before it)
    /// occupied.
    pub size: ByteNum,
}

#[derive(Debug)]
struct Line {
    number: usize,
    text: String,
}

/// 4-line FASTQ reader that resynchronizes at the next header after a
/// malformed record.
#[derive(Debug)]
pub struct FastqReader<R> {
    reader: R,
    buffer: Vec<u8>,
    pending: Option<Line>,
    line_num: usize,
    bytes_read: usize,
    malformed: usize,
}

impl<R: BufRead> FastqReader<R> {
    /// Creates new `FastqReader` instance.
    ///
    /// # Examples
    /// ```
    /// use readdb::fastq::reader::FastqReader;
    ///
    /// let buf = Vec::new();
    /// let _reader = FastqReader::new(buf.as_slice());
    /// ```
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(4096),
            pending: None,
            line_num: 0,
            bytes_read: 0,
            malformed: 0,
        }
    }

    /// Number of records discarded so far because they were malformed.
    #[must_use]
    pub fn malformed_records(&self) -> usize {
        self.malformed
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    /// Reads the next structurally valid record, or `None` at the end of
    /// input.
    pub fn read_record(&mut self) -> FastqResult<Option<RawRecord>> {
        self.bytes_read = 0;

        loop {
            let header = match self.next_header()? {
                Some(header) => header,
                None => return Ok(None),
            };

            let sequence = match self.next_line()? {
                Some(line) => line,
                None => {
                    self.discard(header.number, MalformedRecord::Truncated);
                    return Ok(None);
                }
            };
            if sequence.text.starts_with(FASTQ_TITLE_PREFIX) {
                self.discard(sequence.number, MalformedRecord::UnexpectedHeader);
                self.pending = Some(sequence);
                continue;
            }
            if let Some(&byte) = sequence
                .text
                .as_bytes()
                .iter()
                .find(|&&byte| !FASTQ_VALID_NUCLEOTIDE_BYTES[byte as usize])
            {
                self.discard(
                    sequence.number,
                    MalformedRecord::InvalidNucleotide(byte as char),
                );
                continue;
            }

            let separator = match self.next_line()? {
                Some(line) => line,
                None => {
                    self.discard(header.number, MalformedRecord::Truncated);
                    return Ok(None);
                }
            };
            if !separator.text.starts_with(FASTQ_QUALITY_SCORE_SEPARATOR) {
                self.discard(separator.number, MalformedRecord::MissingSeparator);
                if separator.text.starts_with(FASTQ_TITLE_PREFIX) {
                    self.pending = Some(separator);
                }
                continue;
            }

            let quality = match self.next_line()? {
                Some(line) => line,
                None => {
                    self.discard(header.number, MalformedRecord::Truncated);
                    return Ok(None);
                }
            };
            if quality.text.len() != sequence.text.len() {
                self.discard(
                    quality.number,
                    MalformedRecord::LengthMismatch {
                        sequence: sequence.text.len(),
                        quality: quality.text.len(),
                    },
                );
                if quality.text.starts_with(FASTQ_TITLE_PREFIX) {
                    self.pending = Some(quality);
                }
                continue;
            }
            if let Some(&byte) = quality
                .text
                .as_bytes()
                .iter()
                .find(|&&byte| !FASTQ_VALID_Q_SCORE_BYTES[byte as usize])
            {
                self.discard(
                    quality.number,
                    MalformedRecord::InvalidQualityScore(byte as char),
                );
                continue;
            }

            return Ok(Some(RawRecord {
                header: header.text,
                sequence: sequence.text,
                quality: quality.text,
                line: header.number,
                size: ByteNum::new(self.bytes_read),
            }));
        }
    }

    fn next_header(&mut self) -> FastqResult<Option<Line>> {
        loop {
            let line = match self.next_line()? {
                Some(line) => line,
                None => return Ok(None),
            };

            if line.text.starts_with(FASTQ_TITLE_PREFIX) {
                return Ok(Some(line));
            }
            if !line.text.trim().is_empty() {
                warn!(
                    "Line {}: expected a record header, skipping line",
                    line.number
                );
            }
        }
    }

    fn next_line(&mut self) -> FastqResult<Option<Line>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }

        self.buffer.clear();
        let bytes_read = self.reader.read_until(b'\n', &mut self.buffer)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        self.bytes_read += bytes_read;
        self.line_num += 1;

        while matches!(self.buffer.last(), Some(b'\n' | b'\r')) {
            self.buffer.pop();
        }

        Ok(Some(Line {
            number: self.line_num,
            text: String::from_utf8_lossy(&self.buffer).into_owned(),
        }))
    }

    fn discard(&mut self, line: usize, reason: MalformedRecord) {
        self.malformed += 1;
        warn!("Line {}: discarding malformed record: {}", line, reason);
    }
}

impl<R: BufRead> IntoIterator for FastqReader<R> {
    type Item = FastqResult<RawRecord>;
    type IntoIter = FastqReaderIterator<R>;

    fn into_iter(self) -> Self::IntoIter {
        Self::IntoIter {
            reader: self,
            no_errors: true,
        }
    }
}

/// Iterator implementation for [`FastqReader`] which iterates over all
/// structurally valid records in a file.
#[derive(Debug)]
pub struct FastqReaderIterator<R> {
    reader: FastqReader<R>,
    no_errors: bool,
}

impl<R> FastqReaderIterator<R> {
    /// Returns the underlying reader.
    #[must_use]
    pub fn reader(&self) -> &FastqReader<R> {
        &self.reader
    }
}

impl<R: BufRead> Iterator for FastqReaderIterator<R> {
    type Item = FastqResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.no_errors {
            return None;
        }

        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.no_errors = false;
                None
            }
            Err(e) => {
                self.no_errors = false;
                Some(Err(e))
            }
        }
    }
}

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Wraps `reader` in a gzip decoder if its contents start with the gzip
/// magic bytes.
pub fn decompressing_reader<R: BufRead + 'static>(
    mut reader: R,
) -> std::io::Result<Box<dyn BufRead>> {
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Opens a plain or gzip-compressed FASTQ file.
pub fn open_path<P: AsRef<Path>>(path: P) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    decompressing_reader(BufReader::new(file))
}
