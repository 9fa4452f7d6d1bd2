use std::error::Error;
use std::fmt::{Display, Formatter, Write as _};
use std::io::Write;

use itertools::Itertools;

use crate::fastq::{
    FASTA_TITLE_PREFIX, FASTQ_QUALITY_SCORE_SEPARATOR, FASTQ_TITLE_PREFIX, OUTPUT_LINE_WIDTH,
};
use crate::record::ReadRecord;

#[derive(Debug)]
pub enum FastqWriterError {
    IoError(std::io::Error),
}

impl From<std::io::Error> for FastqWriterError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e)
    }
}

impl Display for FastqWriterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FastqWriterError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl Error for FastqWriterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FastqWriterError::IoError(e) => Some(e),
        }
    }
}

pub type FastqWriteResult<T> = Result<T, FastqWriterError>;

/// Output representation of a record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Fastq,
    Fasta,
    /// Space-separated numeric quality scores under a FASTA-style header.
    Qual,
}

impl OutputFormat {
    pub const VALUES: [OutputFormat; 3] =
        [OutputFormat::Fastq, OutputFormat::Fasta, OutputFormat::Qual];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Fastq => "fastq",
            OutputFormat::Fasta => "fasta",
            OutputFormat::Qual => "qual",
        }
    }

    #[must_use]
    pub fn format(&self, record: &ReadRecord) -> String {
        match self {
            OutputFormat::Fastq => format_fastq(record),
            OutputFormat::Fasta => format_fasta(record),
            OutputFormat::Qual => format_qual(record),
        }
    }
}

/// Whether a record produces any output at all: filtered unpaired records
/// are dropped entirely.
fn is_written(record: &ReadRecord) -> bool {
    !record.is_filtered() || record.pair().is_some()
}

pub(crate) fn format_fastq(record: &ReadRecord) -> String {
    if !is_written(record) {
        return String::new();
    }

    let (sequence, quality) = if record.is_filtered() {
        ("", "")
    } else {
        (record.sequence(), record.quality())
    };

    format!(
        "{}{}\n{}\n{}\n{}\n",
        FASTQ_TITLE_PREFIX,
        record.id(),
        sequence,
        FASTQ_QUALITY_SCORE_SEPARATOR,
        quality
    )
}

pub(crate) fn format_fasta(record: &ReadRecord) -> String {
    if !is_written(record) {
        return String::new();
    }

    let mut output = format!("{}{}\n", FASTA_TITLE_PREFIX, record.id());
    let sequence = if record.is_filtered() {
        ""
    } else {
        record.sequence()
    };
    push_wrapped(
        &mut output,
        sequence
            .as_bytes()
            .chunks(OUTPUT_LINE_WIDTH)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned()),
    );

    output
}

pub(crate) fn format_qual(record: &ReadRecord) -> String {
    if !is_written(record) {
        return String::new();
    }

    let mut output = format!("{}{}\n", FASTA_TITLE_PREFIX, record.id());
    let scores = if record.is_filtered() {
        Vec::new()
    } else {
        record.quality_scores()
    };
    push_wrapped(
        &mut output,
        scores
            .chunks(OUTPUT_LINE_WIDTH)
            .map(|chunk| chunk.iter().join(" ")),
    );

    output
}

fn push_wrapped<I: Iterator<Item = String>>(output: &mut String, lines: I) {
    let mut empty = true;
    for line in lines {
        // Writing to a `String` cannot fail.
        let _ = writeln!(output, "{}", line);
        empty = false;
    }
    if empty {
        output.push('\n');
    }
}

/// Writes [`ReadRecord`]s in one of the [`OutputFormat`]s.
#[derive(Debug)]
pub struct RecordWriter<W> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> RecordWriter<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self::with_format(writer, OutputFormat::default())
    }

    #[must_use]
    pub fn with_format(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn write_record(&mut self, record: &ReadRecord) -> FastqWriteResult<()> {
        let text = self.format.format(record);
        self.writer.write_all(text.as_bytes())?;

        Ok(())
    }

    pub fn flush(&mut self) -> FastqWriteResult<()> {
        self.writer.flush()?;

        Ok(())
    }
}
