//! Quality score encodings: conversion from the legacy (Phred+64) scale to
//! the canonical (Phred+33) one and majority-vote autodetection.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::BufRead;

use log::debug;
use serde::Serialize;

use crate::fastq::reader::{FastqReader, FastqReaderError};

/// ASCII offset of the canonical encoding.
pub const CANONICAL_OFFSET: u8 = 33;
/// ASCII offset of the legacy encoding.
pub const LEGACY_OFFSET: u8 = 64;

/// Shift applied by [`legacy_to_canonical`].
const LEGACY_SHIFT: u8 = 31;

/// Quality characters below this byte are only produced by the canonical
/// encoding.
const CANONICAL_ONLY_BELOW: u8 = 66;
/// Quality characters above this byte are only produced by the legacy
/// encoding.
const LEGACY_ONLY_ABOVE: u8 = 74;

/// Number of records sampled by a [`ReadStream`](crate::stream::ReadStream).
pub const STREAM_SAMPLE_SIZE: usize = 10_000;
/// Number of records sampled by the standalone pre-check.
pub const PRECHECK_SAMPLE_SIZE: usize = 5_000;

/// Quality score encoding of a FASTQ source.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityEncoding {
    /// Phred+33 (Sanger, Illumina 1.8+).
    #[default]
    Canonical,
    /// Phred+64 (Illumina 1.3-1.7).
    Legacy,
}

impl QualityEncoding {
    #[must_use]
    pub const fn offset(&self) -> u8 {
        match self {
            QualityEncoding::Canonical => CANONICAL_OFFSET,
            QualityEncoding::Legacy => LEGACY_OFFSET,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            QualityEncoding::Canonical => "canonical",
            QualityEncoding::Legacy => "legacy",
        }
    }
}

impl Display for QualityEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (Phred+{})", self.name(), self.offset())
    }
}

/// Returns the numeric score of a canonical quality character.
#[inline]
#[must_use]
pub fn to_canonical_score(ch: u8) -> i32 {
    i32::from(ch) - i32::from(CANONICAL_OFFSET)
}

/// Returns the numeric scores of a canonical quality string.
#[must_use]
pub fn canonical_scores(quality: &str) -> Vec<i32> {
    quality.bytes().map(to_canonical_score).collect()
}

/// Converts a legacy quality string to the canonical encoding.
///
/// # Examples
/// ```
/// use readdb::quality::legacy_to_canonical;
///
/// assert_eq!(legacy_to_canonical("@Ih"), "!*I");
/// ```
#[must_use]
pub fn legacy_to_canonical(quality: &str) -> String {
    quality
        .bytes()
        .map(|byte| byte.saturating_sub(LEGACY_SHIFT) as char)
        .collect()
}

/// Running tally of quality characters that are unambiguous for one of the
/// encodings.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct EncodingVote {
    canonical: u64,
    legacy: u64,
}

impl EncodingVote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_quality(&mut self, quality: &str) {
        for byte in quality.bytes() {
            if byte < CANONICAL_ONLY_BELOW {
                self.canonical += 1;
            } else if byte > LEGACY_ONLY_ABOVE {
                self.legacy += 1;
            }
        }
    }

    #[must_use]
    pub fn canonical(&self) -> u64 {
        self.canonical
    }

    #[must_use]
    pub fn legacy(&self) -> u64 {
        self.legacy
    }

    /// Returns the majority encoding, or `None` on a tie.
    #[must_use]
    pub fn decide(&self) -> Option<QualityEncoding> {
        match self.canonical.cmp(&self.legacy) {
            std::cmp::Ordering::Greater => Some(QualityEncoding::Canonical),
            std::cmp::Ordering::Less => Some(QualityEncoding::Legacy),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Error occurring during the standalone encoding detection.
#[derive(Debug)]
pub enum EncodingDetectionError {
    /// The FASTQ input could not be read.
    ReaderError(FastqReaderError),
    /// Both encodings received the same number of votes.
    Ambiguous { canonical: u64, legacy: u64 },
}

impl From<FastqReaderError> for EncodingDetectionError {
    fn from(e: FastqReaderError) -> Self {
        Self::ReaderError(e)
    }
}

impl Display for EncodingDetectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodingDetectionError::ReaderError(e) => write!(f, "Reader error: {}", e),
            EncodingDetectionError::Ambiguous { canonical, legacy } => write!(
                f,
                "Ambiguous quality encoding ({} canonical vs {} legacy characters)",
                canonical, legacy
            ),
        }
    }
}

impl Error for EncodingDetectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EncodingDetectionError::ReaderError(e) => Some(e),
            _ => None,
        }
    }
}

/// Detects the quality encoding of a FASTQ input from its first
/// `sample_size` records.
pub fn detect_encoding<R: BufRead>(
    reader: R,
    sample_size: usize,
) -> Result<QualityEncoding, EncodingDetectionError> {
    let mut vote = EncodingVote::new();
    let mut sampled = 0;

    for record in FastqReader::new(reader).into_iter().take(sample_size) {
        vote.add_quality(&record?.quality);
        sampled += 1;
    }
    debug!(
        "Sampled {} records: {} canonical vs {} legacy characters",
        sampled,
        vote.canonical(),
        vote.legacy()
    );

    vote.decide()
        .ok_or(EncodingDetectionError::Ambiguous {
            canonical: vote.canonical(),
            legacy: vote.legacy(),
        })
}
