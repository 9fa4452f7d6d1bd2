//! Quality-control stages applied to a single [`ReadRecord`].
//!
//! Every enabled stage runs, in the fixed order of [`QcPipeline`], even on
//! records that an earlier stage already filtered. Trimming stages keep
//! mutating the sequence and quality of such records, and each filtering
//! stage overwrites the reason, so the reason that remains is the one set by
//! the last stage that fired.

use std::fmt::{Display, Formatter};

use log::trace;

use crate::config::ReadStreamConfig;
use crate::quality::to_canonical_score;
use crate::record::{FilterReason, ReadRecord};

/// Quality character of canonical score 2, used by some instruments to mark
/// an unreliable read tail.
pub const LOWEST_QUALITY_BYTE: u8 = b'#';

pub const DEFAULT_MIN_LEN: usize = 20;
pub const DEFAULT_MAX_N: usize = 3;
pub const DEFAULT_LOW_COMPLEXITY: f64 = 0.8;

const DINUCLEOTIDES: [&[u8; 2]; 10] = [
    b"AA", b"TT", b"CC", b"GG", b"CA", b"GT", b"CT", b"GA", b"AT", b"CG",
];

/// A single quality-control operation with its parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum QcStage {
    Trim3,
    TrimTerminalNs,
    QualEndTrim { window: usize, mean_threshold: f64 },
    LengthFilter { min_len: usize },
    NFilter { max_n: usize },
    LowComplexityFilter { threshold: f64 },
    LowQualFilter { min_q: i32, max_count: usize },
    MeanQualFilter { min_mean_q: f64 },
}

impl QcStage {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            QcStage::Trim3 => "trim3",
            QcStage::TrimTerminalNs => "trim_terminal_Ns",
            QcStage::QualEndTrim { .. } => "qual_end_trim",
            QcStage::LengthFilter { .. } => "length_filter",
            QcStage::NFilter { .. } => "N_filter",
            QcStage::LowComplexityFilter { .. } => "low_complexity_filter",
            QcStage::LowQualFilter { .. } => "low_qual_filter",
            QcStage::MeanQualFilter { .. } => "mean_qual_filter",
        }
    }

    pub fn apply(&self, record: &mut ReadRecord) {
        match *self {
            QcStage::Trim3 => trim3(record),
            QcStage::TrimTerminalNs => trim_terminal_ns(record),
            QcStage::QualEndTrim {
                window,
                mean_threshold,
            } => qual_end_trim(record, window, mean_threshold),
            QcStage::LengthFilter { min_len } => length_filter(record, min_len),
            QcStage::NFilter { max_n } => n_filter(record, max_n),
            QcStage::LowComplexityFilter { threshold } => low_complexity_filter(record, threshold),
            QcStage::LowQualFilter { min_q, max_count } => {
                low_qual_filter(record, min_q, max_count)
            }
            QcStage::MeanQualFilter { min_mean_q } => mean_qual_filter(record, min_mean_q),
        }
    }
}

impl Display for QcStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Ordered list of enabled [`QcStage`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QcPipeline {
    stages: Vec<QcStage>,
}

impl QcPipeline {
    /// Pipeline that does nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the pipeline from the enabled options of `config`.
    #[must_use]
    pub fn from_config(config: &ReadStreamConfig) -> Self {
        let mut stages = Vec::new();

        if config.get_trim3() {
            stages.push(QcStage::Trim3);
        }
        if config.get_trim_n() {
            stages.push(QcStage::TrimTerminalNs);
        }
        if let Some((window, mean_threshold)) = config.get_quality_window() {
            stages.push(QcStage::QualEndTrim {
                window,
                mean_threshold,
            });
        }
        if let Some(min_len) = config.get_min_len() {
            stages.push(QcStage::LengthFilter { min_len });
        }
        if let Some(max_n) = config.get_max_n() {
            stages.push(QcStage::NFilter { max_n });
        }
        if let Some(threshold) = config.get_low_complexity() {
            stages.push(QcStage::LowComplexityFilter { threshold });
        }
        if let Some((min_q, max_count)) = config.get_low_quality() {
            stages.push(QcStage::LowQualFilter { min_q, max_count });
        }
        if let Some(min_mean_q) = config.get_min_mean_quality() {
            stages.push(QcStage::MeanQualFilter { min_mean_q });
        }

        Self { stages }
    }

    #[must_use]
    pub fn stages(&self) -> &[QcStage] {
        &self.stages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn apply(&self, record: &mut ReadRecord) {
        for stage in &self.stages {
            stage.apply(record);
            trace!(
                "{} after {}: {} bases, filter: {:?}",
                record.id(),
                stage,
                record.len(),
                record.filter_reason()
            );
        }
    }
}

/// Strips the trailing run of [`LOWEST_QUALITY_BYTE`] quality characters.
pub fn trim3(record: &mut ReadRecord) {
    let kept = record
        .quality()
        .bytes()
        .rposition(|byte| byte != LOWEST_QUALITY_BYTE)
        .map_or(0, |pos| pos + 1);
    record.trim_to(0, kept);

    if record.is_empty() {
        record.set_filter(FilterReason::PoorQuality);
    }
}

/// Strips leading and trailing runs of `N`/`n`.
pub fn trim_terminal_ns(record: &mut ReadRecord) {
    let is_n = |byte: &u8| byte.eq_ignore_ascii_case(&b'N');
    let sequence = record.sequence().as_bytes();

    let start = sequence.iter().position(|byte| !is_n(byte));
    let (start, end) = match start {
        Some(start) => {
            let end = sequence.iter().rposition(|byte| !is_n(byte)).map_or(start, |pos| pos + 1);
            (start, end)
        }
        None => (0, 0),
    };
    record.trim_to(start, end);

    if record.is_empty() {
        record.set_filter(FilterReason::PoorQuality);
    }
}

/// Sliding-window mean quality trim of both ends.
///
/// The window slides inwards from the left while its mean score is below
/// `mean_threshold` and more than `window` bases remain, then the same is
/// done from the right edge of what is left.
pub fn qual_end_trim(record: &mut ReadRecord, window: usize, mean_threshold: f64) {
    let scores = record.quality_scores();
    if window == 0 {
        return;
    }
    if scores.len() < window {
        record.set_filter(FilterReason::TooShort);
        return;
    }

    let min_sum = mean_threshold * window as f64;
    let fails = |sum: i64| (sum as f64) < min_sum;

    let mut start = 0;
    let mut sum: i64 = scores[..window].iter().map(|&score| i64::from(score)).sum();
    while scores.len() - start > window && fails(sum) {
        sum -= i64::from(scores[start]);
        sum += i64::from(scores[start + window]);
        start += 1;
    }
    if fails(sum) {
        record.trim_to(start, scores.len());
        record.set_filter(FilterReason::TooShort);
        return;
    }

    let mut end = scores.len();
    let mut sum: i64 = scores[end - window..end]
        .iter()
        .map(|&score| i64::from(score))
        .sum();
    while end - start > window && fails(sum) {
        end -= 1;
        sum -= i64::from(scores[end]);
        sum += i64::from(scores[end - window]);
    }
    record.trim_to(start, end);
    if fails(sum) {
        record.set_filter(FilterReason::TooShort);
    }

    if record.sequence().len() != record.quality().len() {
        record.set_filter(FilterReason::Error);
    }
}

pub fn length_filter(record: &mut ReadRecord, min_len: usize) {
    if record.len() < min_len {
        record.set_filter(FilterReason::TooShort);
    }
}

pub fn n_filter(record: &mut ReadRecord, max_n: usize) {
    let n_count = record
        .sequence()
        .bytes()
        .filter(|byte| byte.eq_ignore_ascii_case(&b'N'))
        .count();

    if n_count > max_n {
        record.set_filter(FilterReason::TooManyN);
    }
}

/// Filters reads dominated by a single (overlapping) dinucleotide repeat.
pub fn low_complexity_filter(record: &mut ReadRecord, threshold: f64) {
    let sequence = record.sequence().to_ascii_uppercase();
    let sequence = sequence.as_bytes();
    if sequence.is_empty() {
        return;
    }

    for pattern in DINUCLEOTIDES {
        let count = sequence
            .windows(2)
            .filter(|window| *window == pattern.as_slice())
            .count();

        if (count * 2) as f64 / sequence.len() as f64 >= threshold {
            record.set_filter(FilterReason::LowComplexity);
            return;
        }
    }
}

pub fn low_qual_filter(record: &mut ReadRecord, min_q: i32, max_count: usize) {
    let low_count = record
        .quality()
        .bytes()
        .filter(|&byte| to_canonical_score(byte) < min_q)
        .count();

    if low_count > max_count {
        record.set_filter(FilterReason::TooManyLowQual);
    }
}

/// Filters reads whose mean score is below `min_mean_q`. The mean score of
/// an empty read is 0.
pub fn mean_qual_filter(record: &mut ReadRecord, min_mean_q: f64) {
    let scores = record.quality_scores();
    let mean = if scores.is_empty() {
        0.0
    } else {
        scores.iter().map(|&score| f64::from(score)).sum::<f64>() / scores.len() as f64
    };

    if mean < min_mean_q {
        record.set_filter(FilterReason::LowMeanQual);
    }
}
