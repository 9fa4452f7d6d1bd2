//! Buffered, self-calibrating stream of quality-controlled records.
//!
//! A [`ReadStream`] is built in four one-way phases. It first buffers a
//! sample of raw records, then detects the quality encoding and sets up the
//! barcode catalog from that untouched sample, then normalizes, corrects and
//! quality-controls the buffered records in place. Only then does it start
//! yielding records: the buffered ones first, then the rest of the input,
//! processed one by one.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::barcode::{BarcodeCatalog, BarcodeFileError};
use crate::barcode_learner::BarcodeLearner;
use crate::config::{BarcodeSource, ConfigError, ReadStreamConfig};
use crate::fastq::reader::{open_path, FastqReader, FastqReaderError};
use crate::header::{parse_header, HeaderParseError};
use crate::progress::{DummyProgressNotifier, ProgressNotifier};
use crate::qc::QcPipeline;
use crate::quality::{EncodingVote, QualityEncoding, STREAM_SAMPLE_SIZE};
use crate::record::ReadRecord;
use crate::summary::{OutcomeCounter, Summary};

/// Error occurring when building or reading a [`ReadStream`].
#[derive(Debug)]
pub enum ReadStreamError {
    /// I/O error occurred when opening the input.
    IoError(std::io::Error),
    /// The FASTQ input could not be read.
    ReaderError(FastqReaderError),
    /// A record header matches no known dialect.
    HeaderError {
        line: usize,
        source: HeaderParseError,
    },
    /// The configuration is invalid.
    ConfigError(ConfigError),
    /// The barcode reference file could not be loaded.
    BarcodeFileError(BarcodeFileError),
    /// The input contains no valid record to calibrate on.
    NoValidRecords,
    /// Both quality encodings received the same number of votes.
    EncodingAmbiguous { canonical: u64, legacy: u64 },
}

impl From<std::io::Error> for ReadStreamError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e)
    }
}

impl From<FastqReaderError> for ReadStreamError {
    fn from(e: FastqReaderError) -> Self {
        Self::ReaderError(e)
    }
}

impl From<ConfigError> for ReadStreamError {
    fn from(e: ConfigError) -> Self {
        Self::ConfigError(e)
    }
}

impl From<BarcodeFileError> for ReadStreamError {
    fn from(e: BarcodeFileError) -> Self {
        Self::BarcodeFileError(e)
    }
}

impl Display for ReadStreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadStreamError::IoError(e) => write!(f, "IO error: {}", e),
            ReadStreamError::ReaderError(e) => write!(f, "Reader error: {}", e),
            ReadStreamError::HeaderError { line, source } => {
                write!(f, "Line {}: {}", line, source)
            }
            ReadStreamError::ConfigError(e) => write!(f, "Configuration error: {}", e),
            ReadStreamError::BarcodeFileError(e) => write!(f, "Barcode file error: {}", e),
            ReadStreamError::NoValidRecords => write!(f, "No valid records found"),
            ReadStreamError::EncodingAmbiguous { canonical, legacy } => write!(
                f,
                "Ambiguous quality encoding ({} canonical vs {} legacy characters)",
                canonical, legacy
            ),
        }
    }
}

impl Error for ReadStreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadStreamError::IoError(e) => Some(e),
            ReadStreamError::ReaderError(e) => Some(e),
            ReadStreamError::HeaderError { source, .. } => Some(source),
            ReadStreamError::ConfigError(e) => Some(e),
            ReadStreamError::BarcodeFileError(e) => Some(e),
            _ => None,
        }
    }
}

/// The result of a [`ReadStream`] operation.
pub type ReadStreamResult<T> = Result<T, ReadStreamError>;

/// Lifecycle phase of a [`ReadStream`]. Phases only ever advance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum StreamPhase {
    Buffering,
    Calibrating,
    Replaying,
    Streaming,
    Closed,
}

impl StreamPhase {
    pub const VALUES: [StreamPhase; 5] = [
        StreamPhase::Buffering,
        StreamPhase::Calibrating,
        StreamPhase::Replaying,
        StreamPhase::Streaming,
        StreamPhase::Closed,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StreamPhase::Buffering => "buffering",
            StreamPhase::Calibrating => "calibrating",
            StreamPhase::Replaying => "replaying",
            StreamPhase::Streaming => "streaming",
            StreamPhase::Closed => "closed",
        }
    }

    /// Returns the phase that follows this one.
    #[must_use]
    pub fn next(&self) -> Option<StreamPhase> {
        match self {
            StreamPhase::Buffering => Some(StreamPhase::Calibrating),
            StreamPhase::Calibrating => Some(StreamPhase::Replaying),
            StreamPhase::Replaying => Some(StreamPhase::Streaming),
            StreamPhase::Streaming => Some(StreamPhase::Closed),
            StreamPhase::Closed => None,
        }
    }
}

impl Display for StreamPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Bounded sample of records used for calibration, later drained as the
/// head of the stream.
#[derive(Debug, Clone)]
pub struct TrainingBuffer {
    records: VecDeque<ReadRecord>,
    capacity: usize,
    pushed: usize,
    paired: usize,
}

impl TrainingBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(STREAM_SAMPLE_SIZE)),
            capacity,
            pushed: 0,
            paired: 0,
        }
    }

    /// Appends a record. Returns it back if the buffer is full.
    pub fn push(&mut self, record: ReadRecord) -> Result<(), ReadRecord> {
        if self.is_full() {
            return Err(record);
        }

        self.pushed += 1;
        if record.pair().is_some() {
            self.paired += 1;
        }
        self.records.push_back(record);
        Ok(())
    }

    pub fn pop_front(&mut self) -> Option<ReadRecord> {
        self.records.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReadRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ReadRecord> {
        self.records.iter_mut()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// Whether any record pushed so far carries a pair index.
    #[must_use]
    pub fn any_paired(&self) -> bool {
        self.paired > 0
    }

    /// Whether the records pushed so far mix paired and unpaired ones.
    #[must_use]
    pub fn is_mixed(&self) -> bool {
        self.paired > 0 && self.paired < self.pushed
    }
}

#[derive(Debug, Clone)]
pub struct ReadStreamParams {
    config: ReadStreamConfig,
    catalog: Option<BarcodeCatalog>,
    progress_notifier: Arc<dyn ProgressNotifier>,
}

impl ReadStreamParams {
    pub fn builder() -> ReadStreamParamsBuilder {
        ReadStreamParamsBuilder::new()
    }
}

impl Default for ReadStreamParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone)]
pub struct ReadStreamParamsBuilder {
    config: ReadStreamConfig,
    catalog: Option<BarcodeCatalog>,
    progress_notifier: Arc<dyn ProgressNotifier>,
}

impl ReadStreamParamsBuilder {
    pub fn new() -> Self {
        Self {
            config: ReadStreamConfig::default(),
            catalog: None,
            progress_notifier: Arc::new(DummyProgressNotifier),
        }
    }

    pub fn config(&mut self, config: ReadStreamConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Uses a prebuilt catalog instead of the one described by the
    /// configuration.
    pub fn catalog(&mut self, catalog: BarcodeCatalog) -> &mut Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn progress_notifier(&mut self, progress_notifier: Arc<dyn ProgressNotifier>) -> &mut Self {
        self.progress_notifier = progress_notifier;
        self
    }

    pub fn build(&mut self) -> ReadStreamParams {
        ReadStreamParams {
            config: self.config.clone(),
            catalog: self.catalog.clone(),
            progress_notifier: self.progress_notifier.clone(),
        }
    }
}

impl Default for ReadStreamParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over quality-controlled [`ReadRecord`]s of a FASTQ input.
///
/// Filtered records are yielded too, with their filter reason set. Iteration
/// stops at the end of input or at the first error, after which the stream
/// is closed.
///
/// # Examples
/// ```
/// use readdb::config::ReadStreamConfig;
/// use readdb::stream::ReadStream;
///
/// let fastq = "@r1/1\nACGTACGT\n+\n????????\n@r2/1\nACGT\n+\n????\n";
/// let mut config = ReadStreamConfig::new();
/// config.min_len(5);
///
/// let stream = ReadStream::new(fastq.as_bytes(), config).unwrap();
/// let records: Vec<_> = stream.map(Result::unwrap).collect();
/// assert_eq!(records.len(), 2);
/// assert!(!records[0].is_filtered());
/// assert!(records[1].is_filtered());
/// ```
#[derive(Debug)]
pub struct ReadStream<R> {
    reader: Option<FastqReader<R>>,
    phase: StreamPhase,
    config: ReadStreamConfig,
    pipeline: QcPipeline,
    buffer: TrainingBuffer,
    encoding: QualityEncoding,
    catalog: Option<BarcodeCatalog>,
    counter: OutcomeCounter,
    malformed: usize,
    progress_notifier: Arc<dyn ProgressNotifier>,
}

impl ReadStream<Box<dyn BufRead>> {
    /// Opens a (possibly gzip-compressed) FASTQ file.
    pub fn open<P: AsRef<Path>>(path: P, config: ReadStreamConfig) -> ReadStreamResult<Self> {
        let reader = open_path(path)?;
        Self::new(reader, config)
    }
}

impl<R: BufRead> ReadStream<R> {
    pub fn new(reader: R, config: ReadStreamConfig) -> ReadStreamResult<Self> {
        Self::with_params(reader, ReadStreamParams::builder().config(config).build())
    }

    /// Builds the stream and runs it up to the streaming phase.
    pub fn with_params(reader: R, params: ReadStreamParams) -> ReadStreamResult<Self> {
        params.config.validate()?;

        let mut stream = Self {
            reader: Some(FastqReader::new(reader)),
            phase: StreamPhase::Buffering,
            pipeline: QcPipeline::from_config(&params.config),
            buffer: TrainingBuffer::new(params.config.get_sample_size()),
            config: params.config,
            encoding: QualityEncoding::default(),
            catalog: params.catalog,
            counter: OutcomeCounter::new(),
            malformed: 0,
            progress_notifier: params.progress_notifier,
        };

        stream.fill_buffer()?;
        stream.advance(StreamPhase::Calibrating);
        stream.calibrate()?;
        stream.advance(StreamPhase::Replaying);
        stream.replay();
        stream.advance(StreamPhase::Streaming);

        Ok(stream)
    }

    fn advance(&mut self, phase: StreamPhase) {
        debug_assert_eq!(self.phase.next(), Some(phase));
        debug!("Stream phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Reads and parses the next record, without any processing except the
    /// removal of the Roche/454 multiplex identifier.
    fn read_raw(&mut self) -> ReadStreamResult<Option<ReadRecord>> {
        let reader = match &mut self.reader {
            Some(reader) => reader,
            None => return Ok(None),
        };

        let raw = reader.read_record();
        self.malformed = reader.malformed_records();
        let raw = match raw? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let parsed = parse_header(&raw.header).map_err(|e| ReadStreamError::HeaderError {
            line: raw.line,
            source: e,
        })?;
        self.progress_notifier.processed_bytes(raw.size);

        let mut record = ReadRecord::with_size(parsed.id, raw.sequence, raw.quality, raw.size);
        if let Some(len) = self.config.get_roche_mid_len() {
            record.strip_leading_mid(len);
        }

        Ok(Some(record))
    }

    fn fill_buffer(&mut self) -> ReadStreamResult<()> {
        while !self.buffer.is_full() {
            match self.read_raw()? {
                Some(record) => {
                    if let Err(record) = self.buffer.push(record) {
                        warn!("{}: training buffer is full", record.id());
                        break;
                    }
                }
                None => break,
            }
        }

        if self.buffer.is_empty() {
            return Err(ReadStreamError::NoValidRecords);
        }
        info!("Buffered {} records for calibration", self.buffer.len());
        if self.buffer.is_mixed() {
            warn!("Input mixes paired and unpaired records");
        }

        Ok(())
    }

    fn calibrate(&mut self) -> ReadStreamResult<()> {
        let mut vote = EncodingVote::new();
        for record in self.buffer.iter() {
            vote.add_quality(record.quality());
        }
        self.encoding = vote
            .decide()
            .ok_or(ReadStreamError::EncodingAmbiguous {
                canonical: vote.canonical(),
                legacy: vote.legacy(),
            })?;
        info!("Detected quality encoding: {}", self.encoding);

        if self.catalog.is_none() {
            self.catalog = self.build_catalog()?;
        }

        Ok(())
    }

    fn build_catalog(&self) -> ReadStreamResult<Option<BarcodeCatalog>> {
        let catalog = match self.config.get_barcodes() {
            None => None,
            Some(BarcodeSource::File(path)) => Some(BarcodeCatalog::from_path(
                path,
                self.config.get_barcode_seq_col(),
                self.config.get_barcode_label_col(),
            )?),
            Some(BarcodeSource::Learn) => {
                let mut learner = BarcodeLearner::new();
                learner.extend(self.buffer.iter().filter_map(ReadRecord::barcode));
                let catalog = learner.learn();
                if catalog.is_none() {
                    warn!("No barcodes found in the sample, barcode correction disabled");
                }
                catalog
            }
        };

        Ok(catalog)
    }

    fn replay(&mut self) {
        for record in self.buffer.iter_mut() {
            process_record(record, self.encoding, self.catalog.as_mut(), &self.pipeline);
        }
    }

    /// Releases the input. Remaining records are discarded; closing a closed
    /// stream does nothing.
    pub fn close(&mut self) {
        if self.phase == StreamPhase::Closed {
            return;
        }

        self.reader = None;
        self.buffer.clear();
        debug!("Stream phase: {} -> {}", self.phase, StreamPhase::Closed);
        self.phase = StreamPhase::Closed;
    }

    #[must_use]
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.phase == StreamPhase::Closed
    }

    /// Quality encoding detected in the calibration sample.
    #[must_use]
    pub fn encoding(&self) -> QualityEncoding {
        self.encoding
    }

    /// Whether any record of the calibration sample carries a pair index.
    #[must_use]
    pub fn is_paired(&self) -> bool {
        self.buffer.any_paired()
    }

    #[must_use]
    pub fn has_mixed_pairing(&self) -> bool {
        self.buffer.is_mixed()
    }

    #[must_use]
    pub fn catalog(&self) -> Option<&BarcodeCatalog> {
        self.catalog.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &ReadStreamConfig {
        &self.config
    }

    #[must_use]
    pub fn pipeline(&self) -> &QcPipeline {
        &self.pipeline
    }

    /// Number of processed records still waiting in the buffer.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number of records discarded so far as structurally malformed.
    #[must_use]
    pub fn malformed_records(&self) -> usize {
        self.malformed
    }

    /// Snapshot of the outcomes of the records yielded so far.
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary::new(
            &self.counter,
            Some(self.encoding),
            self.malformed,
            self.catalog.as_ref(),
        )
    }
}

fn process_record(
    record: &mut ReadRecord,
    encoding: QualityEncoding,
    catalog: Option<&mut BarcodeCatalog>,
    pipeline: &QcPipeline,
) {
    record.normalize_quality(encoding);
    if let Some(catalog) = catalog {
        catalog.correct_record(record);
    }
    pipeline.apply(record);
}

impl<R: BufRead> Iterator for ReadStream<R> {
    type Item = ReadStreamResult<ReadRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.phase != StreamPhase::Streaming {
            return None;
        }

        let record = match self.buffer.pop_front() {
            Some(record) => record,
            None => match self.read_raw() {
                Ok(Some(mut record)) => {
                    process_record(
                        &mut record,
                        self.encoding,
                        self.catalog.as_mut(),
                        &self.pipeline,
                    );
                    record
                }
                Ok(None) => {
                    self.close();
                    return None;
                }
                Err(e) => {
                    self.close();
                    return Some(Err(e));
                }
            },
        };

        self.counter.record(&record);
        self.progress_notifier.inc_records();
        Some(Ok(record))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::barcode::{BarcodeCatalog, CatalogOrigin};
    use crate::config::{BarcodeSource, ReadStreamConfig};
    use crate::header::ReadId;
    use crate::quality::QualityEncoding;
    use crate::record::{FilterReason, ReadRecord};
    use crate::stream::{
        ReadStream, ReadStreamError, ReadStreamParams, StreamPhase, TrainingBuffer,
    };

    fn fastq(records: &[(&str, &str, &str)]) -> String {
        records
            .iter()
            .map(|(header, sequence, quality)| format!("{}\n{}\n+\n{}\n", header, sequence, quality))
            .collect()
    }

    #[test]
    fn test_phase_order() {
        let mut phase = StreamPhase::Buffering;
        let mut visited = vec![phase];
        while let Some(next) = phase.next() {
            phase = next;
            visited.push(phase);
        }

        assert_eq!(visited, StreamPhase::VALUES);
    }

    #[test]
    fn test_training_buffer() {
        let mut buffer = TrainingBuffer::new(2);
        let paired = ReadRecord::new(ReadId::new("a", Some(1), None), "A", "I");
        let unpaired = ReadRecord::new(ReadId::new("b", None, None), "A", "I");

        assert!(buffer.push(paired).is_ok());
        assert!(!buffer.is_mixed());
        assert!(buffer.push(unpaired.clone()).is_ok());
        assert!(buffer.is_full());
        assert!(buffer.any_paired());
        assert!(buffer.is_mixed());
        assert_eq!(buffer.push(unpaired.clone()), Err(unpaired));
        assert_eq!(buffer.pop_front().unwrap().base(), "a");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn should_create_training_buffer_of_any_capacity() {
        let buffer = TrainingBuffer::new(usize::MAX);

        assert_eq!(buffer.capacity(), usize::MAX);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
    }

    #[test_log::test]
    fn should_stream_buffered_then_live_records() {
        let input = fastq(&[
            ("@r1/1", "ACGTACGT", "????????"),
            ("@r2/1", "ACGT", "????"),
            ("@r3/1", "ACGTACGTAC", "??????????"),
        ]);
        let mut config = ReadStreamConfig::new();
        config.min_len(5).sample_size(2);

        let mut stream = ReadStream::new(input.as_bytes(), config).unwrap();
        assert_eq!(stream.phase(), StreamPhase::Streaming);
        assert_eq!(stream.buffered(), 2);
        assert!(stream.is_paired());

        let records: Vec<_> = stream.by_ref().map(Result::unwrap).collect();
        let identities: Vec<_> = records.iter().map(ReadRecord::identity).collect();
        assert_eq!(identities, ["r1/1", "r2/1", "r3/1"]);
        assert_eq!(records[1].filter_reason(), Some(FilterReason::TooShort));
        assert!(stream.is_closed());

        let summary = stream.summary();
        assert_eq!(summary.passed(), 2);
        assert_eq!(summary.outcomes["too_short"], 1);
        assert_eq!(summary.encoding, Some(QualityEncoding::Canonical));
    }

    #[test_log::test]
    fn should_convert_legacy_quality_once() {
        // Every quality character of the sample is legacy-only.
        let input = fastq(&[("@a", "ACGT", "hhhh"), ("@b", "ACGT", "hh^^"), ("@c", "AC", "hK")]);
        let mut config = ReadStreamConfig::new();
        config.sample_size(2);

        let stream = ReadStream::new(input.as_bytes(), config).unwrap();
        assert_eq!(stream.encoding(), QualityEncoding::Legacy);

        let qualities: Vec<_> = stream
            .map(|record| record.unwrap().quality().to_owned())
            .collect();
        assert_eq!(qualities, ["IIII", "II??", "I,"]);
    }

    #[test]
    fn should_fail_on_empty_input() {
        let result = ReadStream::new("".as_bytes(), ReadStreamConfig::new());

        assert!(matches!(result, Err(ReadStreamError::NoValidRecords)));
    }

    #[test]
    fn should_fail_on_ambiguous_encoding() {
        let input = fastq(&[("@a", "AC", "!h")]);
        let result = ReadStream::new(input.as_bytes(), ReadStreamConfig::new());

        assert!(matches!(
            result,
            Err(ReadStreamError::EncodingAmbiguous {
                canonical: 1,
                legacy: 1
            })
        ));
    }

    #[test]
    fn should_fail_on_invalid_config() {
        let mut config = ReadStreamConfig::new();
        config.set_option("winsize", Some("5")).unwrap();
        let input = fastq(&[("@a", "ACGT", "????")]);
        let result = ReadStream::new(input.as_bytes(), config);

        assert!(matches!(result, Err(ReadStreamError::ConfigError(_))));
    }

    #[test_log::test]
    fn should_fail_on_unparseable_live_header() {
        let input = fastq(&[("@a", "ACGT", "????"), ("@", "ACGT", "????")]);
        let mut config = ReadStreamConfig::new();
        config.sample_size(1);

        let mut stream = ReadStream::new(input.as_bytes(), config).unwrap();
        assert!(stream.next().unwrap().is_ok());
        let error = stream.next().unwrap().unwrap_err();
        assert!(matches!(error, ReadStreamError::HeaderError { line: 5, .. }));
        assert!(error.source().is_some());
        assert!(stream.next().is_none());
        assert!(stream.is_closed());
    }

    #[test]
    fn should_close_idempotently() {
        let input = fastq(&[("@a", "ACGT", "????"), ("@b", "ACGT", "????")]);
        let mut stream = ReadStream::new(input.as_bytes(), ReadStreamConfig::new()).unwrap();

        stream.close();
        stream.close();
        assert_eq!(stream.phase(), StreamPhase::Closed);
        assert_eq!(stream.buffered(), 0);
        assert!(stream.next().is_none());
    }

    #[test_log::test]
    fn should_correct_barcodes_with_prebuilt_catalog() {
        let input = fastq(&[
            ("@a#ACGT/1", "ACGTACGT", "????????"),
            ("@b#ACGN/1", "ACGTACGT", "????????"),
            ("@c#TTTT/1", "ACGTACGT", "????????"),
            ("@d/1", "ACGTACGT", "????????"),
        ]);
        let mut catalog = BarcodeCatalog::new(CatalogOrigin::Reference);
        catalog.add_canonical("ACGT", Some("sample1"));
        let params = ReadStreamParams::builder().catalog(catalog).build();

        let mut stream = ReadStream::with_params(input.as_bytes(), params).unwrap();
        let records: Vec<_> = stream.by_ref().map(Result::unwrap).collect();

        assert_eq!(records[1].identity(), "b#ACGT/1");
        assert_eq!(
            records[2].filter_reason(),
            Some(FilterReason::InvalidBarcode)
        );
        assert_eq!(
            records[3].filter_reason(),
            Some(FilterReason::InvalidBarcode)
        );

        let summary = stream.summary();
        assert_eq!(summary.barcodes.unwrap()["ACGT"], 2);
        assert_eq!(summary.labels.unwrap()["ACGT"], "sample1");
        assert_eq!(stream.catalog().unwrap().counts()["ACGT"], 2);
    }

    #[test_log::test]
    fn should_correct_live_records_with_learned_catalog() {
        let mut records = vec![("@a#ACGTAC/1", "ACGTACGT", "????????"); 4];
        records.extend([
            ("@b#ACGTAN/1", "ACGTACGT", "????????"),
            ("@c#TTTTGG/1", "ACGTACGT", "????????"),
            ("@d#ACGTAC/1", "ACGTACGT", "????????"),
        ]);
        let input = fastq(&records);
        let mut config = ReadStreamConfig::new();
        config.barcodes(BarcodeSource::Learn).sample_size(4);

        let mut stream = ReadStream::new(input.as_bytes(), config).unwrap();
        assert_eq!(stream.buffered(), 4);
        let records: Vec<_> = stream.by_ref().map(Result::unwrap).collect();

        assert_eq!(records.len(), 7);
        assert_eq!(records[4].identity(), "b#ACGTAC/1");
        assert!(!records[4].is_filtered());
        assert_eq!(records[5].filter_reason(), Some(FilterReason::BadBarcode));
        assert!(!records[6].is_filtered());

        let summary = stream.summary();
        assert_eq!(summary.passed(), 6);
        assert_eq!(summary.outcomes["bad_barcode"], 1);
        assert_eq!(summary.barcodes.unwrap()["ACGTAC"], 6);
        assert_eq!(stream.catalog().unwrap().counts()["ACGTAC"], 6);
    }

    #[test_log::test]
    fn should_accept_sample_size_larger_than_memory() {
        let input = fastq(&[
            ("@r1/1", "ACGTACGT", "????????"),
            ("@r2/1", "ACGTACGT", "????????"),
        ]);
        let mut config = ReadStreamConfig::new();
        config
            .set_option("sample_size", Some(usize::MAX.to_string().as_str()))
            .unwrap();
        assert!(config.validate().is_ok());

        let mut stream = ReadStream::new(input.as_bytes(), config).unwrap();
        assert_eq!(stream.buffered(), 2);
        assert_eq!(stream.by_ref().count(), 2);
    }

    #[test_log::test]
    fn should_strip_roche_mid() {
        let input = fastq(&[
            ("@GA1UO4U01D2X1J", "ACGTTTTTGGGG", "????????????"),
            ("@GA1UO4U01D2X1K", "ACG", "???"),
        ]);
        let mut config = ReadStreamConfig::new();
        config.roche_mid_len(4);

        let records: Vec<_> = ReadStream::new(input.as_bytes(), config)
            .unwrap()
            .map(Result::unwrap)
            .collect();

        assert_eq!(records[0].barcode(), Some("ACGT"));
        assert_eq!(records[0].sequence(), "TTTTGGGG");
        assert_eq!(records[1].filter_reason(), Some(FilterReason::TooShort));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", ReadStreamError::NoValidRecords),
            "No valid records found"
        );
        assert_eq!(
            format!(
                "{}",
                ReadStreamError::EncodingAmbiguous {
                    canonical: 2,
                    legacy: 2
                }
            ),
            "Ambiguous quality encoding (2 canonical vs 2 legacy characters)"
        );
    }

    #[test]
    fn test_error_source() {
        let io_error = std::io::Error::from(std::io::ErrorKind::NotFound);

        assert!(ReadStreamError::from(io_error).source().is_some());
        assert!(ReadStreamError::NoValidRecords.source().is_none());
    }
}
