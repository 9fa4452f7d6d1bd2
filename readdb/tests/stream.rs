use std::fs;
use std::io::Write;
use std::path::PathBuf;

use flate2::write::GzEncoder;
use flate2::Compression;
use readdb::_internal_test_data::{
    CORRUPTED_FASTQ_STR, LEARNABLE_BARCODES, LEARNABLE_BARCODES_FASTQ, LEGACY_FASTQ_STR,
    SIMPLE_FASTQ_STR,
};
use readdb::barcode::CatalogOrigin;
use readdb::config::{BarcodeSource, ReadStreamConfig};
use readdb::quality::QualityEncoding;
use readdb::record::FilterReason;
use readdb::stream::{ReadStream, ReadStreamError};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("readdb-{}-{}", std::process::id(), name))
}

#[test_log::test]
fn test_skip_corrupted_record() {
    let mut stream = ReadStream::new(CORRUPTED_FASTQ_STR.as_bytes(), ReadStreamConfig::new())
        .unwrap();
    let identities: Vec<_> = stream
        .by_ref()
        .map(|record| record.unwrap().identity())
        .collect();

    assert_eq!(identities, ["r1/1", "r2/1", "r4/1", "r5/1"]);
    let summary = stream.summary();
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.passed(), 4);
}

#[test]
fn test_fail_on_unparseable_header() {
    let result = ReadStream::new("@\nACGT\n+\n5555\n".as_bytes(), ReadStreamConfig::new());

    assert!(matches!(
        result,
        Err(ReadStreamError::HeaderError { line: 1, .. })
    ));
}

#[test_log::test]
fn test_quality_control() {
    let mut config = ReadStreamConfig::new();
    for option in ["trim3", "trimN", "minlen", "maxn", "low_complexity"] {
        config.apply_option(option).unwrap();
    }

    let mut stream = ReadStream::new(SIMPLE_FASTQ_STR.as_bytes(), config).unwrap();
    let records: Vec<_> = stream.by_ref().map(Result::unwrap).collect();

    assert_eq!(records.len(), 4);
    assert_eq!(records[1].len(), 38);
    assert_eq!(records[2].sequence(), "ACGTTGCAAGCTTACGGATCA");
    assert_eq!(
        records[3].filter_reason(),
        Some(FilterReason::LowComplexity)
    );
    assert_eq!(records[3].to_fastq(), "@INST:1:1:1:4#ACGT/1\n\n+\n\n");

    let summary = stream.summary();
    assert_eq!(summary.passed(), 3);
    assert_eq!(summary.outcomes["low_complexity"], 1);
}

#[test_log::test]
fn test_legacy_encoding() {
    let stream = ReadStream::new(LEGACY_FASTQ_STR.as_bytes(), ReadStreamConfig::new()).unwrap();
    assert_eq!(stream.encoding(), QualityEncoding::Legacy);

    let records: Vec<_> = stream.map(Result::unwrap).collect();
    assert_eq!(records[0].base(), "SRR001666.1");
    assert_eq!(records[0].pair(), Some(1));
    assert_eq!(records[0].quality(), "I".repeat(36));
    assert!(records[1].quality().ends_with("????#####"));
}

#[test_log::test]
fn test_learn_barcodes() {
    let mut config = ReadStreamConfig::new();
    config.barcodes("learn").sample_size(2_000);

    let mut stream = ReadStream::new(LEARNABLE_BARCODES_FASTQ.as_bytes(), config).unwrap();
    let catalog = stream.catalog().unwrap();
    assert_eq!(catalog.origin(), CatalogOrigin::Learned);
    assert_eq!(catalog.len(), 1);

    let records: Vec<_> = stream.by_ref().map(Result::unwrap).collect();
    let total: usize = LEARNABLE_BARCODES.iter().map(|&(_, count)| count).sum();
    assert_eq!(records.len(), total);
    assert!(records
        .iter()
        .filter(|record| !record.is_filtered())
        .all(|record| record.barcode() == Some("ACGTAC")));

    let summary = stream.summary();
    assert_eq!(summary.outcomes["bad_barcode"], 5);
    assert_eq!(summary.passed(), total as u64 - 5);
    assert_eq!(summary.barcodes.unwrap()["ACGTAC"], total as u64 - 5);
}

#[test_log::test]
fn test_reference_barcode_file() {
    let path = temp_path("barcodes.tsv");
    fs::write(&path, "# barcode\tsample\nACGT\tsample1\nTTGG\tsample2\n").unwrap();

    let mut config = ReadStreamConfig::new();
    config
        .barcodes(BarcodeSource::File(path.clone()))
        .barcode_columns(1, Some(2));
    let mut stream = ReadStream::new(SIMPLE_FASTQ_STR.as_bytes(), config).unwrap();
    fs::remove_file(&path).unwrap();

    let records: Vec<_> = stream.by_ref().map(Result::unwrap).collect();
    assert_eq!(records[2].barcode(), Some("ACGT"));
    assert!(records.iter().all(|record| !record.is_filtered()));

    let summary = stream.summary();
    assert_eq!(summary.barcodes.as_ref().unwrap()["ACGT"], 4);
    assert_eq!(summary.barcodes.as_ref().unwrap()["TTGG"], 0);
    assert_eq!(summary.labels.as_ref().unwrap()["TTGG"], "sample2");
}

#[test]
fn test_missing_barcode_file() {
    let mut config = ReadStreamConfig::new();
    config.barcodes(BarcodeSource::File(temp_path("missing.tsv")));
    let result = ReadStream::new(SIMPLE_FASTQ_STR.as_bytes(), config);

    assert!(matches!(result, Err(ReadStreamError::BarcodeFileError(_))));
}

#[test]
fn test_open_gzip() {
    let path = temp_path("simple.fastq.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(SIMPLE_FASTQ_STR.as_bytes()).unwrap();
    fs::write(&path, encoder.finish().unwrap()).unwrap();

    let stream = ReadStream::open(&path, ReadStreamConfig::new()).unwrap();
    let count = stream.map(Result::unwrap).count();
    fs::remove_file(&path).unwrap();

    assert_eq!(count, 4);
}

#[test]
fn test_summary_json() {
    let mut stream = ReadStream::new(SIMPLE_FASTQ_STR.as_bytes(), ReadStreamConfig::new())
        .unwrap();
    stream.by_ref().for_each(drop);

    let json = serde_json::to_string(&stream.summary()).unwrap();
    assert_eq!(
        json,
        r#"{"encoding":"canonical","outcomes":{"pass":4},"malformed":0}"#
    );
}
