use criterion::{criterion_group, criterion_main, Criterion};
use readdb::_internal_test_data::{LEARNABLE_BARCODES_FASTQ, RANDOM_FASTQ_10K};
use readdb::config::ReadStreamConfig;
use readdb::fastq::reader::FastqReader;
use readdb::stream::ReadStream;

fn read_10k_reads(c: &mut Criterion) {
    c.bench_function("Read 10k reads from FASTQ", |b| {
        b.iter(|| {
            let reader = FastqReader::new(RANDOM_FASTQ_10K.as_bytes());
            assert_eq!(reader.into_iter().count(), 10_000);
        })
    });
}

fn stream_10k_reads(c: &mut Criterion) {
    let mut config = ReadStreamConfig::new();
    config
        .trim3(true)
        .trim_n(true)
        .quality_window(5, 20.0)
        .min_len(20)
        .max_n(3)
        .low_complexity(0.8)
        .mean_quality_filter(20.0);

    c.bench_function("Quality-control 10k reads", |b| {
        b.iter(|| {
            let stream = ReadStream::new(RANDOM_FASTQ_10K.as_bytes(), config.clone()).unwrap();
            assert_eq!(stream.count(), 10_000);
        })
    });
}

fn learn_barcodes(c: &mut Criterion) {
    let mut config = ReadStreamConfig::new();
    config.barcodes("learn");

    c.bench_function("Learn barcodes and correct 1k reads", |b| {
        b.iter(|| {
            let stream =
                ReadStream::new(LEARNABLE_BARCODES_FASTQ.as_bytes(), config.clone()).unwrap();
            assert_eq!(stream.catalog().map(|catalog| catalog.len()), Some(1));
            stream.for_each(drop);
        })
    });
}

criterion_group!(benches, read_10k_reads, stream_10k_reads, learn_barcodes);
criterion_main!(benches);
