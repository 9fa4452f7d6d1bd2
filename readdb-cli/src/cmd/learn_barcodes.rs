use std::cmp::Reverse;
use std::io::{BufRead, Write};

use anyhow::{bail, Context};
use itertools::Itertools;
use log::info;
use readdb::config::{BarcodeSource, ReadStreamConfig};
use readdb::stream::ReadStream;

/// Learns the barcode catalog from the first `sample_size` records and
/// writes it as `barcode label observed_count` rows, most abundant first.
pub fn learn_barcodes<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    sample_size: usize,
    roche_mid_len: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = ReadStreamConfig::new();
    config.barcodes(BarcodeSource::Learn).sample_size(sample_size);
    if let Some(len) = roche_mid_len {
        config.roche_mid_len(len);
    }

    let mut stream =
        ReadStream::new(reader, config).context("Could not read the barcode sample")?;
    let catalog = match stream.catalog() {
        Some(catalog) => catalog,
        None => bail!("No barcodes found in the first {} records", sample_size),
    };
    info!(
        "Learned {} barcodes from {} records",
        catalog.len(),
        stream.buffered()
    );

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    writer.write_record(["barcode", "label", "observed_count"])?;
    for (barcode, count) in catalog
        .counts()
        .iter()
        .sorted_by_key(|&(barcode, &count)| (Reverse(count), barcode))
    {
        let label = catalog.label(barcode).unwrap_or(barcode.as_str());
        writer.write_record([barcode.as_str(), label, count.to_string().as_str()])?;
    }
    writer.flush()?;

    stream.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use readdb::_internal_test_data::LEARNABLE_BARCODES_FASTQ;

    use crate::cmd::learn_barcodes::learn_barcodes;

    #[test]
    fn should_write_learned_catalog() {
        let mut output = Vec::new();

        learn_barcodes(LEARNABLE_BARCODES_FASTQ.as_bytes(), &mut output, 2_000, None).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "barcode\tlabel\tobserved_count\nACGTAC\tACGTAC\t1044\n"
        );
    }

    #[test]
    fn should_learn_roche_mids() {
        let fastq: String = (0..20)
            .map(|i| format!("@r{}/1\nTTGGACGTACGTAC\n+\n??????????????\n", i))
            .collect();
        let mut output = Vec::new();

        learn_barcodes(fastq.as_bytes(), &mut output, 100, Some(4)).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "barcode\tlabel\tobserved_count\nTTGG\tTTGG\t20\n"
        );
    }

    #[test]
    fn should_fail_without_barcodes() {
        let fastq = "@r1/1\nACGT\n+\n????\n";

        assert!(learn_barcodes(fastq.as_bytes(), Vec::new(), 100, None).is_err());
    }
}
