use std::io::{BufRead, Write};

use anyhow::Context;
use readdb::quality::{detect_encoding as detect, QualityEncoding};

pub fn detect_encoding<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    sample_size: usize,
) -> anyhow::Result<QualityEncoding> {
    let encoding = detect(reader, sample_size)
        .context("Could not detect the quality encoding of the FASTQ file")?;

    writeln!(writer, "{}", encoding)?;
    Ok(encoding)
}

#[cfg(test)]
mod tests {
    use readdb::quality::QualityEncoding;

    use crate::cmd::detect_encoding::detect_encoding;

    #[test]
    fn should_print_detected_encoding() {
        let fastq = "@r1\nACGT\n+\nhh^B\n";
        let mut output = Vec::new();

        let encoding = detect_encoding(fastq.as_bytes(), &mut output, 10).unwrap();

        assert_eq!(encoding, QualityEncoding::Legacy);
        assert_eq!(String::from_utf8(output).unwrap(), "legacy (Phred+64)\n");
    }

    #[test]
    fn should_fail_without_evidence() {
        let fastq = "@r1\nACGT\n+\nIIII\n";

        assert!(detect_encoding(fastq.as_bytes(), Vec::new(), 10).is_err());
    }
}
