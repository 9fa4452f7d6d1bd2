use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use log::info;
use readdb::config::ReadStreamConfig;
use readdb::fastq::writer::{OutputFormat, RecordWriter};
use readdb::progress::ProgressNotifier;
use readdb::stream::{ReadStream, ReadStreamParams};
use readdb::summary::Summary;

/// Builds the stream configuration from an optional JSON file and a list
/// of `key[=value]` overrides.
pub(crate) fn load_config(
    config_path: Option<&Path>,
    options: &[String],
) -> anyhow::Result<ReadStreamConfig> {
    let mut config = match config_path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Could not open config file {}", path.display()))?;
            ReadStreamConfig::from_json_reader(file)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => ReadStreamConfig::new(),
    };

    for option in options {
        config
            .apply_option(option)
            .with_context(|| format!("Invalid option `{}`", option))?;
    }

    Ok(config)
}

pub fn qc<W: Write>(
    reader: Box<dyn BufRead>,
    writer: W,
    format: OutputFormat,
    config: ReadStreamConfig,
    summary_path: Option<PathBuf>,
    progress_notifier: Arc<dyn ProgressNotifier>,
) -> anyhow::Result<()> {
    let params = ReadStreamParams::builder()
        .config(config)
        .progress_notifier(progress_notifier)
        .build();
    let mut stream =
        ReadStream::with_params(reader, params).context("Could not start the read stream")?;
    info!(
        "Quality encoding: {}, paired: {}",
        stream.encoding(),
        stream.is_paired()
    );

    let mut record_writer = RecordWriter::with_format(writer, format);
    for record in stream.by_ref() {
        let record = record.context("Could not read a record from the FASTQ file")?;
        record_writer
            .write_record(&record)
            .context("Could not write a record to the output")?;
    }
    record_writer
        .flush()
        .context("Could not write a record to the output")?;

    let summary = stream.summary();
    report(&summary);
    if let Some(path) = summary_path {
        write_summary(&summary, &path)
            .with_context(|| format!("Could not write the summary to {}", path.display()))?;
    }

    Ok(())
}

fn report(summary: &Summary) {
    info!(
        "Processed {} records, {} passed",
        summary.total(),
        summary.passed()
    );
    for (outcome, count) in summary.outcomes.iter().filter(|(_, &count)| count > 0) {
        info!("  {}: {}", outcome, count);
    }
    if summary.malformed > 0 {
        info!("  malformed (discarded): {}", summary.malformed);
    }
}

fn write_summary(summary: &Summary, path: &Path) -> anyhow::Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let is_json = path
        .extension()
        .map_or(false, |extension| extension.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::to_writer_pretty(file, summary)?;
    } else {
        summary.write_tsv(file)?;
    }
    info!("Summary written to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;

    use readdb::fastq::writer::OutputFormat;
    use readdb::progress::DummyProgressNotifier;

    use crate::cmd::qc::{load_config, qc};

    const FASTQ: &str = "@r1/1\nACGTACGTACGTACGTACGTACGT\n+\n????????????????????????\n\
                         @r2/1\nAAAAAAAAAAAAAAAAAAAAAAAA\n+\n????????????????????????\n";

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("readdb-cli-{}-{}", std::process::id(), name))
    }

    #[test]
    fn should_apply_options_over_config_file() {
        let path = temp_path("config.json");
        let mut file = File::create(&path).unwrap();
        write!(file, r#"{{"minlen": 50, "trim3": true}}"#).unwrap();

        let config = load_config(Some(&path), &["minlen=10".to_owned()]).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.get_min_len(), Some(10));
        assert!(config.get_trim3());
    }

    #[test]
    fn should_reject_unknown_option() {
        let result = load_config(None, &["no_such_option".to_owned()]);

        assert!(result.is_err());
    }

    #[test]
    fn should_write_passing_records_and_summary() {
        let config = load_config(None, &["low_complexity".to_owned()]).unwrap();
        let summary_path = temp_path("summary.json");
        let mut output = Vec::new();

        qc(
            Box::new(FASTQ.as_bytes()),
            &mut output,
            OutputFormat::Fasta,
            config,
            Some(summary_path.clone()),
            Arc::new(DummyProgressNotifier),
        )
        .unwrap();
        let summary = std::fs::read_to_string(&summary_path).unwrap();
        std::fs::remove_file(&summary_path).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            ">r1/1\nACGTACGTACGTACGTACGTACGT\n>r2/1\n\n"
        );
        let summary: serde_json::Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(summary["outcomes"]["pass"], 1);
        assert_eq!(summary["outcomes"]["low_complexity"], 1);
    }
}
