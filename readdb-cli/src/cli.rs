use std::path::PathBuf;

use clap::{Parser, PossibleValue, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use lazy_static::lazy_static;
use readdb::fastq::writer::OutputFormat;
use readdb::quality::{PRECHECK_SAMPLE_SIZE, STREAM_SAMPLE_SIZE};

use crate::opts::{input_stream, InputStream};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Don't display a progress bar/spinner
    #[clap(long, global = true, value_parser)]
    pub no_progress: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug)]
pub struct OutputFormatCli {
    pub inner: OutputFormat,
}

impl OutputFormatCli {
    #[must_use]
    pub fn new(inner: OutputFormat) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn variants() -> Vec<Self> {
        OutputFormat::VALUES
            .iter()
            .map(|&inner| OutputFormatCli::new(inner))
            .collect()
    }
}

lazy_static! {
    static ref OUTPUT_FORMAT_CLI_VARIANTS: Vec<OutputFormatCli> = OutputFormatCli::variants();
}

impl ValueEnum for OutputFormatCli {
    fn value_variants<'a>() -> &'a [Self] {
        &OUTPUT_FORMAT_CLI_VARIANTS
    }

    fn to_possible_value<'a>(&self) -> Option<PossibleValue<'a>> {
        let value = PossibleValue::new(self.inner.name());
        Some(value)
    }
}

impl From<&OutputFormatCli> for OutputFormat {
    fn from(format: &OutputFormatCli) -> Self {
        format.inner
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run quality control over a FASTQ file and write the resulting records
    Qc {
        /// Input FASTQ file (optionally gzipped); `-` is the standard input
        #[clap(default_value_t, value_parser = input_stream)]
        input: InputStream,

        /// Output file path; `-` is the standard output
        #[clap(short, long, value_parser)]
        output: Option<PathBuf>,

        /// Output record format
        #[clap(arg_enum, long, default_value = "fastq")]
        format: OutputFormatCli,

        /// Quality control option as `key[=value]`, e.g. `-O minlen=30`;
        /// may be given multiple times
        #[clap(short = 'O', long = "option", value_parser, value_name = "KEY[=VALUE]")]
        options: Vec<String>,

        /// JSON file with quality control options; `-O` options are applied
        /// on top of it
        #[clap(long, value_parser)]
        config: Option<PathBuf>,

        /// Write the run summary to this file; JSON if the extension is
        /// `.json`, tab-separated otherwise
        #[clap(long, value_parser)]
        summary: Option<PathBuf>,
    },

    /// Detect the quality score encoding of a FASTQ file
    DetectEncoding {
        /// Input FASTQ file (optionally gzipped); `-` is the standard input
        #[clap(default_value_t, value_parser = input_stream)]
        input: InputStream,

        /// Number of records to sample
        #[clap(default_value_t = PRECHECK_SAMPLE_SIZE, long, value_parser)]
        sample: usize,
    },

    /// Learn the barcode catalog of a multiplexed FASTQ file
    LearnBarcodes {
        /// Input FASTQ file (optionally gzipped); `-` is the standard input
        #[clap(default_value_t, value_parser = input_stream)]
        input: InputStream,

        /// Output TSV file path; `-` is the standard output
        #[clap(short, long, value_parser)]
        output: Option<PathBuf>,

        /// Number of records to learn the barcodes from
        #[clap(default_value_t = STREAM_SAMPLE_SIZE, long, value_parser)]
        sample: usize,

        /// Take the barcode from the first N bases of each read (Roche/454
        /// multiplex identifiers)
        #[clap(long, value_parser, value_name = "N")]
        roche_mid_len: Option<usize>,
    },
}
