//! Line-level FASTQ input and FASTQ/FASTA/quality-score output.

pub(crate) mod consts;
pub mod reader;
pub mod writer;

pub(crate) use consts::{
    FASTA_TITLE_PREFIX, FASTQ_QUALITY_SCORE_SEPARATOR, FASTQ_TITLE_PREFIX, OUTPUT_LINE_WIDTH,
};
