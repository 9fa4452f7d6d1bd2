pub mod barcode;
pub mod barcode_learner;
pub mod config;
pub mod fastq;
pub mod header;
pub mod progress;
pub mod qc;
pub mod quality;
pub mod record;
pub mod stream;
pub mod summary;

#[doc(hidden)]
pub mod _internal_test_data;
