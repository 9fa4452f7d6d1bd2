pub mod detect_encoding;
pub mod learn_barcodes;
pub mod qc;
