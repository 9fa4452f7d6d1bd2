pub(crate) const FASTQ_TITLE_PREFIX: char = '@';
pub(crate) const FASTQ_QUALITY_SCORE_SEPARATOR: char = '+';
pub(crate) const FASTA_TITLE_PREFIX: char = '>';

/// Number of bases (FASTA) or scores (quality text) per output line.
pub(crate) const OUTPUT_LINE_WIDTH: usize = 60;

const FASTQ_QUALITY_SCORE_BYTE_START: u8 = b'!';
const FASTQ_QUALITY_SCORE_BYTE_END: u8 = b'~';

/// Extended IUPAC nucleotide codes, both cases, plus gap characters.
const IUPAC_NUCLEOTIDES: &[u8] = b"ACGTURYSWKMBDHVN.-";

pub(crate) const FASTQ_VALID_NUCLEOTIDE_BYTES: [bool; 256] = {
    let mut valid = [false; 256];

    let mut i = 0;
    while i < IUPAC_NUCLEOTIDES.len() {
        let byte = IUPAC_NUCLEOTIDES[i];
        valid[byte as usize] = true;
        valid[byte.to_ascii_lowercase() as usize] = true;
        i += 1;
    }

    valid
};

pub(crate) const FASTQ_VALID_Q_SCORE_BYTES: [bool; 256] = {
    let mut valid = [false; 256];

    let mut byte = FASTQ_QUALITY_SCORE_BYTE_START;
    while byte <= FASTQ_QUALITY_SCORE_BYTE_END {
        valid[byte as usize] = true;
        byte += 1;
    }

    valid
};

/// IUPAC complement, preserving case; unknown bytes map to themselves.
pub(crate) const NUCLEOTIDE_COMPLEMENT: [u8; 256] = {
    let mut complement = [0; 256];

    let mut byte = 0;
    while byte < 256 {
        complement[byte] = byte as u8;
        byte += 1;
    }

    const PAIRS: [(u8, u8); 8] = [
        (b'A', b'T'),
        (b'C', b'G'),
        (b'U', b'A'),
        (b'R', b'Y'),
        (b'K', b'M'),
        (b'B', b'V'),
        (b'D', b'H'),
        (b'S', b'S'),
    ];
    let mut i = 0;
    while i < PAIRS.len() {
        let (from, to) = PAIRS[i];
        complement[from as usize] = to;
        complement[from.to_ascii_lowercase() as usize] = to.to_ascii_lowercase();
        if from != b'U' {
            complement[to as usize] = from;
            complement[to.to_ascii_lowercase() as usize] = from.to_ascii_lowercase();
        }
        i += 1;
    }

    complement
};
