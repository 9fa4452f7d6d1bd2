use std::fmt::Write;

use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

pub const SIMPLE_FASTQ_STR: &str = "@INST:1:1:1:1#ACGT/1
GATTTGGGGTTCAAAGCAGTATCGATCAAATAGTAAATCCATTTGTTCAACTCACAGTTT
+
!''*((((***+))%%%++)(%%%%).1***-+*''))**55CCF>>>>>>CCCCCCC65
@INST:1:1:1:2#ACGT/1
ACGTTGCAAGCTTACGGATCACGTTGCAAGCTTACGGATC
+
5555555555?????????????????????5555555##
@INST:1:1:1:3#ACGN/1
NNACGTTGCAAGCTTACGGATCAN
+
!!?????????????????????!
@INST:1:1:1:4#ACGT/1
AAAAAAAAAAAAAAAAAAAAAAAA
+
????????????????????????
";

/// Five records, the third one with a broken separator line.
pub const CORRUPTED_FASTQ_STR: &str = "@r1/1
ACGTACGTACGTACGTACGTACGT
+
555555555555555555555555
@r2/1
TTGCAAGCTTACGGATCACGTTGC
+
??????????????????????55
@r3/1
ACGTACGTACGT
X
555555555555
@r4/1
GATTACAGATTACAGATTACAGAT
+
5555555555555555555555##
@r5/1
CAGTCAGTCAGTCAGTCAGTCAGT
+
????????????????????????
";

/// Phred+64 encoded records.
pub const LEGACY_FASTQ_STR: &str = "@SRR001666.1.1 071112_SLXA-EAS1_s_7:5:1:817:345 length=36
GGGTGATGGCCGCTGCCGATGGCGTCAAATCCCACC
+
hhhhhhhhhhhhhhhhhhhhhhhhhhhhhhhhhhhh
@SRR001666.2.1 071112_SLXA-EAS1_s_7:5:1:801:338 length=36
GTTCAGGGATACGACGTTTGTATTTTAAGAATCTGA
+
hhhhhhhhhhhhhhhhhhhhhhhhhhh^^^^BBBBB
";

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
/// Canonical quality characters `#`..=`I`.
const Q_CHAR_RANGE: std::ops::RangeInclusive<u8> = b'#'..=b'I';

/// Generates paired FASTQ records with random sequences and canonical
/// quality strings.
pub fn random_fastq(seed: u64, records: usize, read_len: usize) -> String {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut fastq = String::new();

    for i in 0..records {
        push_record(&mut rng, &mut fastq, &format!("READ_{}/1", i), read_len);
    }

    fastq
}

/// Generates unpaired FASTQ records carrying the given barcodes, each
/// repeated the given number of times, in random order.
pub fn barcoded_fastq(seed: u64, barcodes: &[(&str, usize)], read_len: usize) -> String {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut tags: Vec<&str> = barcodes
        .iter()
        .flat_map(|&(barcode, count)| std::iter::repeat(barcode).take(count))
        .collect();
    tags.shuffle(&mut rng);

    let mut fastq = String::new();
    for (i, barcode) in tags.into_iter().enumerate() {
        push_record(
            &mut rng,
            &mut fastq,
            &format!("READ_{}#{}", i, barcode),
            read_len,
        );
    }

    fastq
}

fn push_record<T: Rng>(rng: &mut T, fastq: &mut String, title: &str, read_len: usize) {
    let sequence: String = (0..read_len)
        .map(|_| BASES[rng.gen_range(0..BASES.len())])
        .collect();
    let quality: String = (0..read_len)
        .map(|_| rng.gen_range(Q_CHAR_RANGE) as char)
        .collect();

    writeln!(fastq, "@{}\n{}\n+\n{}", title, sequence, quality).unwrap();
}

/// Abundances of a sample with one true barcode, five sequencing-error
/// variants of it and unrelated noise.
pub const LEARNABLE_BARCODES: [(&str, usize); 9] = [
    ("ACGTAC", 1000),
    ("ACGTAA", 10),
    ("NCGTAC", 9),
    ("AGGTAC", 8),
    ("ACCTAC", 10),
    ("ACGTTC", 7),
    ("TTTTGG", 2),
    ("GGCCAA", 1),
    ("CATCAT", 2),
];

lazy_static! {
    pub static ref RANDOM_FASTQ_10K: String = random_fastq(1337, 10_000, 100);
    pub static ref LEARNABLE_BARCODES_FASTQ: String = barcoded_fastq(1337, &LEARNABLE_BARCODES, 50);
}
