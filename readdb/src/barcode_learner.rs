//! Learning a [`BarcodeCatalog`] from observed barcodes.
//!
//! True barcodes are assumed to have similar, high abundances, while
//! sequencing errors produce rare single-substitution variants of them.
//! Distinct barcodes are processed from the most to the least abundant: each
//! accepted barcode claims its variants, and the first abundance that is an
//! outlier compared to the already accepted ones ends the process.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};

use crate::barcode::{single_substitutions, BarcodeCatalog, CatalogOrigin};

/// Below this number of accepted barcodes their spread is not meaningful and
/// only grossly lower abundances are rejected.
const MIN_ACCEPTED_FOR_SPREAD: usize = 3;
const MAX_ABUNDANCE_RATIO: f64 = 100.0;
const MAX_STD_DEVIATIONS: f64 = 3.0;

#[derive(Debug, Clone, Default)]
pub struct BarcodeLearner {
    observed: HashMap<String, u64>,
}

impl BarcodeLearner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, barcode: &str) {
        *self
            .observed
            .entry(barcode.to_ascii_uppercase())
            .or_default() += 1;
    }

    /// Number of times `barcode` has been observed.
    #[must_use]
    pub fn observed_count(&self, barcode: &str) -> u64 {
        self.observed.get(barcode).copied().unwrap_or(0)
    }

    /// Number of distinct barcodes observed.
    #[must_use]
    pub fn distinct(&self) -> usize {
        self.observed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// Builds the catalog, or returns `None` if no barcode was observed.
    ///
    /// Barcodes with equal abundance are considered in lexicographic order.
    #[must_use]
    pub fn learn(&self) -> Option<BarcodeCatalog> {
        if self.observed.is_empty() {
            return None;
        }

        let mut groups: BTreeMap<Reverse<u64>, Vec<&str>> = BTreeMap::new();
        for (barcode, &count) in &self.observed {
            groups.entry(Reverse(count)).or_default().push(barcode);
        }

        let mut catalog = BarcodeCatalog::new(CatalogOrigin::Learned);
        let mut accepted: Vec<u64> = Vec::new();
        let mut claimed: HashSet<String> = HashSet::new();

        for (Reverse(count), mut barcodes) in groups {
            barcodes.retain(|barcode| !claimed.contains(*barcode));
            if barcodes.is_empty() {
                continue;
            }
            if !accepts(&accepted, count) {
                debug!(
                    "Rejected abundance {} ({} barcodes), stopping",
                    count,
                    barcodes.len()
                );
                break;
            }

            barcodes.sort_unstable();
            for barcode in barcodes {
                if claimed.contains(barcode) {
                    continue;
                }

                catalog.add_canonical(barcode, None);
                claimed.extend(single_substitutions(barcode));
                accepted.push(count);
            }
        }

        info!(
            "Learned {} barcodes from {} distinct observed barcodes",
            catalog.len(),
            self.distinct()
        );
        Some(catalog)
    }
}

impl<'a> Extend<&'a str> for BarcodeLearner {
    fn extend<T: IntoIterator<Item = &'a str>>(&mut self, iter: T) {
        for barcode in iter {
            self.add(barcode);
        }
    }
}

fn accepts(accepted: &[u64], count: u64) -> bool {
    let count = count as f64;
    let mean = mean(accepted);

    if accepted.len() < MIN_ACCEPTED_FOR_SPREAD {
        count * MAX_ABUNDANCE_RATIO >= mean
    } else {
        count >= mean - MAX_STD_DEVIATIONS * sample_std_dev(accepted, mean)
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.iter().map(|&value| value as f64).sum::<f64>() / values.len() as f64
}

fn sample_std_dev(values: &[u64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let sum_sq: f64 = values
        .iter()
        .map(|&value| (value as f64 - mean).powi(2))
        .sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}
