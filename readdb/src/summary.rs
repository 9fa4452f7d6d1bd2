use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::io::Write;

use serde::Serialize;

use crate::barcode::BarcodeCatalog;
use crate::quality::QualityEncoding;
use crate::record::{FilterReason, ReadRecord};

/// Final status of a record yielded by a stream.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Outcome {
    Pass,
    Filtered(FilterReason),
}

impl Outcome {
    #[must_use]
    pub fn of(record: &ReadRecord) -> Self {
        record
            .filter_reason()
            .map_or(Outcome::Pass, Outcome::Filtered)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Filtered(reason) => reason.name(),
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tally of record outcomes and of the barcodes of passing records.
#[derive(Debug, Clone, Default)]
pub struct OutcomeCounter {
    outcomes: BTreeMap<Outcome, u64>,
    barcodes: BTreeMap<String, u64>,
}

impl OutcomeCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: &ReadRecord) {
        let outcome = Outcome::of(record);
        *self.outcomes.entry(outcome).or_default() += 1;

        if outcome == Outcome::Pass {
            if let Some(barcode) = record.barcode() {
                *self.barcodes.entry(barcode.to_owned()).or_default() += 1;
            }
        }
    }

    #[must_use]
    pub fn count(&self, outcome: Outcome) -> u64 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.outcomes.values().sum()
    }

    #[must_use]
    pub fn barcode_count(&self, barcode: &str) -> u64 {
        self.barcodes.get(barcode).copied().unwrap_or(0)
    }
}

/// Snapshot of the stream statistics.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Summary {
    pub encoding: Option<QualityEncoding>,
    /// Number of records per outcome; `pass` is always present.
    pub outcomes: BTreeMap<String, u64>,
    /// Number of records discarded as structurally malformed.
    pub malformed: usize,
    /// Passing records per canonical barcode, if a catalog is in use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcodes: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl Summary {
    #[must_use]
    pub fn new(
        counter: &OutcomeCounter,
        encoding: Option<QualityEncoding>,
        malformed: usize,
        catalog: Option<&BarcodeCatalog>,
    ) -> Self {
        let mut outcomes: BTreeMap<String, u64> = counter
            .outcomes
            .iter()
            .map(|(outcome, &count)| (outcome.name().to_owned(), count))
            .collect();
        outcomes.entry(Outcome::Pass.name().to_owned()).or_insert(0);

        let barcodes = catalog.map(|catalog| {
            catalog
                .counts()
                .keys()
                .map(|barcode| (barcode.clone(), counter.barcode_count(barcode)))
                .collect()
        });
        let labels = catalog.map(|catalog| {
            catalog
                .labels()
                .iter()
                .map(|(barcode, label)| (barcode.clone(), label.clone()))
                .collect()
        });

        Self {
            encoding,
            outcomes,
            malformed,
            barcodes,
            labels,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.outcomes.values().sum()
    }

    #[must_use]
    pub fn passed(&self) -> u64 {
        self.outcomes
            .get(Outcome::Pass.name())
            .copied()
            .unwrap_or(0)
    }

    /// Writes the summary as tab-separated `outcome count` rows followed by
    /// `barcode label count` rows.
    pub fn write_tsv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_writer(writer);

        writer.write_record(["outcome", "count"])?;
        for (outcome, count) in &self.outcomes {
            writer.write_record([outcome.as_str(), count.to_string().as_str()])?;
        }
        writer.write_record(["malformed", self.malformed.to_string().as_str()])?;

        if let (Some(barcodes), Some(labels)) = (&self.barcodes, &self.labels) {
            writer.write_record(["barcode", "label", "count"])?;
            for (barcode, count) in barcodes {
                let label = labels.get(barcode).map_or(barcode.as_str(), String::as_str);
                writer.write_record([barcode.as_str(), label, count.to_string().as_str()])?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}
