use std::fmt;

use super::availability::AvailabilityTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportCell {
    Text(String),
    Number(i64),
}

/// A single spreadsheet row: the source timestamp followed by the adult mask
/// counts of every retained pharmacy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    timestamp: String,
    counts: Vec<i64>,
}

impl ReportRow {
    pub fn new(timestamp: impl Into<String>, counts: Vec<i64>) -> Self {
        Self {
            timestamp: timestamp.into(),
            counts,
        }
    }

    /// Builds the row from the first record's timestamp and all counts.
    /// An empty table has no timestamp to report and yields `None`.
    pub fn from_table(table: &AvailabilityTable) -> Option<Self> {
        let timestamp = table.first_timestamp()?;
        Some(Self::new(timestamp, table.adult_mask_counts()))
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn counts(&self) -> &[i64] {
        &self.counts
    }

    pub fn cells(&self) -> Vec<ReportCell> {
        std::iter::once(ReportCell::Text(self.timestamp.clone()))
            .chain(self.counts.iter().copied().map(ReportCell::Number))
            .collect()
    }
}

impl fmt::Display for ReportRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.timestamp)?;
        for count in &self.counts {
            write!(f, ", {}", count)?;
        }
        write!(f, "]")
    }
}
