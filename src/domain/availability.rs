use regex::Regex;
use serde::Deserialize;

/// One pharmacy's latest reported mask stock, as published in the NHI dataset.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PharmacyRecord {
    #[serde(rename = "醫事機構代碼", default)]
    pub code: String,
    #[serde(rename = "醫事機構名稱", default)]
    pub name: String,
    #[serde(rename = "醫事機構地址")]
    pub address: String,
    #[serde(rename = "醫事機構電話", default)]
    pub phone: String,
    #[serde(rename = "成人口罩剩餘數")]
    pub adult_mask_count: i64,
    #[serde(rename = "兒童口罩剩餘數", default)]
    pub child_mask_count: i64,
    #[serde(rename = "來源資料時間")]
    pub source_timestamp: String,
}

/// Regex over the pharmacy address. Only matches starting at the first
/// character of the address count.
#[derive(Debug, Clone)]
pub struct AddressFilter {
    pattern: String,
    regex: Regex,
}

impl AddressFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, address: &str) -> bool {
        self.regex.is_match(address)
    }
}

/// Snapshot of the dataset for a single run, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityTable {
    records: Vec<PharmacyRecord>,
}

impl AvailabilityTable {
    pub fn new(records: Vec<PharmacyRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PharmacyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keeps the records whose address matches `filter`. Without a filter the
    /// table is returned untouched.
    pub fn filter(self, filter: Option<&AddressFilter>) -> Self {
        match filter {
            None => self,
            Some(filter) => Self {
                records: self
                    .records
                    .into_iter()
                    .filter(|record| filter.matches(&record.address))
                    .collect(),
            },
        }
    }

    pub fn adult_mask_counts(&self) -> Vec<i64> {
        self.records
            .iter()
            .map(|record| record.adult_mask_count)
            .collect()
    }

    pub fn first_timestamp(&self) -> Option<&str> {
        self.records
            .first()
            .map(|record| record.source_timestamp.as_str())
    }

    /// Whether every record carries the same source timestamp. Trivially true
    /// for empty and single-record tables.
    pub fn has_uniform_timestamp(&self) -> bool {
        match self.first_timestamp() {
            None => true,
            Some(first) => self
                .records
                .iter()
                .all(|record| record.source_timestamp == first),
        }
    }
}
