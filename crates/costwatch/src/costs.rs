//! Cost rows, category buckets and the change calculation.

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

/// Fixed resource categories costs are bucketed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Databricks,
    VirtualMachine,
    Storage,
    Others,
    Total,
}

impl Category {
    /// Presentation order for anomaly results.
    pub const ALL: [Category; 5] = [
        Category::Databricks,
        Category::VirtualMachine,
        Category::Storage,
        Category::Others,
        Category::Total,
    ];

    /// Human-readable label used in API payloads and report tables.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Databricks => "Databricks",
            Category::VirtualMachine => "Virtual Machine",
            Category::Storage => "Storage",
            Category::Others => "Others",
            Category::Total => "Total",
        }
    }

    /// Classify a raw resource-type string into a base category.
    ///
    /// Case-insensitive substring match, first rule wins. The
    /// `databricks/workspace` needle also covers the plural form, and the
    /// compute/storage needles match with or without the `microsoft.` prefix.
    /// Empty or unrecognized strings land in `Others`.
    #[must_use]
    pub fn classify(resource_type: &str) -> Category {
        let resource_type = resource_type.to_ascii_lowercase();
        if resource_type.contains("databricks/workspace") {
            Category::Databricks
        } else if resource_type.contains("compute/virtualmachines") {
            Category::VirtualMachine
        } else if resource_type.contains("storage/storageaccounts") {
            Category::Storage
        } else {
            Category::Others
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A single raw billing line from the Cost Management API.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRow {
    pub cost: f64,
    pub resource_type: String,
    /// Usage date as an integer key, `YYYYMMDD`.
    pub date: u32,
}

/// Integer date key used to bucket rows per day.
#[must_use]
pub fn date_key(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// Per-day cost sums, one per category.
///
/// `total` equals the sum of the four base categories by construction: every
/// row contributes to exactly one base category and always to the total.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyCosts {
    pub databricks: f64,
    pub virtual_machine: f64,
    pub storage: f64,
    pub others: f64,
    pub total: f64,
}

impl DailyCosts {
    /// Bucket a day's raw rows into category sums.
    #[must_use]
    pub fn aggregate(rows: &[CostRow]) -> Self {
        let mut costs = DailyCosts::default();
        for row in rows {
            match Category::classify(&row.resource_type) {
                Category::Databricks => costs.databricks += row.cost,
                Category::VirtualMachine => costs.virtual_machine += row.cost,
                Category::Storage => costs.storage += row.cost,
                _ => costs.others += row.cost,
            }
            costs.total += row.cost;
        }
        costs
    }

    /// The sum for one category.
    #[must_use]
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Databricks => self.databricks,
            Category::VirtualMachine => self.virtual_machine,
            Category::Storage => self.storage,
            Category::Others => self.others,
            Category::Total => self.total,
        }
    }
}

/// Percentage change from `previous` to `current`.
///
/// A zero baseline maps to 100% when spend appeared and 0% when it stayed at
/// nothing. Sign is preserved and the value is not clamped.
#[must_use]
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Round to two decimal places for presentation.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
