use std::collections::HashMap;

use crate::error::AllocationError;

/// Distance (cost) per unit shipped, keyed by `(donor, recipient)` index.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "Vec<CostEntry>", into = "Vec<CostEntry>")
)]
pub struct CostTable {
    entries: HashMap<(usize, usize), f64>,
}

/// Flat form of one table entry, used for serialization.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostEntry {
    pub donor: usize,
    pub recipient: usize,
    pub cost: f64,
}

impl CostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a full `donors x recipients` table from a function of the pair.
    pub fn from_fn(donors: usize, recipients: usize, mut cost: impl FnMut(usize, usize) -> f64) -> Self {
        let mut table = Self::new();
        for i in 0..donors {
            for j in 0..recipients {
                table.insert(i, j, cost(i, j));
            }
        }
        table
    }

    pub fn uniform(donors: usize, recipients: usize, cost: f64) -> Self {
        Self::from_fn(donors, recipients, |_, _| cost)
    }

    /// Build a table from `d<donor>_r<recipient>` labels.
    ///
    /// ```
    /// use maskmatch_alloc::CostTable;
    ///
    /// let table = CostTable::from_labels([("d0_r0", 125.0), ("d0_r1", 435.0)]).unwrap();
    /// assert_eq!(table.get(0, 1), Some(435.0));
    /// ```
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = (&'a str, f64)>) -> Result<Self, AllocationError> {
        labels
            .into_iter()
            .map(|(label, cost)| parse_cost_label(label).map(|key| (key, cost)))
            .collect()
    }

    /// Insert a cost, returning the previous value for the pair if any.
    pub fn insert(&mut self, donor: usize, recipient: usize, cost: f64) -> Option<f64> {
        self.entries.insert((donor, recipient), cost)
    }

    pub fn get(&self, donor: usize, recipient: usize) -> Option<f64> {
        self.entries.get(&(donor, recipient)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.entries.iter().map(|(&key, &cost)| (key, cost))
    }
}

impl FromIterator<((usize, usize), f64)> for CostTable {
    fn from_iter<T: IntoIterator<Item = ((usize, usize), f64)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl From<HashMap<(usize, usize), f64>> for CostTable {
    fn from(entries: HashMap<(usize, usize), f64>) -> Self {
        Self { entries }
    }
}

impl From<Vec<CostEntry>> for CostTable {
    fn from(entries: Vec<CostEntry>) -> Self {
        entries
            .into_iter()
            .map(|e| ((e.donor, e.recipient), e.cost))
            .collect()
    }
}

impl From<CostTable> for Vec<CostEntry> {
    fn from(table: CostTable) -> Self {
        let mut entries: Vec<CostEntry> = table
            .entries
            .into_iter()
            .map(|((donor, recipient), cost)| CostEntry { donor, recipient, cost })
            .collect();
        entries.sort_by_key(|e| (e.donor, e.recipient));
        entries
    }
}

/// Parse a `d<donor>_r<recipient>` label into its index pair.
pub fn parse_cost_label(label: &str) -> Result<(usize, usize), AllocationError> {
    let invalid = || AllocationError::InvalidCostLabel(label.to_string());

    let (donor, recipient) = label
        .strip_prefix('d')
        .and_then(|rest| rest.split_once("_r"))
        .ok_or_else(invalid)?;

    let index = |s: &str| {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse::<usize>().map_err(|_| invalid())
    };

    Ok((index(donor)?, index(recipient)?))
}
