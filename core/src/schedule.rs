//! Cap schedule — one entry per category, plus the sparse user edits
//! layered on top of it.

use crate::{
    config::CalculatorConfig,
    error::{IcfError, IcfResult},
    rate,
    types::{CapTier, Category, TransactionFlow},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Two caps closer than this are the same cap.
const CAP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapScheduleEntry {
    pub category:                Category,
    pub cap_label:               String,
    /// Value-weighted historical rate across the category. Display only.
    pub historical_rate_percent: f64,
    pub current_cap_percent:     f64,
    pub proposed_cap_percent:    f64,
}

impl CapScheduleEntry {
    pub fn is_changed(&self) -> bool {
        (self.proposed_cap_percent - self.current_cap_percent).abs() > CAP_EPSILON
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapSchedule {
    entries: BTreeMap<Category, CapScheduleEntry>,
}

impl CapSchedule {
    pub fn from_entries(entries: impl IntoIterator<Item = CapScheduleEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.category, e)).collect(),
        }
    }

    pub fn get(&self, category: Category) -> Option<&CapScheduleEntry> {
        self.entries.get(&category)
    }

    /// Proposed cap for `category`, or MissingCap.
    pub fn proposed_cap(&self, category: Category) -> IcfResult<f64> {
        self.entries
            .get(&category)
            .map(|e| e.proposed_cap_percent)
            .ok_or(IcfError::MissingCap { category })
    }

    pub fn entries(&self) -> impl Iterator<Item = &CapScheduleEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any proposed cap differs from its current cap.
    pub fn has_changes(&self) -> bool {
        self.entries.values().any(CapScheduleEntry::is_changed)
    }
}

/// Sparse category → proposed cap overrides captured from the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapEdits {
    caps: BTreeMap<Category, f64>,
}

impl CapEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) an override. Validation happens at the
    /// session boundary, not here.
    pub fn set(&mut self, category: Category, percent: f64) {
        self.caps.insert(category, percent);
    }

    pub fn get(&self, category: Category) -> Option<f64> {
        self.caps.get(&category).copied()
    }

    pub fn clear(&mut self) {
        self.caps.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.caps.iter().map(|(c, p)| (*c, *p))
    }
}

impl FromIterator<(Category, f64)> for CapEdits {
    fn from_iter<I: IntoIterator<Item = (Category, f64)>>(iter: I) -> Self {
        Self { caps: iter.into_iter().collect() }
    }
}

/// Build the base schedule from warehouse cap tiers and the flows they
/// apply to. Proposed caps start equal to current caps.
pub fn build_cap_schedule(
    tiers: &[CapTier],
    flows: &[TransactionFlow],
    config: &CalculatorConfig,
) -> CapSchedule {
    CapSchedule::from_entries(tiers.iter().map(|tier| {
        let current = current_cap_percent(tier, config);
        let historical = rate::weighted_mean(
            flows
                .iter()
                .filter(|f| f.category == tier.category)
                .map(|f| (f.historical_rate_percent(), f.value_of_transactions)),
        );
        CapScheduleEntry {
            category:                tier.category,
            cap_label:               tier.cap_label.clone(),
            historical_rate_percent: historical,
            current_cap_percent:     current,
            proposed_cap_percent:    current,
        }
    }))
}

/// The unregulated tier (by label or by a missing numeric cap) maps to
/// the configured sentinel.
fn current_cap_percent(tier: &CapTier, config: &CalculatorConfig) -> f64 {
    if tier.cap_label.eq_ignore_ascii_case(&config.unregulated_label) {
        return config.unregulated_cap_percent;
    }
    tier.cap_percent.unwrap_or(config.unregulated_cap_percent)
}

/// Overlay the user's edits on the base schedule. Categories without an
/// edit keep their default proposed cap.
pub fn apply_cap_edits(cap_schedule: &CapSchedule, cap_edits: &CapEdits) -> CapSchedule {
    let mut schedule = cap_schedule.clone();
    for (category, percent) in cap_edits.iter() {
        match schedule.entries.get_mut(&category) {
            Some(entry) => entry.proposed_cap_percent = percent,
            None => log::warn!("cap edit for '{category}' ignored: category not in schedule"),
        }
    }
    schedule
}
