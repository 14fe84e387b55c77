//! Impact result tables produced by the calculator.

use crate::types::{Category, ParticipantId};
use serde::{Deserialize, Serialize};

/// How a participant fares under the proposed caps.
/// Classified on sign only, never on a magnitude threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactDirection {
    Gain,
    Loss,
    Unchanged,
}

impl ImpactDirection {
    pub fn of(impact: f64) -> Self {
        if impact > 0.0 {
            ImpactDirection::Gain
        } else if impact < 0.0 {
            ImpactDirection::Loss
        } else {
            ImpactDirection::Unchanged
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactRow {
    pub participant:            ParticipantId,
    pub estimated_impact:       f64,
    #[serde(rename = "2023_net_position")]
    pub net_position_2023:      f64,
    pub estimated_net_position: f64,
    pub direction:              ImpactDirection,
}

/// Scalar summary shown above each table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeTotals {
    pub received_2023:      f64,
    pub estimated_received: f64,
    pub delta:              f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "category", rename_all = "snake_case")]
pub enum Scope {
    Market,
    Category(Category),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactTable {
    pub scope:  Scope,
    pub rows:   Vec<ImpactRow>,
    pub totals: FeeTotals,
}

impl ImpactTable {
    pub fn row(&self, participant: &str) -> Option<&ImpactRow> {
        self.rows.iter().find(|r| r.participant == participant)
    }

    /// Impact for `participant`, zero if they do not appear in this scope.
    pub fn impact_of(&self, participant: &str) -> f64 {
        self.row(participant).map(|r| r.estimated_impact).unwrap_or(0.0)
    }
}

/// Whole-market table plus one table per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub market:     ImpactTable,
    pub categories: Vec<ImpactTable>,
}

impl ImpactReport {
    pub fn category(&self, category: Category) -> Option<&ImpactTable> {
        self.categories
            .iter()
            .find(|t| t.scope == Scope::Category(category))
    }
}

/// Outcome of one estimate request. `NoChanges` is reported distinctly
/// from a computed report whose impacts happen to be zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Estimate {
    NoChanges,
    Computed(ImpactReport),
}
