//! Shared primitive types used across the calculator.

use crate::error::IcfError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A market participant (acquirer, issuer, or both).
pub type ParticipantId = String;

/// A stable, unique identifier for a calculator session.
pub type SessionId = String;

/// Transaction categories carried by the ICF flow extract.
/// Variant order is the display order of the category panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Personal Credit")]
    PersonalCredit,
    #[serde(rename = "Contactless Debit")]
    ContactlessDebit,
    #[serde(rename = "Online/Other Debit")]
    OnlineOtherDebit,
    #[serde(rename = "Commercial Credit")]
    CommercialCredit,
    #[serde(rename = "International")]
    International,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::PersonalCredit,
        Category::ContactlessDebit,
        Category::OnlineOtherDebit,
        Category::CommercialCredit,
        Category::International,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::PersonalCredit   => "Personal Credit",
            Category::ContactlessDebit => "Contactless Debit",
            Category::OnlineOtherDebit => "Online/Other Debit",
            Category::CommercialCredit => "Commercial Credit",
            Category::International    => "International",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = IcfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| IcfError::UnknownCategory { label: s.to_string() })
    }
}

/// One historical row: a single acquirer → issuer flow in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFlow {
    pub category:                  Category,
    pub acquirer:                  ParticipantId,
    pub issuer:                    ParticipantId,
    pub value_of_transactions:     f64,
    /// Fraction, not percent.
    pub reported_icf_rate:         f64,
    pub icf_paid:                  f64,
    pub issuer_category_icf_share: f64,
}

impl TransactionFlow {
    /// The row's historical rate in percent, comparable with caps.
    pub fn historical_rate_percent(&self) -> f64 {
        crate::rate::fraction_to_percent(self.reported_icf_rate)
    }

    /// Fees the issuer actually received from this row.
    pub fn icf_received(&self) -> f64 {
        self.icf_paid * self.issuer_category_icf_share
    }
}

/// Regulatory tier as stored in the warehouse.
/// `cap_percent` is None for the unregulated tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapTier {
    pub category:    Category,
    pub cap_label:   String,
    pub cap_percent: Option<f64>,
}
