//! Seeded synthetic ICF market.
//!
//! Used by the runner to populate an empty warehouse and by tests that
//! need many participants. Every generated row is internally consistent:
//! icf_paid = value × rate, and the rate never exceeds the category's
//! current cap.

use crate::{
    rng::MarketRng,
    types::{CapTier, Category, TransactionFlow},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub participants: usize,
    /// Probability that a given acquirer/issuer/category row exists.
    pub density:      f64,
    pub min_value:    f64,
    pub pareto_alpha: f64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            participants: 6,
            density:      0.6,
            min_value:    50_000.0,
            pareto_alpha: 1.5,
        }
    }
}

pub struct SyntheticMarket {
    pub tiers: Vec<CapTier>,
    pub flows: Vec<TransactionFlow>,
}

/// Reference tiers: regulated debit, unregulated credit and international.
pub fn reference_tiers() -> Vec<CapTier> {
    let tier = |category, label: &str, cap| CapTier {
        category,
        cap_label: label.to_string(),
        cap_percent: cap,
    };
    vec![
        tier(Category::PersonalCredit,   "Capped credit",     Some(0.8)),
        tier(Category::ContactlessDebit, "Capped debit",      Some(0.2)),
        tier(Category::OnlineOtherDebit, "Capped debit",      Some(0.6)),
        tier(Category::CommercialCredit, "Unregulated",       None),
        tier(Category::International,    "Unregulated",       None),
    ]
}

/// Highest rate percent a generated row may carry in `category`.
fn ceiling_percent(tiers: &[CapTier], category: Category) -> f64 {
    tiers
        .iter()
        .find(|t| t.category == category)
        .and_then(|t| t.cap_percent)
        .unwrap_or(2.5)
}

pub fn generate_market(seed: u64, spec: &SyntheticSpec) -> SyntheticMarket {
    let mut rng = MarketRng::new(seed);
    let tiers = reference_tiers();
    let ids: Vec<String> = (0..spec.participants).map(|i| format!("P{:02}", i + 1)).collect();

    let mut flows = Vec::new();
    for category in Category::ALL {
        let ceiling = ceiling_percent(&tiers, category);
        for acquirer in &ids {
            for issuer in &ids {
                if !rng.chance(spec.density) {
                    continue;
                }
                let value = rng.pareto(spec.min_value, spec.pareto_alpha).round();
                // Fraction, at most the category ceiling.
                let rate = (rng.range_f64(0.3, 1.0) * ceiling / 100.0 * 1e6).round() / 1e6;
                flows.push(TransactionFlow {
                    category,
                    acquirer: acquirer.clone(),
                    issuer: issuer.clone(),
                    value_of_transactions: value,
                    reported_icf_rate: rate,
                    icf_paid: value * rate,
                    issuer_category_icf_share: rng.range_f64(0.5, 1.0),
                });
            }
        }
    }

    log::debug!("synthetic market seed={seed}: {} flows", flows.len());
    SyntheticMarket { tiers, flows }
}
