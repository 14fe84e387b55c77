//! Fee-impact calculator.
//!
//! Pure and stateless. Each estimate runs, in order:
//!   1. apply_cap_edits        (schedule.rs)
//!   2. compute_applied_rates  per-row min(proposed cap, historical rate)
//!   3. summarize_flows        (acquirer, issuer) → per-participant fees
//!   4. compute_impact         net positions and impact
//!
//! The market table is computed once over the unfiltered flows. Each
//! category table re-runs steps 2–4 over that category's rows only.

use crate::{
    error::IcfResult,
    impact::{Estimate, FeeTotals, ImpactDirection, ImpactReport, ImpactRow, ImpactTable, Scope},
    rate,
    schedule::{apply_cap_edits, CapEdits, CapSchedule},
    types::{Category, ParticipantId, TransactionFlow},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Percent rates closer than this are the same rate.
const RATE_EPSILON: f64 = 1e-9;

/// A flow row with its recomputed fee.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedFlow {
    pub flow:                   TransactionFlow,
    pub applied_rate:           f64,
    pub new_fee_paid:           f64,
    pub new_fee_flow_to_issuer: f64,
}

/// Fees between one acquirer and one issuer, summed over categories in scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairFlow {
    pub acquirer:         ParticipantId,
    pub issuer:           ParticipantId,
    pub icf_paid:         f64,
    pub icf_received:     f64,
    pub new_fee_paid:     f64,
    pub new_fee_received: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantFees {
    pub participant:   ParticipantId,
    pub paid_2023:     f64,
    pub received_2023: f64,
    pub new_paid:      f64,
    pub new_received:  f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantTable {
    pub pairs:        Vec<PairFlow>,
    pub participants: Vec<ParticipantFees>,
}

/// Join each flow to its category's proposed cap and recompute the fee.
/// The cap is compared with the row's own rate, never the category average.
pub fn compute_applied_rates(
    flows: &[TransactionFlow],
    cap_schedule: &CapSchedule,
) -> IcfResult<Vec<AppliedFlow>> {
    flows
        .iter()
        .map(|flow| {
            let cap = cap_schedule.proposed_cap(flow.category)?;
            let historical = flow.historical_rate_percent();
            let historical_fee = flow.value_of_transactions * flow.reported_icf_rate;
            // A non-binding cap reproduces the historical fee bit for bit;
            // a binding one never rounds above it.
            let (applied_rate, new_fee_paid) = if cap >= historical - RATE_EPSILON {
                (historical, historical_fee)
            } else {
                (cap, rate::apply_percent(flow.value_of_transactions, cap).min(historical_fee))
            };
            Ok(AppliedFlow {
                flow: flow.clone(),
                applied_rate,
                new_fee_paid,
                new_fee_flow_to_issuer: new_fee_paid * flow.issuer_category_icf_share,
            })
        })
        .collect()
}

/// Group by (acquirer, issuer), roll up paid by acquirer and received by
/// issuer, then outer-join the two roll-ups on participant with zero fill.
pub fn summarize_flows(applied: &[AppliedFlow]) -> ParticipantTable {
    let mut pairs: BTreeMap<(ParticipantId, ParticipantId), PairFlow> = BTreeMap::new();
    for a in applied {
        let key = (a.flow.acquirer.clone(), a.flow.issuer.clone());
        let pair = pairs.entry(key).or_insert_with(|| PairFlow {
            acquirer: a.flow.acquirer.clone(),
            issuer:   a.flow.issuer.clone(),
            ..PairFlow::default()
        });
        pair.icf_paid         += a.flow.icf_paid;
        pair.icf_received     += a.flow.icf_received();
        pair.new_fee_paid     += a.new_fee_paid;
        pair.new_fee_received += a.new_fee_flow_to_issuer;
    }

    let participants: Vec<ParticipantFees> = {
        // (historical, new)
        let mut paid:     BTreeMap<&str, (f64, f64)> = BTreeMap::new();
        let mut received: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
        for pair in pairs.values() {
            let p = paid.entry(pair.acquirer.as_str()).or_default();
            p.0 += pair.icf_paid;
            p.1 += pair.new_fee_paid;
            let r = received.entry(pair.issuer.as_str()).or_default();
            r.0 += pair.icf_received;
            r.1 += pair.new_fee_received;
        }

        let everyone: BTreeSet<&str> = paid.keys().chain(received.keys()).copied().collect();
        let rolled_up = everyone
            .into_iter()
            .map(|id| {
                let (paid_2023, new_paid) = paid.get(id).copied().unwrap_or_default();
                let (received_2023, new_received) = received.get(id).copied().unwrap_or_default();
                ParticipantFees {
                    participant: id.to_string(),
                    paid_2023,
                    received_2023,
                    new_paid,
                    new_received,
                }
            })
            .collect();
        rolled_up
    };

    ParticipantTable {
        pairs: pairs.into_values().collect(),
        participants,
    }
}

/// Net positions and impact per participant, plus scalar totals.
pub fn compute_impact(table: &ParticipantTable, scope: Scope) -> ImpactTable {
    let rows = table
        .participants
        .iter()
        .map(|p| {
            let net_position_2023 = p.received_2023 - p.paid_2023;
            let estimated_net_position = p.new_received - p.new_paid;
            let estimated_impact = estimated_net_position - net_position_2023;
            ImpactRow {
                participant: p.participant.clone(),
                estimated_impact,
                net_position_2023,
                estimated_net_position,
                direction: ImpactDirection::of(estimated_impact),
            }
        })
        .collect();

    let received_2023: f64 = table.participants.iter().map(|p| p.received_2023).sum();
    let estimated_received: f64 = table.participants.iter().map(|p| p.new_received).sum();

    ImpactTable {
        scope,
        rows,
        totals: FeeTotals {
            received_2023,
            estimated_received,
            delta: estimated_received - received_2023,
        },
    }
}

fn impact_table(
    flows: &[TransactionFlow],
    schedule: &CapSchedule,
    scope: Scope,
) -> IcfResult<ImpactTable> {
    let applied = compute_applied_rates(flows, schedule)?;
    let table = summarize_flows(&applied);
    Ok(compute_impact(&table, scope))
}

/// Market table over all flows, then one table per category over that
/// category's subset.
pub fn impact_report(flows: &[TransactionFlow], schedule: &CapSchedule) -> IcfResult<ImpactReport> {
    let market = impact_table(flows, schedule, Scope::Market)?;

    let mut categories = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        let subset: Vec<TransactionFlow> = flows
            .iter()
            .filter(|f| f.category == category)
            .cloned()
            .collect();
        categories.push(impact_table(&subset, schedule, Scope::Category(category))?);
    }

    log::debug!(
        "impact report: {} flows, {} participants, market delta {:.2}",
        flows.len(),
        market.rows.len(),
        market.totals.delta
    );
    Ok(ImpactReport { market, categories })
}

/// Full request: overlay edits, short-circuit when nothing changed,
/// otherwise compute the report.
pub fn estimate(
    flows: &[TransactionFlow],
    base_schedule: &CapSchedule,
    edits: &CapEdits,
) -> IcfResult<Estimate> {
    let schedule = apply_cap_edits(base_schedule, edits);
    if !schedule.has_changes() {
        log::info!("estimate: no cap changes made");
        return Ok(Estimate::NoChanges);
    }
    Ok(Estimate::Computed(impact_report(flows, &schedule)?))
}
