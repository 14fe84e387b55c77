//! Fee-impact calculator tests.
//!
//! Covers the estimate pipeline end to end:
//! 1. The two-participant reference scenario
//! 2. Idempotence and the no-change invariant
//! 3. Cap monotonicity and additivity across categories
//! 4. Zero-fill completeness and data-integrity failures

use icf_core::{
    calculator::{compute_applied_rates, estimate, impact_report, summarize_flows},
    config::CalculatorConfig,
    error::IcfError,
    impact::{Estimate, ImpactDirection, ImpactReport, Scope},
    schedule::{apply_cap_edits, build_cap_schedule, CapEdits, CapSchedule},
    synthetic::{generate_market, SyntheticSpec},
    types::{CapTier, Category, TransactionFlow},
};
use std::collections::BTreeSet;

const TOLERANCE: f64 = 1e-6;

fn assert_close(actual: f64, expected: f64, what: &str) {
    let scale = 1.0_f64.max(expected.abs());
    assert!(
        (actual - expected).abs() <= TOLERANCE * scale,
        "{what}: expected {expected}, got {actual}"
    );
}

fn flow(
    category: Category,
    acquirer: &str,
    issuer: &str,
    value: f64,
    rate: f64,
    paid: f64,
    share: f64,
) -> TransactionFlow {
    TransactionFlow {
        category,
        acquirer: acquirer.into(),
        issuer: issuer.into(),
        value_of_transactions: value,
        reported_icf_rate: rate,
        icf_paid: paid,
        issuer_category_icf_share: share,
    }
}

fn unregulated_everywhere() -> Vec<CapTier> {
    Category::ALL
        .into_iter()
        .map(|category| CapTier {
            category,
            cap_label: "Unregulated".into(),
            cap_percent: None,
        })
        .collect()
}

fn scenario_flows() -> Vec<TransactionFlow> {
    vec![
        flow(Category::PersonalCredit, "A", "B", 1_000_000.0, 0.02, 20_000.0, 1.0),
        flow(Category::PersonalCredit, "B", "A", 500_000.0, 0.01, 5_000.0, 1.0),
    ]
}

fn computed(estimate: Estimate) -> ImpactReport {
    match estimate {
        Estimate::Computed(report) => report,
        Estimate::NoChanges => panic!("expected a computed report, got NoChanges"),
    }
}

fn synthetic_inputs(seed: u64) -> (Vec<TransactionFlow>, CapSchedule) {
    let _ = env_logger::builder().is_test(true).try_init();
    let market = generate_market(seed, &SyntheticSpec::default());
    let schedule = build_cap_schedule(&market.tiers, &market.flows, &CalculatorConfig::default_test());
    (market.flows, schedule)
}

// ─────────────────────────────────────────────────────────────────────────────
// Reference scenario
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn reference_scenario_applies_row_level_caps() {
    let flows = scenario_flows();
    let base = build_cap_schedule(&unregulated_everywhere(), &flows, &CalculatorConfig::default_test());
    let edits: CapEdits = [(Category::PersonalCredit, 1.0)].into_iter().collect();
    let schedule = apply_cap_edits(&base, &edits);

    let applied = compute_applied_rates(&flows, &schedule).unwrap();
    assert_close(applied[0].applied_rate, 1.0, "row 1 applied rate");
    assert_close(applied[0].new_fee_paid, 10_000.0, "row 1 new fee");
    assert_close(applied[1].applied_rate, 1.0, "row 2 applied rate");
    assert_close(applied[1].new_fee_paid, 5_000.0, "row 2 new fee");
}

#[test]
fn reference_scenario_impacts_are_symmetric() {
    let flows = scenario_flows();
    let base = build_cap_schedule(&unregulated_everywhere(), &flows, &CalculatorConfig::default_test());
    let edits: CapEdits = [(Category::PersonalCredit, 1.0)].into_iter().collect();

    let report = computed(estimate(&flows, &base, &edits).unwrap());

    let a = report.market.row("A").expect("A in market table");
    let b = report.market.row("B").expect("B in market table");
    assert_close(a.net_position_2023, -15_000.0, "A 2023 net");
    assert_close(a.estimated_net_position, -5_000.0, "A estimated net");
    assert_close(a.estimated_impact, 10_000.0, "A impact");
    assert_close(b.estimated_impact, -10_000.0, "B impact");
    assert_eq!(a.direction, ImpactDirection::Gain);
    assert_eq!(b.direction, ImpactDirection::Loss);

    assert_close(report.market.totals.received_2023, 25_000.0, "2023 received");
    assert_close(report.market.totals.estimated_received, 15_000.0, "estimated received");
    assert_close(report.market.totals.delta, -10_000.0, "delta");
}

#[test]
fn report_has_one_table_per_category() {
    let flows = scenario_flows();
    let base = build_cap_schedule(&unregulated_everywhere(), &flows, &CalculatorConfig::default_test());
    let edits: CapEdits = [(Category::PersonalCredit, 1.0)].into_iter().collect();

    let report = computed(estimate(&flows, &base, &edits).unwrap());

    assert_eq!(report.market.scope, Scope::Market);
    assert_eq!(report.categories.len(), Category::ALL.len());
    let personal = report.category(Category::PersonalCredit).unwrap();
    assert_close(personal.impact_of("A"), 10_000.0, "A personal credit impact");

    let international = report.category(Category::International).unwrap();
    assert!(international.rows.is_empty(), "no international flows in scenario");
    assert_eq!(international.totals.delta, 0.0);
}

#[test]
fn historical_rate_is_value_weighted() {
    let flows = scenario_flows();
    let schedule = build_cap_schedule(&unregulated_everywhere(), &flows, &CalculatorConfig::default_test());
    let entry = schedule.get(Category::PersonalCredit).unwrap();

    // (2.0 × 1,000,000 + 1.0 × 500,000) / 1,500,000
    assert_close(entry.historical_rate_percent, 2.5 / 1.5, "weighted historical rate");
    assert_eq!(entry.current_cap_percent, 5.0);
    assert_eq!(entry.proposed_cap_percent, 5.0);
}

#[test]
fn cap_above_historical_rate_never_inflates_fees() {
    let flows = vec![flow(Category::ContactlessDebit, "A", "B", 100_000.0, 0.002, 200.0, 1.0)];
    let tiers = vec![CapTier {
        category: Category::ContactlessDebit,
        cap_label: "Capped debit".into(),
        cap_percent: Some(0.2),
    }];
    let base = build_cap_schedule(&tiers, &flows, &CalculatorConfig::default_test());
    let edits: CapEdits = [(Category::ContactlessDebit, 3.0)].into_iter().collect();

    let applied = compute_applied_rates(&flows, &apply_cap_edits(&base, &edits)).unwrap();
    assert_close(applied[0].applied_rate, 0.2, "applied rate stays at historical");
    assert_close(applied[0].new_fee_paid, 200.0, "new fee equals historical fee");
}

#[test]
fn untouched_categories_stay_unchanged() {
    for seed in 0..50 {
        let (flows, base) = synthetic_inputs(seed);
        let edits: CapEdits = [(Category::International, 0.0)].into_iter().collect();
        let report = computed(estimate(&flows, &base, &edits).unwrap());

        for table in &report.categories {
            if table.scope == Scope::Category(Category::International) {
                continue;
            }
            for row in &table.rows {
                assert_eq!(
                    row.direction,
                    ImpactDirection::Unchanged,
                    "seed {seed} {:?} {} moved by {}",
                    table.scope,
                    row.participant,
                    row.estimated_impact
                );
            }
            assert_eq!(table.totals.delta, 0.0, "seed {seed} {:?}", table.scope);
        }
    }
}

#[test]
fn edit_for_unscheduled_category_is_ignored() {
    let flows = scenario_flows();
    let tiers: Vec<CapTier> = unregulated_everywhere()
        .into_iter()
        .filter(|t| t.category != Category::International)
        .collect();
    let base = build_cap_schedule(&tiers, &flows, &CalculatorConfig::default_test());
    let edits: CapEdits = [(Category::International, 1.0)].into_iter().collect();

    let schedule = apply_cap_edits(&base, &edits);
    assert_eq!(schedule, base);
    assert_eq!(schedule.len(), Category::ALL.len() - 1);
    assert!(schedule.get(Category::International).is_none());
    for tier in &tiers {
        let entry = schedule.get(tier.category).expect("every scheduled category kept");
        assert_eq!(entry.proposed_cap_percent, entry.current_cap_percent);
    }
    assert_eq!(estimate(&flows, &base, &edits).unwrap(), Estimate::NoChanges);
}

// ─────────────────────────────────────────────────────────────────────────────
// Idempotence and no-change
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn estimate_is_idempotent() {
    let (flows, base) = synthetic_inputs(7);
    let edits: CapEdits = [(Category::PersonalCredit, 0.3), (Category::International, 1.0)]
        .into_iter()
        .collect();

    let first = estimate(&flows, &base, &edits).unwrap();
    let second = estimate(&flows, &base, &edits).unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_edits_report_no_changes() {
    let (flows, base) = synthetic_inputs(11);
    let result = estimate(&flows, &base, &CapEdits::new()).unwrap();
    assert_eq!(result, Estimate::NoChanges);
}

#[test]
fn edits_equal_to_current_caps_report_no_changes() {
    let (flows, base) = synthetic_inputs(12);
    let edits: CapEdits = base
        .entries()
        .map(|e| (e.category, e.current_cap_percent))
        .collect();
    assert_eq!(estimate(&flows, &base, &edits).unwrap(), Estimate::NoChanges);
}

#[test]
fn current_caps_produce_zero_impact_for_everyone() {
    let (flows, base) = synthetic_inputs(13);
    let report = impact_report(&flows, &base).unwrap();

    assert!(!report.market.rows.is_empty());
    for row in &report.market.rows {
        let scale = 1.0_f64.max(row.net_position_2023.abs());
        assert!(
            row.estimated_impact.abs() <= 1e-9 * scale + 1e-6,
            "{} moved by {} with unchanged caps",
            row.participant,
            row.estimated_impact
        );
    }
}

#[test]
fn all_caps_at_zero_is_a_real_change() {
    let (flows, base) = synthetic_inputs(14);
    let edits: CapEdits = Category::ALL.into_iter().map(|c| (c, 0.0)).collect();

    let report = computed(estimate(&flows, &base, &edits).unwrap());
    assert_eq!(report.market.totals.estimated_received, 0.0);
    assert_close(
        report.market.totals.delta,
        -report.market.totals.received_2023,
        "delta wipes out all received fees",
    );
    for row in &report.market.rows {
        assert_eq!(row.estimated_net_position, 0.0);
        assert_close(row.estimated_impact, -row.net_position_2023, &row.participant);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Monotonicity and additivity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn lowering_a_cap_never_raises_new_fees() {
    let (flows, base) = synthetic_inputs(21);
    let mut previous: Option<Vec<f64>> = None;

    for step in (0..=50).rev() {
        let cap = step as f64 / 10.0;
        let edits: CapEdits = [(Category::PersonalCredit, cap)].into_iter().collect();
        let applied = compute_applied_rates(&flows, &apply_cap_edits(&base, &edits)).unwrap();
        let fees: Vec<f64> = applied.iter().map(|a| a.new_fee_paid).collect();

        if let Some(prev) = &previous {
            for (i, (now, before)) in fees.iter().zip(prev).enumerate() {
                assert!(now <= before, "row {i} fee rose from {before} to {now} at cap {cap}");
            }
        }
        previous = Some(fees);
    }
}

#[test]
fn category_impacts_sum_to_market_impact() {
    let (flows, base) = synthetic_inputs(33);
    let edits: CapEdits = [
        (Category::PersonalCredit, 0.5),
        (Category::ContactlessDebit, 0.1),
        (Category::CommercialCredit, 1.2),
        (Category::International, 0.9),
    ]
    .into_iter()
    .collect();

    let report = computed(estimate(&flows, &base, &edits).unwrap());

    for row in &report.market.rows {
        let summed: f64 = report
            .categories
            .iter()
            .map(|t| t.impact_of(&row.participant))
            .sum();
        assert_close(summed, row.estimated_impact, &format!("{} impact additivity", row.participant));

        let summed_net: f64 = report
            .categories
            .iter()
            .filter_map(|t| t.row(&row.participant))
            .map(|r| r.net_position_2023)
            .sum();
        assert_close(summed_net, row.net_position_2023, &format!("{} net additivity", row.participant));
    }

    let summed_delta: f64 = report.categories.iter().map(|t| t.totals.delta).sum();
    assert_close(summed_delta, report.market.totals.delta, "delta additivity");
}

// ─────────────────────────────────────────────────────────────────────────────
// Zero fill and integrity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn one_role_participants_are_zero_filled() {
    let flows = vec![
        flow(Category::OnlineOtherDebit, "ACQ", "ISS", 200_000.0, 0.005, 1_000.0, 0.8),
    ];
    let base = build_cap_schedule(&unregulated_everywhere(), &flows, &CalculatorConfig::default_test());
    let applied = compute_applied_rates(&flows, &base).unwrap();
    let table = summarize_flows(&applied);

    assert_eq!(table.participants.len(), 2);
    let acq = table.participants.iter().find(|p| p.participant == "ACQ").unwrap();
    let iss = table.participants.iter().find(|p| p.participant == "ISS").unwrap();
    assert_eq!(acq.received_2023, 0.0);
    assert_eq!(acq.new_received, 0.0);
    assert_close(acq.paid_2023, 1_000.0, "acquirer paid");
    assert_eq!(iss.paid_2023, 0.0);
    assert_eq!(iss.new_paid, 0.0);
    assert_close(iss.received_2023, 800.0, "issuer share of fee");
}

#[test]
fn every_participant_appears_exactly_once() {
    let (flows, base) = synthetic_inputs(44);
    let edits: CapEdits = [(Category::OnlineOtherDebit, 0.2)].into_iter().collect();
    let report = computed(estimate(&flows, &base, &edits).unwrap());

    let expected: BTreeSet<&str> = flows
        .iter()
        .flat_map(|f| [f.acquirer.as_str(), f.issuer.as_str()])
        .collect();
    let listed: Vec<&str> = report.market.rows.iter().map(|r| r.participant.as_str()).collect();
    let unique: BTreeSet<&str> = listed.iter().copied().collect();

    assert_eq!(listed.len(), unique.len(), "duplicate participant rows");
    assert_eq!(unique, expected);
}

#[test]
fn missing_cap_entry_is_a_data_integrity_error() {
    let flows = vec![
        flow(Category::PersonalCredit, "A", "B", 10.0, 0.01, 0.1, 1.0),
        flow(Category::International, "A", "B", 10.0, 0.01, 0.1, 1.0),
    ];
    let tiers = vec![CapTier {
        category: Category::PersonalCredit,
        cap_label: "Unregulated".into(),
        cap_percent: None,
    }];
    let base = build_cap_schedule(&tiers, &flows, &CalculatorConfig::default_test());
    let edits: CapEdits = [(Category::PersonalCredit, 1.0)].into_iter().collect();

    let err = estimate(&flows, &base, &edits).unwrap_err();
    assert!(
        matches!(err, IcfError::MissingCap { category: Category::International }),
        "unexpected error: {err}"
    );
}

#[test]
fn zero_value_category_yields_zero_rate() {
    let flows = vec![flow(Category::CommercialCredit, "A", "B", 0.0, 0.0, 0.0, 1.0)];
    let base = build_cap_schedule(&unregulated_everywhere(), &flows, &CalculatorConfig::default_test());

    for entry in base.entries() {
        assert_eq!(entry.historical_rate_percent, 0.0, "{}", entry.category);
    }
    let edits: CapEdits = [(Category::CommercialCredit, 0.5)].into_iter().collect();
    let report = computed(estimate(&flows, &base, &edits).unwrap());
    for row in &report.market.rows {
        assert_eq!(row.estimated_impact, 0.0);
        assert_eq!(row.direction, ImpactDirection::Unchanged);
    }
}

#[test]
fn impact_rows_serialize_with_period_column() {
    let flows = scenario_flows();
    let base = build_cap_schedule(&unregulated_everywhere(), &flows, &CalculatorConfig::default_test());
    let edits: CapEdits = [(Category::PersonalCredit, 1.0)].into_iter().collect();
    let report = computed(estimate(&flows, &base, &edits).unwrap());

    let json = serde_json::to_value(&report.market.rows[0]).unwrap();
    assert!(json.get("2023_net_position").is_some(), "got {json}");
    assert!(json.get("estimated_impact").is_some());
    assert!(json.get("estimated_net_position").is_some());
}
