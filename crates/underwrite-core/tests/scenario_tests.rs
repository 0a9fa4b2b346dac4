use chrono::NaiveDate;
use underwrite_core::scenarios::scenario::{
    analyze_scenarios, run_standard_scenarios, ScenarioRequest,
};
use underwrite_core::underwriting::assumptions::{
    AcquisitionCosts, ExitAssumptions, FinancingAssumptions, RentalAssumptions, UnderwritingInputs,
};
use underwrite_core::underwriting::engine::UnderwritingEngine;

fn amortizing_deal() -> UnderwritingInputs {
    UnderwritingInputs::new(
        320_000.0,
        AcquisitionCosts::default(),
        RentalAssumptions::new(2_100.0, 0.025, 0.04, 0.28).unwrap(),
        FinancingAssumptions::new(0.65, 0.055, true, 25, 0.01).unwrap(),
        ExitAssumptions::new(5, 0.055, None, 0.02).unwrap(),
        0.08,
        0.12,
    )
    .unwrap()
}

fn start() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, 3, 1)
}

#[test]
fn test_nine_rows_in_fixed_order() {
    let rows = run_standard_scenarios(&amortizing_deal(), &UnderwritingEngine::new(), start())
        .unwrap();
    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        [
            "Rate shock +50bp",
            "Rate shock +100bp",
            "Rate shock +200bp",
            "Rent compression -5%",
            "Rent compression -10%",
            "Rent compression -15%",
            "Exit yield expansion +25bp",
            "Exit yield expansion +50bp",
            "Exit yield expansion +100bp",
        ]
    );
}

#[test]
fn test_every_stress_lowers_npv_and_irr() {
    let rows = run_standard_scenarios(&amortizing_deal(), &UnderwritingEngine::new(), start())
        .unwrap();
    for row in &rows {
        assert!(row.npv_delta.unwrap() < 0.0, "{}: {:?}", row.label, row.npv_delta);
        assert!(row.irr_delta.unwrap() < 0.0, "{}: {:?}", row.label, row.irr_delta);
    }
}

#[test]
fn test_deltas_are_against_the_base_run() {
    let inputs = amortizing_deal();
    let engine = UnderwritingEngine::new();
    let base = engine.run(&inputs, start()).unwrap().metrics;
    let rows = run_standard_scenarios(&inputs, &engine, start()).unwrap();
    for row in &rows {
        let expected = row.npv.unwrap() - base.npv.unwrap();
        assert!((row.npv_delta.unwrap() - expected).abs() < 1e-9);
    }
}

#[test]
fn test_analyze_scenarios_base_matches_engine() {
    let inputs = amortizing_deal();
    let out = analyze_scenarios(&ScenarioRequest {
        inputs: inputs.clone(),
        start_date: start(),
    })
    .unwrap();
    let base = UnderwritingEngine::new().run(&inputs, start()).unwrap().metrics;
    assert_eq!(out.result.base, base);
    assert_eq!(out.result.scenarios.len(), 9);
}
