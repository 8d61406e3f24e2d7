//! Contagion Engine
//!
//! Applies an initial shock to a network snapshot and iterates the DebtRank
//! propagation rule to a fixed point, producing final capital, failure status
//! and a systemic-risk score per bank.
//!
//! ## Shock Phase
//! Macroeconomic (haircut on external assets), targeted (one bank forced
//! insolvent) or idiosyncratic (independent random capital hits). Capital at
//! or below zero means failure; otherwise the initial rank is the fraction of
//! capital already lost.
//!
//! ## Propagation Phase
//! Each pass pushes the latest rank *increase* of every debtor to its
//! creditors, weighted by the creditor's share of the debtor's interbank
//! book. Ranks are monotonically non-decreasing and capped at 1.0. The loop
//! stops when the largest per-bank delta falls below tolerance, or after
//! `MAX_ITERATIONS` passes; hitting the cap still yields a result, flagged
//! as un-converged.
//!
//! The engine never mutates the snapshot. Every run re-initializes working
//! state from each bank's initial capital, so repeated runs are independent.

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{
    DEBT_RANK_TOLERANCE, FAILURE_RANK_THRESHOLD, INITIAL_STRESSED_THRESHOLD, MACRO_LOSS_FACTOR,
    MAX_ITERATIONS, RANDOM_FAILURE_PROBABILITY, RANDOM_SHOCK_LOSS, STRESSED_RANK_THRESHOLD,
};
use crate::network::{NetworkSnapshot, StressLevel};

/// The initial shock applied in phase 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ShockSpec {
    /// Every bank loses `MACRO_LOSS_FACTOR` of its external assets.
    Macro,
    /// The designated bank is forced insolvent; others are untouched.
    Targeted(usize),
    /// Each bank independently takes an 80% capital hit with probability 0.10.
    Idiosyncratic,
}

impl ShockSpec {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Macro => "Macroeconomic",
            Self::Targeted(_) => "Targeted",
            Self::Idiosyncratic => "Idiosyncratic",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("targeted bank {id} does not exist in a network of {bank_count} banks")]
    TargetOutOfRange { id: usize, bank_count: usize },
}

/// Final per-bank state after shock and propagation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BankOutcome {
    pub id: usize,
    pub name: String,
    pub final_capital: f64,
    pub debt_rank: f64,
    pub stress_level: StressLevel,
    pub is_failed: bool,
}

/// Output of one stress-test run. Derived fresh on every run, never merged
/// with a previous result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationResult {
    pub shock: ShockSpec,
    pub banks: Vec<BankOutcome>,
    pub total_failures: usize,
    /// System-wide initial capital destroyed, floored per bank at zero.
    pub total_loss: f64,
    /// `total_loss` as a percentage of total initial capital.
    pub contagion_index: f64,
    /// Propagation passes executed.
    pub iterations: usize,
    /// False when the iteration cap fired before reaching tolerance.
    pub converged: bool,
}

/// Working state, re-initialized from the snapshot at the start of every run.
struct WorkingBank {
    initial_capital: f64,
    capital: f64,
    debt_rank: f64,
    is_failed: bool,
    stress_level: StressLevel,
}

/// Runs one shock scenario against the snapshot.
///
/// The snapshot is read-only; all bookkeeping happens on a working copy
/// seeded from each bank's initial capital.
pub fn run_stress_test(
    snapshot: &NetworkSnapshot,
    shock: ShockSpec,
    rng: &mut impl Rng,
) -> Result<SimulationResult, EngineError> {
    let n = snapshot.bank_count();
    if let ShockSpec::Targeted(id) = shock {
        if id >= n {
            return Err(EngineError::TargetOutOfRange { id, bank_count: n });
        }
    }

    let mut state: Vec<WorkingBank> = snapshot
        .banks
        .iter()
        .map(|b| WorkingBank {
            initial_capital: b.initial_capital,
            capital: b.initial_capital,
            debt_rank: 0.0,
            is_failed: false,
            stress_level: StressLevel::Healthy,
        })
        .collect();

    apply_shock(&mut state, snapshot, shock, rng);

    let interbank_liabilities: Vec<f64> = snapshot
        .banks
        .iter()
        .map(|b| b.interbank_liabilities)
        .collect();

    // Ranks before the shock are all zero, so the initial loss itself
    // propagates on the first pass.
    let mut previous = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < MAX_ITERATIONS {
        let current: Vec<f64> = state.iter().map(|b| b.debt_rank).collect();
        let mut ranks = current.clone();

        let max_delta = propagation_pass(
            &snapshot.adjacency,
            &interbank_liabilities,
            &mut ranks,
            &current,
            &previous,
        );

        for (bank, &rank) in state.iter_mut().zip(&ranks) {
            bank.debt_rank = rank;
        }
        reclassify(&mut state);
        iterations += 1;
        debug!(pass = iterations, max_delta, "propagation pass");

        if max_delta < DEBT_RANK_TOLERANCE {
            converged = true;
            break;
        }
        previous = current;
    }

    info!(iterations, converged, "stress test finished");

    let banks: Vec<BankOutcome> = snapshot
        .banks
        .iter()
        .zip(&state)
        .map(|(bank, s)| BankOutcome {
            id: bank.id,
            name: bank.name.clone(),
            final_capital: s.capital,
            debt_rank: s.debt_rank,
            stress_level: s.stress_level,
            is_failed: s.is_failed,
        })
        .collect();

    let total_failures = state.iter().filter(|b| b.is_failed).count();
    let surviving_capital: f64 = state.iter().map(|b| b.capital.max(0.0)).sum();
    let total_loss = snapshot.total_initial_capital - surviving_capital;
    let contagion_index = total_loss / snapshot.total_initial_capital * 100.0;

    Ok(SimulationResult {
        shock,
        banks,
        total_failures,
        total_loss,
        contagion_index,
        iterations,
        converged,
    })
}

/// Phase 1: apply the initial capital hit and classify each bank.
fn apply_shock(
    state: &mut [WorkingBank],
    snapshot: &NetworkSnapshot,
    shock: ShockSpec,
    rng: &mut impl Rng,
) {
    match shock {
        ShockSpec::Macro => {
            for (bank, info) in state.iter_mut().zip(&snapshot.banks) {
                bank.capital -= info.external_assets * MACRO_LOSS_FACTOR;
            }
        }
        ShockSpec::Targeted(id) => {
            // Negative sentinel guarantees failure in classification below.
            state[id].capital = -1.0;
        }
        ShockSpec::Idiosyncratic => {
            for bank in state.iter_mut() {
                if rng.gen::<f64>() < RANDOM_FAILURE_PROBABILITY {
                    bank.capital -= bank.initial_capital * RANDOM_SHOCK_LOSS;
                }
            }
        }
    }

    for bank in state.iter_mut() {
        if bank.capital <= 0.0 {
            bank.is_failed = true;
            bank.debt_rank = 1.0;
            bank.capital = 0.0;
            bank.stress_level = StressLevel::Failed;
        } else {
            bank.debt_rank = (1.0 - bank.capital / bank.initial_capital).clamp(0.0, 1.0);
            bank.stress_level = if bank.debt_rank >= INITIAL_STRESSED_THRESHOLD {
                StressLevel::Stressed
            } else {
                StressLevel::Healthy
            };
        }
    }
}

/// One DebtRank pass: pushes each debtor's rank increase since the last pass
/// to its creditors. Returns the largest per-bank rank delta.
///
/// Debtors with a zero interbank book are excluded from the sum rather than
/// producing an undefined weight. Updated ranks are clamped to
/// `[old rank, 1.0]`, so ranks never decrease.
pub(crate) fn propagation_pass(
    adjacency: &[Vec<f64>],
    interbank_liabilities: &[f64],
    ranks: &mut [f64],
    current: &[f64],
    previous: &[f64],
) -> f64 {
    let n = ranks.len();
    let mut max_delta: f64 = 0.0;

    for creditor in 0..n {
        if ranks[creditor] >= 1.0 {
            continue;
        }

        let mut propagated = 0.0;
        for debtor in 0..n {
            let exposure = adjacency[debtor][creditor];
            if exposure > 0.0 && interbank_liabilities[debtor] > 0.0 {
                propagated +=
                    exposure / interbank_liabilities[debtor] * (current[debtor] - previous[debtor]);
            }
        }

        let old = ranks[creditor];
        let new = (old + (1.0 - old) * propagated).clamp(old, 1.0);
        max_delta = max_delta.max(new - old);
        ranks[creditor] = new;
    }

    max_delta
}

/// Recomputes capital from the updated ranks and reclassifies each bank.
fn reclassify(state: &mut [WorkingBank]) {
    for bank in state.iter_mut() {
        if bank.is_failed {
            continue;
        }
        let capital = bank.initial_capital * (1.0 - bank.debt_rank);
        if capital <= 0.0 || bank.debt_rank >= FAILURE_RANK_THRESHOLD {
            bank.is_failed = true;
            bank.debt_rank = 1.0;
            bank.capital = 0.0;
            bank.stress_level = StressLevel::Failed;
        } else {
            bank.capital = capital;
            bank.stress_level = if bank.debt_rank > STRESSED_RANK_THRESHOLD {
                StressLevel::Stressed
            } else {
                StressLevel::Healthy
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::network::{generate, Bank};
    use proptest::prelude::*;
    use rand_chacha::ChaCha8Rng;

    /// Builds a snapshot from (total_assets, initial_capital,
    /// interbank_liabilities) triples and an explicit adjacency matrix.
    fn test_snapshot(sheets: &[(f64, f64, f64)], adjacency: Vec<Vec<f64>>) -> NetworkSnapshot {
        let n = sheets.len();
        let mut total_initial_capital = 0.0;

        let banks: Vec<Bank> = sheets
            .iter()
            .enumerate()
            .map(|(id, &(total_assets, initial_capital, interbank_liabilities))| {
                total_initial_capital += initial_capital;
                let interbank_assets: f64 = (0..n).map(|debtor| adjacency[debtor][id]).sum();
                Bank {
                    id,
                    name: format!("Bank {id}"),
                    total_assets,
                    initial_capital,
                    current_capital: initial_capital,
                    liabilities: total_assets - initial_capital,
                    interbank_liabilities,
                    interbank_assets,
                    external_assets: total_assets - interbank_assets,
                    is_failed: false,
                    stress_level: StressLevel::Healthy,
                    debt_rank: 0.0,
                }
            })
            .collect();

        NetworkSnapshot {
            banks,
            adjacency,
            total_initial_capital,
        }
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(99)
    }

    #[test]
    fn test_targeted_shock_propagates_to_sole_creditor() {
        // Bank 0's entire liability book is interbank and owed to bank 1.
        let mut adjacency = vec![vec![0.0; 5]; 5];
        adjacency[0][1] = 850.0;
        let sheets = [
            (1000.0, 150.0, 850.0),
            (1000.0, 150.0, 0.0),
            (1000.0, 150.0, 0.0),
            (1000.0, 150.0, 0.0),
            (1000.0, 150.0, 0.0),
        ];
        let snapshot = test_snapshot(&sheets, adjacency);

        let result = run_stress_test(&snapshot, ShockSpec::Targeted(0), &mut rng()).unwrap();

        let bank0 = &result.banks[0];
        assert!(bank0.is_failed);
        assert_eq!(bank0.debt_rank, 1.0);
        assert_eq!(bank0.final_capital, 0.0);

        assert!(result.banks[1].debt_rank > 0.0, "creditor must absorb a loss");
        for id in 2..5 {
            assert_eq!(result.banks[id].debt_rank, 0.0);
            assert!(!result.banks[id].is_failed);
        }
    }

    #[test]
    fn test_first_pass_delta_for_sole_creditor() {
        // With bank 0 fully failed and owing 100% of its book to bank 1,
        // pass 1 must lift bank 1's rank by exactly (1 - h1) * 1.0 * h0.
        let adjacency = vec![vec![0.0, 850.0], vec![0.0, 0.0]];
        let interbank_liabilities = [850.0, 0.0];
        let current = [1.0, 0.0];
        let previous = [0.0, 0.0];
        let mut ranks = [1.0, 0.0];

        let max_delta = propagation_pass(
            &adjacency,
            &interbank_liabilities,
            &mut ranks,
            &current,
            &previous,
        );

        assert!((ranks[1] - 1.0).abs() < 1e-12);
        assert!((max_delta - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_macro_shock_wipes_out_thin_capital() {
        // A_ext = 1000, E0 = 150: the 20% external haircut is 200, so the
        // bank is insolvent before any propagation.
        let adjacency = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let sheets = [(1000.0, 150.0, 0.0), (1000.0, 300.0, 0.0)];
        let snapshot = test_snapshot(&sheets, adjacency);

        let result = run_stress_test(&snapshot, ShockSpec::Macro, &mut rng()).unwrap();

        assert!(result.banks[0].is_failed);
        assert_eq!(result.banks[0].debt_rank, 1.0);
        assert_eq!(result.banks[0].final_capital, 0.0);

        // Bank 1 loses 200 of 300 but survives, stressed.
        assert!(!result.banks[1].is_failed);
        assert!((result.banks[1].final_capital - 100.0).abs() < 1e-9);
        assert_eq!(result.banks[1].stress_level, StressLevel::Stressed);
    }

    #[test]
    fn test_ranks_monotone_across_passes() {
        let mut generation_rng = rng();
        let snapshot = generate(&GeneratorConfig::new(12), &mut generation_rng).unwrap();
        let interbank_liabilities: Vec<f64> = snapshot
            .banks
            .iter()
            .map(|b| b.interbank_liabilities)
            .collect();

        // Seed ranks as if bank 0 had failed outright.
        let n = snapshot.bank_count();
        let mut ranks = vec![0.0; n];
        ranks[0] = 1.0;
        let mut previous = vec![0.0; n];

        for _ in 0..MAX_ITERATIONS {
            let current = ranks.clone();
            let before = ranks.clone();
            let max_delta = propagation_pass(
                &snapshot.adjacency,
                &interbank_liabilities,
                &mut ranks,
                &current,
                &previous,
            );
            for (new, old) in ranks.iter().zip(&before) {
                assert!(new >= old, "rank decreased: {new} < {old}");
                assert!(*new <= 1.0);
            }
            if max_delta < DEBT_RANK_TOLERANCE {
                break;
            }
            previous = current;
        }
    }

    #[test]
    fn test_converged_result_is_a_fixed_point() {
        let mut generation_rng = rng();
        let snapshot = generate(&GeneratorConfig::new(20), &mut generation_rng).unwrap();
        let result = run_stress_test(&snapshot, ShockSpec::Macro, &mut rng()).unwrap();
        assert!(result.converged);

        let final_ranks: Vec<f64> = result.banks.iter().map(|b| b.debt_rank).collect();
        let interbank_liabilities: Vec<f64> = snapshot
            .banks
            .iter()
            .map(|b| b.interbank_liabilities)
            .collect();

        // Feeding the fixed point back with no further rank movement must
        // change nothing beyond tolerance.
        let mut ranks = final_ranks.clone();
        let max_delta = propagation_pass(
            &snapshot.adjacency,
            &interbank_liabilities,
            &mut ranks,
            &final_ranks,
            &final_ranks,
        );
        assert!(max_delta < DEBT_RANK_TOLERANCE);
    }

    #[test]
    fn test_fully_connected_network_terminates() {
        // Dense uniform exposures: worst case for the iteration cap.
        let n = 8;
        let weight = 100.0;
        let adjacency: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 0.0 } else { weight }).collect())
            .collect();
        let row_total = weight * (n - 1) as f64;
        let sheets: Vec<(f64, f64, f64)> =
            (0..n).map(|_| (10_000.0, 900.0, row_total)).collect();
        let snapshot = test_snapshot(&sheets, adjacency);

        let result = run_stress_test(&snapshot, ShockSpec::Targeted(0), &mut rng()).unwrap();
        assert!(result.iterations <= MAX_ITERATIONS);
        assert!(result.total_failures >= 1);
    }

    #[test]
    fn test_targeted_out_of_range_rejected() {
        let mut generation_rng = rng();
        let snapshot = generate(&GeneratorConfig::new(5), &mut generation_rng).unwrap();
        let err = run_stress_test(&snapshot, ShockSpec::Targeted(5), &mut rng()).unwrap_err();
        assert_eq!(
            err,
            EngineError::TargetOutOfRange {
                id: 5,
                bank_count: 5
            }
        );
    }

    #[test]
    fn test_snapshot_untouched_and_runs_independent() {
        let mut generation_rng = rng();
        let snapshot = generate(&GeneratorConfig::new(10), &mut generation_rng).unwrap();
        let before = snapshot.clone();

        let first = run_stress_test(&snapshot, ShockSpec::Macro, &mut rng()).unwrap();
        let second = run_stress_test(&snapshot, ShockSpec::Macro, &mut rng()).unwrap();

        assert_eq!(snapshot.adjacency, before.adjacency);
        for (a, b) in snapshot.banks.iter().zip(&before.banks) {
            assert_eq!(a.current_capital, b.current_capital);
            assert_eq!(a.debt_rank, b.debt_rank);
        }
        // Macro shocks draw nothing from the RNG, so reruns are identical.
        for (a, b) in first.banks.iter().zip(&second.banks) {
            assert_eq!(a.debt_rank, b.debt_rank);
            assert_eq!(a.final_capital, b.final_capital);
        }
    }

    proptest! {
        #[test]
        fn prop_failed_banks_have_full_rank_and_zero_capital(
            bank_count in 2usize..30,
            seed in any::<u64>(),
        ) {
            let mut generation_rng = ChaCha8Rng::seed_from_u64(seed);
            let snapshot = generate(&GeneratorConfig::new(bank_count), &mut generation_rng).unwrap();

            let mut shock_rng = ChaCha8Rng::seed_from_u64(seed ^ 0xdead_beef);
            for shock in [ShockSpec::Macro, ShockSpec::Targeted(0), ShockSpec::Idiosyncratic] {
                let result = run_stress_test(&snapshot, shock, &mut shock_rng).unwrap();

                prop_assert_eq!(result.banks.len(), bank_count);
                prop_assert!(result.total_loss >= -1e-9);
                prop_assert!(result.contagion_index <= 100.0 + 1e-9);

                for bank in &result.banks {
                    prop_assert!((0.0..=1.0).contains(&bank.debt_rank));
                    if bank.debt_rank == 1.0 {
                        prop_assert!(bank.is_failed);
                        prop_assert_eq!(bank.final_capital, 0.0);
                    }
                    if bank.is_failed {
                        prop_assert_eq!(bank.stress_level, StressLevel::Failed);
                    }
                }
            }
        }
    }
}
