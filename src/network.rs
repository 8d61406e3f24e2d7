//! Interbank Network Generator
//!
//! Builds a population of banks with randomized balance sheets and a directed
//! weighted liability graph between them. Every random draw goes through the
//! injected `Rng`, so a seeded generator reproduces the same network.
//!
//! ## Balance Sheet Construction
//! 1. Total assets and capital ratio drawn uniformly per bank
//! 2. Capital `E0 = A * ratio`, liabilities `L = A - E0`
//! 3. A fraction of `L` is placed in the interbank market across 1-4 creditors
//! 4. Interbank assets fall out as column sums of the liability matrix
//!
//! The per-creditor shares are drawn independently and clamped so a debtor
//! never owes more than its declared interbank total. Under-assignment is
//! accepted: shares are not re-normalized to sum exactly.

use rand::prelude::*;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::config::{
    GeneratorConfig, GeneratorError, CREDITOR_SHARE_RANGE, INTERBANK_FRACTION_RANGE, MAX_CREDITORS,
};

/// Tri-state solvency classification derived from debt rank and capital sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StressLevel {
    Healthy,
    Stressed,
    Failed,
}

impl StressLevel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Stressed => "Stressed",
            Self::Failed => "Failed",
        }
    }
}

/// A single bank's balance sheet and stress state.
///
/// Invariant at creation: `total_assets = initial_capital + liabilities` and
/// `interbank_assets + external_assets = total_assets`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bank {
    pub id: usize,
    pub name: String,
    pub total_assets: f64,
    pub initial_capital: f64,
    pub current_capital: f64,
    pub liabilities: f64,
    pub interbank_liabilities: f64,
    pub interbank_assets: f64,
    pub external_assets: f64,
    pub is_failed: bool,
    pub stress_level: StressLevel,
    pub debt_rank: f64,
}

/// Immutable output of one generation run.
///
/// `adjacency[i][j]` is the liability bank `i` owes to bank `j` (debtor rows,
/// creditor columns). The diagonal is always zero. A new generation replaces
/// the snapshot wholesale; nothing mutates one in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub banks: Vec<Bank>,
    pub adjacency: Vec<Vec<f64>>,
    pub total_initial_capital: f64,
}

impl NetworkSnapshot {
    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }

    /// Liability owed by `debtor` to `creditor`.
    pub fn exposure(&self, debtor: usize, creditor: usize) -> f64 {
        self.adjacency[debtor][creditor]
    }
}

/// Generates a network snapshot from validated parameters.
///
/// Always succeeds for a valid config; the balance-sheet check on each drawn
/// bank guards against generator bugs, not against bad input.
pub fn generate(config: &GeneratorConfig, rng: &mut impl Rng) -> Result<NetworkSnapshot, GeneratorError> {
    config.validate()?;

    let n = config.bank_count;
    let names = assign_names(&config.name_pool, n, rng);

    let assets_dist = Uniform::new_inclusive(config.assets_range.0, config.assets_range.1);
    let ratio_dist = Uniform::new_inclusive(config.capital_ratio_range.0, config.capital_ratio_range.1);

    let mut banks = Vec::with_capacity(n);
    let mut total_initial_capital = 0.0;

    for (id, name) in names.into_iter().enumerate() {
        let total_assets = assets_dist.sample(rng);
        let capital_ratio = ratio_dist.sample(rng);
        let initial_capital = total_assets * capital_ratio;
        let liabilities = total_assets - initial_capital;

        if total_assets <= 0.0 || initial_capital <= 0.0 {
            return Err(GeneratorError::NegativeBalanceSheet {
                id,
                assets: total_assets,
                capital: initial_capital,
            });
        }

        total_initial_capital += initial_capital;

        banks.push(Bank {
            id,
            name,
            total_assets,
            initial_capital,
            current_capital: initial_capital,
            liabilities,
            interbank_liabilities: 0.0,
            interbank_assets: 0.0,
            external_assets: total_assets,
            is_failed: false,
            stress_level: StressLevel::Healthy,
            debt_rank: 0.0,
        });
    }

    let mut adjacency = vec![vec![0.0; n]; n];
    let fraction_dist = Uniform::new_inclusive(INTERBANK_FRACTION_RANGE.0, INTERBANK_FRACTION_RANGE.1);
    let share_dist = Uniform::new_inclusive(CREDITOR_SHARE_RANGE.0, CREDITOR_SHARE_RANGE.1);

    for debtor in 0..n {
        let interbank_liabilities = banks[debtor].liabilities * fraction_dist.sample(rng);
        banks[debtor].interbank_liabilities = interbank_liabilities;

        let num_creditors = rng.gen_range(1..=MAX_CREDITORS.min(n - 1));
        let others: Vec<usize> = (0..n).filter(|&j| j != debtor).collect();
        let creditors: Vec<usize> = others.choose_multiple(rng, num_creditors).copied().collect();

        // Shares are clamped against the remaining budget; any shortfall
        // stays unassigned rather than being topped up.
        let mut remaining = interbank_liabilities;
        for creditor in creditors {
            if remaining <= 0.0 {
                break;
            }
            let amount = (share_dist.sample(rng) * interbank_liabilities).min(remaining);
            adjacency[debtor][creditor] = amount;
            remaining -= amount;
        }
    }

    for bank in banks.iter_mut() {
        let interbank_assets: f64 = (0..n).map(|debtor| adjacency[debtor][bank.id]).sum();
        bank.interbank_assets = interbank_assets;
        bank.external_assets = bank.total_assets - interbank_assets;
    }

    Ok(NetworkSnapshot {
        banks,
        adjacency,
        total_initial_capital,
    })
}

/// Shuffles the name pool through the injected RNG and cycles with a numeric
/// suffix when the network is larger than the pool.
fn assign_names(pool: &[String], count: usize, rng: &mut impl Rng) -> Vec<String> {
    let mut shuffled: Vec<String> = pool.to_vec();
    shuffled.shuffle(rng);

    (0..count)
        .map(|i| {
            let base = &shuffled[i % shuffled.len()];
            if i < shuffled.len() {
                base.clone()
            } else {
                format!("{} {}", base, i / shuffled.len() + 1)
            }
        })
        .collect()
}
