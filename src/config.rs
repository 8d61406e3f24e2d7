//! Generation and propagation parameters.
//!
//! All tunable constants live here so the generator and engine share one
//! source of truth. `GeneratorConfig` is validated before any random draw;
//! invalid parameters never produce a partial network.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest total assets a bank can be created with (millions).
pub const ASSETS_MIN: f64 = 500.0;
/// Largest total assets a bank can be created with (millions).
pub const ASSETS_MAX: f64 = 2000.0;
/// Lower bound on initial capital / total assets.
pub const MIN_CAPITAL_RATIO: f64 = 0.05;
/// Upper bound on initial capital / total assets.
pub const MAX_CAPITAL_RATIO: f64 = 0.15;

/// Fraction of total liabilities placed in the interbank market, drawn
/// uniformly from this range per bank.
pub const INTERBANK_FRACTION_RANGE: (f64, f64) = (0.15, 0.30);
/// Maximum number of creditors a debtor spreads its interbank book over.
pub const MAX_CREDITORS: usize = 4;
/// Per-creditor share of `L_interbank`, drawn uniformly from this range and
/// clamped so the cumulative assignment never exceeds the declared total.
pub const CREDITOR_SHARE_RANGE: (f64, f64) = (0.1, 0.5);

/// Capital loss on external assets under a macroeconomic shock.
pub const MACRO_LOSS_FACTOR: f64 = 0.20;
/// Per-bank failure probability under an idiosyncratic shock.
pub const RANDOM_FAILURE_PROBABILITY: f64 = 0.10;
/// Capital loss (as a fraction of E0) for a bank hit by the idiosyncratic shock.
pub const RANDOM_SHOCK_LOSS: f64 = 0.80;

/// Safety valve on the DebtRank fixed-point iteration.
pub const MAX_ITERATIONS: usize = 100;
/// Convergence tolerance on the largest per-bank rank delta in one pass.
pub const DEBT_RANK_TOLERANCE: f64 = 1e-4;
/// A rank at or above this is treated as total loss of capital.
pub const FAILURE_RANK_THRESHOLD: f64 = 0.9999;
/// Post-propagation rank above which a surviving bank is classified Stressed.
pub const STRESSED_RANK_THRESHOLD: f64 = 0.4;
/// Post-shock (phase 1) rank at or above which a bank starts out Stressed.
pub const INITIAL_STRESSED_THRESHOLD: f64 = 0.5;

/// Invalid generation parameters, rejected before any randomization, plus the
/// defensive invariant check on freshly drawn balance sheets.
#[derive(Debug, Error, PartialEq)]
pub enum GeneratorError {
    #[error("network needs at least 2 banks, got {0}")]
    TooFewBanks(usize),
    #[error("name pool is empty")]
    EmptyNamePool,
    #[error("assets range is inverted or non-positive: [{0}, {1}]")]
    InvalidAssetsRange(f64, f64),
    #[error("capital ratio range is inverted or outside (0, 1): [{0}, {1}]")]
    InvalidCapitalRatioRange(f64, f64),
    #[error("bank {id} drew a negative balance sheet (assets {assets}, capital {capital})")]
    NegativeBalanceSheet { id: usize, assets: f64, capital: f64 },
}

/// Parameters for one network generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub bank_count: usize,
    pub assets_range: (f64, f64),
    pub capital_ratio_range: (f64, f64),
    pub name_pool: Vec<String>,
}

impl GeneratorConfig {
    pub fn new(bank_count: usize) -> Self {
        Self {
            bank_count,
            ..Self::default()
        }
    }

    /// Rejects invalid parameters before any random draw.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if self.bank_count < 2 {
            return Err(GeneratorError::TooFewBanks(self.bank_count));
        }
        if self.name_pool.is_empty() {
            return Err(GeneratorError::EmptyNamePool);
        }
        let (a_min, a_max) = self.assets_range;
        if !(a_min > 0.0 && a_min <= a_max) {
            return Err(GeneratorError::InvalidAssetsRange(a_min, a_max));
        }
        let (r_min, r_max) = self.capital_ratio_range;
        if !(r_min > 0.0 && r_min <= r_max && r_max < 1.0) {
            return Err(GeneratorError::InvalidCapitalRatioRange(r_min, r_max));
        }
        Ok(())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            bank_count: 20,
            assets_range: (ASSETS_MIN, ASSETS_MAX),
            capital_ratio_range: (MIN_CAPITAL_RATIO, MAX_CAPITAL_RATIO),
            name_pool: default_name_pool(),
        }
    }
}

/// Built-in bank names used when the host does not supply its own pool.
pub fn default_name_pool() -> Vec<String> {
    [
        "First National",
        "Meridian Trust",
        "Atlas Capital",
        "Harborview Bank",
        "Sterling & Co",
        "Northbridge",
        "Pacific Union",
        "Crestline Savings",
        "Vanguard Mutual",
        "Irongate Holdings",
        "Summit Federal",
        "Bluewater Credit",
        "Keystone Reserve",
        "Lakeshore Trust",
        "Pinnacle Bank",
        "Continental West",
        "Oakfield Savings",
        "Redstone Capital",
        "Silverman Bros",
        "Eastgate Financial",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
