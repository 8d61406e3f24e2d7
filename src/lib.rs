//! Interbank Contagion Simulation Library
//!
//! This library simulates financial contagion in an interbank lending
//! network: it generates random networks under balance-sheet constraints and
//! propagates initial shocks through interbank exposures with the iterative
//! DebtRank algorithm.
//!
//! ## Modules
//!
//! - `config`: tunable constants and validated generation parameters
//! - `network`: random network generation (banks + liability matrix)
//! - `engine`: shock application and DebtRank propagation
//! - `report`: table/currency formatting for the report binaries
//!
//! ## Usage
//!
//! ```bash
//! # Generate a network and run all shock scenarios
//! cargo run --bin stress_test --release -- --banks 25 --seed 42
//!
//! # Dump a generated network as JSON
//! cargo run --bin generate --release -- --banks 10 --json
//! ```
//!
//! All randomness flows through an injected `rand::Rng`, so seeded runs
//! replay deterministically. The engine consumes snapshots by shared
//! reference and never mutates them.

pub mod config;
pub mod engine;
pub mod network;
pub mod report;

pub use config::{GeneratorConfig, GeneratorError};
pub use engine::{run_stress_test, BankOutcome, EngineError, ShockSpec, SimulationResult};
pub use network::{generate, Bank, NetworkSnapshot, StressLevel};
