//! Presentation helpers for the report binaries.
//!
//! Formatting lives here, outside the engine's contract. Displayed capital is
//! floored at zero; the numeric state used for computation never is.

use crate::engine::SimulationResult;
use crate::network::NetworkSnapshot;

/// Zero-decimal currency with comma grouping, floored at zero for display.
pub fn format_currency(value: f64) -> String {
    let whole = value.max(0.0).round() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("${grouped}")
}

pub fn print_network(snapshot: &NetworkSnapshot) {
    println!(
        "| {:3} | {:18} | {:>12} | {:>12} | {:>12} | {:>12} |",
        "ID", "Bank", "Assets", "Capital", "IB Liab", "IB Assets"
    );
    println!("|{}|{}|{}|{}|{}|{}|", "-".repeat(5), "-".repeat(20), "-".repeat(14), "-".repeat(14), "-".repeat(14), "-".repeat(14));
    for bank in &snapshot.banks {
        println!(
            "| {:3} | {:18} | {:>12} | {:>12} | {:>12} | {:>12} |",
            bank.id,
            bank.name,
            format_currency(bank.total_assets),
            format_currency(bank.initial_capital),
            format_currency(bank.interbank_liabilities),
            format_currency(bank.interbank_assets),
        );
    }
    println!();
    println!(
        "Total initial capital: {}",
        format_currency(snapshot.total_initial_capital)
    );
}

pub fn print_result(result: &SimulationResult) {
    println!(
        "| {:3} | {:18} | {:>12} | {:>9} | {:8} |",
        "ID", "Bank", "Capital", "DebtRank", "Status"
    );
    println!("|{}|{}|{}|{}|{}|", "-".repeat(5), "-".repeat(20), "-".repeat(14), "-".repeat(11), "-".repeat(10));
    for bank in &result.banks {
        println!(
            "| {:3} | {:18} | {:>12} | {:>9.4} | {:8} |",
            bank.id,
            bank.name,
            format_currency(bank.final_capital),
            bank.debt_rank,
            bank.stress_level.name(),
        );
    }
    println!();
    println!("  Failures:         {}", result.total_failures);
    println!("  Total loss:       {}", format_currency(result.total_loss));
    println!("  Contagion index:  {:.1}%", result.contagion_index);
    println!(
        "  Iterations:       {}{}",
        result.iterations,
        if result.converged { "" } else { " (not converged)" }
    );
}
