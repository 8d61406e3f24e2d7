//! Network Generation Binary
//!
//! Generates a random interbank network and prints it as a table or JSON.
//! The JSON form is the snapshot a host would hand to the engine later.
//!
//! ## Usage
//! ```bash
//! cargo run --bin generate --release -- --banks 10 --seed 7 --json
//! ```

use clap::Parser;
use contagion_simulation::report::print_network;
use contagion_simulation::{generate, GeneratorConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Generate a random interbank network")]
struct Args {
    /// Number of banks in the network
    #[arg(long, default_value_t = 25)]
    banks: usize,

    /// RNG seed for deterministic replay; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Emit the snapshot as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let snapshot = generate(&GeneratorConfig::new(args.banks), &mut rng)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("Interbank network ({} banks, seed {})", args.banks, seed);
        println!();
        print_network(&snapshot);
    }

    Ok(())
}
