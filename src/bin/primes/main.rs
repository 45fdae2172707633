//! Naive prime counting benchmark.

// Example:
// cargo run --release --bin primes -- 10000

use clap::Parser;
use log::debug;
use sonarbox::{args::PrimeArgs, primes::run_benchmark};

fn main() {
    env_logger::init();
    let args = PrimeArgs::parse();

    debug!("Counting primes below {}", args.prime_limit);
    let report = run_benchmark(args.prime_limit);

    println!("Running time = {}", report.elapsed.as_millis());
    println!("Number of primes found = {}", report.primes);
}
