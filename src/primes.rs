//! A deliberately naive prime counter, used as a CPU microbenchmark.
//!
//! Nothing here is clever on purpose: the point is to burn a predictable
//! amount of integer division so runs can be compared across machines.

use std::time::{Duration, Instant};

/// The first number the benchmark tests.
pub const FIRST_CANDIDATE: i64 = 5;

/// Trial division over every integer in `[2, n)`. Returns true iff none of
/// them divides `n`, so 0 and 1 count as prime here.
pub fn is_prime(n: i64) -> bool {
    (2..n).all(|d| n % d != 0)
}

/// How many of `FIRST_CANDIDATE..limit` pass [`is_prime`].
pub fn count_primes(limit: i64) -> usize {
    (FIRST_CANDIDATE..limit).filter(|&i| is_prime(i)).count()
}

/// Outcome of one timed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchReport {
    /// Primes found
    pub primes: usize,
    /// Wall time spent counting
    pub elapsed: Duration,
}

/// Time a single call to [`count_primes`].
pub fn run_benchmark(limit: i64) -> BenchReport {
    let start = Instant::now();
    let primes = count_primes(limit);
    BenchReport {
        primes,
        elapsed: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_division() {
        let primes: Vec<i64> = (2..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(!is_prime(91));
        assert!(is_prime(7919));
    }

    #[test]
    fn degenerate_inputs_have_no_divisors() {
        assert!(is_prime(0));
        assert!(is_prime(1));
        assert!(is_prime(-4));
    }

    #[test]
    fn counts_from_five() {
        assert_eq!(count_primes(10), 2);
        // 5, 7, 11, ..., 97
        assert_eq!(count_primes(100), 23);
        assert_eq!(count_primes(5), 0);
        assert_eq!(count_primes(6), 1);
        assert_eq!(count_primes(-3), 0);
    }

    #[test]
    fn benchmark_reports_count() {
        let report = run_benchmark(1000);
        // 168 primes below 1000, minus 2 and 3
        assert_eq!(report.primes, 166);
    }
}
