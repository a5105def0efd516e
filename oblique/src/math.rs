//! Special functions used by the variational-Bayes update and the length
//! model.

/// Computes the digamma function ψ(x) for positive `x`.
///
/// Small arguments are shifted above 7 with the recurrence
/// ψ(x) = ψ(x + 1) − 1/x, after which the asymptotic series converges to
/// double precision.
pub fn digamma(x: f64) -> f64 {
    debug_assert!(x > 0.0);
    let mut x = x;
    let mut result = 0.0;
    while x < 7.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    x -= 1.0 / 2.0;
    let xx = 1.0 / x;
    let xx2 = xx * xx;
    let xx4 = xx2 * xx2;
    result += x.ln() + (1.0 / 24.0) * xx2 - 7.0 / 960.0 * xx4 + (31.0 / 8064.0) * xx4 * xx2
        - (127.0 / 30720.0) * xx4 * xx4;
    result
}

/// Computes ln Γ(x) for positive `x`.
///
/// Arguments below 10 are shifted up with ln Γ(x) = ln Γ(x + 1) − ln x,
/// then the Stirling series is applied.
pub fn ln_gamma(x: f64) -> f64 {
    debug_assert!(x > 0.0);
    let mut x = x;
    let mut result = 0.0;
    while x < 10.0 {
        result -= x.ln();
        x += 1.0;
    }
    let xx = 1.0 / x;
    let xx2 = xx * xx;
    result
        + (x - 0.5) * x.ln()
        - x
        + 0.5 * (2.0 * std::f64::consts::PI).ln()
        + xx * (1.0 / 12.0 + xx2 * (-1.0 / 360.0 + xx2 * (1.0 / 1260.0 - xx2 / 1680.0)))
}

/// Computes the log-probability of `k` under a Poisson with mean `lambda`.
pub fn log_poisson(k: usize, lambda: f64) -> f64 {
    debug_assert!(lambda > 0.0);
    let k = k as f64;
    k * lambda.ln() - lambda - ln_gamma(k + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

    #[test]
    fn test_digamma_one() {
        assert!((digamma(1.0) + EULER_MASCHERONI).abs() < 1e-10);
    }

    #[test]
    fn test_digamma_half() {
        let expected = -EULER_MASCHERONI - 2.0 * 2f64.ln();
        assert!((digamma(0.5) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_digamma_recurrence() {
        // ψ(x + 1) = ψ(x) + 1/x
        for &x in &[0.3, 1.7, 5.0, 42.0] {
            assert!((digamma(x + 1.0) - digamma(x) - 1.0 / x).abs() < 1e-10);
        }
    }

    #[test]
    fn test_ln_gamma_factorials() {
        // Γ(n + 1) = n!
        let mut ln_fact = 0f64;
        for n in 1..20 {
            ln_fact += (n as f64).ln();
            assert!((ln_gamma(n as f64 + 1.0) - ln_fact).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ln_gamma_half() {
        // Γ(1/2) = sqrt(π)
        let expected = 0.5 * std::f64::consts::PI.ln();
        assert!((ln_gamma(0.5) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_log_poisson() {
        // P(2; 3) = 9 e^{-3} / 2
        let expected = (9.0 / 2.0f64).ln() - 3.0;
        assert!((log_poisson(2, 3.0) - expected).abs() < 1e-12);
    }
}
