//! Welch's t-test over two RTT samples.
//!
//! Finite-sample statistics follow the reference's `nan_policy='omit'`:
//! `+inf` entries are dropped before computing means/variances/degrees of
//! freedom. If fewer than two finite samples remain in either group, the
//! comparison is undefined and policy (spec.md §7) is to report `p = 1.0`
//! (indistinguishable), logged as a warning.

use statrs::distribution::{ContinuousCDF, StudentsT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternative {
    /// `a != b`, used everywhere except the field-presence probe.
    TwoSided,
    /// `a > b`, used by the field-presence probe (spec.md §4.3).
    Greater,
}

use crate::packet::Rtt;

fn finite_secs(samples: &[Rtt]) -> Vec<f64> {
    samples.iter().filter(|r| r.is_finite()).map(|r| r.as_secs_f64()).collect()
}

fn mean_var(xs: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

fn welch_df(var_a: f64, n_a: f64, var_b: f64, n_b: f64) -> f64 {
    let num = (var_a / n_a + var_b / n_b).powi(2);
    let den = (var_a / n_a).powi(2) / (n_a - 1.0) + (var_b / n_b).powi(2) / (n_b - 1.0);
    if den <= 0.0 {
        1.0
    } else {
        num / den
    }
}

/// Welch's two-sample t-test. `a`/`b` are raw RTT samples (including any
/// `Rtt::Infinite` entries, which are filtered out here).
pub fn welch_t_test(a: &[Rtt], b: &[Rtt], alt: Alternative) -> f64 {
    let a = finite_secs(a);
    let b = finite_secs(b);

    if a.len() < 2 || b.len() < 2 {
        log::warn!(
            "degenerate RTT sample ({} vs {} finite values); treating p=1.0",
            a.len(),
            b.len()
        );
        return 1.0;
    }

    let (mean_a, var_a) = mean_var(&a);
    let (mean_b, var_b) = mean_var(&b);
    let n_a = a.len() as f64;
    let n_b = b.len() as f64;

    let se2 = var_a / n_a + var_b / n_b;
    if se2 <= 0.0 {
        return 1.0;
    }
    let t = (mean_a - mean_b) / se2.sqrt();
    let df = welch_df(var_a, n_a, var_b, n_b);

    let dist = match StudentsT::new(0.0, 1.0, df) {
        Ok(d) => d,
        Err(_) => return 1.0,
    };

    let p = match alt {
        Alternative::TwoSided => 2.0 * (1.0 - dist.cdf(t.abs())),
        Alternative::Greater => 1.0 - dist.cdf(t),
    };
    p.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn finite(secs: &[f64]) -> Vec<Rtt> {
        secs.iter().map(|s| Rtt::Finite(Duration::from_secs_f64(*s))).collect()
    }

    #[test]
    fn identical_samples_are_indistinguishable() {
        let a = finite(&[0.01, 0.011, 0.0105, 0.0098, 0.0102]);
        let b = a.clone();
        let p = welch_t_test(&a, &b, Alternative::TwoSided);
        assert!(p > 0.9, "p = {p}");
    }

    #[test]
    fn clearly_shifted_samples_are_distinguishable() {
        let a = finite(&[0.001, 0.0012, 0.0009, 0.0011, 0.0010]);
        let b = finite(&[0.050, 0.052, 0.049, 0.051, 0.048]);
        let p = welch_t_test(&a, &b, Alternative::TwoSided);
        assert!(p < 0.05, "p = {p}");
    }

    #[test]
    fn all_infinite_batches_are_degenerate() {
        let a = vec![Rtt::Infinite; 5];
        let b = vec![Rtt::Infinite; 5];
        assert_eq!(welch_t_test(&a, &b, Alternative::TwoSided), 1.0);
    }

    #[test]
    fn greater_alternative_detects_directional_shift() {
        let a = finite(&[0.050, 0.052, 0.049, 0.051, 0.048]);
        let b = finite(&[0.001, 0.0012, 0.0009, 0.0011, 0.0010]);
        let p = welch_t_test(&a, &b, Alternative::Greater);
        assert!(p < 0.05, "p = {p}");
    }
}
