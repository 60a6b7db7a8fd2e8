//! Lag-1 Granger causality scoring.
//!
//! For each direction the restricted model regresses the target on its own
//! first lag, the unrestricted model adds the driver's first lag, and the
//! ssr chi-square test turns the fit improvement into a p-value:
//!
//! statistic = nobs * (SSR_restricted - SSR_unrestricted) / SSR_unrestricted
//!
//! with one degree of freedom. The pair score is the sum of the two
//! directional p-values; lower means a stronger bidirectional predictive
//! relationship. Degenerate inputs yield NAN.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Minimum series length for a lag-1 regression with three parameters.
const MIN_OBSERVATIONS: usize = 5;

/// Sum of the two directional lag-1 Granger p-values for a pair.
pub fn granger_score(p1: &[f64], p2: &[f64]) -> f64 {
    granger_pvalue(p1, p2) + granger_pvalue(p2, p1)
}

/// P-value of the hypothesis that `driver` does NOT Granger-cause
/// `target` at lag 1. Small values mean the driver's lag improves the fit.
pub fn granger_pvalue(target: &[f64], driver: &[f64]) -> f64 {
    let n = target.len();
    if n < MIN_OBSERVATIONS || driver.len() != n {
        return f64::NAN;
    }

    let dep = &target[1..];
    let target_lag = &target[..n - 1];
    let driver_lag = &driver[..n - 1];
    let nobs = dep.len() as f64;

    let ssr_restricted = ols_ssr(dep, &[target_lag]);
    let ssr_unrestricted = ols_ssr(dep, &[target_lag, driver_lag]);

    let statistic = nobs * (ssr_restricted - ssr_unrestricted) / ssr_unrestricted;
    chi2_survival(statistic, 1.0)
}

/// Sum of squared residuals of an OLS fit with intercept. NAN when the
/// normal equations are singular or the data contains undefined values.
fn ols_ssr(dep: &[f64], regressors: &[&[f64]]) -> f64 {
    let n = dep.len();
    let k = regressors.len() + 1;

    // Normal equations X'X b = X'y with the intercept as column zero.
    let mut xtx = vec![vec![0.0f64; k]; k];
    let mut xty = vec![0.0f64; k];
    for row in 0..n {
        let mut x = Vec::with_capacity(k);
        x.push(1.0);
        for reg in regressors {
            x.push(reg[row]);
        }
        for i in 0..k {
            xty[i] += x[i] * dep[row];
            for j in 0..k {
                xtx[i][j] += x[i] * x[j];
            }
        }
    }

    let Some(coefs) = solve_symmetric(&mut xtx, &mut xty) else {
        return f64::NAN;
    };

    let mut ssr = 0.0;
    for row in 0..n {
        let mut predicted = coefs[0];
        for (j, reg) in regressors.iter().enumerate() {
            predicted += coefs[j + 1] * reg[row];
        }
        let residual = dep[row] - predicted;
        ssr += residual * residual;
    }
    ssr
}

/// Gaussian elimination with partial pivoting on the k x k system built by
/// `ols_ssr`. Returns None when a pivot vanishes.
fn solve_symmetric(matrix: &mut [Vec<f64>], rhs: &mut [f64]) -> Option<Vec<f64>> {
    let k = rhs.len();
    for col in 0..k {
        let pivot_row = (col..k)
            .max_by(|&a, &b| {
                matrix[a][col]
                    .abs()
                    .partial_cmp(&matrix[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if !(matrix[pivot_row][col].abs() > f64::EPSILON) {
            return None;
        }
        matrix.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        for row in (col + 1)..k {
            let factor = matrix[row][col] / matrix[col][col];
            for j in col..k {
                matrix[row][j] -= factor * matrix[col][j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0f64; k];
    for col in (0..k).rev() {
        let mut value = rhs[col];
        for j in (col + 1)..k {
            value -= matrix[col][j] * solution[j];
        }
        solution[col] = value / matrix[col][col];
    }
    Some(solution)
}

fn chi2_survival(statistic: f64, df: f64) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }
    if statistic == f64::INFINITY {
        return 0.0;
    }
    if statistic <= 0.0 {
        return 1.0;
    }
    match ChiSquared::new(df) {
        Ok(dist) => 1.0 - dist.cdf(statistic),
        Err(_) => f64::NAN,
    }
}
