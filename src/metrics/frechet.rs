use ndarray::{Array1, Array2, Axis};

use crate::{DataError, Result};

const MAX_SWEEPS: usize = 64;

/// Mean and covariance of a feature distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStats {
    pub mu: Array1<f64>,
    pub sigma: Array2<f64>,
}

impl FeatureStats {
    /// `features` holds one sample per row. The covariance is unbiased.
    pub fn from_features(features: &Array2<f64>) -> Result<Self> {
        let n = features.nrows();
        if n < 2 {
            return Err(DataError::Metric(format!("need at least 2 samples for a covariance, got {}", n)));
        }
        let mu = features
            .mean_axis(Axis(0))
            .ok_or_else(|| DataError::Metric("empty feature matrix".into()))?;
        let centered = features - &mu;
        let sigma = centered.t().dot(&centered) / (n - 1) as f64;
        Ok(Self { mu, sigma })
    }

    pub fn dim(&self) -> usize {
        self.mu.len()
    }
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
/// Returns eigenvalues and the matrix whose columns are the eigenvectors.
pub fn symmetric_eigen(m: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let n = m.nrows();
    if n != m.ncols() {
        return Err(DataError::Metric(format!("matrix is not square: {:?}", m.shape())));
    }
    let mut a = m.clone();
    let mut v = Array2::<f64>::eye(n);
    let scale = a.iter().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);

    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| (0..n).filter(move |q| *q != p).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum();
        if off <= 1e-24 * scale {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                let apq = a[[p, q]];
                if apq == 0. {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2. * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.).sqrt());
                let c = 1. / (t * t + 1.).sqrt();
                let s = t * c;
                for k in 0..n {
                    let (akp, akq) = (a[[k, p]], a[[k, q]]);
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[[p, k]], a[[q, k]]);
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }
    Ok((a.diag().to_owned(), v))
}

/// Principal square root of a symmetric positive semi-definite matrix.
/// Slightly negative eigenvalues from rounding are treated as zero.
pub fn sqrtm_psd(m: &Array2<f64>) -> Result<Array2<f64>> {
    let (values, vectors) = symmetric_eigen(m)?;
    let roots = values.mapv(|x| x.max(0.).sqrt());
    let scaled = &vectors * &roots;
    Ok(scaled.dot(&vectors.t()))
}

/// `Tr(sqrtm(s1 · s2))` for covariance matrices, computed as the trace of
/// `sqrtm(√s1 · s2 · √s1)`, which has the same eigenvalues and stays symmetric.
pub fn trace_sqrt_product(s1: &Array2<f64>, s2: &Array2<f64>) -> Result<f64> {
    let r = sqrtm_psd(s1)?;
    let inner = r.dot(s2).dot(&r);
    let sym = (&inner + &inner.t()) / 2.;
    let (values, _) = symmetric_eigen(&sym)?;
    Ok(values.iter().map(|x| x.max(0.).sqrt()).sum())
}

/// `‖μ1 − μ2‖² + Tr(σ1) + Tr(σ2) − 2·Tr(sqrtm(σ1·σ2))`.
pub fn frechet_distance(a: &FeatureStats, b: &FeatureStats) -> Result<f64> {
    let d = a.dim();
    if b.dim() != d || a.sigma.shape() != [d, d] || b.sigma.shape() != [d, d] {
        return Err(DataError::Metric(format!(
            "feature dimensions differ: {} (sigma {:?}) vs {} (sigma {:?})",
            d, a.sigma.shape(), b.dim(), b.sigma.shape()
        )));
    }
    let diff = &a.mu - &b.mu;
    let covmean = trace_sqrt_product(&a.sigma, &b.sigma)?;
    let fd = diff.dot(&diff) + a.sigma.diag().sum() + b.sigma.diag().sum() - 2. * covmean;
    // rounding can push identical distributions slightly below zero
    Ok(fd.max(0.))
}
