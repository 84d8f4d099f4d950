//! Normalized wavefunctions and read-only views of them.
//!
//! A [`WaveFunction`] can only be obtained through a
//! [`Normalizer`][crate::utils::Normalizer], so holding one is proof that its
//! norm² was finite, non-degenerate, and rescaled to 1 within tolerance.
//! Accessors hand out copies; the amplitudes themselves are never exposed
//! mutably.

use std::f64::consts::TAU;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    Arr1,
    error::{ Error, LengthError },
    grid::Grid,
    utils::{ fft, fft_freq, fft_shift, wf_norm, Normalizer },
};

/// A normalized array of complex amplitudes aligned with a grid.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveFunction {
    q: nd::Array1<C64>,
}

impl WaveFunction {
    /// Normalize raw amplitudes over `grid` with the default normalizer.
    pub fn from_amplitudes<S>(q: &Arr1<S>, grid: &Grid) -> Result<Self, Error>
    where S: nd::Data<Elem = C64>
    {
        Self::from_amplitudes_with(q, grid, &Normalizer::default())
    }

    /// Normalize raw amplitudes over `grid` with a particular normalizer.
    pub fn from_amplitudes_with<S>(
        q: &Arr1<S>,
        grid: &Grid,
        normalizer: &Normalizer,
    ) -> Result<Self, Error>
    where S: nd::Data<Elem = C64>
    {
        LengthError::check(q, &grid.x())?;
        let q = normalizer.normalized(q, grid.dx())?;
        Ok(Self { q })
    }

    // `q` must already have passed through a `Normalizer`
    pub(crate) fn from_normalized(q: nd::Array1<C64>) -> Self { Self { q } }

    /// Number of amplitudes.
    pub fn len(&self) -> usize { self.q.len() }

    /// Return `true` if there are no amplitudes.
    pub fn is_empty(&self) -> bool { self.q.is_empty() }

    /// View of the amplitudes.
    pub fn amplitudes(&self) -> nd::ArrayView1<'_, C64> { self.q.view() }

    /// Copy of the amplitudes.
    pub fn to_array(&self) -> nd::Array1<C64> { self.q.clone() }

    /// Real parts.
    pub fn re(&self) -> nd::Array1<f64> { self.q.mapv(|qk| qk.re) }

    /// Imaginary parts.
    pub fn im(&self) -> nd::Array1<f64> { self.q.mapv(|qk| qk.im) }

    /// Magnitudes.
    pub fn abs(&self) -> nd::Array1<f64> { self.q.mapv(|qk| qk.norm()) }

    /// Probability density `|q|²`.
    pub fn density(&self) -> nd::Array1<f64> { self.q.mapv(|qk| qk.norm_sqr()) }

    /// Norm² `Σ|q|² dx`.
    pub fn norm_sqr(&self, dx: f64) -> f64 { wf_norm(&self.q, dx) }

    /// Position expectation value `<x>`.
    pub fn expect_x(&self, grid: &Grid) -> f64 {
        self.q.iter().zip(grid.x())
            .map(|(qk, xk)| qk.norm_sqr() * xk)
            .sum::<f64>()
            * grid.dx()
    }

    /// Position uncertainty `sqrt(<x²> - <x>²)`.
    pub fn width(&self, grid: &Grid) -> f64 {
        let mean = self.expect_x(grid);
        let var: f64
            = self.q.iter().zip(grid.x())
            .map(|(qk, xk)| qk.norm_sqr() * (xk - mean).powi(2))
            .sum::<f64>()
            * grid.dx();
        var.max(0.0).sqrt()
    }

    /// Momentum expectation value `<p>`, using a centered difference for the
    /// derivative.
    ///
    /// The grid spacing cancels against the normalization, so none is needed.
    pub fn expect_p(&self) -> f64 {
        let n = self.q.len();
        if n < 3 { return 0.0; }
        // <p> = Σ conj(q[i]) (-i) (q[i + 1] - q[i - 1]) / 2dx * dx
        let acc: C64
            = (1..n - 1)
            .map(|i| self.q[i].conj() * (self.q[i + 1] - self.q[i - 1]))
            .sum();
        (-C64::i() * acc / 2.0).re
    }

    /// Momentum-space probability distribution.
    ///
    /// Returns wavenumbers in increasing order along with `|φ(k)|²`,
    /// normalized such that `Σ|φ(k)|² dk = 1`.
    pub fn momentum_distribution(&self, dx: f64)
        -> (nd::Array1<f64>, nd::Array1<f64>)
    {
        let n = self.q.len();
        let k: nd::Array1<f64> = fft_freq(n, dx).mapv(|f| TAU * f);
        let scale = dx.powi(2) / TAU;
        let phi: nd::Array1<f64> = fft(&self.q).mapv(|p| p.norm_sqr() * scale);
        (fft_shift(&k), fft_shift(&phi))
    }
}
