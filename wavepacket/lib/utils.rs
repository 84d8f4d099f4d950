//! Normalization and miscellaneous numerical tools.
//!
//! [`Normalizer`] is the single choke point through which every wave function
//! in this crate passes; nothing else rescales amplitudes.

use ndarray::{ self as nd, Ix1, concatenate };
use rustfft as fft;
use num_complex::Complex64 as C64;
use crate::{
    Arr1,
    error::{ NormError, ParamError },
    DEF_NORM_FLOOR,
    DEF_TOLERANCE,
};

pub type NormResult<T> = Result<T, NormError>;

/// Calculate the norm² `Σ|q[i]|² dx` of a wavefunction.
pub fn wf_norm<S>(q: &Arr1<S>, dx: f64) -> f64
where S: nd::Data<Elem = C64>
{
    q.iter().map(|qk| qk.norm_sqr()).sum::<f64>() * dx
}

/// Calculate the inner product `Σ conj(q[i]) p[i] dx` of two wavefunctions.
///
/// Extra elements of the longer array are ignored.
pub fn wf_dot<S, T>(q: &Arr1<S>, p: &Arr1<T>, dx: f64) -> C64
where
    S: nd::Data<Elem = C64>,
    T: nd::Data<Elem = C64>,
{
    q.iter().zip(p)
        .fold(C64::from(0.0), |acc, (qk, pk)| acc + qk.conj() * pk)
        * dx
}

/// Renormalize a wavefunction in place with the [default][Normalizer::default]
/// normalizer, returning the norm² it had before.
pub fn wf_normalize<S>(q: &mut Arr1<S>, dx: f64) -> NormResult<f64>
where S: nd::DataMut<Elem = C64>
{
    Normalizer::default().normalize(q, dx)
}

/// Return a normalized copy of a wavefunction using the
/// [default][Normalizer::default] normalizer.
pub fn wf_normalized<S>(q: &Arr1<S>, dx: f64) -> NormResult<nd::Array1<C64>>
where S: nd::Data<Elem = C64>
{
    Normalizer::default().normalized(q, dx)
}

/// Validates and rescales wavefunctions to unit norm.
///
/// A norm² that is NaN or infinite, or that lies at or below `floor`, is
/// rejected; the latter is the typical signature of underflow from a packet
/// much narrower than the grid spacing. After rescaling, the norm² is
/// required to lie within `tolerance` of 1.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normalizer {
    floor: f64,
    tolerance: f64,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { floor: DEF_NORM_FLOOR, tolerance: DEF_TOLERANCE }
    }
}

impl Normalizer {
    /// Create a new normalizer.
    pub fn new(floor: f64, tolerance: f64) -> Result<Self, ParamError> {
        ParamError::check_tolerance(floor)?;
        ParamError::check_tolerance(tolerance)?;
        Ok(Self { floor, tolerance })
    }

    /// Norm² at or below which a wavefunction is considered degenerate.
    pub fn floor(&self) -> f64 { self.floor }

    /// Allowed deviation of the normalized norm² from 1.
    pub fn tolerance(&self) -> f64 { self.tolerance }

    /// Classify a raw norm².
    pub fn check_norm(&self, norm_sqr: f64) -> NormResult<()> {
        if !norm_sqr.is_finite() {
            Err(NormError::Invalid(norm_sqr))
        } else if norm_sqr <= self.floor {
            Err(NormError::Degenerate(norm_sqr))
        } else {
            Ok(())
        }
    }

    /// Return `true` if `q` is normalized to within tolerance.
    pub fn is_normalized<S>(&self, q: &Arr1<S>, dx: f64) -> bool
    where S: nd::Data<Elem = C64>
    {
        (wf_norm(q, dx) - 1.0).abs() <= self.tolerance
    }

    /// Renormalize `q` in place, returning its norm² before rescaling.
    ///
    /// On failure `q` is left unchanged.
    pub fn normalize<S>(&self, q: &mut Arr1<S>, dx: f64) -> NormResult<f64>
    where S: nd::DataMut<Elem = C64>
    {
        let scaled = self.normalized(q, dx)?;
        let norm_sqr = wf_norm(q, dx);
        q.assign(&scaled);
        Ok(norm_sqr)
    }

    /// Return a normalized copy of `q`.
    pub fn normalized<S>(&self, q: &Arr1<S>, dx: f64)
        -> NormResult<nd::Array1<C64>>
    where S: nd::Data<Elem = C64>
    {
        let norm_sqr = wf_norm(q, dx);
        self.check_norm(norm_sqr)?;
        let scale = norm_sqr.sqrt().recip();
        let scaled = q.mapv(|qk| qk * scale);
        let after = wf_norm(&scaled, dx);
        ((after - 1.0).abs() <= self.tolerance).then_some(scaled)
            .ok_or(NormError::Tolerance(after))
    }
}

/// Apply the centered three-point second-derivative stencil with Dirichlet
/// (zero) boundary conditions.
///
/// The end points of `q` are treated as zero, and the end points of the
/// result are zero.
pub fn laplacian_dirichlet<S>(q: &Arr1<S>, dx: f64) -> nd::Array1<C64>
where S: nd::Data<Elem = C64>
{
    let n = q.len();
    let zero = C64::from(0.0);
    let at = |i: usize| if i == 0 || i + 1 >= n { zero } else { q[i] };
    let dx2 = dx.powi(2);
    let mut lap: nd::Array1<C64> = nd::Array1::zeros(n);
    lap.iter_mut().enumerate().skip(1).take(n.saturating_sub(2))
        .for_each(|(i, lapi)| {
            *lapi = (at(i + 1) - 2.0 * at(i) + at(i - 1)) / dx2;
        });
    lap
}

/// Solve the tridiagonal system `A y = d` with the Thomas algorithm.
///
/// - `a`: sub-diagonal (`a[0]` unused)
/// - `b`: main diagonal
/// - `c`: super-diagonal (`c[n - 1]` unused)
///
/// A vanishing pivot produces non-finite entries rather than a panic; callers
/// in this crate pass the result through a [`Normalizer`], which rejects
/// them.
///
/// *Panics if the arrays have unequal lengths*.
pub fn tridiag_solve<S, T, U, V>(
    a: &Arr1<S>,
    b: &Arr1<T>,
    c: &Arr1<U>,
    d: &Arr1<V>,
) -> nd::Array1<C64>
where
    S: nd::Data<Elem = C64>,
    T: nd::Data<Elem = C64>,
    U: nd::Data<Elem = C64>,
    V: nd::Data<Elem = C64>,
{
    let n = d.len();
    assert_eq!(a.len(), n);
    assert_eq!(b.len(), n);
    assert_eq!(c.len(), n);
    let mut y: nd::Array1<C64> = nd::Array1::zeros(n);
    if n == 0 { return y; }

    // forward sweep
    let mut c_prime: nd::Array1<C64> = nd::Array1::zeros(n);
    let mut d_prime: nd::Array1<C64> = nd::Array1::zeros(n);
    c_prime[0] = c[0] / b[0];
    d_prime[0] = d[0] / b[0];
    for i in 1..n {
        let den = b[i] - a[i] * c_prime[i - 1];
        if i < n - 1 { c_prime[i] = c[i] / den; }
        d_prime[i] = (d[i] - a[i] * d_prime[i - 1]) / den;
    }

    // back substitution
    y[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        y[i] = d_prime[i] - c_prime[i] * y[i + 1];
    }
    y
}

/// Generate an array of frequency-space coordinates to accompany a FFT of `n`
/// points for sampling interval `dt`.
pub fn fft_freq(n: usize, dt: f64) -> nd::Array1<f64> {
    let m = if n % 2 == 0 { n / 2 } else { (n + 1) / 2 };
    let fp: nd::Array1<f64>
        = (0..m)
        .map(|k| k as f64 / (n as f64 * dt))
        .collect();
    let fm: nd::Array1<f64>
        = (1..n - m + 1).rev()
        .map(|k| -(k as f64) / (n as f64 * dt))
        .collect();
    concatenate!(nd::Axis(0), fp, fm)
}

/// Perform the one-dimensional, complex-valued FFT.
pub fn fft<S>(x: &nd::ArrayBase<S, Ix1>) -> nd::Array1<C64>
where S: nd::Data<Elem = C64>
{
    let mut f = x.to_owned();
    fft_inplace(&mut f);
    f
}

/// Perform the one-dimensional, complex-valued FFT in place.
pub fn fft_inplace<S>(f: &mut nd::ArrayBase<S, Ix1>)
where S: nd::DataMut<Elem = C64>
{
    let n: usize = f.len();
    let mut plan = fft::FftPlanner::new();
    let fft_plan = plan.plan_fft_forward(n);
    process(fft_plan.as_ref(), f);
}

/// Perform the one-dimensional, complex-valued inverse FFT in place.
pub fn ifft_inplace<S>(x: &mut nd::ArrayBase<S, Ix1>)
where S: nd::DataMut<Elem = C64>
{
    let n: usize = x.len();
    let mut plan = fft::FftPlanner::new();
    let ifft_plan = plan.plan_fft_inverse(n);
    process(ifft_plan.as_ref(), x);
    let n = n as f64;
    x.map_inplace(|xk| { *xk /= n; });
}

// run a planned transform over an array that may not be contiguous
fn process<S>(plan: &dyn fft::Fft<f64>, x: &mut nd::ArrayBase<S, Ix1>)
where S: nd::DataMut<Elem = C64>
{
    match x.as_slice_mut() {
        Some(slice) => plan.process(slice),
        None => {
            let mut buf: Vec<C64> = x.iter().copied().collect();
            plan.process(&mut buf);
            x.iter_mut().zip(buf).for_each(|(xk, bk)| { *xk = bk; });
        },
    }
}

/// Return a copy of `x` with indices shifted to map super-Nyquist frequency
/// components to negative frequencies.
pub fn fft_shift<S, A>(x: &nd::ArrayBase<S, Ix1>) -> nd::Array1<A>
where
    S: nd::Data<Elem = A>,
    A: Clone,
{
    let n = x.len();
    let (p, m)
        = if n % 2 == 0 {
            x.view().split_at(nd::Axis(0), n / 2)
        } else {
            x.view().split_at(nd::Axis(0), n / 2 + 1)
        };
    concatenate!(nd::Axis(0), m.into_owned(), p.into_owned())
}
