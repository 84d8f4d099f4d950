//! Single-step propagators for the 1+1-dimensional time-dependent Schrödinger
//! equation (TDSE) in a static potential,
//! ```text
//! i ∂ψ/∂t = H ψ,    H = -(1/2) ∂²/∂x² + V(x)
//! ```
//!
//! Each function advances a state by one time step `dt` and returns the raw
//! (unnormalized) result; it is up to the caller to pass it through a
//! [`Normalizer`][crate::utils::Normalizer]. Amplitudes at both end points of
//! the grid are held at zero (Dirichlet boundary conditions).
//!
//! See [`docs`][crate::docs] for the stability properties of each scheme.

use std::{ f64::consts::TAU, fmt, str::FromStr };
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::Zero;
use serde::{ Deserialize, Serialize };
use crate::{
    Arr1,
    utils::{ fft_inplace, ifft_inplace, laplacian_dirichlet, tridiag_solve },
};

/// Time-stepping scheme.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    /// Forward Euler on the three-point Laplacian. Never unconditionally
    /// stable: the norm grows by `1 + (λ dt)²` per step in each eigenmode of
    /// energy `λ`.
    Explicit,
    /// Crank-Nicolson (Cayley form) on the three-point Laplacian. Unitary for
    /// any `dt`.
    #[default]
    CrankNicolson,
    /// Strang-split pseudo-spectral stepping. Unitary for any `dt` apart from
    /// the reimposed boundary values.
    SplitStep,
    /// Exact propagation `exp(-i H dt)` of the discretized Hamiltonian via
    /// dense eigendecomposition.
    #[cfg(feature = "exact")]
    Exact,
}

impl Scheme {
    /// All available schemes.
    pub fn all() -> &'static [Self] {
        &[
            Self::Explicit,
            Self::CrankNicolson,
            Self::SplitStep,
            #[cfg(feature = "exact")]
            Self::Exact,
        ]
    }

    /// Canonical name, as used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::CrankNicolson => "crank-nicolson",
            Self::SplitStep => "split-step",
            #[cfg(feature = "exact")]
            Self::Exact => "exact",
        }
    }

    /// Return `true` if the scheme conserves the norm for any time step.
    pub fn is_unitary(self) -> bool { !matches!(self, Self::Explicit) }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "explicit" | "euler" => Ok(Self::Explicit),
            "crank-nicolson" | "cn" => Ok(Self::CrankNicolson),
            "split-step" | "split" => Ok(Self::SplitStep),
            #[cfg(feature = "exact")]
            "exact" => Ok(Self::Exact),
            _ => {
                let names: Vec<&str>
                    = Self::all().iter().map(|s| s.name()).collect();
                Err(format!(
                    "unknown scheme {:?}; expected one of: {}",
                    s,
                    names.join(", "),
                ))
            },
        }
    }
}

// zero out both end points
fn pin_edges<S>(q: &mut Arr1<S>)
where S: nd::DataMut<Elem = C64>
{
    let n = q.len();
    if n == 0 { return; }
    q[0] = C64::zero();
    q[n - 1] = C64::zero();
}

/// Take a single forward-Euler step,
/// ```text
/// ψ' = ψ + dt i (ψ''/2 - V ψ)
/// ```
pub fn explicit_step<S, T>(dx: f64, V: &Arr1<S>, q: &Arr1<T>, dt: f64)
    -> nd::Array1<C64>
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = C64>,
{
    let lap = laplacian_dirichlet(q, dx);
    let mut qp: nd::Array1<C64>
        = nd::Zip::from(q).and(&lap).and(V)
        .map_collect(|qk, lapk, Vk| {
            let dq = C64::i() * (0.5 * *lapk - *Vk * *qk);
            *qk + dt * dq
        });
    pin_edges(&mut qp);
    qp
}

/// Take a single Crank-Nicolson step,
/// ```text
/// (1 + i dt H / 2) ψ' = (1 - i dt H / 2) ψ
/// ```
/// solving the tridiagonal system over interior points only.
pub fn crank_nicolson_step<S, T>(dx: f64, V: &Arr1<S>, q: &Arr1<T>, dt: f64)
    -> nd::Array1<C64>
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = C64>,
{
    let n = q.len();
    let mut qp: nd::Array1<C64> = nd::Array1::zeros(n);
    if n < 3 { return qp; }
    let m = n - 2;
    let dx2 = dx.powi(2);
    let hdt = C64::i() * dt / 2.0;

    // H = diag(1/dx² + V) - (1/2dx²) (I{-1} + I{+1})
    let off = -hdt / (2.0 * dx2);
    let a: nd::Array1<C64> = nd::Array1::from_elem(m, off);
    let c: nd::Array1<C64> = nd::Array1::from_elem(m, off);
    let b: nd::Array1<C64>
        = V.slice(nd::s![1..n - 1]).mapv(|Vk| 1.0 + hdt * (dx2.recip() + Vk));
    let lap = laplacian_dirichlet(q, dx);
    let d: nd::Array1<C64>
        = nd::Zip::from(q.slice(nd::s![1..n - 1]))
        .and(lap.slice(nd::s![1..n - 1]))
        .and(V.slice(nd::s![1..n - 1]))
        .map_collect(|qk, lapk, Vk| *qk - hdt * (-0.5 * *lapk + *Vk * *qk));

    qp.slice_mut(nd::s![1..n - 1]).assign(&tridiag_solve(&a, &b, &c, &d));
    qp
}

fn apply_split_kinetic<S>(dx: f64, q: &mut Arr1<S>, dt: f64)
where S: nd::DataMut<Elem = C64>
{
    let n = q.len();
    let m = if n % 2 == 0 { n / 2 } else { (n + 1) / 2 };
    let dk = TAU * (n as f64 * dx).recip();
    fft_inplace(q);
    q.iter_mut().enumerate()
        .for_each(|(i, qi)| {
            let k = if i < m { i as f64 * dk } else { (n - i) as f64 * dk };
            *qi *= C64::cis(-0.5 * k.powi(2) * dt);
        });
    ifft_inplace(q);
}

fn apply_split_potential<S, T>(V: &Arr1<S>, q: &mut Arr1<T>, dt: f64)
where
    S: nd::Data<Elem = f64>,
    T: nd::DataMut<Elem = C64>,
{
    q.iter_mut().zip(V)
        .for_each(|(qi, Vi)| { *qi *= C64::cis(-Vi * dt); });
}

/// Take a single Strang-split step, `exp(-i V dt/2) exp(-i T dt) exp(-i V
/// dt/2)`, applying the kinetic factor in momentum space.
///
/// The transform is periodic over the grid, so the packet should be well
/// separated from the boundaries; the end points are zeroed afterward.
pub fn split_step<S, T>(dx: f64, V: &Arr1<S>, q: &Arr1<T>, dt: f64)
    -> nd::Array1<C64>
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = C64>,
{
    let mut qp = q.to_owned();
    apply_split_potential(V, &mut qp, dt / 2.0);
    apply_split_kinetic(dx, &mut qp, dt);
    apply_split_potential(V, &mut qp, dt / 2.0);
    pin_edges(&mut qp);
    qp
}

/// Exact propagator `U = exp(-i H dt)` of the three-point discretized
/// Hamiltonian on interior points, built once and applied repeatedly.
#[cfg(feature = "exact")]
#[derive(Clone, Debug, PartialEq)]
pub struct ExactPropagator {
    dt: f64,
    U: nd::Array2<C64>,
}

#[cfg(feature = "exact")]
impl ExactPropagator {
    /// Diagonalize the Hamiltonian for potential `V` and build the propagator
    /// for time step `dt`.
    ///
    /// Returns `None` if the eigendecomposition fails.
    pub fn new<S>(dx: f64, V: &Arr1<S>, dt: f64) -> Option<Self>
    where S: nd::Data<Elem = f64>
    {
        use ndarray_linalg::{ EighInto, UPLO };

        let m = V.len().saturating_sub(2);
        if m == 0 { return Some(Self { dt, U: nd::Array2::zeros((0, 0)) }); }
        let dx2 = dx.powi(2);
        let mut H: nd::Array2<f64> = nd::Array2::zeros((m, m));
        V.slice(nd::s![1..V.len() - 1]).iter().enumerate()
            .for_each(|(i, Vi)| {
                H[[i, i]] = dx2.recip() + Vi;
                if i + 1 < m {
                    H[[i, i + 1]] = -0.5 / dx2;
                    H[[i + 1, i]] = -0.5 / dx2;
                }
            });
        let (E, vecs): (nd::Array1<f64>, nd::Array2<f64>)
            = H.eigh_into(UPLO::Lower).ok()?;
        let vecs: nd::Array2<C64> = vecs.mapv(C64::from);
        let phases: nd::Array1<C64> = E.mapv(|Ek| C64::cis(-Ek * dt));
        let U = (&vecs * &phases).dot(&vecs.t());
        Some(Self { dt, U })
    }

    /// Time step the propagator was built for.
    pub fn dt(&self) -> f64 { self.dt }

    /// Advance `q` by one time step.
    pub fn apply<S>(&self, q: &Arr1<S>) -> nd::Array1<C64>
    where S: nd::Data<Elem = C64>
    {
        let n = q.len();
        let mut qp: nd::Array1<C64> = nd::Array1::zeros(n);
        if n < 3 { return qp; }
        qp.slice_mut(nd::s![1..n - 1]).assign(&self.U.dot(&q.slice(nd::s![1..n - 1])));
        qp
    }
}
