//! Gaussian wave packets.

use std::f64::consts::PI;
use num_complex::Complex64 as C64;
use crate::{
    error::{ Error, NormError, ParamError },
    grid::Grid,
    utils::Normalizer,
    wavefunction::WaveFunction,
};

/// A Gaussian wave packet centered on `x0` with mean wavenumber `k0` and
/// position width `sigma`,
/// ```text
/// ψ(x) = (σ √π)^(-1/2) exp(-(x - x0)² / 2σ²) exp(i k0 x)
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GaussianPacket {
    x0: f64,
    k0: f64,
    sigma: f64,
}

impl GaussianPacket {
    /// Create a new packet description.
    ///
    /// Fails if `sigma` is not positive or any parameter is non-finite.
    pub fn new(x0: f64, k0: f64, sigma: f64) -> Result<Self, ParamError> {
        ParamError::check_finite("x0", x0)?;
        ParamError::check_finite("k0", k0)?;
        ParamError::check_sigma(sigma)?;
        Ok(Self { x0, k0, sigma })
    }

    /// Center position.
    pub fn x0(&self) -> f64 { self.x0 }

    /// Mean wavenumber.
    pub fn k0(&self) -> f64 { self.k0 }

    /// Position width.
    pub fn sigma(&self) -> f64 { self.sigma }

    /// Continuum amplitude at `x`.
    pub fn amplitude(&self, x: f64) -> C64 {
        let norm = (self.sigma * PI.sqrt()).sqrt().recip();
        let envelope = (-((x - self.x0) / self.sigma).powi(2) / 2.0).exp();
        C64::cis(self.k0 * x) * (norm * envelope)
    }

    /// Sample the packet over a grid and normalize it with the default
    /// normalizer.
    pub fn wavefunction(&self, grid: &Grid) -> Result<WaveFunction, NormError> {
        self.wavefunction_with(grid, &Normalizer::default())
    }

    /// Sample the packet over a grid and normalize it.
    ///
    /// A packet much narrower than the grid spacing samples to (near) zero
    /// everywhere and is rejected as degenerate.
    pub fn wavefunction_with(&self, grid: &Grid, normalizer: &Normalizer)
        -> Result<WaveFunction, NormError>
    {
        let q = grid.x().mapv(|x| self.amplitude(x));
        let q = normalizer.normalized(&q, grid.dx())?;
        Ok(WaveFunction::from_normalized(q))
    }
}

/// Construct a normalized Gaussian wave packet over `grid`.
pub fn initialize_packet(grid: &Grid, x0: f64, k0: f64, sigma: f64)
    -> Result<WaveFunction, Error>
{
    let packet = GaussianPacket::new(x0, k0, sigma)?;
    Ok(packet.wavefunction(grid)?)
}
