#![allow(dead_code, non_snake_case)]

//! Provides the numerical core of a one-dimensional wave packet simulator:
//! construction of normalized Gaussian wave packets on a uniform grid and
//! their evolution under the time-dependent Schrödinger equation (TDSE) for a
//! static, user-configurable potential.
//!
//! Units are naturalized such that ħ = m = 1, so that the Hamiltonian reads
//! `H = -(1/2) ∂²/∂x² + V(x)`.
//!
//! Provides implementations for the following numerical routines:
//! - Time-dependent:
//!     - Explicit (forward Euler) finite-difference stepping
//!     - Crank-Nicolson finite-difference stepping (default)
//!     - Pseudo-spectral split-step operator
//!     - Exact propagation by eigendecomposition of the discrete Hamiltonian
//!       (requires the `exact` feature)
//! - Potentials:
//!     - Built-in harmonic, free, and square barrier potentials
//!     - Custom potentials from a sandboxed arithmetic expression of `x`
//!
//! Every wave function passes through a single [normalizer][utils::Normalizer]
//! that rejects zero, underflowed, or non-finite norms, and every step reports
//! its norm growth so that numerical instability can be caught before it
//! destroys the state. See [`docs`] for theoretical background.
//!
//! ```
//! use wavepacket::{ Grid, GaussianPacket, Potential, PotentialKind, SimulationState };
//!
//! let grid = Grid::new(-10.0, 10.0, 500).unwrap();
//! let V = Potential::evaluate(&grid, &PotentialKind::harmonic(1.0)).unwrap();
//! let q0 = GaussianPacket::new(0.0, 5.0, 1.0).unwrap().wavefunction(&grid).unwrap();
//! let mut state = SimulationState::new(grid, V, q0, 0.01).unwrap();
//! let outcomes: Vec<_> = state.run(100).collect();
//! assert!(outcomes.iter().all(|outcome| outcome.is_ok()));
//! assert!((state.time() - 1.0).abs() < 1e-12);
//! ```

pub mod error;
pub mod grid;
pub mod expr;
pub mod potential;
pub mod utils;
pub mod wavefunction;
pub mod packet;
pub mod timedep;
pub mod evolve;
pub mod diagnostics;
pub mod config;

pub mod docs;

/// Default tolerance on `|Σ|ψ|² dx - 1|` after normalization.
pub const DEF_TOLERANCE: f64 = 1e-6;
/// Default floor below which a norm² is considered degenerate.
pub const DEF_NORM_FLOOR: f64 = 1e-12;
/// Default single-step norm² growth factor above which a step is flagged as
/// numerically unstable.
pub const DEF_INSTABILITY_GROWTH: f64 = 10.0;

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;

pub use crate::{
    config::SimConfig,
    diagnostics::{ classify, Diagnosis },
    error::Error,
    evolve::{
        EvolutionOutcome,
        InstabilityPolicy,
        Run,
        SimulationState,
        Snapshot,
        Status,
        StepReport,
    },
    grid::{ make_grid, Grid },
    packet::{ initialize_packet, GaussianPacket },
    potential::{ evaluate_potential, Potential, PotentialKind },
    timedep::Scheme,
    utils::Normalizer,
    wavefunction::WaveFunction,
};

/// Advance `state` by a single time step.
///
/// Free-function spelling of [`SimulationState::step`].
pub fn step(state: &mut SimulationState) -> EvolutionOutcome { state.step() }

/// Lazily advance `state` by up to `n_steps` time steps.
///
/// Free-function spelling of [`SimulationState::run`].
pub fn run(state: &mut SimulationState, n_steps: usize) -> Run<'_> {
    state.run(n_steps)
}
