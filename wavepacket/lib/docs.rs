//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Units](#units)
//! - [Discretization](#discretization)
//! - [Normalization](#normalization)
//! - [Time-stepping schemes](#time-stepping-schemes)
//! - [Stability](#stability)
//!
//! # Background
//! A single non-relativistic particle moving in one dimension under a static
//! potential *V*(*x*) is described by a complex wavefunction *ψ*(*x*, *t*)
//! obeying the time-dependent Schrödinger equation (TDSE)
//! ```text
//!   ∂ψ      ħ² ∂²ψ
//! i ħ -- = - --- --- + V(x) ψ
//!   ∂t      2 m ∂x²
//! ```
//! Since the Hamiltonian is Hermitian, the total probability ∫ |*ψ*|² d*x* is
//! conserved by the exact evolution, and the wavefunction can be kept
//! normalized to 1 at all times.
//!
//! The initial states produced by this crate are Gaussian wave packets,
//! ```text
//!               1           (x - x₀)²
//! ψ(x, 0) = --------- exp(- ---------) exp(i k₀ x)
//!           √(σ √π)            2 σ²
//! ```
//! which have position uncertainty *σ*/√2, mean momentum *ħ* *k*₀, and momentum
//! uncertainty *ħ*/(√2 *σ*). In the harmonic potential *V* = *k* *x*²/2 with
//! *k* = *m* = 1 and *σ* = 1, such a packet is a coherent state: it keeps its
//! shape while its center oscillates as ⟨*x*⟩(*t*) = *x*₀ cos *t* + *k*₀ sin
//! *t*.
//!
//! # Units
//! Everything in this crate is expressed in units where *ħ* = *m* = 1, so
//! that
//! ```text
//!   ∂ψ     1 ∂²ψ
//! i -- = - - --- + V(x) ψ ≡ H ψ
//!   ∂t     2 ∂x²
//! ```
//! Lengths, times, wavenumbers, and energies are then all dimensionless. For a
//! particle of mass *m* and a chosen length scale *a*, the corresponding
//! energy and time scales are *ħ*²/*m* *a*² and *m* *a*²/*ħ*.
//!
//! # Discretization
//! Space is sampled on a uniform grid of *N* points,
//! ```text
//! x[i] = x_min + i δx,  δx = (x_max - x_min) / (N - 1),  i ∊ {0, ..., N - 1}
//! ```
//! and the second derivative is replaced by the three-point stencil
//! ```text
//!          ψ[i + 1] - 2 ψ[i] + ψ[i - 1]
//! ψ''[i] ≈ ---------------------------- + O(δx²)
//!                      δx²
//! ```
//! with Dirichlet boundary conditions *ψ*\[0\] = *ψ*\[*N* - 1\] = 0. The
//! discrete Hamiltonian on the *N* - 2 interior points is then the real
//! symmetric tridiagonal matrix
//! ```text
//!       1          1
//! H = (--- + V) - ----- (I{-1} + I{+1})
//!      δx²        2 δx²
//! ```
//! where *I*{*k*} is the matrix with ones on the *k*-th diagonal. Its
//! eigenvalues lie in \[min *V*, max *V* + 2/*δx*²\].
//!
//! # Normalization
//! The norm is the rectangle-rule sum
//! ```text
//! ‖ψ‖² = Σᵢ |ψ[i]|² δx
//! ```
//! After every initialization and every step, the wavefunction is divided by
//! ‖*ψ*‖. This is rejected if ‖*ψ*‖² is NaN or infinite, or if it lies at or
//! below a small floor: a packet with *σ* ≪ *δx* that happens to fall between
//! grid points samples to zero everywhere, and there is nothing to rescale.
//!
//! # Time-stepping schemes
//! Formally, a step of size *dt* is *ψ*(*t* + *dt*) = exp(-*i* *H* *dt*)
//! *ψ*(*t*). The available schemes approximate this propagator in different
//! ways.
//!
//! **Explicit (forward Euler).** Truncating the exponential at first order,
//! ```text
//! ψ(t + dt) = (1 - i H dt) ψ(t) + O(dt²)
//! ```
//! This is the simplest scheme and the only one that is not unitary; see
//! [Stability](#stability).
//!
//! **Crank-Nicolson.** Using the Cayley form of the exponential,
//! ```text
//!     i H dt                  i H dt
//! (1 + ------) ψ(t + dt) = (1 - ------) ψ(t) + O(dt³)
//!       2                       2
//! ```
//! The operator (1 + *i* *H* *dt*/2)⁻¹ (1 - *i* *H* *dt*/2) is exactly unitary
//! for Hermitian *H*, so the norm is conserved for any *dt*. Since *H* is
//! tridiagonal, the left-hand side is solved in *O*(*N*) time with the Thomas
//! algorithm. This is the default scheme.
//!
//! **Split-step.** The Hamiltonian is a sum of kinetic and potential parts
//! that are each diagonal in a different basis: *H*<sub>*v*</sub> = *V* in
//! position space and *H*<sub>*k*</sub> = *k*²/2 in momentum space. The
//! Baker-Campbell-Hausdorff formula gives
//! ```text
//!               -i H_v dt/2  -i H_k dt  -i H_v dt/2
//! ψ(t + dt) = [e            e          e           ] ψ(t) + O(dt³)
//! ```
//! where sandwiching the kinetic factor between two half-sized potential
//! factors cancels the *O*(*dt*²) commutator term. The potential factors are
//! pointwise phases in position space and the kinetic factor is a pointwise
//! phase in momentum space, reached by the fast Fourier transform:
//! ```text
//!  -i H_k dt                -i k² dt/2
//! e          ψ(x) = F⁻¹[e           F[ψ](k)]
//! ```
//! The transform treats the grid as periodic, so the boundary values are
//! zeroed after each step to keep the boundary conditions consistent with the
//! other schemes. The packet should be kept away from the edges of the grid.
//!
//! **Exact.** With the `exact` feature, *H* is diagonalized once as *H* = *W*
//! *E* *W*ᵀ and the propagator *U* = *W* exp(-*i* *E* *dt*) *W*ᵀ is formed
//! directly. This is exact for the discrete Hamiltonian at any *dt*, but costs
//! *O*(*N*³) to build and *O*(*N*²) per step. The propagator is rebuilt
//! whenever the potential or the time step changes.
//!
//! # Stability
//! In an eigenmode of *H* with energy *λ*, one explicit step multiplies the
//! amplitude by 1 - *i* *λ* *dt*, whose magnitude
//! ```text
//! |1 - i λ dt|² = 1 + (λ dt)²
//! ```
//! exceeds 1 for every *λ* ≠ 0. The explicit scheme is therefore never
//! strictly stable; renormalization hides the overall growth but not the
//! distortion of the state, as high-energy modes are amplified most. The
//! largest eigenvalue is roughly 2/*δx*² + max *V*, giving the Courant-like
//! condition
//! ```text
//!      δx²
//! dt ≪ ---
//!       2
//! ```
//! for the explicit scheme to stay usable over many steps. On the default
//! grid (*δx* ≈ 0.04) this is *dt* ≪ 8 × 10⁻⁴; at *dt* = 0.01 the
//! highest modes grow by a factor of ~170 per step, and rounding noise
//! overtakes the state after a few tens of steps.
//!
//! Divergence is detected through the *growth factor*
//! ```text
//!      ‖ψ(t + dt)‖²
//! g = ------------
//!        ‖ψ(t)‖²
//! ```
//! measured before renormalization. For the unitary schemes *g* = 1 to within
//! rounding. For the explicit scheme *g* = 1 + *dt*² ⟨*H*²⟩, and a step is
//! flagged as unstable once *g* exceeds a threshold (10 by default). A state
//! whose norm² overflows to infinity, or becomes NaN, cannot be renormalized
//! at all and the simulation fails.
