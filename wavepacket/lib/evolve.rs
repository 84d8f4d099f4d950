//! Session state and the time-stepping state machine.
//!
//! A [`SimulationState`] is either *ready*, in which case it can be stepped
//! forward, or *failed*, in which case it keeps the last valid wave function
//! for inspection and refuses to step until [reset][SimulationState::reset].
//!
//! Each step is passed through the state's [`Normalizer`], and the ratio of
//! the norm² before renormalization to the norm² before the step (the *growth
//! factor*) is reported. For a unitary scheme this is 1 to within rounding;
//! values above the instability threshold mean the scheme is diverging at the
//! current time step.

use std::iter::FusedIterator;
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::{
    DEF_INSTABILITY_GROWTH,
    error::{ Error, EvolveError, LengthError, ParamError, PotentialError },
    grid::Grid,
    potential::Potential,
    timedep::{ self, Scheme },
    utils::{ wf_norm, Normalizer },
    wavefunction::WaveFunction,
};

/// What to do with a step whose growth factor exceeds the instability
/// threshold.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstabilityPolicy {
    /// Apply the step and flag it in the [`StepReport`].
    #[default]
    Warn,
    /// Reject the step and move to the failed state.
    Halt,
}

/// Lifecycle status of a simulation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Status {
    /// Can be stepped forward.
    Ready,
    /// Contains the error that caused the failure.
    Failed(EvolveError),
}

impl Status {
    pub fn is_ready(&self) -> bool { matches!(self, Self::Ready) }

    pub fn is_failed(&self) -> bool { matches!(self, Self::Failed(_)) }
}

/// Returned from a successful step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Number of steps taken since the last reset, including this one.
    pub step: usize,
    /// Elapsed time after this step.
    pub time: f64,
    /// Norm² growth factor of this step before renormalization.
    pub growth: f64,
    /// Set if `growth` exceeded the instability threshold.
    pub unstable: bool,
}

/// Result of a single evolution step.
pub type EvolutionOutcome = Result<StepReport, EvolveError>;

/// Copy of everything a plotting consumer needs at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Number of successful steps taken.
    pub step: usize,
    /// Elapsed time.
    pub time: f64,
    /// Grid coordinates.
    pub x: nd::Array1<f64>,
    /// Real parts of the amplitudes.
    pub re: nd::Array1<f64>,
    /// Imaginary parts of the amplitudes.
    pub im: nd::Array1<f64>,
    /// Magnitudes of the amplitudes.
    pub abs: nd::Array1<f64>,
    /// `Σ|ψ|² dx`.
    pub norm_sqr: f64,
    /// Session status at the time of the copy.
    pub status: Status,
}

/// A simulation session: grid, potential, current wave function, and
/// stepping parameters.
#[derive(Clone, Debug)]
pub struct SimulationState {
    grid: Grid,
    V: Potential,
    wf: WaveFunction,
    dt: f64,
    // elapsed time at the last change of `dt`
    t0: f64,
    steps: usize,
    steps_at_dt: usize,
    scheme: Scheme,
    normalizer: Normalizer,
    threshold: f64,
    policy: InstabilityPolicy,
    status: Status,
    last_growth: f64,
    last_unstable: bool,
    #[cfg(feature = "exact")]
    exact: Option<timedep::ExactPropagator>,
}

impl SimulationState {
    /// Create a new session in the ready state at `t = 0`.
    ///
    /// Fails if `dt` is not positive and finite, or if either array does not
    /// match the grid. The wave function is renormalized over `grid`.
    pub fn new(grid: Grid, V: Potential, wf: WaveFunction, dt: f64)
        -> Result<Self, Error>
    {
        ParamError::check_dt(dt)?;
        LengthError::check_len(grid.len(), V.len())?;
        let normalizer = Normalizer::default();
        let wf = WaveFunction::from_amplitudes_with(&wf.amplitudes(), &grid, &normalizer)?;
        Ok(Self {
            grid,
            V,
            wf,
            dt,
            t0: 0.0,
            steps: 0,
            steps_at_dt: 0,
            scheme: Scheme::default(),
            normalizer,
            threshold: DEF_INSTABILITY_GROWTH,
            policy: InstabilityPolicy::default(),
            status: Status::Ready,
            last_growth: 1.0,
            last_unstable: false,
            #[cfg(feature = "exact")]
            exact: None,
        })
    }

    /// Set the time-stepping scheme.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.set_scheme(scheme);
        self
    }

    /// Set the normalizer used after every step.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Set the instability threshold and policy.
    pub fn with_instability(mut self, threshold: f64, policy: InstabilityPolicy)
        -> Result<Self, ParamError>
    {
        ParamError::check_threshold(threshold)?;
        self.threshold = threshold;
        self.policy = policy;
        Ok(self)
    }

    pub fn grid(&self) -> &Grid { &self.grid }

    pub fn potential(&self) -> &Potential { &self.V }

    pub fn wavefunction(&self) -> &WaveFunction { &self.wf }

    pub fn dt(&self) -> f64 { self.dt }

    pub fn scheme(&self) -> Scheme { self.scheme }

    pub fn normalizer(&self) -> &Normalizer { &self.normalizer }

    pub fn threshold(&self) -> f64 { self.threshold }

    pub fn policy(&self) -> InstabilityPolicy { self.policy }

    pub fn status(&self) -> Status { self.status }

    pub fn is_failed(&self) -> bool { self.status.is_failed() }

    /// Number of successful steps since the last reset.
    pub fn steps(&self) -> usize { self.steps }

    /// Elapsed time since the last reset.
    ///
    /// Computed as a product rather than a running sum, so that `k` steps at
    /// a fixed `dt` give exactly `k * dt`.
    pub fn time(&self) -> f64 { self.t0 + self.steps_at_dt as f64 * self.dt }

    /// Growth factor of the last successful step (1 before the first).
    pub fn last_growth(&self) -> f64 { self.last_growth }

    /// Real parts of the current amplitudes.
    pub fn re(&self) -> nd::Array1<f64> { self.wf.re() }

    /// Imaginary parts of the current amplitudes.
    pub fn im(&self) -> nd::Array1<f64> { self.wf.im() }

    /// Magnitudes of the current amplitudes.
    pub fn abs(&self) -> nd::Array1<f64> { self.wf.abs() }

    /// Probability density of the current wave function.
    pub fn density(&self) -> nd::Array1<f64> { self.wf.density() }

    /// Copy of the current amplitudes.
    pub fn amplitudes(&self) -> nd::Array1<C64> { self.wf.to_array() }

    pub fn norm_sqr(&self) -> f64 { self.wf.norm_sqr(self.grid.dx()) }

    pub fn expect_x(&self) -> f64 { self.wf.expect_x(&self.grid) }

    pub fn expect_p(&self) -> f64 { self.wf.expect_p() }

    pub fn width(&self) -> f64 { self.wf.width(&self.grid) }

    /// Copy out the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            step: self.steps,
            time: self.time(),
            x: self.grid.x().to_owned(),
            re: self.re(),
            im: self.im(),
            abs: self.abs(),
            norm_sqr: self.norm_sqr(),
            status: self.status,
        }
    }

    /// Change the time-stepping scheme. Elapsed time is unaffected.
    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
    }

    /// Change the time step for subsequent steps.
    ///
    /// Elapsed time accumulated so far is kept.
    pub fn set_dt(&mut self, dt: f64) -> Result<(), ParamError> {
        ParamError::check_dt(dt)?;
        if dt != self.dt {
            self.t0 = self.time();
            self.steps_at_dt = 0;
            self.dt = dt;
            #[cfg(feature = "exact")]
            { self.exact = None; }
        }
        Ok(())
    }

    /// Replace the potential for subsequent steps.
    pub fn set_potential(&mut self, V: Potential) -> Result<(), PotentialError> {
        LengthError::check_len(self.grid.len(), V.len())?;
        self.V = V;
        #[cfg(feature = "exact")]
        { self.exact = None; }
        Ok(())
    }

    /// Start over from a new initial wave function at `t = 0`, clearing any
    /// failure.
    pub fn reset(&mut self, wf: WaveFunction) -> Result<(), Error> {
        self.wf = WaveFunction::from_amplitudes_with(
            &wf.amplitudes(), &self.grid, &self.normalizer)?;
        self.t0 = 0.0;
        self.steps = 0;
        self.steps_at_dt = 0;
        self.status = Status::Ready;
        self.last_growth = 1.0;
        self.last_unstable = false;
        Ok(())
    }

    // record a failure and hand it back
    fn fail(&mut self, err: EvolveError) -> EvolveError {
        self.status = Status::Failed(err);
        err
    }

    #[cfg_attr(not(feature = "exact"), allow(unused_variables))]
    fn propagate(&mut self, step: usize) -> Result<nd::Array1<C64>, EvolveError> {
        let dx = self.grid.dx();
        let V = self.V.values();
        let q = self.wf.amplitudes();
        match self.scheme {
            Scheme::Explicit
                => Ok(timedep::explicit_step(dx, &V, &q, self.dt)),
            Scheme::CrankNicolson
                => Ok(timedep::crank_nicolson_step(dx, &V, &q, self.dt)),
            Scheme::SplitStep
                => Ok(timedep::split_step(dx, &V, &q, self.dt)),
            #[cfg(feature = "exact")]
            Scheme::Exact => self.propagate_exact(step),
        }
    }

    #[cfg(feature = "exact")]
    fn propagate_exact(&mut self, step: usize)
        -> Result<nd::Array1<C64>, EvolveError>
    {
        let stale = self.exact.as_ref().map_or(true, |U| U.dt() != self.dt);
        if stale {
            let U
                = timedep::ExactPropagator::new(
                    self.grid.dx(), &self.V.values(), self.dt)
                .ok_or(EvolveError::Eigen { step })?;
            self.exact = Some(U);
        }
        self.exact.as_ref()
            .map(|U| U.apply(&self.wf.amplitudes()))
            .ok_or(EvolveError::Eigen { step })
    }

    /// Advance by a single time step.
    ///
    /// On success the wave function is replaced and elapsed time advances by
    /// `dt`. On failure the state moves to [`Status::Failed`] and the last
    /// valid wave function is kept. Stepping a failed state returns
    /// [`EvolveError::Failed`] and changes nothing.
    pub fn step(&mut self) -> EvolutionOutcome {
        if let Status::Failed(err) = self.status {
            return Err(err.to_failed());
        }
        let step = self.steps + 1;
        let dx = self.grid.dx();
        let before = self.wf.norm_sqr(dx);
        let mut q
            = match self.propagate(step) {
                Ok(q) => q,
                Err(err) => { return Err(self.fail(err)); },
            };
        let growth = wf_norm(&q, dx) / before;
        // NaN compares false, so it counts as unstable
        let unstable = !(growth <= self.threshold);
        if let Err(source) = self.normalizer.normalize(&mut q, dx) {
            let diverging
                = unstable || self.last_unstable || !source.norm_sqr().is_finite();
            let err = EvolveError::Normalization { step, growth, diverging, source };
            return Err(self.fail(err));
        }
        if unstable && self.policy == InstabilityPolicy::Halt {
            return Err(self.fail(EvolveError::Unstable { step, growth }));
        }
        self.wf = WaveFunction::from_normalized(q);
        self.steps = step;
        self.steps_at_dt += 1;
        self.last_growth = growth;
        self.last_unstable = unstable;
        Ok(StepReport { step, time: self.time(), growth, unstable })
    }

    /// Lazily advance by up to `n_steps` time steps.
    ///
    /// Steps are only taken as the returned iterator is advanced; dropping it
    /// early cancels the rest. The iterator ends after the first failure.
    pub fn run(&mut self, n_steps: usize) -> Run<'_> {
        Run { state: self, remaining: n_steps, done: false }
    }
}

/// Iterator over the outcomes of successive steps.
///
/// Created by [`SimulationState::run`].
#[derive(Debug)]
pub struct Run<'a> {
    state: &'a mut SimulationState,
    remaining: usize,
    done: bool,
}

impl<'a> Run<'a> {
    /// The state being evolved, as of the last outcome.
    pub fn state(&self) -> &SimulationState { self.state }

    /// Number of steps not yet attempted.
    pub fn remaining(&self) -> usize { if self.done { 0 } else { self.remaining } }
}

impl<'a> Iterator for Run<'a> {
    type Item = EvolutionOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 { return None; }
        self.remaining -= 1;
        let outcome = self.state.step();
        self.done = outcome.is_err();
        Some(outcome)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n.min(1), Some(n))
    }
}

impl<'a> FusedIterator for Run<'a> { }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::NormError,
        packet::GaussianPacket,
        potential::PotentialKind,
    };

    fn session(dt: f64) -> SimulationState {
        let grid = Grid::new(-10.0, 10.0, 500).unwrap();
        let V = Potential::evaluate(&grid, &PotentialKind::harmonic(1.0)).unwrap();
        let wf = GaussianPacket::new(0.0, 5.0, 1.0).unwrap().wavefunction(&grid).unwrap();
        SimulationState::new(grid, V, wf, dt).unwrap()
    }

    #[test]
    fn construction_checks_inputs() {
        let grid = Grid::new(-10.0, 10.0, 500).unwrap();
        let V = Potential::zeros(&grid);
        let wf = GaussianPacket::new(0.0, 5.0, 1.0).unwrap().wavefunction(&grid).unwrap();
        assert!(matches!(
            SimulationState::new(grid.clone(), V.clone(), wf.clone(), 0.0),
            Err(Error::Param(ParamError::BadTimeStep(_))),
        ));
        let small = Grid::new(-10.0, 10.0, 400).unwrap();
        assert!(matches!(
            SimulationState::new(grid.clone(), Potential::zeros(&small), wf.clone(), 0.01),
            Err(Error::Length(LengthError(500, 400))),
        ));
        assert!(matches!(
            SimulationState::new(small, V, wf, 0.01),
            Err(Error::Length(_)),
        ));
    }

    #[test]
    fn steps_advance_time_exactly() {
        let mut state = session(0.01);
        for k in 1..=25 {
            let report = state.step().unwrap();
            assert_eq!(report.step, k);
            assert_eq!(report.time, k as f64 * 0.01);
            assert!(!report.unstable);
            assert!((report.growth - 1.0).abs() < 1e-9);
        }
        assert_eq!(state.steps(), 25);
        assert_eq!(state.time(), 25.0 * 0.01);
    }

    #[test]
    fn changing_dt_keeps_elapsed_time() {
        let mut state = session(0.01);
        state.run(10).for_each(|outcome| { outcome.unwrap(); });
        state.set_dt(0.02).unwrap();
        state.run(5).for_each(|outcome| { outcome.unwrap(); });
        assert!((state.time() - 0.2).abs() < 1e-15);
        assert_eq!(state.steps(), 15);
        assert!(state.set_dt(-1.0).is_err());
        assert_eq!(state.dt(), 0.02);
    }

    #[test]
    fn halting_on_instability_keeps_last_state() {
        let mut state
            = session(1.0)
            .with_scheme(Scheme::Explicit)
            .with_instability(10.0, InstabilityPolicy::Halt)
            .unwrap();
        let before = state.amplitudes();
        let err = state.step().unwrap_err();
        assert!(matches!(err, EvolveError::Unstable { step: 1, growth } if growth > 10.0));
        assert!(state.is_failed());
        assert_eq!(state.amplitudes(), before);
        assert_eq!(state.steps(), 0);
        assert_eq!(state.time(), 0.0);
        assert_eq!(
            state.step(),
            Err(EvolveError::Failed { step: 1, diverging: true }),
        );
        assert_eq!(state.amplitudes(), before);
    }

    #[test]
    fn warning_on_instability_applies_step() {
        let mut state = session(1.0).with_scheme(Scheme::Explicit);
        let report = state.step().unwrap();
        assert!(report.unstable);
        assert!(report.growth > 10.0);
        assert_eq!(state.steps(), 1);
        assert!((state.norm_sqr() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_step_fails_and_reset_recovers() {
        // two points leave no interior, so every step zeroes the state
        let grid = Grid::new(-1.0, 1.0, 2).unwrap();
        let q = nd::array![C64::from(1.0), C64::from(1.0)];
        let wf = WaveFunction::from_amplitudes(&q, &grid).unwrap();
        let V = Potential::zeros(&grid);
        let mut state = SimulationState::new(grid, V, wf.clone(), 0.1).unwrap();
        let err = state.step().unwrap_err();
        assert!(matches!(
            err,
            EvolveError::Normalization {
                step: 1,
                diverging: false,
                source: NormError::Degenerate(_),
                ..
            },
        ));
        assert_eq!(state.status(), Status::Failed(err));
        assert_eq!(state.amplitudes(), wf.to_array());
        assert_eq!(state.step(), Err(EvolveError::Failed { step: 1, diverging: false }));

        state.reset(wf).unwrap();
        assert!(state.status().is_ready());
        assert_eq!(state.time(), 0.0);
    }

    #[test]
    fn run_is_lazy_and_stops_at_first_failure() {
        let mut state = session(0.01);
        {
            let mut run = state.run(10);
            assert_eq!(run.size_hint(), (1, Some(10)));
            run.next().unwrap().unwrap();
            run.next().unwrap().unwrap();
            assert_eq!(run.state().steps(), 2);
            assert_eq!(run.remaining(), 8);
        }
        assert_eq!(state.steps(), 2);

        let mut state
            = session(1.0)
            .with_scheme(Scheme::Explicit)
            .with_instability(10.0, InstabilityPolicy::Halt)
            .unwrap();
        let outcomes: Vec<EvolutionOutcome> = state.run(5).collect();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_err());
        let mut run = state.run(5);
        assert!(matches!(run.next(), Some(Err(EvolveError::Failed { .. }))));
        assert!(run.next().is_none());
        assert!(run.next().is_none());
    }

    #[test]
    fn snapshot_is_aligned_copy() {
        let mut state = session(0.01);
        state.step().unwrap();
        let snap = state.snapshot();
        assert_eq!(snap.step, 1);
        assert_eq!(snap.time, 0.01);
        assert_eq!(snap.x.len(), 500);
        assert_eq!(snap.re.len(), 500);
        assert_eq!(snap.abs, state.abs());
        assert!((snap.norm_sqr - 1.0).abs() < 1e-6);
        assert_eq!(snap.status, Status::Ready);
    }

    #[test]
    fn potential_replacement_is_checked() {
        let mut state = session(0.01);
        let other = Grid::new(-10.0, 10.0, 499).unwrap();
        assert!(matches!(
            state.set_potential(Potential::zeros(&other)),
            Err(PotentialError::Length(_)),
        ));
        let free = Potential::zeros(state.grid());
        state.set_potential(free).unwrap();
        assert_eq!(state.potential().max(), 0.0);
    }
}
