//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow]. Library
//! code never logs; every failure is returned to the caller as one of these.
//!
//! [anyhow]: https://crates.io/crates/anyhow

use std::path::PathBuf;
use ndarray as nd;
use thiserror::Error;

/// Returned when an operation requiring equal-length arrays encounters arrays
/// with unequal length.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("encountered arrays with incompatible lengths; got {0} and {1}")]
pub struct LengthError(pub usize, pub usize);

impl LengthError {
    pub(crate) fn check<S, A, T, B>(
        a: &nd::ArrayBase<S, nd::Ix1>,
        b: &nd::ArrayBase<T, nd::Ix1>,
    ) -> Result<(), Self>
    where
        S: nd::Data<Elem = A>,
        T: nd::Data<Elem = B>,
    {
        Self::check_len(a.len(), b.len())
    }

    pub(crate) fn check_len(na: usize, nb: usize) -> Result<(), Self> {
        (na == nb).then_some(()).ok_or(Self(na, nb))
    }
}

/// Returned when a spatial grid cannot be constructed.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum GridError {
    /// Returned when fewer than two grid points are requested.
    #[error("grid needs at least 2 points; got {0}")]
    TooFewPoints(usize),

    /// Returned when `x_min >= x_max`.
    #[error("grid bounds must satisfy x_min < x_max; got x_min = {0}, x_max = {1}")]
    BadBounds(f64, f64),

    /// Returned when either bound is NaN or infinite.
    #[error("grid bounds must be finite; got x_min = {0}, x_max = {1}")]
    NonFinite(f64, f64),

    /// Returned when the spacing is not representable, i.e. the domain is so
    /// narrow relative to the point count that `dx` underflows, or so wide that
    /// it overflows.
    #[error("grid spacing must be positive and finite; got dx = {0}")]
    BadSpacing(f64),
}

impl GridError {
    pub(crate) fn check(x_min: f64, x_max: f64, n: usize) -> Result<(), Self> {
        (n >= 2).then_some(()).ok_or(Self::TooFewPoints(n))?;
        (x_min.is_finite() && x_max.is_finite()).then_some(())
            .ok_or(Self::NonFinite(x_min, x_max))?;
        (x_min < x_max).then_some(()).ok_or(Self::BadBounds(x_min, x_max))
    }
}

/// Returned when a physical or numerical parameter lies outside its
/// mathematically valid range.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum ParamError {
    /// Returned when a wave packet width is zero, negative, or non-finite.
    #[error("wave packet width must be positive and finite; got sigma = {0}")]
    BadSigma(f64),

    /// Returned when a harmonic spring constant is negative or non-finite.
    #[error("spring constant must be non-negative and finite; got k = {0}")]
    BadSpring(f64),

    /// Returned when a time step is zero, negative, or non-finite.
    #[error("time step must be positive and finite; got dt = {0}")]
    BadTimeStep(f64),

    /// Returned when a square barrier has a non-finite height or an empty
    /// extent.
    #[error("barrier needs a finite height and left < right; got height = {height} on [{left}, {right}]")]
    BadBarrier { height: f64, left: f64, right: f64 },

    /// Returned when a normalization tolerance or floor is non-positive or
    /// non-finite.
    #[error("normalization tolerances must be positive and finite; got {0}")]
    BadTolerance(f64),

    /// Returned when an instability growth threshold is not a finite number
    /// greater than 1.
    #[error("instability threshold must be finite and greater than 1; got {0}")]
    BadThreshold(f64),

    /// Returned when a parameter that only needs to be finite is not.
    #[error("parameter `{name}` must be finite; got {value}")]
    NonFinite { name: &'static str, value: f64 },
}

impl ParamError {
    pub(crate) fn check_finite(name: &'static str, value: f64)
        -> Result<(), Self>
    {
        value.is_finite().then_some(()).ok_or(Self::NonFinite { name, value })
    }

    pub(crate) fn check_sigma(sigma: f64) -> Result<(), Self> {
        (sigma.is_finite() && sigma > 0.0).then_some(())
            .ok_or(Self::BadSigma(sigma))
    }

    pub(crate) fn check_spring(k: f64) -> Result<(), Self> {
        (k.is_finite() && k >= 0.0).then_some(()).ok_or(Self::BadSpring(k))
    }

    pub(crate) fn check_dt(dt: f64) -> Result<(), Self> {
        (dt.is_finite() && dt > 0.0).then_some(()).ok_or(Self::BadTimeStep(dt))
    }

    pub(crate) fn check_tolerance(tol: f64) -> Result<(), Self> {
        (tol.is_finite() && tol > 0.0).then_some(())
            .ok_or(Self::BadTolerance(tol))
    }

    pub(crate) fn check_threshold(threshold: f64) -> Result<(), Self> {
        (threshold.is_finite() && threshold > 1.0).then_some(())
            .ok_or(Self::BadThreshold(threshold))
    }
}

/// Returned when a potential expression cannot be parsed.
///
/// Offsets are byte offsets into the expression text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExprError {
    /// The expression contains no tokens.
    #[error("expression is empty")]
    Empty,

    /// A character outside the expression alphabet.
    #[error("unexpected character {ch:?} at offset {offset}")]
    BadChar { offset: usize, ch: char },

    /// A numeric literal that does not parse as a float.
    #[error("malformed number {text:?} at offset {offset}")]
    BadNumber { offset: usize, text: String },

    /// An identifier that is neither `x`, a known constant, nor an allowed
    /// function.
    #[error("unknown identifier {name:?} at offset {offset}")]
    UnknownIdent { offset: usize, name: String },

    /// A token appearing where something else was required.
    #[error("unexpected token at offset {offset}; expected {expected}")]
    Unexpected { offset: usize, expected: &'static str },

    /// The expression ended early.
    #[error("unexpected end of expression; expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// Nesting at `offset` goes deeper than [`MAX_DEPTH`][crate::expr::MAX_DEPTH].
    #[error("expression is nested too deeply at offset {offset}")]
    TooDeep { offset: usize },
}

/// Returned when a parsed expression cannot be evaluated at a point.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,

    /// A function was applied outside its domain.
    #[error("`{func}` is undefined at {arg}")]
    Domain { func: &'static str, arg: f64 },

    /// The result overflowed or is otherwise not a finite number.
    #[error("result is not finite")]
    NonFinite,
}

/// Returned from potential evaluation.
///
/// A potential is either produced for every grid point or not at all.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PotentialError {
    /// [`ParamError`]
    #[error("invalid potential parameter: {0}")]
    Param(#[from] ParamError),

    /// [`ExprError`]
    #[error("could not parse potential expression: {0}")]
    Expression(#[from] ExprError),

    /// Returned when a custom expression fails at some grid point.
    #[error("potential evaluation failed at grid point {index} (x = {x}): {source}")]
    Evaluation { index: usize, x: f64, source: EvalError },

    /// Returned when a user-supplied potential array contains a NaN or
    /// infinity.
    #[error("potential value at grid point {index} (x = {x}) is not finite")]
    NonFinite { index: usize, x: f64 },

    /// Returned when a user-supplied potential array does not match the grid.
    #[error("custom potential must match the spatial grid size: {0}")]
    Length(#[from] LengthError),
}

/// Returned from the normalizer when a wave function's norm is zero or
/// invalid.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum NormError {
    /// The norm² is at or below the degeneracy floor (typically underflow).
    #[error("norm is zero or invalid: norm² = {0:e} is at or below the floor")]
    Degenerate(f64),

    /// The norm² is NaN or infinite.
    #[error("norm is zero or invalid: norm² = {0}")]
    Invalid(f64),

    /// Rescaling failed to bring the norm² within tolerance of 1.
    #[error("normalized norm² = {0} is outside tolerance")]
    Tolerance(f64),
}

impl NormError {
    /// The offending norm².
    pub fn norm_sqr(&self) -> f64 {
        match self {
            Self::Degenerate(n) | Self::Invalid(n) | Self::Tolerance(n) => *n,
        }
    }
}

/// Returned from a single evolution step.
///
/// Every variant records whether the failure looks like a divergence of the
/// time-stepping scheme (as opposed to a state that decayed to nothing),
/// which is what [`Diagnosis`][crate::diagnostics::Diagnosis] reports on.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum EvolveError {
    /// The propagated state could not be normalized. `growth` is the raw
    /// norm² growth factor of the failed step (possibly NaN or infinite).
    /// `diverging` is set when this or the previous step grew by more than
    /// the instability threshold, or when the norm² is non-finite.
    #[error("step {step}: {source}")]
    Normalization {
        step: usize,
        growth: f64,
        diverging: bool,
        source: NormError,
    },

    /// The norm² grew by more than the configured threshold in a single
    /// step, and the state's policy is to halt on instability.
    #[error("step {step}: norm² grew by a factor of {growth:e} in one step; the scheme is unstable at this time step")]
    Unstable { step: usize, growth: f64 },

    /// The dense eigendecomposition of the Hamiltonian failed.
    #[cfg(feature = "exact")]
    #[error("step {step}: could not diagonalize the Hamiltonian")]
    Eigen { step: usize },

    /// The state failed at step `step` and must be reset before stepping
    /// again.
    #[error("simulation failed at step {step}; reset it with a new initial state before stepping")]
    Failed { step: usize, diverging: bool },
}

impl EvolveError {
    /// Index of the step that failed.
    pub fn step(&self) -> usize {
        match self {
            Self::Normalization { step, .. } => *step,
            Self::Unstable { step, .. } => *step,
            #[cfg(feature = "exact")]
            Self::Eigen { step } => *step,
            Self::Failed { step, .. } => *step,
        }
    }

    /// Return `true` if the failure is a numerical divergence.
    pub fn is_diverging(&self) -> bool {
        match self {
            Self::Normalization { diverging, .. } => *diverging,
            Self::Unstable { .. } => true,
            #[cfg(feature = "exact")]
            Self::Eigen { .. } => true,
            Self::Failed { diverging, .. } => *diverging,
        }
    }

    // the error reported for any step attempted after this one
    pub(crate) fn to_failed(self) -> Self {
        match self {
            Self::Failed { .. } => self,
            other => Self::Failed {
                step: other.step(),
                diverging: other.is_diverging(),
            },
        }
    }
}

/// Returned when a configuration file cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Umbrella error for the collaborator-facing entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// [`GridError`]
    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),

    /// [`ParamError`]
    #[error("invalid parameter: {0}")]
    Param(#[from] ParamError),

    /// [`PotentialError`]
    #[error("potential error: {0}")]
    Potential(#[from] PotentialError),

    /// [`NormError`]
    #[error("normalization error: {0}")]
    Norm(#[from] NormError),

    /// [`EvolveError`]
    #[error("evolution error: {0}")]
    Evolve(#[from] EvolveError),

    /// [`LengthError`]
    #[error("array length error: {0}")]
    Length(#[from] LengthError),

    /// [`ConfigError`]
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_checks_in_order() {
        assert_eq!(GridError::check(0.0, 1.0, 1), Err(GridError::TooFewPoints(1)));
        assert!(matches!(
            GridError::check(f64::NAN, 1.0, 10),
            Err(GridError::NonFinite(..)),
        ));
        assert!(matches!(
            GridError::check(f64::NEG_INFINITY, 1.0, 10),
            Err(GridError::NonFinite(..)),
        ));
        assert_eq!(GridError::check(1.0, 1.0, 10), Err(GridError::BadBounds(1.0, 1.0)));
        assert!(GridError::check(-1.0, 1.0, 2).is_ok());
    }

    #[test]
    fn param_checks() {
        assert!(ParamError::check_sigma(1.0).is_ok());
        assert_eq!(ParamError::check_sigma(0.0), Err(ParamError::BadSigma(0.0)));
        assert_eq!(ParamError::check_sigma(-1.0), Err(ParamError::BadSigma(-1.0)));
        assert!(ParamError::check_spring(0.0).is_ok());
        assert_eq!(ParamError::check_spring(-0.5), Err(ParamError::BadSpring(-0.5)));
        assert!(ParamError::check_dt(f64::INFINITY).is_err());
        assert!(ParamError::check_threshold(1.0).is_err());
        assert!(ParamError::check_threshold(10.0).is_ok());
    }

    #[test]
    fn norm_error_reports_value() {
        let err = NormError::Degenerate(0.0);
        assert_eq!(err.norm_sqr(), 0.0);
        assert!(err.to_string().contains("norm is zero or invalid"));
        assert!(NormError::Invalid(f64::NAN).norm_sqr().is_nan());
    }

    #[test]
    fn evaluation_error_names_point() {
        let err = PotentialError::Evaluation {
            index: 5,
            x: 0.0,
            source: EvalError::DivisionByZero,
        };
        let msg = err.to_string();
        assert!(msg.contains("grid point 5"));
        assert!(msg.contains("x = 0"));
        assert!(msg.contains("division by zero"));
    }

    #[test]
    fn failed_state_remembers_cause() {
        let err = EvolveError::Normalization {
            step: 7,
            growth: f64::INFINITY,
            diverging: true,
            source: NormError::Invalid(f64::INFINITY),
        };
        assert_eq!(err.to_failed(), EvolveError::Failed { step: 7, diverging: true });
        assert_eq!(err.to_failed().to_failed(), err.to_failed());
        assert!(EvolveError::Unstable { step: 1, growth: 100.0 }.is_diverging());
    }
}
