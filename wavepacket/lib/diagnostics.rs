//! Classification of outcomes for display.
//!
//! Maps every outcome of initialization and evolution to one of four
//! human-facing categories, each with a suggested remedy.

use std::fmt;
use crate::{
    error::{ Error, EvolveError, NormError },
    evolve::EvolutionOutcome,
};

/// Human-facing category of an outcome.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Diagnosis {
    /// Nothing is wrong.
    Valid,
    /// The wave function's norm vanished, typically through underflow of a
    /// packet much narrower than the grid spacing.
    DegenerateNorm,
    /// The time-stepping scheme is diverging.
    NumericalInstability,
    /// An input was rejected before any computation.
    ParameterError,
}

impl Diagnosis {
    /// Classify the outcome of a single step.
    ///
    /// A successful but flagged step is an instability.
    pub fn of_outcome(outcome: &EvolutionOutcome) -> Self {
        match outcome {
            Ok(report) if report.unstable => Self::NumericalInstability,
            Ok(_) => Self::Valid,
            Err(err) => Self::of_evolve_error(err),
        }
    }

    /// Classify an evolution error.
    pub fn of_evolve_error(err: &EvolveError) -> Self {
        if err.is_diverging() {
            Self::NumericalInstability
        } else {
            Self::DegenerateNorm
        }
    }

    /// Classify a normalization error outside of evolution.
    pub fn of_norm_error(err: &NormError) -> Self {
        match err {
            NormError::Degenerate(_) => Self::DegenerateNorm,
            NormError::Invalid(_) | NormError::Tolerance(_)
                => Self::NumericalInstability,
        }
    }

    /// Classify any crate error.
    pub fn of_error(err: &Error) -> Self {
        match err {
            Error::Norm(e) => Self::of_norm_error(e),
            Error::Evolve(e) => Self::of_evolve_error(e),
            Error::Grid(_)
            | Error::Param(_)
            | Error::Potential(_)
            | Error::Length(_)
            | Error::Config(_)
                => Self::ParameterError,
        }
    }

    pub fn is_valid(self) -> bool { self == Self::Valid }

    /// Short label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::DegenerateNorm => "degenerate norm",
            Self::NumericalInstability => "numerical instability",
            Self::ParameterError => "parameter error",
        }
    }

    /// Suggested user action, if any.
    pub fn remediation(self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::DegenerateNorm => Some(
                "refine or widen the grid, or increase the packet width"),
            Self::NumericalInstability => Some(
                "reduce dt or switch to an unconditionally stable scheme"),
            Self::ParameterError => Some(
                "check the potential and packet parameters"),
        }
    }

    // ordering for `worst`
    fn severity(self) -> u8 {
        match self {
            Self::Valid => 0,
            Self::NumericalInstability => 1,
            Self::DegenerateNorm => 2,
            Self::ParameterError => 3,
        }
    }

    /// Most severe of a series of diagnoses, or `Valid` if there are none.
    pub fn worst<I>(diagnoses: I) -> Self
    where I: IntoIterator<Item = Self>
    {
        diagnoses.into_iter()
            .max_by_key(|d| d.severity())
            .unwrap_or(Self::Valid)
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remediation() {
            Some(fix) => write!(f, "{}: {}", self.label(), fix),
            None => f.write_str(self.label()),
        }
    }
}

/// Classify the outcome of a single step; free-function spelling of
/// [`Diagnosis::of_outcome`].
pub fn classify(outcome: &EvolutionOutcome) -> Diagnosis {
    Diagnosis::of_outcome(outcome)
}
