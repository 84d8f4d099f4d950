//! Static potentials sampled over a [`Grid`].
//!
//! A [`Potential`] is produced for every grid point or not at all: any
//! failure while evaluating a custom expression aborts the whole evaluation
//! and names the first offending point.

use ndarray as nd;
use serde::{ Deserialize, Serialize };
use crate::{
    Arr1,
    error::{ LengthError, ParamError, PotentialError },
    expr::Expr,
    grid::Grid,
};

pub type PotResult<T> = Result<T, PotentialError>;

/// Description of a potential, independent of any grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PotentialKind {
    /// `V(x) = 0`.
    Free,
    /// `V(x) = k (x - center)² / 2`, with `k ≥ 0`.
    Harmonic {
        k: f64,
        #[serde(default)]
        center: f64,
    },
    /// `V(x) = height` for `left ≤ x ≤ right`, zero elsewhere.
    Barrier {
        height: f64,
        left: f64,
        right: f64,
    },
    /// A user expression of `x`; see [`expr`][crate::expr] for the grammar.
    Custom {
        expression: String,
    },
}

impl Default for PotentialKind {
    fn default() -> Self { Self::harmonic(1.0) }
}

impl PotentialKind {
    /// Harmonic potential centered on the origin.
    pub fn harmonic(k: f64) -> Self { Self::Harmonic { k, center: 0.0 } }

    /// Custom expression potential.
    pub fn custom<S>(expression: S) -> Self
    where S: Into<String>
    {
        Self::Custom { expression: expression.into() }
    }

    /// Check parameters without evaluating anything.
    ///
    /// Custom expressions are parsed (but not evaluated) here.
    pub fn validate(&self) -> PotResult<()> {
        match self {
            Self::Free => Ok(()),
            Self::Harmonic { k, center } => {
                ParamError::check_spring(*k)?;
                ParamError::check_finite("center", *center)?;
                Ok(())
            },
            Self::Barrier { height, left, right } => {
                let ok
                    = height.is_finite() && left.is_finite()
                    && right.is_finite() && left < right;
                ok.then_some(())
                    .ok_or(ParamError::BadBarrier {
                        height: *height,
                        left: *left,
                        right: *right,
                    })?;
                Ok(())
            },
            Self::Custom { expression } => {
                Expr::parse(expression)?;
                Ok(())
            },
        }
    }
}

/// A real-valued, finite potential aligned index-for-index with a grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Potential {
    V: nd::Array1<f64>,
}

impl Potential {
    /// Sample a potential over a grid.
    pub fn evaluate(grid: &Grid, kind: &PotentialKind) -> PotResult<Self> {
        kind.validate()?;
        let x = grid.x();
        let V: nd::Array1<f64>
            = match kind {
                PotentialKind::Free => nd::Array1::zeros(x.len()),
                PotentialKind::Harmonic { k, center }
                    => x.mapv(|xk| 0.5 * k * (xk - center).powi(2)),
                PotentialKind::Barrier { height, left, right }
                    => x.mapv(|xk| {
                        if (*left..=*right).contains(&xk) { *height } else { 0.0 }
                    }),
                PotentialKind::Custom { expression } => {
                    let expr = Expr::parse(expression)?;
                    return Self::from_expr(grid, &expr);
                },
            };
        Self::check_finite(grid, &V)?;
        Ok(Self { V })
    }

    // first non-finite sample, if any
    fn check_finite<S>(grid: &Grid, values: &Arr1<S>) -> PotResult<()>
    where S: nd::Data<Elem = f64>
    {
        match grid.x().iter().zip(values).enumerate()
            .find(|(_, (_, v))| !v.is_finite())
        {
            Some((index, (&x, _))) => Err(PotentialError::NonFinite { index, x }),
            None => Ok(()),
        }
    }

    /// Sample a parsed expression over a grid.
    pub fn from_expr(grid: &Grid, expr: &Expr) -> PotResult<Self> {
        let V: Vec<f64>
            = grid.x().iter().enumerate()
            .map(|(index, &x)| {
                expr.eval(x)
                    .map_err(|source| {
                        PotentialError::Evaluation { index, x, source }
                    })
            })
            .collect::<PotResult<_>>()?;
        Ok(Self { V: nd::Array1::from_vec(V) })
    }

    /// Take a user-supplied array of values.
    ///
    /// The array must match the grid size and contain only finite values.
    pub fn from_values<S>(grid: &Grid, values: &Arr1<S>) -> PotResult<Self>
    where S: nd::Data<Elem = f64>
    {
        LengthError::check(&grid.x(), values)?;
        Self::check_finite(grid, values)?;
        Ok(Self { V: values.to_owned() })
    }

    /// The zero potential.
    pub fn zeros(grid: &Grid) -> Self {
        Self { V: nd::Array1::zeros(grid.len()) }
    }

    /// Number of points.
    pub fn len(&self) -> usize { self.V.len() }

    /// Return `true` if there are no points.
    pub fn is_empty(&self) -> bool { self.V.is_empty() }

    /// View of the sampled values.
    pub fn values(&self) -> nd::ArrayView1<'_, f64> { self.V.view() }

    /// Smallest sampled value.
    pub fn min(&self) -> f64 { self.V.iter().copied().fold(f64::INFINITY, f64::min) }

    /// Largest sampled value.
    pub fn max(&self) -> f64 {
        self.V.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Sample a potential over a grid; free-function spelling of
/// [`Potential::evaluate`].
pub fn evaluate_potential(grid: &Grid, kind: &PotentialKind)
    -> PotResult<Potential>
{
    Potential::evaluate(grid, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    fn grid() -> Grid { Grid::new(-5.0, 5.0, 11).unwrap() }

    #[test]
    fn harmonic_values() {
        let V = Potential::evaluate(&grid(), &PotentialKind::harmonic(2.0)).unwrap();
        assert_eq!(V.len(), 11);
        assert_eq!(V.values()[0], 25.0);
        assert_eq!(V.values()[5], 0.0);
        assert_eq!(V.values()[7], 4.0);
        assert_eq!(V.min(), 0.0);
        assert_eq!(V.max(), 25.0);

        let shifted
            = Potential::evaluate(
                &grid(), &PotentialKind::Harmonic { k: 2.0, center: 1.0 })
            .unwrap();
        assert_eq!(shifted.values()[6], 0.0);
    }

    #[test]
    fn built_ins_are_deterministic() {
        let kind = PotentialKind::harmonic(0.7);
        let a = Potential::evaluate(&grid(), &kind).unwrap();
        let b = Potential::evaluate(&grid(), &kind).unwrap();
        assert!(a.values().iter().zip(b.values()).all(|(l, r)| l.to_bits() == r.to_bits()));
    }

    #[test]
    fn negative_spring_constant_is_rejected() {
        assert_eq!(
            Potential::evaluate(&grid(), &PotentialKind::harmonic(-1.0)),
            Err(PotentialError::Param(ParamError::BadSpring(-1.0))),
        );
    }

    #[test]
    fn overflowing_built_in_is_rejected() {
        assert_eq!(
            Potential::evaluate(&grid(), &PotentialKind::harmonic(1e308)),
            Err(PotentialError::NonFinite { index: 0, x: -5.0 }),
        );
        let tall = PotentialKind::Barrier { height: f64::MAX, left: -1.0, right: 1.0 };
        assert!(Potential::evaluate(&grid(), &tall).is_ok());
    }

    #[test]
    fn barrier_and_free() {
        let kind = PotentialKind::Barrier { height: 3.0, left: -1.0, right: 1.0 };
        let V = Potential::evaluate(&grid(), &kind).unwrap();
        assert_eq!(
            V.values().to_vec(),
            vec![0.0, 0.0, 0.0, 0.0, 3.0, 3.0, 3.0, 0.0, 0.0, 0.0, 0.0],
        );
        let bad = PotentialKind::Barrier { height: 3.0, left: 1.0, right: 1.0 };
        assert!(matches!(
            Potential::evaluate(&grid(), &bad),
            Err(PotentialError::Param(ParamError::BadBarrier { .. })),
        ));
        let free = Potential::evaluate(&grid(), &PotentialKind::Free).unwrap();
        assert!(free.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn custom_matches_built_in() {
        let custom
            = Potential::evaluate(&grid(), &PotentialKind::custom("0.5 * 2 * x**2"))
            .unwrap();
        let harmonic
            = Potential::evaluate(&grid(), &PotentialKind::harmonic(2.0)).unwrap();
        assert!(
            custom.values().iter().zip(harmonic.values())
                .all(|(c, h)| (c - h).abs() < 1e-12)
        );
    }

    #[test]
    fn custom_failure_names_point() {
        let err
            = Potential::evaluate(&grid(), &PotentialKind::custom("1/x"))
            .unwrap_err();
        assert_eq!(
            err,
            PotentialError::Evaluation {
                index: 5,
                x: 0.0,
                source: EvalError::DivisionByZero,
            },
        );
        assert!(matches!(
            Potential::evaluate(&grid(), &PotentialKind::custom("sqrt(x)")),
            Err(PotentialError::Evaluation { index: 0, .. }),
        ));
        assert!(matches!(
            Potential::evaluate(&grid(), &PotentialKind::custom("x + y")),
            Err(PotentialError::Expression(_)),
        ));
    }

    #[test]
    fn user_values_are_checked() {
        let g = grid();
        assert!(matches!(
            Potential::from_values(&g, &nd::Array1::<f64>::zeros(10)),
            Err(PotentialError::Length(LengthError(11, 10))),
        ));
        let mut values = nd::Array1::<f64>::zeros(11);
        values[3] = f64::NAN;
        assert_eq!(
            Potential::from_values(&g, &values),
            Err(PotentialError::NonFinite { index: 3, x: -2.0 }),
        );
        values[3] = 1.0;
        assert_eq!(Potential::from_values(&g, &values).unwrap().values()[3], 1.0);
    }
}
