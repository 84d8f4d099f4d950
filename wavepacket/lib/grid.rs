//! Uniformly spaced one-dimensional spatial grids.
//!
//! ```
//! use wavepacket::grid::Grid;
//!
//! let grid = Grid::new(-5.0, 5.0, 11).unwrap();
//! assert_eq!(grid.dx(), 1.0);
//! assert_eq!(grid.x()[5], 0.0);
//! ```

use ndarray as nd;
use crate::error::GridError;

pub type GridResult<T> = Result<T, GridError>;

/// A discretized spatial domain `x[i] = x_min + i dx` for `i` in `0..n`.
///
/// Immutable once constructed; the end points are stored exactly, so that
/// `x[0] == x_min` and `x[n - 1] == x_max`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    x_min: f64,
    x_max: f64,
    dx: f64,
    x: nd::Array1<f64>,
}

impl Grid {
    /// Construct a grid of `n` points spanning `[x_min, x_max]`.
    pub fn new(x_min: f64, x_max: f64, n: usize) -> GridResult<Self> {
        let dx = Self::check(x_min, x_max, n)?;
        let mut x: nd::Array1<f64>
            = (0..n).map(|i| x_min + i as f64 * dx).collect();
        x[n - 1] = x_max;
        Ok(Self { x_min, x_max, dx, x })
    }

    /// Check that a grid can be constructed without constructing it,
    /// returning the spacing it would have.
    pub fn check(x_min: f64, x_max: f64, n: usize) -> GridResult<f64> {
        GridError::check(x_min, x_max, n)?;
        let dx = (x_max - x_min) / (n - 1) as f64;
        (dx.is_finite() && dx > 0.0).then_some(dx)
            .ok_or(GridError::BadSpacing(dx))
    }

    /// Number of grid points.
    pub fn len(&self) -> usize { self.x.len() }

    /// Always `false`; grids have at least two points.
    pub fn is_empty(&self) -> bool { false }

    /// Grid spacing.
    pub fn dx(&self) -> f64 { self.dx }

    /// Lower bound of the domain.
    pub fn x_min(&self) -> f64 { self.x_min }

    /// Upper bound of the domain.
    pub fn x_max(&self) -> f64 { self.x_max }

    /// Width of the domain.
    pub fn width(&self) -> f64 { self.x_max - self.x_min }

    /// View of the coordinate array.
    pub fn x(&self) -> nd::ArrayView1<'_, f64> { self.x.view() }

    /// Return `true` if `x` lies within the closed domain.
    pub fn contains(&self, x: f64) -> bool {
        (self.x_min..=self.x_max).contains(&x)
    }

    /// Index of the grid point nearest to `x`, clamped to the domain.
    ///
    /// Returns `None` if `x` is NaN.
    pub fn nearest_index(&self, x: f64) -> Option<usize> {
        if x.is_nan() { return None; }
        let r = ((x - self.x_min) / self.dx).round();
        let last = (self.len() - 1) as f64;
        Some(r.clamp(0.0, last) as usize)
    }
}

/// Construct a [`Grid`]; free-function spelling of [`Grid::new`].
pub fn make_grid(x_min: f64, x_max: f64, n: usize) -> GridResult<Grid> {
    Grid::new(x_min, x_max, n)
}
