//! Property-based tests using proptest.
//!
//! Covers: grid construction invariants, normalization, packet
//! initialization, expression evaluation, and norm conservation of the
//! unitary schemes.

use ndarray as nd;
use num_complex::Complex64 as C64;
use proptest::prelude::*;
use wavepacket::{
    expr::Expr,
    timedep,
    utils::{ wf_norm, wf_normalized, Normalizer },
    Grid,
    GaussianPacket,
    Potential,
    PotentialKind,
};

// ── Grid ─────────────────────────────────────────────────────────────

proptest! {
    /// Spacing and end points are exact.
    #[test]
    fn grid_spacing_and_ends(
        x_min in -100.0f64..0.0,
        width in 0.1f64..200.0,
        n in 2usize..2000,
    ) {
        let x_max = x_min + width;
        let grid = Grid::new(x_min, x_max, n).unwrap();
        prop_assert_eq!(grid.len(), n);
        prop_assert_eq!(grid.dx(), (x_max - x_min) / (n - 1) as f64);
        prop_assert_eq!(grid.x()[0], x_min);
        prop_assert_eq!(grid.x()[n - 1], x_max);
        prop_assert!(grid.x().iter().zip(grid.x().iter().skip(1)).all(|(a, b)| b > a));
    }

    /// Reversed or empty domains are rejected.
    #[test]
    fn grid_rejects_bad_bounds(x in -100.0f64..100.0, d in 0.0f64..10.0, n in 2usize..100) {
        prop_assert!(Grid::new(x, x - d, n).is_err());
    }
}

// ── Normalization ────────────────────────────────────────────────────

fn amplitudes() -> impl Strategy<Value = nd::Array1<C64>> {
    prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 2..128)
        .prop_map(|v| v.into_iter().map(|(re, im)| C64::new(re, im)).collect())
}

proptest! {
    /// Normalization brings the norm within tolerance of 1 and is idempotent.
    #[test]
    fn normalize_then_renormalize(q in amplitudes(), dx in 1e-3f64..1.0) {
        prop_assume!(wf_norm(&q, dx) > 1e-6);
        let q1 = wf_normalized(&q, dx).unwrap();
        prop_assert!((wf_norm(&q1, dx) - 1.0).abs() < 1e-6);
        let q2 = wf_normalized(&q1, dx).unwrap();
        prop_assert!(q1.iter().zip(&q2).all(|(a, b)| (a - b).norm() < 1e-9));
    }

    /// Failed normalization leaves the input untouched.
    #[test]
    fn failed_normalize_is_a_no_op(n in 2usize..64, scale in 0.0f64..1e-7) {
        let mut q: nd::Array1<C64> = nd::Array1::from_elem(n, C64::new(scale, 0.0));
        let before = q.clone();
        prop_assert!(Normalizer::default().normalize(&mut q, 1e-3).is_err());
        prop_assert_eq!(q, before);
    }

    /// Gaussian packets resolved by the grid initialize normalized.
    #[test]
    fn packets_are_normalized(
        x0 in -5.0f64..5.0,
        k0 in -5.0f64..5.0,
        sigma in 0.5f64..3.0,
    ) {
        let grid = Grid::new(-20.0, 20.0, 801).unwrap();
        let wf = GaussianPacket::new(x0, k0, sigma).unwrap().wavefunction(&grid).unwrap();
        prop_assert!((wf.norm_sqr(grid.dx()) - 1.0).abs() < 1e-6);
        prop_assert!((wf.expect_x(&grid) - x0).abs() < 1e-6);
    }
}

// ── Expressions ──────────────────────────────────────────────────────

proptest! {
    /// Quadratic expressions evaluate like the equivalent Rust code.
    #[test]
    fn quadratic_expression(a in -10.0f64..10.0, b in -10.0f64..10.0, x in -10.0f64..10.0) {
        let expr = Expr::parse(&format!("{a} * x^2 + {b}")).unwrap();
        let expected = a * x * x + b;
        let got = expr.eval(x).unwrap();
        prop_assert!((got - expected).abs() <= 1e-12 * expected.abs().max(1.0));
    }

    /// Custom potentials agree with the built-in harmonic potential.
    #[test]
    fn custom_matches_harmonic(k in 0.0f64..10.0) {
        let grid = Grid::new(-10.0, 10.0, 101).unwrap();
        let custom
            = Potential::evaluate(&grid, &PotentialKind::custom(format!("0.5 * {k} * x**2")))
            .unwrap();
        let builtin = Potential::evaluate(&grid, &PotentialKind::harmonic(k)).unwrap();
        prop_assert!(
            custom.values().iter().zip(builtin.values())
                .all(|(c, h)| (c - h).abs() <= 1e-10 * h.abs().max(1.0))
        );
    }
}

// ── Unitary schemes ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Crank-Nicolson conserves the norm for any time step.
    #[test]
    fn crank_nicolson_is_unitary(k in 0.0f64..5.0, dt in 1e-3f64..10.0) {
        let grid = Grid::new(-10.0, 10.0, 300).unwrap();
        let V = Potential::evaluate(&grid, &PotentialKind::harmonic(k)).unwrap();
        let wf = GaussianPacket::new(1.0, 2.0, 1.0).unwrap().wavefunction(&grid).unwrap();
        let q = timedep::crank_nicolson_step(grid.dx(), &V.values(), &wf.amplitudes(), dt);
        prop_assert!((wf_norm(&q, grid.dx()) - 1.0).abs() < 1e-6);
    }
}
