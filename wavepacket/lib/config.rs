//! TOML configuration for a simulation session.
//!
//! Every table and field is optional; missing values take the defaults below.
//! ```toml
//! [grid]
//! x_min = -10.0
//! x_max = 10.0
//! n = 500
//!
//! [packet]
//! # x0 = 0.0  # defaults to the middle of the grid
//! k0 = 5.0
//! sigma = 1.0
//!
//! [potential]
//! kind = "harmonic"  # "free", "harmonic", "barrier", or "custom"
//! k = 1.0
//!
//! [evolution]
//! dt = 0.01
//! steps = 200
//! scheme = "crank-nicolson"  # "explicit", "crank-nicolson", "split-step"
//! tolerance = 1e-6
//! norm_floor = 1e-12
//! instability_threshold = 10.0
//! on_instability = "warn"  # or "halt"
//! ```
//!
//! All options are validated when the session is [built][SimConfig::build],
//! before any arrays are computed.

use std::{ fs, path::Path };
use serde::{ Deserialize, Serialize };
use crate::{
    DEF_INSTABILITY_GROWTH,
    DEF_NORM_FLOOR,
    DEF_TOLERANCE,
    error::{ ConfigError, Error, GridError, ParamError, PotentialError },
    evolve::{ InstabilityPolicy, SimulationState },
    grid::Grid,
    packet::GaussianPacket,
    potential::{ Potential, PotentialKind },
    timedep::Scheme,
    utils::Normalizer,
};

/// Spatial grid options.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub n: usize,
}

impl Default for GridConfig {
    fn default() -> Self { Self { x_min: -10.0, x_max: 10.0, n: 500 } }
}

/// Initial wave packet options.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketConfig {
    /// Initial center; `None` for the middle of the grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x0: Option<f64>,
    pub k0: f64,
    pub sigma: f64,
}

impl Default for PacketConfig {
    fn default() -> Self { Self { x0: None, k0: 5.0, sigma: 1.0 } }
}

/// Time-stepping options.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub dt: f64,
    pub steps: usize,
    pub scheme: Scheme,
    pub tolerance: f64,
    pub norm_floor: f64,
    pub instability_threshold: f64,
    pub on_instability: InstabilityPolicy,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            steps: 200,
            scheme: Scheme::default(),
            tolerance: DEF_TOLERANCE,
            norm_floor: DEF_NORM_FLOOR,
            instability_threshold: DEF_INSTABILITY_GROWTH,
            on_instability: InstabilityPolicy::default(),
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub grid: GridConfig,
    pub packet: PacketConfig,
    pub potential: PotentialKind,
    pub evolution: EvolutionConfig,
}

impl SimConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    pub fn load<P>(path: P) -> Result<Self, ConfigError>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        let text
            = fs::read_to_string(path)
            .map_err(|source| {
                ConfigError::Read { path: path.to_path_buf(), source }
            })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML text.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Construct the grid.
    pub fn grid(&self) -> Result<Grid, GridError> {
        Grid::new(self.grid.x_min, self.grid.x_max, self.grid.n)
    }

    /// Construct the initial packet description.
    pub fn packet(&self) -> Result<GaussianPacket, ParamError> {
        let x0
            = self.packet.x0
            .unwrap_or((self.grid.x_min + self.grid.x_max) / 2.0);
        GaussianPacket::new(x0, self.packet.k0, self.packet.sigma)
    }

    /// Construct the normalizer.
    pub fn normalizer(&self) -> Result<Normalizer, ParamError> {
        Normalizer::new(self.evolution.norm_floor, self.evolution.tolerance)
    }

    /// Sample the potential over `grid`.
    pub fn potential(&self, grid: &Grid) -> Result<Potential, PotentialError> {
        Potential::evaluate(grid, &self.potential)
    }

    /// Check every option without computing any arrays.
    pub fn validate(&self) -> Result<(), Error> {
        Grid::check(self.grid.x_min, self.grid.x_max, self.grid.n)?;
        self.packet()?;
        self.potential.validate()?;
        ParamError::check_dt(self.evolution.dt)?;
        self.normalizer()?;
        ParamError::check_threshold(self.evolution.instability_threshold)?;
        Ok(())
    }

    /// Validate everything and set up a session at `t = 0`.
    pub fn build(&self) -> Result<SimulationState, Error> {
        self.validate()?;
        let grid = self.grid()?;
        let normalizer = self.normalizer()?;
        let wf = self.packet()?.wavefunction_with(&grid, &normalizer)?;
        let V = self.potential(&grid)?;
        let state
            = SimulationState::new(grid, V, wf, self.evolution.dt)?
            .with_scheme(self.evolution.scheme)
            .with_normalizer(normalizer)
            .with_instability(
                self.evolution.instability_threshold,
                self.evolution.on_instability,
            )?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NormError;

    #[test]
    fn defaults() {
        let config = SimConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.grid.n, 500);
        assert_eq!(config.potential, PotentialKind::harmonic(1.0));
        assert_eq!(config.evolution.steps, 200);
        assert_eq!(config.packet().unwrap().x0(), 0.0);
        let state = config.build().unwrap();
        assert_eq!(state.grid().len(), 500);
        assert_eq!(state.scheme(), Scheme::CrankNicolson);
        assert_eq!(state.dt(), 0.01);
    }

    #[test]
    fn full_file() {
        let text = r#"
            [grid]
            x_min = 0.0
            x_max = 40.0
            n = 801

            [packet]
            k0 = 2.0
            sigma = 1.5

            [potential]
            kind = "barrier"
            height = 3.0
            left = 25.0
            right = 26.0

            [evolution]
            dt = 0.005
            scheme = "split-step"
            on_instability = "halt"
        "#;
        let config = SimConfig::from_toml_str(text).unwrap();
        assert_eq!(config.packet().unwrap().x0(), 20.0);
        assert_eq!(
            config.potential,
            PotentialKind::Barrier { height: 3.0, left: 25.0, right: 26.0 },
        );
        assert_eq!(config.evolution.scheme, Scheme::SplitStep);
        assert_eq!(config.evolution.on_instability, InstabilityPolicy::Halt);
        assert_eq!(config.evolution.steps, 200);
        let state = config.build().unwrap();
        assert_eq!(state.policy(), InstabilityPolicy::Halt);
        assert!((state.expect_x() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn custom_potential() {
        let text = r#"
            [potential]
            kind = "custom"
            expression = "0.5 * x**2"
        "#;
        let config = SimConfig::from_toml_str(text).unwrap();
        assert_eq!(config.potential, PotentialKind::custom("0.5 * x**2"));
        let state = config.build().unwrap();
        let x = state.grid().x();
        assert!((state.potential().min() - 0.5 * x[250].powi(2)).abs() < 1e-12);
    }

    #[test]
    fn malformed_files() {
        assert!(matches!(
            SimConfig::from_toml_str("[potential]\nkind = \"quartic\""),
            Err(ConfigError::Parse(_)),
        ));
        assert!(matches!(
            SimConfig::from_toml_str("[evolution]\nscheme = \"rk4\""),
            Err(ConfigError::Parse(_)),
        ));
        assert!(matches!(
            SimConfig::load("/nonexistent/wavepacket.toml"),
            Err(ConfigError::Read { .. }),
        ));
    }

    #[test]
    fn invalid_options_are_rejected_before_computing() {
        let mut config = SimConfig::default();
        config.packet.sigma = -1.0;
        assert!(matches!(config.build(), Err(Error::Param(ParamError::BadSigma(_)))));

        let mut config = SimConfig::default();
        config.grid.n = 1;
        assert!(matches!(config.validate(), Err(Error::Grid(GridError::TooFewPoints(1)))));

        let mut config = SimConfig::default();
        config.evolution.dt = 0.0;
        assert!(matches!(config.build(), Err(Error::Param(ParamError::BadTimeStep(_)))));

        let mut config = SimConfig::default();
        config.potential = PotentialKind::custom("x +");
        assert!(matches!(
            config.build(),
            Err(Error::Potential(PotentialError::Expression(_))),
        ));

        let mut config = SimConfig::default();
        config.potential = PotentialKind::harmonic(1e308);
        let err = config.build().unwrap_err();
        assert!(matches!(err, Error::Potential(PotentialError::NonFinite { index: 0, .. })));
        assert_eq!(crate::Diagnosis::of_error(&err), crate::Diagnosis::ParameterError);

        let mut config = SimConfig::default();
        config.packet.sigma = 0.01;
        config.grid.n = 10;
        assert!(matches!(config.build(), Err(Error::Norm(NormError::Degenerate(_)))));
    }

    #[test]
    fn round_trip() {
        let mut config = SimConfig::default();
        config.packet.x0 = Some(-2.0);
        config.potential = PotentialKind::custom("sin(x)");
        config.evolution.scheme = Scheme::Explicit;
        let text = config.to_toml_string().unwrap();
        assert_eq!(SimConfig::from_toml_str(&text).unwrap(), config);
    }
}
