//! Chart configuration loaded from YAML
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Group centers, titles and the chart center follow `width` and
//! `height` unless they are given:
//!
//! ```yaml
//! width: 1240
//! height: 940
//! group_centers:
//!   "2014": 413.33
//!   "2015": 620
//!   "2016": 826.67
//! size_range: { min: 1, max: 30 }
//! charge:
//!   strength: 0.05
//!   distance_max: 120
//! seed: 42
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::factory::{SizeRange, SpawnArea};
use crate::forces::{DEFAULT_APPROXIMATE_ABOVE, DEFAULT_DISTANCE_MIN, DEFAULT_THETA, ManyBody};
use crate::simulation::SimulationConfig;

/// Errors that can occur while loading a chart configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A point on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Repulsion settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeConfig {
    /// Charge per unit of area; a node's charge is `-radius² × strength`
    pub strength: f64,
    /// Barnes–Hut opening threshold
    pub theta: f64,
    pub distance_min: f64,
    /// Pairs at least this far apart do not interact (`null` = unlimited)
    pub distance_max: Option<f64>,
    /// Node count above which the quadtree approximation is used
    pub approximate_above: usize,
    /// Scale repulsion by alpha like the positional forces
    pub alpha_scaled: bool,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            strength: 0.05,
            theta: DEFAULT_THETA,
            distance_min: DEFAULT_DISTANCE_MIN,
            distance_max: Some(120.0),
            approximate_above: DEFAULT_APPROXIMATE_ABOVE,
            alpha_scaled: false,
        }
    }
}

impl ChargeConfig {
    /// Build the many-body force described by this config
    pub fn force(&self) -> ManyBody {
        ManyBody::area_scaled(self.strength)
            .theta(self.theta)
            .distance_min(self.distance_min)
            .distance_max(self.distance_max)
            .approximate_above(self.approximate_above)
            .alpha_scaled(self.alpha_scaled)
    }
}

/// Geometry and force parameters of a bubble chart
///
/// When a file leaves out `center`, `group_centers` or `group_labels`, they
/// are derived from its `width` and `height` (see [`ChartConfig::for_canvas`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ChartConfigFile")]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    /// Target of every node in grouped mode
    pub center: Point,
    /// Horizontal target per group key in split mode
    pub group_centers: BTreeMap<String, f64>,
    /// Horizontal position of each group's title in split mode
    pub group_labels: BTreeMap<String, f64>,
    /// Strength of the positional forces
    pub force_strength: f64,
    pub size_range: SizeRange,
    pub spawn_area: SpawnArea,
    pub simulation: SimulationConfig,
    pub charge: ChargeConfig,
    /// Seed for initial positions and jiggle; random when absent
    pub seed: Option<u64>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self::for_canvas(1240.0, 940.0)
    }
}

/// Config file form; missing geometry is filled in from the canvas size
#[derive(Deserialize)]
#[serde(default)]
struct ChartConfigFile {
    width: f64,
    height: f64,
    center: Option<Point>,
    group_centers: Option<BTreeMap<String, f64>>,
    group_labels: Option<BTreeMap<String, f64>>,
    force_strength: f64,
    size_range: SizeRange,
    spawn_area: SpawnArea,
    simulation: SimulationConfig,
    charge: ChargeConfig,
    seed: Option<u64>,
}

impl Default for ChartConfigFile {
    fn default() -> Self {
        let defaults = ChartConfig::default();
        Self {
            width: defaults.width,
            height: defaults.height,
            center: None,
            group_centers: None,
            group_labels: None,
            force_strength: defaults.force_strength,
            size_range: defaults.size_range,
            spawn_area: defaults.spawn_area,
            simulation: defaults.simulation,
            charge: defaults.charge,
            seed: defaults.seed,
        }
    }
}

impl From<ChartConfigFile> for ChartConfig {
    fn from(file: ChartConfigFile) -> Self {
        let canvas = ChartConfig::for_canvas(file.width, file.height);
        Self {
            center: file.center.unwrap_or(canvas.center),
            group_centers: file.group_centers.unwrap_or(canvas.group_centers),
            group_labels: file.group_labels.unwrap_or(canvas.group_labels),
            force_strength: file.force_strength,
            size_range: file.size_range,
            spawn_area: file.spawn_area,
            simulation: file.simulation,
            charge: file.charge,
            seed: file.seed,
            ..canvas
        }
    }
}

impl ChartConfig {
    /// Default chart for a `width × height` canvas
    ///
    /// The center is the middle of the canvas, the 2014/2015/2016 groups sit
    /// at a third, a half and two thirds of the width, and their titles 160
    /// from either edge and in the middle.
    pub fn for_canvas(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            center: Point {
                x: width / 2.0,
                y: height / 2.0,
            },
            group_centers: BTreeMap::from([
                ("2014".to_string(), width / 3.0),
                ("2015".to_string(), width / 2.0),
                ("2016".to_string(), 2.0 * width / 3.0),
            ]),
            group_labels: BTreeMap::from([
                ("2014".to_string(), 160.0),
                ("2015".to_string(), width / 2.0),
                ("2016".to_string(), width - 160.0),
            ]),
            force_strength: 0.05,
            size_range: SizeRange::default(),
            spawn_area: SpawnArea::default(),
            simulation: SimulationConfig::default(),
            charge: ChargeConfig::default(),
            seed: None,
        }
    }

    /// Load and validate a config file
    pub fn from_yaml_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML config text
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ChartConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable by the layout
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
            }
        }

        fn unit(name: &str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be in (0, 1], got {value}")))
            }
        }

        positive("width", self.width)?;
        positive("height", self.height)?;
        positive("spawn_area.width", self.spawn_area.width)?;
        positive("spawn_area.height", self.spawn_area.height)?;

        let SizeRange { min, max } = self.size_range;
        if !(min.is_finite() && max.is_finite() && min >= 0.0 && min <= max) {
            return Err(ConfigError::Invalid(format!(
                "size_range must satisfy 0 <= min <= max, got [{min}, {max}]"
            )));
        }

        unit("force_strength", self.force_strength)?;
        unit("simulation.alpha_decay", self.simulation.alpha_decay)?;
        unit("simulation.velocity_decay", self.simulation.velocity_decay)?;
        unit("simulation.alpha_min", self.simulation.alpha_min)?;

        if !(self.charge.strength.is_finite() && self.charge.strength >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "charge.strength must be non-negative, got {}",
                self.charge.strength
            )));
        }
        positive("charge.theta", self.charge.theta)?;
        positive("charge.distance_min", self.charge.distance_min)?;
        if let Some(distance_max) = self.charge.distance_max {
            positive("charge.distance_max", distance_max)?;
        }

        if !(self.center.x.is_finite() && self.center.y.is_finite()) {
            return Err(ConfigError::Invalid("center must be finite".to_string()));
        }
        if let Some((key, x)) = self.group_centers.iter().find(|(_, x)| !x.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "group center for {key} must be finite, got {x}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_chart_geometry() {
        let config = ChartConfig::default();

        assert_eq!(config.center, Point { x: 620.0, y: 470.0 });
        assert!((config.group_centers["2014"] - 413.33).abs() < 0.01);
        assert_eq!(config.group_centers["2015"], 620.0);
        assert!((config.group_centers["2016"] - 826.67).abs() < 0.01);
        assert_eq!(config.group_labels["2016"], 1080.0);
        assert_eq!(config.size_range, SizeRange::new(1.0, 30.0));
        assert_eq!(config.charge.distance_max, Some(120.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ChartConfig::from_yaml_str(
            "force_strength: 0.1\nsize_range: { min: 2, max: 40 }\nseed: 7\n",
        )
        .unwrap();

        assert_eq!(config.force_strength, 0.1);
        assert_eq!(config.size_range, SizeRange::new(2.0, 40.0));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.width, 1240.0);
        assert_eq!(config.charge.theta, DEFAULT_THETA);
    }

    #[test]
    fn geometry_follows_canvas_size() {
        let config = ChartConfig::from_yaml_str("width: 800\nheight: 600\n").unwrap();

        assert_eq!(config.center, Point { x: 400.0, y: 300.0 });
        assert_eq!(config.group_centers["2015"], 400.0);
        assert!((config.group_centers["2016"] - 533.33).abs() < 0.01);
        assert_eq!(config.group_labels["2016"], 640.0);
    }

    #[test]
    fn explicit_geometry_wins_over_canvas_size() {
        let config =
            ChartConfig::from_yaml_str("width: 800\ncenter: { x: 10, y: 20 }\n").unwrap();

        assert_eq!(config.center, Point { x: 10.0, y: 20.0 });
        assert_eq!(config.group_centers["2015"], 400.0);
        assert_eq!(config.height, 940.0);
    }

    #[test]
    fn group_centers_replace_defaults() {
        let config = ChartConfig::from_yaml_str("group_centers:\n  a: 100\n  b: 200\n").unwrap();

        assert_eq!(config.group_centers.len(), 2);
        assert_eq!(config.group_centers["b"], 200.0);
    }

    #[test]
    fn null_distance_max_means_unlimited() {
        let config = ChartConfig::from_yaml_str("charge:\n  distance_max: null\n").unwrap();
        assert_eq!(config.charge.distance_max, None);
        assert_eq!(config.charge.strength, 0.05);
    }

    #[test]
    fn inverted_size_range_is_rejected() {
        let err = ChartConfig::from_yaml_str("size_range: { min: 30, max: 1 }\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("size_range"));
    }

    #[test]
    fn out_of_range_decay_is_rejected() {
        let err =
            ChartConfig::from_yaml_str("simulation:\n  velocity_decay: 1.5\n").unwrap_err();
        assert!(err.to_string().contains("velocity_decay"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = ChartConfig::from_yaml_str("width: [not, a, number]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ChartConfig::from_yaml_path(Path::new("/nonexistent/chart.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
