//! Bubble chart layout
//!
//! [`BubbleLayout`] wires a [`NodeFactory`] and a [`Simulation`] together the
//! way a bubble chart uses them: every node is pulled toward the canvas
//! center on both axes and pushed apart in proportion to its area. Switching
//! to [`LayoutMode::SplitByGroup`] swaps the horizontal pull for one that
//! targets each node's group center and reheats, so the bubbles visibly
//! regroup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ChartConfig;
use crate::factory::{FactoryError, NodeFactory};
use crate::forces::{PositionForce, Target};
use crate::node::Node;
use crate::record::RawRecord;
use crate::simulation::Simulation;

/// Registry name of the horizontal positional force
pub const FORCE_X: &str = "x";
/// Registry name of the vertical positional force
pub const FORCE_Y: &str = "y";
/// Registry name of the many-body force
pub const FORCE_CHARGE: &str = "charge";

/// Where the horizontal force pulls nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Every node toward the canvas center
    #[default]
    Grouped,
    /// Each node toward the center of its group
    SplitByGroup,
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMode::Grouped => f.write_str("grouped"),
            LayoutMode::SplitByGroup => f.write_str("split-by-group"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown layout mode '{0}' (expected 'grouped' or 'split')")]
pub struct ParseLayoutModeError(String);

impl FromStr for LayoutMode {
    type Err = ParseLayoutModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grouped" | "all" => Ok(LayoutMode::Grouped),
            "split" | "split-by-group" | "year" => Ok(LayoutMode::SplitByGroup),
            _ => Err(ParseLayoutModeError(s.to_string())),
        }
    }
}

/// Title position of one group in split mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLabel {
    pub key: String,
    pub x: f64,
}

/// Serializable view of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub group_key: String,
    pub magnitude: f64,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl From<&Node> for NodeView {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id().to_string(),
            name: node.name().to_string(),
            category: node.category().to_string(),
            group_key: node.group_key().to_string(),
            magnitude: node.magnitude(),
            x: node.x,
            y: node.y,
            radius: node.radius(),
        }
    }
}

/// Layout state at one instant, as written by the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub mode: LayoutMode,
    pub alpha: f64,
    pub ticks: u64,
    pub nodes: Vec<NodeView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_labels: Vec<GroupLabel>,
}

/// A bubble chart: records in, positioned circles out
pub struct BubbleLayout {
    config: ChartConfig,
    factory: NodeFactory,
    simulation: Simulation,
    mode: LayoutMode,
}

impl BubbleLayout {
    /// Build an idle layout in grouped mode
    pub fn new(config: ChartConfig) -> Self {
        let mut factory =
            NodeFactory::new(config.size_range).with_spawn_area(config.spawn_area);
        let mut simulation = Simulation::new(config.simulation);
        if let Some(seed) = config.seed {
            factory = factory.with_seed(seed);
            simulation = simulation.with_seed(seed);
        }

        let mut layout = Self {
            config,
            factory,
            simulation,
            mode: LayoutMode::Grouped,
        };

        let x = layout.x_force();
        let y = PositionForce::y(
            Target::fixed(layout.config.center.y),
            layout.config.force_strength,
        );
        layout.simulation.set_force(FORCE_X, x);
        layout.simulation.set_force(FORCE_Y, y);
        layout.simulation.set_force(FORCE_CHARGE, layout.config.charge.force());
        layout
    }

    /// Replace the chart's nodes with ones built from `records`
    ///
    /// Nodes whose id was already laid out keep their position. The chart
    /// goes back to grouped mode and the simulation restarts hot. On error
    /// nothing changes.
    pub fn load(&mut self, records: &[RawRecord]) -> Result<(), FactoryError> {
        let nodes = self.factory.create_nodes(records)?;
        if self.mode != LayoutMode::Grouped {
            debug!(from = %self.mode, "load resets layout mode to grouped");
            self.mode = LayoutMode::Grouped;
            let x = self.x_force();
            self.simulation.set_force(FORCE_X, x);
        }
        self.simulation.set_nodes(nodes);
        Ok(())
    }

    /// Switch the horizontal target and reheat
    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        debug!(from = %self.mode, to = %mode, "layout mode switched");
        self.mode = mode;
        let x = self.x_force();
        self.simulation.set_force(FORCE_X, x);
        self.simulation.reheat();
    }

    fn x_force(&self) -> PositionForce {
        let target = match self.mode {
            LayoutMode::Grouped => Target::fixed(self.config.center.x),
            LayoutMode::SplitByGroup => Target::by_group(
                self.config
                    .group_centers
                    .iter()
                    .map(|(key, x)| (key.clone(), *x)),
                self.config.center.x,
            ),
        };
        PositionForce::x(target, self.config.force_strength)
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    /// Group titles to draw; empty unless split by group
    pub fn group_label_positions(&self) -> Vec<GroupLabel> {
        match self.mode {
            LayoutMode::Grouped => Vec::new(),
            LayoutMode::SplitByGroup => self
                .config
                .group_labels
                .iter()
                .map(|(key, x)| GroupLabel {
                    key: key.clone(),
                    x: *x,
                })
                .collect(),
        }
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            mode: self.mode,
            alpha: self.simulation.alpha(),
            ticks: self.simulation.ticks(),
            nodes: self.simulation.nodes().iter().map(NodeView::from).collect(),
            group_labels: self.group_label_positions(),
        }
    }
}
