//! bubbleforce - force-directed layout for bubble charts.
//!
//! Records with a magnitude become circles whose area is proportional to the
//! magnitude. A small force simulation pulls the circles toward a center (or
//! one center per group) while area-scaled repulsion keeps them from
//! overlapping. The engine is renderer-agnostic: it hands node positions to a
//! callback once per tick.

pub mod config;
pub mod factory;
pub mod forces;
pub mod io;
pub mod layout;
pub mod node;
pub mod quadtree;
pub mod record;
pub mod scale;
pub mod scheduler;
pub mod simulation;

pub use config::{ChartConfig, ConfigError};
pub use factory::{FactoryError, NodeFactory, SizeRange, create_nodes};
pub use layout::{BubbleLayout, LayoutMode, LayoutSnapshot};
pub use node::Node;
pub use record::RawRecord;
pub use scheduler::{FramePacer, PacerHandle, SharedSimulation};
pub use simulation::{Simulation, SimulationConfig, SimulationState, TickOutcome};
