//! Force contributors for the layout simulation
//!
//! A force adds its contribution to node velocities once per tick. The
//! simulation keeps forces in a registry keyed by name, so a force can be
//! swapped at runtime (this is how layout modes are switched).
//!
//! - [`PositionForce`]: pulls each node toward a target coordinate on one
//!   axis, scaled by alpha so the layout visibly settles.
//! - [`ManyBody`]: pairwise repulsion by per-node charge, exact for small
//!   node counts and Barnes–Hut approximated above a threshold.

mod many_body;
mod position;

pub use many_body::{
    Charge, DEFAULT_APPROXIMATE_ABOVE, DEFAULT_DISTANCE_MIN, DEFAULT_THETA, ManyBody,
};
pub use position::{Axis, PositionForce, Target};

use rand::Rng;
use rand::rngs::StdRng;

use crate::node::Node;

/// Per-tick inputs shared by all forces
pub struct TickContext<'a> {
    /// Current simulation temperature
    pub alpha: f64,
    /// Simulation-owned random source (separates coincident nodes)
    pub rng: &'a mut StdRng,
}

/// A rule contributing velocity changes to nodes each tick
pub trait Force: Send {
    /// Called when the force is registered and whenever the node set changes
    fn initialize(&mut self, _nodes: &[Node]) {}

    /// Add this force's contribution into `vx`/`vy` of every node
    ///
    /// Positions must not be modified; integration is the simulation's job.
    fn apply(&mut self, nodes: &mut [Node], ctx: &mut TickContext<'_>);
}

/// Tiny random offset used when two nodes share a coordinate
pub(crate) fn jiggle(rng: &mut StdRng) -> f64 {
    (rng.random::<f64>() - 0.5) * 1e-6
}
