//! Force simulation engine
//!
//! Owns the node set and a registry of named forces. Each [`Simulation::tick`]
//! lets every force add to node velocities, applies velocity decay, moves the
//! nodes, cools `alpha` and hands the nodes to the `on_tick` consumer.
//!
//! The engine never schedules itself: a host calls `tick()` from whatever
//! frame timer it has (see [`crate::scheduler`]), or runs it headlessly with
//! [`Simulation::run`].

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::forces::{Force, TickContext};
use crate::node::Node;

/// Default minimum alpha before the simulation parks
pub const DEFAULT_ALPHA_MIN: f64 = 0.001;

/// Default number of ticks for alpha to decay from 1 to `DEFAULT_ALPHA_MIN`
pub const DEFAULT_ALPHA_DECAY_TICKS: f64 = 300.0;

/// Default velocity decay (friction) applied each tick
pub const DEFAULT_VELOCITY_DECAY: f64 = 0.2;

/// Configuration for the force simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Alpha below which the simulation is converged
    pub alpha_min: f64,
    /// Fraction of alpha removed each tick
    pub alpha_decay: f64,
    /// Fraction of velocity removed each tick
    pub velocity_decay: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            alpha_min: DEFAULT_ALPHA_MIN,
            alpha_decay: 1.0 - DEFAULT_ALPHA_MIN.powf(1.0 / DEFAULT_ALPHA_DECAY_TICKS),
            velocity_decay: DEFAULT_VELOCITY_DECAY,
        }
    }
}

/// Lifecycle of a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    /// No nodes assigned yet
    Idle,
    /// Forces are applied every tick
    Running,
    /// Alpha fell below `alpha_min`; ticks are no-ops until a reheat
    Converged,
}

/// What a call to [`Simulation::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to simulate
    Idle,
    /// Nodes were advanced and the tick callback invoked
    Stepped,
    /// Converged; nothing moved
    Parked,
}

type TickCallback = Box<dyn FnMut(&[Node]) + Send>;

/// Named forces, applied in registration order
#[derive(Default)]
struct ForceRegistry {
    entries: Vec<(String, Box<dyn Force>)>,
}

impl ForceRegistry {
    fn insert(&mut self, name: &str, force: Box<dyn Force>) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => {
                entry.1 = force;
                true
            }
            None => {
                self.entries.push((name.to_string(), force));
                false
            }
        }
    }

    fn remove(&mut self, name: &str) -> Option<Box<dyn Force>> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    fn get(&self, name: &str) -> Option<&dyn Force> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f.as_ref())
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Force>> {
        self.entries.iter_mut().map(|(_, f)| f)
    }
}

/// Incremental force-directed layout of circular nodes
pub struct Simulation {
    nodes: Vec<Node>,
    forces: ForceRegistry,
    config: SimulationConfig,
    alpha: f64,
    state: SimulationState,
    ticks: u64,
    rng: StdRng,
    on_tick: Option<TickCallback>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl Simulation {
    /// Create an idle simulation with no nodes and no forces
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            nodes: Vec::new(),
            forces: ForceRegistry::default(),
            config,
            alpha: 1.0,
            state: SimulationState::Idle,
            ticks: 0,
            rng: StdRng::from_os_rng(),
            on_tick: None,
        }
    }

    /// Seed the random source used to separate coincident nodes
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Register a force (builder form of [`Simulation::set_force`])
    pub fn with_force(mut self, name: &str, force: impl Force + 'static) -> Self {
        self.set_force(name, force);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of ticks that advanced the nodes since creation
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn force(&self, name: &str) -> Option<&dyn Force> {
        self.forces.get(name)
    }

    pub fn force_names(&self) -> Vec<&str> {
        self.forces.names().collect()
    }

    /// Check if the simulation is still moving nodes
    pub fn is_running(&self) -> bool {
        self.state == SimulationState::Running
    }

    /// Assign or replace the node set and restart at `alpha = 1`
    ///
    /// Incoming nodes whose id matches a node already held take over that
    /// node's position and velocity, so re-binding data does not scatter
    /// the layout.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        let previous: HashMap<&str, (f64, f64, f64, f64)> = self
            .nodes
            .iter()
            .map(|n| (n.id(), (n.x, n.y, n.vx, n.vy)))
            .collect();

        let mut joined = 0;
        let nodes: Vec<Node> = nodes
            .into_iter()
            .map(|mut node| {
                if let Some(&(x, y, vx, vy)) = previous.get(node.id()) {
                    node.x = x;
                    node.y = y;
                    node.vx = vx;
                    node.vy = vy;
                    joined += 1;
                }
                node
            })
            .collect();

        debug!(count = nodes.len(), joined, "nodes assigned");
        self.nodes = nodes;
        for force in self.forces.iter_mut() {
            force.initialize(&self.nodes);
        }

        self.alpha = 1.0;
        self.state = SimulationState::Running;
    }

    /// Register or replace a named force
    ///
    /// Takes effect on the next tick. Does not reheat: after changing
    /// targets call [`Simulation::reheat`], otherwise a cold simulation will
    /// not visibly move.
    pub fn set_force(&mut self, name: &str, force: impl Force + 'static) {
        let mut force: Box<dyn Force> = Box::new(force);
        force.initialize(&self.nodes);

        let replaced = self.forces.insert(name, force);
        debug!(name, replaced, "force registered");
    }

    /// Unregister a named force, returning it
    pub fn remove_force(&mut self, name: &str) -> Option<Box<dyn Force>> {
        self.forces.remove(name)
    }

    /// Reset alpha to 1 and resume motion
    pub fn reheat(&mut self) {
        self.set_alpha(1.0);
    }

    /// Set the temperature directly (clamped to `[0, 1]`)
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = if alpha.is_nan() {
            0.0
        } else {
            alpha.clamp(0.0, 1.0)
        };

        if self.state != SimulationState::Idle {
            self.state = if self.alpha < self.config.alpha_min {
                SimulationState::Converged
            } else {
                SimulationState::Running
            };
        }
        debug!(alpha = self.alpha, state = ?self.state, "alpha set");
    }

    /// Register the consumer called once per tick with the current nodes
    pub fn on_tick<F>(&mut self, callback: F)
    where
        F: FnMut(&[Node]) + Send + 'static,
    {
        self.on_tick = Some(Box::new(callback));
    }

    /// Advance the simulation by one step
    pub fn tick(&mut self) -> TickOutcome {
        match self.state {
            SimulationState::Idle => return TickOutcome::Idle,
            SimulationState::Converged => return TickOutcome::Parked,
            SimulationState::Running => {}
        }

        let mut ctx = TickContext {
            alpha: self.alpha,
            rng: &mut self.rng,
        };
        for force in self.forces.iter_mut() {
            force.apply(&mut self.nodes, &mut ctx);
        }

        let keep = 1.0 - self.config.velocity_decay;
        for node in &mut self.nodes {
            node.vx *= keep;
            node.vy *= keep;
            node.x += node.vx;
            node.y += node.vy;
        }

        self.alpha *= 1.0 - self.config.alpha_decay;
        self.ticks += 1;
        trace!(tick = self.ticks, alpha = self.alpha, "tick");

        if self.alpha < self.config.alpha_min {
            self.state = SimulationState::Converged;
            debug!(ticks = self.ticks, "simulation converged");
        }

        if let Some(callback) = self.on_tick.as_mut() {
            callback(&self.nodes);
        }

        TickOutcome::Stepped
    }

    /// Tick until converged or `max_ticks` steps were taken
    ///
    /// Returns the number of steps taken.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        let mut steps = 0;
        while steps < max_ticks && self.tick() == TickOutcome::Stepped {
            steps += 1;
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::forces::{ManyBody, PositionForce, Target};

    const CENTER: (f64, f64) = (620.0, 470.0);

    fn centered(nodes: Vec<Node>) -> Simulation {
        let mut sim = Simulation::default()
            .with_seed(5)
            .with_force("x", PositionForce::x(Target::fixed(CENTER.0), 0.05))
            .with_force("y", PositionForce::y(Target::fixed(CENTER.1), 0.05));
        sim.set_nodes(nodes);
        sim
    }

    fn scattered(count: usize) -> Vec<Node> {
        (0..count)
            .map(|i| {
                let x = (i * 137 % 900) as f64;
                let y = (i * 311 % 800) as f64;
                Node::new(format!("n{i}"), 5.0).with_group("2015").at(x, y)
            })
            .collect()
    }

    #[test]
    fn default_alpha_decay_reaches_alpha_min_in_300_ticks() {
        let config = SimulationConfig::default();
        let after = (1.0 - config.alpha_decay).powf(DEFAULT_ALPHA_DECAY_TICKS);
        assert!((after - DEFAULT_ALPHA_MIN).abs() < 1e-12);
    }

    #[test]
    fn new_simulation_is_idle() {
        let mut sim = Simulation::default();
        assert_eq!(sim.state(), SimulationState::Idle);
        assert_eq!(sim.tick(), TickOutcome::Idle);
        assert_eq!(sim.ticks(), 0);
    }

    #[test]
    fn set_nodes_starts_running_hot() {
        let sim = centered(scattered(3));
        assert_eq!(sim.state(), SimulationState::Running);
        assert_eq!(sim.alpha(), 1.0);
        assert!(sim.is_running());
    }

    #[test]
    fn tick_decays_alpha() {
        let mut sim = centered(scattered(3));
        let before = sim.alpha();
        assert_eq!(sim.tick(), TickOutcome::Stepped);
        assert!(sim.alpha() < before);
        assert_eq!(sim.ticks(), 1);
    }

    #[test]
    fn converges_to_center_within_bounded_ticks() {
        let mut sim = centered(scattered(25));

        let steps = sim.run(1000);

        assert!(steps <= 301, "took {steps} ticks");
        assert_eq!(sim.state(), SimulationState::Converged);
        assert!(sim.alpha() < DEFAULT_ALPHA_MIN);
        for node in sim.nodes() {
            assert!((node.x - CENTER.0).abs() < 1.0, "x = {}", node.x);
            assert!((node.y - CENTER.1).abs() < 1.0, "y = {}", node.y);
        }
    }

    #[test]
    fn converged_simulation_parks() {
        let mut sim = centered(scattered(4));
        sim.run(1000);

        let frozen: Vec<Node> = sim.nodes().to_vec();
        assert_eq!(sim.tick(), TickOutcome::Parked);
        assert_eq!(sim.nodes(), frozen.as_slice());
    }

    #[test]
    fn reheat_resumes_and_preserves_identity() {
        let mut sim = centered(scattered(6));
        sim.set_force("charge", ManyBody::area_scaled(0.05));
        sim.run(1000);

        let identity: Vec<(String, f64, String)> = sim
            .nodes()
            .iter()
            .map(|n| (n.id().to_string(), n.radius(), n.group_key().to_string()))
            .collect();

        sim.reheat();
        assert_eq!(sim.state(), SimulationState::Running);
        assert_eq!(sim.alpha(), 1.0);
        sim.run(50);

        let after: Vec<(String, f64, String)> = sim
            .nodes()
            .iter()
            .map(|n| (n.id().to_string(), n.radius(), n.group_key().to_string()))
            .collect();
        assert_eq!(identity, after);
    }

    #[test]
    fn set_force_does_not_reheat() {
        let mut sim = centered(scattered(4));
        sim.run(1000);
        assert_eq!(sim.state(), SimulationState::Converged);

        sim.set_force("x", PositionForce::x(Target::fixed(100.0), 0.05));

        assert_eq!(sim.state(), SimulationState::Converged);
        assert_eq!(sim.tick(), TickOutcome::Parked);
    }

    #[test]
    fn replaced_force_keeps_its_slot() {
        let mut sim = centered(scattered(2));
        sim.set_force("charge", ManyBody::area_scaled(0.05));
        sim.set_force("x", PositionForce::x(Target::fixed(0.0), 0.05));

        assert_eq!(sim.force_names(), vec!["x", "y", "charge"]);
        assert!(sim.force("charge").is_some());
        assert!(sim.remove_force("charge").is_some());
        assert_eq!(sim.force_names(), vec!["x", "y"]);
        assert!(sim.remove_force("charge").is_none());
    }

    #[test]
    fn repulsion_prevents_collapse() {
        let radius = 10.0;
        let nodes = vec![
            Node::new("a", radius).at(619.5, 470.0),
            Node::new("b", radius).at(620.5, 470.0),
        ];
        let mut sim = centered(nodes);
        sim.set_force("charge", ManyBody::area_scaled(0.05));

        sim.run(1000);

        let distance = sim.nodes()[0].distance_to(&sim.nodes()[1]);
        assert!(distance >= 2.0 * radius * 0.5, "distance {distance}");
    }

    #[test]
    fn coincident_nodes_separate() {
        let nodes = vec![
            Node::new("a", 10.0).at(620.0, 470.0),
            Node::new("b", 10.0).at(620.0, 470.0),
        ];
        let mut sim = centered(nodes);
        sim.set_force("charge", ManyBody::area_scaled(0.05));

        sim.run(1000);

        let (a, b) = (&sim.nodes()[0], &sim.nodes()[1]);
        assert!(a.x.is_finite() && b.x.is_finite());
        assert!(a.distance_to(b) >= 10.0);
    }

    #[test]
    fn empty_node_set_emits_empty_ticks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut sim = centered(Vec::new());
        sim.on_tick(move |nodes| sink.lock().unwrap().push(nodes.len()));

        assert_eq!(sim.tick(), TickOutcome::Stepped);
        assert_eq!(sim.tick(), TickOutcome::Stepped);
        assert_eq!(*seen.lock().unwrap(), vec![0, 0]);
    }

    #[test]
    fn on_tick_sees_updated_positions_once_per_tick() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut sim = centered(vec![Node::new("a", 3.0).at(0.0, 0.0)]);
        sim.on_tick(move |nodes| sink.lock().unwrap().push((nodes[0].x, nodes[0].y)));

        sim.tick();
        sim.tick();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], (sim.nodes()[0].x, sim.nodes()[0].y));
        assert!(seen[0].0 > 0.0 && seen[1].0 > seen[0].0);
    }

    #[test]
    fn set_nodes_joins_on_id() {
        let mut sim = centered(vec![Node::new("keep", 4.0).at(10.0, 20.0)]);
        sim.tick();
        let kept = sim.node("keep").cloned().unwrap();

        sim.set_nodes(vec![
            Node::new("keep", 4.0).at(999.0, 999.0),
            Node::new("fresh", 4.0).at(1.0, 2.0),
        ]);

        let joined = sim.node("keep").unwrap();
        assert_eq!((joined.x, joined.y), (kept.x, kept.y));
        assert_eq!((joined.vx, joined.vy), (kept.vx, kept.vy));
        let fresh = sim.node("fresh").unwrap();
        assert_eq!((fresh.x, fresh.y), (1.0, 2.0));
        assert_eq!(sim.alpha(), 1.0);
    }

    #[test]
    fn set_alpha_below_min_converges() {
        let mut sim = centered(scattered(2));
        sim.set_alpha(0.0001);
        assert_eq!(sim.state(), SimulationState::Converged);
        sim.set_alpha(0.5);
        assert_eq!(sim.state(), SimulationState::Running);
        sim.set_alpha(f64::NAN);
        assert_eq!(sim.alpha(), 0.0);
    }

    #[test]
    fn reheat_on_idle_stays_idle() {
        let mut sim = Simulation::default();
        sim.reheat();
        assert_eq!(sim.state(), SimulationState::Idle);
        assert_eq!(sim.tick(), TickOutcome::Idle);
    }

    #[test]
    fn run_resumes_from_current_state() {
        let mut continuous = centered(scattered(5));
        continuous.run(120);

        let mut paused = centered(scattered(5));
        paused.run(60);
        paused.run(60);

        assert_eq!(continuous.nodes(), paused.nodes());
        assert_eq!(continuous.alpha(), paused.alpha());
    }
}
