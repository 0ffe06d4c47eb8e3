use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use super::{Force, TickContext};
use crate::node::Node;

/// Axis a positional force acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Where a positional force pulls a node to
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Same coordinate for every node
    Fixed(f64),
    /// Coordinate looked up by the node's group key; unknown keys use `fallback`
    ByGroup {
        centers: HashMap<String, f64>,
        fallback: f64,
    },
}

impl Target {
    pub fn fixed(coordinate: f64) -> Self {
        Target::Fixed(coordinate)
    }

    pub fn by_group<K, I>(centers: I, fallback: f64) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        Target::ByGroup {
            centers: centers.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            fallback,
        }
    }

    /// Target coordinate for a node
    pub fn resolve(&self, node: &Node) -> f64 {
        match self {
            Target::Fixed(coordinate) => *coordinate,
            Target::ByGroup { centers, fallback } => {
                centers.get(node.group_key()).copied().unwrap_or(*fallback)
            }
        }
    }

    /// Whether the node's group key has a registered center
    pub fn is_known(&self, node: &Node) -> bool {
        match self {
            Target::Fixed(_) => true,
            Target::ByGroup { centers, .. } => centers.contains_key(node.group_key()),
        }
    }
}

/// Spring toward a target coordinate on one axis
///
/// Contribution per tick: `(target - position) * strength * alpha`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionForce {
    axis: Axis,
    target: Target,
    strength: f64,
    unknown_groups: BTreeSet<String>,
}

impl PositionForce {
    pub fn new(axis: Axis, target: Target, strength: f64) -> Self {
        Self {
            axis,
            target,
            strength,
            unknown_groups: BTreeSet::new(),
        }
    }

    /// Horizontal pull
    pub fn x(target: Target, strength: f64) -> Self {
        Self::new(Axis::X, target, strength)
    }

    /// Vertical pull
    pub fn y(target: Target, strength: f64) -> Self {
        Self::new(Axis::Y, target, strength)
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Group keys without a center, as of the last `initialize`
    pub fn unknown_groups(&self) -> &BTreeSet<String> {
        &self.unknown_groups
    }

    /// Velocity change this force gives `node` at temperature `alpha`
    pub fn contribution(&self, node: &Node, alpha: f64) -> f64 {
        let position = match self.axis {
            Axis::X => node.x,
            Axis::Y => node.y,
        };
        (self.target.resolve(node) - position) * self.strength * alpha
    }
}

impl Force for PositionForce {
    fn initialize(&mut self, nodes: &[Node]) {
        self.unknown_groups = nodes
            .iter()
            .filter(|node| !self.target.is_known(node))
            .map(|node| node.group_key().to_string())
            .collect();

        for group in &self.unknown_groups {
            warn!(
                group = %group,
                axis = ?self.axis,
                "no target center for group, falling back to the global center"
            );
        }
    }

    fn apply(&mut self, nodes: &mut [Node], ctx: &mut TickContext<'_>) {
        for node in nodes.iter_mut() {
            let dv = self.contribution(node, ctx.alpha);
            match self.axis {
                Axis::X => node.vx += dv,
                Axis::Y => node.vy += dv,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn year_target() -> Target {
        Target::by_group([("2014", 100.0), ("2015", 200.0)], 150.0)
    }

    #[test]
    fn fixed_target_pulls_proportionally_to_distance() {
        let force = PositionForce::x(Target::fixed(100.0), 0.05);
        let node = Node::new("a", 1.0).at(60.0, 0.0);

        assert!((force.contribution(&node, 1.0) - 2.0).abs() < 1e-12);
        assert!((force.contribution(&node, 0.5) - 1.0).abs() < 1e-12);
        assert_eq!(force.contribution(&node, 0.0), 0.0);
    }

    #[test]
    fn group_target_uses_group_key() {
        let target = year_target();
        let a = Node::new("a", 1.0).with_group("2014");
        let b = Node::new("b", 1.0).with_group("2015");

        assert_eq!(target.resolve(&a), 100.0);
        assert_eq!(target.resolve(&b), 200.0);
    }

    #[test]
    fn unknown_group_falls_back() {
        let target = year_target();
        let stray = Node::new("s", 1.0).with_group("1999");

        assert!(!target.is_known(&stray));
        assert_eq!(target.resolve(&stray), 150.0);
    }

    #[test]
    fn apply_only_touches_its_axis() {
        let mut force = PositionForce::y(Target::fixed(10.0), 0.1);
        let mut nodes = vec![Node::new("a", 1.0).at(5.0, 0.0)];
        let mut rng = StdRng::seed_from_u64(0);

        force.initialize(&nodes);
        force.apply(
            &mut nodes,
            &mut TickContext {
                alpha: 1.0,
                rng: &mut rng,
            },
        );

        assert_eq!(nodes[0].vx, 0.0);
        assert!((nodes[0].vy - 1.0).abs() < 1e-12);
        assert_eq!((nodes[0].x, nodes[0].y), (5.0, 0.0));
    }

    #[test]
    fn initialize_records_unknown_groups() {
        let mut force = PositionForce::x(year_target(), 0.05);
        let nodes = vec![
            Node::new("a", 1.0).with_group("2014"),
            Node::new("b", 1.0).with_group("unknown"),
        ];
        force.initialize(&nodes);

        assert_eq!(force.unknown_groups().len(), 1);
        assert!(force.unknown_groups().contains("unknown"));
        assert_eq!(force.target().resolve(&nodes[1]), 150.0);
        assert_eq!(force.target().resolve(&nodes[0]), 100.0);

        force.initialize(&nodes[..1]);
        assert!(force.unknown_groups().is_empty());
    }
}
