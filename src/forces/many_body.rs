use rand::rngs::StdRng;

use super::{Force, TickContext, jiggle};
use crate::node::Node;
use crate::quadtree::{QuadTree, Visit};

/// Default Barnes–Hut opening threshold (0 = exact, larger = coarser)
pub const DEFAULT_THETA: f64 = 0.9;

/// Default minimum distance for force calculations (avoids singularities)
pub const DEFAULT_DISTANCE_MIN: f64 = 1.0;

/// Node count above which the quadtree approximation is used
pub const DEFAULT_APPROXIMATE_ABOVE: usize = 256;

/// Per-node charge (negative = repulsion)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Charge {
    /// Same charge for every node
    Constant(f64),
    /// `-radius² × strength`: a node pushes others in proportion to its area
    AreaScaled(f64),
}

impl Charge {
    pub fn of(&self, node: &Node) -> f64 {
        match self {
            Charge::Constant(q) => *q,
            Charge::AreaScaled(strength) => -node.radius().powi(2) * strength,
        }
    }
}

/// Many-body repulsion between all pairs of nodes
///
/// The velocity change on node `i` from node `j` is
/// `charge_j × (p_j - p_i) / d²`, with `d²` clamped below by
/// `distance_min²`. Pairs at or beyond `distance_max` do not interact.
///
/// Repulsion is applied at full strength regardless of alpha: separation
/// keeps working while the positional forces fade out. `alpha_scaled(true)`
/// scales it with alpha like the positional forces instead.
#[derive(Debug, Clone)]
pub struct ManyBody {
    charge: Charge,
    theta2: f64,
    distance_min2: f64,
    distance_max2: f64,
    approximate_above: usize,
    alpha_scaled: bool,
    charges: Vec<f64>,
}

impl ManyBody {
    pub fn new(charge: Charge) -> Self {
        Self {
            charge,
            theta2: DEFAULT_THETA * DEFAULT_THETA,
            distance_min2: DEFAULT_DISTANCE_MIN * DEFAULT_DISTANCE_MIN,
            distance_max2: f64::INFINITY,
            approximate_above: DEFAULT_APPROXIMATE_ABOVE,
            alpha_scaled: false,
            charges: Vec::new(),
        }
    }

    /// Repulsion proportional to node area: charge `-radius² × strength`
    pub fn area_scaled(strength: f64) -> Self {
        Self::new(Charge::AreaScaled(strength))
    }

    pub fn theta(mut self, theta: f64) -> Self {
        self.theta2 = theta * theta;
        self
    }

    pub fn distance_min(mut self, distance: f64) -> Self {
        self.distance_min2 = distance * distance;
        self
    }

    /// Ignore pairs this far apart or further (`None` = unlimited)
    pub fn distance_max(mut self, distance: Option<f64>) -> Self {
        self.distance_max2 = distance.map_or(f64::INFINITY, |d| d * d);
        self
    }

    /// Use the quadtree once there are more than `count` nodes
    pub fn approximate_above(mut self, count: usize) -> Self {
        self.approximate_above = count;
        self
    }

    pub fn alpha_scaled(mut self, scaled: bool) -> Self {
        self.alpha_scaled = scaled;
        self
    }

    pub fn charge(&self) -> Charge {
        self.charge
    }

    /// Charge of a node under this force
    pub fn charge_of(&self, node: &Node) -> f64 {
        self.charge.of(node)
    }

    fn uses_tree(&self, n: usize) -> bool {
        n > self.approximate_above
    }

    /// Exact `O(N²)` summation
    fn apply_exact(&self, nodes: &mut [Node], scale: f64, rng: &mut StdRng) {
        let positions: Vec<(f64, f64)> = nodes.iter().map(|n| (n.x, n.y)).collect();

        for (i, node) in nodes.iter_mut().enumerate() {
            let (xi, yi) = positions[i];
            let (mut ax, mut ay) = (0.0, 0.0);

            for (j, &(xj, yj)) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let (dx, dy) = self.pair_push(xj - xi, yj - yi, self.charges[j], rng);
                ax += dx;
                ay += dy;
            }

            node.vx += ax * scale;
            node.vy += ay * scale;
        }
    }

    /// Barnes–Hut summation over a quadtree of the current positions
    ///
    /// A cell that straddles `distance_max` is always opened, so the cutoff
    /// applies per body as in the exact path.
    fn apply_approximate(&self, nodes: &mut [Node], scale: f64, rng: &mut StdRng) {
        let positions: Vec<(f64, f64)> = nodes.iter().map(|n| (n.x, n.y)).collect();
        let tree = QuadTree::build(&positions, &self.charges);

        for (i, node) in nodes.iter_mut().enumerate() {
            let (xi, yi) = positions[i];
            let (mut ax, mut ay) = (0.0, 0.0);

            tree.visit(|cell| {
                if cell.charge == 0.0 {
                    return Visit::Skip;
                }

                // Wholly beyond the cutoff
                if cell.nearest_distance2(xi, yi) >= self.distance_max2 {
                    return Visit::Skip;
                }

                let dx = cell.cx - xi;
                let dy = cell.cy - yi;
                let l = dx * dx + dy * dy;

                // Far enough, and wholly inside the cutoff: treat the cell as one body
                if cell.width * cell.width / self.theta2 < l
                    && cell.farthest_distance2(xi, yi) < self.distance_max2
                {
                    let (px, py) = self.pair_push(dx, dy, cell.charge, rng);
                    ax += px;
                    ay += py;
                    return Visit::Skip;
                }

                if !cell.is_leaf() {
                    return Visit::Descend;
                }

                for &j in cell.bodies.iter().filter(|&&j| j != i) {
                    let (xj, yj) = positions[j];
                    let (px, py) = self.pair_push(xj - xi, yj - yi, self.charges[j], rng);
                    ax += px;
                    ay += py;
                }
                Visit::Skip
            });

            node.vx += ax * scale;
            node.vy += ay * scale;
        }
    }

    /// Velocity change from a charge `q` at offset `(dx, dy)`
    fn pair_push(&self, mut dx: f64, mut dy: f64, q: f64, rng: &mut StdRng) -> (f64, f64) {
        let mut l = dx * dx + dy * dy;
        if l >= self.distance_max2 {
            return (0.0, 0.0);
        }

        if dx == 0.0 {
            dx = jiggle(rng);
            l += dx * dx;
        }
        if dy == 0.0 {
            dy = jiggle(rng);
            l += dy * dy;
        }
        if l < self.distance_min2 {
            l = (self.distance_min2 * l).sqrt();
        }

        let w = q / l;
        (dx * w, dy * w)
    }
}

impl Force for ManyBody {
    fn initialize(&mut self, nodes: &[Node]) {
        self.charges = nodes.iter().map(|node| self.charge.of(node)).collect();
    }

    fn apply(&mut self, nodes: &mut [Node], ctx: &mut TickContext<'_>) {
        if self.charges.len() != nodes.len() {
            self.initialize(nodes);
        }

        let scale = if self.alpha_scaled { ctx.alpha } else { 1.0 };
        if self.uses_tree(nodes.len()) {
            self.apply_approximate(nodes, scale, ctx.rng);
        } else {
            self.apply_exact(nodes, scale, ctx.rng);
        }
    }
}
