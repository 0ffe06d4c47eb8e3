//! Simulation node state
//!
//! A [`Node`] is one circular body in the layout. Identity and size are fixed
//! when the node is built; only position and velocity change while the
//! simulation runs.

/// A circular body positioned by the force simulation
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: String,
    name: String,
    category: String,
    group_key: String,
    magnitude: f64,
    radius: f64,
    /// Position
    pub x: f64,
    pub y: f64,
    /// Velocity
    pub vx: f64,
    pub vy: f64,
}

impl Node {
    /// Create a node at the origin with zero velocity
    ///
    /// A radius that is negative or not finite is stored as 0.
    pub fn new(id: impl Into<String>, radius: f64) -> Self {
        let radius = if radius.is_finite() && radius > 0.0 {
            radius
        } else {
            0.0
        };

        Self {
            id: id.into(),
            name: String::new(),
            category: String::new(),
            group_key: String::new(),
            magnitude: 0.0,
            radius,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the category label (e.g. country)
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the key used to pick a target center in split mode (e.g. year)
    pub fn with_group(mut self, group_key: impl Into<String>) -> Self {
        self.group_key = group_key.into();
        self
    }

    /// Set the raw data value the radius was derived from
    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = magnitude;
        self
    }

    /// Place the node at the given position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Squared speed, used to judge how much a layout is still moving
    pub fn speed_squared(&self) -> f64 {
        self.vx * self.vx + self.vy * self.vy
    }

    /// Euclidean distance between the centers of two nodes
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}
