//! Node factory: raw records to simulation-ready nodes
//!
//! Policy for bad input:
//! - a record without an id (or with a blank one) and a repeated id are
//!   rejected, failing the whole batch with a [`FactoryError`];
//! - a magnitude that is missing, non-numeric, non-finite or negative is
//!   coerced to 0 and reported with a warning.
//!
//! A NaN magnitude therefore never reaches the simulation, where it would
//! poison the distance computations of every other node.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::node::Node;
use crate::record::{RawRecord, Scalar};
use crate::scale::PowScale;

/// Errors that reject a batch of records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactoryError {
    /// The record at this index has no usable id
    #[error("record {index} has no id")]
    MissingId { index: usize },

    /// Two records share an id
    #[error("duplicate id '{id}' at record {index}")]
    DuplicateId { id: String, index: usize },
}

/// Radius bounds for the size scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: f64,
    pub max: f64,
}

impl Default for SizeRange {
    fn default() -> Self {
        Self { min: 1.0, max: 30.0 }
    }
}

impl SizeRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Rectangle `[0, width) x [0, height)` that initial positions are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnArea {
    pub width: f64,
    pub height: f64,
}

impl Default for SpawnArea {
    fn default() -> Self {
        Self {
            width: 900.0,
            height: 800.0,
        }
    }
}

/// Builds nodes from records
pub struct NodeFactory {
    size_range: SizeRange,
    spawn_area: SpawnArea,
    rng: StdRng,
}

impl NodeFactory {
    /// Create a factory with an OS-seeded random source
    pub fn new(size_range: SizeRange) -> Self {
        Self {
            size_range,
            spawn_area: SpawnArea::default(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use a fixed seed so that initial positions are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_spawn_area(mut self, spawn_area: SpawnArea) -> Self {
        self.spawn_area = spawn_area;
        self
    }

    pub fn size_range(&self) -> SizeRange {
        self.size_range
    }

    /// Size scale for a batch whose largest magnitude is `max_magnitude`
    pub fn radius_scale(&self, max_magnitude: f64) -> PowScale {
        PowScale::sqrt()
            .domain(0.0, max_magnitude)
            .range(self.size_range.min, self.size_range.max)
    }

    /// Convert records into nodes sorted by descending magnitude
    ///
    /// Large nodes come first so that a renderer drawing in order layers the
    /// small ones on top. Ties keep their input order.
    pub fn create_nodes(&mut self, records: &[RawRecord]) -> Result<Vec<Node>, FactoryError> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut prepared = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let id = record.key().ok_or(FactoryError::MissingId { index })?;
            if !seen.insert(id.clone()) {
                return Err(FactoryError::DuplicateId { id, index });
            }
            let magnitude = sanitize_magnitude(&id, record.magnitude.as_ref());
            prepared.push((id, magnitude, record));
        }

        let max_magnitude = prepared
            .iter()
            .map(|(_, magnitude, _)| *magnitude)
            .fold(0.0_f64, f64::max);
        let scale = self.radius_scale(max_magnitude);

        let mut nodes: Vec<Node> = prepared
            .into_iter()
            .map(|(id, magnitude, record)| {
                let x = self.rng.random::<f64>() * self.spawn_area.width;
                let y = self.rng.random::<f64>() * self.spawn_area.height;

                Node::new(id, scale.scale(magnitude))
                    .with_name(record.name.clone().unwrap_or_default())
                    .with_category(record.category.clone().unwrap_or_default())
                    .with_group(record.group_key())
                    .with_magnitude(magnitude)
                    .at(x, y)
            })
            .collect();

        nodes.sort_by(|a, b| b.magnitude().total_cmp(&a.magnitude()));

        Ok(nodes)
    }
}

/// Build nodes with an OS-seeded factory
pub fn create_nodes(records: &[RawRecord], size_range: SizeRange) -> Result<Vec<Node>, FactoryError> {
    NodeFactory::new(size_range).create_nodes(records)
}

fn sanitize_magnitude(id: &str, magnitude: Option<&Scalar>) -> f64 {
    match magnitude.and_then(Scalar::as_number) {
        Some(value) if value.is_finite() && value >= 0.0 => value,
        _ => {
            warn!(
                id,
                magnitude = ?magnitude,
                "invalid magnitude, using 0"
            );
            0.0
        }
    }
}
