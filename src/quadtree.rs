//! # Barnes–Hut quadtree (2D)
//!
//! Spatial partition used by the many-body force once the node count makes
//! exact `O(N²)` summation too slow. Space is recursively split into four
//! quadrants; every cell stores the total charge of the bodies beneath it and
//! their charge-weighted center. A cell that is far enough from a body (by the
//! opening criterion applied in the caller) can then stand in for all of its
//! bodies at once.
//!
//! Cells live in one arena `Vec` and refer to children by index, so building
//! the tree is a handful of pushes and no pointer juggling.
//!
//! Bodies at (nearly) the same point cannot be separated by subdivision; below
//! [`MAX_DEPTH`] levels they are kept together in one leaf bucket.

/// Deepest subdivision level; deeper bodies share a leaf
pub const MAX_DEPTH: usize = 32;

/// One square region of the tree
#[derive(Debug, Clone)]
pub struct Cell {
    /// Lower-left corner
    pub x0: f64,
    pub y0: f64,
    /// Side length
    pub width: f64,
    /// Sum of the charges of all bodies in this cell
    pub charge: f64,
    /// Charge-weighted center (weights are |charge|)
    pub cx: f64,
    pub cy: f64,
    /// Indices into `QuadTree::cells`, quadrant order SW, SE, NW, NE
    pub children: [Option<usize>; 4],
    /// Body indices stored in this leaf
    pub bodies: Vec<usize>,
}

impl Cell {
    fn empty(x0: f64, y0: f64, width: f64) -> Self {
        Self {
            x0,
            y0,
            width,
            charge: 0.0,
            cx: x0 + width / 2.0,
            cy: y0 + width / 2.0,
            children: [None; 4],
            bodies: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Squared distance from `(x, y)` to the closest point of the cell
    pub fn nearest_distance2(&self, x: f64, y: f64) -> f64 {
        let dx = (self.x0 - x).max(x - (self.x0 + self.width)).max(0.0);
        let dy = (self.y0 - y).max(y - (self.y0 + self.width)).max(0.0);
        dx * dx + dy * dy
    }

    /// Squared distance from `(x, y)` to the farthest corner of the cell
    pub fn farthest_distance2(&self, x: f64, y: f64) -> f64 {
        let dx = (x - self.x0).abs().max((x - self.x0 - self.width).abs());
        let dy = (y - self.y0).abs().max((y - self.y0 - self.width).abs());
        dx * dx + dy * dy
    }

    fn quadrant(&self, x: f64, y: f64) -> usize {
        let mid_x = self.x0 + self.width / 2.0;
        let mid_y = self.y0 + self.width / 2.0;
        let east = usize::from(x >= mid_x);
        let north = usize::from(y >= mid_y);
        east + 2 * north
    }
}

/// What a visitor wants after looking at a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Look at the children of this cell
    Descend,
    /// The cell was handled as a whole; skip its subtree
    Skip,
}

/// Arena-backed quadtree over a set of charged points
#[derive(Debug, Clone)]
pub struct QuadTree {
    cells: Vec<Cell>,
    root: usize,
}

impl QuadTree {
    /// Build a tree over `points`, each carrying `charges[i]`
    ///
    /// `points` and `charges` must have the same length. Non-finite points
    /// are left out of the tree.
    pub fn build(points: &[(f64, f64)], charges: &[f64]) -> Self {
        let (x0, y0, width) = bounding_square(points);
        let mut tree = QuadTree {
            cells: vec![Cell::empty(x0, y0, width)],
            root: 0,
        };

        for (i, &(x, y)) in points.iter().enumerate() {
            if x.is_finite() && y.is_finite() {
                tree.insert(tree.root, i, points, 0);
            }
        }

        tree.accumulate(tree.root, points, charges);
        tree
    }

    pub fn root(&self) -> &Cell {
        &self.cells[self.root]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Pre-order walk; `visit` decides whether to descend into each cell
    pub fn visit<F>(&self, mut visit: F)
    where
        F: FnMut(&Cell) -> Visit,
    {
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let cell = &self.cells[index];
            if visit(cell) == Visit::Descend {
                stack.extend(cell.children.iter().rev().flatten());
            }
        }
    }

    fn insert(&mut self, cell_index: usize, body: usize, points: &[(f64, f64)], depth: usize) {
        if self.cells[cell_index].is_leaf() {
            // Empty leaf, or too deep to split any further: store here
            if self.cells[cell_index].bodies.is_empty() || depth >= MAX_DEPTH {
                self.cells[cell_index].bodies.push(body);
                return;
            }

            // Occupied leaf: push its bodies one level down, then continue
            let resident = std::mem::take(&mut self.cells[cell_index].bodies);
            for other in resident {
                self.insert_into_child(cell_index, other, points, depth);
            }
        }

        self.insert_into_child(cell_index, body, points, depth);
    }

    fn insert_into_child(
        &mut self,
        cell_index: usize,
        body: usize,
        points: &[(f64, f64)],
        depth: usize,
    ) {
        let (x, y) = points[body];
        let quadrant = self.cells[cell_index].quadrant(x, y);

        let child_index = match self.cells[cell_index].children[quadrant] {
            Some(existing) => existing,
            None => {
                let parent = &self.cells[cell_index];
                let half = parent.width / 2.0;
                let cx0 = parent.x0 + if quadrant & 1 == 1 { half } else { 0.0 };
                let cy0 = parent.y0 + if quadrant & 2 == 2 { half } else { 0.0 };

                self.cells.push(Cell::empty(cx0, cy0, half));
                let created = self.cells.len() - 1;
                self.cells[cell_index].children[quadrant] = Some(created);
                created
            }
        };

        self.insert(child_index, body, points, depth + 1);
    }

    /// Fill in `charge`, `cx`, `cy` bottom-up
    fn accumulate(&mut self, cell_index: usize, points: &[(f64, f64)], charges: &[f64]) {
        let children = self.cells[cell_index].children;
        let mut charge = 0.0;
        let mut weight = 0.0;
        let mut sx = 0.0;
        let mut sy = 0.0;

        for child in children.into_iter().flatten() {
            self.accumulate(child, points, charges);
            let c = &self.cells[child];
            let w = c.charge.abs();
            charge += c.charge;
            weight += w;
            sx += c.cx * w;
            sy += c.cy * w;
        }

        for &body in &self.cells[cell_index].bodies {
            let (x, y) = points[body];
            let q = charges[body];
            let w = q.abs();
            charge += q;
            weight += w;
            sx += x * w;
            sy += y * w;
        }

        let cell = &mut self.cells[cell_index];
        cell.charge = charge;
        if weight > 0.0 {
            cell.cx = sx / weight;
            cell.cy = sy / weight;
        }
    }
}

/// Smallest square (slightly padded) containing every finite point
fn bounding_square(points: &[(f64, f64)]) -> (f64, f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(x, y) in points.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    if min_x > max_x {
        return (0.0, 0.0, 1.0);
    }

    let width = (max_x - min_x).max(max_y - min_y).max(1.0);
    // Pad so points on the max edge fall strictly inside
    let width = width * (1.0 + 1e-9) + 1e-9;
    (min_x, min_y, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_has_only_an_empty_root() {
        let tree = QuadTree::build(&[], &[]);
        assert_eq!(tree.cells().len(), 1);
        assert_eq!(tree.root().charge, 0.0);
        assert!(tree.root().is_leaf());
    }

    #[test]
    fn root_carries_total_charge_and_weighted_center() {
        let points = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        let charges = [-1.0, -1.0, -2.0];
        let tree = QuadTree::build(&points, &charges);

        let root = tree.root();
        assert!((root.charge + 4.0).abs() < 1e-12);
        assert!((root.cx - 7.5).abs() < 1e-9);
        assert!((root.cy - 5.0).abs() < 1e-9);
    }

    #[test]
    fn every_body_lands_in_exactly_one_leaf() {
        let points: Vec<(f64, f64)> = (0..50)
            .map(|i| ((i * 37 % 101) as f64, (i * 53 % 89) as f64))
            .collect();
        let charges = vec![-1.0; points.len()];
        let tree = QuadTree::build(&points, &charges);

        let mut seen = vec![0; points.len()];
        tree.visit(|cell| {
            for &b in &cell.bodies {
                seen[b] += 1;
            }
            Visit::Descend
        });

        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn leaves_contain_their_bodies() {
        let points = [(1.0, 1.0), (2.0, 9.0), (9.0, 2.0), (8.0, 8.0), (5.0, 5.0)];
        let charges = [-1.0; 5];
        let tree = QuadTree::build(&points, &charges);

        tree.visit(|cell| {
            for &b in &cell.bodies {
                let (x, y) = points[b];
                assert!(x >= cell.x0 && x < cell.x0 + cell.width);
                assert!(y >= cell.y0 && y < cell.y0 + cell.width);
            }
            Visit::Descend
        });
    }

    #[test]
    fn coincident_points_share_a_bucket() {
        let points = [(3.0, 3.0), (3.0, 3.0), (3.0, 3.0)];
        let charges = [-1.0; 3];
        let tree = QuadTree::build(&points, &charges);

        let mut largest_bucket = 0;
        tree.visit(|cell| {
            largest_bucket = largest_bucket.max(cell.bodies.len());
            Visit::Descend
        });
        assert_eq!(largest_bucket, 3);
        assert!((tree.root().charge + 3.0).abs() < 1e-12);
    }

    #[test]
    fn cell_distance_bounds() {
        let cell = Cell::empty(0.0, 0.0, 10.0);

        assert_eq!(cell.nearest_distance2(5.0, 5.0), 0.0);
        assert_eq!(cell.nearest_distance2(13.0, 14.0), 25.0);
        assert_eq!(cell.nearest_distance2(-2.0, 5.0), 4.0);

        assert_eq!(cell.farthest_distance2(5.0, 5.0), 50.0);
        assert_eq!(cell.farthest_distance2(13.0, 14.0), 13.0 * 13.0 + 14.0 * 14.0);
        assert_eq!(cell.farthest_distance2(-2.0, 5.0), 144.0 + 25.0);
    }

    #[test]
    fn skip_prunes_subtrees() {
        let points: Vec<(f64, f64)> = (0..20).map(|i| (i as f64, (i * 3 % 7) as f64)).collect();
        let charges = vec![-1.0; points.len()];
        let tree = QuadTree::build(&points, &charges);

        let mut visited = 0;
        tree.visit(|_| {
            visited += 1;
            Visit::Skip
        });
        assert_eq!(visited, 1);
    }
}
