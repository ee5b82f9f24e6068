//! Spatial hash for coincident-node queries.

use std::collections::HashMap;

use texgen_math::Point3;

/// Points bucketed into cubic cells twice the lookup tolerance wide.
///
/// Any point within tolerance of a query lies in the query's cell or one of
/// its 26 neighbours.
#[derive(Debug, Clone)]
pub struct NodeGrid {
    cell: f64,
    tol: f64,
    points: Vec<Point3>,
    cells: HashMap<(i64, i64, i64), Vec<usize>>,
}

impl NodeGrid {
    /// Index `points` for lookups within `tol`.
    pub fn new(points: &[Point3], tol: f64) -> Self {
        let tol = tol.max(1e-12);
        let mut grid = Self {
            cell: tol * 2.0,
            tol,
            points: Vec::with_capacity(points.len()),
            cells: HashMap::new(),
        };
        for p in points {
            grid.insert(*p);
        }
        grid
    }

    /// Add a point; returns its index.
    pub fn insert(&mut self, p: Point3) -> usize {
        let i = self.points.len();
        let key = self.key(&p);
        self.cells.entry(key).or_default().push(i);
        self.points.push(p);
        i
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if no point has been indexed.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn key(&self, p: &Point3) -> (i64, i64, i64) {
        (
            (p.x / self.cell).floor() as i64,
            (p.y / self.cell).floor() as i64,
            (p.z / self.cell).floor() as i64,
        )
    }

    /// Lowest-index point within tolerance of `p`.
    pub fn find(&self, p: &Point3) -> Option<usize> {
        let (kx, ky, kz) = self.key(p);
        let mut best: Option<usize> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = self.cells.get(&(kx + dx, ky + dy, kz + dz)) else {
                        continue;
                    };
                    for &i in candidates {
                        if (self.points[i] - p).norm() <= self.tol && best.map_or(true, |b| i < b) {
                            best = Some(i);
                        }
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Point3> {
        (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_grid_finds_within_tolerance() {
        let points = line(4);
        let grid = NodeGrid::new(&points, 1e-6);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.find(&Point3::new(2.0, 0.0, 5e-7)), Some(2));
        assert_eq!(grid.find(&Point3::new(2.0, 0.0, 1e-5)), None);
        assert_eq!(grid.find(&Point3::new(-1.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_grid_prefers_lowest_index_across_cells() {
        // Both points lie within tolerance but straddle a cell boundary
        let mut grid = NodeGrid::new(&[], 1e-3);
        assert!(grid.is_empty());
        grid.insert(Point3::new(2.1e-3, 0.0, 0.0));
        grid.insert(Point3::new(1.9e-3, 0.0, 0.0));
        assert_eq!(grid.find(&Point3::new(2.0e-3, 0.0, 0.0)), Some(0));
    }
}
