//! Cell reconstruction from ruling intersections.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::rulings::RulingSet;
use crate::models::page::to_grid;

/// Integer point where a vertical and a horizontal ruling meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrossPoint {
    pub x: i64,
    pub y: i64,
}

impl CrossPoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// A minimal grid cell whose four corners are cross points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRect {
    pub top_left: CrossPoint,
    pub top_right: CrossPoint,
    pub bottom_left: CrossPoint,
    pub bottom_right: CrossPoint,
}

impl CellRect {
    /// Axis-aligned cell from its left/right columns and top/bottom rows.
    pub fn from_bounds(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            top_left: CrossPoint::new(left, top),
            top_right: CrossPoint::new(right, top),
            bottom_left: CrossPoint::new(left, bottom),
            bottom_right: CrossPoint::new(right, bottom),
        }
    }

    pub fn left(&self) -> i64 {
        self.top_left.x
    }

    pub fn right(&self) -> i64 {
        self.top_right.x
    }

    pub fn top(&self) -> i64 {
        self.top_left.y
    }

    pub fn bottom(&self) -> i64 {
        self.bottom_left.y
    }

    /// Inclusive on every edge.
    pub fn contains(&self, (x, y): (i64, i64)) -> bool {
        self.left() <= x && x <= self.right() && self.top() <= y && y <= self.bottom()
    }
}

/// Every (vertical, horizontal) pair that meets within `tolerance`.
///
/// Duplicates are kept; [`OccupancyGrid`] collapses them.
pub fn find_cross_points(rulings: &RulingSet, tolerance: f64) -> Vec<CrossPoint> {
    let mut points = Vec::new();

    for vline in &rulings.vlines {
        for hline in &rulings.hlines {
            let within_x =
                hline.x0 - tolerance <= vline.x0 && vline.x0 <= hline.x1 + tolerance;
            let within_y =
                vline.y0 - tolerance <= hline.y0 && hline.y0 <= vline.y1 + tolerance;
            if within_x && within_y {
                points.push(CrossPoint::new(to_grid(vline.x0), to_grid(hline.y0)));
            }
        }
    }

    points
}

/// Boolean matrix over the distinct X (columns) and Y (rows) of the cross points.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    xs: Vec<i64>,
    ys: Vec<i64>,
    occupied: HashSet<CrossPoint>,
}

impl OccupancyGrid {
    pub fn new(points: &[CrossPoint]) -> Self {
        let xs: BTreeSet<i64> = points.iter().map(|p| p.x).collect();
        let ys: BTreeSet<i64> = points.iter().map(|p| p.y).collect();
        Self {
            xs: xs.into_iter().collect(),
            ys: ys.into_iter().collect(),
            occupied: points.iter().copied().collect(),
        }
    }

    pub fn columns(&self) -> &[i64] {
        &self.xs
    }

    pub fn rows(&self) -> &[i64] {
        &self.ys
    }

    pub fn is_set(&self, row: usize, col: usize) -> bool {
        self.occupied
            .contains(&CrossPoint::new(self.xs[col], self.ys[row]))
    }

    /// Greedy scan: each (row, col) is a top-left corner; the nearest
    /// column to its right closing all four corners ends the cell.
    pub fn cells(&self) -> Vec<CellRect> {
        let mut rects = Vec::new();
        if self.xs.len() < 2 || self.ys.len() < 2 {
            return rects;
        }

        let last_col = self.xs.len() - 1;
        let last_row = self.ys.len() - 1;

        for row in 0..last_row {
            for col in 0..last_col {
                if !self.is_set(row, col) || !self.is_set(row + 1, col) {
                    continue;
                }
                let closing = (col + 1..=last_col)
                    .find(|&c| self.is_set(row, c) && self.is_set(row + 1, c));
                if let Some(c) = closing {
                    rects.push(CellRect::from_bounds(
                        self.xs[col],
                        self.ys[row],
                        self.xs[c],
                        self.ys[row + 1],
                    ));
                }
            }
        }

        rects
    }
}

/// Cross points and cells for a ruling set.
pub fn build_cells(rulings: &RulingSet, tolerance: f64) -> (Vec<CrossPoint>, Vec<CellRect>) {
    let points = find_cross_points(rulings, tolerance);
    let grid = OccupancyGrid::new(&points);
    let cells = grid.cells();

    debug!(
        "Grid: {} cross points over {}x{} lines, {} cells",
        points.len(),
        grid.rows().len(),
        grid.columns().len(),
        cells.len()
    );

    (points, cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::page::Segment;
    use pretty_assertions::assert_eq;

    /// Full lattice of `n` horizontal and `m` vertical rulings, 10 units apart.
    fn lattice(n: usize, m: usize) -> RulingSet {
        let width = 10.0 * (m - 1) as f64;
        let height = 10.0 * (n - 1) as f64;
        let hlines = (0..n)
            .map(|i| Segment::horizontal(0.0, width, 10.0 * i as f64))
            .collect();
        let vlines = (0..m)
            .map(|j| Segment::vertical(10.0 * j as f64, 0.0, height))
            .collect();
        RulingSet::new(hlines, vlines)
    }

    #[test]
    fn test_grid_cardinality() {
        for n in 2..6 {
            for m in 2..6 {
                let (_, cells) = build_cells(&lattice(n, m), 1.0);
                assert_eq!(cells.len(), (n - 1) * (m - 1), "{}x{} rulings", n, m);
            }
        }
    }

    #[test]
    fn test_cells_row_major() {
        let (_, cells) = build_cells(&lattice(3, 3), 1.0);
        let origins: Vec<(i64, i64)> = cells.iter().map(|c| (c.left(), c.top())).collect();
        assert_eq!(origins, vec![(0, 0), (10, 0), (0, 10), (10, 10)]);
        assert_eq!(cells[3], CellRect::from_bounds(10, 10, 20, 20));
    }

    #[test]
    fn test_cross_point_tolerance() {
        // Vertical stops 0.8 short of the horizontal.
        let rulings = RulingSet::new(
            vec![Segment::horizontal(0.0, 100.0, 50.0)],
            vec![Segment::vertical(40.0, 0.0, 49.2)],
        );
        assert_eq!(find_cross_points(&rulings, 1.0), vec![CrossPoint::new(40, 50)]);
        assert!(find_cross_points(&rulings, 0.5).is_empty());
    }

    #[test]
    fn test_cross_points_truncate() {
        let rulings = RulingSet::new(
            vec![Segment::horizontal(0.0, 100.0, 50.7)],
            vec![Segment::vertical(40.9, 0.0, 100.0)],
        );
        assert_eq!(find_cross_points(&rulings, 1.0), vec![CrossPoint::new(40, 50)]);
    }

    #[test]
    fn test_partial_vertical_merges_cells() {
        // Middle vertical only spans the lower row: the upper row is one wide cell.
        let rulings = RulingSet::new(
            vec![
                Segment::horizontal(0.0, 100.0, 0.0),
                Segment::horizontal(0.0, 100.0, 20.0),
                Segment::horizontal(0.0, 100.0, 40.0),
            ],
            vec![
                Segment::vertical(0.0, 0.0, 40.0),
                Segment::vertical(60.0, 20.0, 40.0),
                Segment::vertical(100.0, 0.0, 40.0),
            ],
        );
        let (_, cells) = build_cells(&rulings, 1.0);
        assert_eq!(
            cells,
            vec![
                CellRect::from_bounds(0, 0, 100, 20),
                CellRect::from_bounds(0, 20, 60, 40),
                CellRect::from_bounds(60, 20, 100, 40),
            ]
        );
    }

    #[test]
    fn test_duplicate_points_collapse() {
        let points = vec![
            CrossPoint::new(0, 0),
            CrossPoint::new(0, 0),
            CrossPoint::new(10, 0),
            CrossPoint::new(0, 10),
            CrossPoint::new(10, 10),
        ];
        let grid = OccupancyGrid::new(&points);
        assert_eq!(grid.cells().len(), 1);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let cell = CellRect::from_bounds(10, 10, 20, 20);
        assert!(cell.contains((10, 10)));
        assert!(cell.contains((20, 20)));
        assert!(cell.contains((15, 20)));
        assert!(!cell.contains((21, 15)));
        assert!(!cell.contains((15, 9)));
    }
}
